//! Rule-driven tree rewriting
//!
//! A `RuleSet` is an ordered list of `(Pattern, action)` pairs. Both `transform`
//! and `visit` walk the tree bottom-up: children are processed before their
//! parent is considered. At each node the **first** rule whose pattern matches
//! is applied, later rules are not consulted for that node. A rewritten node is
//! not walked again, so a rule's output is final for the pass.
//!
//! Passes compose by feeding one pass's output tree into the next.
//!
//! ```ignore
//! let rules = RuleSet::new()
//!     .rule("null-literal", Pattern::new(kinds::NULL), rewrite_null)
//!     .rule("any-value", Pattern::new(kinds::VALUE), rewrite_value);
//! let tree = transform(tree, &rules, &mut ctx)?.get_plan();
//! ```

use super::{Attr, Node, Transformed};

/// Rewrite action: consumes the matched node (children already rewritten)
/// and returns its replacement.
pub type RewriteFn<C, E> = fn(Node, &mut C) -> Result<Node, E>;

/// Inspection action for `visit`.
pub type InspectFn<C> = fn(&Node, &mut C);

/// Predicate over one attribute.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrMatch {
    Equals(Attr),
    /// String attribute compared case-insensitively
    EqualsIgnoreCase(String),
    Present,
}

impl AttrMatch {
    fn matches(&self, value: Option<&Attr>) -> bool {
        match (self, value) {
            (AttrMatch::Present, Some(_)) => true,
            (AttrMatch::Equals(expected), Some(actual)) => expected == actual,
            (AttrMatch::EqualsIgnoreCase(expected), Some(Attr::Str(actual))) => {
                expected.eq_ignore_ascii_case(actual)
            }
            _ => false,
        }
    }
}

/// Node shape a rule applies to: kind tag, attribute predicates and an
/// optional structural guard.
#[derive(Debug, Clone)]
pub struct Pattern {
    kind: String,
    attrs: Vec<(String, AttrMatch)>,
    guard: Option<fn(&Node) -> bool>,
}

impl Pattern {
    pub fn new(kind: &str) -> Self {
        Self {
            kind: kind.to_string(),
            attrs: Vec::new(),
            guard: None,
        }
    }

    pub fn with_attr(mut self, key: &str, matcher: AttrMatch) -> Self {
        self.attrs.push((key.to_string(), matcher));
        self
    }

    pub fn with_guard(mut self, guard: fn(&Node) -> bool) -> Self {
        self.guard = Some(guard);
        self
    }

    pub fn matches(&self, node: &Node) -> bool {
        node.is(&self.kind)
            && self
                .attrs
                .iter()
                .all(|(key, matcher)| matcher.matches(node.attr(key)))
            && self.guard.map_or(true, |guard| guard(node))
    }
}

struct Rule<F> {
    label: &'static str,
    pattern: Pattern,
    action: F,
}

/// Ordered rules; first match wins.
pub struct RuleSet<F> {
    rules: Vec<Rule<F>>,
}

impl<F> Default for RuleSet<F> {
    fn default() -> Self {
        Self { rules: Vec::new() }
    }
}

impl<F> RuleSet<F> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rule(mut self, label: &'static str, pattern: Pattern, action: F) -> Self {
        self.rules.push(Rule {
            label,
            pattern,
            action,
        });
        self
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    fn first_match(&self, node: &Node) -> Option<&Rule<F>> {
        self.rules.iter().find(|rule| rule.pattern.matches(node))
    }
}

/// Bottom-up rewrite. Returns `Transformed::Yes` when at least one rule fired
/// anywhere in the tree.
pub fn transform<C, E>(
    tree: Node,
    rules: &RuleSet<RewriteFn<C, E>>,
    ctx: &mut C,
) -> Result<Transformed<Node>, E> {
    let Node {
        name,
        attrs,
        children,
        binding,
    } = tree;

    let mut changed = false;
    let mut new_children = Vec::with_capacity(children.len());
    for child in children {
        let child_tf = transform(child, rules, ctx)?;
        changed |= child_tf.is_yes();
        new_children.push(child_tf.get_plan());
    }

    let node = Node {
        name,
        attrs,
        children: new_children,
        binding,
    };

    match rules.first_match(&node) {
        Some(rule) => {
            log::trace!("rewrite rule '{}' fired on {}", rule.label, node.name());
            Ok(Transformed::Yes((rule.action)(node, ctx)?))
        }
        None => Ok(Transformed::No(node).or_yes(changed)),
    }
}

/// Bottom-up inspection with the same matching semantics as `transform`.
pub fn visit<C>(tree: &Node, rules: &RuleSet<InspectFn<C>>, ctx: &mut C) {
    for child in tree.children() {
        visit(child, rules, ctx);
    }
    if let Some(rule) = rules.first_match(tree) {
        log::trace!("visit rule '{}' fired on {}", rule.label, tree.name());
        (rule.action)(tree, ctx);
    }
}
