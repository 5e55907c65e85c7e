//! Generic tagged query tree
//!
//! Every stage of the compiler works on `Node` values:
//! - the upstream MQL parser hands over a tree of `statements`, `select`,
//!   `where`, `comparison`, `property`, ... nodes
//! - the compiler rewrites it (see `rewriter`) into SQL-shaped nodes such as
//!   `column`, `sql_column`, `is_null` and `join`
//!
//! Nodes are immutable once built. Rewrites consume a node and build a new one.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::card_catalog::type_resolver::ResolvedProperty;

pub mod rewriter;
pub mod transformed;

pub use rewriter::{transform, visit, AttrMatch, InspectFn, Pattern, RewriteFn, RuleSet};
pub use transformed::Transformed;

/// Node kind tags used across the pipeline.
pub mod kinds {
    // Produced by the upstream MQL parser
    pub const STATEMENTS: &str = "statements";
    pub const SELECT: &str = "select";
    pub const WHERE: &str = "where";
    pub const PROPERTY: &str = "property";
    pub const VALUE: &str = "value";
    pub const NULL: &str = "null";
    pub const STAR: &str = "star";
    pub const AGGREGATE: &str = "aggregate";
    pub const COMPARISON: &str = "comparison";
    pub const AND: &str = "and";
    pub const OR: &str = "or";

    // Constructs the cross-project compiler refuses
    pub const NOT: &str = "not";
    pub const IN: &str = "in";
    pub const IN_PLAN: &str = "in_plan";
    pub const NUMBER: &str = "number";
    pub const THIS_CARD: &str = "this_card";
    pub const PROJECT_VARIABLE: &str = "plv";
    pub const ORDER_BY: &str = "order_by";
    pub const GROUP_BY: &str = "group_by";
    pub const TAGGED_WITH: &str = "tagged_with";
    pub const AS_OF: &str = "as_of";
    pub const FROM_TREE: &str = "from_tree";

    // Produced by the compiler
    pub const COLUMN: &str = "column";
    pub const POSITION: &str = "position";
    pub const LOWER: &str = "lower";
    pub const TO_DATE: &str = "to_date";
    pub const IS_NULL: &str = "is_null";
    pub const IS_NOT_NULL: &str = "is_not_null";
    pub const ENUM_POSITION: &str = "enum_position";
    pub const CARD_TYPE_POSITION: &str = "card_type_position";
    pub const JOIN: &str = "join";
    pub const SQL_COLUMN: &str = "sql_column";
}

/// Attribute value attached to a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Attr {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl Attr {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Attr::Str(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Attr::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Attr::Int(i) => Some(*i),
            _ => None,
        }
    }
}

impl fmt::Display for Attr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Attr::Bool(b) => write!(f, "{}", b),
            Attr::Int(i) => write!(f, "{}", i),
            Attr::Float(x) => write!(f, "{}", x),
            Attr::Str(s) => write!(f, "{}", s),
        }
    }
}

impl From<&str> for Attr {
    fn from(value: &str) -> Self {
        Attr::Str(value.to_string())
    }
}

impl From<String> for Attr {
    fn from(value: String) -> Self {
        Attr::Str(value)
    }
}

impl From<bool> for Attr {
    fn from(value: bool) -> Self {
        Attr::Bool(value)
    }
}

impl From<i64> for Attr {
    fn from(value: i64) -> Self {
        Attr::Int(value)
    }
}

impl From<f64> for Attr {
    fn from(value: f64) -> Self {
        Attr::Float(value)
    }
}

/// A tagged tree element.
///
/// `binding` is only set on `column`/`sql_column` nodes and carries the
/// resolved property the column was built from. It is never serialized:
/// bindings belong to one compilation and are rebuilt for every request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    name: String,
    #[serde(default)]
    attrs: BTreeMap<String, Attr>,
    #[serde(default)]
    children: Vec<Node>,
    #[serde(skip)]
    binding: Option<Arc<ResolvedProperty>>,
}

impl Node {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attrs: BTreeMap::new(),
            children: Vec::new(),
            binding: None,
        }
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<Attr>) -> Self {
        self.attrs.insert(key.into(), value.into());
        self
    }

    pub fn with_child(mut self, child: Node) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_children(mut self, children: impl IntoIterator<Item = Node>) -> Self {
        self.children.extend(children);
        self
    }

    pub fn with_binding(mut self, binding: Arc<ResolvedProperty>) -> Self {
        self.binding = Some(binding);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Kind check, case-insensitive like the MQL keywords it mirrors.
    pub fn is(&self, kind: &str) -> bool {
        self.name.eq_ignore_ascii_case(kind)
    }

    pub fn attrs(&self) -> &BTreeMap<String, Attr> {
        &self.attrs
    }

    pub fn attr(&self, key: &str) -> Option<&Attr> {
        self.attrs.get(key)
    }

    pub fn attr_str(&self, key: &str) -> Option<&str> {
        self.attrs.get(key).and_then(Attr::as_str)
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    pub fn child(&self, index: usize) -> Option<&Node> {
        self.children.get(index)
    }

    /// First direct child of the given kind.
    pub fn find_child(&self, kind: &str) -> Option<&Node> {
        self.children.iter().find(|c| c.is(kind))
    }

    pub fn binding(&self) -> Option<&Arc<ResolvedProperty>> {
        self.binding.as_ref()
    }

    pub fn into_children(self) -> Vec<Node> {
        self.children
    }

    /// Rebuilds this node around a new child list, keeping kind, attributes
    /// and binding.
    pub fn replace_children(self, children: Vec<Node>) -> Node {
        Node {
            name: self.name,
            attrs: self.attrs,
            children,
            binding: self.binding,
        }
    }

    /// Shorthand for a `property` reference node.
    pub fn property(name: impl Into<String>) -> Node {
        Node::new(kinds::PROPERTY).with_attr("name", name.into())
    }

    /// Shorthand for a literal `value` node.
    pub fn value(value: impl Into<Attr>) -> Node {
        Node::new(kinds::VALUE).with_attr("value", value)
    }

    /// Shorthand for a binary `comparison` node.
    pub fn comparison(lhs: Node, operator: &str, rhs: Node) -> Node {
        Node::new(kinds::COMPARISON)
            .with_attr("operator", operator)
            .with_child(lhs)
            .with_child(rhs)
    }

    /// Shorthand for an `aggregate` node over a property, or over `*` when
    /// `property` is `None`.
    pub fn aggregate(function: &str, property: Option<&str>) -> Node {
        let target = match property {
            Some(name) => Node::property(name),
            None => Node::new(kinds::STAR),
        };
        Node::new(kinds::AGGREGATE)
            .with_attr("function", function)
            .with_child(target)
    }

    /// Depth-first iterator over this node and all descendants (pre-order).
    pub fn descendants(&self) -> Vec<&Node> {
        let mut out = vec![self];
        let mut i = 0;
        while i < out.len() {
            let node = out[i];
            out.extend(node.children.iter());
            i += 1;
        }
        out
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if !self.attrs.is_empty() {
            let attrs: Vec<String> = self
                .attrs
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect();
            write!(f, "[{}]", attrs.join(", "))?;
        }
        if !self.children.is_empty() {
            let children: Vec<String> = self.children.iter().map(|c| c.to_string()).collect();
            write!(f, "({})", children.join(", "))?;
        }
        Ok(())
    }
}
