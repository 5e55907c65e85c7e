use crate::query_tree::{kinds, visit, AttrMatch, InspectFn, Node, Pattern, RuleSet};
use crate::sql_plan::errors::CompileError;

const SUPPORTED_AGGREGATES: [&str; 5] = ["avg", "count", "max", "min", "sum"];

/// Rejects MQL constructs the cross-project compiler cannot express.
///
/// Runs on the raw parser tree, before any property is looked up.
pub struct SyntaxValidator {
    rules: RuleSet<InspectFn<Vec<CompileError>>>,
}

impl Default for SyntaxValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl SyntaxValidator {
    pub fn new() -> Self {
        let rules = RuleSet::<InspectFn<Vec<CompileError>>>::new()
            .rule(
                "distinct",
                Pattern::new(kinds::SELECT).with_attr("distinct", AttrMatch::Equals(true.into())),
                |_, errors| errors.push(CompileError::unsupported("DISTINCT")),
            )
            .rule("number-keyword", Pattern::new(kinds::NUMBER), |_, errors| {
                errors.push(CompileError::unsupported("NUMBER"))
            })
            .rule(
                "number-property",
                Pattern::new(kinds::PROPERTY)
                    .with_attr("name", AttrMatch::EqualsIgnoreCase("number".into())),
                |_, errors| errors.push(CompileError::unsupported("NUMBER")),
            )
            .rule(
                "number-comparison",
                Pattern::new(kinds::COMPARISON).with_guard(compares_number),
                |_, errors| errors.push(CompileError::unsupported("Comparison with NUMBER")),
            )
            .rule("this-card", Pattern::new(kinds::THIS_CARD), |_, errors| {
                errors.push(CompileError::unsupported("THIS CARD"))
            })
            .rule(
                "project-variable",
                Pattern::new(kinds::PROJECT_VARIABLE),
                |_, errors| errors.push(CompileError::unsupported("Project variables")),
            )
            .rule("order-by", Pattern::new(kinds::ORDER_BY), |_, errors| {
                errors.push(CompileError::unsupported("ORDER BY"))
            })
            .rule("group-by", Pattern::new(kinds::GROUP_BY), |_, errors| {
                errors.push(CompileError::unsupported("GROUP BY"))
            })
            .rule("tagged-with", Pattern::new(kinds::TAGGED_WITH), |_, errors| {
                errors.push(CompileError::unsupported("TAGGED WITH"))
            })
            .rule("as-of", Pattern::new(kinds::AS_OF), |_, errors| {
                errors.push(CompileError::unsupported("AS OF"))
            })
            .rule("from-tree", Pattern::new(kinds::FROM_TREE), |_, errors| {
                errors.push(CompileError::unsupported("FROM TREE"))
            })
            .rule("not", Pattern::new(kinds::NOT), |_, errors| {
                errors.push(CompileError::unsupported("NOT"))
            })
            .rule("in-plan", Pattern::new(kinds::IN_PLAN), |_, errors| {
                errors.push(CompileError::unsupported("IN PLAN"))
            })
            .rule("in", Pattern::new(kinds::IN), |_, errors| {
                errors.push(CompileError::unsupported("IN"))
            })
            .rule(
                "aggregate-function",
                Pattern::new(kinds::AGGREGATE).with_guard(unsupported_aggregate),
                report_aggregate,
            );

        Self { rules }
    }

    /// Every unsupported construct in the tree, in bottom-up order.
    pub fn validate(&self, tree: &Node) -> Vec<CompileError> {
        let mut errors = Vec::new();
        visit(tree, &self.rules, &mut errors);
        errors
    }

    /// First unsupported construct, if any.
    pub fn validate_strict(&self, tree: &Node) -> Result<(), CompileError> {
        match self.validate(tree).into_iter().next() {
            Some(error) => {
                log::info!("Rejected cross-project query: {}", error);
                Err(error)
            }
            None => Ok(()),
        }
    }
}

fn compares_number(node: &Node) -> bool {
    node.children().iter().any(|child| {
        child.is(kinds::NUMBER)
            || (child.is(kinds::PROPERTY)
                && child
                    .attr_str("name")
                    .is_some_and(|name| name.eq_ignore_ascii_case("number")))
    })
}

fn unsupported_aggregate(node: &Node) -> bool {
    match node.attr_str("function") {
        Some(function) => !SUPPORTED_AGGREGATES
            .iter()
            .any(|supported| supported.eq_ignore_ascii_case(function)),
        None => true,
    }
}

fn report_aggregate(node: &Node, errors: &mut Vec<CompileError>) {
    let function = node.attr_str("function").unwrap_or("<missing>");
    errors.push(CompileError::unsupported(&format!(
        "Aggregate function {}",
        function.to_uppercase()
    )));
}
