//! Comparison checks and rewrites.
//!
//! Runs after properties are bound to `column` nodes and before columns are
//! turned into SQL, so every rule still sees the resolved property of each
//! operand.
//!
//! Rewrites, in rule order:
//! - `a = b` over two columns also matches when both sides are NULL
//! - comparisons against NULL become `is_null` / `is_not_null`
//! - ordering a managed text list or card type compares positions
//! - `col != literal` also matches NULL values
//! - other literal comparisons get a converted literal, lower-cased text and
//!   date-truncated timestamps

use chrono::NaiveDate;

use super::errors::CompileError;
use super::sql_expr::Operator;
use crate::card_catalog::{
    Project, PropertyKind, PropertyTypeResolver, ResolvedProperty, SemanticType, SqlDataType,
    StorageType,
};
use crate::config::TableNames;
use crate::query_tree::{kinds, visit, Attr, InspectFn, Node, Pattern, RewriteFn, RuleSet};

/// Context for the comparison prevalidation visit.
pub struct ComparisonCheck<'a> {
    resolver: &'a PropertyTypeResolver<'a>,
    literal_date_formats: &'a [String],
    errors: Vec<CompileError>,
}

/// Context for the comparison rewrite pass.
pub struct ComparisonContext<'a> {
    pub project: &'a Project,
    pub tables: &'a TableNames,
    pub literal_date_formats: &'a [String],
}

/// Rejects comparisons that cannot be expressed for the bound columns.
pub fn prevalidate(
    tree: &Node,
    resolver: &PropertyTypeResolver<'_>,
    literal_date_formats: &[String],
) -> Result<(), CompileError> {
    let rules = RuleSet::<InspectFn<ComparisonCheck<'_>>>::new().rule(
        "check-comparison",
        Pattern::new(kinds::COMPARISON),
        check_comparison,
    );
    let mut check = ComparisonCheck {
        resolver,
        literal_date_formats,
        errors: Vec::new(),
    };
    visit(tree, &rules, &mut check);
    match check.errors.into_iter().next() {
        Some(error) => Err(error),
        None => Ok(()),
    }
}

pub fn comparison_rules<'a>() -> RuleSet<RewriteFn<ComparisonContext<'a>, CompileError>> {
    RuleSet::<RewriteFn<ComparisonContext<'a>, CompileError>>::new()
        .rule(
            "column-equals-column",
            Pattern::new(kinds::COMPARISON).with_guard(is_column_equality),
            expand_null_equality,
        )
        .rule(
            "compare-with-null",
            Pattern::new(kinds::COMPARISON).with_guard(|n| rhs_is(n, kinds::NULL)),
            rewrite_null_comparison,
        )
        .rule(
            "order-by-list-position",
            Pattern::new(kinds::COMPARISON).with_guard(is_list_ordering),
            rewrite_list_ordering,
        )
        .rule(
            "not-equals-literal",
            Pattern::new(kinds::COMPARISON).with_guard(is_not_equals_literal),
            expand_null_inequality,
        )
        .rule(
            "compare-with-literal",
            Pattern::new(kinds::COMPARISON).with_guard(|n| rhs_is(n, kinds::VALUE)),
            rewrite_literal_comparison,
        )
}

/// Converts a literal to the representation used for `property`'s semantic
/// type: numbers for numeric properties, ISO dates for date properties, text
/// otherwise.
pub fn convert_literal(
    property: &ResolvedProperty,
    value: &Attr,
    literal_date_formats: &[String],
) -> Result<Attr, CompileError> {
    let mismatch = || CompileError::ValueTypeMismatch {
        property: property.name().to_string(),
        value: value.to_string(),
        expected: property.semantic.to_string(),
        hint: None,
    };

    match property.semantic {
        SemanticType::Numeric => match value {
            Attr::Int(i) => Ok(Attr::Int(*i)),
            Attr::Float(f) => Ok(Attr::Float(*f)),
            Attr::Str(s) => {
                let trimmed = s.trim();
                if let Ok(i) = trimmed.parse::<i64>() {
                    Ok(Attr::Int(i))
                } else {
                    match trimmed.parse::<f64>() {
                        Ok(f) if f.is_finite() => Ok(Attr::Float(f)),
                        _ => Err(mismatch()),
                    }
                }
            }
            Attr::Bool(_) => Err(mismatch()),
        },
        SemanticType::Date | SemanticType::Timestamp => {
            let text = value.as_str().ok_or_else(mismatch)?.trim();
            literal_date_formats
                .iter()
                .find_map(|format| NaiveDate::parse_from_str(text, format).ok())
                .map(|date| Attr::Str(date.format("%Y-%m-%d").to_string()))
                .ok_or_else(mismatch)
        }
        _ => Ok(Attr::Str(value.to_string())),
    }
}

fn check_comparison(node: &Node, check: &mut ComparisonCheck<'_>) {
    if let Err(error) = comparison_problem(node, check) {
        check.errors.push(error);
    }
}

fn comparison_problem(node: &Node, check: &ComparisonCheck<'_>) -> Result<(), CompileError> {
    let (lhs, operator_text, rhs) = comparison_parts(node)?;
    let operator = parse_operator(operator_text)?;
    let left = bound_property(lhs)?;

    if operator.is_ordering() && left.kind().is_relationship() {
        return Err(operator_not_allowed(left, operator_text, &left.kind().to_string()));
    }

    if rhs.is(kinds::COLUMN) {
        let right = bound_property(rhs)?;
        if operator.is_ordering() && right.kind().is_relationship() {
            return Err(operator_not_allowed(right, operator_text, &right.kind().to_string()));
        }
        if left.sql_data_type() != right.sql_data_type() {
            return Err(CompileError::ColumnTypeMismatchAcrossComparison {
                left: left.name().to_string(),
                right: right.name().to_string(),
                left_type: left.sql_data_type().to_string(),
                right_type: right.sql_data_type().to_string(),
            });
        }
    } else if rhs.is(kinds::NULL) {
        if operator.is_ordering() {
            return Err(operator_not_allowed(left, operator_text, "NULL comparison"));
        }
    } else if rhs.is(kinds::VALUE) {
        let value = rhs
            .attr("value")
            .ok_or_else(|| CompileError::MalformedTree("value node without a value".to_string()))?;
        if let Err(CompileError::ValueTypeMismatch {
            property,
            value: text,
            expected,
            ..
        }) = convert_literal(left, value, check.literal_date_formats)
        {
            let hint = value
                .as_str()
                .filter(|name| check.resolver.is_property(name))
                .map(|name| format!("Did you mean to compare with PROPERTY {}?", name));
            return Err(CompileError::ValueTypeMismatch {
                property,
                value: text,
                expected,
                hint,
            });
        }
    } else {
        return Err(CompileError::MalformedTree(format!(
            "cannot compare property '{}' with {}",
            left.name(),
            rhs.name()
        )));
    }
    Ok(())
}

fn expand_null_equality(node: Node, _ctx: &mut ComparisonContext<'_>) -> Result<Node, CompileError> {
    let both_null = Node::new(kinds::AND)
        .with_child(is_null(child(&node, 0)?.clone()))
        .with_child(is_null(child(&node, 1)?.clone()));
    Ok(Node::new(kinds::OR).with_child(node).with_child(both_null))
}

fn rewrite_null_comparison(node: Node, _ctx: &mut ComparisonContext<'_>) -> Result<Node, CompileError> {
    let (lhs, operator_text, _) = comparison_parts(&node)?;
    let left = bound_property(lhs)?;
    match parse_operator(operator_text)? {
        Operator::Equal => Ok(is_null(lhs.clone())),
        Operator::NotEqual => Ok(Node::new(kinds::IS_NOT_NULL).with_child(lhs.clone())),
        _ => Err(operator_not_allowed(left, operator_text, "NULL comparison")),
    }
}

fn rewrite_list_ordering(node: Node, ctx: &mut ComparisonContext<'_>) -> Result<Node, CompileError> {
    let (lhs, operator_text, rhs) = comparison_parts(&node)?;
    let left = bound_property(lhs)?;
    let value = literal_of(rhs)?.to_string();

    let lookup = match left.kind() {
        PropertyKind::CardType => Node::new(kinds::CARD_TYPE_POSITION)
            .with_attr("table", ctx.tables.card_types.as_str())
            .with_attr("key_column", "project_id")
            .with_attr("key", ctx.project.id)
            .with_attr("value_column", "name"),
        _ => Node::new(kinds::ENUM_POSITION)
            .with_attr("table", ctx.tables.enumeration_values.as_str())
            .with_attr("key_column", "property_definition_id")
            .with_attr("key", left.descriptor.id)
            .with_attr("value_column", "value"),
    }
    .with_attr("value", value);

    Ok(Node::comparison(
        Node::new(kinds::POSITION).with_child(lhs.clone()),
        operator_text,
        lookup,
    ))
}

fn expand_null_inequality(node: Node, ctx: &mut ComparisonContext<'_>) -> Result<Node, CompileError> {
    let lhs = child(&node, 0)?.clone();
    let compared = rewrite_literal_comparison(node, ctx)?;
    Ok(Node::new(kinds::OR)
        .with_child(compared)
        .with_child(is_null(lhs)))
}

fn rewrite_literal_comparison(node: Node, ctx: &mut ComparisonContext<'_>) -> Result<Node, CompileError> {
    let (lhs, operator_text, rhs) = comparison_parts(&node)?;
    let left = bound_property(lhs)?;
    let literal = convert_literal(left, literal_of(rhs)?, ctx.literal_date_formats)?;

    let (lhs, rhs) = if left.sql_data_type() == SqlDataType::Text {
        (
            Node::new(kinds::LOWER).with_child(lhs.clone()),
            Node::new(kinds::LOWER).with_child(Node::value(literal)),
        )
    } else if left.storage == StorageType::Timestamp && left.semantic == SemanticType::Date {
        (
            Node::new(kinds::TO_DATE).with_child(lhs.clone()),
            Node::value(literal),
        )
    } else {
        (lhs.clone(), Node::value(literal))
    };
    Ok(Node::comparison(lhs, operator_text, rhs))
}

fn is_column_equality(node: &Node) -> bool {
    node.attr_str("operator") == Some("=")
        && node.children().len() == 2
        && node.children().iter().all(|c| c.is(kinds::COLUMN))
}

fn is_list_ordering(node: &Node) -> bool {
    let ordering = node
        .attr_str("operator")
        .and_then(Operator::from_mql)
        .is_some_and(|op| op.is_ordering());
    let list_column = node
        .child(0)
        .and_then(Node::binding)
        .is_some_and(|p| {
            matches!(
                p.kind(),
                PropertyKind::Enumerated { numeric: false } | PropertyKind::CardType
            )
        });
    ordering && list_column && rhs_is(node, kinds::VALUE)
}

fn is_not_equals_literal(node: &Node) -> bool {
    matches!(node.attr_str("operator"), Some("!=") | Some("<>")) && rhs_is(node, kinds::VALUE)
}

fn rhs_is(node: &Node, kind: &str) -> bool {
    node.children().len() == 2 && node.child(1).is_some_and(|c| c.is(kind))
}

fn comparison_parts(node: &Node) -> Result<(&Node, &str, &Node), CompileError> {
    let operator = node
        .attr_str("operator")
        .ok_or_else(|| CompileError::MalformedTree("comparison without an operator".to_string()))?;
    match node.children() {
        [lhs, rhs] if lhs.is(kinds::COLUMN) => Ok((lhs, operator, rhs)),
        [lhs, _] => Err(CompileError::MalformedTree(format!(
            "comparison must start with a property, found {}",
            lhs.name()
        ))),
        other => Err(CompileError::MalformedTree(format!(
            "comparison needs two operands, found {}",
            other.len()
        ))),
    }
}

fn parse_operator(operator: &str) -> Result<Operator, CompileError> {
    Operator::from_mql(operator)
        .ok_or_else(|| CompileError::MalformedTree(format!("unknown operator '{}'", operator)))
}

fn bound_property(node: &Node) -> Result<&ResolvedProperty, CompileError> {
    node.binding()
        .map(|binding| &**binding)
        .ok_or_else(|| CompileError::MalformedTree(format!("unbound column {}", node)))
}

fn literal_of(node: &Node) -> Result<&Attr, CompileError> {
    node.attr("value")
        .ok_or_else(|| CompileError::MalformedTree("value node without a value".to_string()))
}

fn child(node: &Node, index: usize) -> Result<&Node, CompileError> {
    node.child(index)
        .ok_or_else(|| CompileError::MalformedTree(format!("{} is missing operand {}", node.name(), index)))
}

fn is_null(operand: Node) -> Node {
    Node::new(kinds::IS_NULL).with_child(operand)
}

fn operator_not_allowed(property: &ResolvedProperty, operator: &str, property_type: &str) -> CompileError {
    CompileError::OperatorNotAllowedForType {
        property: property.name().to_string(),
        operator: operator.to_string(),
        property_type: property_type.to_string(),
    }
}
