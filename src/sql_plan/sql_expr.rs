use serde::{Deserialize, Serialize};

use super::errors::CompileError;
use crate::query_tree::{kinds, Attr, Node};

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub enum SqlExpr {
    Literal(Literal),

    Star,

    Column(ColumnRef),

    AggregateFnCall(AggregateFnCall),

    ScalarFnCall(ScalarFnCall),

    OperatorApplicationExp(OperatorApplication),

    /// Single-value lookup such as a managed-list position
    Subquery(ScalarSubquery),
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub enum Literal {
    Integer(i64),
    Float(f64),
    Boolean(bool),
    String(String),
    Null,
}

/// Column reference, qualified by a table alias unless it names a column of
/// the derived union table.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct ColumnRef {
    pub table_alias: Option<String>,
    pub column: String,
}

#[derive(Debug, PartialEq, Clone, Copy, Serialize, Deserialize)]
pub enum Operator {
    Equal,
    NotEqual,
    LessThan,
    GreaterThan,
    LessThanEqual,
    GreaterThanEqual,
    And,
    Or,
    IsNull,
    IsNotNull,
}

impl Operator {
    /// Maps an MQL comparison operator.
    pub fn from_mql(operator: &str) -> Option<Self> {
        let op = match operator {
            "=" => Operator::Equal,
            "!=" | "<>" => Operator::NotEqual,
            "<" => Operator::LessThan,
            ">" => Operator::GreaterThan,
            "<=" => Operator::LessThanEqual,
            ">=" => Operator::GreaterThanEqual,
            _ => return None,
        };
        Some(op)
    }

    pub fn is_ordering(&self) -> bool {
        matches!(
            self,
            Operator::LessThan
                | Operator::GreaterThan
                | Operator::LessThanEqual
                | Operator::GreaterThanEqual
        )
    }
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct OperatorApplication {
    pub operator: Operator,
    pub operands: Vec<SqlExpr>,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct ScalarFnCall {
    pub name: String,
    pub args: Vec<SqlExpr>,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct AggregateFnCall {
    pub name: String,
    pub args: Vec<SqlExpr>,
}

/// `(SELECT column FROM table WHERE filter)`
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct ScalarSubquery {
    pub column: String,
    pub table: String,
    pub filter: Box<SqlExpr>,
}

impl From<&Attr> for Literal {
    fn from(value: &Attr) -> Self {
        match value {
            Attr::Bool(b) => Literal::Boolean(*b),
            Attr::Int(i) => Literal::Integer(*i),
            Attr::Float(f) => Literal::Float(*f),
            Attr::Str(s) => Literal::String(s.clone()),
        }
    }
}

impl TryFrom<&Node> for SqlExpr {
    type Error = CompileError;

    fn try_from(node: &Node) -> Result<Self, Self::Error> {
        let kind = node.name().to_ascii_lowercase();
        let expression = match kind.as_str() {
            kinds::SQL_COLUMN => SqlExpr::Column(ColumnRef {
                table_alias: node.attr_str("table").map(str::to_string),
                column: required_attr(node, "column")?.to_string(),
            }),
            kinds::VALUE => match node.attr("value") {
                Some(value) => SqlExpr::Literal(value.into()),
                None => SqlExpr::Literal(Literal::Null),
            },
            kinds::NULL => SqlExpr::Literal(Literal::Null),
            kinds::STAR => SqlExpr::Star,
            kinds::COMPARISON => {
                let operator_text = required_attr(node, "operator")?;
                let operator = Operator::from_mql(operator_text).ok_or_else(|| {
                    CompileError::MalformedTree(format!("unknown operator '{}'", operator_text))
                })?;
                if node.children().len() != 2 {
                    return Err(CompileError::MalformedTree(format!(
                        "comparison needs two operands, found {}",
                        node.children().len()
                    )));
                }
                SqlExpr::OperatorApplicationExp(OperatorApplication {
                    operator,
                    operands: convert_children(node)?,
                })
            }
            kinds::AND | kinds::OR => {
                let operator = if kind == kinds::AND {
                    Operator::And
                } else {
                    Operator::Or
                };
                combine(convert_children(node)?, operator).ok_or_else(|| {
                    CompileError::MalformedTree(format!("empty {} condition", node.name()))
                })?
            }
            kinds::IS_NULL | kinds::IS_NOT_NULL => {
                let operator = if kind == kinds::IS_NULL {
                    Operator::IsNull
                } else {
                    Operator::IsNotNull
                };
                SqlExpr::OperatorApplicationExp(OperatorApplication {
                    operator,
                    operands: convert_children(node)?,
                })
            }
            kinds::LOWER => SqlExpr::ScalarFnCall(ScalarFnCall {
                name: "lower".to_string(),
                args: convert_children(node)?,
            }),
            kinds::TO_DATE => SqlExpr::ScalarFnCall(ScalarFnCall {
                name: "toDate".to_string(),
                args: convert_children(node)?,
            }),
            kinds::ENUM_POSITION | kinds::CARD_TYPE_POSITION => position_lookup(node)?,
            kinds::AGGREGATE => SqlExpr::AggregateFnCall(AggregateFnCall {
                name: required_attr(node, "function")?.to_lowercase(),
                args: convert_children(node)?,
            }),
            other => {
                return Err(CompileError::MalformedTree(format!(
                    "'{}' cannot appear in a SQL expression",
                    other
                )))
            }
        };
        Ok(expression)
    }
}

fn required_attr<'a>(node: &'a Node, key: &str) -> Result<&'a str, CompileError> {
    node.attr_str(key).ok_or_else(|| {
        CompileError::MalformedTree(format!("{} node is missing '{}'", node.name(), key))
    })
}

fn convert_children(node: &Node) -> Result<Vec<SqlExpr>, CompileError> {
    node.children().iter().map(SqlExpr::try_from).collect()
}

/// `enum_position` / `card_type_position` nodes carry the lookup table, the
/// key column and value, and the value to find.
fn position_lookup(node: &Node) -> Result<SqlExpr, CompileError> {
    let key = node
        .attr("key")
        .map(Literal::from)
        .ok_or_else(|| CompileError::MalformedTree(format!("{} node is missing 'key'", node.name())))?;
    let value = node
        .attr("value")
        .map(Literal::from)
        .ok_or_else(|| CompileError::MalformedTree(format!("{} node is missing 'value'", node.name())))?;

    let filter = and(vec![
        eq(
            column(None, required_attr(node, "key_column")?),
            SqlExpr::Literal(key),
        ),
        eq(
            lower(column(None, required_attr(node, "value_column")?)),
            lower(SqlExpr::Literal(value)),
        ),
    ])
    .ok_or_else(|| CompileError::MalformedTree("empty position lookup".to_string()))?;

    Ok(SqlExpr::Subquery(ScalarSubquery {
        column: "position".to_string(),
        table: required_attr(node, "table")?.to_string(),
        filter: Box::new(filter),
    }))
}

/// Combine predicates with AND.
///
/// - Empty vec → None
/// - Single predicate → Some(predicate)
/// - Multiple → Some(pred1 AND pred2 AND ...)
pub fn and(predicates: Vec<SqlExpr>) -> Option<SqlExpr> {
    combine(predicates, Operator::And)
}

fn combine(predicates: Vec<SqlExpr>, op: Operator) -> Option<SqlExpr> {
    match predicates.len() {
        0 => None,
        1 => predicates.into_iter().next(),
        _ => Some(SqlExpr::OperatorApplicationExp(OperatorApplication {
            operator: op,
            operands: predicates,
        })),
    }
}

pub fn eq(lhs: SqlExpr, rhs: SqlExpr) -> SqlExpr {
    SqlExpr::OperatorApplicationExp(OperatorApplication {
        operator: Operator::Equal,
        operands: vec![lhs, rhs],
    })
}

pub fn column(table_alias: Option<&str>, column: &str) -> SqlExpr {
    SqlExpr::Column(ColumnRef {
        table_alias: table_alias.map(str::to_string),
        column: column.to_string(),
    })
}

/// `left_alias.left_col = right_alias.right_col` as a join condition.
pub fn col_eq(left_alias: &str, left_col: &str, right_alias: &str, right_col: &str) -> OperatorApplication {
    OperatorApplication {
        operator: Operator::Equal,
        operands: vec![
            column(Some(left_alias), left_col),
            column(Some(right_alias), right_col),
        ],
    }
}

/// `alias.col = <literal>` as a join condition.
pub fn col_eq_literal(alias: &str, col: &str, value: Literal) -> OperatorApplication {
    OperatorApplication {
        operator: Operator::Equal,
        operands: vec![column(Some(alias), col), SqlExpr::Literal(value)],
    }
}

fn lower(expr: SqlExpr) -> SqlExpr {
    SqlExpr::ScalarFnCall(ScalarFnCall {
        name: "lower".to_string(),
        args: vec![expr],
    })
}
