//! Typed SQL plan produced by the compilers.
//!
//! `ScopeCompiler` builds one `SqlStatement` per project; `PlanQueryCompiler`
//! wraps those in a UNION ALL derived table and re-applies aggregation on
//! top. Rendering lives in `sql_generator`.

use serde::{Deserialize, Serialize};
use std::fmt;

pub mod column_rules;
pub mod comparison_rules;
pub mod errors;
pub mod join_registry;
pub mod plan_compiler;
pub mod scope_compiler;
pub mod select_columns;
pub mod sql_expr;

#[cfg(test)]
mod tests;

pub use errors::CompileError;
pub use join_registry::JoinRegistry;
pub use plan_compiler::PlanQueryCompiler;
pub use scope_compiler::ScopeCompiler;
pub use select_columns::{AggregateColumn, AggregateFunction, ColumnType, SelectColumnDescriptor};

use sql_expr::{OperatorApplication, SqlExpr};

pub trait ToSql {
    fn to_sql(&self) -> String;
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct SqlStatement {
    pub select: SelectItems,
    pub from: FromTableItem,
    pub joins: JoinItems,
    pub filters: FilterItems,
    pub group_by: GroupByExpressions,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct SelectItems {
    pub items: Vec<SelectItem>,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct SelectItem {
    pub expression: SqlExpr,
    pub col_alias: Option<String>,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct FromTableItem(pub FromSource);

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub enum FromSource {
    Table { name: String, alias: String },
    /// `(<union>) AS alias`
    DerivedUnion { union: Union, alias: String },
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct FilterItems(pub Option<SqlExpr>);

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct GroupByExpressions(pub Vec<SqlExpr>);

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct JoinItems(pub Vec<JoinSpec>);

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct JoinSpec {
    pub table_name: String,
    pub table_alias: String,
    /// AND-composed equality conditions
    pub joining_on: Vec<OperatorApplication>,
    pub join_type: JoinType,
}

#[derive(Debug, PartialEq, Clone, Copy, Serialize, Deserialize)]
pub enum JoinType {
    Inner,
    Left,
}

/// Branches combined with UNION ALL.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Union {
    pub input: Vec<SqlStatement>,
}

/// A renderable statement plus the positional description of its output
/// columns. `columns[i]` always describes the i-th SELECT item.
#[derive(Debug, PartialEq, Clone)]
pub struct CompiledQuery {
    pub statement: SqlStatement,
    pub columns: Vec<SelectColumnDescriptor>,
}

impl fmt::Display for SqlStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "---- SqlStatement ----")?;
        writeln!(f, "\nSELECT: {:?}", self.select)?;
        writeln!(f, "\nFROM: {:?}", self.from)?;
        writeln!(f, "\nJOINS: {:?}", self.joins)?;
        writeln!(f, "\nFILTERS: {:?}", self.filters)?;
        writeln!(f, "\nGROUP BY: {:?}", self.group_by)?;
        writeln!(f, "----------------------")
    }
}
