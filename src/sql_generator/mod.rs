//! ClickHouse rendering of compiled queries.

use crate::sql_plan::{CompiledQuery, ToSql};

pub mod common;
mod to_sql;

pub use common::quote_identifier;

/// Renders the statement. Output columns appear in the order of
/// `query.columns`.
pub fn generate_sql(query: &CompiledQuery) -> String {
    let sql = query.statement.to_sql();
    log::debug!("Rendered SQL:\n{}", sql);
    sql
}
