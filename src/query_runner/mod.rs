//! Execution of compiled queries and typed formatting of their rows.

use std::sync::Arc;

use async_trait::async_trait;

use crate::sql_generator::generate_sql;
use crate::sql_plan::CompiledQuery;

pub mod clickhouse_executor;
pub mod errors;
pub mod result_formatter;
pub mod user_directory;

pub use clickhouse_executor::ClickHouseExecutor;
pub use errors::{ExecutionError, FormatError, QueryRunError};
pub use result_formatter::{CellValue, FormatOptions, FormattedRow, ResultFormatter};
pub use user_directory::UserDirectory;

/// One decoded result row: column name to raw value, in SELECT order.
pub type Row = serde_json::Map<String, serde_json::Value>;

/// Backend that runs rendered SQL.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    async fn execute(&self, sql: &str) -> Result<Vec<Row>, ExecutionError>;
}

/// Renders, executes and formats compiled queries.
pub struct QueryRunner {
    executor: Arc<dyn QueryExecutor>,
    users: Arc<dyn UserDirectory>,
    options: FormatOptions,
}

impl QueryRunner {
    pub fn new(
        executor: Arc<dyn QueryExecutor>,
        users: Arc<dyn UserDirectory>,
        options: FormatOptions,
    ) -> Self {
        Self {
            executor,
            users,
            options,
        }
    }

    /// Same runner with a caller-supplied date format and precision.
    pub fn with_options(&self, options: FormatOptions) -> Self {
        Self {
            executor: self.executor.clone(),
            users: self.users.clone(),
            options,
        }
    }

    /// Rows keyed by lower-cased column name.
    pub async fn values(&self, query: &CompiledQuery) -> Result<Vec<FormattedRow>, QueryRunError> {
        let rows = self.run(query).await?;
        let formatter = ResultFormatter::new(self.users.as_ref(), &self.options);
        let formatted = rows
            .iter()
            .map(|row| formatter.format_row(row, &query.columns))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(formatted)
    }

    /// Every cell of every row, flattened in row then column order. Cells
    /// are matched to columns by position.
    pub async fn single_values(&self, query: &CompiledQuery) -> Result<Vec<CellValue>, QueryRunError> {
        let rows = self.run(query).await?;
        let formatter = ResultFormatter::new(self.users.as_ref(), &self.options);
        let mut cells = Vec::with_capacity(rows.len());
        for row in &rows {
            cells.extend(formatter.format_positional(row, &query.columns)?);
        }
        Ok(cells)
    }

    async fn run(&self, query: &CompiledQuery) -> Result<Vec<Row>, ExecutionError> {
        let sql = generate_sql(query);
        self.executor.execute(&sql).await
    }
}
