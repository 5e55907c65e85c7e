use std::env;

use async_trait::async_trait;
use clickhouse::Client;
use tokio::io::AsyncBufReadExt;

use super::errors::ExecutionError;
use super::{QueryExecutor, Row};

const CONNECTION_VARS: [&str; 4] = [
    "CLICKHOUSE_URL",
    "CLICKHOUSE_USER",
    "CLICKHOUSE_PASSWORD",
    "CLICKHOUSE_DATABASE",
];

fn read_env_var(key: &str) -> Option<String> {
    env::var(key).ok()
}

/// Client built from `CLICKHOUSE_*` environment variables, or `None` when
/// any of them is missing.
pub fn try_get_client() -> Option<Client> {
    let url = read_env_var("CLICKHOUSE_URL")?;
    let user = read_env_var("CLICKHOUSE_USER")?;
    let password = read_env_var("CLICKHOUSE_PASSWORD")?;
    let database = read_env_var("CLICKHOUSE_DATABASE")?;

    log::info!("Connecting to ClickHouse at {}", url);
    Some(
        Client::default()
            .with_url(url)
            .with_user(user)
            .with_password(password)
            .with_database(database)
            .with_option("join_use_nulls", "1"), // unmatched LEFT JOIN columns read as NULL
    )
}

/// Runs rendered SQL on ClickHouse and decodes `JSONEachRow` output.
#[derive(Clone)]
pub struct ClickHouseExecutor {
    client: Client,
}

impl ClickHouseExecutor {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn from_env() -> Result<Self, ExecutionError> {
        try_get_client()
            .map(Self::new)
            .ok_or_else(|| ExecutionError::MissingConnection(CONNECTION_VARS.join(", ")))
    }
}

#[async_trait]
impl QueryExecutor for ClickHouseExecutor {
    async fn execute(&self, sql: &str) -> Result<Vec<Row>, ExecutionError> {
        log::debug!("Executing SQL:\n{}", sql);

        let mut lines = self
            .client
            .query(sql)
            .fetch_bytes("JSONEachRow")
            .map_err(|e| {
                log::error!("ClickHouse query failed. SQL was:\n{}\nError: {}", sql, e);
                e
            })?
            .lines();

        let mut rows = Vec::new();
        while let Some(line) = lines.next_line().await.map_err(|e| {
            log::error!(
                "ClickHouse response parsing failed. SQL was:\n{}\nError: {}",
                sql,
                e
            );
            e
        })? {
            rows.push(parse_row(&line)?);
        }
        log::debug!("ClickHouse returned {} row(s)", rows.len());
        Ok(rows)
    }
}

fn parse_row(line: &str) -> Result<Row, ExecutionError> {
    match serde_json::from_str::<serde_json::Value>(line)? {
        serde_json::Value::Object(row) => Ok(row),
        other => Err(ExecutionError::UnexpectedRow(other.to_string())),
    }
}
