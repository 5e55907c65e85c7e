//! End-to-end tests for cross-project queries: catalog YAML, parsed query
//! JSON, compilation, SQL rendering, execution and formatting.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use cardquery::card_catalog::{CatalogConfig, InMemoryCatalog, Scope};
use cardquery::config::CompilerConfig;
use cardquery::query_runner::{
    CellValue, ExecutionError, FormatError, FormatOptions, QueryExecutor, QueryRunError,
    QueryRunner, Row,
};
use cardquery::query_tree::Node;
use cardquery::sql_generator::generate_sql;
use cardquery::sql_plan::{CompileError, PlanQueryCompiler};
use serde_json::json;

const CATALOG: &str = r#"
projects:
  - id: 1
    identifier: web
    properties:
      - { id: 11, name: Status, kind: enumerated }
      - { id: 12, name: Size, kind: numeric }
      - { id: 13, name: Owner, kind: user }
      - { id: 14, name: Due, kind: date }
  - id: 2
    identifier: mobile
    properties:
      - { id: 21, name: Status, kind: enumerated }
      - { id: 22, name: Size, kind: numeric }
      - { id: 23, name: Owner, kind: user }
      - { id: 24, name: Due, kind: date }
  - id: 3
    identifier: ops
    properties:
      - { id: 31, name: Status, kind: enumerated }
scopes:
  - { id: 40, name: Mobile Launch, projects: [web, mobile] }
  - { id: 41, name: Everything, projects: [web, mobile, ops] }
users:
  - { login: ana, name: Ana Lima }
  - { login: raj, name: Raj Patel }
"#;

/// `SELECT Owner, Status, SUM(Size), COUNT(*) WHERE Status != 'Closed'`
const OWNER_SUMMARY: &str = r#"{
    "name": "statements",
    "children": [
        {
            "name": "select",
            "children": [
                { "name": "property", "attrs": { "name": "Owner" } },
                { "name": "property", "attrs": { "name": "status", "alias": "State" } },
                {
                    "name": "aggregate",
                    "attrs": { "function": "SUM" },
                    "children": [ { "name": "property", "attrs": { "name": "Size" } } ]
                },
                {
                    "name": "aggregate",
                    "attrs": { "function": "count" },
                    "children": [ { "name": "star" } ]
                }
            ]
        },
        {
            "name": "where",
            "children": [
                {
                    "name": "comparison",
                    "attrs": { "operator": "!=" },
                    "children": [
                        { "name": "property", "attrs": { "name": "Status" } },
                        { "name": "value", "attrs": { "value": "Closed" } }
                    ]
                }
            ]
        }
    ]
}"#;

/// Replays canned rows and records every SQL statement it receives.
struct ReplayExecutor {
    rows: Vec<Row>,
    seen: Mutex<Vec<String>>,
}

impl ReplayExecutor {
    fn new(rows: Vec<serde_json::Value>) -> Self {
        Self {
            rows: rows
                .into_iter()
                .filter_map(|row| match row {
                    serde_json::Value::Object(map) => Some(map),
                    _ => None,
                })
                .collect(),
            seen: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl QueryExecutor for ReplayExecutor {
    async fn execute(&self, sql: &str) -> Result<Vec<Row>, ExecutionError> {
        self.seen.lock().unwrap().push(sql.to_string());
        Ok(self.rows.clone())
    }
}

fn catalog() -> Arc<InMemoryCatalog> {
    Arc::new(
        CatalogConfig::from_yaml_str(CATALOG)
            .unwrap()
            .to_catalog()
            .unwrap(),
    )
}

fn scope(catalog: &InMemoryCatalog, name: &str) -> Scope {
    catalog.scope(name).unwrap().clone()
}

fn parse(json: &str) -> Node {
    serde_json::from_str(json).unwrap()
}

#[test]
fn test_owner_summary_renders_one_unioned_statement() {
    let catalog = catalog();
    let config = CompilerConfig::default();
    let compiled = PlanQueryCompiler::new(catalog.as_ref(), &config)
        .compile(&scope(&catalog, "mobile launch"), &parse(OWNER_SUMMARY))
        .unwrap();
    let sql = generate_sql(&compiled);

    assert!(sql.starts_with("SELECT \n      union_results.owner AS \"Owner\", \n"));
    assert!(sql.contains("union_results.status AS \"State\""));
    assert!(sql.contains("sum(union_results.size) AS \"sum(Size)\""));
    assert!(sql.contains("count(*) AS \"count(*)\""));

    assert_eq!(sql.matches("UNION ALL").count(), 1);
    assert!(sql.contains("FROM web_cards AS cards\n"));
    assert!(sql.contains("FROM mobile_cards AS cards\n"));
    assert!(sql.contains("plan_cards.plan_id = 40"));
    assert!(sql.contains("LEFT JOIN users AS users_cp_owner_user_id"));

    assert!(sql.ends_with(
        ") AS union_results\nGROUP BY union_results.owner, union_results.status\n"
    ));
}

#[test]
fn test_property_absent_from_one_project_fails_whole_query() {
    let catalog = catalog();
    let config = CompilerConfig::default();
    let result = PlanQueryCompiler::new(catalog.as_ref(), &config)
        .compile(&scope(&catalog, "Everything"), &parse(OWNER_SUMMARY));

    match result {
        Err(CompileError::PropertyMissing { property, projects }) => {
            assert_eq!(property, "Owner");
            assert_eq!(projects, vec!["ops".to_string()]);
        }
        other => panic!("expected PropertyMissing, got {:?}", other),
    }
}

#[tokio::test]
async fn test_rows_are_formatted_per_column_type() {
    let catalog = catalog();
    let config = CompilerConfig::default();
    let compiled = PlanQueryCompiler::new(catalog.as_ref(), &config)
        .compile(&scope(&catalog, "Mobile Launch"), &parse(OWNER_SUMMARY))
        .unwrap();

    let executor = Arc::new(ReplayExecutor::new(vec![
        json!({ "Owner": "ana", "State": "Open", "sum(Size)": "5.500", "count(*)": "3" }),
        json!({ "Owner": null, "State": "Open", "sum(Size)": null, "count(*)": "1" }),
    ]));
    let runner = QueryRunner::new(executor.clone(), catalog.clone(), FormatOptions::from(&config));

    let rows = runner.values(&compiled).await.unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].get("owner"), Some(&CellValue::Text("Ana Lima (ana)".to_string())));
    assert_eq!(rows[0].get("state"), Some(&CellValue::Raw(json!("Open"))));
    assert_eq!(rows[0].get("sum(size)"), Some(&CellValue::Text("5.5".to_string())));
    assert_eq!(rows[0].get("count(*)"), Some(&CellValue::Text("3".to_string())));
    assert_eq!(rows[1].get("owner"), Some(&CellValue::Null));
    assert_eq!(rows[1].get("sum(size)"), Some(&CellValue::NoValue));

    assert_eq!(
        serde_json::to_value(&rows[1]).unwrap(),
        json!({ "owner": null, "state": "Open", "sum(size)": "", "count(*)": "1" })
    );

    let seen = executor.seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0], generate_sql(&compiled));
}

#[tokio::test]
async fn test_single_values_with_custom_date_format() {
    let catalog = catalog();
    let config = CompilerConfig {
        date_format: "%Y/%m/%d".to_string(),
        ..Default::default()
    };
    let tree = parse(
        r#"{
            "name": "statements",
            "children": [
                { "name": "select", "children": [ { "name": "property", "attrs": { "name": "Due" } } ] }
            ]
        }"#,
    );
    let compiled = PlanQueryCompiler::new(catalog.as_ref(), &config)
        .compile(&scope(&catalog, "Mobile Launch"), &tree)
        .unwrap();

    let executor = Arc::new(ReplayExecutor::new(vec![
        json!({ "Due": "2024-03-09" }),
        json!({ "Due": null }),
    ]));
    let runner = QueryRunner::new(executor, catalog.clone(), FormatOptions::from(&config));

    let values = runner.single_values(&compiled).await.unwrap();
    assert_eq!(
        values,
        vec![CellValue::Text("2024/03/09".to_string()), CellValue::Null]
    );
}

#[tokio::test]
async fn test_row_with_unexpected_column_is_a_format_error() {
    let catalog = catalog();
    let config = CompilerConfig::default();
    let tree = parse(
        r#"{
            "name": "statements",
            "children": [
                { "name": "select", "children": [ { "name": "property", "attrs": { "name": "Status" } } ] }
            ]
        }"#,
    );
    let compiled = PlanQueryCompiler::new(catalog.as_ref(), &config)
        .compile(&scope(&catalog, "Mobile Launch"), &tree)
        .unwrap();

    let executor = Arc::new(ReplayExecutor::new(vec![json!({ "Status": "Open", "Size": 2 })]));
    let runner = QueryRunner::new(executor, catalog.clone(), FormatOptions::default());

    assert!(matches!(
        runner.values(&compiled).await,
        Err(QueryRunError::Format(FormatError::UnknownColumn(column))) if column == "Size"
    ));
    assert!(matches!(
        runner.single_values(&compiled).await,
        Err(QueryRunError::Format(FormatError::ColumnCountMismatch { row_columns: 2, descriptors: 1 }))
    ));
}
