//! Integration tests - the full pipeline from a YAML catalog and a JSON query
//! tree to formatted rows.
//!
//! ClickHouse is replaced by an in-memory executor that records the SQL it
//! receives and replays canned rows.

mod cross_project_query_tests;
