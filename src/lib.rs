//! CardQuery - cross-project card queries over ClickHouse
//!
//! This crate compiles an MQL query tree that spans every project of a plan
//! into a single SQL statement:
//! - Syntax validation of the incoming tree
//! - Per-project schema resolution and type-directed comparison rewriting
//! - A UNION ALL of per-project statements with aggregation re-applied on top
//! - Execution on ClickHouse and typed result formatting

/// Debug print macro that only compiles in debug builds.
/// In release builds, this expands to nothing, so there's zero runtime cost.
#[macro_export]
macro_rules! debug_print {
    ($($arg:tt)*) => {
        #[cfg(debug_assertions)]
        eprintln!($($arg)*);
    };
}

pub mod card_catalog;
pub mod config;
pub mod query_runner;
pub mod query_tree;
pub mod query_validator;
pub mod sql_generator;
pub mod sql_plan;
