//! Unit tests - public API checks that need no database
//!
//! Each file covers one component through the crate's public surface.

mod catalog_config_tests;
mod query_tree_tests;
mod syntax_validator_tests;
