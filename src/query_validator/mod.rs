//! Syntax checks that run before any schema lookup.

pub mod syntax_validator;

pub use syntax_validator::SyntaxValidator;
