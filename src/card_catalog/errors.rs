use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum CatalogError {
    #[error("Property '{property}' does not exist in project '{project}'")]
    NoSuchProperty { project: String, property: String },
    #[error("Duplicate project identifier '{identifier}'")]
    DuplicateProject { identifier: String },
    #[error("Duplicate property '{property}' in project '{project}'")]
    DuplicateProperty { project: String, property: String },
    #[error("Scope '{scope}' references unknown project '{project}'")]
    UnknownProject { scope: String, project: String },
    #[error("Failed to read catalog file: {error}")]
    ConfigReadError { error: String },
    #[error("Failed to parse catalog: {error}")]
    ConfigParseError { error: String },
    #[error("Invalid catalog: {message}")]
    InvalidConfig { message: String },
}
