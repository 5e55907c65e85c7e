use thiserror::Error;

/// Failures raised while validating or compiling a cross-project query.
///
/// Every variant is raised before any SQL is rendered.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CompileError {
    #[error("{message}")]
    SyntaxUnsupported { construct: String, message: String },

    #[error("Plan '{scope}' must be associated with at least one project")]
    NoScopeAssociation { scope: String },

    #[error("Property '{property}' does not exist in project(s) {}", .projects.join(", "))]
    PropertyMissing {
        property: String,
        projects: Vec<String>,
    },

    #[error(
        "Property '{property}' is defined differently in projects '{first_project}' and '{second_project}'"
    )]
    PropertyTypeMismatch {
        property: String,
        first_project: String,
        second_project: String,
    },

    #[error("{function} cannot be applied to non-numeric property '{property}'")]
    NonNumericAggregateTarget { function: String, property: String },

    #[error("Operator '{operator}' cannot be used with property '{property}' ({property_type})")]
    OperatorNotAllowedForType {
        property: String,
        operator: String,
        property_type: String,
    },

    #[error(
        "'{value}' is not a valid {expected} value for property '{property}'.{}",
        .hint.as_ref().map(|h| format!(" {}", h)).unwrap_or_default()
    )]
    ValueTypeMismatch {
        property: String,
        value: String,
        expected: String,
        hint: Option<String>,
    },

    #[error(
        "Cannot compare property '{left}' ({left_type}) with property '{right}' ({right_type})"
    )]
    ColumnTypeMismatchAcrossComparison {
        left: String,
        right: String,
        left_type: String,
        right_type: String,
    },

    #[error("Malformed query tree: {0}")]
    MalformedTree(String),
}

impl CompileError {
    pub fn unsupported(construct: &str) -> Self {
        CompileError::SyntaxUnsupported {
            construct: construct.to_string(),
            message: format!("{} is not supported in cross-project queries", construct),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_offenders() {
        let missing = CompileError::PropertyMissing {
            property: "size".to_string(),
            projects: vec!["beta".to_string(), "gamma".to_string()],
        };
        assert_eq!(
            missing.to_string(),
            "Property 'size' does not exist in project(s) beta, gamma"
        );

        let hinted = CompileError::ValueTypeMismatch {
            property: "Size".to_string(),
            value: "estimate".to_string(),
            expected: "numeric".to_string(),
            hint: Some("Did you mean PROPERTY estimate?".to_string()),
        };
        assert_eq!(
            hinted.to_string(),
            "'estimate' is not a valid numeric value for property 'Size'. Did you mean PROPERTY estimate?"
        );

        assert!(CompileError::unsupported("DISTINCT")
            .to_string()
            .contains("DISTINCT"));
    }
}
