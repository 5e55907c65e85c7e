use serde::{Deserialize, Serialize};
use std::env;
use thiserror::Error;
use validator::{Validate, ValidationError};

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),

    #[error("Parse error for {field}: {value} - {source}")]
    Parse {
        field: String,
        value: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

/// Names of the shared tables the generated SQL joins against
#[derive(Clone, Debug, PartialEq, Validate, Serialize, Deserialize)]
#[serde(default)]
pub struct TableNames {
    #[validate(length(min = 1, message = "Users table cannot be empty"))]
    pub users: String,

    /// Managed-list values, keyed by (property_definition_id, value)
    #[validate(length(min = 1, message = "Enumeration values table cannot be empty"))]
    pub enumeration_values: String,

    /// Card types, keyed by (project_id, name)
    #[validate(length(min = 1, message = "Card types table cannot be empty"))]
    pub card_types: String,

    /// Cards assigned to a plan, keyed by (plan_id, project_id, card_id)
    #[validate(length(min = 1, message = "Scope membership table cannot be empty"))]
    pub scope_membership: String,

    /// Alias of the derived table holding the per-project UNION ALL
    #[validate(length(min = 1, message = "Union alias cannot be empty"))]
    pub union_alias: String,
}

impl Default for TableNames {
    fn default() -> Self {
        Self {
            users: "users".to_string(),
            enumeration_values: "enumeration_values".to_string(),
            card_types: "card_types".to_string(),
            scope_membership: "plan_cards".to_string(),
            union_alias: "union_results".to_string(),
        }
    }
}

/// Compiler and formatter configuration with validation
#[derive(Clone, Debug, PartialEq, Validate, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    /// strftime format used when displaying date values
    #[validate(
        length(min = 1, message = "Date format cannot be empty"),
        custom(function = "validate_date_format")
    )]
    pub date_format: String,

    /// Decimal places kept when displaying numeric values (0-10)
    #[validate(range(max = 10, message = "Numeric precision must be between 0 and 10"))]
    pub numeric_precision: u8,

    /// Formats accepted for date literals in comparisons
    #[validate(length(min = 1, message = "At least one literal date format is required"))]
    pub literal_date_formats: Vec<String>,

    #[validate(nested)]
    pub tables: TableNames,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            date_format: "%d %b %Y".to_string(),
            numeric_precision: 2,
            literal_date_formats: vec![
                "%Y-%m-%d".to_string(),
                "%d %b %Y".to_string(),
                "%d %B %Y".to_string(),
                "%d/%m/%Y".to_string(),
            ],
            tables: TableNames::default(),
        }
    }
}

impl CompilerConfig {
    /// Create configuration from environment variables with validation
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let tables = TableNames {
            users: env::var("CARDQUERY_USERS_TABLE").unwrap_or(defaults.tables.users),
            scope_membership: env::var("CARDQUERY_SCOPE_MEMBERSHIP_TABLE")
                .unwrap_or(defaults.tables.scope_membership),
            ..defaults.tables
        };
        let config = Self {
            date_format: env::var("CARDQUERY_DATE_FORMAT").unwrap_or(defaults.date_format),
            numeric_precision: parse_env_var("CARDQUERY_NUMERIC_PRECISION", "2")?,
            literal_date_formats: defaults.literal_date_formats,
            tables,
        };

        config.validate()?;
        Ok(config)
    }

    /// Create configuration from YAML file. Missing keys take their defaults.
    pub fn from_yaml_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Parse {
            field: "yaml_file".to_string(),
            value: "file read failed".to_string(),
            source: Box::new(e),
        })?;

        let config: Self = serde_yaml::from_str(&content).map_err(|e| ConfigError::Parse {
            field: "yaml_content".to_string(),
            value: content,
            source: Box::new(e),
        })?;

        config.validate()?;
        Ok(config)
    }
}

fn validate_date_format(format: &str) -> Result<(), ValidationError> {
    use chrono::format::{Item, StrftimeItems};

    if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
        return Err(ValidationError::new("invalid_date_format"));
    }
    Ok(())
}

/// Parse an environment variable with a default value
fn parse_env_var<T: std::str::FromStr>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let value = env::var(key).unwrap_or_else(|_| default.to_string());
    value.parse().map_err(|e| ConfigError::Parse {
        field: key.to_string(),
        value,
        source: Box::new(e),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;

    fn clear_env() {
        for key in [
            "CARDQUERY_DATE_FORMAT",
            "CARDQUERY_NUMERIC_PRECISION",
            "CARDQUERY_USERS_TABLE",
            "CARDQUERY_SCOPE_MEMBERSHIP_TABLE",
        ] {
            env::remove_var(key);
        }
    }

    #[test]
    fn test_default_config() {
        let config = CompilerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.numeric_precision, 2);
        assert_eq!(config.tables.union_alias, "union_results");
    }

    #[test]
    fn test_invalid_precision() {
        let config = CompilerConfig {
            numeric_precision: 11,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_date_format() {
        let config = CompilerConfig {
            date_format: "%Q %d".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_table_name() {
        let config = CompilerConfig {
            tables: TableNames {
                users: "".to_string(),
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    #[serial]
    fn test_from_env_overrides() {
        clear_env();
        env::set_var("CARDQUERY_NUMERIC_PRECISION", "4");
        env::set_var("CARDQUERY_USERS_TABLE", "team_members");

        let config = CompilerConfig::from_env().unwrap();
        assert_eq!(config.numeric_precision, 4);
        assert_eq!(config.tables.users, "team_members");
        assert_eq!(config.date_format, "%d %b %Y");
        clear_env();
    }

    #[test]
    #[serial]
    fn test_from_env_rejects_bad_precision() {
        clear_env();
        env::set_var("CARDQUERY_NUMERIC_PRECISION", "two");
        assert!(matches!(
            CompilerConfig::from_env(),
            Err(ConfigError::Parse { .. })
        ));

        env::set_var("CARDQUERY_NUMERIC_PRECISION", "12");
        assert!(matches!(
            CompilerConfig::from_env(),
            Err(ConfigError::Validation(_))
        ));
        clear_env();
    }

    #[test]
    fn test_from_yaml_file_fills_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "date_format: \"%Y/%m/%d\"\ntables:\n  users: people").unwrap();

        let config = CompilerConfig::from_yaml_file(file.path()).unwrap();
        assert_eq!(config.date_format, "%Y/%m/%d");
        assert_eq!(config.tables.users, "people");
        assert_eq!(config.tables.card_types, "card_types");
        assert_eq!(config.numeric_precision, 2);
    }
}
