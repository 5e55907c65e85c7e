//! Card catalog configuration.
//!
//! Projects, their property definitions, scopes and users are described in
//! YAML:
//!
//! ```yaml
//! projects:
//!   - id: 1
//!     identifier: alpha
//!     properties:
//!       - { id: 11, name: Status, kind: enumerated }
//!       - { id: 12, name: Size, kind: numeric }
//!       - { id: 13, name: Owner, kind: user }
//!       - { id: 14, name: Estimate, kind: enumerated, numeric: true, column: cp_estimate }
//! scopes:
//!   - { id: 7, name: release_plan, projects: [alpha] }
//! users:
//!   - { login: bob, name: Bob Smith }
//! ```
//!
//! `column` defaults to the card-table naming convention (`cp_<name>`,
//! `cp_<name>_user_id`, ...), `card_table` to `<identifier>_cards`.
use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::errors::CatalogError;
use super::project::{Project, Scope, UserRecord};
use super::property::{default_column_name, PropertyDescriptor, PropertyKind};
use super::schema_lookup::InMemoryCatalog;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    #[serde(default)]
    pub projects: Vec<ProjectConfig>,
    #[serde(default)]
    pub scopes: Vec<ScopeConfig>,
    #[serde(default)]
    pub users: Vec<UserRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    pub id: i64,
    pub identifier: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub card_table: Option<String>,
    #[serde(default)]
    pub properties: Vec<PropertyConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertyConfig {
    pub id: i64,
    pub name: String,
    pub kind: PropertyKindConfig,
    /// Only meaningful for `enumerated` and `formula`
    #[serde(default)]
    pub numeric: bool,
    #[serde(default)]
    pub column: Option<String>,
    #[serde(default = "default_nullable")]
    pub nullable: bool,
}

fn default_nullable() -> bool {
    true
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyKindConfig {
    Text,
    Numeric,
    Date,
    PredefinedDate,
    Formula,
    User,
    Enumerated,
    CardRelationship,
    TreeRelationship,
    CardType,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScopeConfig {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub projects: Vec<String>,
}

impl PropertyConfig {
    fn kind(&self) -> PropertyKind {
        match self.kind {
            PropertyKindConfig::Text => PropertyKind::Text,
            PropertyKindConfig::Numeric => PropertyKind::Numeric,
            PropertyKindConfig::Date => PropertyKind::Date,
            PropertyKindConfig::PredefinedDate => PropertyKind::PredefinedDate,
            PropertyKindConfig::Formula => PropertyKind::Formula {
                numeric: self.numeric,
            },
            PropertyKindConfig::User => PropertyKind::User,
            PropertyKindConfig::Enumerated => PropertyKind::Enumerated {
                numeric: self.numeric,
            },
            PropertyKindConfig::CardRelationship => PropertyKind::CardRelationship,
            PropertyKindConfig::TreeRelationship => PropertyKind::TreeRelationship,
            PropertyKindConfig::CardType => PropertyKind::CardType,
        }
    }

    fn to_descriptor(&self) -> PropertyDescriptor {
        let kind = self.kind();
        let column = self
            .column
            .clone()
            .unwrap_or_else(|| default_column_name(&self.name, kind));
        PropertyDescriptor {
            id: self.id,
            name: self.name.clone(),
            kind,
            column,
            nullable: self.nullable,
        }
    }
}

impl CatalogConfig {
    /// Load catalog configuration from a YAML file
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self, CatalogError> {
        let contents = fs::read_to_string(path).map_err(|e| CatalogError::ConfigReadError {
            error: e.to_string(),
        })?;

        Self::from_yaml_str(&contents)
    }

    /// Parse catalog configuration from YAML string
    pub fn from_yaml_str(yaml: &str) -> Result<Self, CatalogError> {
        serde_yaml::from_str(yaml).map_err(|e| CatalogError::ConfigParseError {
            error: e.to_string(),
        })
    }

    /// Structural checks that do not need the catalog built
    pub fn validate(&self) -> Result<(), CatalogError> {
        let mut seen_ids = HashSet::new();
        for project in &self.projects {
            if project.identifier.trim().is_empty() {
                return Err(CatalogError::InvalidConfig {
                    message: format!("Project {} has an empty identifier", project.id),
                });
            }
            if !seen_ids.insert(project.id) {
                return Err(CatalogError::InvalidConfig {
                    message: format!("Duplicate project id: {}", project.id),
                });
            }
            for property in &project.properties {
                if property.name.trim().is_empty() {
                    return Err(CatalogError::InvalidConfig {
                        message: format!(
                            "Property {} in project '{}' has an empty name",
                            property.id, project.identifier
                        ),
                    });
                }
            }
        }
        Ok(())
    }

    pub fn to_catalog(&self) -> Result<InMemoryCatalog, CatalogError> {
        self.validate()?;

        let mut catalog = InMemoryCatalog::new();
        for project_config in &self.projects {
            let project = Project {
                id: project_config.id,
                identifier: project_config.identifier.clone(),
                name: project_config
                    .name
                    .clone()
                    .unwrap_or_else(|| project_config.identifier.clone()),
                card_table: project_config
                    .card_table
                    .clone()
                    .unwrap_or_else(|| format!("{}_cards", project_config.identifier)),
            };
            catalog.add_project(project)?;
            for property in &project_config.properties {
                catalog.add_property(&project_config.identifier, property.to_descriptor())?;
            }
        }

        for scope in &self.scopes {
            catalog.add_scope(Scope::new(scope.id, scope.name.clone()), scope.projects.clone())?;
        }

        for user in &self.users {
            catalog.add_user(user.clone());
        }

        log::info!(
            "Loaded card catalog: {} projects, {} scopes, {} users",
            self.projects.len(),
            self.scopes.len(),
            self.users.len()
        );
        Ok(catalog)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card_catalog::schema_lookup::SchemaLookup;

    const CATALOG: &str = r#"
projects:
  - id: 1
    identifier: alpha
    name: Alpha
    properties:
      - { id: 11, name: Status, kind: enumerated }
      - { id: 12, name: Estimate, kind: enumerated, numeric: true, column: cp_est }
      - { id: 13, name: Owner, kind: user }
  - id: 2
    identifier: beta
    card_table: beta_card_rows
scopes:
  - { id: 7, name: release_plan, projects: [alpha, beta] }
users:
  - { login: bob, name: Bob Smith }
"#;

    #[test]
    fn test_catalog_from_yaml() {
        let catalog = CatalogConfig::from_yaml_str(CATALOG)
            .unwrap()
            .to_catalog()
            .unwrap();

        let alpha = catalog.project("alpha").unwrap().clone();
        assert_eq!(alpha.name, "Alpha");
        assert_eq!(alpha.card_table, "alpha_cards");
        assert_eq!(catalog.project("beta").unwrap().card_table, "beta_card_rows");

        let status = catalog.resolve(&alpha, "status").unwrap();
        assert_eq!(status.kind, PropertyKind::Enumerated { numeric: false });
        assert_eq!(status.column, "cp_status");

        let estimate = catalog.resolve(&alpha, "estimate").unwrap();
        assert!(estimate.is_numeric());
        assert_eq!(estimate.column, "cp_est");

        let owner = catalog.resolve(&alpha, "owner").unwrap();
        assert_eq!(owner.column, "cp_owner_user_id");

        let scope = catalog.scope("release_plan").unwrap().clone();
        assert_eq!(catalog.list_projects(&scope).len(), 2);
        assert_eq!(catalog.users().len(), 1);
    }

    #[test]
    fn test_unknown_kind_is_parse_error() {
        let yaml = r#"
projects:
  - id: 1
    identifier: alpha
    properties:
      - { id: 1, name: Mood, kind: emoji }
"#;
        assert!(matches!(
            CatalogConfig::from_yaml_str(yaml),
            Err(CatalogError::ConfigParseError { .. })
        ));
    }

    #[test]
    fn test_duplicate_project_id_rejected() {
        let yaml = r#"
projects:
  - { id: 1, identifier: alpha }
  - { id: 1, identifier: beta }
"#;
        let config = CatalogConfig::from_yaml_str(yaml).unwrap();
        assert!(matches!(
            config.validate(),
            Err(CatalogError::InvalidConfig { .. })
        ));
    }
}
