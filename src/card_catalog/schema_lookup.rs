use std::collections::HashMap;
use std::sync::Arc;

use super::errors::CatalogError;
use super::project::{Project, Scope, UserRecord};
use super::property::PropertyDescriptor;

/// Read-only view of project schemas handed to the compiler.
///
/// Implementations must return the same answers for the duration of one
/// compilation.
pub trait SchemaLookup {
    /// Property definition by name, matched case-insensitively.
    fn resolve(&self, project: &Project, property: &str) -> Option<Arc<PropertyDescriptor>>;

    /// Projects participating in a scope, in a stable order.
    fn list_projects(&self, scope: &Scope) -> Vec<Project>;
}

#[derive(Debug, Clone)]
struct ProjectSchema {
    project: Project,
    properties: HashMap<String, Arc<PropertyDescriptor>>,
}

/// Schema snapshot held in memory, usually built from a YAML catalog.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    projects: Vec<ProjectSchema>,
    scopes: HashMap<String, (Scope, Vec<String>)>,
    users: Vec<UserRecord>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_project(&mut self, project: Project) -> Result<(), CatalogError> {
        if self.project(&project.identifier).is_some() {
            return Err(CatalogError::DuplicateProject {
                identifier: project.identifier,
            });
        }
        self.projects.push(ProjectSchema {
            project,
            properties: HashMap::new(),
        });
        Ok(())
    }

    pub fn add_property(
        &mut self,
        project_identifier: &str,
        descriptor: PropertyDescriptor,
    ) -> Result<(), CatalogError> {
        let schema = self
            .projects
            .iter_mut()
            .find(|p| p.project.identifier.eq_ignore_ascii_case(project_identifier))
            .ok_or_else(|| CatalogError::InvalidConfig {
                message: format!("Unknown project '{}'", project_identifier),
            })?;

        let key = descriptor.name.to_lowercase();
        if schema.properties.contains_key(&key) {
            return Err(CatalogError::DuplicateProperty {
                project: schema.project.identifier.clone(),
                property: descriptor.name,
            });
        }
        schema.properties.insert(key, Arc::new(descriptor));
        Ok(())
    }

    pub fn add_scope(&mut self, scope: Scope, project_identifiers: Vec<String>) -> Result<(), CatalogError> {
        for identifier in &project_identifiers {
            if self.project(identifier).is_none() {
                return Err(CatalogError::UnknownProject {
                    scope: scope.name.clone(),
                    project: identifier.clone(),
                });
            }
        }
        self.scopes
            .insert(scope.name.to_lowercase(), (scope, project_identifiers));
        Ok(())
    }

    pub fn add_user(&mut self, user: UserRecord) {
        self.users.push(user);
    }

    pub fn project(&self, identifier: &str) -> Option<&Project> {
        self.projects
            .iter()
            .map(|p| &p.project)
            .find(|p| p.identifier.eq_ignore_ascii_case(identifier))
    }

    pub fn scope(&self, name: &str) -> Option<&Scope> {
        self.scopes.get(&name.to_lowercase()).map(|(scope, _)| scope)
    }

    pub fn users(&self) -> &[UserRecord] {
        &self.users
    }
}

impl SchemaLookup for InMemoryCatalog {
    fn resolve(&self, project: &Project, property: &str) -> Option<Arc<PropertyDescriptor>> {
        self.projects
            .iter()
            .find(|p| p.project.id == project.id)
            .and_then(|p| p.properties.get(&property.to_lowercase()).cloned())
    }

    fn list_projects(&self, scope: &Scope) -> Vec<Project> {
        match self.scopes.get(&scope.name.to_lowercase()) {
            Some((_, identifiers)) => identifiers
                .iter()
                .filter_map(|identifier| self.project(identifier).cloned())
                .collect(),
            None => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card_catalog::property::PropertyKind;

    fn catalog() -> InMemoryCatalog {
        let mut catalog = InMemoryCatalog::new();
        catalog.add_project(Project::new(1, "alpha")).unwrap();
        catalog.add_project(Project::new(2, "beta")).unwrap();
        catalog
            .add_property("alpha", PropertyDescriptor::new(10, "Size", PropertyKind::Numeric, "cp_size"))
            .unwrap();
        catalog
            .add_scope(Scope::new(7, "Release Plan"), vec!["beta".into(), "alpha".into()])
            .unwrap();
        catalog
    }

    #[test]
    fn test_resolve_is_case_insensitive() {
        let catalog = catalog();
        let alpha = catalog.project("alpha").unwrap().clone();
        assert!(catalog.resolve(&alpha, "SIZE").is_some());
        assert!(catalog.resolve(&alpha, "status").is_none());

        let beta = catalog.project("beta").unwrap().clone();
        assert!(catalog.resolve(&beta, "size").is_none());
    }

    #[test]
    fn test_list_projects_keeps_scope_order() {
        let catalog = catalog();
        let scope = catalog.scope("release plan").unwrap().clone();
        let names: Vec<String> = catalog
            .list_projects(&scope)
            .into_iter()
            .map(|p| p.identifier)
            .collect();
        assert_eq!(names, vec!["beta", "alpha"]);

        assert!(catalog.list_projects(&Scope::new(99, "unknown")).is_empty());
    }

    #[test]
    fn test_duplicates_rejected() {
        let mut catalog = catalog();
        assert!(matches!(
            catalog.add_project(Project::new(3, "ALPHA")),
            Err(CatalogError::DuplicateProject { .. })
        ));
        assert!(matches!(
            catalog.add_property("alpha", PropertyDescriptor::new(11, "size", PropertyKind::Text, "cp_size2")),
            Err(CatalogError::DuplicateProperty { .. })
        ));
        assert!(matches!(
            catalog.add_scope(Scope::new(8, "other"), vec!["gamma".into()]),
            Err(CatalogError::UnknownProject { .. })
        ));
    }
}
