//! Unit tests for loading a card catalog from YAML and resolving property
//! types against it.

#[cfg(test)]
mod catalog_config_tests {
    use std::io::Write;

    use cardquery::card_catalog::{
        CatalogConfig, CatalogError, PropertyKind, PropertyTypeResolver, SchemaLookup,
        SemanticType, SqlDataType,
    };

    const CATALOG: &str = r#"
projects:
  - id: 1
    identifier: web
    properties:
      - { id: 1, name: Status, kind: enumerated }
      - { id: 2, name: Story Points, kind: enumerated, numeric: true }
      - { id: 3, name: Created On, kind: predefined_date, column: created_at }
      - { id: 4, name: Velocity, kind: formula, numeric: true }
      - { id: 5, name: Epic, kind: tree_relationship }
  - id: 2
    identifier: mobile
    properties:
      - { id: 21, name: Status, kind: enumerated }
scopes:
  - { id: 9, name: Q3 Release, projects: [web, mobile] }
users:
  - { login: ana, name: Ana Lima }
"#;

    fn load() -> cardquery::card_catalog::InMemoryCatalog {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(CATALOG.as_bytes()).unwrap();
        CatalogConfig::from_yaml_file(file.path())
            .unwrap()
            .to_catalog()
            .unwrap()
    }

    #[test]
    fn test_catalog_file_loads_projects_and_scopes() {
        let catalog = load();

        let scope = catalog.scope("q3 release").unwrap().clone();
        let identifiers: Vec<String> = catalog
            .list_projects(&scope)
            .into_iter()
            .map(|project| project.identifier)
            .collect();
        assert_eq!(identifiers, vec!["web", "mobile"]);
        assert_eq!(catalog.users()[0].login, "ana");
    }

    #[test]
    fn test_default_columns_follow_card_table_naming() {
        let catalog = load();
        let web = catalog.project("web").unwrap().clone();

        assert_eq!(catalog.resolve(&web, "story points").unwrap().column, "cp_story_points");
        assert_eq!(catalog.resolve(&web, "Epic").unwrap().column, "cp_epic_card_id");
        assert_eq!(catalog.resolve(&web, "created on").unwrap().column, "created_at");
    }

    #[test]
    fn test_resolved_types() {
        let catalog = load();
        let web = catalog.project("web").unwrap().clone();
        let resolver = PropertyTypeResolver::new(&catalog, &web);

        let points = resolver.resolve("Story Points").unwrap();
        assert_eq!(points.kind(), PropertyKind::Enumerated { numeric: true });
        assert_eq!(points.semantic, SemanticType::Numeric);

        let created = resolver.resolve("Created On").unwrap();
        assert_eq!(created.semantic, SemanticType::Date);
        assert_eq!(created.sql_data_type(), SqlDataType::Timestamp);

        let velocity = resolver.resolve("velocity").unwrap();
        assert_eq!(velocity.semantic, SemanticType::Date);
        assert!(velocity.descriptor.is_numeric());

        assert!(resolver.is_property("STATUS"));
        assert_eq!(
            resolver.resolve("Iteration"),
            Err(CatalogError::NoSuchProperty {
                project: "web".to_string(),
                property: "Iteration".to_string(),
            })
        );
    }

    #[test]
    fn test_scope_with_unknown_project_is_rejected() {
        let yaml = r#"
projects:
  - { id: 1, identifier: web }
scopes:
  - { id: 9, name: Q3, projects: [web, desktop] }
"#;
        let result = CatalogConfig::from_yaml_str(yaml).unwrap().to_catalog();
        assert!(matches!(
            result,
            Err(CatalogError::UnknownProject { project, .. }) if project == "desktop"
        ));
    }

    #[test]
    fn test_missing_file_is_read_error() {
        assert!(matches!(
            CatalogConfig::from_yaml_file("/nonexistent/catalog.yaml"),
            Err(CatalogError::ConfigReadError { .. })
        ));
    }
}
