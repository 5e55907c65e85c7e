//! Property type resolution
//!
//! Each property reference is classified twice:
//! - **semantic type** drives literal conversion and result formatting
//! - **storage type** is the column type in the card table and drives SQL
//!
//! The two are exposed independently. Predefined dates (`created_on`,
//! `modified_on`) are stored as timestamps but formatted as dates.
//!
//! Formula properties always resolve to the date semantic type, numeric
//! formulas included, because the numeric branch only looks at free and
//! managed number properties. Numeric formulas stay aggregate-eligible
//! through `PropertyKind::is_numeric`.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::errors::CatalogError;
use super::project::Project;
use super::property::{PropertyDescriptor, PropertyKind, StorageType};
use super::schema_lookup::SchemaLookup;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SemanticType {
    Numeric,
    Date,
    User,
    Char,
    Number,
    Timestamp,
}

impl fmt::Display for SemanticType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SemanticType::Numeric => "numeric",
            SemanticType::Date => "date",
            SemanticType::User => "user",
            SemanticType::Char => "char",
            SemanticType::Number => "number",
            SemanticType::Timestamp => "timestamp",
        };
        write!(f, "{}", s)
    }
}

/// Type of the value a column yields once rewritten into SQL (after joins
/// replace ids with logins or card names).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SqlDataType {
    Text,
    Numeric,
    Date,
    Timestamp,
}

impl fmt::Display for SqlDataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SqlDataType::Text => "text",
            SqlDataType::Numeric => "numeric",
            SqlDataType::Date => "date",
            SqlDataType::Timestamp => "timestamp",
        };
        write!(f, "{}", s)
    }
}

pub fn semantic_type(kind: PropertyKind) -> SemanticType {
    match kind {
        PropertyKind::Numeric | PropertyKind::Enumerated { numeric: true } => SemanticType::Numeric,
        PropertyKind::Date | PropertyKind::PredefinedDate | PropertyKind::Formula { .. } => {
            SemanticType::Date
        }
        PropertyKind::User => SemanticType::User,
        other => match other.storage_type() {
            StorageType::Numeric | StorageType::Integer => SemanticType::Number,
            StorageType::Timestamp => SemanticType::Timestamp,
            StorageType::Date => SemanticType::Date,
            StorageType::Text => SemanticType::Char,
        },
    }
}

/// A property descriptor together with its resolved types.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedProperty {
    pub descriptor: Arc<PropertyDescriptor>,
    pub semantic: SemanticType,
    pub storage: StorageType,
}

impl ResolvedProperty {
    pub fn new(descriptor: Arc<PropertyDescriptor>) -> Self {
        let semantic = semantic_type(descriptor.kind);
        let storage = descriptor.storage_type();
        Self {
            descriptor,
            semantic,
            storage,
        }
    }

    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    pub fn kind(&self) -> PropertyKind {
        self.descriptor.kind
    }

    pub fn column(&self) -> &str {
        &self.descriptor.column
    }

    pub fn sql_data_type(&self) -> SqlDataType {
        match self.storage {
            StorageType::Numeric => SqlDataType::Numeric,
            StorageType::Date => SqlDataType::Date,
            StorageType::Timestamp => SqlDataType::Timestamp,
            StorageType::Text | StorageType::Integer => SqlDataType::Text,
        }
    }
}

/// Resolves property names against one project's schema.
pub struct PropertyTypeResolver<'a> {
    lookup: &'a dyn SchemaLookup,
    project: &'a Project,
}

impl<'a> PropertyTypeResolver<'a> {
    pub fn new(lookup: &'a dyn SchemaLookup, project: &'a Project) -> Self {
        Self { lookup, project }
    }

    pub fn resolve(&self, property: &str) -> Result<ResolvedProperty, CatalogError> {
        self.lookup
            .resolve(self.project, property)
            .map(ResolvedProperty::new)
            .ok_or_else(|| CatalogError::NoSuchProperty {
                project: self.project.name.clone(),
                property: property.to_string(),
            })
    }

    /// True when `name` is a property of this project. Used for
    /// "did you mean the property?" hints.
    pub fn is_property(&self, name: &str) -> bool {
        self.lookup.resolve(self.project, name).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card_catalog::schema_lookup::InMemoryCatalog;
    use test_case::test_case;

    #[test_case(PropertyKind::Numeric, SemanticType::Numeric, StorageType::Numeric ; "free number")]
    #[test_case(PropertyKind::Enumerated { numeric: true }, SemanticType::Numeric, StorageType::Numeric ; "managed number")]
    #[test_case(PropertyKind::Date, SemanticType::Date, StorageType::Date ; "date")]
    #[test_case(PropertyKind::PredefinedDate, SemanticType::Date, StorageType::Timestamp ; "predefined date")]
    #[test_case(PropertyKind::Formula { numeric: true }, SemanticType::Date, StorageType::Numeric ; "numeric formula resolves to date")]
    #[test_case(PropertyKind::Formula { numeric: false }, SemanticType::Date, StorageType::Date ; "date formula")]
    #[test_case(PropertyKind::User, SemanticType::User, StorageType::Integer ; "user")]
    #[test_case(PropertyKind::Enumerated { numeric: false }, SemanticType::Char, StorageType::Text ; "managed text")]
    #[test_case(PropertyKind::CardRelationship, SemanticType::Number, StorageType::Integer ; "card relationship")]
    #[test_case(PropertyKind::CardType, SemanticType::Char, StorageType::Text ; "card type")]
    fn test_type_mapping(kind: PropertyKind, semantic: SemanticType, storage: StorageType) {
        let resolved = ResolvedProperty::new(Arc::new(PropertyDescriptor::new(1, "p", kind, "cp_p")));
        assert_eq!(resolved.semantic, semantic);
        assert_eq!(resolved.storage, storage);
    }

    #[test]
    fn test_resolver_reports_missing_property() {
        let mut catalog = InMemoryCatalog::new();
        catalog.add_project(Project::new(1, "alpha")).unwrap();
        catalog
            .add_property("alpha", PropertyDescriptor::new(3, "Size", PropertyKind::Numeric, "cp_size"))
            .unwrap();
        let project = catalog.project("alpha").unwrap().clone();
        let resolver = PropertyTypeResolver::new(&catalog, &project);

        assert_eq!(resolver.resolve("size").unwrap().column(), "cp_size");
        assert!(resolver.is_property("SIZE"));
        assert_eq!(
            resolver.resolve("status"),
            Err(CatalogError::NoSuchProperty {
                project: "alpha".to_string(),
                property: "status".to_string(),
            })
        );
    }
}
