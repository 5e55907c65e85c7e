//! Project schemas as seen by the compiler: property descriptors, projects,
//! scopes, the `SchemaLookup` seam and property type resolution.

pub mod catalog_config;
pub mod errors;
pub mod project;
pub mod property;
pub mod schema_lookup;
pub mod type_resolver;

pub use catalog_config::CatalogConfig;
pub use errors::CatalogError;
pub use project::{Project, Scope, UserRecord};
pub use property::{PropertyDescriptor, PropertyKind, StorageType};
pub use schema_lookup::{InMemoryCatalog, SchemaLookup};
pub use type_resolver::{PropertyTypeResolver, ResolvedProperty, SemanticType, SqlDataType};
