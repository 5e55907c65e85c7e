use std::fmt;

use serde::{Deserialize, Serialize};

/// Closed set of property definition kinds a project schema can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PropertyKind {
    /// Free text property
    Text,
    /// Free number property
    Numeric,
    /// User-defined date property
    Date,
    /// `created_on` / `modified_on`: timestamp storage, date semantics
    PredefinedDate,
    /// Computed from other properties. `numeric` is its aggregate eligibility
    Formula { numeric: bool },
    /// Team member reference, stored as a user id
    User,
    /// Managed list of values. Text-backed lists join the enumeration table
    Enumerated { numeric: bool },
    /// Card reference, stored as a card id
    CardRelationship,
    /// Tree relationship, stored as a card id
    TreeRelationship,
    /// The card's type, stored by name
    CardType,
}

/// Column type in the project's card table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StorageType {
    Text,
    Numeric,
    Date,
    Timestamp,
    /// Foreign key to users or cards
    Integer,
}

impl fmt::Display for StorageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StorageType::Text => "char",
            StorageType::Numeric => "number",
            StorageType::Date => "date",
            StorageType::Timestamp => "timestamp",
            StorageType::Integer => "integer",
        };
        write!(f, "{}", s)
    }
}

impl PropertyKind {
    pub fn storage_type(&self) -> StorageType {
        match self {
            PropertyKind::Text | PropertyKind::CardType => StorageType::Text,
            PropertyKind::Numeric => StorageType::Numeric,
            PropertyKind::Date => StorageType::Date,
            PropertyKind::PredefinedDate => StorageType::Timestamp,
            PropertyKind::Formula { numeric: true } => StorageType::Numeric,
            PropertyKind::Formula { numeric: false } => StorageType::Date,
            PropertyKind::User
            | PropertyKind::CardRelationship
            | PropertyKind::TreeRelationship => StorageType::Integer,
            PropertyKind::Enumerated { numeric: true } => StorageType::Numeric,
            PropertyKind::Enumerated { numeric: false } => StorageType::Text,
        }
    }

    /// Aggregate eligibility.
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            PropertyKind::Numeric
                | PropertyKind::Formula { numeric: true }
                | PropertyKind::Enumerated { numeric: true }
        )
    }

    pub fn is_relationship(&self) -> bool {
        matches!(
            self,
            PropertyKind::CardRelationship | PropertyKind::TreeRelationship
        )
    }

    /// Kind name without the numeric flag. Two projects agree on a property
    /// when their class names and numeric-ness both match.
    pub fn class_name(&self) -> &'static str {
        match self {
            PropertyKind::Text => "text",
            PropertyKind::Numeric => "numeric",
            PropertyKind::Date => "date",
            PropertyKind::PredefinedDate => "predefined date",
            PropertyKind::Formula { .. } => "formula",
            PropertyKind::User => "user",
            PropertyKind::Enumerated { .. } => "enumerated",
            PropertyKind::CardRelationship => "card relationship",
            PropertyKind::TreeRelationship => "tree relationship",
            PropertyKind::CardType => "card type",
        }
    }
}

impl fmt::Display for PropertyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyKind::Formula { numeric: true } | PropertyKind::Enumerated { numeric: true } => {
                write!(f, "numeric {}", self.class_name())
            }
            _ => write!(f, "{}", self.class_name()),
        }
    }
}

/// Per-project metadata for one property definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyDescriptor {
    /// Property definition id, used by the enumeration-values join
    pub id: i64,
    pub name: String,
    pub kind: PropertyKind,
    /// Column in the project's card table
    pub column: String,
    pub nullable: bool,
}

impl PropertyDescriptor {
    pub fn new(id: i64, name: impl Into<String>, kind: PropertyKind, column: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            kind,
            column: column.into(),
            nullable: true,
        }
    }

    /// Synthetic card-number column counted by `COUNT(*)`.
    pub fn card_number() -> Self {
        Self {
            id: 0,
            name: "number".to_string(),
            kind: PropertyKind::Numeric,
            column: "number".to_string(),
            nullable: false,
        }
    }

    pub fn is_numeric(&self) -> bool {
        self.kind.is_numeric()
    }

    pub fn storage_type(&self) -> StorageType {
        self.kind.storage_type()
    }

    /// Consistency check used when one property name spans several projects.
    pub fn agrees_with(&self, other: &PropertyDescriptor) -> bool {
        self.kind.class_name() == other.kind.class_name() && self.is_numeric() == other.is_numeric()
    }
}

/// Default card-table column for a property of the given kind.
pub fn default_column_name(name: &str, kind: PropertyKind) -> String {
    let base: String = name
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    match kind {
        PropertyKind::CardType => "card_type_name".to_string(),
        PropertyKind::PredefinedDate => base,
        PropertyKind::User => format!("cp_{}_user_id", base),
        PropertyKind::CardRelationship | PropertyKind::TreeRelationship => {
            format!("cp_{}_card_id", base)
        }
        _ => format!("cp_{}", base),
    }
}
