use serde::{Deserialize, Serialize};

/// One independently-structured card table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Project {
    pub id: i64,
    pub identifier: String,
    pub name: String,
    pub card_table: String,
}

impl Project {
    pub fn new(id: i64, identifier: impl Into<String>) -> Self {
        let identifier = identifier.into();
        Self {
            id,
            name: identifier.clone(),
            card_table: format!("{}_cards", identifier),
            identifier,
        }
    }
}

/// A plan: the set of projects one cross-project query runs over.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Scope {
    pub id: i64,
    pub name: String,
}

impl Scope {
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// Team member as known to the user directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub login: String,
    pub name: String,
}
