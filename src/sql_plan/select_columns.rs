use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::card_catalog::{ResolvedProperty, SemanticType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AggregateFunction {
    Avg,
    Count,
    Max,
    Min,
    Sum,
}

impl AggregateFunction {
    /// `min`/`max` of an empty group stay null when formatted; the others
    /// collapse to "no value".
    pub fn preserves_null(&self) -> bool {
        matches!(self, AggregateFunction::Min | AggregateFunction::Max)
    }
}

impl FromStr for AggregateFunction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "avg" => Ok(AggregateFunction::Avg),
            "count" => Ok(AggregateFunction::Count),
            "max" => Ok(AggregateFunction::Max),
            "min" => Ok(AggregateFunction::Min),
            "sum" => Ok(AggregateFunction::Sum),
            other => Err(format!("unknown aggregate function '{}'", other)),
        }
    }
}

impl fmt::Display for AggregateFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AggregateFunction::Avg => "avg",
            AggregateFunction::Count => "count",
            AggregateFunction::Max => "max",
            AggregateFunction::Min => "min",
            AggregateFunction::Sum => "sum",
        };
        write!(f, "{}", s)
    }
}

/// How values of an output column are formatted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnType {
    Numeric,
    Date,
    User,
    Aggregate,
    Plain,
}

impl From<SemanticType> for ColumnType {
    fn from(semantic: SemanticType) -> Self {
        match semantic {
            SemanticType::Numeric => ColumnType::Numeric,
            SemanticType::Date => ColumnType::Date,
            SemanticType::User => ColumnType::User,
            SemanticType::Char | SemanticType::Number | SemanticType::Timestamp => {
                ColumnType::Plain
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateColumn {
    pub function: AggregateFunction,
    /// `None` for `count(*)`
    pub property: Option<String>,
}

/// Description of one output column, in SELECT order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectColumnDescriptor {
    pub name: String,
    pub column_type: ColumnType,
    pub aggregate: Option<AggregateColumn>,
}

impl SelectColumnDescriptor {
    pub fn property(name: impl Into<String>, property: &ResolvedProperty) -> Self {
        Self {
            name: name.into(),
            column_type: property.semantic.into(),
            aggregate: None,
        }
    }

    pub fn aggregate(name: impl Into<String>, function: AggregateFunction, property: Option<String>) -> Self {
        Self {
            name: name.into(),
            column_type: ColumnType::Aggregate,
            aggregate: Some(AggregateColumn { function, property }),
        }
    }

    pub fn is_aggregate(&self) -> bool {
        self.aggregate.is_some()
    }
}

/// Display alias of an aggregate column: `count(*)`, `sum(Size)`.
pub fn aggregate_alias(function: AggregateFunction, property: Option<&str>) -> String {
    format!("{}({})", function, property.unwrap_or("*"))
}
