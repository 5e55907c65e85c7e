//! Typed formatting of raw result rows.
//!
//! Each value is formatted according to the descriptor of its column:
//! dates are re-rendered with the caller's date format, numbers are rounded
//! to the caller's precision, user logins become "name (login)" and
//! everything else passes through.

use chrono::{NaiveDate, NaiveDateTime};
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use serde_json::Value;

use super::errors::FormatError;
use super::user_directory::UserDirectory;
use super::Row;
use crate::config::CompilerConfig;
use crate::sql_plan::{ColumnType, SelectColumnDescriptor};

/// Input layouts ClickHouse uses for `Date` and `DateTime` values.
const DATE_INPUT_FORMAT: &str = "%Y-%m-%d";
// %.f also matches a missing fraction.
const DATE_TIME_INPUT_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

#[derive(Debug, Clone, PartialEq)]
pub struct FormatOptions {
    /// strftime pattern for date columns
    pub date_format: String,
    /// decimal places kept for numeric columns
    pub precision: u8,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self::from(&CompilerConfig::default())
    }
}

impl From<&CompilerConfig> for FormatOptions {
    fn from(config: &CompilerConfig) -> Self {
        Self {
            date_format: config.date_format.clone(),
            precision: config.numeric_precision,
        }
    }
}

/// One formatted cell.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Null,
    /// Aggregate over an empty group. Serialises as an empty string.
    NoValue,
    Text(String),
    Raw(Value),
}

impl Serialize for CellValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            CellValue::Null => serializer.serialize_none(),
            CellValue::NoValue => serializer.serialize_str(""),
            CellValue::Text(text) => serializer.serialize_str(text),
            CellValue::Raw(value) => value.serialize(serializer),
        }
    }
}

/// Formatted row keyed by lower-cased column name, in SELECT order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FormattedRow(Vec<(String, CellValue)>);

impl FormattedRow {
    pub fn get(&self, column: &str) -> Option<&CellValue> {
        let key = column.to_lowercase();
        self.0.iter().find(|(name, _)| *name == key).map(|(_, value)| value)
    }

    pub fn iter(&self) -> impl Iterator<Item = &(String, CellValue)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for FormattedRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, value) in &self.0 {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

pub struct ResultFormatter<'a> {
    users: &'a dyn UserDirectory,
    options: &'a FormatOptions,
}

impl<'a> ResultFormatter<'a> {
    pub fn new(users: &'a dyn UserDirectory, options: &'a FormatOptions) -> Self {
        Self { users, options }
    }

    /// Formats a row by column name. Row keys and descriptor names are
    /// matched case-insensitively.
    pub fn format_row(
        &self,
        row: &Row,
        columns: &[SelectColumnDescriptor],
    ) -> Result<FormattedRow, FormatError> {
        let mut cells = Vec::with_capacity(row.len());
        for (name, value) in row {
            let column = columns
                .iter()
                .find(|c| c.name.eq_ignore_ascii_case(name))
                .ok_or_else(|| FormatError::UnknownColumn(name.clone()))?;
            cells.push((name.to_lowercase(), self.format_value(value, column)));
        }
        Ok(FormattedRow(cells))
    }

    /// Formats a row by position: the i-th value uses `columns[i]`.
    pub fn format_positional(
        &self,
        row: &Row,
        columns: &[SelectColumnDescriptor],
    ) -> Result<Vec<CellValue>, FormatError> {
        if row.len() != columns.len() {
            return Err(FormatError::ColumnCountMismatch {
                row_columns: row.len(),
                descriptors: columns.len(),
            });
        }
        Ok(row
            .values()
            .zip(columns)
            .map(|(value, column)| self.format_value(value, column))
            .collect())
    }

    pub fn format_value(&self, value: &Value, column: &SelectColumnDescriptor) -> CellValue {
        if let Some(aggregate) = &column.aggregate {
            if value.is_null() {
                return if aggregate.function.preserves_null() {
                    CellValue::Null
                } else {
                    CellValue::NoValue
                };
            }
            return self.format_numeric(value);
        }

        if value.is_null() {
            return CellValue::Null;
        }
        match column.column_type {
            ColumnType::Date => self.format_date(value, &column.name),
            ColumnType::Numeric | ColumnType::Aggregate => self.format_numeric(value),
            ColumnType::User => self.format_user(value),
            ColumnType::Plain => CellValue::Raw(value.clone()),
        }
    }

    fn format_date(&self, value: &Value, column: &str) -> CellValue {
        let Some(text) = value.as_str() else {
            return CellValue::Raw(value.clone());
        };
        let date = NaiveDate::parse_from_str(text, DATE_INPUT_FORMAT).ok().or_else(|| {
            DATE_TIME_INPUT_FORMATS
                .iter()
                .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
                .map(|date_time| date_time.date())
        });
        match date {
            Some(date) => CellValue::Text(date.format(&self.options.date_format).to_string()),
            None => {
                log::warn!("Column '{}': cannot read '{}' as a date", column, text);
                CellValue::Raw(value.clone())
            }
        }
    }

    fn format_numeric(&self, value: &Value) -> CellValue {
        let number = match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        match number {
            Some(n) if n.is_finite() => CellValue::Text(format_number(n, self.options.precision)),
            _ => CellValue::Raw(value.clone()),
        }
    }

    fn format_user(&self, value: &Value) -> CellValue {
        let Some(login) = value.as_str() else {
            return CellValue::Raw(value.clone());
        };
        match self.users.find_by_login(login) {
            Some(user) => CellValue::Text(format!("{} ({})", user.name, user.login)),
            None => {
                log::debug!("No user with login '{}'", login);
                CellValue::Null
            }
        }
    }
}

/// Rounds to `precision` decimals and drops trailing zeros.
pub fn format_number(value: f64, precision: u8) -> String {
    let mut text = format!("{:.*}", precision as usize, value);
    if text.contains('.') {
        let trimmed = text.trim_end_matches('0').trim_end_matches('.').len();
        text.truncate(trimmed);
    }
    if text == "-0" {
        text = "0".to_string();
    }
    text
}
