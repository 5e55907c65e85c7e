//! Identifier and literal helpers for ClickHouse SQL

/// Quote a ClickHouse identifier (column name, table name) unless it is
/// made only of ASCII letters, digits and underscores.
///
/// Backslashes and backticks inside the quoted name are escaped.
pub fn quote_identifier(name: &str) -> String {
    let plain = !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if plain {
        name.to_string()
    } else {
        format!("`{}`", name.replace('\\', "\\\\").replace('`', "\\`"))
    }
}

/// Format a qualified column reference: table_alias.column_name
pub fn qualified_column(table_alias: &str, column_name: &str) -> String {
    format!("{}.{}", quote_identifier(table_alias), quote_identifier(column_name))
}

/// Single-quoted string literal with backslash escaping.
pub fn string_literal(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "\\'"))
}

/// Double-quoted output column alias. Aliases keep the spelling used in the
/// query, spaces and parentheses included.
pub fn column_alias(alias: &str) -> String {
    format!("\"{}\"", alias.replace('\\', "\\\\").replace('"', "\\\""))
}
