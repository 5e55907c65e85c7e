//! Per-compilation join accumulator
//!
//! Joins are kept in first-seen order next to a map from canonical key to
//! the alias actually used. Registering the same join twice returns the
//! existing alias. A join whose alias is already taken by a different join is
//! renamed with a sequential suffix, and its own conditions are rewritten to
//! the new alias.

use std::collections::{HashMap, HashSet};

use super::sql_expr::{ColumnRef, OperatorApplication, SqlExpr};
use super::{JoinItems, JoinSpec};

#[derive(Debug, Default)]
pub struct JoinRegistry {
    joins: Vec<JoinSpec>,
    aliases_by_key: HashMap<String, String>,
    used_aliases: HashSet<String>,
}

impl JoinRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `join` unless an identical one exists. Returns the alias callers
    /// must use to reference the joined table.
    pub fn add(&mut self, join: JoinSpec) -> String {
        let key = canonical_key(&join);
        if let Some(alias) = self.aliases_by_key.get(&key) {
            return alias.clone();
        }

        let original_alias = join.table_alias.clone();
        let join = if self.used_aliases.contains(&original_alias) {
            let mut counter = 1;
            let new_alias = loop {
                let candidate = format!("{}_{}", original_alias, counter);
                if !self.used_aliases.contains(&candidate) {
                    break candidate;
                }
                counter += 1;
            };
            log::debug!("Join alias collision: renaming '{}' to '{}'", original_alias, new_alias);
            rename_alias(join, &original_alias, &new_alias)
        } else {
            join
        };

        let alias = join.table_alias.clone();
        log::debug!("Registered join {} AS {}", join.table_name, alias);
        self.used_aliases.insert(alias.clone());
        self.aliases_by_key.insert(key, alias.clone());
        self.joins.push(join);
        alias
    }

    pub fn len(&self) -> usize {
        self.joins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.joins.is_empty()
    }

    pub fn into_join_items(self) -> JoinItems {
        JoinItems(self.joins)
    }
}

fn canonical_key(join: &JoinSpec) -> String {
    format!(
        "{:?}|{}|{}|{:?}",
        join.join_type, join.table_name, join.table_alias, join.joining_on
    )
}

fn rename_alias(mut join: JoinSpec, old_alias: &str, new_alias: &str) -> JoinSpec {
    join.table_alias = new_alias.to_string();
    join.joining_on = join
        .joining_on
        .iter()
        .map(|cond| rewrite_operator_application(cond, old_alias, new_alias))
        .collect();
    join
}

fn rewrite_operator_application(
    op: &OperatorApplication,
    old_alias: &str,
    new_alias: &str,
) -> OperatorApplication {
    OperatorApplication {
        operator: op.operator,
        operands: op
            .operands
            .iter()
            .map(|expr| rewrite_expr(expr, old_alias, new_alias))
            .collect(),
    }
}

fn rewrite_expr(expr: &SqlExpr, old_alias: &str, new_alias: &str) -> SqlExpr {
    match expr {
        SqlExpr::Column(col) if col.table_alias.as_deref() == Some(old_alias) => {
            SqlExpr::Column(ColumnRef {
                table_alias: Some(new_alias.to_string()),
                column: col.column.clone(),
            })
        }
        SqlExpr::OperatorApplicationExp(op) => {
            SqlExpr::OperatorApplicationExp(rewrite_operator_application(op, old_alias, new_alias))
        }
        _ => expr.clone(),
    }
}
