//! Property binding and SQL column rewrites.
//!
//! `bind_rules` turns `property` references into `column` nodes carrying the
//! resolved property. `sql_column_rules` later turns those into
//! `sql_column { table, column }` nodes, registering the joins needed to
//! reach displayable values:
//!
//! | property kind            | joined table          | selected      |
//! |--------------------------|-----------------------|---------------|
//! | user                     | users (by id)         | `login`       |
//! | card / tree relationship | project cards (by id) | `name`        |
//! | position of managed text | enumeration values    | `position`    |
//! | position of card type    | card types            | `position`    |
//!
//! A `join[kind=scope]` marker registers the plan membership join.

use std::sync::Arc;

use super::errors::CompileError;
use super::join_registry::JoinRegistry;
use super::sql_expr::{col_eq, col_eq_literal, Literal};
use super::{JoinItems, JoinSpec, JoinType};
use crate::card_catalog::{Project, PropertyKind, PropertyTypeResolver, ResolvedProperty, Scope};
use crate::config::TableNames;
use crate::query_tree::{kinds, AttrMatch, Node, Pattern, RewriteFn, RuleSet};

/// Alias of the project's card table in every per-project statement.
pub const CARD_TABLE_ALIAS: &str = "cards";

pub struct BindContext<'a> {
    pub resolver: &'a PropertyTypeResolver<'a>,
    pub project: &'a Project,
}

pub struct ColumnContext<'a> {
    project: &'a Project,
    scope: &'a Scope,
    tables: &'a TableNames,
    joins: JoinRegistry,
}

impl<'a> ColumnContext<'a> {
    pub fn new(project: &'a Project, scope: &'a Scope, tables: &'a TableNames) -> Self {
        Self {
            project,
            scope,
            tables,
            joins: JoinRegistry::new(),
        }
    }

    pub fn into_join_items(self) -> JoinItems {
        self.joins.into_join_items()
    }
}

pub fn bind_rules<'a>() -> RuleSet<RewriteFn<BindContext<'a>, CompileError>> {
    RuleSet::<RewriteFn<BindContext<'a>, CompileError>>::new().rule(
        "bind-property",
        Pattern::new(kinds::PROPERTY),
        bind_property,
    )
}

pub fn sql_column_rules<'a>() -> RuleSet<RewriteFn<ColumnContext<'a>, CompileError>> {
    RuleSet::<RewriteFn<ColumnContext<'a>, CompileError>>::new()
        .rule(
            "list-position",
            Pattern::new(kinds::POSITION).with_guard(is_position_of_list),
            rewrite_list_position,
        )
        .rule(
            "user-column",
            Pattern::new(kinds::COLUMN).with_guard(|n| bound_kind(n) == Some(PropertyKind::User)),
            rewrite_user_column,
        )
        .rule(
            "relationship-column",
            Pattern::new(kinds::COLUMN)
                .with_guard(|n| bound_kind(n).is_some_and(|kind| kind.is_relationship())),
            rewrite_relationship_column,
        )
        .rule("plain-column", Pattern::new(kinds::COLUMN), rewrite_plain_column)
        .rule(
            "scope-membership",
            Pattern::new(kinds::JOIN).with_attr("kind", AttrMatch::EqualsIgnoreCase("scope".into())),
            register_scope_join,
        )
}

fn bind_property(node: Node, ctx: &mut BindContext<'_>) -> Result<Node, CompileError> {
    let name = node
        .attr_str("name")
        .ok_or_else(|| CompileError::MalformedTree("property node without a name".to_string()))?
        .to_string();
    let resolved = ctx
        .resolver
        .resolve(&name)
        .map_err(|_| CompileError::PropertyMissing {
            property: name.clone(),
            projects: vec![ctx.project.name.clone()],
        })?;
    log::debug!(
        "Bound property '{}' to {}.{} ({})",
        name,
        ctx.project.card_table,
        resolved.column(),
        resolved.semantic
    );

    let mut column = Node::new(kinds::COLUMN).with_attr("property", name);
    if let Some(alias) = node.attr("alias") {
        column = column.with_attr("alias", alias.clone());
    }
    Ok(column.with_binding(Arc::new(resolved)))
}

fn rewrite_list_position(node: Node, ctx: &mut ColumnContext<'_>) -> Result<Node, CompileError> {
    let target = node
        .child(0)
        .ok_or_else(|| CompileError::MalformedTree("position without a column".to_string()))?;
    let property = binding_of(target)?;
    let (table, column) = sql_location(target)?;

    let join = match property.kind() {
        PropertyKind::CardType => {
            let alias = "card_type_positions";
            JoinSpec {
                table_name: ctx.tables.card_types.clone(),
                table_alias: alias.to_string(),
                joining_on: vec![
                    col_eq_literal(alias, "project_id", Literal::Integer(ctx.project.id)),
                    col_eq(alias, "name", table, column),
                ],
                join_type: JoinType::Left,
            }
        }
        _ => {
            let alias = format!("{}_positions", property.column());
            JoinSpec {
                table_name: ctx.tables.enumeration_values.clone(),
                table_alias: alias.clone(),
                joining_on: vec![
                    col_eq_literal(
                        &alias,
                        "property_definition_id",
                        Literal::Integer(property.descriptor.id),
                    ),
                    col_eq(&alias, "value", table, column),
                ],
                join_type: JoinType::Left,
            }
        }
    };

    let alias = ctx.joins.add(join);
    Ok(sql_column(target, &alias, "position"))
}

fn rewrite_user_column(node: Node, ctx: &mut ColumnContext<'_>) -> Result<Node, CompileError> {
    let property = binding_of(&node)?;
    let alias = format!("{}_{}", ctx.tables.users, property.column());
    let alias = ctx.joins.add(JoinSpec {
        table_name: ctx.tables.users.clone(),
        table_alias: alias.clone(),
        joining_on: vec![col_eq(&alias, "id", CARD_TABLE_ALIAS, property.column())],
        join_type: JoinType::Left,
    });
    Ok(sql_column(&node, &alias, "login"))
}

fn rewrite_relationship_column(node: Node, ctx: &mut ColumnContext<'_>) -> Result<Node, CompileError> {
    let property = binding_of(&node)?;
    let alias = format!("{}_cards", property.column());
    let alias = ctx.joins.add(JoinSpec {
        table_name: ctx.project.card_table.clone(),
        table_alias: alias.clone(),
        joining_on: vec![col_eq(&alias, "id", CARD_TABLE_ALIAS, property.column())],
        join_type: JoinType::Left,
    });
    Ok(sql_column(&node, &alias, "name"))
}

fn rewrite_plain_column(node: Node, _ctx: &mut ColumnContext<'_>) -> Result<Node, CompileError> {
    let property = binding_of(&node)?;
    let column = property.column().to_string();
    Ok(sql_column(&node, CARD_TABLE_ALIAS, &column))
}

fn register_scope_join(node: Node, ctx: &mut ColumnContext<'_>) -> Result<Node, CompileError> {
    let table = ctx.tables.scope_membership.clone();
    ctx.joins.add(JoinSpec {
        table_name: table.clone(),
        table_alias: table.clone(),
        joining_on: vec![
            col_eq(&table, "card_id", CARD_TABLE_ALIAS, "id"),
            col_eq_literal(&table, "plan_id", Literal::Integer(ctx.scope.id)),
            col_eq_literal(&table, "project_id", Literal::Integer(ctx.project.id)),
        ],
        join_type: JoinType::Inner,
    });
    Ok(node)
}

fn is_position_of_list(node: &Node) -> bool {
    node.child(0).is_some_and(|target| {
        target.is(kinds::SQL_COLUMN)
            && matches!(
                bound_kind(target),
                Some(PropertyKind::Enumerated { numeric: false }) | Some(PropertyKind::CardType)
            )
    })
}

fn bound_kind(node: &Node) -> Option<PropertyKind> {
    node.binding().map(|binding| binding.kind())
}

fn binding_of(node: &Node) -> Result<Arc<ResolvedProperty>, CompileError> {
    node.binding()
        .cloned()
        .ok_or_else(|| CompileError::MalformedTree(format!("unbound column {}", node)))
}

fn sql_location(node: &Node) -> Result<(&str, &str), CompileError> {
    match (node.attr_str("table"), node.attr_str("column")) {
        (Some(table), Some(column)) => Ok((table, column)),
        _ => Err(CompileError::MalformedTree(format!(
            "expected a SQL column, found {}",
            node
        ))),
    }
}

/// `sql_column` node keeping the source column's display attributes and
/// binding.
fn sql_column(source: &Node, table: &str, column: &str) -> Node {
    let mut node = Node::new(kinds::SQL_COLUMN)
        .with_attr("table", table)
        .with_attr("column", column);
    for key in ["property", "alias"] {
        if let Some(value) = source.attr(key) {
            node = node.with_attr(key, value.clone());
        }
    }
    match source.binding() {
        Some(binding) => node.with_binding(binding.clone()),
        None => node,
    }
}
