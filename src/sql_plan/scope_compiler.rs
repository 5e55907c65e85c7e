//! Compiles a validated query tree against one project's card table.
//!
//! Passes, each feeding the next:
//! 1. bind `property` nodes to resolved `column` nodes
//! 2. prevalidate comparisons (operators, literal types, column types)
//! 3. rewrite comparisons (NULL handling, case folding, list positions)
//! 4. rewrite columns to `sql_column` nodes, collecting joins
//! 5. lower the tree into a typed `SqlStatement`

use super::column_rules::{bind_rules, sql_column_rules, BindContext, ColumnContext, CARD_TABLE_ALIAS};
use super::comparison_rules::{comparison_rules, prevalidate, ComparisonContext};
use super::errors::CompileError;
use super::select_columns::{aggregate_alias, AggregateFunction, SelectColumnDescriptor};
use super::sql_expr::{self, SqlExpr};
use super::{
    CompiledQuery, FilterItems, FromSource, FromTableItem, GroupByExpressions, JoinItems,
    SelectItem, SelectItems, SqlStatement,
};
use crate::card_catalog::{Project, PropertyTypeResolver, SchemaLookup, Scope};
use crate::config::CompilerConfig;
use crate::query_tree::{kinds, transform, Node};

pub struct ScopeCompiler<'a> {
    lookup: &'a dyn SchemaLookup,
    config: &'a CompilerConfig,
    project: &'a Project,
    scope: &'a Scope,
}

impl<'a> ScopeCompiler<'a> {
    pub fn new(
        lookup: &'a dyn SchemaLookup,
        config: &'a CompilerConfig,
        project: &'a Project,
        scope: &'a Scope,
    ) -> Self {
        Self {
            lookup,
            config,
            project,
            scope,
        }
    }

    pub fn compile(&self, tree: &Node) -> Result<CompiledQuery, CompileError> {
        log::debug!("Compiling query for project '{}'", self.project.identifier);
        let resolver = PropertyTypeResolver::new(self.lookup, self.project);

        let mut bind_ctx = BindContext {
            resolver: &resolver,
            project: self.project,
        };
        let bound = transform(tree.clone(), &bind_rules(), &mut bind_ctx)?.get_plan();

        prevalidate(&bound, &resolver, &self.config.literal_date_formats)?;

        let mut comparison_ctx = ComparisonContext {
            project: self.project,
            tables: &self.config.tables,
            literal_date_formats: &self.config.literal_date_formats,
        };
        let compared = transform(bound, &comparison_rules(), &mut comparison_ctx)?.get_plan();

        let mut column_ctx = ColumnContext::new(self.project, self.scope, &self.config.tables);
        let sql_tree = transform(compared, &sql_column_rules(), &mut column_ctx)?.get_plan();
        let joins = column_ctx.into_join_items();
        log::debug!(
            "Project '{}': {} join(s) registered",
            self.project.identifier,
            joins.0.len()
        );

        self.lower(&sql_tree, joins)
    }

    fn lower(&self, tree: &Node, joins: JoinItems) -> Result<CompiledQuery, CompileError> {
        let select = tree
            .find_child(kinds::SELECT)
            .ok_or_else(|| CompileError::MalformedTree("query has no SELECT clause".to_string()))?;
        let mut items = Vec::with_capacity(select.children().len());
        let mut columns = Vec::with_capacity(select.children().len());
        for node in select.children() {
            let (item, column) = lower_select_item(node)?;
            items.push(item);
            columns.push(column);
        }

        let filters = match tree.find_child(kinds::WHERE) {
            Some(where_clause) => sql_expr::and(
                where_clause
                    .children()
                    .iter()
                    .map(SqlExpr::try_from)
                    .collect::<Result<Vec<_>, _>>()?,
            ),
            None => None,
        };

        let group_by = group_by_for(&items, &columns);
        Ok(CompiledQuery {
            statement: SqlStatement {
                select: SelectItems { items },
                from: FromTableItem(FromSource::Table {
                    name: self.project.card_table.clone(),
                    alias: CARD_TABLE_ALIAS.to_string(),
                }),
                joins,
                filters: FilterItems(filters),
                group_by,
            },
            columns,
        })
    }
}

/// When any column aggregates, every other column is grouped, in SELECT
/// order.
pub(crate) fn group_by_for(items: &[SelectItem], columns: &[SelectColumnDescriptor]) -> GroupByExpressions {
    if !columns.iter().any(SelectColumnDescriptor::is_aggregate) {
        return GroupByExpressions(Vec::new());
    }
    GroupByExpressions(
        items
            .iter()
            .zip(columns)
            .filter(|(_, column)| !column.is_aggregate())
            .map(|(item, _)| item.expression.clone())
            .collect(),
    )
}

fn lower_select_item(node: &Node) -> Result<(SelectItem, SelectColumnDescriptor), CompileError> {
    if node.is(kinds::SQL_COLUMN) {
        let binding = node
            .binding()
            .ok_or_else(|| CompileError::MalformedTree(format!("unbound column {}", node)))?;
        let name = display_name(node).unwrap_or_else(|| binding.name().to_string());
        return Ok((
            SelectItem {
                expression: SqlExpr::try_from(node)?,
                col_alias: Some(name.clone()),
            },
            SelectColumnDescriptor::property(name, binding),
        ));
    }

    if node.is(kinds::AGGREGATE) {
        let function_name = node
            .attr_str("function")
            .ok_or_else(|| CompileError::MalformedTree("aggregate without a function".to_string()))?;
        let function: AggregateFunction = function_name.parse().map_err(CompileError::MalformedTree)?;
        let property = match node.child(0) {
            Some(target) if target.is(kinds::STAR) => None,
            Some(target) => Some(
                target
                    .attr_str("property")
                    .map(str::to_string)
                    .or_else(|| target.binding().map(|b| b.name().to_string()))
                    .ok_or_else(|| CompileError::MalformedTree(format!("unbound aggregate target {}", target)))?,
            ),
            None => {
                return Err(CompileError::MalformedTree(
                    "aggregate without a target".to_string(),
                ))
            }
        };
        let name = node
            .attr_str("alias")
            .map(str::to_string)
            .unwrap_or_else(|| aggregate_alias(function, property.as_deref()));
        return Ok((
            SelectItem {
                expression: SqlExpr::try_from(node)?,
                col_alias: Some(name.clone()),
            },
            SelectColumnDescriptor::aggregate(name, function, property),
        ));
    }

    Err(CompileError::MalformedTree(format!(
        "'{}' cannot be selected",
        node.name()
    )))
}

fn display_name(node: &Node) -> Option<String> {
    node.attr_str("alias")
        .or_else(|| node.attr_str("property"))
        .map(str::to_string)
}
