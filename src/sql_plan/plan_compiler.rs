//! Cross-project compilation.
//!
//! The query is validated once, every property is resolved in every project
//! of the plan, and a project-scoped variant of the tree is compiled per
//! project. The per-project statements are combined with UNION ALL into a
//! derived table, and the requested columns (aggregates included) are
//! selected from it.

use std::collections::HashMap;
use std::sync::Arc;

use super::errors::CompileError;
use super::scope_compiler::{group_by_for, ScopeCompiler};
use super::select_columns::{aggregate_alias, AggregateFunction, SelectColumnDescriptor};
use super::sql_expr::{self, AggregateFnCall, SqlExpr};
use super::{
    CompiledQuery, FilterItems, FromSource, FromTableItem, JoinItems, SelectItem, SelectItems,
    SqlStatement, Union,
};
use crate::card_catalog::{
    Project, PropertyDescriptor, ResolvedProperty, SchemaLookup, Scope,
};
use crate::config::CompilerConfig;
use crate::query_tree::{kinds, Node};
use crate::query_validator::SyntaxValidator;

/// Inner column counted by `COUNT(*)`.
const CARD_NUMBER_COLUMN: &str = "number";

pub struct PlanQueryCompiler<'a> {
    lookup: &'a dyn SchemaLookup,
    config: &'a CompilerConfig,
    validator: SyntaxValidator,
}

/// One requested output column, as written in the query.
enum RequestedColumn<'n> {
    Property {
        name: &'n str,
        alias: Option<&'n str>,
    },
    Aggregate {
        function: AggregateFunction,
        /// `None` for `*`
        property: Option<&'n str>,
        alias: Option<&'n str>,
    },
}

impl RequestedColumn<'_> {
    /// Lower-cased column name in the per-project statements.
    fn inner_column(&self) -> String {
        match self {
            RequestedColumn::Property { name, .. }
            | RequestedColumn::Aggregate {
                property: Some(name),
                ..
            } => name.to_lowercase(),
            RequestedColumn::Aggregate { property: None, .. } => CARD_NUMBER_COLUMN.to_string(),
        }
    }
}

impl<'a> PlanQueryCompiler<'a> {
    pub fn new(lookup: &'a dyn SchemaLookup, config: &'a CompilerConfig) -> Self {
        Self {
            lookup,
            config,
            validator: SyntaxValidator::new(),
        }
    }

    pub fn compile(&self, scope: &Scope, tree: &Node) -> Result<CompiledQuery, CompileError> {
        let projects = self.lookup.list_projects(scope);
        if projects.is_empty() {
            return Err(CompileError::NoScopeAssociation {
                scope: scope.name.clone(),
            });
        }

        self.validator.validate_strict(tree)?;

        let resolved = self.resolve_properties(tree, &projects)?;
        log::debug!(
            "Plan '{}': resolved {} propert(ies) across {} project(s)",
            scope.name,
            resolved.len(),
            projects.len()
        );

        let select = tree
            .find_child(kinds::SELECT)
            .ok_or_else(|| CompileError::MalformedTree("query has no SELECT clause".to_string()))?;
        let requested = select
            .children()
            .iter()
            .map(requested_column)
            .collect::<Result<Vec<_>, _>>()?;
        check_aggregate_targets(&requested, &resolved)?;

        let variant = project_variant(tree, &requested);
        let branches = projects
            .iter()
            .map(|project| {
                ScopeCompiler::new(self.lookup, self.config, project, scope)
                    .compile(&variant)
                    .map(|compiled| compiled.statement)
            })
            .collect::<Result<Vec<_>, _>>()?;
        log::debug!("Plan '{}': {} union branch(es)", scope.name, branches.len());

        self.outer_query(branches, &requested, &resolved)
    }

    /// Resolves every referenced property in every project, keyed by
    /// lower-cased name. Descriptors must agree across projects.
    fn resolve_properties(
        &self,
        tree: &Node,
        projects: &[Project],
    ) -> Result<HashMap<String, ResolvedProperty>, CompileError> {
        let mut resolved = HashMap::new();
        for name in referenced_properties(tree) {
            let key = name.to_lowercase();
            if resolved.contains_key(&key) {
                continue;
            }

            let mut found: Vec<(&Project, Arc<PropertyDescriptor>)> = Vec::new();
            let mut missing = Vec::new();
            for project in projects {
                match self.lookup.resolve(project, name) {
                    Some(descriptor) => found.push((project, descriptor)),
                    None => missing.push(project.name.clone()),
                }
            }
            if !missing.is_empty() {
                return Err(CompileError::PropertyMissing {
                    property: name.to_string(),
                    projects: missing,
                });
            }

            let Some(((first_project, first), rest)) = found.split_first() else {
                continue;
            };
            if let Some((other_project, _)) = rest
                .iter()
                .find(|(_, descriptor)| !first.agrees_with(descriptor))
            {
                return Err(CompileError::PropertyTypeMismatch {
                    property: name.to_string(),
                    first_project: first_project.name.clone(),
                    second_project: other_project.name.clone(),
                });
            }
            resolved.insert(key, ResolvedProperty::new(first.clone()));
        }
        Ok(resolved)
    }

    fn outer_query(
        &self,
        branches: Vec<SqlStatement>,
        requested: &[RequestedColumn<'_>],
        resolved: &HashMap<String, ResolvedProperty>,
    ) -> Result<CompiledQuery, CompileError> {
        let union_alias = self.config.tables.union_alias.as_str();
        let mut items = Vec::with_capacity(requested.len());
        let mut columns = Vec::with_capacity(requested.len());

        for column in requested {
            let inner = column.inner_column();
            match column {
                RequestedColumn::Property { name, alias } => {
                    let property = resolved.get(&inner).ok_or_else(|| {
                        CompileError::MalformedTree(format!("property '{}' was not resolved", name))
                    })?;
                    let display = alias.unwrap_or(*name).to_string();
                    items.push(SelectItem {
                        expression: sql_expr::column(Some(union_alias), &inner),
                        col_alias: Some(display.clone()),
                    });
                    columns.push(SelectColumnDescriptor::property(display, property));
                }
                RequestedColumn::Aggregate {
                    function,
                    property,
                    alias,
                } => {
                    // Star aggregates other than count run over the card number.
                    let argument = match property {
                        None if *function == AggregateFunction::Count => SqlExpr::Star,
                        _ => sql_expr::column(Some(union_alias), &inner),
                    };
                    let display = alias
                        .map(str::to_string)
                        .unwrap_or_else(|| aggregate_alias(*function, *property));
                    items.push(SelectItem {
                        expression: SqlExpr::AggregateFnCall(AggregateFnCall {
                            name: function.to_string(),
                            args: vec![argument],
                        }),
                        col_alias: Some(display.clone()),
                    });
                    columns.push(SelectColumnDescriptor::aggregate(
                        display,
                        *function,
                        property.map(str::to_string),
                    ));
                }
            }
        }

        let group_by = group_by_for(&items, &columns);
        Ok(CompiledQuery {
            statement: SqlStatement {
                select: SelectItems { items },
                from: FromTableItem(FromSource::DerivedUnion {
                    union: Union { input: branches },
                    alias: union_alias.to_string(),
                }),
                joins: JoinItems(Vec::new()),
                filters: FilterItems(None),
                group_by,
            },
            columns,
        })
    }
}

/// Property names in first-seen order, as written.
fn referenced_properties(tree: &Node) -> Vec<&str> {
    tree.descendants()
        .into_iter()
        .filter(|node| node.is(kinds::PROPERTY))
        .filter_map(|node| node.attr_str("name"))
        .collect()
}

fn requested_column(node: &Node) -> Result<RequestedColumn<'_>, CompileError> {
    if node.is(kinds::PROPERTY) {
        let name = node
            .attr_str("name")
            .ok_or_else(|| CompileError::MalformedTree("property node without a name".to_string()))?;
        return Ok(RequestedColumn::Property {
            name,
            alias: node.attr_str("alias"),
        });
    }

    if node.is(kinds::AGGREGATE) {
        let function = node
            .attr_str("function")
            .ok_or_else(|| CompileError::MalformedTree("aggregate without a function".to_string()))?
            .parse::<AggregateFunction>()
            .map_err(CompileError::MalformedTree)?;
        let property = match node.child(0) {
            Some(target) if target.is(kinds::STAR) => None,
            Some(target) if target.is(kinds::PROPERTY) => Some(target.attr_str("name").ok_or_else(|| {
                CompileError::MalformedTree("property node without a name".to_string())
            })?),
            _ => {
                return Err(CompileError::MalformedTree(format!(
                    "aggregate {} needs a property or *",
                    function
                )))
            }
        };
        return Ok(RequestedColumn::Aggregate {
            function,
            property,
            alias: node.attr_str("alias"),
        });
    }

    Err(CompileError::MalformedTree(format!(
        "'{}' cannot be selected",
        node.name()
    )))
}

fn check_aggregate_targets(
    requested: &[RequestedColumn<'_>],
    resolved: &HashMap<String, ResolvedProperty>,
) -> Result<(), CompileError> {
    for column in requested {
        let RequestedColumn::Aggregate {
            function, property, ..
        } = column
        else {
            continue;
        };
        let numeric = match property {
            None => true,
            Some(name) => resolved
                .get(&name.to_lowercase())
                .is_some_and(|p| p.descriptor.is_numeric()),
        };
        if !numeric {
            return Err(CompileError::NonNumericAggregateTarget {
                function: function.to_string(),
                property: property.unwrap_or("*").to_string(),
            });
        }
    }
    Ok(())
}

/// Per-project tree: aggregates unwrap to their property (or the card
/// number for `*`), duplicate columns collapse, and the plan membership
/// join is registered first.
fn project_variant(tree: &Node, requested: &[RequestedColumn<'_>]) -> Node {
    let mut seen = Vec::new();
    let mut inner = Vec::new();
    for column in requested {
        let key = column.inner_column();
        if seen.contains(&key) {
            continue;
        }
        let node = match column {
            RequestedColumn::Property { name, .. }
            | RequestedColumn::Aggregate {
                property: Some(name),
                ..
            } => Node::property(*name).with_attr("alias", key.as_str()),
            RequestedColumn::Aggregate { property: None, .. } => Node::new(kinds::COLUMN)
                .with_attr("property", CARD_NUMBER_COLUMN)
                .with_attr("alias", CARD_NUMBER_COLUMN)
                .with_binding(Arc::new(ResolvedProperty::new(Arc::new(
                    PropertyDescriptor::card_number(),
                )))),
        };
        seen.push(key);
        inner.push(node);
    }

    let mut variant = Node::new(kinds::STATEMENTS)
        .with_child(Node::new(kinds::JOIN).with_attr("kind", "scope"))
        .with_child(Node::new(kinds::SELECT).with_children(inner));
    if let Some(where_clause) = tree.find_child(kinds::WHERE) {
        variant = variant.with_child(where_clause.clone());
    }
    variant
}
