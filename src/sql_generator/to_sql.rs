use super::common::{column_alias, qualified_column, quote_identifier, string_literal};
use crate::sql_plan::sql_expr::{Literal, Operator, OperatorApplication, SqlExpr};
use crate::sql_plan::{
    FilterItems, FromSource, FromTableItem, GroupByExpressions, JoinItems, JoinSpec, JoinType,
    SelectItems, SqlStatement, ToSql, Union,
};

impl ToSql for SqlStatement {
    fn to_sql(&self) -> String {
        let mut sql = String::new();
        sql.push_str(&self.select.to_sql());
        sql.push_str(&self.from.to_sql());
        sql.push_str(&self.joins.to_sql());
        sql.push_str(&self.filters.to_sql());
        sql.push_str(&self.group_by.to_sql());
        sql
    }
}

impl ToSql for SelectItems {
    fn to_sql(&self) -> String {
        let mut sql: String = String::new();

        if self.items.is_empty() {
            return sql;
        }

        sql.push_str("SELECT \n");

        for (i, item) in self.items.iter().enumerate() {
            sql.push_str("      ");
            sql.push_str(&item.expression.to_sql());
            if let Some(alias) = &item.col_alias {
                sql.push_str(" AS ");
                sql.push_str(&column_alias(alias));
            }
            if i + 1 < self.items.len() {
                sql.push_str(", ");
            }
            sql.push('\n');
        }
        sql
    }
}

impl ToSql for FromTableItem {
    fn to_sql(&self) -> String {
        match &self.0 {
            FromSource::Table { name, alias } => {
                format!("FROM {} AS {}\n", quote_identifier(name), quote_identifier(alias))
            }
            FromSource::DerivedUnion { union, alias } => {
                format!("FROM (\n{}) AS {}\n", union.to_sql(), quote_identifier(alias))
            }
        }
    }
}

impl ToSql for Union {
    fn to_sql(&self) -> String {
        let union_sql_strs: Vec<String> = self.input.iter().map(|branch| branch.to_sql()).collect();

        union_sql_strs.join("UNION ALL \n")
    }
}

impl ToSql for JoinItems {
    fn to_sql(&self) -> String {
        let mut sql = String::new();
        for join in &self.0 {
            sql.push_str(&join.to_sql());
        }
        sql
    }
}

impl ToSql for JoinSpec {
    fn to_sql(&self) -> String {
        crate::debug_print!(
            "JoinSpec::to_sql {} AS {} ({} condition(s))",
            self.table_name,
            self.table_alias,
            self.joining_on.len()
        );

        let join_type_str = match self.join_type {
            JoinType::Inner => "INNER JOIN",
            JoinType::Left => "LEFT JOIN",
        };

        let mut sql = format!(
            "{} {} AS {}",
            join_type_str,
            quote_identifier(&self.table_name),
            quote_identifier(&self.table_alias)
        );

        if !self.joining_on.is_empty() {
            let joining_on_str = self
                .joining_on
                .iter()
                .map(|cond| cond.to_sql())
                .collect::<Vec<_>>()
                .join(" AND ");
            sql.push_str(&format!(" ON {joining_on_str}"));
        }

        sql.push('\n');
        sql
    }
}

impl ToSql for FilterItems {
    fn to_sql(&self) -> String {
        if let Some(expr) = &self.0 {
            format!("WHERE {}\n", expr.to_sql())
        } else {
            "".into()
        }
    }
}

impl ToSql for GroupByExpressions {
    fn to_sql(&self) -> String {
        let mut sql: String = String::new();
        if self.0.is_empty() {
            return sql;
        }
        sql.push_str("GROUP BY ");
        for (i, e) in self.0.iter().enumerate() {
            sql.push_str(&e.to_sql());
            if i + 1 < self.0.len() {
                sql.push_str(", ");
            }
        }
        sql.push('\n');
        sql
    }
}

impl ToSql for SqlExpr {
    fn to_sql(&self) -> String {
        match self {
            SqlExpr::Literal(lit) => match lit {
                Literal::Integer(i) => i.to_string(),
                Literal::Float(f) => f.to_string(),
                Literal::Boolean(b) => {
                    if *b {
                        "true".into()
                    } else {
                        "false".into()
                    }
                }
                Literal::String(s) => string_literal(s),
                Literal::Null => "NULL".into(),
            },
            SqlExpr::Star => "*".into(),
            SqlExpr::Column(col) => match &col.table_alias {
                Some(alias) => qualified_column(alias, &col.column),
                None => quote_identifier(&col.column),
            },
            SqlExpr::AggregateFnCall(agg) => {
                let args: Vec<String> = agg.args.iter().map(|a| a.to_sql()).collect();
                format!("{}({})", agg.name, args.join(", "))
            }
            SqlExpr::ScalarFnCall(fn_call) => {
                let args: Vec<String> = fn_call.args.iter().map(|a| a.to_sql()).collect();
                format!("{}({})", fn_call.name, args.join(", "))
            }
            SqlExpr::OperatorApplicationExp(op) => op.to_sql(),
            SqlExpr::Subquery(sub) => format!(
                "(SELECT {} FROM {} WHERE {})",
                quote_identifier(&sub.column),
                quote_identifier(&sub.table),
                sub.filter.to_sql()
            ),
        }
    }
}

impl ToSql for OperatorApplication {
    fn to_sql(&self) -> String {
        fn op_str(o: Operator) -> &'static str {
            match o {
                Operator::Equal => "=",
                Operator::NotEqual => "<>",
                Operator::LessThan => "<",
                Operator::GreaterThan => ">",
                Operator::LessThanEqual => "<=",
                Operator::GreaterThanEqual => ">=",
                Operator::And => "AND",
                Operator::Or => "OR",
                Operator::IsNull => "IS NULL",
                Operator::IsNotNull => "IS NOT NULL",
            }
        }

        let rendered: Vec<String> = self.operands.iter().map(|e| e.to_sql()).collect();
        let sql_op = op_str(self.operator);

        match self.operator {
            Operator::IsNull | Operator::IsNotNull => {
                format!("{} {}", rendered.join(", "), sql_op)
            }
            // connectives are always parenthesised so nesting never depends on precedence
            Operator::And | Operator::Or => match rendered.len() {
                0 => "".into(),
                1 => rendered[0].clone(),
                _ => format!("({})", rendered.join(&format!(" {} ", sql_op))),
            },
            _ => match rendered.len() {
                2 => format!("{} {} {}", &rendered[0], sql_op, &rendered[1]),
                _ => rendered.join(&format!(" {} ", sql_op)),
            },
        }
    }
}
