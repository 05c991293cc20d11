//! Provides a type-safe, fluent builder for constructing `Select` ASTs.

// --- Typestate Marker Structs ---
// These zero-sized structs represent the state of the builder.
// They ensure that methods are called in the correct SQL order at compile time.

use crate::query::ast::{
    common::{JoinKind, OrderDir, TableRef},
    expr::Expr,
    select::{CommonTableExpr, FromClause, JoinClause, OrderByExpr, Select},
};

/// The initial state of the builder before any clauses have been added.
#[derive(Debug, Default, Clone)]
pub struct InitialState;

/// The state after the `SELECT` clause has been added.
#[derive(Debug, Default, Clone)]
pub struct SelectState;

/// The state after the `FROM` clause has been added.
#[derive(Debug, Default, Clone)]
pub struct FromState;

// --- The Main Builder ---

#[derive(Debug, Clone)]
pub struct SelectBuilder<State> {
    ast: Select,
    state: State,
}

impl Default for SelectBuilder<InitialState> {
    fn default() -> Self {
        Self::new()
    }
}

/// Implementation for the initial state of the builder.
impl SelectBuilder<InitialState> {
    pub fn new() -> Self {
        Self {
            ast: Select::default(),
            state: InitialState,
        }
    }

    /// Adds a `SELECT` clause with a list of columns.
    /// This is the entry point for building a select query.
    pub fn select(mut self, columns: Vec<Expr>) -> SelectBuilder<SelectState> {
        self.ast.columns = columns;
        SelectBuilder {
            ast: self.ast,
            state: SelectState,
        }
    }
}

/// Implementation for the state after `SELECT` has been called.
/// The only valid next step is to specify a `FROM` table.
impl SelectBuilder<SelectState> {
    /// Adds a `FROM` clause specifying the primary table.
    pub fn from(mut self, table: TableRef, alias: Option<&str>) -> SelectBuilder<FromState> {
        self.ast.from = Some(FromClause {
            table,
            alias: alias.map(String::from),
        });
        SelectBuilder {
            ast: self.ast,
            state: FromState,
        }
    }
}

/// Implementation for the state after `FROM` has been called.
/// From here, we can add optional clauses like `JOIN`, `WHERE`, etc.
impl SelectBuilder<FromState> {
    /// Resumes building on top of an existing query.
    ///
    /// Returns `None` when the query has no `FROM` clause.
    pub fn from_select(ast: Select) -> Option<Self> {
        ast.from.as_ref()?;
        Some(Self {
            ast,
            state: FromState,
        })
    }

    /// Adds a `JOIN` clause to the query.
    pub fn join(mut self, kind: JoinKind, table: TableRef, alias: Option<&str>, on: Expr) -> Self {
        self.ast.joins.push(JoinClause {
            kind,
            table,
            alias: alias.map(String::from),
            on,
        });
        self
    }

    /// Sets the `WHERE` clause, replacing any existing condition.
    pub fn where_clause(mut self, condition: Expr) -> Self {
        self.ast.where_clause = Some(condition);
        self
    }

    /// ANDs a condition into the `WHERE` clause.
    pub fn and_where(mut self, condition: Expr) -> Self {
        self.ast.where_clause = Some(match self.ast.where_clause.take() {
            Some(existing) => existing.and(condition),
            None => condition,
        });
        self
    }

    /// Adds an `ORDER BY` clause to the query.
    pub fn order_by(mut self, expr: Expr, direction: Option<OrderDir>) -> Self {
        self.ast.order_by.push(OrderByExpr { expr, direction });
        self
    }

    pub fn clear_order_by(mut self) -> Self {
        self.ast.order_by.clear();
        self
    }

    /// Sets the `LIMIT` clause.
    pub fn limit(mut self, limit: Expr) -> Self {
        self.ast.limit = Some(limit);
        self
    }

    /// Replaces the projected columns.
    pub fn columns(mut self, columns: Vec<Expr>) -> Self {
        self.ast.columns = columns;
        self
    }

    /// Prepends a named common table expression to the query.
    pub fn with_cte(mut self, name: &str, query: Select) -> Self {
        self.ast.ctes.push(CommonTableExpr {
            name: name.to_string(),
            query,
        });
        self
    }

    /// The name columns of the primary table are qualified with:
    /// the alias if there is one, else the table name.
    pub fn source_qualifier(&self) -> Option<&str> {
        self.ast
            .from
            .as_ref()
            .map(|from| from.alias.as_deref().unwrap_or(&from.table.name))
    }

    pub fn ast(&self) -> &Select {
        &self.ast
    }

    /// Finalizes and returns the constructed `Select` AST.
    pub fn build(self) -> Select {
        self.ast
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        query::{
            ast::{
                common::{JoinKind, OrderDir},
                expr::{BinaryOperator, Expr},
            },
            binary,
            builder::select::SelectBuilder,
            ident, qualified, value,
        },
        table_ref,
    };
    use model::core::value::Value;

    #[test]
    fn test_build_simple_select() {
        let ast = SelectBuilder::new()
            .select(vec![ident("id"), ident("name")])
            .from(table_ref!("users"), None)
            .build();

        assert_eq!(ast.columns, vec![ident("id"), ident("name")]);
        assert_eq!(ast.from.unwrap().table.name, "users");
        assert!(ast.where_clause.is_none());
    }

    #[test]
    fn test_and_where_combines_conditions() {
        let status = binary(
            ident("status"),
            BinaryOperator::Eq,
            value(Value::from("active")),
        );
        let id = binary(ident("id"), BinaryOperator::Gt, value(Value::Int(3)));

        let ast = SelectBuilder::new()
            .select(vec![Expr::Wildcard(None)])
            .from(table_ref!("users"), Some("u"))
            .and_where(status.clone())
            .and_where(id.clone())
            .build();

        assert_eq!(ast.where_clause, Some(status.and(id)));
    }

    #[test]
    fn test_build_with_join_and_ordering() {
        let ast = SelectBuilder::new()
            .select(vec![qualified(Some("u"), "name"), qualified(Some("p"), "title")])
            .from(table_ref!("users"), Some("u"))
            .join(
                JoinKind::Left,
                table_ref!("posts"),
                Some("p"),
                binary(
                    qualified(Some("u"), "id"),
                    BinaryOperator::Eq,
                    qualified(Some("p"), "user_id"),
                ),
            )
            .order_by(qualified(Some("p"), "created_at"), Some(OrderDir::Desc))
            .build();

        assert_eq!(ast.joins.len(), 1);
        assert_eq!(ast.order_by.len(), 1);
        assert_eq!(ast.order_by[0].direction, Some(OrderDir::Desc));
    }

    #[test]
    fn test_clear_order_by_and_limit() {
        let ast = SelectBuilder::new()
            .select(vec![ident("id")])
            .from(table_ref!("products"), None)
            .order_by(ident("price"), Some(OrderDir::Asc))
            .clear_order_by()
            .order_by(ident("id"), Some(OrderDir::Desc))
            .limit(value(Value::Int(50)))
            .build();

        assert_eq!(ast.order_by.len(), 1);
        assert_eq!(ast.order_by[0].expr, ident("id"));
        assert_eq!(ast.limit, Some(value(Value::Int(50))));
    }

    #[test]
    fn test_source_qualifier_prefers_alias() {
        let aliased = SelectBuilder::new()
            .select(vec![ident("id")])
            .from(table_ref!("events"), Some("e"));
        assert_eq!(aliased.source_qualifier(), Some("e"));

        let plain = SelectBuilder::new()
            .select(vec![ident("id")])
            .from(table_ref!("events"), None);
        assert_eq!(plain.source_qualifier(), Some("events"));
    }

    #[test]
    fn test_from_select_requires_from_clause() {
        let ast = SelectBuilder::new()
            .select(vec![ident("id")])
            .from(table_ref!("events"), None)
            .build();
        assert!(SelectBuilder::from_select(ast).is_some());
        assert!(SelectBuilder::from_select(Default::default()).is_none());
    }
}
