use crate::query::{
    ast::{
        common::{JoinKind, OrderDir, TableRef},
        select::{CommonTableExpr, FromClause, JoinClause, OrderByExpr, Select},
    },
    renderer::{Render, Renderer},
};

impl Render for Select {
    fn render(&self, r: &mut Renderer) {
        // 1. WITH
        if !self.ctes.is_empty() {
            r.sql.push_str("WITH ");
            for (i, cte) in self.ctes.iter().enumerate() {
                if i > 0 {
                    r.sql.push_str(", ");
                }
                cte.render(r);
            }
            r.sql.push(' ');
        }

        // 2. SELECT clause
        r.sql.push_str("SELECT ");
        for (i, col) in self.columns.iter().enumerate() {
            if i > 0 {
                r.sql.push_str(", ");
            }
            col.render(r);
        }

        // 3. FROM
        if let Some(from) = &self.from {
            r.sql.push(' ');
            from.render(r);
        }

        // 4. JOIN
        for join in &self.joins {
            r.sql.push(' ');
            join.render(r);
        }

        // 5. WHERE
        if let Some(where_clause) = &self.where_clause {
            r.sql.push_str(" WHERE ");
            where_clause.render(r);
        }

        // 6. ORDER BY
        if !self.order_by.is_empty() {
            r.sql.push_str(" ORDER BY ");
            for (i, order) in self.order_by.iter().enumerate() {
                if i > 0 {
                    r.sql.push_str(", ");
                }
                order.render(r);
            }
        }

        // 7. LIMIT
        if let Some(limit) = &self.limit {
            r.sql.push_str(" LIMIT ");
            limit.render(r);
        }
    }
}

impl Render for CommonTableExpr {
    fn render(&self, r: &mut Renderer) {
        r.push_identifier(&self.name);
        r.sql.push_str(" AS (");
        self.query.render(r);
        r.sql.push(')');
    }
}

impl Render for TableRef {
    fn render(&self, r: &mut Renderer) {
        if let Some(schema) = &self.schema {
            r.push_identifier(schema);
            r.sql.push('.');
        }
        r.push_identifier(&self.name);
    }
}

impl Render for FromClause {
    fn render(&self, r: &mut Renderer) {
        r.sql.push_str("FROM ");
        self.table.render(r);
        if let Some(alias) = &self.alias {
            r.sql.push_str(" AS ");
            r.push_identifier(alias);
        }
    }
}

impl Render for JoinClause {
    fn render(&self, r: &mut Renderer) {
        let join_str = match self.kind {
            JoinKind::Inner => "INNER JOIN",
            JoinKind::Left => "LEFT JOIN",
        };
        r.sql.push_str(join_str);
        r.sql.push(' ');
        self.table.render(r);
        if let Some(alias) = &self.alias {
            r.sql.push_str(" AS ");
            r.push_identifier(alias);
        }
        r.sql.push_str(" ON ");
        self.on.render(r);
    }
}

impl Render for OrderByExpr {
    fn render(&self, r: &mut Renderer) {
        self.expr.render(r);
        if let Some(dir) = &self.direction {
            let dir_str = match dir {
                OrderDir::Asc => "ASC",
                OrderDir::Desc => "DESC",
            };
            r.sql.push(' ');
            r.sql.push_str(dir_str);
        }
    }
}

#[cfg(test)]
mod tests {
    use model::core::value::Value;

    use crate::{
        query::{
            ast::{
                common::{JoinKind, OrderDir},
                expr::{BinaryOperator, Expr},
                select::Select,
            },
            binary,
            builder::select::SelectBuilder,
            dialect::{MySql, Postgres},
            ident, qualified,
            renderer::Renderer,
            value,
        },
        table_ref,
    };

    #[test]
    fn test_simple_select_postgres() {
        let ast = SelectBuilder::new()
            .select(vec![ident("id"), ident("name")])
            .from(table_ref!("users"), None)
            .where_clause(binary(ident("id"), BinaryOperator::Eq, value(Value::Int(123))))
            .build();

        let (sql, params) = Renderer::render_node(&ast, &Postgres);

        assert_eq!(sql, r#"SELECT "id", "name" FROM "users" WHERE ("id" = $1)"#);
        assert_eq!(params, vec![Value::Int(123)]);
    }

    #[test]
    fn test_simple_select_mysql() {
        let ast = SelectBuilder::new()
            .select(vec![ident("id"), ident("name")])
            .from(table_ref!("users"), None)
            .where_clause(binary(
                ident("id"),
                BinaryOperator::Eq,
                value(Value::String("abc".to_string())),
            ))
            .limit(value(Value::Int(5)))
            .build();

        let (sql, params) = Renderer::render_node(&ast, &MySql);

        assert_eq!(sql, "SELECT `id`, `name` FROM `users` WHERE (`id` = ?) LIMIT ?");
        assert_eq!(params, vec![Value::String("abc".to_string()), Value::Int(5)]);
    }

    #[test]
    fn test_join_with_schema_postgres() {
        let ast = SelectBuilder::new()
            .select(vec![qualified(Some("u"), "id"), qualified(Some("p"), "title")])
            .from(table_ref!("public", "users"), Some("u"))
            .join(
                JoinKind::Inner,
                table_ref!("posts"),
                Some("p"),
                binary(
                    qualified(Some("u"), "id"),
                    BinaryOperator::Eq,
                    qualified(Some("p"), "user_id"),
                ),
            )
            .order_by(qualified(Some("u"), "created_at"), Some(OrderDir::Desc))
            .build();

        let (sql, params) = Renderer::render_node(&ast, &Postgres);

        let expected_sql = r#"SELECT "u"."id", "p"."title" FROM "public"."users" AS "u" INNER JOIN "posts" AS "p" ON ("u"."id" = "p"."user_id") ORDER BY "u"."created_at" DESC"#;
        assert_eq!(sql, expected_sql);
        assert!(params.is_empty());
    }

    #[test]
    fn test_cte_with_in_subquery_numbers_params_in_order() {
        let inner = SelectBuilder::new()
            .select(vec![ident("id")])
            .from(table_ref!("events"), None)
            .where_clause(binary(ident("id"), BinaryOperator::Lt, value(Value::Int(10))))
            .order_by(ident("id"), Some(OrderDir::Desc))
            .limit(value(Value::Int(3)))
            .build();

        let ids = Select {
            columns: vec![ident("id")],
            from: Some(crate::query::ast::select::FromClause {
                table: table_ref!("prev"),
                alias: None,
            }),
            ..Default::default()
        };

        let ast = SelectBuilder::new()
            .select(vec![Expr::Wildcard(None)])
            .from(table_ref!("events"), None)
            .with_cte("prev", inner)
            .and_where(ident("id").in_subquery(ids))
            .order_by(ident("id"), Some(OrderDir::Asc))
            .limit(value(Value::Int(3)))
            .build();

        let (sql, params) = Renderer::render_node(&ast, &Postgres);

        let expected_sql = concat!(
            r#"WITH "prev" AS (SELECT "id" FROM "events" WHERE ("id" < $1) ORDER BY "id" DESC LIMIT $2) "#,
            r#"SELECT * FROM "events" WHERE ("id" IN (SELECT "id" FROM "prev")) ORDER BY "id" ASC LIMIT $3"#
        );
        assert_eq!(sql, expected_sql);
        assert_eq!(params, vec![Value::Int(10), Value::Int(3), Value::Int(3)]);
    }
}
