//! Keyset ("seek") predicates and ordering over an `OrderSpec` plus a unique
//! tie-breaker column.

use crate::query::{
    ast::{
        common::OrderDir,
        expr::{BinaryOperator, Expr},
    },
    binary,
    builder::select::{FromState, SelectBuilder},
    qualified, value,
};
use model::{
    core::value::Value,
    pagination::{
        cursor::{Cursor, CursorDirection},
        order::{OrderSpec, SortDirection},
    },
};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum KeysetError {
    #[error("Cursor does not carry values for order keys: {}", .0.join(", "))]
    MissingKeys(Vec<String>),
}

#[derive(Debug, Clone)]
pub struct KeysetStrategy {
    order: OrderSpec,
    tiebreaker: String,
    qualifier: Option<String>,
}

impl KeysetStrategy {
    pub fn new(order: OrderSpec, tiebreaker: &str) -> Self {
        Self {
            order,
            tiebreaker: tiebreaker.to_string(),
            qualifier: None,
        }
    }

    /// Qualifies every generated column reference, e.g. with a table alias.
    pub fn qualified(mut self, qualifier: Option<&str>) -> Self {
        self.qualifier = qualifier.map(String::from);
        self
    }

    pub fn order(&self) -> &OrderSpec {
        &self.order
    }

    pub fn tiebreaker(&self) -> &str {
        &self.tiebreaker
    }

    /// The same strategy over the direction-inverted order.
    pub fn inverted(&self) -> Self {
        Self {
            order: self.order.inverted(),
            tiebreaker: self.tiebreaker.clone(),
            qualifier: self.qualifier.clone(),
        }
    }

    pub fn column(&self, name: &str) -> Expr {
        qualified(self.qualifier.as_deref(), name)
    }

    pub fn tiebreaker_ident(&self) -> Expr {
        self.column(&self.tiebreaker)
    }

    /// Builds the "rows past the boundary" disjunction for `cursor`.
    ///
    /// For keys `k1..kn` clause `i` pins `k1..ki` to the cursor values and
    /// compares `k(i+1)`; the final clause pins every key and compares the
    /// tie-breaker, using `>` when reading forward and `<` when reading
    /// backward. `NULL` sorts above every value, so a NULL bound is pinned
    /// with `IS NULL` and compared with `IS NOT NULL`.
    ///
    /// An order key naming the tie-breaker column is bound to the cursor id.
    pub fn predicate(
        &self,
        cursor: &Cursor,
        traversal: CursorDirection,
    ) -> Result<Expr, KeysetError> {
        let missing = cursor.missing_keys(self.order.keys().filter(|key| *key != self.tiebreaker));
        if !missing.is_empty() {
            return Err(KeysetError::MissingKeys(missing));
        }

        let bound = |key: &str| match cursor.get(key) {
            _ if key == self.tiebreaker => Value::Int(cursor.id()),
            Some(value) => value.clone(),
            None => Value::Null,
        };
        let entries: Vec<(&str, SortDirection)> = self.order.iter().collect();

        let guarded = |pinned: usize, comparison: Expr| {
            let eqs = entries[..pinned]
                .iter()
                .map(|&(key, _)| self.pinned(key, bound(key)))
                .reduce(Expr::and);
            match eqs {
                Some(eqs) => eqs.and(comparison),
                None => comparison,
            }
        };

        let tiebreak = guarded(
            entries.len(),
            binary(
                self.tiebreaker_ident(),
                tiebreak_operator(traversal),
                value(cursor.id().into()),
            ),
        );

        let seek = entries
            .iter()
            .enumerate()
            .filter_map(|(i, &(key, direction))| {
                self.beyond(key, bound(key), seek_operator(direction))
                    .map(|comparison| guarded(i, comparison))
            })
            .reduce(Expr::or);

        Ok(match seek {
            Some(seek) => seek.or(tiebreak),
            None => tiebreak,
        })
    }

    fn pinned(&self, key: &str, bound: Value) -> Expr {
        if bound.is_null() {
            self.column(key).is_null()
        } else {
            binary(self.column(key), BinaryOperator::Eq, value(bound))
        }
    }

    /// Rows sorting strictly past `bound` on `key`. `None` when nothing can,
    /// i.e. the bound is NULL and the comparison looks upward.
    fn beyond(&self, key: &str, bound: Value, op: BinaryOperator) -> Option<Expr> {
        match (op, bound.is_null()) {
            (BinaryOperator::Gt, true) => None,
            (BinaryOperator::Gt, false) => {
                Some(binary(self.column(key), op, value(bound)).or(self.column(key).is_null()))
            }
            (_, true) => Some(self.column(key).is_not_null()),
            (_, false) => Some(binary(self.column(key), op, value(bound))),
        }
    }

    pub fn apply_predicate(
        &self,
        builder: SelectBuilder<FromState>,
        cursor: &Cursor,
        traversal: CursorDirection,
    ) -> Result<SelectBuilder<FromState>, KeysetError> {
        Ok(builder.and_where(self.predicate(cursor, traversal)?))
    }

    /// Replaces any existing ordering with the order keys followed by the
    /// tie-breaker in `tiebreak` direction.
    pub fn apply_ordering(
        &self,
        builder: SelectBuilder<FromState>,
        tiebreak: OrderDir,
    ) -> SelectBuilder<FromState> {
        let builder = self
            .order
            .iter()
            .fold(builder.clear_order_by(), |builder, (key, direction)| {
                builder.order_by(self.column(key), Some(direction.into()))
            });
        builder.order_by(self.tiebreaker_ident(), Some(tiebreak))
    }
}

fn seek_operator(direction: SortDirection) -> BinaryOperator {
    match direction {
        SortDirection::Asc => BinaryOperator::Gt,
        SortDirection::Desc => BinaryOperator::Lt,
    }
}

fn tiebreak_operator(traversal: CursorDirection) -> BinaryOperator {
    match traversal {
        CursorDirection::Forward => BinaryOperator::Gt,
        CursorDirection::Backward => BinaryOperator::Lt,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        query::{ast::expr::Expr, dialect::Postgres, ident, renderer::Renderer},
        table_ref,
    };

    fn cursor(keys: &[(&str, Value)], id: i64, direction: CursorDirection) -> Cursor {
        Cursor::new(
            id,
            direction,
            keys.iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        )
    }

    fn render(expr: &Expr) -> (String, Vec<Value>) {
        Renderer::render_node(expr, &Postgres)
    }

    #[test]
    fn test_empty_order_compares_tiebreaker_only() {
        let strategy = KeysetStrategy::new(OrderSpec::new(), "id");

        let forward = strategy
            .predicate(&cursor(&[], 7, CursorDirection::Forward), CursorDirection::Forward)
            .unwrap();
        assert_eq!(render(&forward), (r#"("id" > $1)"#.into(), vec![Value::Int(7)]));

        let backward = strategy
            .predicate(&cursor(&[], 7, CursorDirection::Backward), CursorDirection::Backward)
            .unwrap();
        assert_eq!(render(&backward).0, r#"("id" < $1)"#);
    }

    #[test]
    fn test_single_key_predicate() {
        let order = OrderSpec::parse("created_at.ASC").unwrap();
        let strategy = KeysetStrategy::new(order, "id");
        let c = cursor(&[("created_at", Value::from("t2"))], 2, CursorDirection::Forward);

        let (sql, params) = render(&strategy.predicate(&c, CursorDirection::Forward).unwrap());
        assert_eq!(
            sql,
            concat!(
                r#"((("created_at" > $1) OR ("created_at" IS NULL)) OR "#,
                r#"(("created_at" = $2) AND ("id" > $3)))"#
            )
        );
        assert_eq!(
            params,
            vec![Value::from("t2"), Value::from("t2"), Value::Int(2)]
        );
    }

    #[test]
    fn test_mixed_directions_predicate() {
        let order = OrderSpec::parse("a.ASC,b.DESC").unwrap();
        let strategy = KeysetStrategy::new(order, "id").qualified(Some("e"));
        let c = cursor(
            &[("a", Value::Int(1)), ("b", Value::Int(2))],
            3,
            CursorDirection::Forward,
        );

        let (sql, params) = render(&strategy.predicate(&c, CursorDirection::Forward).unwrap());
        assert_eq!(
            sql,
            concat!(
                r#"(((("e"."a" > $1) OR ("e"."a" IS NULL)) OR (("e"."a" = $2) AND ("e"."b" < $3))) OR "#,
                r#"((("e"."a" = $4) AND ("e"."b" = $5)) AND ("e"."id" > $6)))"#
            )
        );
        assert_eq!(params.len(), 6);
        assert_eq!(params[5], Value::Int(3));
    }

    #[test]
    fn test_inverted_backward_predicate_flips_every_operator() {
        let order = OrderSpec::parse("a.ASC,b.DESC").unwrap();
        let strategy = KeysetStrategy::new(order, "id").inverted();
        let c = cursor(
            &[("a", Value::Int(1)), ("b", Value::Int(2))],
            3,
            CursorDirection::Backward,
        );

        let (sql, _) = render(&strategy.predicate(&c, CursorDirection::Backward).unwrap());
        assert_eq!(
            sql,
            concat!(
                r#"((("a" < $1) OR (("a" = $2) AND (("b" > $3) OR ("b" IS NULL)))) OR "#,
                r#"((("a" = $4) AND ("b" = $5)) AND ("id" < $6)))"#
            )
        );
    }

    #[test]
    fn test_missing_cursor_keys_are_reported() {
        let order = OrderSpec::parse("created_at.ASC,name.ASC").unwrap();
        let strategy = KeysetStrategy::new(order, "id");
        let c = cursor(&[("created_at", Value::from("t1"))], 1, CursorDirection::Forward);

        assert_eq!(
            strategy.predicate(&c, CursorDirection::Forward),
            Err(KeysetError::MissingKeys(vec!["name".into()]))
        );
    }

    #[test]
    fn test_extra_cursor_keys_are_ignored() {
        let strategy = KeysetStrategy::new(OrderSpec::new(), "id");
        let c = cursor(&[("venue", Value::from("Hall"))], 4, CursorDirection::Forward);

        let (sql, params) = render(&strategy.predicate(&c, CursorDirection::Forward).unwrap());
        assert_eq!(sql, r#"("id" > $1)"#);
        assert_eq!(params, vec![Value::Int(4)]);
    }

    #[test]
    fn test_null_bounds_use_null_checks() {
        let order = OrderSpec::parse("score.ASC").unwrap();
        let strategy = KeysetStrategy::new(order, "id");
        let c = cursor(&[("score", Value::Null)], 2, CursorDirection::Forward);

        let (sql, params) = render(&strategy.predicate(&c, CursorDirection::Forward).unwrap());
        assert_eq!(sql, r#"(("score" IS NULL) AND ("id" > $1))"#);
        assert_eq!(params, vec![Value::Int(2)]);

        let (sql, _) = render(
            &strategy
                .inverted()
                .predicate(&c, CursorDirection::Backward)
                .unwrap(),
        );
        assert_eq!(
            sql,
            r#"(("score" IS NOT NULL) OR (("score" IS NULL) AND ("id" < $1)))"#
        );
    }

    #[test]
    fn test_tiebreaker_as_order_key_binds_cursor_id() {
        let order = OrderSpec::parse("id.DESC").unwrap();
        let strategy = KeysetStrategy::new(order, "id");
        let c = cursor(&[], 4, CursorDirection::Forward);

        let (sql, params) = render(&strategy.predicate(&c, CursorDirection::Forward).unwrap());
        assert_eq!(sql, r#"(("id" < $1) OR (("id" = $2) AND ("id" > $3)))"#);
        assert_eq!(params, vec![Value::Int(4); 3]);
    }

    #[test]
    fn test_apply_ordering_appends_tiebreaker() {
        let order = OrderSpec::parse("created_at.DESC").unwrap();
        let strategy = KeysetStrategy::new(order, "id");

        let builder = SelectBuilder::new()
            .select(vec![Expr::Wildcard(None)])
            .from(table_ref!("events"), None)
            .order_by(ident("name"), None);

        let ast = strategy.apply_ordering(builder, OrderDir::Asc).build();
        let (sql, _) = Renderer::render_node(&ast, &Postgres);
        assert_eq!(
            sql,
            r#"SELECT * FROM "events" ORDER BY "created_at" DESC, "id" ASC"#
        );
    }
}
