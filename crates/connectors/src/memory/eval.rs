use crate::error::DbError;
use model::{
    core::value::Value,
    records::row::{FieldValue, RowData},
};
use planner::query::ast::{
    common::OrderDir,
    expr::{BinaryOp, BinaryOperator, Expr},
    select::{OrderByExpr, Select},
};
use std::{borrow::Cow, cmp::Ordering, collections::HashMap};

pub(crate) type Tables = HashMap<String, Vec<RowData>>;

/// Evaluates a `Select` against in-memory tables with SQL semantics:
/// three-valued logic in `WHERE`, `NULL`s sorting as the largest value,
/// and CTEs shadowing tables of the same name.
pub(crate) struct Evaluator<'a> {
    tables: &'a Tables,
}

impl<'a> Evaluator<'a> {
    pub fn new(tables: &'a Tables) -> Self {
        Self { tables }
    }

    pub fn run(&self, query: &Select) -> Result<Vec<RowData>, DbError> {
        self.select(query, &Tables::new())
    }

    fn select(&self, query: &Select, outer: &Tables) -> Result<Vec<RowData>, DbError> {
        let scope = if query.ctes.is_empty() {
            Cow::Borrowed(outer)
        } else {
            let mut scope = outer.clone();
            for cte in &query.ctes {
                let rows = self.select(&cte.query, &scope)?;
                scope.insert(cte.name.clone(), rows);
            }
            Cow::Owned(scope)
        };

        if !query.joins.is_empty() {
            return Err(DbError::Unsupported("JOIN".to_string()));
        }

        let from = query
            .from
            .as_ref()
            .ok_or_else(|| DbError::Unsupported("SELECT without FROM".to_string()))?;
        let source = scope
            .get(&from.table.name)
            .or_else(|| self.tables.get(&from.table.name))
            .ok_or_else(|| DbError::UnknownTable(from.table.name.clone()))?;

        let mut rows = Vec::new();
        for row in source {
            let keep = match &query.where_clause {
                Some(condition) => self.truth(condition, row, &scope)? == Some(true),
                None => true,
            };
            if keep {
                rows.push(row);
            }
        }

        let mut rows = self.sort(rows, &query.order_by, &scope)?;

        if let Some(limit) = &query.limit {
            let limit = self
                .scalar(limit, &RowData::new("", Vec::new()), &scope)?
                .as_i64()
                .ok_or_else(|| DbError::Unsupported("non-integer LIMIT".to_string()))?;
            rows.truncate(limit.max(0) as usize);
        }

        rows.into_iter()
            .map(|row| project(row, &query.columns, &from.table.name))
            .collect()
    }

    fn sort<'r>(
        &self,
        rows: Vec<&'r RowData>,
        order_by: &[OrderByExpr],
        scope: &Tables,
    ) -> Result<Vec<&'r RowData>, DbError> {
        if order_by.is_empty() {
            return Ok(rows);
        }

        let mut keyed = rows
            .into_iter()
            .map(|row| {
                let keys = order_by
                    .iter()
                    .map(|order| self.scalar(&order.expr, row, scope))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok((keys, row))
            })
            .collect::<Result<Vec<_>, DbError>>()?;

        keyed.sort_by(|(a, _), (b, _)| {
            a.iter()
                .zip(b)
                .zip(order_by)
                .map(|((a, b), order)| {
                    let ordering = compare_nulls_last(a, b);
                    match order.direction {
                        Some(OrderDir::Desc) => ordering.reverse(),
                        _ => ordering,
                    }
                })
                .find(|ordering| *ordering != Ordering::Equal)
                .unwrap_or(Ordering::Equal)
        });

        Ok(keyed.into_iter().map(|(_, row)| row).collect())
    }

    fn scalar(&self, expr: &Expr, row: &RowData, scope: &Tables) -> Result<Value, DbError> {
        match expr {
            Expr::Identifier(ident) => Ok(row.get_value(&ident.name)),
            Expr::Value(value) => Ok(value.clone()),
            Expr::BinaryOp(_) | Expr::InSubquery { .. } | Expr::IsNull { .. } => Ok(self
                .truth(expr, row, scope)?
                .map_or(Value::Null, Value::Boolean)),
            Expr::Wildcard(_) => Err(DbError::Unsupported(
                "wildcard outside of a projection".to_string(),
            )),
        }
    }

    /// `None` is SQL `UNKNOWN`.
    fn truth(&self, expr: &Expr, row: &RowData, scope: &Tables) -> Result<Option<bool>, DbError> {
        match expr {
            Expr::BinaryOp(op) => self.binary(op, row, scope),
            Expr::IsNull { expr, negated } => {
                Ok(Some(self.scalar(expr, row, scope)?.is_null() != *negated))
            }
            Expr::InSubquery { expr, subquery } => {
                let needle = self.scalar(expr, row, scope)?;
                if needle.is_null() {
                    return Ok(None);
                }

                let mut saw_null = false;
                for candidate in self.select(subquery, scope)? {
                    let value = candidate
                        .field_values
                        .first()
                        .and_then(|f| f.value.clone())
                        .unwrap_or(Value::Null);
                    if value.is_null() {
                        saw_null = true;
                    } else if needle.equal(&value) {
                        return Ok(Some(true));
                    }
                }
                Ok(if saw_null { None } else { Some(false) })
            }
            _ => Ok(self.scalar(expr, row, scope)?.as_bool()),
        }
    }

    fn binary(&self, op: &BinaryOp, row: &RowData, scope: &Tables) -> Result<Option<bool>, DbError> {
        match op.op {
            BinaryOperator::And => {
                let left = self.truth(&op.left, row, scope)?;
                if left == Some(false) {
                    return Ok(Some(false));
                }
                let right = self.truth(&op.right, row, scope)?;
                Ok(match (left, right) {
                    (_, Some(false)) => Some(false),
                    (Some(true), Some(true)) => Some(true),
                    _ => None,
                })
            }
            BinaryOperator::Or => {
                let left = self.truth(&op.left, row, scope)?;
                if left == Some(true) {
                    return Ok(Some(true));
                }
                let right = self.truth(&op.right, row, scope)?;
                Ok(match (left, right) {
                    (_, Some(true)) => Some(true),
                    (Some(false), Some(false)) => Some(false),
                    _ => None,
                })
            }
            BinaryOperator::Eq => self.compare(op, row, scope, Ordering::is_eq),
            BinaryOperator::NotEq => self.compare(op, row, scope, Ordering::is_ne),
            BinaryOperator::Lt => self.compare(op, row, scope, Ordering::is_lt),
            BinaryOperator::LtEq => self.compare(op, row, scope, Ordering::is_le),
            BinaryOperator::Gt => self.compare(op, row, scope, Ordering::is_gt),
            BinaryOperator::GtEq => self.compare(op, row, scope, Ordering::is_ge),
        }
    }

    fn compare(
        &self,
        op: &BinaryOp,
        row: &RowData,
        scope: &Tables,
        test: fn(Ordering) -> bool,
    ) -> Result<Option<bool>, DbError> {
        let left = self.scalar(&op.left, row, scope)?;
        let right = self.scalar(&op.right, row, scope)?;
        Ok(left.compare(&right).map(test))
    }
}

fn compare_nulls_last(a: &Value, b: &Value) -> Ordering {
    match (a.is_null(), b.is_null()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => a.compare(b).unwrap_or(Ordering::Equal),
    }
}

fn project(row: &RowData, columns: &[Expr], entity: &str) -> Result<RowData, DbError> {
    let mut field_values = Vec::with_capacity(columns.len());
    for column in columns {
        match column {
            Expr::Wildcard(_) => field_values.extend(row.field_values.iter().cloned()),
            Expr::Identifier(ident) => field_values.push(FieldValue {
                name: ident.name.clone(),
                value: Some(row.get_value(&ident.name)),
            }),
            other => {
                return Err(DbError::Unsupported(format!(
                    "projection of {other:?}"
                )));
            }
        }
    }
    Ok(RowData::new(entity, field_values))
}

#[cfg(test)]
mod tests {
    use super::*;
    use planner::{
        query::{binary, builder::select::SelectBuilder, ident, value},
        table_ref,
    };

    fn tables() -> Tables {
        let rows = [(1, Some(30)), (2, None), (3, Some(10)), (4, Some(20))]
            .into_iter()
            .map(|(id, score)| {
                RowData::from_pairs(
                    "scores",
                    [
                        ("id", Value::Int(id)),
                        ("score", score.map_or(Value::Null, Value::Int)),
                    ],
                )
            })
            .collect();
        HashMap::from([("scores".to_string(), rows)])
    }

    fn ids(rows: &[RowData]) -> Vec<i64> {
        rows.iter()
            .filter_map(|row| row.get_value("id").as_i64())
            .collect()
    }

    #[test]
    fn test_null_comparison_filters_row_out() {
        let tables = tables();
        let query = SelectBuilder::new()
            .select(vec![Expr::Wildcard(None)])
            .from(table_ref!("scores"), None)
            .where_clause(binary(ident("score"), BinaryOperator::NotEq, value(Value::Int(10))))
            .build();

        let rows = Evaluator::new(&tables).run(&query).unwrap();
        assert_eq!(ids(&rows), vec![1, 4]);
    }

    #[test]
    fn test_is_null_checks() {
        let tables = tables();
        let query = |condition: Expr| {
            SelectBuilder::new()
                .select(vec![Expr::Wildcard(None)])
                .from(table_ref!("scores"), None)
                .where_clause(condition)
                .build()
        };

        let evaluator = Evaluator::new(&tables);
        let nulls = evaluator.run(&query(ident("score").is_null())).unwrap();
        assert_eq!(ids(&nulls), vec![2]);

        let others = evaluator.run(&query(ident("score").is_not_null())).unwrap();
        assert_eq!(ids(&others), vec![1, 3, 4]);
    }

    #[test]
    fn test_nulls_sort_last_ascending_first_descending() {
        let tables = tables();
        let asc = SelectBuilder::new()
            .select(vec![ident("id")])
            .from(table_ref!("scores"), None)
            .order_by(ident("score"), Some(OrderDir::Asc))
            .build();
        let desc = SelectBuilder::new()
            .select(vec![ident("id")])
            .from(table_ref!("scores"), None)
            .order_by(ident("score"), Some(OrderDir::Desc))
            .build();

        let evaluator = Evaluator::new(&tables);
        assert_eq!(ids(&evaluator.run(&asc).unwrap()), vec![3, 4, 1, 2]);
        assert_eq!(ids(&evaluator.run(&desc).unwrap()), vec![2, 1, 4, 3]);
    }

    #[test]
    fn test_cte_and_in_subquery() {
        let tables = tables();
        let top_two = SelectBuilder::new()
            .select(vec![ident("id")])
            .from(table_ref!("scores"), None)
            .order_by(ident("id"), Some(OrderDir::Desc))
            .limit(value(Value::Int(2)))
            .build();
        let picked = SelectBuilder::new()
            .select(vec![ident("id")])
            .from(table_ref!("top"), None)
            .build();

        let query = SelectBuilder::new()
            .select(vec![Expr::Wildcard(None)])
            .from(table_ref!("scores"), None)
            .with_cte("top", top_two)
            .and_where(ident("id").in_subquery(picked))
            .order_by(ident("id"), Some(OrderDir::Asc))
            .build();

        let rows = Evaluator::new(&tables).run(&query).unwrap();
        assert_eq!(ids(&rows), vec![3, 4]);
        assert_eq!(rows[0].field_values.len(), 2);
    }

    #[test]
    fn test_unknown_table() {
        let tables = tables();
        let query = SelectBuilder::new()
            .select(vec![Expr::Wildcard(None)])
            .from(table_ref!("missing"), None)
            .build();

        assert!(matches!(
            Evaluator::new(&tables).run(&query),
            Err(DbError::UnknownTable(name)) if name == "missing"
        ));
    }
}
