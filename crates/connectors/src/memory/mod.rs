//! In-process executor over tables of `RowData`, evaluating the same `Select`
//! AST the SQL adapters render.

pub mod adapter;
mod eval;
