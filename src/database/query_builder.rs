//! String templates for parameterized INSERT/UPDATE/SELECT statements.
//!
//! Table and column names are pasted in verbatim. They must come from code,
//! never from request input.

use serde_json::Value;
use sqlx::postgres::{PgArguments, PgQueryResult, PgRow};
use sqlx::FromRow;

use crate::database::manager::DatabaseError;

/// `INSERT INTO t (a, b) VALUES ($1, $2) RETURNING id`
pub fn build_insert_query(table: &str, columns: &[&str]) -> String {
    let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("${}", i)).collect();

    format!(
        "INSERT INTO {} ({}) VALUES ({}) RETURNING id",
        table,
        columns.join(", "),
        placeholders.join(", ")
    )
}

/// `UPDATE t SET a = $1, b = $2 WHERE id = $3`
pub fn build_update_query(table: &str, columns: &[&str]) -> String {
    let set_clauses: Vec<String> = columns
        .iter()
        .enumerate()
        .map(|(i, col)| format!("{} = ${}", col, i + 1))
        .collect();

    format!(
        "UPDATE {} SET {} WHERE id = ${}",
        table,
        set_clauses.join(", "),
        columns.len() + 1
    )
}

/// `SELECT a, b FROM t[ WHERE <where_clause>]`
pub fn build_select_query(table: &str, columns: &[&str], where_clause: &str) -> String {
    let mut query = format!("SELECT {} FROM {}", columns.join(", "), table);
    if !where_clause.is_empty() {
        query.push_str(" WHERE ");
        query.push_str(where_clause);
    }
    query
}

/// Anything that reports how many rows a statement touched
pub trait RowsAffected {
    fn rows_affected(&self) -> u64;
}

impl RowsAffected for PgQueryResult {
    fn rows_affected(&self) -> u64 {
        PgQueryResult::rows_affected(self)
    }
}

impl RowsAffected for u64 {
    fn rows_affected(&self) -> u64 {
        *self
    }
}

/// Map a zero-row UPDATE/DELETE to `NotFound`
pub fn check_rows_affected<R: RowsAffected>(result: &R) -> Result<(), DatabaseError> {
    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound("Record not found".to_string()));
    }
    Ok(())
}

pub(crate) fn bind_param_query<'q>(
    q: sqlx::query::Query<'q, sqlx::Postgres, PgArguments>,
    v: &'q Value,
) -> sqlx::query::Query<'q, sqlx::Postgres, PgArguments> {
    match v {
        Value::Null => {
            let none: Option<String> = None;
            q.bind(none)
        }
        Value::Bool(b) => q.bind(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                q.bind(i)
            } else if let Some(f) = n.as_f64() {
                q.bind(f)
            } else {
                q.bind(n.to_string())
            }
        }
        Value::String(s) => q.bind(s),
        // Arrays and objects go over as JSONB
        Value::Array(_) | Value::Object(_) => q.bind(v.clone()),
    }
}

pub(crate) fn bind_param_query_as<'q, O>(
    q: sqlx::query::QueryAs<'q, sqlx::Postgres, O, PgArguments>,
    v: &'q Value,
) -> sqlx::query::QueryAs<'q, sqlx::Postgres, O, PgArguments>
where
    O: for<'r> FromRow<'r, PgRow>,
{
    match v {
        Value::Null => {
            let none: Option<String> = None;
            q.bind(none)
        }
        Value::Bool(b) => q.bind(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                q.bind(i)
            } else if let Some(f) = n.as_f64() {
                q.bind(f)
            } else {
                q.bind(n.to_string())
            }
        }
        Value::String(s) => q.bind(s),
        Value::Array(_) | Value::Object(_) => q.bind(v.clone()),
    }
}
