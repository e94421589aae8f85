//! Single-row statements keyed by `id`, and inserts
//!
//! Column names come from the caller's record keys, so callers must check them
//! against the resource's allow-list first. A JSON `null` body value is written
//! as the `NULL` literal rather than a placeholder, leaving its type to the
//! target column.

use serde_json::Value;

use crate::sql::statement::{Params, Statement};
use crate::types::Record;

/// `SELECT * FROM <table> WHERE id = $1`
pub fn select_by_id(table: &str, id: Value) -> Statement {
    Statement::new(format!("SELECT * FROM {} WHERE id = $1", table), vec![id])
}

/// `DELETE FROM <table> WHERE id = $1`
pub fn delete_by_id(table: &str, id: Value) -> Statement {
    Statement::new(format!("DELETE FROM {} WHERE id = $1", table), vec![id])
}

/// `UPDATE <table> SET c1 = $2, ... WHERE id = $1 RETURNING *`
///
/// `$1` is reserved for `id`; body values follow in key order.
pub fn update_by_id(table: &str, id: Value, body: &Record) -> Statement {
    let (params, _) = Params::new().bind(id);

    let (params, assignments) =
        body.iter()
            .fold((params, Vec::new()), |(params, mut assignments), (column, value)| {
                let (params, placeholder) = bind_or_null(params, value);
                assignments.push(format!("{} = {}", column, placeholder));
                (params, assignments)
            });

    Statement::new(
        format!(
            "UPDATE {} SET {} WHERE id = $1 RETURNING *",
            table,
            assignments.join(", ")
        ),
        params.into_values(),
    )
}

/// `INSERT INTO <table> (c1, c2, ...) VALUES ($1, $2, ...) RETURNING *`
pub fn insert(table: &str, body: &Record) -> Statement {
    let (params, placeholders) =
        body.values()
            .fold((Params::new(), Vec::new()), |(params, mut placeholders), value| {
                let (params, placeholder) = bind_or_null(params, value);
                placeholders.push(placeholder);
                (params, placeholders)
            });

    let columns: Vec<&str> = body.keys().map(String::as_str).collect();

    Statement::new(
        format!(
            "INSERT INTO {} ({}) VALUES ({}) RETURNING *",
            table,
            columns.join(", "),
            placeholders.join(", ")
        ),
        params.into_values(),
    )
}

fn bind_or_null(params: Params, value: &Value) -> (Params, String) {
    match value {
        Value::Null => (params, "NULL".to_string()),
        value => params.bind(value.clone()),
    }
}
