//! Core type definitions for the repository layer
//!
//! Includes column types, column definitions and the record type shared by
//! bodies and result rows.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One table row, or a create/update body: column name to store-native scalar.
///
/// Keys keep insertion order, which drives column order in generated SQL.
pub type Record = serde_json::Map<String, Value>;

// ============================================================================
// Column Definitions
// ============================================================================

/// Column type used for value coercion and body validation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ColumnType {
    /// Text column
    String,

    /// Integer column (bound as a 64-bit integer)
    Integer,

    /// Numeric column (bound as a double)
    Decimal,

    /// Boolean column
    Boolean,

    /// Text column restricted to a fixed set of values
    Enum {
        /// List of allowed string values
        values: Vec<String>,
    },
}

impl ColumnType {
    /// Validate that a JSON value is compatible with this column type
    ///
    /// Strings are accepted for numeric and boolean columns when they parse,
    /// since bodies often come from form data.
    pub fn validate_value(&self, value: &Value) -> Result<(), String> {
        if value.is_null() {
            // Null is handled by the required flag, not type validation
            return Ok(());
        }

        match (self, value) {
            (ColumnType::String, Value::String(_)) => Ok(()),
            (ColumnType::String, _) => Err(format!("Type mismatch: expected string, got {}", value)),
            _ => self.coerce(value).map(|_| ()),
        }
    }

    /// Convert a loosely typed value into the representation bound for this column
    ///
    /// Query-string filters arrive as text; an `Integer` column receiving
    /// `"5"` is bound as `5` so the statement's parameter type matches.
    pub fn coerce(&self, value: &Value) -> Result<Value, String> {
        if value.is_null() {
            return Ok(Value::Null);
        }

        match (self, value) {
            (ColumnType::String, Value::String(_)) => Ok(value.clone()),
            (ColumnType::String, Value::Number(n)) => Ok(Value::String(n.to_string())),
            (ColumnType::String, Value::Bool(b)) => Ok(Value::String(b.to_string())),

            (ColumnType::Integer, Value::Number(n)) if n.is_i64() => Ok(value.clone()),
            (ColumnType::Integer, Value::String(s)) => s
                .trim()
                .parse::<i64>()
                .map(Value::from)
                .map_err(|_| format!("Cannot convert '{}' to integer", s)),

            (ColumnType::Decimal, Value::Number(_)) => Ok(value.clone()),
            (ColumnType::Decimal, Value::String(s)) => s
                .trim()
                .parse::<f64>()
                .ok()
                .and_then(serde_json::Number::from_f64)
                .map(Value::Number)
                .ok_or_else(|| format!("Cannot convert '{}' to decimal", s)),

            (ColumnType::Boolean, Value::Bool(_)) => Ok(value.clone()),
            (ColumnType::Boolean, Value::String(s)) => match s.to_lowercase().as_str() {
                "true" | "1" | "yes" => Ok(Value::Bool(true)),
                "false" | "0" | "no" => Ok(Value::Bool(false)),
                _ => Err(format!("Cannot convert '{}' to boolean", s)),
            },

            (ColumnType::Enum { values }, Value::String(s)) => {
                if values.contains(s) {
                    Ok(value.clone())
                } else {
                    Err(format!("Value '{}' not in enum values: {:?}", s, values))
                }
            }

            _ => Err(format!("Type mismatch: expected {:?}, got {}", self, value)),
        }
    }
}

/// A column a resource exposes for filtering, sorting, projection and writes
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ColumnDefinition {
    /// Column name (must be a valid PostgreSQL identifier)
    pub name: String,

    /// Column type used to coerce incoming values
    #[serde(flatten)]
    pub column_type: ColumnType,
}

impl ColumnDefinition {
    /// Create a new column definition with a name and type
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
        }
    }
}
