//! Parameterized statements
//!
//! A [`Statement`] is SQL text plus the ordered values its `$n` placeholders
//! refer to. Placeholder `$n` always names `values[n - 1]`.

use serde::Serialize;
use serde_json::Value;

/// Finished SQL text with its ordered parameter values
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Statement {
    text: String,
    values: Vec<Value>,
}

impl Statement {
    pub(crate) fn new(text: String, values: Vec<Value>) -> Self {
        Self { text, values }
    }

    /// SQL text with `$1, $2, ...` placeholders
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Values in placeholder order
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Split into `(text, values)`
    pub fn into_parts(self) -> (String, Vec<Value>) {
        (self.text, self.values)
    }
}

/// Ordered parameter values
///
/// A placeholder is only ever produced by [`Params::bind`], which pushes the
/// value it refers to, so text and values cannot drift apart.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct Params {
    values: Vec<Value>,
}

impl Params {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Append `value`, returning the accumulator and the placeholder naming it
    pub(crate) fn bind(mut self, value: Value) -> (Self, String) {
        self.values.push(value);
        let placeholder = format!("${}", self.values.len());
        (self, placeholder)
    }

    pub(crate) fn into_values(self) -> Vec<Value> {
        self.values
    }
}
