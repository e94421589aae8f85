//! Query parameters for list requests
//!
//! A [`QueryParams`] is an insertion-ordered mapping from keys to optional
//! values. The reserved control keys shape the statement; every other key is an
//! equality filter on a column.

use serde_json::Value;

use crate::error::{RepositoryError, Result};

/// Keys that control projection, joins, sorting and paging rather than filtering
pub const CONTROL_KEYS: [&str; 6] = ["fields", "sort", "limit", "page", "join", "on"];

/// Ordered list-request parameters
///
/// A key mapped to `None` is present but absent-valued and filters nothing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryParams {
    entries: Vec<(String, Option<Value>)>,
}

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from query-string pairs; every value is text
    ///
    /// A repeated key keeps its first position and its last value.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        pairs.into_iter().fold(Self::new(), |params, (key, value)| {
            params.with(key, Value::String(value.into()))
        })
    }

    /// Build from a JSON object of scalar values
    pub fn from_json(value: Value) -> Result<Self> {
        let Value::Object(map) = value else {
            return Err(RepositoryError::invalid_query(
                "Query parameters must be a JSON object",
            ));
        };

        map.into_iter().try_fold(Self::new(), |params, (key, value)| {
            if value.is_array() || value.is_object() {
                return Err(RepositoryError::invalid_query(format!(
                    "Query parameter '{}' must be a scalar",
                    key
                )));
            }
            Ok(params.with(key, value))
        })
    }

    /// Set `key` to `value`
    pub fn with(self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(key.into(), Some(value.into()))
    }

    /// Mark `key` as present without a value
    pub fn with_absent(self, key: impl Into<String>) -> Self {
        self.set(key.into(), None)
    }

    /// Add an equality filter
    pub fn filter(self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.with(column, value)
    }

    /// Set the projection (`"title, steps"` or `"*"`)
    pub fn fields(self, fields: impl Into<String>) -> Self {
        self.with("fields", fields.into())
    }

    /// Set the sort expression (`"title"`, `"-title"`, `"title desc"`)
    pub fn sort(self, sort: impl Into<String>) -> Self {
        self.with("sort", sort.into())
    }

    /// Set the page size
    pub fn limit(self, limit: i64) -> Self {
        self.with("limit", limit)
    }

    /// Set the 1-based page number
    pub fn page(self, page: i64) -> Self {
        self.with("page", page)
    }

    /// Set page number and size together
    pub fn paginate(self, page: i64, limit: i64) -> Self {
        self.limit(limit).page(page)
    }

    /// Join another table; needs [`on`](Self::on) as well
    pub fn join(self, table: impl Into<String>) -> Self {
        self.with("join", table.into())
    }

    /// Set the join predicate (`"recipes.author_id = authors.id"`)
    pub fn on(self, predicate: impl Into<String>) -> Self {
        self.with("on", predicate.into())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .and_then(|(_, value)| value.as_ref())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&Value>)> {
        self.entries
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_ref()))
    }

    /// Separate control keys from filters, parsing the controls
    pub fn split(self) -> Result<(ListControls, Filters)> {
        let mut controls = ListControls::default();
        let mut filters = Vec::new();

        for (key, value) in self.entries {
            match key.as_str() {
                "fields" => controls.fields = text_control(&key, value)?,
                "sort" => controls.sort = text_control(&key, value)?,
                "join" => controls.join = text_control(&key, value)?,
                "on" => controls.on = text_control(&key, value)?,
                "limit" => controls.limit = integer_control(&key, value)?,
                "page" => controls.page = integer_control(&key, value)?,
                _ => filters.push((key, value)),
            }
        }

        if matches!(controls.limit, Some(limit) if limit < 0) {
            return Err(RepositoryError::invalid_query("limit cannot be negative"));
        }
        if matches!(controls.page, Some(page) if page < 1) {
            return Err(RepositoryError::invalid_query("page must be 1 or greater"));
        }

        Ok((controls, Filters(filters)))
    }

    fn set(mut self, key: String, value: Option<Value>) -> Self {
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
        self
    }
}

impl<K, V> FromIterator<(K, V)> for QueryParams
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::from_pairs(iter)
    }
}

/// Non-control entries of a [`QueryParams`], in insertion order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filters(Vec<(String, Option<Value>)>);

impl Filters {
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(key, _)| key.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&Value>)> {
        self.0.iter().map(|(key, value)| (key.as_str(), value.as_ref()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Transform every present value, keeping order and absent entries
    pub fn try_map_values<F>(self, mut f: F) -> Result<Self>
    where
        F: FnMut(&str, Value) -> Result<Value>,
    {
        self.0
            .into_iter()
            .map(|(key, value)| {
                let value = value.map(|v| f(&key, v)).transpose()?;
                Ok((key, value))
            })
            .collect::<Result<Vec<_>>>()
            .map(Filters)
    }
}

/// Parsed control keys of a list request
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListControls {
    pub fields: Option<String>,
    pub sort: Option<String>,
    pub limit: Option<i64>,
    pub page: Option<i64>,
    pub join: Option<String>,
    pub on: Option<String>,
}

impl ListControls {
    /// Rows to skip: `(page - 1) * limit` when a page is given, else 0
    ///
    /// A page without a limit yields 0.
    pub fn offset(&self) -> Result<i64> {
        match self.page {
            Some(page) => (page - 1)
                .checked_mul(self.limit.unwrap_or(0))
                .ok_or_else(|| RepositoryError::invalid_query("page * limit overflows")),
            None => Ok(0),
        }
    }
}

/// Text control; an empty string counts as not given
fn text_control(key: &str, value: Option<Value>) -> Result<Option<String>> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(other) => Err(RepositoryError::invalid_query(format!(
            "'{}' must be a string, got {}",
            key, other
        ))),
    }
}

/// Integer control from a number or numeric text; an empty string counts as not given
fn integer_control(key: &str, value: Option<Value>) -> Result<Option<i64>> {
    let invalid = |shown: &dyn std::fmt::Display| {
        RepositoryError::invalid_query(format!("'{}' must be an integer, got {}", key, shown))
    };

    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n.as_i64().map(Some).ok_or_else(|| invalid(&n)),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => s.trim().parse::<i64>().map(Some).map_err(|_| invalid(&s)),
        Some(other) => Err(invalid(&other)),
    }
}
