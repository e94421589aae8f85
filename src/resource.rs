//! Resource definitions
//!
//! A resource is a table-backed entity type with its own allow-list of
//! columns, a body validation rule and the set of tables it may be joined with.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{RepositoryError, Result};
use crate::types::{ColumnDefinition, ColumnType, Record};

/// The columns a resource permits as filter, sort, projection and write targets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AllowList {
    columns: Vec<ColumnDefinition>,
}

impl AllowList {
    pub fn new(columns: Vec<ColumnDefinition>) -> Self {
        Self { columns }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn get(&self, name: &str) -> Option<&ColumnDefinition> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn columns(&self) -> &[ColumnDefinition] {
        &self.columns
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

// ============================================================================
// Validation Rules
// ============================================================================

/// Whether a body is a full record (create) or a partial one (update)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
    Create,
    Update,
}

/// Constraint on one body field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldRule {
    pub name: String,
    #[serde(flatten)]
    pub column_type: ColumnType,
    /// Must be present and non-null on create
    #[serde(default)]
    pub required: bool,
}

impl FieldRule {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            required: false,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

/// Schema a create/update body must satisfy
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ValidationRule {
    pub fields: Vec<FieldRule>,
    /// Accept keys with no field rule (default: false)
    #[serde(default)]
    pub allow_unknown: bool,
}

impl ValidationRule {
    pub fn new(fields: Vec<FieldRule>) -> Self {
        Self {
            fields,
            allow_unknown: false,
        }
    }

    pub fn allow_unknown(mut self) -> Self {
        self.allow_unknown = true;
        self
    }

    /// Check `body`; update bodies skip the required-field check
    pub fn validate(&self, body: &Record, kind: BodyKind) -> Result<()> {
        for (key, value) in body {
            match self.fields.iter().find(|f| f.name == *key) {
                Some(rule) => {
                    if rule.required && value.is_null() {
                        return Err(RepositoryError::validation(format!(
                            "Field '{}' cannot be null",
                            key
                        )));
                    }
                    rule.column_type.validate_value(value).map_err(|e| {
                        RepositoryError::validation(format!(
                            "Invalid value for field '{}': {}",
                            key, e
                        ))
                    })?;
                }
                None if !self.allow_unknown => {
                    return Err(RepositoryError::validation(format!(
                        "Field '{}' is not allowed",
                        key
                    )));
                }
                None => {}
            }
        }

        if kind == BodyKind::Create {
            if let Some(missing) = self
                .fields
                .iter()
                .find(|f| f.required && !body.contains_key(&f.name))
            {
                return Err(RepositoryError::validation(format!(
                    "Required field '{}' is missing",
                    missing.name
                )));
            }
        }

        Ok(())
    }
}

// ============================================================================
// Resource Definition
// ============================================================================

/// Immutable configuration of one resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceDefinition {
    /// Resource name used for registry lookup
    pub name: String,
    /// Backing table
    pub table: String,
    /// Columns permitted in filters, sorts, projections and bodies
    pub allow_list: AllowList,
    /// Body schema, enforced only when body validation is enabled
    #[serde(default)]
    pub rule: ValidationRule,
    /// Tables this resource may be joined with
    #[serde(default)]
    pub joins: Vec<String>,
}

impl ResourceDefinition {
    pub fn new(
        name: impl Into<String>,
        table: impl Into<String>,
        columns: Vec<ColumnDefinition>,
    ) -> Self {
        Self {
            name: name.into(),
            table: table.into(),
            allow_list: AllowList::new(columns),
            rule: ValidationRule::default().allow_unknown(),
            joins: Vec::new(),
        }
    }

    /// Back the resource with a different table
    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }

    pub fn with_rule(mut self, rule: ValidationRule) -> Self {
        self.rule = rule;
        self
    }

    pub fn with_join(mut self, table: impl Into<String>) -> Self {
        self.joins.push(table.into());
        self
    }

    pub fn can_join(&self, table: &str) -> bool {
        self.joins.iter().any(|t| t == table)
    }

    /// The built-in `recipes` resource
    pub fn recipes() -> Self {
        Self::new(
            RECIPES,
            "recipes",
            vec![
                ColumnDefinition::new("id", ColumnType::Integer),
                ColumnDefinition::new("title", ColumnType::String),
                ColumnDefinition::new("ingredients", ColumnType::String),
                ColumnDefinition::new("steps", ColumnType::String),
            ],
        )
        .with_rule(ValidationRule::new(vec![
            FieldRule::new("title", ColumnType::String).required(),
            FieldRule::new("ingredients", ColumnType::String),
            FieldRule::new("steps", ColumnType::String),
        ]))
    }
}

/// Name of the built-in recipes resource
pub const RECIPES: &str = "recipes";

// ============================================================================
// Typed Bodies
// ============================================================================

/// Body for the `recipes` resource
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RecipeBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ingredients: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub steps: Option<String>,
}

impl RecipeBody {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }

    pub fn ingredients(mut self, ingredients: impl Into<String>) -> Self {
        self.ingredients = Some(ingredients.into());
        self
    }

    pub fn steps(mut self, steps: impl Into<String>) -> Self {
        self.steps = Some(steps.into());
        self
    }
}

impl From<RecipeBody> for Record {
    fn from(body: RecipeBody) -> Self {
        [
            ("title", body.title),
            ("ingredients", body.ingredients),
            ("steps", body.steps),
        ]
        .into_iter()
        .filter_map(|(key, value)| value.map(|v| (key.to_string(), Value::String(v))))
        .collect()
    }
}

/// A typed body tagged with the resource it belongs to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "resource", content = "body", rename_all = "lowercase")]
pub enum ResourceBody {
    #[serde(rename = "recipes")]
    Recipe(RecipeBody),
}

impl ResourceBody {
    /// Registry name of the target resource
    pub fn resource(&self) -> &'static str {
        match self {
            Self::Recipe(_) => RECIPES,
        }
    }

    pub fn into_record(self) -> Record {
        match self {
            Self::Recipe(body) => body.into(),
        }
    }
}

impl From<RecipeBody> for ResourceBody {
    fn from(body: RecipeBody) -> Self {
        Self::Recipe(body)
    }
}
