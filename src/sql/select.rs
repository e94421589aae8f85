//! Staged SELECT statement builder
//!
//! [`SelectBuilder`] is an immutable accumulator: every stage consumes the
//! builder and returns the next one. Filter values are bound in the order they
//! are given; the offset, if any, is bound last when the statement is built.
//! Placeholder numbers come from the bound value list itself and start at `$1`.

use serde_json::Value;

use crate::sql::clause::{JoinPredicate, Projection, SortSpec};
use crate::sql::statement::{Params, Statement};

/// Builder for a single-table SELECT with optional join, filter, sort and paging
#[derive(Debug, Clone)]
#[must_use]
pub struct SelectBuilder {
    table: String,
    projection: Projection,
    join_table: Option<String>,
    join_predicate: Option<JoinPredicate>,
    conditions: Vec<String>,
    order_by: Option<String>,
    limit: Option<i64>,
    offset: Option<i64>,
    params: Params,
}

impl SelectBuilder {
    /// Start a SELECT against `table`
    ///
    /// `table` must already be a validated identifier.
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            projection: Projection::All,
            join_table: None,
            join_predicate: None,
            conditions: Vec::new(),
            order_by: None,
            limit: None,
            offset: None,
            params: Params::new(),
        }
    }

    /// Set the projection; `*` when `None`
    pub fn select(self, fields: Option<&Projection>) -> Self {
        Self {
            projection: fields.cloned().unwrap_or(Projection::All),
            ..self
        }
    }

    /// Name the table to join; rendered only once [`on`](Self::on) also supplies a predicate
    pub fn join(self, table: Option<&str>) -> Self {
        match table {
            Some(table) => Self {
                join_table: Some(table.to_string()),
                ..self
            },
            None => self,
        }
    }

    /// Supply the join predicate; rendered only if a join table was given
    pub fn on(self, predicate: Option<&JoinPredicate>) -> Self {
        match predicate {
            Some(predicate) => Self {
                join_predicate: Some(predicate.clone()),
                ..self
            },
            None => self,
        }
    }

    /// Add equality conditions, joined with AND, in iteration order
    ///
    /// Every present value is bound, including `0`, `""` and `false`; an
    /// absent value (`None`) contributes nothing. A JSON `null` renders as
    /// `IS NULL` and binds nothing.
    pub fn filter<'a, I>(self, conditions: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, Option<&'a Value>)>,
    {
        conditions
            .into_iter()
            .fold(self, |builder, (column, value)| match value {
                None => builder,
                Some(Value::Null) => builder.push_condition(format!("{} IS NULL", column)),
                Some(value) => {
                    let (params, placeholder) = builder.params.clone().bind(value.clone());
                    Self { params, ..builder }
                        .push_condition(format!("{} = {}", column, placeholder))
                }
            })
    }

    /// Add an ORDER BY clause
    pub fn order_by(self, sort: Option<&SortSpec>) -> Self {
        match sort {
            Some(sort) => Self {
                order_by: Some(sort.to_string()),
                ..self
            },
            None => self,
        }
    }

    /// Add `LIMIT n` when `n` is positive
    pub fn limit(self, limit: Option<i64>) -> Self {
        match limit {
            Some(limit) if limit > 0 => Self {
                limit: Some(limit),
                ..self
            },
            _ => self,
        }
    }

    /// Set the offset, replacing any earlier one; rendered as `OFFSET $n` when non-zero
    pub fn offset(self, offset: Option<i64>) -> Self {
        match offset {
            Some(offset) => Self {
                offset: (offset != 0).then_some(offset),
                ..self
            },
            None => self,
        }
    }

    /// Render the statement
    pub fn build(self) -> Statement {
        let mut text = format!("SELECT {} FROM {}", self.projection, self.table);

        if let (Some(table), Some(predicate)) = (&self.join_table, &self.join_predicate) {
            text.push_str(&format!(" JOIN {} ON {}", table, predicate));
        }

        if !self.conditions.is_empty() {
            text.push_str(" WHERE ");
            text.push_str(&self.conditions.join(" AND "));
        }

        if let Some(order_by) = &self.order_by {
            text.push_str(&format!(" ORDER BY {}", order_by));
        }

        if let Some(limit) = self.limit {
            text.push_str(&format!(" LIMIT {}", limit));
        }

        let params = match self.offset {
            Some(offset) => {
                let (params, placeholder) = self.params.bind(Value::from(offset));
                text.push_str(&format!(" OFFSET {}", placeholder));
                params
            }
            None => self.params,
        };

        Statement::new(text, params.into_values())
    }

    fn push_condition(self, condition: String) -> Self {
        let mut conditions = self.conditions;
        conditions.push(condition);
        Self { conditions, ..self }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn filters(pairs: &[(&'static str, Option<Value>)]) -> Vec<(&'static str, Option<Value>)> {
        pairs.to_vec()
    }

    fn placeholder_count(text: &str) -> usize {
        text.matches('$').count()
    }

    // ==================== Projection ====================

    #[test]
    fn test_select_defaults_to_all_columns() {
        let statement = SelectBuilder::new("recipes").select(None).build();
        assert_eq!(statement.text(), "SELECT * FROM recipes");
        assert!(statement.values().is_empty());
    }

    #[test]
    fn test_select_projection() {
        let projection = Projection::parse("title,steps").unwrap();
        let statement = SelectBuilder::new("recipes").select(Some(&projection)).build();
        assert_eq!(statement.text(), "SELECT title, steps FROM recipes");
    }

    // ==================== Join ====================

    #[test]
    fn test_join_requires_table_and_predicate() {
        let predicate = JoinPredicate::parse("recipes.author_id = authors.id").unwrap();

        let only_table = SelectBuilder::new("recipes").join(Some("authors")).on(None).build();
        assert_eq!(only_table.text(), "SELECT * FROM recipes");

        let only_predicate = SelectBuilder::new("recipes").join(None).on(Some(&predicate)).build();
        assert_eq!(only_predicate.text(), "SELECT * FROM recipes");

        let both = SelectBuilder::new("recipes")
            .join(Some("authors"))
            .on(Some(&predicate))
            .build();
        assert_eq!(
            both.text(),
            "SELECT * FROM recipes JOIN authors ON recipes.author_id = authors.id"
        );
    }

    // ==================== Filter ====================

    #[test]
    fn test_filter_empty_has_no_where() {
        let statement = SelectBuilder::new("recipes")
            .filter(Vec::<(&str, Option<&Value>)>::new())
            .build();
        assert_eq!(statement.text(), "SELECT * FROM recipes");
        assert!(statement.values().is_empty());
    }

    #[test]
    fn test_filter_joins_with_and_in_order() {
        let pairs = filters(&[("title", Some(json!("Soup"))), ("steps", Some(json!("Boil")))]);
        let statement = SelectBuilder::new("recipes")
            .filter(pairs.iter().map(|(k, v)| (*k, v.as_ref())))
            .build();

        assert_eq!(
            statement.text(),
            "SELECT * FROM recipes WHERE title = $1 AND steps = $2"
        );
        assert_eq!(statement.values(), &[json!("Soup"), json!("Boil")]);
    }

    #[test]
    fn test_filter_binds_falsy_values() {
        let pairs = filters(&[
            ("id", Some(json!(0))),
            ("title", Some(json!(""))),
            ("published", Some(json!(false))),
        ]);
        let statement = SelectBuilder::new("recipes")
            .filter(pairs.iter().map(|(k, v)| (*k, v.as_ref())))
            .build();

        assert_eq!(placeholder_count(statement.text()), 3);
        assert_eq!(statement.values(), &[json!(0), json!(""), json!(false)]);
    }

    #[test]
    fn test_filter_skips_absent_values() {
        let pairs = filters(&[("title", None), ("steps", Some(json!("Fry")))]);
        let statement = SelectBuilder::new("recipes")
            .filter(pairs.iter().map(|(k, v)| (*k, v.as_ref())))
            .build();

        assert_eq!(statement.text(), "SELECT * FROM recipes WHERE steps = $1");
        assert_eq!(statement.values(), &[json!("Fry")]);
    }

    #[test]
    fn test_filter_null_is_null_check() {
        let pairs = filters(&[("steps", Some(Value::Null)), ("title", Some(json!("Soup")))]);
        let statement = SelectBuilder::new("recipes")
            .filter(pairs.iter().map(|(k, v)| (*k, v.as_ref())))
            .build();

        assert_eq!(
            statement.text(),
            "SELECT * FROM recipes WHERE steps IS NULL AND title = $1"
        );
        assert_eq!(statement.values(), &[json!("Soup")]);
    }

    // ==================== Order / Limit / Offset ====================

    #[test]
    fn test_order_limit_offset() {
        let sort = SortSpec::parse("title").unwrap();
        let statement = SelectBuilder::new("recipes")
            .order_by(Some(&sort))
            .limit(Some(10))
            .offset(Some(10))
            .build();

        assert_eq!(
            statement.text(),
            "SELECT * FROM recipes ORDER BY title LIMIT 10 OFFSET $1"
        );
        assert_eq!(statement.values(), &[json!(10)]);
    }

    #[test]
    fn test_zero_limit_and_offset_are_noops() {
        let statement = SelectBuilder::new("recipes").limit(Some(0)).offset(Some(0)).build();
        assert_eq!(statement.text(), "SELECT * FROM recipes");
        assert!(statement.values().is_empty());
    }

    #[test]
    fn test_offset_placeholder_follows_filters() {
        let pairs = filters(&[("title", Some(json!("Soup"))), ("id", Some(json!(3)))]);
        let statement = SelectBuilder::new("recipes")
            .filter(pairs.iter().map(|(k, v)| (*k, v.as_ref())))
            .limit(Some(5))
            .offset(Some(15))
            .build();

        assert_eq!(
            statement.text(),
            "SELECT * FROM recipes WHERE title = $1 AND id = $2 LIMIT 5 OFFSET $3"
        );
        assert_eq!(statement.values(), &[json!("Soup"), json!(3), json!(15)]);
    }

    #[test]
    fn test_stages_do_not_share_state() {
        let base = SelectBuilder::new("recipes");
        let pairs = filters(&[("title", Some(json!("Soup")))]);
        let filtered = base
            .clone()
            .filter(pairs.iter().map(|(k, v)| (*k, v.as_ref())))
            .build();
        let plain = base.build();

        assert_eq!(filtered.values().len(), 1);
        assert!(plain.values().is_empty());
    }

    #[test]
    fn test_offset_replaces_earlier_offset() {
        let statement = SelectBuilder::new("recipes")
            .limit(Some(5))
            .offset(Some(5))
            .offset(Some(10))
            .build();

        assert_eq!(statement.text(), "SELECT * FROM recipes LIMIT 5 OFFSET $1");
        assert_eq!(statement.values(), &[json!(10)]);
    }

    #[test]
    fn test_zero_offset_clears_earlier_offset() {
        let statement = SelectBuilder::new("recipes").offset(Some(20)).offset(Some(0)).build();
        assert_eq!(statement.text(), "SELECT * FROM recipes");
        assert!(statement.values().is_empty());
    }

    #[test]
    fn test_offset_before_filter_is_bound_last() {
        let pairs = filters(&[("title", Some(json!("Soup")))]);
        let statement = SelectBuilder::new("recipes")
            .offset(Some(30))
            .filter(pairs.iter().map(|(k, v)| (*k, v.as_ref())))
            .build();

        assert_eq!(
            statement.text(),
            "SELECT * FROM recipes WHERE title = $1 OFFSET $2"
        );
        assert_eq!(statement.values(), &[json!("Soup"), json!(30)]);
    }
}
