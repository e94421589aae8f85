//! Resource repositories
//!
//! A [`Repository`] turns CRUD intent for one resource into a single
//! parameterized statement and runs it through a [`StoreClient`]. Every
//! caller-supplied column name is checked against the resource's allow-list
//! before any SQL fragment referencing it is built; those checks fail without
//! contacting the store.

use serde_json::Value;

use crate::client::StoreClient;
use crate::error::{RepositoryError, Result};
use crate::params::{Filters, QueryParams};
use crate::resource::{BodyKind, ResourceDefinition};
use crate::sql::clause::{ColumnRef, JoinPredicate, Projection, SortSpec};
use crate::sql::mutation;
use crate::sql::sanitize::validate_identifier;
use crate::sql::{SelectBuilder, Statement};
use crate::types::Record;

/// CRUD operations for one resource
#[derive(Debug, Clone)]
pub struct Repository<C> {
    definition: ResourceDefinition,
    client: C,
    validate_bodies: bool,
}

impl<C> Repository<C> {
    /// Create a repository over an already validated definition
    ///
    /// Prefer [`Registry`](crate::registry::Registry), which validates
    /// definitions before constructing repositories.
    pub fn new(definition: ResourceDefinition, client: C, validate_bodies: bool) -> Self {
        Self {
            definition,
            client,
            validate_bodies,
        }
    }

    pub fn definition(&self) -> &ResourceDefinition {
        &self.definition
    }

    pub fn name(&self) -> &str {
        &self.definition.name
    }

    pub fn table(&self) -> &str {
        &self.definition.table
    }

    pub fn client(&self) -> &C {
        &self.client
    }
}

impl<C: StoreClient> Repository<C> {
    // =========================================================================
    // Operations
    // =========================================================================

    /// List rows matching `params`
    pub async fn list(&self, params: QueryParams) -> Result<Vec<Record>> {
        let statement = self.list_statement(params)?;
        self.client.execute(&statement).await
    }

    /// Fetch the row with the given id, if any
    pub async fn get_by_id(&self, id: impl Into<Value>) -> Result<Option<Record>> {
        let statement = self.get_statement(id.into())?;
        Ok(self.client.execute(&statement).await?.into_iter().next())
    }

    /// Insert `body` and return the created row
    pub async fn create(&self, body: Record) -> Result<Record> {
        let statement = self.create_statement(body)?;
        self.client
            .execute(&statement)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| RepositoryError::database("Insert returned no row"))
    }

    /// Apply `body` to the row with the given id and return it, if it exists
    pub async fn update_by_id(&self, id: impl Into<Value>, body: Record) -> Result<Option<Record>> {
        let statement = self.update_statement(id.into(), body)?;
        Ok(self.client.execute(&statement).await?.into_iter().next())
    }

    /// Delete the row with the given id, returning whatever rows the store reports
    pub async fn delete_by_id(&self, id: impl Into<Value>) -> Result<Vec<Record>> {
        let statement = self.delete_statement(id.into())?;
        self.client.execute(&statement).await
    }
}

impl<C> Repository<C> {
    // =========================================================================
    // Statement Construction
    // =========================================================================

    /// Build the SELECT for a list request without executing it
    pub fn list_statement(&self, params: QueryParams) -> Result<Statement> {
        let (controls, filters) = params.split()?;

        self.check_filter_keys(&filters)?;
        let filters = filters.try_map_values(|column, value| self.coerce_filter(column, value))?;

        let join_table = controls
            .join
            .as_deref()
            .map(|table| self.check_join_table(table))
            .transpose()?;

        // `on` without `join` renders nothing, so it is not inspected
        let predicate = match (join_table, controls.on.as_deref()) {
            (Some(table), Some(raw)) => Some(self.parse_join_predicate(raw, table)?),
            _ => None,
        };

        let projection = controls
            .fields
            .as_deref()
            .map(|raw| self.parse_projection(raw, join_table))
            .transpose()?;

        let sort = controls
            .sort
            .as_deref()
            .map(|raw| self.parse_sort(raw, join_table))
            .transpose()?;

        let offset = controls.offset()?;

        Ok(SelectBuilder::new(self.table())
            .select(projection.as_ref())
            .join(join_table)
            .on(predicate.as_ref())
            .filter(filters.iter())
            .order_by(sort.as_ref())
            .limit(controls.limit)
            .offset(Some(offset))
            .build())
    }

    /// Build `SELECT * ... WHERE id = $1`
    pub fn get_statement(&self, id: Value) -> Result<Statement> {
        Ok(mutation::select_by_id(self.table(), self.coerce_id(id)?))
    }

    /// Build `DELETE ... WHERE id = $1`
    pub fn delete_statement(&self, id: Value) -> Result<Statement> {
        Ok(mutation::delete_by_id(self.table(), self.coerce_id(id)?))
    }

    /// Build the INSERT for `body`
    pub fn create_statement(&self, body: Record) -> Result<Statement> {
        let body = self.prepare_body(body, BodyKind::Create)?;
        Ok(mutation::insert(self.table(), &body))
    }

    /// Build the UPDATE of `body` for `id`
    pub fn update_statement(&self, id: Value, body: Record) -> Result<Statement> {
        let id = self.coerce_id(id)?;
        let body = self.prepare_body(body, BodyKind::Update)?;
        Ok(mutation::update_by_id(self.table(), id, &body))
    }

    // =========================================================================
    // Allow-list Gates
    // =========================================================================

    fn check_filter_keys(&self, filters: &Filters) -> Result<()> {
        let rejected: Vec<&str> = filters
            .keys()
            .filter(|key| !self.definition.allow_list.contains(key))
            .collect();

        if rejected.is_empty() {
            return Ok(());
        }

        tracing::warn!(
            resource = %self.definition.name,
            keys = ?rejected,
            "Rejected filter keys outside allow-list"
        );

        Err(RepositoryError::invalid_query(format!(
            "Filter keys not allowed for '{}': {}",
            self.definition.name,
            rejected.join(", ")
        )))
    }

    fn coerce_filter(&self, column: &str, value: Value) -> Result<Value> {
        match self.definition.allow_list.get(column) {
            Some(def) => def.column_type.coerce(&value).map_err(|e| {
                RepositoryError::invalid_query(format!("Invalid value for '{}': {}", column, e))
            }),
            None => Err(RepositoryError::invalid_query(format!(
                "Filter key '{}' is not allowed",
                column
            ))),
        }
    }

    fn coerce_id(&self, id: Value) -> Result<Value> {
        if id.is_null() {
            return Err(RepositoryError::validation("Id cannot be null"));
        }

        match self.definition.allow_list.get("id") {
            Some(def) => def
                .column_type
                .coerce(&id)
                .map_err(|e| RepositoryError::validation(format!("Invalid id: {}", e))),
            None => Ok(id),
        }
    }

    fn check_join_table<'a>(&self, table: &'a str) -> Result<&'a str> {
        validate_identifier(table, &[]).map_err(RepositoryError::invalid_query)?;

        if !self.definition.can_join(table) {
            tracing::warn!(
                resource = %self.definition.name,
                table,
                "Rejected join outside permitted tables"
            );
            return Err(RepositoryError::invalid_query(format!(
                "'{}' cannot be joined with '{}'",
                table, self.definition.name
            )));
        }

        Ok(table)
    }

    fn parse_join_predicate(&self, raw: &str, join_table: &str) -> Result<JoinPredicate> {
        let predicate = JoinPredicate::parse(raw).map_err(RepositoryError::invalid_query)?;

        if let Some(table) = predicate
            .tables()
            .find(|t| *t != self.table() && *t != join_table)
        {
            return Err(RepositoryError::invalid_query(format!(
                "Join condition references unknown table '{}'",
                table
            )));
        }

        let own_columns = [&predicate.left, &predicate.right]
            .into_iter()
            .filter(|side| side.table.as_deref() == Some(self.table()));
        for side in own_columns {
            self.check_column_ref(side, Some(join_table))?;
        }

        Ok(predicate)
    }

    fn parse_projection(&self, raw: &str, join_table: Option<&str>) -> Result<Projection> {
        let projection = Projection::parse(raw).map_err(RepositoryError::invalid_query)?;
        for column in projection.columns() {
            self.check_column_ref(column, join_table)?;
        }
        Ok(projection)
    }

    fn parse_sort(&self, raw: &str, join_table: Option<&str>) -> Result<SortSpec> {
        let sort = SortSpec::parse(raw).map_err(RepositoryError::invalid_query)?;
        for key in sort.keys() {
            self.check_column_ref(&key.column, join_table)?;
        }
        Ok(sort)
    }

    /// Own-table columns must be allow-listed; joined-table columns only need
    /// to be valid identifiers, which parsing already ensured.
    fn check_column_ref(&self, column: &ColumnRef, join_table: Option<&str>) -> Result<()> {
        let allowed = match column.table.as_deref() {
            None => self.definition.allow_list.contains(&column.column),
            Some(table) if table == self.table() => {
                self.definition.allow_list.contains(&column.column)
            }
            Some(table) => join_table == Some(table),
        };

        if allowed {
            Ok(())
        } else {
            tracing::warn!(
                resource = %self.definition.name,
                column = %column,
                "Rejected column outside allow-list"
            );
            Err(RepositoryError::invalid_query(format!(
                "Column '{}' is not allowed for '{}'",
                column, self.definition.name
            )))
        }
    }

    /// Gate, validate and coerce a write body to its column types
    fn prepare_body(&self, body: Record, kind: BodyKind) -> Result<Record> {
        if body.is_empty() {
            return Err(RepositoryError::validation("Body cannot be empty"));
        }

        let rejected: Vec<&str> = body
            .keys()
            .map(String::as_str)
            .filter(|key| !self.definition.allow_list.contains(key))
            .collect();

        if !rejected.is_empty() {
            tracing::warn!(
                resource = %self.definition.name,
                keys = ?rejected,
                "Rejected body keys outside allow-list"
            );
            return Err(RepositoryError::validation(format!(
                "Columns not writable for '{}': {}",
                self.definition.name,
                rejected.join(", ")
            )));
        }

        if self.validate_bodies {
            self.definition.rule.validate(&body, kind).inspect_err(|e| {
                tracing::warn!(resource = %self.definition.name, error = %e, "Body failed validation");
            })?;
        }

        body.into_iter()
            .map(|(column, value)| {
                let value = match self.definition.allow_list.get(&column) {
                    Some(def) => def.column_type.coerce(&value).map_err(|e| {
                        RepositoryError::validation(format!(
                            "Invalid value for '{}': {}",
                            column, e
                        ))
                    })?,
                    None => value,
                };
                Ok((column, value))
            })
            .collect::<Result<Record>>()
    }
}
