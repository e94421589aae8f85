//! Resource registry
//!
//! The registry is built once at startup from a store client and a set of
//! resource definitions, then handed to whatever needs repositories. Every
//! definition is checked while building, so an unsafe table or column name is
//! a startup error rather than a request-time one.

use std::collections::{BTreeMap, HashSet};

use serde_json::Value;

use crate::client::StoreClient;
use crate::config::StoreConfig;
use crate::error::{RepositoryError, Result};
use crate::params::CONTROL_KEYS;
use crate::repository::Repository;
use crate::resource::{RECIPES, ResourceBody, ResourceDefinition};
use crate::sql::sanitize::validate_identifier;
use crate::types::Record;

/// Repositories by resource name
#[derive(Debug, Clone)]
pub struct Registry<C> {
    repositories: BTreeMap<String, Repository<C>>,
}

impl<C: StoreClient + Clone> Registry<C> {
    /// Start building a registry around `client`
    pub fn builder(client: C, config: &StoreConfig) -> RegistryBuilder<C> {
        RegistryBuilder {
            client,
            validate_bodies: config.validate_bodies,
            definitions: Vec::new(),
        }
    }

    /// Registry holding the built-in resources
    pub fn with_defaults(client: C, config: &StoreConfig) -> Result<Self> {
        Self::builder(client, config)
            .register(ResourceDefinition::recipes())
            .build()
    }
}

impl<C: StoreClient> Registry<C> {
    /// Look up the repository for `name`
    pub fn repository(&self, name: &str) -> Result<&Repository<C>> {
        self.repositories.get(name).ok_or_else(|| {
            RepositoryError::resource_not_found(format!("Unknown resource '{}'", name))
        })
    }

    pub fn recipes(&self) -> Result<&Repository<C>> {
        self.repository(RECIPES)
    }

    /// Registered resource names, sorted
    pub fn resources(&self) -> impl Iterator<Item = &str> {
        self.repositories.keys().map(String::as_str)
    }

    /// Create from a typed body, routed by its resource tag
    pub async fn create(&self, body: ResourceBody) -> Result<Record> {
        let repository = self.repository(body.resource())?;
        repository.create(body.into_record()).await
    }

    /// Update from a typed body, routed by its resource tag
    pub async fn update_by_id(
        &self,
        id: impl Into<Value>,
        body: ResourceBody,
    ) -> Result<Option<Record>> {
        let repository = self.repository(body.resource())?;
        repository.update_by_id(id, body.into_record()).await
    }
}

/// Builder for [`Registry`]
#[derive(Debug)]
#[must_use]
pub struct RegistryBuilder<C> {
    client: C,
    validate_bodies: bool,
    definitions: Vec<ResourceDefinition>,
}

impl<C: StoreClient + Clone> RegistryBuilder<C> {
    /// Add a resource definition
    pub fn register(mut self, definition: ResourceDefinition) -> Self {
        self.definitions.push(definition);
        self
    }

    /// Validate every definition and build the registry
    pub fn build(self) -> Result<Registry<C>> {
        let mut repositories = BTreeMap::new();

        for definition in self.definitions {
            check_definition(&definition)?;

            if repositories.contains_key(&definition.name) {
                return Err(RepositoryError::invalid_definition(format!(
                    "Resource '{}' is registered twice",
                    definition.name
                )));
            }

            tracing::debug!(
                resource = %definition.name,
                table = %definition.table,
                columns = definition.allow_list.columns().len(),
                "Registered resource"
            );

            repositories.insert(
                definition.name.clone(),
                Repository::new(definition, self.client.clone(), self.validate_bodies),
            );
        }

        Ok(Registry { repositories })
    }
}

fn check_definition(definition: &ResourceDefinition) -> Result<()> {
    let invalid = |e: String| {
        RepositoryError::invalid_definition(format!("Resource '{}': {}", definition.name, e))
    };

    if definition.name.trim().is_empty() {
        return Err(RepositoryError::invalid_definition(
            "Resource name cannot be empty",
        ));
    }

    validate_identifier(&definition.table, &[]).map_err(invalid)?;

    if definition.allow_list.is_empty() {
        return Err(invalid("allow-list cannot be empty".to_string()));
    }

    let mut seen = HashSet::new();
    for name in definition.allow_list.names() {
        validate_identifier(name, &CONTROL_KEYS).map_err(invalid)?;
        if !seen.insert(name) {
            return Err(invalid(format!("column '{}' is listed twice", name)));
        }
    }

    if let Some(field) = definition
        .rule
        .fields
        .iter()
        .find(|f| !definition.allow_list.contains(&f.name))
    {
        return Err(invalid(format!(
            "validation rule field '{}' is not an allowed column",
            field.name
        )));
    }

    for table in &definition.joins {
        validate_identifier(table, &[]).map_err(invalid)?;
    }

    Ok(())
}
