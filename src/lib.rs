//! # resource-repository
//!
//! A parameterized SQL statement builder and allow-list guarded CRUD
//! repositories over PostgreSQL.
//!
//! Each resource is a table with an allow-list of columns. A [`Repository`]
//! turns list/get/create/update/delete intent into exactly one statement whose
//! text carries `$n` placeholders and whose values travel separately, and runs
//! it through a [`StoreClient`]. Keys outside the allow-list are rejected
//! before any SQL is built.
//!
//! ## Features
//!
//! - **Staged SELECT builder**: projection, join, equality filters, sorting,
//!   limit and offset, with placeholder numbering derived from the value list
//! - **Allow-list gate**: filter, sort, projection and body keys must be
//!   registered columns
//! - **Value coercion**: query-string text is coerced to each column's type
//! - **Registry**: resources are registered once and looked up by name
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use resource_repository::{PgStore, QueryParams, RecipeBody, Registry, StoreConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = StoreConfig::builder("postgres://localhost/cookbook").build();
//!     let store = PgStore::connect(config.clone()).await?;
//!     let registry = Registry::with_defaults(store, &config)?;
//!
//!     let recipes = registry.recipes()?;
//!     let created = recipes
//!         .create(RecipeBody::new("Tomato soup").steps("Simmer").into())
//!         .await?;
//!
//!     // SELECT * FROM recipes WHERE title = $1 ORDER BY title LIMIT 10
//!     let page = recipes
//!         .list(
//!             QueryParams::new()
//!                 .filter("title", "Tomato soup")
//!                 .sort("title")
//!                 .paginate(1, 10),
//!         )
//!         .await?;
//!
//!     println!("{:?} {}", created.get("id"), page.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration
//!
//! ```rust
//! use std::time::Duration;
//! use resource_repository::StoreConfig;
//!
//! let config = StoreConfig::builder("postgres://localhost/cookbook")
//!     .max_connections(10)
//!     .statement_timeout(Duration::from_secs(5))
//!     .validate_bodies(true)  // Enforce each resource's validation rule
//!     .build();
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod params;
pub mod registry;
pub mod repository;
pub mod resource;
pub mod sql;
pub mod types;

// Re-export main types for convenience
pub use client::{PgStore, StoreClient};
pub use config::{StoreConfig, StoreConfigBuilder};
pub use error::{RepositoryError, Result};
pub use params::{CONTROL_KEYS, Filters, ListControls, QueryParams};
pub use registry::{Registry, RegistryBuilder};
pub use repository::Repository;
pub use resource::{
    AllowList, BodyKind, FieldRule, RECIPES, RecipeBody, ResourceBody, ResourceDefinition,
    ValidationRule,
};
pub use types::{ColumnDefinition, ColumnType, Record};

// Re-export SQL utilities for advanced users
pub use sql::{SelectBuilder, Statement, validate_identifier};
