//! Store clients
//!
//! [`StoreClient`] is the only point where a repository touches the database:
//! it takes a finished [`Statement`] and returns rows. [`PgStore`] implements it
//! on a `sqlx` PostgreSQL pool.

use std::future::Future;

use serde_json::Value;
use sqlx::postgres::{PgArguments, PgPoolOptions, PgRow};
use sqlx::{Column, PgPool, Postgres, Row, TypeInfo};

use crate::config::StoreConfig;
use crate::error::{RepositoryError, Result};
use crate::sql::Statement;
use crate::types::Record;

/// Executes one parameterized statement and returns its rows
///
/// Failures are returned unchanged to the caller; no retry happens here.
pub trait StoreClient: Send + Sync {
    fn execute(&self, statement: &Statement) -> impl Future<Output = Result<Vec<Record>>> + Send;
}

/// PostgreSQL store client
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
    config: StoreConfig,
}

impl PgStore {
    /// Connect a new pool from configuration
    pub async fn connect(config: StoreConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout)
            .connect(&config.database_url)
            .await
            .map_err(|e| {
                RepositoryError::Connection(format!("Database connection failed: {}", e))
            })?;

        tracing::debug!(
            max_connections = config.max_connections,
            "Connected PostgreSQL pool"
        );

        Ok(Self { pool, config })
    }

    /// Use an existing pool
    pub fn from_pool(pool: PgPool, config: StoreConfig) -> Self {
        Self { pool, config }
    }

    /// Get a reference to the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Get a reference to the configuration
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    async fn fetch(&self, statement: &Statement) -> Result<Vec<PgRow>> {
        let query = statement
            .values()
            .iter()
            .fold(sqlx::query(statement.text()), bind_value);

        Ok(query.fetch_all(&self.pool).await?)
    }
}

impl StoreClient for PgStore {
    async fn execute(&self, statement: &Statement) -> Result<Vec<Record>> {
        tracing::debug!(
            sql = %statement.text(),
            params = statement.values().len(),
            "Executing statement"
        );

        let rows = match self.config.statement_timeout {
            Some(limit) => tokio::time::timeout(limit, self.fetch(statement))
                .await
                .map_err(|_| RepositoryError::Timeout(limit))??,
            None => self.fetch(statement).await?,
        };

        tracing::debug!(rows = rows.len(), "Statement returned");

        rows.iter().map(row_to_record).collect()
    }
}

fn bind_value<'q>(
    query: sqlx::query::Query<'q, Postgres, PgArguments>,
    value: &'q Value,
) -> sqlx::query::Query<'q, Postgres, PgArguments> {
    match value {
        Value::Null => query.bind(None::<String>),
        Value::Bool(b) => query.bind(*b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => query.bind(i),
            None => query.bind(n.as_f64()),
        },
        Value::String(s) => query.bind(s.as_str()),
        Value::Array(_) | Value::Object(_) => query.bind(sqlx::types::Json(value)),
    }
}

/// Decode a row into a record using each column's PostgreSQL type
fn row_to_record(row: &PgRow) -> Result<Record> {
    let mut record = Record::new();
    for (idx, column) in row.columns().iter().enumerate() {
        let value = decode_column(row, idx, column.type_info().name())?;
        record.insert(column.name().to_string(), value);
    }
    Ok(record)
}

fn decode_column(row: &PgRow, idx: usize, type_name: &str) -> Result<Value> {
    let value = match type_name {
        "BOOL" => row.try_get::<Option<bool>, _>(idx)?.map(Value::Bool),
        "INT2" => row.try_get::<Option<i16>, _>(idx)?.map(Value::from),
        "INT4" => row.try_get::<Option<i32>, _>(idx)?.map(Value::from),
        "INT8" => row.try_get::<Option<i64>, _>(idx)?.map(Value::from),
        "FLOAT4" => row
            .try_get::<Option<f32>, _>(idx)?
            .and_then(|v| serde_json::Number::from_f64(f64::from(v)))
            .map(Value::Number),
        "FLOAT8" => row
            .try_get::<Option<f64>, _>(idx)?
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number),
        "NUMERIC" => {
            use rust_decimal::prelude::ToPrimitive;
            row.try_get::<Option<rust_decimal::Decimal>, _>(idx)?
                .and_then(|d| d.to_f64())
                .and_then(serde_json::Number::from_f64)
                .map(Value::Number)
        }
        "UUID" => row
            .try_get::<Option<uuid::Uuid>, _>(idx)?
            .map(|v| Value::String(v.to_string())),
        "TIMESTAMPTZ" => row
            .try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(idx)?
            .map(|v| Value::String(v.to_rfc3339())),
        "TIMESTAMP" => row
            .try_get::<Option<chrono::NaiveDateTime>, _>(idx)?
            .map(|v| Value::String(v.to_string())),
        "DATE" => row
            .try_get::<Option<chrono::NaiveDate>, _>(idx)?
            .map(|v| Value::String(v.to_string())),
        "JSON" | "JSONB" => row.try_get::<Option<Value>, _>(idx)?,
        _ => row.try_get::<Option<String>, _>(idx)?.map(Value::String),
    };

    Ok(value.unwrap_or(Value::Null))
}
