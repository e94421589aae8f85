//! Repository tests against a recording in-memory store client
//!
//! These run without a database and assert the exact statement text and
//! values each operation hands to the store.

use std::sync::{Arc, Mutex};

use resource_repository::{
    ColumnDefinition, ColumnType, FieldRule, QueryParams, RecipeBody, Record, Registry,
    RepositoryError, ResourceDefinition, Result, Statement, StoreClient, StoreConfig,
    ValidationRule,
};
use serde_json::{Value, json};

/// Records every executed statement and replies with canned rows
#[derive(Debug, Clone, Default)]
struct RecordingClient {
    executed: Arc<Mutex<Vec<Statement>>>,
    rows: Arc<Mutex<Vec<Record>>>,
}

impl RecordingClient {
    fn returning(rows: Vec<Value>) -> Self {
        let client = Self::default();
        *client.rows.lock().unwrap() = rows.into_iter().map(record).collect();
        client
    }

    fn executed(&self) -> Vec<Statement> {
        self.executed.lock().unwrap().clone()
    }

    fn last(&self) -> Statement {
        self.executed().pop().expect("No statement executed")
    }
}

impl StoreClient for RecordingClient {
    async fn execute(&self, statement: &Statement) -> Result<Vec<Record>> {
        self.executed.lock().unwrap().push(statement.clone());
        Ok(self.rows.lock().unwrap().clone())
    }
}

/// Store client that always fails
#[derive(Debug, Clone)]
struct FailingClient;

impl StoreClient for FailingClient {
    async fn execute(&self, _statement: &Statement) -> Result<Vec<Record>> {
        Err(RepositoryError::database("connection reset"))
    }
}

fn record(value: Value) -> Record {
    match value {
        Value::Object(map) => map,
        other => panic!("Expected object, got {}", other),
    }
}

fn registry(client: RecordingClient) -> Registry<RecordingClient> {
    let config = StoreConfig::builder("postgres://localhost/unused").build();
    Registry::with_defaults(client, &config).expect("Default registry")
}

fn strict_registry(client: RecordingClient) -> Registry<RecordingClient> {
    let config = StoreConfig::builder("postgres://localhost/unused")
        .validate_bodies(true)
        .build();
    Registry::with_defaults(client, &config).expect("Default registry")
}

// ==================== Create / Update ====================

#[tokio::test]
async fn test_create_inserts_body_in_key_order() {
    let client = RecordingClient::returning(vec![json!({"id": 1, "title": "T", "steps": "S"})]);
    let registry = registry(client.clone());

    let created = registry
        .recipes()
        .unwrap()
        .create(record(json!({"title": "T", "steps": "S"})))
        .await
        .unwrap();

    let statement = client.last();
    assert_eq!(
        statement.text(),
        "INSERT INTO recipes (title, steps) VALUES ($1, $2) RETURNING *"
    );
    assert_eq!(statement.values(), &[json!("T"), json!("S")]);
    assert_eq!(created.get("id"), Some(&json!(1)));
}

#[tokio::test]
async fn test_update_binds_id_first() {
    let client = RecordingClient::returning(vec![json!({"id": 5, "title": "T2"})]);
    let registry = registry(client.clone());

    let updated = registry
        .recipes()
        .unwrap()
        .update_by_id(5, record(json!({"title": "T2"})))
        .await
        .unwrap();

    let statement = client.last();
    assert_eq!(
        statement.text(),
        "UPDATE recipes SET title = $2 WHERE id = $1 RETURNING *"
    );
    assert_eq!(statement.values(), &[json!(5), json!("T2")]);
    assert!(updated.is_some());
}

#[tokio::test]
async fn test_typed_body_routes_to_resource() {
    let client = RecordingClient::returning(vec![json!({"id": 2, "title": "Stew"})]);
    let registry = registry(client.clone());

    registry
        .create(RecipeBody::new("Stew").ingredients("Beans").into())
        .await
        .unwrap();

    let statement = client.last();
    assert_eq!(
        statement.text(),
        "INSERT INTO recipes (title, ingredients) VALUES ($1, $2) RETURNING *"
    );
    assert_eq!(statement.values(), &[json!("Stew"), json!("Beans")]);
}

#[tokio::test]
async fn test_body_with_unknown_column_never_reaches_store() {
    let client = RecordingClient::default();
    let registry = registry(client.clone());

    let err = registry
        .recipes()
        .unwrap()
        .create(record(json!({"title": "T", "author_id": 3})))
        .await
        .unwrap_err();

    assert!(matches!(err, RepositoryError::Validation(_)));
    assert!(client.executed().is_empty());
}

#[tokio::test]
async fn test_validation_rule_blocks_invalid_create() {
    let client = RecordingClient::default();
    let registry = strict_registry(client.clone());
    let recipes = registry.recipes().unwrap();

    let missing_title = recipes
        .create(record(json!({"steps": "Boil"})))
        .await
        .unwrap_err();
    assert!(matches!(missing_title, RepositoryError::Validation(_)));

    let wrong_type = recipes
        .create(record(json!({"title": 42})))
        .await
        .unwrap_err();
    assert!(matches!(wrong_type, RepositoryError::Validation(_)));

    assert!(client.executed().is_empty());
}

#[tokio::test]
async fn test_validation_rule_inert_by_default() {
    let client = RecordingClient::returning(vec![json!({"id": 1})]);
    let registry = registry(client.clone());

    registry
        .recipes()
        .unwrap()
        .create(record(json!({"steps": "Boil"})))
        .await
        .unwrap();

    assert_eq!(client.executed().len(), 1);
}

// ==================== Typed Columns ====================

fn meals_registry(client: RecordingClient) -> Registry<RecordingClient> {
    let config = StoreConfig::builder("postgres://localhost/unused")
        .validate_bodies(true)
        .build();
    let meals = ResourceDefinition::new(
        "meals",
        "meals",
        vec![
            ColumnDefinition::new("id", ColumnType::Integer),
            ColumnDefinition::new("title", ColumnType::String),
            ColumnDefinition::new("servings", ColumnType::Integer),
            ColumnDefinition::new("vegan", ColumnType::Boolean),
        ],
    )
    .with_rule(ValidationRule::new(vec![
        FieldRule::new("title", ColumnType::String).required(),
        FieldRule::new("servings", ColumnType::Integer),
        FieldRule::new("vegan", ColumnType::Boolean),
    ]));

    Registry::builder(client, &config)
        .register(meals)
        .build()
        .expect("Meals registry")
}

#[tokio::test]
async fn test_create_binds_coerced_values() {
    let client = RecordingClient::returning(vec![json!({"id": 1})]);
    let registry = meals_registry(client.clone());

    registry
        .repository("meals")
        .unwrap()
        .create(record(json!({"title": "Soup", "servings": "4", "vegan": "yes"})))
        .await
        .unwrap();

    let statement = client.last();
    assert_eq!(
        statement.text(),
        "INSERT INTO meals (title, servings, vegan) VALUES ($1, $2, $3) RETURNING *"
    );
    assert_eq!(statement.values(), &[json!("Soup"), json!(4), json!(true)]);
}

#[tokio::test]
async fn test_update_writes_null_without_placeholder() {
    let client = RecordingClient::returning(vec![json!({"id": 2})]);
    let registry = meals_registry(client.clone());

    registry
        .repository("meals")
        .unwrap()
        .update_by_id("2", record(json!({"servings": null, "vegan": "false"})))
        .await
        .unwrap();

    let statement = client.last();
    assert_eq!(
        statement.text(),
        "UPDATE meals SET servings = NULL, vegan = $2 WHERE id = $1 RETURNING *"
    );
    assert_eq!(statement.values(), &[json!(2), json!(false)]);
}

#[tokio::test]
async fn test_uncoercible_body_never_reaches_store() {
    let client = RecordingClient::default();
    let registry = meals_registry(client.clone());

    let err = registry
        .repository("meals")
        .unwrap()
        .update_by_id(2, record(json!({"vegan": "perhaps"})))
        .await
        .unwrap_err();

    assert!(matches!(err, RepositoryError::Validation(_)));
    assert!(client.executed().is_empty());
}

// ==================== List ====================

#[tokio::test]
async fn test_list_sort_and_page() {
    let client = RecordingClient::default();
    let registry = registry(client.clone());

    registry
        .recipes()
        .unwrap()
        .list(QueryParams::new().sort("title").limit(10).page(2))
        .await
        .unwrap();

    let statement = client.last();
    assert_eq!(
        statement.text(),
        "SELECT * FROM recipes ORDER BY title LIMIT 10 OFFSET $1"
    );
    assert_eq!(statement.values(), &[json!(10)]);
}

#[tokio::test]
async fn test_list_from_query_string() {
    let client = RecordingClient::default();
    let registry = registry(client.clone());

    let params: QueryParams = [("title", "Soup"), ("limit", "5"), ("page", "3"), ("id", "2")]
        .into_iter()
        .collect();
    registry.recipes().unwrap().list(params).await.unwrap();

    let statement = client.last();
    assert_eq!(
        statement.text(),
        "SELECT * FROM recipes WHERE title = $1 AND id = $2 LIMIT 5 OFFSET $3"
    );
    assert_eq!(statement.values(), &[json!("Soup"), json!(2), json!(10)]);
}

#[tokio::test]
async fn test_list_binds_falsy_filter_values() {
    let client = RecordingClient::default();
    let registry = registry(client.clone());

    registry
        .recipes()
        .unwrap()
        .list(QueryParams::new().filter("id", 0).filter("title", ""))
        .await
        .unwrap();

    let statement = client.last();
    assert_eq!(
        statement.text(),
        "SELECT * FROM recipes WHERE id = $1 AND title = $2"
    );
    assert_eq!(statement.values(), &[json!(0), json!("")]);
}

#[tokio::test]
async fn test_list_absent_filter_is_skipped() {
    let client = RecordingClient::default();
    let registry = registry(client.clone());

    registry
        .recipes()
        .unwrap()
        .list(QueryParams::new().with_absent("title").filter("steps", "Fry"))
        .await
        .unwrap();

    let statement = client.last();
    assert_eq!(statement.text(), "SELECT * FROM recipes WHERE steps = $1");
    assert_eq!(statement.values(), &[json!("Fry")]);
}

#[tokio::test]
async fn test_list_disallowed_key_never_reaches_store() {
    let client = RecordingClient::default();
    let registry = registry(client.clone());

    let err = registry
        .recipes()
        .unwrap()
        .list(QueryParams::new().filter("password", "hunter2"))
        .await
        .unwrap_err();

    assert!(matches!(err, RepositoryError::InvalidQueryParameters(_)));
    assert!(err.is_client_error());
    assert!(client.executed().is_empty());
}

#[tokio::test]
async fn test_list_disallowed_sort_never_reaches_store() {
    let client = RecordingClient::default();
    let registry = registry(client.clone());

    let err = registry
        .recipes()
        .unwrap()
        .list(QueryParams::new().sort("(SELECT 1)"))
        .await
        .unwrap_err();

    assert!(matches!(err, RepositoryError::InvalidQueryParameters(_)));
    assert!(client.executed().is_empty());
}

#[tokio::test]
async fn test_list_returns_store_rows() {
    let client = RecordingClient::returning(vec![
        json!({"id": 1, "title": "Soup"}),
        json!({"id": 2, "title": "Stew"}),
    ]);
    let registry = registry(client);

    let rows = registry
        .recipes()
        .unwrap()
        .list(QueryParams::new())
        .await
        .unwrap();

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[1].get("title"), Some(&json!("Stew")));
}

// ==================== By Id ====================

#[tokio::test]
async fn test_get_by_id() {
    let client = RecordingClient::returning(vec![json!({"id": 7, "title": "Soup"})]);
    let registry = registry(client.clone());

    let row = registry.recipes().unwrap().get_by_id(7).await.unwrap();

    let statement = client.last();
    assert_eq!(statement.text(), "SELECT * FROM recipes WHERE id = $1");
    assert_eq!(statement.values(), &[json!(7)]);
    assert_eq!(row.and_then(|r| r.get("title").cloned()), Some(json!("Soup")));
}

#[tokio::test]
async fn test_get_by_id_missing_row() {
    let client = RecordingClient::default();
    let registry = registry(client);

    let row = registry.recipes().unwrap().get_by_id("7").await.unwrap();
    assert!(row.is_none());
}

#[tokio::test]
async fn test_delete_by_id_returns_store_rows() {
    let client = RecordingClient::default();
    let registry = registry(client.clone());

    let rows = registry.recipes().unwrap().delete_by_id(4).await.unwrap();

    let statement = client.last();
    assert_eq!(statement.text(), "DELETE FROM recipes WHERE id = $1");
    assert_eq!(statement.values(), &[json!(4)]);
    assert!(rows.is_empty());
}

// ==================== Store Failures ====================

#[tokio::test]
async fn test_store_error_propagates_unchanged() {
    let config = StoreConfig::builder("postgres://localhost/unused").build();
    let registry = Registry::with_defaults(FailingClient, &config).unwrap();

    let err = registry.recipes().unwrap().get_by_id(1).await.unwrap_err();
    assert!(matches!(err, RepositoryError::Database(ref msg) if msg == "connection reset"));
    assert!(!err.is_client_error());
}
