//! 连真实 Postgres 的端到端测试。
//!
//! 运行方式：`TEST_DATABASE_URL=postgres://... cargo test -- --ignored`。
//! 每个测试使用独立的表，可并行执行。

use serde_json::{json, Map, Value};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::core::gateway::RecordGateway;
use crate::core::predicate::SearchPredicate;
use crate::core::schema_builder::WritePolicy;
use crate::error::AppError;
use crate::infra::ingest::{ingest, load};
use crate::models::request::SearchQuery;
use crate::models::schema::{ColumnType, TableRef, PRIMARY_KEY};
use crate::models::source::SourceTable;

async fn pool() -> PgPool {
    let url = std::env::var("TEST_DATABASE_URL").expect("TEST_DATABASE_URL must be set");
    PgPoolOptions::new()
        .max_connections(2)
        .connect(&url)
        .await
        .expect("connect to test database")
}

fn people() -> SourceTable {
    let records: Vec<Map<String, Value>> = vec![
        json!({"name": "John", "age": 30, "city": "New York"}),
        json!({"name": "Jane", "age": 25, "city": "Los Angeles"}),
        json!({"name": "Bob", "age": 35, "city": "Chicago"}),
    ]
    .into_iter()
    .filter_map(|v| v.as_object().cloned())
    .collect();
    SourceTable::from_records(&records)
}

async fn ingested(table: &str) -> RecordGateway {
    let pool = pool().await;
    let schema = ingest(
        &pool,
        &people(),
        &TableRef::new("public", table),
        WritePolicy::Overwrite,
    )
    .await
    .expect("ingest");
    RecordGateway::new(pool, schema)
}

fn search(conditions: Value, case_sensitive: bool) -> SearchPredicate {
    SearchPredicate::try_from(SearchQuery {
        conditions: conditions.as_object().cloned().unwrap_or_default(),
        operator: "AND".into(),
        case_sensitive,
    })
    .unwrap()
}

fn object(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap_or_default()
}

#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL"]
async fn ingest_loads_every_row_with_inferred_types() {
    let gw = ingested("gw_test_ingest").await;
    let age = gw.schema().column("age").map(|c| c.inferred_type);
    assert_eq!(age, Some(ColumnType::Integer));
    assert_eq!(gw.sample(Some(100)).await.unwrap().len(), 3);
}

#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL"]
async fn case_insensitive_search_finds_john_with_id_one() {
    let gw = ingested("gw_test_search").await;

    let found = gw.search(&search(json!({"name": "john"}), false), None).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0][PRIMARY_KEY], json!(1));
    assert_eq!(found[0]["name"], json!("John"));

    let strict = gw.search(&search(json!({"name": "john"}), true), None).await.unwrap();
    assert!(strict.is_empty());
}

#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL"]
async fn unknown_column_is_an_error_not_an_empty_result() {
    let gw = ingested("gw_test_unknown").await;
    let result = gw.search(&search(json!({"zip": "10001"}), false), None).await;
    assert!(matches!(result, Err(AppError::Predicate(_))));
}

#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL"]
async fn similar_matches_substrings_case_insensitively() {
    let gw = ingested("gw_test_similar").await;
    let found = gw.similar("city", "ANGEL", Some(5)).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0]["name"], json!("Jane"));

    let by_number = gw.similar("age", "3", None).await.unwrap();
    assert_eq!(by_number.len(), 2);
}

#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL"]
async fn create_then_read_back() {
    let gw = ingested("gw_test_create").await;
    let created = gw
        .create(&object(json!({"name": "Ann", "age": 41, "city": "Boston"})))
        .await
        .unwrap();
    let id = created[PRIMARY_KEY].as_i64().expect("generated id");

    let read = gw.get(id).await.unwrap();
    assert_eq!(read, created);
    assert_eq!(read["age"], json!(41));
}

#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL"]
async fn update_changes_only_given_columns() {
    let gw = ingested("gw_test_update").await;
    let updated = gw.update(2, &object(json!({"city": "Denver"}))).await.unwrap();
    assert_eq!(updated["city"], json!("Denver"));

    let read = gw.get(2).await.unwrap();
    assert_eq!(read["name"], json!("Jane"));
    assert_eq!(read["age"], json!(25));
    assert_eq!(read["city"], json!("Denver"));

    assert!(matches!(
        gw.update(999, &object(json!({"city": "x"}))).await,
        Err(AppError::NotFound(_))
    ));
}

#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL"]
async fn delete_batch_returns_existing_ids_and_is_idempotent() {
    let gw = ingested("gw_test_delete").await;
    let mut deleted = gw.delete_batch(&[1, 3, 42]).await.unwrap();
    deleted.sort();
    assert_eq!(deleted, vec![1, 3]);

    assert!(gw.delete_batch(&[1, 3, 42]).await.unwrap().is_empty());
    assert!(matches!(gw.get(1).await, Err(AppError::NotFound(_))));
}

#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL"]
async fn append_reuses_table_and_empty_load_is_a_no_op() {
    let pool = pool().await;
    let table = TableRef::new("public", "gw_test_append");
    ingest(&pool, &people(), &table, WritePolicy::Overwrite).await.unwrap();
    let schema = ingest(&pool, &people(), &table, WritePolicy::Append).await.unwrap();

    let gw = RecordGateway::new(pool.clone(), schema.clone());
    assert_eq!(gw.sample(Some(100)).await.unwrap().len(), 6);

    let empty = SourceTable::new(vec!["name".into(), "age".into(), "city".into()], vec![]);
    assert_eq!(load(&pool, &schema, &empty).await.unwrap(), 0);
}

#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL"]
async fn numeric_and_timestamp_values_read_back_exactly() {
    let pool = pool().await;
    let records: Vec<Map<String, Value>> = vec![
        json!({"price": "12345678901234567.89", "at": "2024-03-01 12:30:00", "tiny": "1e-400"}),
        json!({"price": "2", "at": "2024-03-02", "tiny": "2"}),
    ]
    .into_iter()
    .filter_map(|v| v.as_object().cloned())
    .collect();
    let schema = ingest(
        &pool,
        &SourceTable::from_records(&records),
        &TableRef::new("public", "gw_test_numeric"),
        WritePolicy::Overwrite,
    )
    .await
    .expect("ingest");
    assert_eq!(schema.column("price").map(|c| c.inferred_type), Some(ColumnType::Numeric));
    assert_eq!(schema.column("at").map(|c| c.inferred_type), Some(ColumnType::Timestamp));
    assert_eq!(schema.column("tiny").map(|c| c.inferred_type), Some(ColumnType::Text));

    let gw = RecordGateway::new(pool, schema);
    let first = gw.get(1).await.unwrap();
    assert_eq!(first["price"], json!("12345678901234567.89"));
    assert_eq!(first["at"], json!("2024-03-01T12:30:00"));
    assert_eq!(first["tiny"], json!("1e-400"));
}
