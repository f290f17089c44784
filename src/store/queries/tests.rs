use super::*;
use chrono::Utc;
use sqlx::sqlite::SqlitePoolOptions;
use tempfile::TempDir;

use crate::store::SCHEMA;
use crate::store::models::embedding_to_blob;

async fn create_test_pool() -> (TempDir, SqlitePool) {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let db_path = temp_dir.path().join("test.db");

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(
            sqlx::sqlite::SqliteConnectOptions::new()
                .filename(&db_path)
                .create_if_missing(true)
                .foreign_keys(true),
        )
        .await
        .expect("Failed to create test pool");

    for statement in SCHEMA {
        sqlx::query(statement)
            .execute(&pool)
            .await
            .expect("Failed to create schema");
    }

    (temp_dir, pool)
}

#[tokio::test]
async fn chunk_insert_and_listing() {
    let (_temp_dir, pool) = create_test_pool().await;

    let blob = embedding_to_blob(&[0.25, -1.0, 3.5]);
    let now = Utc::now().naive_utc();

    let second = ChunkQueries::insert(&pool, "second chunk", &blob, "notes.txt", 1, now)
        .await
        .expect("Failed to insert chunk");
    let first = ChunkQueries::insert(&pool, "first chunk", &blob, "notes.txt", 0, now)
        .await
        .expect("Failed to insert chunk");
    ChunkQueries::insert(&pool, "other file", &blob, "other.txt", 0, now)
        .await
        .expect("Failed to insert chunk");

    assert_ne!(first, second);

    let records = ChunkQueries::list_by_source_file(&pool, "notes.txt")
        .await
        .expect("Failed to list chunks");

    assert_eq!(records.len(), 2);
    assert_eq!(records[0].chunk_index, 0);
    assert_eq!(records[0].chunk_text, "first chunk");
    assert_eq!(records[0].embedding, vec![0.25, -1.0, 3.5]);
    assert_eq!(records[1].chunk_index, 1);
    assert_eq!(records[1].chunk_text, "second chunk");
}

#[tokio::test]
async fn duplicate_chunk_is_a_unique_violation() {
    let (_temp_dir, pool) = create_test_pool().await;

    let blob = embedding_to_blob(&[1.0]);
    let now = Utc::now().naive_utc();

    ChunkQueries::insert(&pool, "original", &blob, "notes.txt", 0, now)
        .await
        .expect("Failed to insert chunk");

    let err = ChunkQueries::insert(&pool, "duplicate", &blob, "notes.txt", 0, now)
        .await
        .expect_err("Duplicate coordinates should be rejected");

    assert!(
        err.as_database_error()
            .is_some_and(|db_err| db_err.is_unique_violation())
    );
}

#[tokio::test]
async fn chunk_counts() {
    let (_temp_dir, pool) = create_test_pool().await;

    let blob = embedding_to_blob(&[1.0]);
    let now = Utc::now().naive_utc();

    for (file, index) in [("a.txt", 0), ("a.txt", 1), ("b.txt", 0)] {
        ChunkQueries::insert(&pool, "chunk", &blob, file, index, now)
            .await
            .expect("Failed to insert chunk");
    }

    let total = ChunkQueries::count(&pool)
        .await
        .expect("Failed to count chunks");
    let files = ChunkQueries::count_distinct_files(&pool)
        .await
        .expect("Failed to count source files");

    assert_eq!(total, 3);
    assert_eq!(files, 2);
}

#[tokio::test]
async fn log_append_and_recent_ordering() {
    let (_temp_dir, pool) = create_test_pool().await;

    for (level, message) in [
        (LogLevel::Info, "older entry"),
        (LogLevel::Warning, "middle entry"),
        (LogLevel::Error, "newest entry"),
    ] {
        LogQueries::append(&pool, level, message, None, Utc::now().naive_utc())
            .await
            .expect("Failed to append log entry");
    }

    let entries = LogQueries::recent(&pool, 2)
        .await
        .expect("Failed to read recent entries");

    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].message, "newest entry");
    assert_eq!(entries[0].level, LogLevel::Error);
    assert_eq!(entries[1].message, "middle entry");
    assert_eq!(entries[1].level, LogLevel::Warning);
}

#[tokio::test]
async fn log_details_round_trip() {
    let (_temp_dir, pool) = create_test_pool().await;

    LogQueries::append(
        &pool,
        LogLevel::Info,
        "file processed",
        Some(r#"{"chunks": 3}"#.to_string()),
        Utc::now().naive_utc(),
    )
    .await
    .expect("Failed to append log entry");

    let entries = LogQueries::recent(&pool, 1)
        .await
        .expect("Failed to read recent entries");

    assert_eq!(entries[0].details.as_deref(), Some(r#"{"chunks": 3}"#));
}

#[tokio::test]
async fn meta_set_if_absent_keeps_first_value() {
    let (_temp_dir, pool) = create_test_pool().await;

    assert!(
        MetaQueries::get(&pool, "embedding_dimension")
            .await
            .expect("Failed to read metadata")
            .is_none()
    );

    MetaQueries::set_if_absent(&pool, "embedding_dimension", "768")
        .await
        .expect("Failed to write metadata");
    MetaQueries::set_if_absent(&pool, "embedding_dimension", "1024")
        .await
        .expect("Failed to write metadata");

    let recorded = MetaQueries::get(&pool, "embedding_dimension")
        .await
        .expect("Failed to read metadata");

    assert_eq!(recorded.as_deref(), Some("768"));
}
