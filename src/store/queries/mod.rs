#[cfg(test)]
mod tests;

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use sqlx::{FromRow, SqlitePool};

use super::models::{ChunkRecord, LogEntry, LogLevel, blob_to_embedding};

pub struct ChunkQueries;

pub struct LogQueries;

pub struct MetaQueries;

/// Chunk row with the embedding still in blob form, for the similarity scan.
#[derive(Debug, FromRow)]
pub(crate) struct EmbeddingRow {
    pub id: i64,
    pub chunk_text: String,
    pub source_file: String,
    pub chunk_index: i64,
    pub embedding: Vec<u8>,
}

#[derive(Debug, FromRow)]
struct ChunkRow {
    id: i64,
    chunk_text: String,
    embedding: Vec<u8>,
    source_file: String,
    chunk_index: i64,
    created_at: NaiveDateTime,
}

impl ChunkRow {
    fn into_record(self) -> Result<ChunkRecord> {
        let embedding = blob_to_embedding(&self.embedding)
            .with_context(|| format!("Corrupt embedding blob for chunk {}", self.id))?;

        Ok(ChunkRecord {
            id: self.id,
            chunk_text: self.chunk_text,
            embedding,
            source_file: self.source_file,
            chunk_index: self.chunk_index,
            created_at: self.created_at,
        })
    }
}

impl ChunkQueries {
    /// Raw insert. Returns the sqlx error untouched so the caller can
    /// classify uniqueness violations.
    #[inline]
    pub async fn insert(
        pool: &SqlitePool,
        chunk_text: &str,
        embedding_blob: &[u8],
        source_file: &str,
        chunk_index: i64,
        created_at: NaiveDateTime,
    ) -> sqlx::Result<i64> {
        let result = sqlx::query(
            "INSERT INTO chunks (chunk_text, embedding, source_file, chunk_index, created_at) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(chunk_text)
        .bind(embedding_blob)
        .bind(source_file)
        .bind(chunk_index)
        .bind(created_at)
        .execute(pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    pub(crate) async fn fetch_embeddings(pool: &SqlitePool) -> Result<Vec<EmbeddingRow>> {
        sqlx::query_as::<_, EmbeddingRow>(
            "SELECT id, chunk_text, source_file, chunk_index, embedding FROM chunks",
        )
        .fetch_all(pool)
        .await
        .context("Failed to fetch stored embeddings")
    }

    #[inline]
    pub async fn list_by_source_file(
        pool: &SqlitePool,
        source_file: &str,
    ) -> Result<Vec<ChunkRecord>> {
        let rows = sqlx::query_as::<_, ChunkRow>(
            "SELECT id, chunk_text, embedding, source_file, chunk_index, created_at \
             FROM chunks WHERE source_file = ? ORDER BY chunk_index",
        )
        .bind(source_file)
        .fetch_all(pool)
        .await
        .context("Failed to list chunks for source file")?;

        rows.into_iter().map(ChunkRow::into_record).collect()
    }

    #[inline]
    pub async fn count(pool: &SqlitePool) -> Result<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM chunks")
            .fetch_one(pool)
            .await
            .context("Failed to count chunks")
    }

    #[inline]
    pub async fn count_distinct_files(pool: &SqlitePool) -> Result<i64> {
        sqlx::query_scalar("SELECT COUNT(DISTINCT source_file) FROM chunks")
            .fetch_one(pool)
            .await
            .context("Failed to count source files")
    }
}

impl LogQueries {
    /// Raw append. The store wrapper decides what to do with failures.
    #[inline]
    pub async fn append(
        pool: &SqlitePool,
        level: LogLevel,
        message: &str,
        details: Option<String>,
        timestamp: NaiveDateTime,
    ) -> sqlx::Result<()> {
        sqlx::query(
            "INSERT INTO processing_logs (timestamp, level, message, details) VALUES (?, ?, ?, ?)",
        )
        .bind(timestamp)
        .bind(level)
        .bind(message)
        .bind(details)
        .execute(pool)
        .await?;

        Ok(())
    }

    #[inline]
    pub async fn recent(pool: &SqlitePool, limit: i64) -> Result<Vec<LogEntry>> {
        sqlx::query_as::<_, LogEntry>(
            "SELECT id, timestamp, level, message, details FROM processing_logs \
             ORDER BY id DESC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(pool)
        .await
        .context("Failed to read recent log entries")
    }
}

impl MetaQueries {
    #[inline]
    pub async fn get(pool: &SqlitePool, key: &str) -> Result<Option<String>> {
        sqlx::query_scalar("SELECT value FROM store_meta WHERE key = ?")
            .bind(key)
            .fetch_optional(pool)
            .await
            .context("Failed to read store metadata")
    }

    /// Record a value only if the key has never been set.
    #[inline]
    pub async fn set_if_absent(pool: &SqlitePool, key: &str, value: &str) -> Result<()> {
        sqlx::query("INSERT INTO store_meta (key, value) VALUES (?, ?) ON CONFLICT(key) DO NOTHING")
            .bind(key)
            .bind(value)
            .execute(pool)
            .await
            .context("Failed to write store metadata")?;

        Ok(())
    }
}
