
use anyhow::{Result, bail};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};

/// One stored chunk with its decoded embedding. Rows are append-only and
/// never mutated after insert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkRecord {
    pub id: i64,
    pub chunk_text: String,
    pub embedding: Vec<f32>,
    pub source_file: String,
    pub chunk_index: i64,
    pub created_at: NaiveDateTime,
}

/// Outcome of one insert attempt. Duplicates and per-row failures are
/// ordinary outcomes, not errors, so a batch never aborts on one row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InsertOutcome {
    Inserted,
    SkippedDuplicate,
    Failed(String),
}

/// One ranked search result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: i64,
    pub chunk_text: String,
    pub source_file: String,
    pub chunk_index: i64,
    pub score: f32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct LogEntry {
    pub id: i64,
    pub timestamp: NaiveDateTime,
    pub level: LogLevel,
    pub message: String,
    /// Structured context serialized as JSON text.
    pub details: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[sqlx(type_name = "TEXT", rename_all = "UPPERCASE")]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl std::fmt::Display for LogLevel {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            LogLevel::Debug => write!(f, "DEBUG"),
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Warning => write!(f, "WARNING"),
            LogLevel::Error => write!(f, "ERROR"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStats {
    pub total_chunks: i64,
    pub source_files: i64,
}

/// Encode an embedding as a little-endian f32 byte blob for storage.
#[inline]
pub fn embedding_to_blob(embedding: &[f32]) -> Vec<u8> {
    let mut blob = Vec::with_capacity(embedding.len() * 4);
    for component in embedding {
        blob.extend_from_slice(&component.to_le_bytes());
    }
    blob
}

/// Decode a stored blob back into an embedding vector.
#[inline]
pub fn blob_to_embedding(blob: &[u8]) -> Result<Vec<f32>> {
    if blob.len() % 4 != 0 {
        bail!(
            "Embedding blob length {} is not a multiple of 4",
            blob.len()
        );
    }

    Ok(blob
        .chunks_exact(4)
        .map(|bytes| f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
        .collect())
}
