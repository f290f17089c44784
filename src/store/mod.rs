
pub mod models;
pub mod queries;

use anyhow::{Context, Result, bail};
use chrono::Utc;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub use models::{ChunkRecord, InsertOutcome, LogEntry, LogLevel, SearchHit, StoreStats};

use models::embedding_to_blob;
use queries::{ChunkQueries, LogQueries, MetaQueries};

const META_DIMENSION_KEY: &str = "embedding_dimension";

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS chunks (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        chunk_text TEXT NOT NULL,
        embedding BLOB NOT NULL,
        source_file TEXT NOT NULL,
        chunk_index INTEGER NOT NULL,
        created_at TIMESTAMP NOT NULL,
        UNIQUE(source_file, chunk_index)
    )",
    "CREATE TABLE IF NOT EXISTS processing_logs (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        timestamp TIMESTAMP NOT NULL,
        level TEXT NOT NULL,
        message TEXT NOT NULL,
        details TEXT
    )",
    "CREATE TABLE IF NOT EXISTS store_meta (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL
    )",
];

/// Aggregate root for the persisted vectors and the append-only audit trail.
///
/// A store is usable from the moment `open` returns and unusable after
/// `close` consumes it; the dimension it was created with is recorded in the
/// store itself and re-checked on every open.
#[derive(Debug, Clone)]
pub struct VectorStore {
    pool: SqlitePool,
    dimension: usize,
    path: PathBuf,
}

impl VectorStore {
    /// Open (creating if missing) the store file and set up the schema.
    #[inline]
    pub async fn open<P: AsRef<Path>>(path: P, dimension: usize) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create store directory: {}", parent.display())
            })?;
        }

        let options = SqliteConnectOptions::new()
            .filename(&path)
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(10)
            .connect_with(options)
            .await
            .context("Failed to create store connection pool")?;

        let store = Self {
            pool,
            dimension,
            path: path.as_ref().to_path_buf(),
        };
        store.initialize().await.with_context(|| {
            format!(
                "Failed to initialize vector store at {}",
                path.as_ref().display()
            )
        })?;

        Ok(store)
    }

    #[inline]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Declared embedding dimension; every stored vector has this length.
    #[inline]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Create-if-not-exists schema setup. Idempotent: running it against an
    /// existing store changes nothing, but a store created with a different
    /// embedding dimension is rejected.
    #[inline]
    pub async fn initialize(&self) -> Result<()> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .context("Failed to create store schema")?;
        }

        MetaQueries::set_if_absent(&self.pool, META_DIMENSION_KEY, &self.dimension.to_string())
            .await?;

        let recorded = MetaQueries::get(&self.pool, META_DIMENSION_KEY)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Store metadata is missing the embedding dimension"))?;
        let recorded: usize = recorded
            .parse()
            .with_context(|| format!("Recorded embedding dimension {recorded:?} is not a number"))?;

        if recorded != self.dimension {
            bail!(
                "Store was created with embedding dimension {}, configured dimension is {}",
                recorded,
                self.dimension
            );
        }

        self.append_log(
            LogLevel::Info,
            "vector store initialized",
            Some(serde_json::json!({
                "path": self.path.display().to_string(),
                "dimension": self.dimension,
            })),
        )
        .await;

        debug!("Vector store schema ready ({} dimensions)", self.dimension);
        Ok(())
    }

    /// Insert one chunk row. Never returns an error: duplicates and failures
    /// are outcomes, evaluated independently of the surrounding batch.
    #[inline]
    pub async fn insert_chunk(
        &self,
        chunk_text: &str,
        embedding: &[f32],
        source_file: &str,
        chunk_index: i64,
    ) -> InsertOutcome {
        if embedding.len() != self.dimension {
            return InsertOutcome::Failed(format!(
                "embedding has {} dimensions, store expects {}",
                embedding.len(),
                self.dimension
            ));
        }

        let blob = embedding_to_blob(embedding);
        let now = Utc::now().naive_utc();

        match ChunkQueries::insert(&self.pool, chunk_text, &blob, source_file, chunk_index, now)
            .await
        {
            Ok(_) => InsertOutcome::Inserted,
            Err(err) if is_unique_violation(&err) => {
                debug!("Duplicate chunk skipped: {source_file} #{chunk_index}");
                InsertOutcome::SkippedDuplicate
            }
            Err(err) => InsertOutcome::Failed(err.to_string()),
        }
    }

    /// Rank every stored chunk against the query vector by cosine similarity.
    ///
    /// Results are ordered by descending score, ties broken by ascending id
    /// so equal scores come out deterministically. Returns at most `top_k`
    /// hits and an empty vector for an empty store.
    #[inline]
    pub async fn search(&self, query: &[f32], top_k: usize) -> Result<Vec<SearchHit>> {
        if query.len() != self.dimension {
            bail!(
                "Query vector has {} dimensions, store expects {}",
                query.len(),
                self.dimension
            );
        }

        let rows = ChunkQueries::fetch_embeddings(&self.pool).await?;

        let mut hits = Vec::with_capacity(rows.len());
        for row in rows {
            let embedding = models::blob_to_embedding(&row.embedding)
                .with_context(|| format!("Corrupt embedding blob for chunk {}", row.id))?;
            if embedding.len() != self.dimension {
                bail!(
                    "Stored embedding for chunk {} has {} dimensions, expected {}",
                    row.id,
                    embedding.len(),
                    self.dimension
                );
            }

            hits.push(SearchHit {
                id: row.id,
                chunk_text: row.chunk_text,
                source_file: row.source_file,
                chunk_index: row.chunk_index,
                score: cosine_similarity(query, &embedding),
            });
        }

        hits.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.id.cmp(&b.id)));
        hits.truncate(top_k);

        Ok(hits)
    }

    /// Append one row to the audit trail. Best-effort: a failure to persist
    /// the row is dropped so it can never mask the error being reported.
    #[inline]
    pub async fn append_log(
        &self,
        level: LogLevel,
        message: &str,
        details: Option<serde_json::Value>,
    ) {
        let details = details.map(|value| value.to_string());
        let now = Utc::now().naive_utc();

        if let Err(err) = LogQueries::append(&self.pool, level, message, details, now).await {
            debug!("Failed to persist log entry {message:?}: {err}");
        }
    }

    /// All chunks stored for one source file, in chunk_index order.
    #[inline]
    pub async fn chunks_for_file(&self, source_file: &str) -> Result<Vec<ChunkRecord>> {
        ChunkQueries::list_by_source_file(&self.pool, source_file).await
    }

    /// Newest-first slice of the audit trail.
    #[inline]
    pub async fn recent_logs(&self, limit: i64) -> Result<Vec<LogEntry>> {
        LogQueries::recent(&self.pool, limit).await
    }

    #[inline]
    pub async fn stats(&self) -> Result<StoreStats> {
        let total_chunks = ChunkQueries::count(&self.pool).await?;
        let source_files = ChunkQueries::count_distinct_files(&self.pool).await?;

        Ok(StoreStats {
            total_chunks,
            source_files,
        })
    }

    /// Write the shutdown log entry and release the connection pool.
    /// Consuming `self` makes operations after close unrepresentable.
    #[inline]
    pub async fn close(self) {
        self.append_log(LogLevel::Info, "vector store shut down", None)
            .await;
        self.pool.close().await;
        info!("Vector store closed");
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(|db_err| db_err.is_unique_violation())
}

/// Cosine similarity between two equal-length vectors. Zero-magnitude
/// vectors score 0.0 rather than dividing by zero.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0.0_f32;
    let mut norm_a = 0.0_f32;
    let mut norm_b = 0.0_f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b).sqrt()
}
