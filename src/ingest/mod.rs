
use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use tracing::{error, info, warn};

use crate::config::IngestConfig;
use crate::embeddings::Embedder;
use crate::loader;
use crate::store::{InsertOutcome, LogLevel, VectorStore};

/// Counts from ingesting one file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FileReport {
    pub chunks: usize,
    pub inserted: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Aggregate counts from one directory run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub files_found: usize,
    pub files_processed: usize,
    pub files_failed: usize,
    pub inserted: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Per-file orchestration: load, embed the whole file in one batch, insert
/// chunk by chunk. Loading and embedding failures bubble up to the caller;
/// per-chunk insert failures are counted and never abort the file.
pub struct IngestionPipeline<'a> {
    embedder: &'a dyn Embedder,
    store: &'a VectorStore,
}

impl<'a> IngestionPipeline<'a> {
    #[inline]
    pub fn new(embedder: &'a dyn Embedder, store: &'a VectorStore) -> Self {
        Self { embedder, store }
    }

    #[inline]
    pub async fn process_file(&self, path: &Path) -> Result<FileReport> {
        let file_name = file_name_of(path);

        let chunks = loader::load_chunks(path)
            .with_context(|| format!("Failed to load chunks from {}", path.display()))?;

        if chunks.is_empty() {
            warn!("No chunks found in {}", path.display());
            self.store
                .append_log(
                    LogLevel::Warning,
                    "no chunks found",
                    Some(serde_json::json!({ "file": file_name })),
                )
                .await;
            return Ok(FileReport::default());
        }

        info!("Loaded {} chunks from {}", chunks.len(), file_name);

        // One batch call per file; chunk-to-vector alignment is positional.
        let embeddings = self
            .embedder
            .encode(&chunks)
            .with_context(|| format!("Failed to embed chunks from {file_name}"))?;

        self.store
            .append_log(
                LogLevel::Debug,
                "embeddings computed",
                Some(serde_json::json!({ "file": file_name, "count": embeddings.len() })),
            )
            .await;

        let mut report = FileReport {
            chunks: chunks.len(),
            ..FileReport::default()
        };

        for (index, (chunk, embedding)) in chunks.iter().zip(embeddings.iter()).enumerate() {
            match self
                .store
                .insert_chunk(chunk, embedding, &file_name, index as i64)
                .await
            {
                InsertOutcome::Inserted => report.inserted += 1,
                InsertOutcome::SkippedDuplicate => report.skipped += 1,
                InsertOutcome::Failed(reason) => {
                    warn!("Failed to store chunk {index} of {file_name}: {reason}");
                    report.failed += 1;
                }
            }
        }

        info!(
            "Processed {}: {} inserted, {} skipped, {} failed",
            file_name, report.inserted, report.skipped, report.failed
        );
        self.store
            .append_log(
                LogLevel::Info,
                "file processed",
                Some(serde_json::json!({
                    "file": file_name,
                    "chunks": report.chunks,
                    "inserted": report.inserted,
                    "skipped": report.skipped,
                    "failed": report.failed,
                })),
            )
            .await;

        Ok(report)
    }
}

/// Walks one directory and drives the pipeline once per matching file.
/// A file's failure is logged against that file and never blocks the rest.
pub struct DirectoryIngestor<'a> {
    pipeline: IngestionPipeline<'a>,
    store: &'a VectorStore,
    config: &'a IngestConfig,
}

impl<'a> DirectoryIngestor<'a> {
    #[inline]
    pub fn new(
        embedder: &'a dyn Embedder,
        store: &'a VectorStore,
        config: &'a IngestConfig,
    ) -> Self {
        Self {
            pipeline: IngestionPipeline::new(embedder, store),
            store,
            config,
        }
    }

    #[inline]
    pub async fn ingest_dir(&self, dir: &Path) -> Result<IngestReport> {
        let entries = std::fs::read_dir(dir)
            .with_context(|| format!("Failed to read data directory: {}", dir.display()))?;

        let mut files = Vec::new();
        for entry in entries {
            let entry = entry
                .with_context(|| format!("Failed to read entry in {}", dir.display()))?;
            let path = entry.path();
            if path.is_file() && self.config.matches_extension(&path) {
                files.push(path);
            }
        }
        files.sort();

        info!("Found {} ingestable files in {}", files.len(), dir.display());
        self.store
            .append_log(
                LogLevel::Info,
                "files found",
                Some(serde_json::json!({
                    "directory": dir.display().to_string(),
                    "count": files.len(),
                })),
            )
            .await;

        let mut report = IngestReport {
            files_found: files.len(),
            ..IngestReport::default()
        };

        if files.is_empty() {
            warn!("No matching files found in {}", dir.display());
            return Ok(report);
        }

        let bar = if console::user_attended_stderr() {
            ProgressBar::new_spinner().with_style(
                ProgressStyle::with_template("{spinner} [{pos}/{len}] Ingesting {msg}")
                    .expect("style template is valid"),
            )
        } else {
            ProgressBar::hidden()
        };
        bar.set_position(0);
        bar.set_length(files.len() as u64);

        for path in &files {
            bar.set_message(file_name_of(path));

            match self.pipeline.process_file(path).await {
                Ok(file_report) => {
                    report.files_processed += 1;
                    report.inserted += file_report.inserted;
                    report.skipped += file_report.skipped;
                    report.failed += file_report.failed;
                }
                Err(e) => {
                    // One bad file never blocks its siblings.
                    error!("Failed to process {}: {e:#}", path.display());
                    report.files_failed += 1;
                    self.store
                        .append_log(
                            LogLevel::Error,
                            "file processing failed",
                            Some(serde_json::json!({
                                "file": file_name_of(path),
                                "error": format!("{e:#}"),
                            })),
                        )
                        .await;
                }
            }

            bar.inc(1);
        }

        bar.finish_and_clear();

        info!(
            "Ingestion complete: {}/{} files processed, {} inserted, {} skipped, {} failed",
            report.files_processed,
            report.files_found,
            report.inserted,
            report.skipped,
            report.failed
        );

        Ok(report)
    }
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .and_then(|name| name.to_str())
        .map_or_else(|| path.display().to_string(), ToOwned::to_owned)
}
