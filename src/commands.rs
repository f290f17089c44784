use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::info;

use crate::config::Config;
use crate::embeddings::{Embedder, OllamaEmbedder};
use crate::ingest::DirectoryIngestor;
use crate::search::SearchService;
use crate::store::VectorStore;

async fn open_store(config: &Config) -> Result<VectorStore> {
    let store_path = config.store_path();
    VectorStore::open(&store_path, config.ollama.embedding_dimension as usize)
        .await
        .with_context(|| format!("Failed to open vector store at {}", store_path.display()))
}

fn connect_embedder(config: &Config) -> Result<OllamaEmbedder> {
    OllamaEmbedder::connect(&config.ollama).with_context(|| {
        format!(
            "Failed to connect to Ollama at {}:{}",
            config.ollama.host, config.ollama.port
        )
    })
}

/// Ingest every matching file from the data directory into the vector store
#[inline]
pub async fn ingest_directory(dir: Option<PathBuf>) -> Result<()> {
    let config = Config::load_default().context("Failed to load configuration")?;
    config.validate()?;

    let data_dir = dir.unwrap_or_else(|| config.ingest.data_dir.clone());
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("Failed to create data directory: {}", data_dir.display()))?;

    info!("Ingesting from {}", data_dir.display());

    let embedder = connect_embedder(&config)?;
    let store = open_store(&config).await?;

    let ingestor = DirectoryIngestor::new(&embedder, &store, &config.ingest);
    let report = ingestor.ingest_dir(&data_dir).await?;

    println!("Ingestion complete.");
    println!("  Files found: {}", report.files_found);
    println!("  Files processed: {}", report.files_processed);
    if report.files_failed > 0 {
        println!("  Files failed: {}", report.files_failed);
    }
    println!("  Chunks inserted: {}", report.inserted);
    println!("  Duplicates skipped: {}", report.skipped);
    if report.failed > 0 {
        println!("  Chunks failed: {}", report.failed);
    }

    let stats = store.stats().await?;
    println!();
    println!(
        "Store now holds {} chunks from {} files.",
        stats.total_chunks, stats.source_files
    );

    store.close().await;

    Ok(())
}

/// Search stored chunks by semantic similarity and print ranked matches
#[inline]
pub async fn search_chunks(query: &str, limit: usize) -> Result<()> {
    let config = Config::load_default().context("Failed to load configuration")?;
    config.validate()?;

    let embedder = connect_embedder(&config)?;
    let store = open_store(&config).await?;

    let service = SearchService::new(&embedder, &store);
    let hits = service.search(query, limit).await?;

    if hits.is_empty() {
        println!("No matches found.");
        println!("Use 'embedix ingest' to add documents first.");
    } else {
        println!("Top {} matches:", hits.len());
        println!();
        for (rank, hit) in hits.iter().enumerate() {
            println!(
                "{}. [{:.4}] {} (chunk {})",
                rank + 1,
                hit.score,
                hit.source_file,
                hit.chunk_index
            );
            println!("   {}", preview(&hit.chunk_text, 200));
            println!();
        }
    }

    store.close().await;

    Ok(())
}

/// Show store contents and embedding backend connectivity
#[inline]
pub async fn show_status() -> Result<()> {
    let config = Config::load_default().unwrap_or_default();

    println!("📊 Embedix Status");
    println!("{}", "=".repeat(50));
    println!();

    println!("🗄️  Vector Store:");
    let store_path = config.store_path();
    match VectorStore::open(&store_path, config.ollama.embedding_dimension as usize).await {
        Ok(store) => {
            println!("   ✅ Open: {}", store_path.display());
            match store.stats().await {
                Ok(stats) => {
                    println!("   📄 Chunks: {}", stats.total_chunks);
                    println!("   📚 Source files: {}", stats.source_files);
                }
                Err(e) => println!("   ⚠️  Statistics unavailable: {e}"),
            }
            println!("   🔢 Dimension: {}", store.dimension());
            store.close().await;
        }
        Err(e) => {
            println!("   ❌ Failed to open {}: {e:#}", store_path.display());
        }
    }

    println!();
    println!("🤖 Ollama:");
    match connect_embedder(&config) {
        Ok(embedder) => {
            println!(
                "   ✅ Connected ({}:{})",
                config.ollama.host, config.ollama.port
            );
            println!("   📋 Model: {}", embedder.model());
            println!("   🔢 Dimension: {}", embedder.dimension());
        }
        Err(e) => {
            println!("   ❌ Unavailable: {e:#}");
        }
    }

    println!();
    println!("💡 Next Steps:");
    println!("   • Use 'embedix ingest' to load chunk files from the data directory");
    println!("   • Use 'embedix search <query>' to find matching chunks");
    println!("   • Use 'embedix config' to update connection settings");

    Ok(())
}

/// Print the most recent processing log entries, newest first
#[inline]
pub async fn show_logs(limit: i64) -> Result<()> {
    let config = Config::load_default().context("Failed to load configuration")?;
    let store = open_store(&config).await?;

    let entries = store.recent_logs(limit).await?;
    if entries.is_empty() {
        println!("No log entries recorded yet.");
    } else {
        for entry in &entries {
            let details = entry
                .details
                .as_deref()
                .map_or_else(String::new, |details| format!(" {details}"));
            println!(
                "{} [{}] {}{}",
                entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
                entry.level,
                entry.message,
                details
            );
        }
    }

    store.close().await;

    Ok(())
}

fn preview(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars).collect();
    format!("{cut}…")
}
