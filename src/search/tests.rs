use super::*;
use crate::embeddings::testing::{FailingEmbedder, HashEmbedder};
use anyhow::Result;
use tempfile::TempDir;

const DIM: usize = 16;

async fn seeded_store(embedder: &HashEmbedder, chunks: &[&str]) -> Result<(TempDir, VectorStore)> {
    let temp_dir = TempDir::new()?;
    let store = VectorStore::open(temp_dir.path().join("test.db"), DIM).await?;
    for (index, chunk) in chunks.iter().enumerate() {
        let outcome = store
            .insert_chunk(chunk, &embedder.embed_one(chunk), "seed.txt", index as i64)
            .await;
        assert_eq!(outcome, crate::store::InsertOutcome::Inserted);
    }
    Ok((temp_dir, store))
}

#[tokio::test]
async fn exact_text_is_the_top_hit() -> Result<()> {
    let embedder = HashEmbedder { dimension: DIM };
    let (_temp_dir, store) = seeded_store(
        &embedder,
        &["how to open a store", "ranking ties by id", "closing flushes a log"],
    )
    .await?;
    let service = SearchService::new(&embedder, &store);

    let hits = service.search("ranking ties by id", 3).await?;

    assert_eq!(hits.len(), 3);
    assert_eq!(hits[0].chunk_text, "ranking ties by id");
    assert!((hits[0].score - 1.0).abs() < 1e-5);
    assert!(hits[0].score >= hits[1].score);
    assert!(hits[1].score >= hits[2].score);

    Ok(())
}

#[tokio::test]
async fn limit_caps_the_hit_count() -> Result<()> {
    let embedder = HashEmbedder { dimension: DIM };
    let (_temp_dir, store) = seeded_store(&embedder, &["one", "two", "three", "four"]).await?;
    let service = SearchService::new(&embedder, &store);

    let hits = service.search("three", 2).await?;
    assert_eq!(hits.len(), 2);

    Ok(())
}

#[tokio::test]
async fn empty_store_returns_no_hits() -> Result<()> {
    let embedder = HashEmbedder { dimension: DIM };
    let (_temp_dir, store) = seeded_store(&embedder, &[]).await?;
    let service = SearchService::new(&embedder, &store);

    let hits = service.search("anything", 5).await?;
    assert!(hits.is_empty());

    Ok(())
}

#[tokio::test]
async fn embedder_failure_propagates() -> Result<()> {
    let hash = HashEmbedder { dimension: DIM };
    let (_temp_dir, store) = seeded_store(&hash, &["stored text"]).await?;
    let embedder = FailingEmbedder {
        inner: HashEmbedder { dimension: DIM },
        poison: "POISON".to_string(),
    };
    let service = SearchService::new(&embedder, &store);

    let error = service
        .search("POISON query", 5)
        .await
        .expect_err("a poisoned query should fail");

    let message = format!("{error:#}");
    assert!(message.contains("Failed to embed search query"));

    Ok(())
}
