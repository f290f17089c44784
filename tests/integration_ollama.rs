#![expect(
    clippy::tests_outside_test_module,
    reason = "integration tests are only compiled in test mode"
)]

// Drives the Ollama-backed embedder through the public API against a mock
// HTTP server, including a full ingest-and-search pass.

use anyhow::Result;
use embedix::config::{IngestConfig, OllamaConfig};
use embedix::embeddings::{Embedder, OllamaEmbedder};
use embedix::ingest::DirectoryIngestor;
use embedix::search::SearchService;
use embedix::store::VectorStore;
use serde_json::json;
use std::path::PathBuf;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const DIMENSION: usize = 8;
const MODEL: &str = "nomic-embed-text:latest";

fn mock_ollama_config(server: &MockServer) -> OllamaConfig {
    OllamaConfig {
        protocol: "http".to_string(),
        host: server.address().ip().to_string(),
        port: server.address().port(),
        model: MODEL.to_string(),
        embedding_dimension: DIMENSION as u32,
    }
}

/// Mounts a server that knows one model and answers every embed request
/// with one fixed vector per input; single-text batches keep it honest.
async fn mount_single_vector_server(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "models": [{ "name": MODEL, "size": 274_302_450_u64, "digest": "0a109f422b47" }]
        })))
        .mount(server)
        .await;

    let vector = vec![0.25_f32; DIMENSION];
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "embeddings": [vector] })),
        )
        .mount(server)
        .await;
}

#[tokio::test]
async fn connect_and_encode_through_the_public_api() -> Result<()> {
    let server = MockServer::start().await;
    mount_single_vector_server(&server).await;

    let embedder = OllamaEmbedder::connect(&mock_ollama_config(&server))?;

    assert_eq!(embedder.model(), MODEL);
    assert_eq!(embedder.dimension(), DIMENSION);

    let vectors = embedder.encode(&["one text".to_string()])?;
    assert_eq!(vectors.len(), 1);
    assert_eq!(vectors[0].len(), DIMENSION);

    Ok(())
}

#[tokio::test]
async fn http_embedder_feeds_the_whole_pipeline() -> Result<()> {
    let server = MockServer::start().await;
    mount_single_vector_server(&server).await;

    let temp_dir = TempDir::new()?;
    let data_dir = temp_dir.path().join("data");
    std::fs::create_dir_all(&data_dir)?;
    // One chunk per file keeps every embed call a single-input batch,
    // matching the mock's single-vector response.
    std::fs::write(data_dir.join("a.txt"), "first document\n")?;
    std::fs::write(data_dir.join("b.txt"), "second document\n")?;

    let embedder = OllamaEmbedder::connect(&mock_ollama_config(&server))?;
    let store = VectorStore::open(temp_dir.path().join("store.db"), DIMENSION).await?;
    let config = IngestConfig {
        data_dir: PathBuf::from("data"),
        extensions: vec!["txt".to_string()],
    };

    let report = DirectoryIngestor::new(&embedder, &store, &config)
        .ingest_dir(&data_dir)
        .await?;

    assert_eq!(report.files_processed, 2);
    assert_eq!(report.inserted, 2);

    let hits = SearchService::new(&embedder, &store)
        .search("first document", 5)
        .await?;
    assert_eq!(hits.len(), 2);

    store.close().await;
    Ok(())
}

#[tokio::test]
async fn unreachable_server_fails_connect() {
    // Bind-then-drop leaves a port nothing listens on.
    let server = MockServer::start().await;
    let config = mock_ollama_config(&server);
    drop(server);

    let result = OllamaEmbedder::connect(&config);
    assert!(result.is_err());
}
