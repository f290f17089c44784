use thiserror::Error;

pub type Result<T> = std::result::Result<T, EmbedixError>;

#[derive(Error, Debug)]
pub enum EmbedixError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

pub mod commands;
pub mod config;
pub mod embeddings;
pub mod ingest;
pub mod loader;
pub mod search;
pub mod store;
