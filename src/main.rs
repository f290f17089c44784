use clap::{Parser, Subcommand};
use embedix::Result;
use embedix::commands::{ingest_directory, search_chunks, show_logs, show_status};
use embedix::config::{run_interactive_config, show_config};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "embedix")]
#[command(about = "Ingests pre-chunked text files and searches them by semantic similarity")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure Ollama connection and ingestion settings
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
    /// Ingest chunk files (.txt, .jsonl) from the data directory
    Ingest {
        /// Directory to ingest instead of the configured one
        #[arg(long)]
        dir: Option<PathBuf>,
    },
    /// Search stored chunks by semantic similarity
    Search {
        /// Query text
        query: String,
        /// Maximum number of results to return
        #[arg(long, default_value_t = 5)]
        limit: usize,
    },
    /// Show store contents and backend connectivity
    Status,
    /// Show recent processing log entries
    Logs {
        /// Maximum number of entries to show
        #[arg(long, default_value_t = 20)]
        limit: i64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Config { show } => {
            if show {
                show_config()?;
            } else {
                run_interactive_config()?;
            }
        }
        Commands::Ingest { dir } => {
            ingest_directory(dir).await?;
        }
        Commands::Search { query, limit } => {
            search_chunks(&query, limit).await?;
        }
        Commands::Status => {
            show_status().await?;
        }
        Commands::Logs { limit } => {
            show_logs(limit).await?;
        }
    }

    Ok(())
}
