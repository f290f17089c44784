
use anyhow::{Context, Result};
use console::style;
use dialoguer::{Confirm, Input, Select};
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

use super::{Config, IngestConfig, OllamaConfig};

#[inline]
pub fn run_interactive_config() -> Result<()> {
    eprintln!("{}", style("🔧 Embedix Configuration Setup").bold().cyan());
    eprintln!();

    let mut config = load_existing_config()?;

    eprintln!("{}", style("Ollama Configuration").bold().yellow());
    eprintln!("Embeddings are generated by a local Ollama instance.");
    eprintln!();
    configure_ollama(&mut config.ollama)?;

    eprintln!();
    eprintln!("{}", style("Ingestion Configuration").bold().yellow());
    eprintln!("Pre-chunked input files are read from the data directory.");
    eprintln!();
    configure_ingest(&mut config.ingest)?;

    eprintln!();
    eprintln!("{}", style("Testing configuration...").yellow());
    if test_ollama_connection(&config.ollama)? {
        eprintln!("{}", style("✓ Ollama connection successful!").green());
    } else {
        eprintln!(
            "{}",
            style("⚠ Warning: Could not connect to Ollama").yellow()
        );
        eprintln!("You can continue, but make sure Ollama is running before ingesting.");
    }

    eprintln!();
    let save = Confirm::new()
        .with_prompt("Save configuration?")
        .default(true)
        .interact()?;
    if !save {
        eprintln!("Configuration not saved.");
        return Ok(());
    }

    config.save().context("Failed to save configuration")?;
    eprintln!(
        "{} {}",
        style("✓ Configuration saved to").green(),
        style(config.config_file_path().display()).cyan()
    );

    Ok(())
}

#[inline]
pub fn show_config() -> Result<()> {
    let config = Config::load_default().context("Failed to load configuration")?;

    eprintln!("{}", style("📋 Current Configuration").bold().cyan());
    eprintln!();

    eprintln!("{}", style("Store Settings:").bold().yellow());
    eprintln!("  Path: {}", style(config.store_path().display()).cyan());

    eprintln!();
    eprintln!("{}", style("Ollama Settings:").bold().yellow());
    match config.ollama_url() {
        Ok(url) => eprintln!("  Endpoint: {}", style(url).cyan()),
        Err(e) => eprintln!("  Endpoint: {} ({e})", style("invalid").red()),
    }
    eprintln!("  Model: {}", style(&config.ollama.model).cyan());
    eprintln!(
        "  Embedding dimension: {}",
        style(config.ollama.embedding_dimension).cyan()
    );

    eprintln!();
    eprintln!("{}", style("Ingestion Settings:").bold().yellow());
    eprintln!(
        "  Data directory: {}",
        style(config.ingest.data_dir.display()).cyan()
    );
    eprintln!(
        "  Extensions: {}",
        style(config.ingest.extensions.join(", ")).cyan()
    );

    eprintln!();
    eprintln!(
        "Config file: {}",
        style(config.config_file_path().display()).dim()
    );

    Ok(())
}

fn load_existing_config() -> Result<Config> {
    if let Ok(config) = Config::load_default() {
        eprintln!("{}", style("Found existing configuration.").green());
        return Ok(config);
    }

    eprintln!(
        "{}",
        style("No existing configuration found. Starting from defaults.").yellow()
    );
    Ok(Config {
        base_dir: Config::config_dir()?,
        ..Config::default()
    })
}

/// Each answer is applied through the config setters as soon as it is read,
/// so later prompts validate against the values picked earlier.
fn configure_ollama(ollama: &mut OllamaConfig) -> Result<()> {
    let protocols = &["http", "https"];
    let preselected = protocols
        .iter()
        .position(|&p| p == ollama.protocol)
        .unwrap_or(0);

    let picked = Select::new()
        .with_prompt("Ollama protocol")
        .items(protocols)
        .default(preselected)
        .interact()?;
    ollama.set_protocol(protocols[picked].to_string())?;

    let scheme = ollama.protocol.clone();
    let port_for_url = ollama.port;
    let host: String = Input::new()
        .with_prompt("Ollama host")
        .default(ollama.host.clone())
        .validate_with(move |input: &String| -> Result<(), String> {
            let endpoint = format!("{scheme}://{input}:{port_for_url}");
            Url::parse(&endpoint)
                .map(drop)
                .map_err(|_| format!("{endpoint} is not a valid URL"))
        })
        .interact_text()?;
    ollama.set_host(host)?;

    let port: u16 = Input::new()
        .with_prompt("Ollama port")
        .default(ollama.port)
        .validate_with(|input: &u16| -> Result<(), &str> {
            if *input == 0 {
                Err("Port must be greater than 0")
            } else {
                Ok(())
            }
        })
        .interact_text()?;
    ollama.set_port(port)?;

    let model: String = Input::new()
        .with_prompt("Embedding model")
        .default(ollama.model.clone())
        .validate_with(|input: &String| -> Result<(), &str> {
            if input.trim().is_empty() {
                Err("Model name cannot be empty")
            } else {
                Ok(())
            }
        })
        .interact_text()?;
    ollama.set_model(model)?;

    let dimension: u32 = Input::new()
        .with_prompt("Embedding dimension reported by the model")
        .default(ollama.embedding_dimension)
        .validate_with(|input: &u32| -> Result<(), &str> {
            if (64..=4096).contains(input) {
                Ok(())
            } else {
                Err("Dimension must be between 64 and 4096")
            }
        })
        .interact_text()?;
    ollama.set_embedding_dimension(dimension)?;

    Ok(())
}

fn configure_ingest(ingest: &mut IngestConfig) -> Result<()> {
    let data_dir: String = Input::new()
        .with_prompt("Data directory with pre-chunked files")
        .default(ingest.data_dir.display().to_string())
        .interact_text()?;
    ingest.data_dir = PathBuf::from(data_dir);

    let extensions: String = Input::new()
        .with_prompt("File extensions to ingest (comma-separated)")
        .default(ingest.extensions.join(", "))
        .validate_with(|input: &String| -> Result<(), &str> {
            if parse_extensions(input).is_empty() {
                Err("At least one extension is required")
            } else {
                Ok(())
            }
        })
        .interact_text()?;
    ingest.extensions = parse_extensions(&extensions);
    ingest.validate()?;

    Ok(())
}

fn parse_extensions(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(|ext| ext.trim().trim_start_matches('.').to_string())
        .filter(|ext| !ext.is_empty())
        .collect()
}

fn test_ollama_connection(ollama: &OllamaConfig) -> Result<bool> {
    let url = ollama.ollama_url()?.join("api/version")?;

    let agent: ureq::Agent = ureq::Agent::config_builder()
        .timeout_global(Some(Duration::from_secs(5)))
        .build()
        .into();

    // A 4xx reply still proves an HTTP server answered on that port.
    Ok(match agent.get(url.as_str()).call() {
        Ok(_) => true,
        Err(ureq::Error::StatusCode(code)) => (400..500).contains(&code),
        Err(_) => false,
    })
}
