
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use console::style;
use dialoguer::{Confirm, Input, Select};

use super::{Config, ConfigError, OllamaConfig};
use crate::embeddings::chunking::ChunkingConfig;
use crate::embeddings::ollama::OllamaClient;
use crate::retrieval::RetrievalConfig;

#[inline]
pub fn run_interactive_config(base_dir: &Path) -> Result<()> {
    eprintln!("{}", style("🔧 Handbook Assistant Configuration").bold().cyan());
    eprintln!();

    let mut config = load_existing_config(base_dir);

    eprintln!("{}", style("Ollama Configuration").bold().yellow());
    eprintln!("Configure the local Ollama instance used to embed handbook text and questions.");
    eprintln!();

    configure_ollama(&mut config.ollama)?;

    eprintln!();
    eprintln!("{}", style("Retrieval Configuration").bold().yellow());
    configure_chunking(&mut config.chunking)?;
    configure_retrieval(&mut config.retrieval)?;

    eprintln!();
    eprintln!("{}", style("Testing configuration...").yellow());

    if test_ollama_connection(&config.ollama) {
        eprintln!("{}", style("✓ Ollama connection successful!").green());
    } else {
        eprintln!(
            "{}",
            style("⚠ Warning: Could not connect to Ollama").yellow()
        );
        eprintln!("You can continue, but make sure Ollama is running before ingesting.");
    }

    eprintln!();
    if Confirm::new()
        .with_prompt("Save configuration?")
        .default(true)
        .interact()?
    {
        config.save().context("Failed to save configuration")?;
        eprintln!("{}", style("✓ Configuration saved successfully!").green());
        eprintln!(
            "Configuration saved to: {}",
            style(config.config_file_path().display()).cyan()
        );
        eprintln!(
            "{}",
            style("Changing the model or chunking settings requires re-running ingest.").dim()
        );
    } else {
        eprintln!("Configuration not saved.");
    }

    Ok(())
}

#[inline]
pub fn show_config(base_dir: &Path) -> Result<()> {
    let config = Config::load(base_dir).context("Failed to load configuration")?;
    eprint!("{}", render_config(&config));
    Ok(())
}

/// Human-readable summary of every setting
#[inline]
pub fn render_config(config: &Config) -> String {
    let ollama_url = match config.ollama_url() {
        Ok(url) => format!("  Ollama URL: {}", style(url).cyan()),
        Err(e) => format!("  Ollama URL: {} ({})", style("Invalid").red(), e),
    };

    let lines = [
        style("📋 Current Configuration").bold().cyan().to_string(),
        String::new(),
        style("Ollama Settings:").bold().yellow().to_string(),
        format!("  Host: {}", style(&config.ollama.host).cyan()),
        format!("  Port: {}", style(config.ollama.port).cyan()),
        format!("  Model: {}", style(&config.ollama.model).cyan()),
        format!("  Batch Size: {}", style(config.ollama.batch_size).cyan()),
        format!(
            "  Embedding Dimension: {}",
            style(config.ollama.embedding_dimension).cyan()
        ),
        ollama_url,
        String::new(),
        style("Chunking:").bold().yellow().to_string(),
        format!("  Target Words: {}", style(config.chunking.target_words).cyan()),
        format!(
            "  Overlap: {}",
            style(format!("{:.0}%", config.chunking.overlap_fraction * 100.0)).cyan()
        ),
        format!("  Min Words: {}", style(config.chunking.min_words).cyan()),
        String::new(),
        style("Retrieval:").bold().yellow().to_string(),
        format!("  Top K: {}", style(config.retrieval.top_k).cyan()),
        format!(
            "  Similarity Threshold: {}",
            style(config.retrieval.similarity_threshold).cyan()
        ),
        String::new(),
        format!(
            "Config file: {}",
            style(config.config_file_path().display()).dim()
        ),
        format!("Index: {}", style(config.index_dir().display()).dim()),
        format!(
            "Prompt log: {}",
            style(config.prompt_log_path().display()).dim()
        ),
    ];

    format!("{}\n", lines.join("\n"))
}

fn load_existing_config(base_dir: &Path) -> Config {
    Config::load(base_dir).map_or_else(
        |_| {
            eprintln!(
                "{}",
                style("No usable configuration found. Using defaults.").yellow()
            );
            Config {
                base_dir: base_dir.to_path_buf(),
                ..Config::default()
            }
        },
        |config| {
            eprintln!("{}", style("Loaded configuration.").green());
            config
        },
    )
}

fn configure_ollama(ollama: &mut OllamaConfig) -> Result<()> {
    let protocols = &["http", "https"];
    let default_index = protocols
        .iter()
        .position(|&p| p == ollama.protocol)
        .unwrap_or(0);

    let protocol_index = Select::new()
        .with_prompt("Ollama protocol")
        .default(default_index)
        .items(protocols)
        .interact()?;

    let protocol = protocols[protocol_index].to_string();

    let host: String = Input::new()
        .with_prompt("Ollama host")
        .default(ollama.host.clone())
        .validate_with(|input: &String| -> Result<(), ConfigError> {
            OllamaConfig {
                protocol: protocol.clone(),
                host: input.clone(),
                ..OllamaConfig::default()
            }
            .validate()
        })
        .interact_text()?;

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

    let embedding_dimension: u32 = Input::new()
        .with_prompt("Embedding dimension of the model")
        .default(ollama.embedding_dimension)
        .validate_with(|input: &u32| -> Result<(), &str> {
            if (1..=4096).contains(input) {
                Ok(())
            } else {
                Err("Dimension must be between 1 and 4096")
            }
        })
        .interact_text()?;

    let batch_size: u32 = Input::new()
        .with_prompt("Batch size for embedding generation")
        .default(ollama.batch_size)
        .validate_with(|input: &u32| -> Result<(), &str> {
            if *input == 0 {
                Err("Batch size must be greater than 0")
            } else if *input > 1000 {
                Err("Batch size must be 1000 or less")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    ollama.set_protocol(protocol)?;
    ollama.set_host(host)?;
    ollama.set_port(port)?;
    ollama.set_model(model)?;
    ollama.set_embedding_dimension(embedding_dimension)?;
    ollama.set_batch_size(batch_size)?;

    Ok(())
}

fn configure_chunking(chunking: &mut ChunkingConfig) -> Result<()> {
    let target_words: usize = Input::new()
        .with_prompt("Target words per chunk")
        .default(chunking.target_words)
        .validate_with(|input: &usize| -> Result<(), &str> {
            if *input == 0 {
                Err("Chunk size must be greater than 0")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    let overlap_fraction: f64 = Input::new()
        .with_prompt("Overlap between consecutive chunks (0.0 to 0.9)")
        .default(chunking.overlap_fraction)
        .validate_with(|input: &f64| -> Result<(), &str> {
            if (0.0..1.0).contains(input) {
                Ok(())
            } else {
                Err("Overlap must be at least 0 and below 1")
            }
        })
        .interact_text()?;

    let min_words: usize = Input::new()
        .with_prompt("Minimum words for a trailing chunk")
        .default(chunking.min_words.min(target_words))
        .validate_with(|input: &usize| -> Result<(), &str> {
            if *input == 0 || *input > target_words {
                Err("Minimum must be between 1 and the target chunk size")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    chunking.target_words = target_words;
    chunking.overlap_fraction = overlap_fraction;
    chunking.min_words = min_words;

    Ok(())
}

fn configure_retrieval(retrieval: &mut RetrievalConfig) -> Result<()> {
    let top_k: usize = Input::new()
        .with_prompt("Chunks retrieved per question")
        .default(retrieval.top_k)
        .validate_with(|input: &usize| -> Result<(), &str> {
            if *input == 0 {
                Err("Top-k must be greater than 0")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    let similarity_threshold: f32 = Input::new()
        .with_prompt("Similarity threshold for answering")
        .default(retrieval.similarity_threshold)
        .validate_with(|input: &f32| -> Result<(), &str> {
            if (-1.0..=1.0).contains(input) {
                Ok(())
            } else {
                Err("Threshold must be between -1 and 1")
            }
        })
        .interact_text()?;

    retrieval.top_k = top_k;
    retrieval.similarity_threshold = similarity_threshold;

    Ok(())
}

fn test_ollama_connection(ollama: &OllamaConfig) -> bool {
    OllamaClient::new(ollama)
        .map(|client| {
            client
                .with_timeout(Duration::from_secs(5))
                .with_retry_attempts(1)
                .ping()
                .is_ok()
        })
        .unwrap_or(false)
}
