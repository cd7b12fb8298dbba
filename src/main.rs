use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use handbook_rag::commands::{AskOptions, ask, ingest_document, show_status};
use handbook_rag::config::{Config, resolve_data_dir, run_interactive_config, show_config};

#[derive(Parser)]
#[command(name = "handbook-rag")]
#[command(about = "Answer questions from a handbook with page-cited, retrieval-only answers")]
#[command(version)]
struct Cli {
    /// Directory holding configuration, the index and logs (default: ~/.handbook-rag)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure Ollama connection, chunking and retrieval settings
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
    /// Build the index from a handbook text export (pages separated by form feeds)
    Ingest {
        /// Path to the handbook text file
        file: PathBuf,
        /// Do not display a progress bar
        #[arg(long)]
        no_progress: bool,
    },
    /// Ask a question; starts an interactive session when no question is given
    Ask {
        /// The question to answer
        question: Vec<String>,
        /// Number of chunks to retrieve
        #[arg(long)]
        top_k: Option<usize>,
        /// Minimum top similarity needed to answer
        #[arg(long, allow_negative_numbers = true)]
        threshold: Option<f32>,
        /// Do not print the retrieved sources
        #[arg(long)]
        hide_sources: bool,
    },
    /// Show index and Ollama status
    Status,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let data_dir = resolve_data_dir(cli.data_dir)?;

    match cli.command {
        Commands::Config { show } => {
            if show {
                show_config(&data_dir)?;
            } else {
                run_interactive_config(&data_dir)?;
            }
        }
        Commands::Ingest { file, no_progress } => {
            let config = Config::load(&data_dir)?;
            let show_progress = !no_progress && console::user_attended_stderr();
            ingest_document(&config, &file, show_progress)?;
        }
        Commands::Ask {
            question,
            top_k,
            threshold,
            hide_sources,
        } => {
            let config = Config::load(&data_dir)?;
            let question = (!question.is_empty()).then(|| question.join(" "));
            let options = AskOptions {
                top_k,
                threshold,
                show_sources: !hide_sources,
            };
            ask(&config, question, &options)?;
        }
        Commands::Status => {
            let config = Config::load(&data_dir)?;
            show_status(&config)?;
        }
    }

    Ok(())
}
