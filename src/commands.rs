use std::path::Path;

use anyhow::{Context, Result};
use console::style;
use dialoguer::Input;
use itertools::Itertools;
use tracing::{error, info};

use crate::assistant::HandbookAssistant;
use crate::config::{Config, ConfigError};
use crate::document::PlainTextExtractor;
use crate::embeddings::{EmbeddingProvider, OllamaClient};
use crate::formatter::{LOAD_ERROR_MESSAGE, format_sources_display};
use crate::indexer::{Indexer, IngestionStats};
use crate::retrieval::{RetrievalConfig, RetrievalOutcome};
use crate::storage::IndexStore;

/// Questions offered by `help` in interactive mode
pub const SAMPLE_QUESTIONS: &[&str] = &[
    "What headings, fonts, and sizes are required in the FYP report?",
    "What margins and spacing do we use?",
    "What are the required chapters of a Development FYP report?",
    "What are the required chapters of an R&D FYP report?",
    "How should endnotes like 'Ibid.' and 'op. cit.' be used?",
    "What goes into the Executive Summary and Abstract?",
];

const EXIT_WORDS: &[&str] = &["quit", "exit", "q"];

/// Per-invocation overrides for `ask`
#[derive(Debug, Clone, Default)]
pub struct AskOptions {
    pub top_k: Option<usize>,
    pub threshold: Option<f32>,
    pub show_sources: bool,
}

impl AskOptions {
    /// Apply the overrides to `base`, holding them to the same rules as the config file
    #[inline]
    pub fn resolve(&self, base: &RetrievalConfig) -> std::result::Result<RetrievalConfig, ConfigError> {
        let resolved = RetrievalConfig {
            top_k: self.top_k.unwrap_or(base.top_k),
            similarity_threshold: self.threshold.unwrap_or(base.similarity_threshold),
        };
        resolved.validate()?;
        Ok(resolved)
    }
}

/// Build the index for `document` and persist it under the data directory
#[inline]
pub fn ingest_document(config: &Config, document: &Path, show_progress: bool) -> Result<IngestionStats> {
    info!("Ingesting handbook: {}", document.display());

    let client = OllamaClient::new(&config.ollama).context("Failed to initialize Ollama client")?;
    client
        .health_check()
        .context("Ollama is not ready; check `handbook-rag status`")?;

    let store = IndexStore::new(config.index_dir());
    let stats = Indexer::new(&client, config.chunking.clone())
        .with_batch_size(config.ollama.batch_size as usize)
        .with_progress(show_progress)
        .ingest(document, &PlainTextExtractor, &store)?;

    println!("{}", style("✓ Ingestion complete").green());
    print!("{}", render_ingestion_stats(&stats, &store));

    Ok(stats)
}

/// Summary printed after ingestion
#[inline]
pub fn render_ingestion_stats(stats: &IngestionStats, store: &IndexStore) -> String {
    format!(
        "  Pages extracted: {}\n  Pages with text: {}\n  Chunks created: {}\n  Average words per chunk: {:.1}\n  Pages covered: {}\n  Embedding dimension: {}\n  Duration: {:.1?}\n  Index: {}\n",
        stats.pages,
        stats.pages_with_text,
        stats.chunks,
        stats.average_words_per_chunk,
        stats.pages_covered,
        stats.dimension,
        stats.duration,
        store.dir().display()
    )
}

/// Answer one question, or start the interactive loop when none is given
#[inline]
pub fn ask(config: &Config, question: Option<String>, options: &AskOptions) -> Result<()> {
    let retrieval = options
        .resolve(&config.retrieval)
        .context("Invalid retrieval options")?;

    let assistant = match HandbookAssistant::load(config) {
        Ok(assistant) => assistant,
        Err(e) => {
            eprintln!("{}", style(LOAD_ERROR_MESSAGE).red());
            eprintln!("   {}", e);
            eprintln!("   Run `handbook-rag ingest <FILE>` first.");
            return Err(e.into());
        }
    };

    match question {
        Some(question) => answer_and_display(&assistant, &question, &retrieval, options.show_sources),
        None => run_interactive(&assistant, &retrieval, options.show_sources),
    }
}

fn answer_and_display(
    assistant: &HandbookAssistant,
    question: &str,
    retrieval: &RetrievalConfig,
    show_sources: bool,
) -> Result<()> {
    let outcome = assistant
        .ask_with(question, retrieval.top_k, retrieval.similarity_threshold)
        .context("Failed to answer question")?;
    print!("{}", render_result(question, &outcome, show_sources));
    Ok(())
}

fn run_interactive(
    assistant: &HandbookAssistant,
    retrieval: &RetrievalConfig,
    show_sources: bool,
) -> Result<()> {
    let rule = "=".repeat(80);
    println!("{}", rule);
    println!("{}", style(" HANDBOOK ASSISTANT - INTERACTIVE MODE").bold().cyan());
    println!("{}", rule);
    println!(" Ask questions about the handbook");
    println!(" Type 'quit', 'exit', or 'q' to exit");
    println!(" Type 'help' for sample questions");
    println!("{}", rule);
    println!();

    loop {
        let Ok(line) = Input::<String>::new()
            .with_prompt("❓ Your question")
            .allow_empty(true)
            .interact_text()
        else {
            println!();
            println!("👋 Goodbye!");
            break;
        };

        let question = line.trim();
        if question.is_empty() {
            continue;
        }

        if EXIT_WORDS.contains(&question.to_lowercase().as_str()) {
            println!();
            println!("👋 Goodbye!");
            break;
        }

        if question.eq_ignore_ascii_case("help") {
            print!("{}", render_sample_questions());
            continue;
        }

        println!();
        if let Err(e) = answer_and_display(assistant, question, retrieval, show_sources) {
            error!("Query failed: {:#}", e);
            println!("{} {:#}", style("❌ Error:").red(), e);
            println!();
        }
    }

    Ok(())
}

#[inline]
pub fn render_sample_questions() -> String {
    let questions = SAMPLE_QUESTIONS
        .iter()
        .enumerate()
        .map(|(i, question)| format!("{}. {}", i + 1, question))
        .join("\n");
    format!("\n📝 Sample questions:\n{}\n\n", questions)
}

/// Question, answer, cited pages and (optionally) the retrieved sources
#[inline]
pub fn render_result(question: &str, outcome: &RetrievalOutcome, show_sources: bool) -> String {
    let rule = "=".repeat(80);
    let mut lines = vec![
        rule.clone(),
        "QUESTION:".to_string(),
        rule.clone(),
        question.to_string(),
        String::new(),
        rule.clone(),
        "ANSWER:".to_string(),
        rule.clone(),
        outcome.answer.clone(),
        String::new(),
    ];

    if !outcome.pages.is_empty() {
        lines.push(format!(
            "📄 Referenced Pages: {}",
            outcome.pages.iter().join(", ")
        ));
        lines.push(format!(
            "🎯 Confidence: {} (max score: {:.3})",
            outcome.confidence.to_string().to_uppercase(),
            outcome.max_score
        ));
    }

    if show_sources && !outcome.sources.is_empty() {
        lines.push(String::new());
        lines.push(rule.clone());
        lines.push("RETRIEVED SOURCES:".to_string());
        lines.push(rule.clone());
        lines.push(format_sources_display(&outcome.sources));
    }

    lines.push(rule);
    lines.push(String::new());
    format!("{}\n", lines.join("\n"))
}

/// Show index presence and Ollama health
#[inline]
pub fn show_status(config: &Config) -> Result<()> {
    println!("📊 Handbook Assistant Status Report");
    println!("{}", "=".repeat(50));
    println!();

    println!("📚 Index Status:");
    let store = IndexStore::new(config.index_dir());
    if store.exists() {
        match store.load_unchecked() {
            Ok(knowledge) => {
                println!("   ✅ Index: {}", store.dir().display());
                println!("   🧩 Chunks: {}", knowledge.len());
                println!("   🔢 Dimension: {}", knowledge.dimension());
                println!("   📋 Built with model: {}", knowledge.model());
                let pages = knowledge.chunks().iter().map(|c| c.page).unique().count();
                println!("   📄 Pages covered: {}", pages);

                if knowledge.model() != config.ollama.model
                    || knowledge.dimension() != config.ollama.embedding_dimension as usize
                {
                    println!(
                        "   ⚠️  Index does not match the configured model ({}, {} dimensions); re-run ingest",
                        config.ollama.model, config.ollama.embedding_dimension
                    );
                }
            }
            Err(e) => {
                println!("   ❌ Index: Failed to load - {}", e);
            }
        }
    } else {
        println!("   ❌ Index: Not found in {}", store.dir().display());
        println!("   Run `handbook-rag ingest <FILE>` to build it.");
    }

    println!();
    println!("🤖 Ollama Status:");
    match OllamaClient::new(&config.ollama) {
        Ok(client) => match client.health_check() {
            Ok(()) => {
                println!(
                    "   ✅ Ollama: Connected ({}:{})",
                    config.ollama.host, config.ollama.port
                );
                println!("   📋 Model: {}", client.model_id());
                println!("   🔢 Batch Size: {}", config.ollama.batch_size);
            }
            Err(e) => {
                println!("   ⚠️  Ollama: Unavailable or unhealthy - {:#}", e);
            }
        },
        Err(e) => {
            println!("   ❌ Ollama: Failed to create client - {:#}", e);
        }
    }

    println!();
    println!("📝 Prompt log: {}", config.prompt_log_path().display());

    Ok(())
}
