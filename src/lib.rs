use thiserror::Error;

pub type Result<T> = std::result::Result<T, HandbookError>;

#[derive(Error, Debug)]
pub enum HandbookError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Retrieval error: {0}")]
    Retrieval(String),

    #[error("Document error: {0}")]
    Document(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

pub mod assistant;
pub mod commands;
pub mod config;
pub mod document;
pub mod embeddings;
pub mod formatter;
pub mod index;
pub mod indexer;
pub mod interaction_log;
pub mod retrieval;
pub mod storage;
