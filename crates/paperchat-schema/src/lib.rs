use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

mod config;
mod error;

pub use config::{ChatbotConfig, MIN_ADAPTIVE_CHUNK_SIZE};
pub use error::ChatError;

/// Raw text extracted from one uploaded PDF. Lives for the session only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Source identifier, normally the file path the user gave us.
    pub source: String,
    pub text: String,
    pub page_count: usize,
}

impl Document {
    pub fn new(source: impl Into<String>, text: impl Into<String>, page_count: usize) -> Self {
        Self {
            source: source.into(),
            text: text.into(),
            page_count,
        }
    }
}

/// A bounded-length slice of a document, the unit of embedding and retrieval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentChunk {
    pub text: String,
    /// Source document this chunk came from.
    pub source: String,
    /// Ordinal of the chunk within its document, 0-based.
    pub seq: usize,
    /// SHA-256 of the chunk text (hex string).
    pub hash: String,
}

/// One answered question. Append order doubles as chronology.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub question: String,
    pub answer: String,
    pub at: DateTime<Utc>,
}

impl ConversationTurn {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
            at: Utc::now(),
        }
    }
}

/// Outcome of one upload batch. Input failures are collected per file so a
/// bad PDF never sinks the rest of the batch.
#[derive(Debug, Default)]
pub struct UploadReport {
    pub documents_indexed: usize,
    pub chunks_indexed: usize,
    pub failures: Vec<ChatError>,
}

impl UploadReport {
    pub fn is_empty(&self) -> bool {
        self.documents_indexed == 0 && self.failures.is_empty()
    }
}
