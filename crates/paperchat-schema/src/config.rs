use serde::{Deserialize, Serialize};

use crate::ChatError;

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com";

/// Smallest chunk size adaptive sizing ever picks. The overlap must stay
/// below this when no fixed `chunk_size` is configured.
pub const MIN_ADAPTIVE_CHUNK_SIZE: usize = 400;

fn default_llm_model() -> String {
    "gemini-2.0-flash".to_string()
}

fn default_embedding_model() -> String {
    "gemini-embedding-001".to_string()
}

fn default_embedding_dimensions() -> usize {
    768
}

fn default_temperature() -> f32 {
    0.1
}

fn default_top_k() -> usize {
    5
}

fn default_chunk_overlap() -> usize {
    50
}

fn default_max_context_chars() -> usize {
    6000
}

fn default_max_history_turns() -> usize {
    20
}

fn default_base_url() -> String {
    GEMINI_API_BASE.to_string()
}

/// Everything the pipeline needs, built once at startup and passed into each
/// adapter at construction. No ambient globals, so tests can run the whole
/// pipeline against fakes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatbotConfig {
    pub api_key: String,
    #[serde(default = "default_llm_model")]
    pub llm_model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,
    #[serde(default = "default_embedding_dimensions")]
    pub embedding_dimensions: usize,
    /// Similarity search depth.
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    /// Fixed chunk length in characters. None picks a size per document.
    #[serde(default)]
    pub chunk_size: Option<usize>,
    /// Characters shared between neighboring chunks.
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
    /// Upper bound on the concatenated retrieval context.
    #[serde(default = "default_max_context_chars")]
    pub max_context_chars: usize,
    /// Conversation retention bound, oldest turns evicted first.
    #[serde(default = "default_max_history_turns")]
    pub max_history_turns: usize,
    /// Overridable for tests against a mock server.
    #[serde(default = "default_base_url")]
    pub llm_base_url: String,
    #[serde(default = "default_base_url")]
    pub embedding_base_url: String,
}

impl ChatbotConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            llm_model: default_llm_model(),
            temperature: default_temperature(),
            embedding_model: default_embedding_model(),
            embedding_dimensions: default_embedding_dimensions(),
            top_k: default_top_k(),
            chunk_size: None,
            chunk_overlap: default_chunk_overlap(),
            max_context_chars: default_max_context_chars(),
            max_history_turns: default_max_history_turns(),
            llm_base_url: default_base_url(),
            embedding_base_url: default_base_url(),
        }
    }

    /// Build from the environment. `GEMINI_API_KEY` is the one required
    /// variable; the rest override defaults.
    pub fn from_env() -> Result<Self, ChatError> {
        let api_key = std::env::var("GEMINI_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| ChatError::config("GEMINI_API_KEY is not set"))?;

        let mut config = Self::new(api_key);
        if let Ok(model) = std::env::var("LLM_MODEL") {
            config.llm_model = model;
        }
        if let Ok(model) = std::env::var("EMBEDDING_MODEL") {
            config.embedding_model = model;
        }
        if let Ok(raw) = std::env::var("LLM_TEMPERATURE") {
            config.temperature = raw
                .parse()
                .map_err(|_| ChatError::config(format!("invalid LLM_TEMPERATURE: {raw}")))?;
        }
        if let Ok(raw) = std::env::var("TOP_K") {
            config.top_k = raw
                .parse()
                .map_err(|_| ChatError::config(format!("invalid TOP_K: {raw}")))?;
        }
        if let Ok(raw) = std::env::var("CHUNK_SIZE") {
            config.chunk_size = Some(
                raw.parse()
                    .map_err(|_| ChatError::config(format!("invalid CHUNK_SIZE: {raw}")))?,
            );
        }
        if let Ok(raw) = std::env::var("CHUNK_OVERLAP") {
            config.chunk_overlap = raw
                .parse()
                .map_err(|_| ChatError::config(format!("invalid CHUNK_OVERLAP: {raw}")))?;
        }
        config.validate()?;
        Ok(config)
    }

    /// Fail fast on parameters that would corrupt the pipeline, before any
    /// stage runs.
    pub fn validate(&self) -> Result<(), ChatError> {
        if self.api_key.trim().is_empty() {
            return Err(ChatError::config("api_key must not be empty"));
        }
        if let Some(size) = self.chunk_size {
            if size == 0 {
                return Err(ChatError::config("chunk_size must be positive"));
            }
            if self.chunk_overlap >= size {
                return Err(ChatError::config(format!(
                    "chunk_overlap ({}) must be smaller than chunk_size ({size})",
                    self.chunk_overlap
                )));
            }
        } else if self.chunk_overlap >= MIN_ADAPTIVE_CHUNK_SIZE {
            return Err(ChatError::config(format!(
                "chunk_overlap ({}) must be smaller than the smallest adaptive \
                 chunk size ({MIN_ADAPTIVE_CHUNK_SIZE}); set CHUNK_SIZE to use a larger window",
                self.chunk_overlap
            )));
        }
        if self.top_k == 0 {
            return Err(ChatError::config("top_k must be positive"));
        }
        if self.embedding_dimensions == 0 {
            return Err(ChatError::config("embedding_dimensions must be positive"));
        }
        Ok(())
    }
}
