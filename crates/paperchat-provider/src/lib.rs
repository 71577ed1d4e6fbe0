pub mod gemini;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use gemini::GeminiProvider;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub model: String,
    /// System instruction, separate from the conversation contents.
    pub system: Option<String>,
    pub prompt: String,
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_max_tokens() -> u32 {
    2048
}

impl CompletionRequest {
    pub fn new(model: impl Into<String>, prompt: impl Into<String>, temperature: f32) -> Self {
        Self {
            model: model.into(),
            system: None,
            prompt: prompt.into(),
            temperature,
            max_tokens: default_max_tokens(),
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionResponse {
    pub text: String,
    pub input_tokens: Option<u32>,
    pub output_tokens: Option<u32>,
    pub stop_reason: Option<String>,
}

/// Chat-completion seam. Tests substitute deterministic fakes; production
/// wires the Gemini client.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse>;
}

/// Echo provider for tests.
pub struct StubProvider;

#[async_trait]
impl LlmProvider for StubProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        Ok(CompletionResponse {
            text: format!("[stub:{}] {}", request.model, request.prompt),
            input_tokens: None,
            output_tokens: None,
            stop_reason: Some("end_turn".into()),
        })
    }
}
