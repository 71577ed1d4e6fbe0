use std::path::Path;
use std::sync::Arc;

use paperchat_loader::load_batch;
use paperchat_memory::{
    chunk_document, decide_chunk_size, retrieve, ChunkerConfig, ConversationMemory,
    EmbeddingProvider, GeminiEmbeddingProvider, VectorIndex,
};
use paperchat_provider::{CompletionRequest, GeminiProvider, LlmProvider};
use paperchat_schema::{ChatError, ChatbotConfig, ConversationTurn, UploadReport};

use crate::prompt;

/// One interactive session: the vector index built from uploaded PDFs, the
/// conversation memory, and the two external-service adapters. Adapters are
/// injected so tests run the whole pipeline against fakes.
pub struct ChatSession {
    config: ChatbotConfig,
    embedder: Arc<dyn EmbeddingProvider>,
    generator: Arc<dyn LlmProvider>,
    index: VectorIndex,
    memory: ConversationMemory,
}

impl std::fmt::Debug for ChatSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatSession")
            .field("config", &self.config)
            .field("index", &self.index)
            .field("memory", &self.memory)
            .finish_non_exhaustive()
    }
}

impl ChatSession {
    pub fn new(
        config: ChatbotConfig,
        embedder: Arc<dyn EmbeddingProvider>,
        generator: Arc<dyn LlmProvider>,
    ) -> Result<Self, ChatError> {
        config.validate()?;
        if embedder.dimensions() != config.embedding_dimensions {
            return Err(ChatError::config(format!(
                "embedder produces {}-dim vectors but the index is configured for {}",
                embedder.dimensions(),
                config.embedding_dimensions
            )));
        }
        let index = VectorIndex::new(config.embedding_dimensions);
        let memory = ConversationMemory::new(config.max_history_turns);
        Ok(Self {
            config,
            embedder,
            generator,
            index,
            memory,
        })
    }

    /// Wire the real Gemini adapters from the config.
    pub fn from_config(config: ChatbotConfig) -> Result<Self, ChatError> {
        let embedder = GeminiEmbeddingProvider::new(
            config.api_key.clone(),
            config.embedding_model.clone(),
            config.embedding_dimensions,
        )
        .with_base_url(config.embedding_base_url.clone());
        let generator =
            GeminiProvider::new(config.api_key.clone()).with_base_url(config.llm_base_url.clone());
        Self::new(config, Arc::new(embedder), Arc::new(generator))
    }

    pub fn has_documents(&self) -> bool {
        !self.index.is_empty()
    }

    pub fn chunk_count(&self) -> usize {
        self.index.len()
    }

    pub fn history(&self) -> &[ConversationTurn] {
        self.memory.history()
    }

    /// Index a batch of PDFs. The index is rebuilt from scratch for the
    /// batch; per-file input problems land in the report while the rest of
    /// the batch proceeds. An embed failure aborts the upload and leaves the
    /// index empty, never holding part of an aborted batch.
    pub async fn upload(&mut self, paths: &[impl AsRef<Path>]) -> Result<UploadReport, ChatError> {
        self.index = VectorIndex::new(self.config.embedding_dimensions);

        let (documents, failures) = load_batch(paths);
        let mut report = UploadReport {
            failures,
            ..Default::default()
        };

        // Stage (vector, chunk) pairs for the whole batch; nothing reaches
        // the index until every document has embedded successfully.
        let mut staged_vectors = Vec::new();
        let mut staged_chunks = Vec::new();
        for doc in &documents {
            let chunk_size = self
                .config
                .chunk_size
                .unwrap_or_else(|| decide_chunk_size(doc.text.chars().count()));
            let chunker = ChunkerConfig::new(chunk_size, self.config.chunk_overlap)?;
            let chunks = chunk_document(doc, &chunker);
            let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();

            let embedded = self
                .embedder
                .embed(&texts)
                .await
                .map_err(|err| ChatError::service("embed", &err))?;

            report.documents_indexed += 1;
            report.chunks_indexed += chunks.len();
            tracing::info!(source = %doc.source, chunks = chunks.len(), "embedded document");
            staged_vectors.extend(embedded.embeddings);
            staged_chunks.extend(chunks);
        }
        self.index.add(staged_vectors, staged_chunks)?;

        Ok(report)
    }

    /// Answer one question against the indexed documents. Memory is appended
    /// only after the generator succeeds, so a failed query can be retried
    /// without corrupting history.
    pub async fn ask(&mut self, question: &str) -> Result<String, ChatError> {
        let final_question = if self.memory.is_empty() {
            question.to_string()
        } else {
            self.rephrase(question).await?
        };
        tracing::debug!(original = question, used = %final_question, "resolved question");

        let context = retrieve(
            &self.index,
            self.embedder.as_ref(),
            &final_question,
            self.config.top_k,
            self.config.max_context_chars,
        )
        .await?;

        let answer_prompt = prompt::build_answer_prompt(
            &context,
            &final_question,
            &self.memory.format_history(),
        );
        let response = self
            .generator
            .complete(CompletionRequest::new(
                self.config.llm_model.clone(),
                answer_prompt,
                self.config.temperature,
            ))
            .await
            .map_err(|err| ChatError::service("generate", &err))?;

        self.memory.append(question, response.text.clone());
        Ok(response.text)
    }

    /// Condense a follow-up question into a self-contained one using the
    /// conversation so far. An unexpected response shape falls back to the
    /// original question.
    async fn rephrase(&self, question: &str) -> Result<String, ChatError> {
        let rephrase_prompt =
            prompt::build_rephrase_prompt(&self.memory.format_history(), question);
        let response = self
            .generator
            .complete(CompletionRequest::new(
                self.config.llm_model.clone(),
                rephrase_prompt,
                self.config.temperature,
            ))
            .await
            .map_err(|err| ChatError::service("generate", &err))?;
        Ok(prompt::parse_rephrase_output(&response.text, question))
    }
}
