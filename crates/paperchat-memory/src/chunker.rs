use sha2::{Digest, Sha256};

use paperchat_schema::{ChatError, Document, DocumentChunk, MIN_ADAPTIVE_CHUNK_SIZE};

/// Fixed-window chunking parameters, both measured in characters.
#[derive(Debug, Clone, Copy)]
pub struct ChunkerConfig {
    pub chunk_size: usize,
    pub overlap: usize,
}

impl ChunkerConfig {
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self, ChatError> {
        if chunk_size == 0 {
            return Err(ChatError::config("chunk_size must be positive"));
        }
        if overlap >= chunk_size {
            return Err(ChatError::config(format!(
                "chunk overlap ({overlap}) must be smaller than chunk size ({chunk_size})"
            )));
        }
        Ok(Self {
            chunk_size,
            overlap,
        })
    }

    fn step(&self) -> usize {
        self.chunk_size - self.overlap
    }
}

/// Pick a chunk size from the document length when none is configured.
/// Thresholds follow the 4-chars-per-token proxy.
pub fn decide_chunk_size(char_count: usize) -> usize {
    if char_count <= 2_000 {
        MIN_ADAPTIVE_CHUNK_SIZE
    } else if char_count <= 10_000 {
        2_000
    } else if char_count <= 28_000 {
        3_200
    } else {
        4_000
    }
}

/// Slide a fixed window of `chunk_size` characters across the text, stepping
/// by `chunk_size - overlap`. Chunk i starts at character `i * step`, so
/// rejoining chunks with the overlap removed reproduces the input exactly.
/// Text of at most `chunk_size` characters yields a single chunk.
pub fn split_text(text: &str, config: &ChunkerConfig) -> Vec<String> {
    // Byte offset of every char boundary plus the end of the text, so windows
    // measured in chars slice on valid boundaries.
    let mut boundaries: Vec<usize> = text.char_indices().map(|(idx, _)| idx).collect();
    boundaries.push(text.len());
    let char_count = boundaries.len() - 1;

    if char_count <= config.chunk_size {
        return vec![text.to_string()];
    }

    let step = config.step();
    let mut chunks = Vec::new();
    let mut start = 0;
    loop {
        let end = (start + config.chunk_size).min(char_count);
        chunks.push(text[boundaries[start]..boundaries[end]].to_string());
        if end == char_count {
            break;
        }
        start += step;
    }
    chunks
}

/// Split one document into hashed, ordered chunks ready for embedding.
pub fn chunk_document(doc: &Document, config: &ChunkerConfig) -> Vec<DocumentChunk> {
    split_text(&doc.text, config)
        .into_iter()
        .enumerate()
        .map(|(seq, text)| DocumentChunk {
            hash: compute_hash(&text),
            text,
            source: doc.source.clone(),
            seq,
        })
        .collect()
}

fn compute_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}
