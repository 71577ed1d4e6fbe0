use paperchat_schema::{ChatError, DocumentChunk};

/// In-memory flat index over cosine similarity. Built once per upload batch,
/// queried many times, dropped with the session.
#[derive(Debug, Default)]
pub struct VectorIndex {
    dimensions: usize,
    entries: Vec<IndexEntry>,
}

#[derive(Debug)]
struct IndexEntry {
    vector: Vec<f32>,
    chunk: DocumentChunk,
}

impl VectorIndex {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            entries: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Append (vector, chunk) pairs. A count or dimension mismatch is an
    /// invariant violation, not a user error.
    pub fn add(
        &mut self,
        vectors: Vec<Vec<f32>>,
        chunks: Vec<DocumentChunk>,
    ) -> Result<(), ChatError> {
        if vectors.len() != chunks.len() {
            return Err(ChatError::internal(format!(
                "vector/chunk count mismatch: {} vectors, {} chunks",
                vectors.len(),
                chunks.len()
            )));
        }
        for vector in &vectors {
            if vector.len() != self.dimensions {
                return Err(ChatError::internal(format!(
                    "vector dimension mismatch: index is {}, got {}",
                    self.dimensions,
                    vector.len()
                )));
            }
        }
        self.entries.extend(
            vectors
                .into_iter()
                .zip(chunks)
                .map(|(vector, chunk)| IndexEntry { vector, chunk }),
        );
        Ok(())
    }

    /// Up to k chunks nearest the query vector, best first. Equal scores keep
    /// insertion order (stable sort). An empty index yields an empty vec.
    pub fn query(&self, vector: &[f32], k: usize) -> Result<Vec<(f32, &DocumentChunk)>, ChatError> {
        if self.entries.is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        if vector.len() != self.dimensions {
            return Err(ChatError::internal(format!(
                "query dimension mismatch: index is {}, got {}",
                self.dimensions,
                vector.len()
            )));
        }

        let mut scored: Vec<(f32, &DocumentChunk)> = self
            .entries
            .iter()
            .map(|entry| (cosine_similarity(vector, &entry.vector), &entry.chunk))
            .collect();
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));
        scored.truncate(k);
        Ok(scored)
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}
