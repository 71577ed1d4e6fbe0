use paperchat_schema::ChatError;

use crate::embedding::EmbeddingProvider;
use crate::vector_index::VectorIndex;

const CHUNK_SEPARATOR: &str = "\n\n";

/// Embed the question, pull the top-k nearest chunks and join them
/// nearest-first into one context string of at most `max_context_chars`
/// characters. On overflow the lowest-ranked chunk is cut to the remaining
/// budget and anything after it dropped.
pub async fn retrieve(
    index: &VectorIndex,
    embedder: &dyn EmbeddingProvider,
    question: &str,
    top_k: usize,
    max_context_chars: usize,
) -> Result<String, ChatError> {
    let embedded = embedder
        .embed(&[question.to_owned()])
        .await
        .map_err(|err| ChatError::service("embed", &err))?;
    let query_vector = embedded
        .embeddings
        .first()
        .ok_or_else(|| ChatError::internal("embedder returned no vector for the query"))?;

    let hits = index.query(query_vector, top_k)?;
    tracing::debug!(hits = hits.len(), top_k, "retrieved context chunks");

    Ok(assemble_context(
        hits.iter().map(|(_, chunk)| chunk.text.as_str()),
        max_context_chars,
    ))
}

fn assemble_context<'a>(texts: impl Iterator<Item = &'a str>, max_chars: usize) -> String {
    let mut context = String::new();
    let mut used = 0usize;

    for text in texts {
        let sep_cost = if context.is_empty() {
            0
        } else {
            CHUNK_SEPARATOR.len()
        };
        if used + sep_cost >= max_chars {
            break;
        }
        let budget = max_chars - used - sep_cost;

        if sep_cost > 0 {
            context.push_str(CHUNK_SEPARATOR);
        }
        let char_count = text.chars().count();
        if char_count <= budget {
            context.push_str(text);
            used += sep_cost + char_count;
        } else {
            context.extend(text.chars().take(budget));
            break;
        }
    }

    context
}
