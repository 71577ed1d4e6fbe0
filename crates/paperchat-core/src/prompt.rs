//! Prompt templates for answering and for condensing follow-up questions.

const REPHRASED_PREFIX: &str = "REPHRASED:";
const UNCHANGED_PREFIX: &str = "UNCHANGED:";

/// Grounded-answer prompt: context, conversation so far and the question.
pub fn build_answer_prompt(context: &str, question: &str, history: &str) -> String {
    let history_block = if history.is_empty() {
        String::new()
    } else {
        format!("### Conversation so far:\n{history}\n\n")
    };
    format!(
        "You are a helpful Q&A assistant answering questions about uploaded documents.\n\
         Use only the provided context to produce precise, well-reasoned answers.\n\
         Reason step by step over the context before answering, and say so when\n\
         the context does not contain the answer.\n\n\
         ### Context:\n{context}\n\n\
         {history_block}\
         ### User Question:\n{question}\n\n\
         ### Answer (markdown):\n"
    )
}

/// Asks the model to rewrite a follow-up question into a self-contained one,
/// or declare it already self-contained. The model must answer with exactly
/// one of the two prefixed forms.
pub fn build_rephrase_prompt(history: &str, question: &str) -> String {
    format!(
        "You manage multi-turn conversations in a document chatbot.\n\n\
         ### Chat History:\n{history}\n\n\
         ### User Question:\n{question}\n\n\
         ### Your Task:\n\
         If the question depends on the chat history and is unclear on its own,\n\
         rewrite it as a self-contained question and return only\n\
         \"{REPHRASED_PREFIX} <rewritten question>\".\n\
         If it is already self-contained, return only\n\
         \"{UNCHANGED_PREFIX} <original question>\".\n\
         Return nothing beyond these two forms.\n"
    )
}

/// Extract the question from a rephrase response. Any unexpected shape falls
/// back to the original question.
pub fn parse_rephrase_output(output: &str, original: &str) -> String {
    let trimmed = output.trim();
    if let Some(rest) = trimmed.strip_prefix(REPHRASED_PREFIX) {
        let rest = rest.trim();
        if !rest.is_empty() {
            return rest.to_string();
        }
    } else if let Some(rest) = trimmed.strip_prefix(UNCHANGED_PREFIX) {
        let rest = rest.trim();
        if !rest.is_empty() {
            return rest.to_string();
        }
    } else {
        tracing::warn!("unexpected rephrase format, keeping original question");
    }
    original.to_string()
}
