use paperchat_schema::ConversationTurn;

/// Ordered log of answered questions for one session. Bounded: once
/// `max_turns` is reached the oldest turn is evicted, so prompts never grow
/// without limit.
#[derive(Debug)]
pub struct ConversationMemory {
    turns: Vec<ConversationTurn>,
    max_turns: usize,
}

impl ConversationMemory {
    pub fn new(max_turns: usize) -> Self {
        Self {
            turns: Vec::new(),
            max_turns: max_turns.max(1),
        }
    }

    /// Record one answered question. Callers append only after the generator
    /// succeeded, so a failed query leaves history untouched.
    pub fn append(&mut self, question: impl Into<String>, answer: impl Into<String>) {
        self.turns.push(ConversationTurn::new(question, answer));
        if self.turns.len() > self.max_turns {
            let excess = self.turns.len() - self.max_turns;
            self.turns.drain(..excess);
        }
    }

    /// Turns in chronological order.
    pub fn history(&self) -> &[ConversationTurn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Transcript rendering used inside prompts.
    pub fn format_history(&self) -> String {
        self.turns
            .iter()
            .map(|turn| format!("User: {}\nAssistant: {}", turn.question, turn.answer))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
