use std::collections::VecDeque;

use serde::Serialize;

/// How many turns a history keeps before evicting the oldest.
pub const MAX_TURNS: usize = 10;

/// One prompt/response pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConversationTurn {
    pub prompt: String,
    pub response: String,
}

/// Bounded, FIFO conversation history owned by a single chat session.
#[derive(Debug, Clone, Default)]
pub struct ConversationHistory {
    turns: VecDeque<ConversationTurn>,
}

impl ConversationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, prompt: impl Into<String>, response: impl Into<String>) {
        self.turns.push_back(ConversationTurn {
            prompt: prompt.into(),
            response: response.into(),
        });
        while self.turns.len() > MAX_TURNS {
            self.turns.pop_front();
        }
    }

    pub fn turns(&self) -> impl Iterator<Item = &ConversationTurn> {
        self.turns.iter()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }

    /// Alternating `User:` / `Assistant:` lines, turns separated by a blank line.
    pub fn render(&self) -> String {
        if self.is_empty() {
            return String::new();
        }
        self.turns()
            .map(|t| format!("User: {}\nAssistant: {}", t.prompt, t.response))
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}
