//! Append-only conversation history.

use crate::llm::{Content, Role};

/// The ordered turns exchanged with the model.
///
/// Turns are only ever appended; the whole sequence is sent on every request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Conversation {
    turns: Vec<Content>,
}

impl Conversation {
    /// An empty conversation.
    pub fn new() -> Self {
        Self::default()
    }

    /// A conversation seeded with one user turn.
    pub fn from_prompt(prompt: impl Into<String>) -> Self {
        let mut conversation = Self::new();
        conversation.push(Content::user(prompt));
        conversation
    }

    /// Append one turn.
    pub fn push(&mut self, turn: Content) {
        self.turns.push(turn);
    }

    /// Append turns in order.
    pub fn extend(&mut self, turns: impl IntoIterator<Item = Content>) {
        self.turns.extend(turns);
    }

    /// All turns, oldest first.
    pub fn turns(&self) -> &[Content] {
        &self.turns
    }

    /// Number of turns.
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// Whether no turn has been recorded.
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// The most recent turn.
    pub fn last(&self) -> Option<&Content> {
        self.turns.last()
    }

    /// Number of turns with the given role.
    pub fn count_role(&self, role: Role) -> usize {
        self.turns.iter().filter(|t| t.role == role).count()
    }
}
