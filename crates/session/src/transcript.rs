use crate::turn::ChatTurn;

/// Ordered, append-only conversation history.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transcript {
    turns: Vec<ChatTurn>,
    conversation_started: bool,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, turn: ChatTurn) {
        self.turns.push(turn);
        self.conversation_started = true;
    }

    /// Drops every turn and returns to the welcome screen.
    pub fn reset(&mut self) {
        self.turns.clear();
        self.conversation_started = false;
    }

    pub fn turns(&self) -> &[ChatTurn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn last(&self) -> Option<&ChatTurn> {
        self.turns.last()
    }

    /// Whether the conversation view (rather than the welcome screen) is shown.
    pub fn conversation_started(&self) -> bool {
        self.conversation_started
    }
}
