use serde::{Deserialize, Serialize};

/// Markdown hard line break: two trailing spaces before the newline.
const HARD_LINE_BREAK: &str = "  \n";

/// Author of one chat turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    /// Short avatar label shown next to a turn.
    pub fn avatar_label(self) -> &'static str {
        match self {
            Self::User => "U",
            Self::Assistant => "AI",
        }
    }
}

/// One message exchanged in the conversation.
///
/// Content is normalized on construction and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatTurn {
    role: Role,
    content: String,
}

impl ChatTurn {
    pub fn new(role: Role, content: &str) -> Self {
        Self {
            role,
            content: normalize_line_breaks(content),
        }
    }

    pub fn user(content: &str) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: &str) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn content(&self) -> &str {
        &self.content
    }
}

/// Rewrites every `\n` into a markdown hard line break.
pub fn normalize_line_breaks(text: &str) -> String {
    text.replace('\n', HARD_LINE_BREAK)
}
