/// Upper bound on the textarea height, in rows.
pub const MAX_VISUAL_ROWS: usize = 4;
/// Height of a freshly mounted, untouched textarea.
const INITIAL_VISUAL_ROWS: usize = 2;
/// Height right after a submit.
const COLLAPSED_VISUAL_ROWS: usize = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Enter,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Modifiers {
    pub shift: bool,
    pub alt: bool,
    pub control: bool,
    pub platform: bool,
}

impl Modifiers {
    pub const fn none() -> Self {
        Self {
            shift: false,
            alt: false,
            control: false,
            platform: false,
        }
    }

    pub const fn shift() -> Self {
        Self {
            shift: true,
            ..Self::none()
        }
    }

    pub fn any(self) -> bool {
        self.shift || self.alt || self.control || self.platform
    }
}

/// One keypress delivered to the editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyPress {
    pub key: Key,
    pub modifiers: Modifiers,
}

impl KeyPress {
    pub const fn enter() -> Self {
        Self {
            key: Key::Enter,
            modifiers: Modifiers::none(),
        }
    }

    pub const fn shift_enter() -> Self {
        Self {
            key: Key::Enter,
            modifiers: Modifiers::shift(),
        }
    }
}

/// What the editor did with a keypress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOutcome {
    /// Plain Enter: the default newline is suppressed and a submit is due.
    Submit,
    /// Modified Enter: a literal newline went into the draft.
    InsertedNewline,
    Ignored,
}

/// Transient text-entry state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputEditor {
    draft: String,
    visual_rows: usize,
}

impl InputEditor {
    pub fn new() -> Self {
        Self {
            draft: String::new(),
            visual_rows: INITIAL_VISUAL_ROWS,
        }
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn visual_rows(&self) -> usize {
        self.visual_rows
    }

    pub fn on_draft_change(&mut self, text: impl Into<String>) {
        self.draft = text.into();
        self.visual_rows = rows_for(&self.draft);
    }

    pub fn on_key(&mut self, press: KeyPress) -> KeyOutcome {
        match press.key {
            Key::Enter if press.modifiers.any() => {
                let mut next = std::mem::take(&mut self.draft);
                next.push('\n');
                self.on_draft_change(next);
                KeyOutcome::InsertedNewline
            }
            Key::Enter => KeyOutcome::Submit,
            Key::Other => KeyOutcome::Ignored,
        }
    }

    /// Returns true when the draft holds something other than whitespace.
    pub fn has_submittable_draft(&self) -> bool {
        !self.draft.trim().is_empty()
    }

    /// Hands out the draft and leaves the editor empty and collapsed.
    pub fn take_draft(&mut self) -> String {
        self.visual_rows = COLLAPSED_VISUAL_ROWS;
        std::mem::take(&mut self.draft)
    }

    pub fn collapse(&mut self) {
        self.visual_rows = COLLAPSED_VISUAL_ROWS;
    }
}

impl Default for InputEditor {
    fn default() -> Self {
        Self::new()
    }
}

fn rows_for(text: &str) -> usize {
    text.split('\n').count().min(MAX_VISUAL_ROWS)
}
