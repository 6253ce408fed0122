use std::io::{self, Write};

use cointel_session::{ChatSession, ChatTurn, NotificationLevel, Role};

use crate::command::HELP;

const TITLE: &str = "Fieldtech Co-Intelligence";

/// Line-oriented rendering of the dashboard into a terminal.
///
/// Tracks what was already printed so each refresh only emits the delta.
pub struct TerminalView<W> {
    out: W,
    shown_turns: usize,
    shown_files: usize,
    showed_pending: bool,
}

impl<W: Write> TerminalView<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            shown_turns: 0,
            shown_files: 0,
            showed_pending: false,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    pub fn welcome(&mut self) -> io::Result<()> {
        writeln!(self.out, "Welcome to {TITLE}")?;
        writeln!(
            self.out,
            "Upload documents, then ask about your fiber installation and repair tasks."
        )?;
        writeln!(self.out, "{HELP}")?;
        self.out.flush()
    }

    pub fn help(&mut self) -> io::Result<()> {
        writeln!(self.out, "{HELP}")?;
        self.out.flush()
    }

    pub fn error(&mut self, message: &str) -> io::Result<()> {
        writeln!(self.out, "[error] {message}")?;
        self.out.flush()
    }

    /// Prints notifications, new turns and the typing indicator.
    pub fn refresh(&mut self, session: &mut ChatSession) -> io::Result<()> {
        for notification in session.take_notifications() {
            let tag = match notification.level {
                NotificationLevel::Success => "ok",
                NotificationLevel::Error => "error",
            };
            writeln!(self.out, "[{tag}] {}", notification.message)?;
        }

        let files = session.accepted_files();
        if files.len() > self.shown_files {
            writeln!(self.out, "documents: {}", files.join(", "))?;
            self.shown_files = files.len();
        }

        let turns = session.transcript().turns();
        if turns.len() < self.shown_turns {
            writeln!(self.out, "--- new chat ---")?;
            self.shown_turns = 0;
        }
        for turn in &turns[self.shown_turns..] {
            write_turn(&mut self.out, turn)?;
        }
        self.shown_turns = turns.len();

        let pending = session.is_pending();
        if pending && !self.showed_pending {
            writeln!(self.out, "AI is typing...")?;
        }
        self.showed_pending = pending;

        self.out.flush()
    }
}

fn write_turn(out: &mut impl Write, turn: &ChatTurn) -> io::Result<()> {
    let label = match turn.role() {
        Role::User => "You",
        Role::Assistant => "AI",
    };
    let text = turn.content().replace("  \n", "\n");
    let mut lines = text.lines();
    writeln!(out, "{label:>4} | {}", lines.next().unwrap_or_default())?;
    for line in lines {
        writeln!(out, "     | {line}")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multiline_turns_are_indented_under_label() {
        let mut out = Vec::new();
        write_turn(&mut out, &ChatTurn::user("a\nb")).unwrap();
        write_turn(&mut out, &ChatTurn::assistant("ok")).unwrap();

        assert_eq!(
            String::from_utf8(out).unwrap(),
            " You | a\n     | b\n  AI | ok\n"
        );
    }
}
