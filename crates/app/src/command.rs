use std::path::PathBuf;

/// One line typed at the dashboard prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Upload(Vec<PathBuf>),
    Reset,
    Quit,
    Help,
    Invalid(String),
    /// Text for the draft. `continued` marks a modified Enter (trailing `\`).
    Text { text: String, continued: bool },
}

pub const HELP: &str = "\
/upload <file>...  upload documents to the assistant
/reset             start a new chat
/quit              leave the dashboard
end a line with \\ to continue the message on the next line";

pub fn parse_line(line: &str) -> Command {
    let trimmed = line.trim_end_matches(['\r', '\n']);
    let Some(command) = trimmed.trim_start().strip_prefix('/') else {
        return match trimmed.strip_suffix('\\') {
            Some(text) => Command::Text {
                text: text.to_string(),
                continued: true,
            },
            None => Command::Text {
                text: trimmed.to_string(),
                continued: false,
            },
        };
    };

    let mut words = command.split_whitespace();
    match words.next() {
        Some("upload") => {
            let paths = words.map(PathBuf::from).collect::<Vec<_>>();
            if paths.is_empty() {
                Command::Invalid("usage: /upload <file>...".to_string())
            } else {
                Command::Upload(paths)
            }
        }
        Some("reset") | Some("chats") => Command::Reset,
        Some("quit") | Some("exit") => Command::Quit,
        Some("help") => Command::Help,
        Some(other) => Command::Invalid(format!("unknown command /{other}, try /help")),
        None => Command::Invalid("empty command, try /help".to_string()),
    }
}
