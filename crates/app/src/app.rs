use std::io::Write;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::time::Duration;

use cointel_session::{ChatSession, KeyPress, RequestId, SessionEvent, render_transcript};
use cointel_transport::{EventReceiver, FileUploader, WsConnectionFactory, event_channel};
use snafu::ResultExt;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::time::Sleep;

use crate::command::{Command, parse_line};
use crate::error::{AppResult, ExportTranscriptSnafu, ReadInputSnafu, WriteOutputSnafu};
use crate::settings::Settings;
use crate::view::TerminalView;

/// Reply timer for the request currently awaiting an answer.
struct ArmedTimer {
    request_id: RequestId,
    sleep: Pin<Box<Sleep>>,
}

/// Terminal host for one chat session.
///
/// Feeds stdin lines, transport events and reply timeouts into the session
/// and prints whatever changed after each event.
pub struct DashboardApp<W> {
    session: ChatSession,
    uploader: FileUploader,
    inbox: EventReceiver,
    reply_timeout: Option<Duration>,
    timer: Option<ArmedTimer>,
    view: TerminalView<W>,
    composing: bool,
}

impl<W: Write> DashboardApp<W> {
    pub fn new(settings: &Settings, out: W) -> Self {
        let (events, inbox) = event_channel();
        let factory = WsConnectionFactory::new(events.clone());
        Self {
            session: ChatSession::new(Box::new(factory), settings.session_config()),
            uploader: FileUploader::new(settings.upload_url.clone(), events),
            inbox,
            reply_timeout: settings.reply_timeout(),
            timer: None,
            view: TerminalView::new(out),
            composing: false,
        }
    }

    pub fn session(&self) -> &ChatSession {
        &self.session
    }

    pub fn into_output(self) -> W {
        self.view.into_inner()
    }

    pub fn upload(&self, paths: impl IntoIterator<Item = PathBuf>) {
        for path in paths {
            tracing::info!(path = ?path, endpoint = %self.uploader.endpoint(), "uploading file");
            self.uploader.spawn_upload(path);
        }
    }

    /// Runs until `/quit`, end of input or Ctrl-C, then closes the connection.
    pub async fn run<R>(&mut self, input: R) -> AppResult<()>
    where
        R: AsyncBufRead + Unpin,
    {
        self.view
            .welcome()
            .context(WriteOutputSnafu { stage: "print-welcome" })?;
        let mut lines = input.lines();

        loop {
            self.sync_timer();
            tokio::select! {
                line = lines.next_line() => {
                    let line = line.context(ReadInputSnafu { stage: "read-input-line" })?;
                    let Some(line) = line else {
                        tracing::debug!("input closed");
                        break;
                    };
                    if !self.on_line(&line)? {
                        break;
                    }
                }
                Some(event) = self.inbox.recv() => {
                    tracing::debug!(?event, "transport event");
                    self.session.handle(event);
                }
                request_id = expire(&mut self.timer) => {
                    self.timer = None;
                    self.session.handle(SessionEvent::ReplyTimedOut(request_id));
                }
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("interrupted");
                    break;
                }
            }
            self.view
                .refresh(&mut self.session)
                .context(WriteOutputSnafu { stage: "refresh-view" })?;
        }

        self.session.shutdown();
        Ok(())
    }

    /// Returns `false` when the user asked to leave.
    fn on_line(&mut self, line: &str) -> AppResult<bool> {
        match parse_line(line) {
            Command::Quit => return Ok(false),
            Command::Help => self
                .view
                .help()
                .context(WriteOutputSnafu { stage: "print-help" })?,
            Command::Invalid(message) => self
                .view
                .error(&message)
                .context(WriteOutputSnafu { stage: "print-command-error" })?,
            Command::Reset => {
                self.composing = false;
                self.session.handle(SessionEvent::Reset);
            }
            Command::Upload(paths) => self.upload(paths),
            Command::Text { text, continued } => {
                let draft = if self.composing {
                    format!("{}{text}", self.session.editor().draft())
                } else {
                    text
                };
                self.session.handle(SessionEvent::DraftChanged(draft));
                let press = if continued {
                    KeyPress::shift_enter()
                } else {
                    KeyPress::enter()
                };
                self.session.handle(SessionEvent::KeyPressed(press));
                self.composing = continued;
            }
        }
        Ok(true)
    }

    fn sync_timer(&mut self) {
        let (Some(request_id), Some(timeout)) = (self.session.pending_request(), self.reply_timeout)
        else {
            self.timer = None;
            return;
        };
        let armed_for = self.timer.as_ref().map(|timer| timer.request_id);
        if armed_for != Some(request_id) {
            self.timer = Some(ArmedTimer {
                request_id,
                sleep: Box::pin(tokio::time::sleep(timeout)),
            });
        }
    }

    pub async fn export_html(&self, path: &Path) -> AppResult<()> {
        let body = render_transcript(self.session.transcript(), self.session.is_pending());
        let document = format!(
            "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\" />\n\
             <title>Fieldtech Co-Intelligence</title>\n</head>\n<body>\n{body}\n</body>\n</html>\n"
        );
        tokio::fs::write(path, document)
            .await
            .context(ExportTranscriptSnafu {
                stage: "write-transcript-html",
                path: path.to_path_buf(),
            })?;
        tracing::info!("exported transcript to {:?}", path);
        Ok(())
    }
}

async fn expire(timer: &mut Option<ArmedTimer>) -> RequestId {
    match timer {
        Some(timer) => {
            timer.sleep.as_mut().await;
            timer.request_id
        }
        None => std::future::pending().await,
    }
}
