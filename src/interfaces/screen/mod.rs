mod events;
mod ui;

pub use events::{restore_terminal, run_screen};

use chrono::{DateTime, Local};
use tokio::sync::mpsc;

use super::RenderSink;
use crate::api::types::JobSnapshot;

/// Sink calls forwarded from the monitor task to the screen loop.
#[derive(Debug, Clone, PartialEq)]
pub enum ScreenEvent {
    Message(String),
    Progress(String),
    LiveUpdate {
        snapshot: Box<JobSnapshot>,
        poll_count: u32,
    },
    Final(Box<JobSnapshot>),
    Error(String),
    Clear,
    Finished,
}

/// How the user left the screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScreenExit {
    /// Monitoring had ended and the user dismissed the result.
    Acknowledged,
    /// The user quit while monitoring was still running.
    Aborted,
}

/// [`RenderSink`] half of the interactive screen. Lives in the monitor task.
#[derive(Debug, Clone)]
pub struct ScreenSink {
    tx: mpsc::UnboundedSender<ScreenEvent>,
}

impl ScreenSink {
    pub fn new(tx: mpsc::UnboundedSender<ScreenEvent>) -> Self {
        Self { tx }
    }

    fn send(&self, event: ScreenEvent) {
        // The screen may already be gone if the user quit; nothing to do then.
        let _ = self.tx.send(event);
    }
}

impl RenderSink for ScreenSink {
    fn on_message(&mut self, text: &str) {
        self.send(ScreenEvent::Message(text.to_string()));
    }

    fn on_progress(&mut self, text: &str) {
        self.send(ScreenEvent::Progress(text.to_string()));
    }

    fn on_live_update(&mut self, snapshot: &JobSnapshot, poll_count: u32) {
        self.send(ScreenEvent::LiveUpdate {
            snapshot: Box::new(snapshot.clone()),
            poll_count,
        });
    }

    fn on_final(&mut self, snapshot: &JobSnapshot) {
        self.send(ScreenEvent::Final(Box::new(snapshot.clone())));
    }

    fn on_error(&mut self, message: &str, error: &(dyn std::error::Error + 'static)) {
        self.send(ScreenEvent::Error(format!("{}: {}", message, error)));
    }

    fn clear(&mut self) {
        self.send(ScreenEvent::Clear);
    }

    fn wait_for_exit(&mut self) {
        self.send(ScreenEvent::Finished);
    }
}

/// Everything the screen draws. Only the latest snapshot is kept.
pub struct Screen {
    snapshot: JobSnapshot,
    poll_count: u32,
    last_update: DateTime<Local>,
    progress: String,
    notices: Vec<String>,
    error: Option<String>,
    complete: bool,
    finished: bool,
    tick: usize,
    /// First body line shown.
    scroll: u16,
}

const MAX_NOTICES: usize = 4;

impl Screen {
    pub fn new(session_id: &str) -> Self {
        Self {
            snapshot: JobSnapshot::pending(session_id),
            poll_count: 0,
            last_update: Local::now(),
            progress: String::new(),
            notices: Vec::new(),
            error: None,
            complete: false,
            finished: false,
            tick: 0,
            scroll: 0,
        }
    }

    pub fn apply(&mut self, event: ScreenEvent) {
        match event {
            ScreenEvent::Message(text) => {
                let text = text.trim();
                if !text.is_empty() {
                    self.notices.push(text.to_string());
                    if self.notices.len() > MAX_NOTICES {
                        self.notices.remove(0);
                    }
                }
            }
            ScreenEvent::Progress(text) => self.progress = text,
            ScreenEvent::LiveUpdate {
                snapshot,
                poll_count,
            } => {
                self.snapshot = *snapshot;
                self.poll_count = poll_count;
                self.last_update = Local::now();
                self.progress.clear();
            }
            ScreenEvent::Final(snapshot) => {
                self.snapshot = *snapshot;
                self.last_update = Local::now();
                self.complete = true;
                self.progress.clear();
            }
            ScreenEvent::Error(message) => self.error = Some(message),
            ScreenEvent::Clear => {}
            ScreenEvent::Finished => self.finished = true,
        }
    }

    /// Monitoring has ended one way or another.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }

    pub fn snapshot(&self) -> &JobSnapshot {
        &self.snapshot
    }

    pub fn poll_count(&self) -> u32 {
        self.poll_count
    }
}
