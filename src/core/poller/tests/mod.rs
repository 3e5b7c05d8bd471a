mod state_machine;

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use crate::api::RcaApi;
use crate::api::types::{JobSnapshot, KomodorCluster, SessionRequest, SessionResponse};
use crate::core::error::{PollError, RcaError};
use crate::core::trigger::JobHandle;
use crate::interfaces::RenderSink;

type Script = Box<dyn Fn(u32) -> Result<JobSnapshot, PollError> + Send + Sync>;

/// Answers poll `n` (1-based) with `script(n)` and records when each poll arrived.
pub(super) struct ScriptedApi {
    script: Script,
    calls: Mutex<Vec<Instant>>,
}

impl ScriptedApi {
    pub(super) fn new(
        script: impl Fn(u32) -> Result<JobSnapshot, PollError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            script: Box::new(script),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub(super) fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Time between consecutive polls.
    pub(super) fn gaps(&self) -> Vec<Duration> {
        let calls = self.calls.lock().unwrap();
        calls.windows(2).map(|w| w[1] - w[0]).collect()
    }
}

#[async_trait]
impl RcaApi for ScriptedApi {
    async fn trigger_session(&self, _request: &SessionRequest) -> Result<SessionResponse, RcaError> {
        unreachable!("poller never triggers")
    }

    async fn fetch_session(&self, _session_id: &str) -> Result<JobSnapshot, PollError> {
        let n = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(Instant::now());
            calls.len() as u32
        };
        (self.script)(n)
    }

    async fn list_clusters(&self) -> anyhow::Result<Vec<KomodorCluster>> {
        unreachable!("poller never lists clusters")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(super) enum Event {
    Message(String),
    Progress(String),
    LiveUpdate { poll_count: u32, snapshot: JobSnapshot },
    Final(JobSnapshot),
    Error(String),
    Clear,
    WaitForExit,
}

#[derive(Debug, Default)]
pub(super) struct RecordingSink {
    pub(super) events: Vec<Event>,
}

impl RecordingSink {
    pub(super) fn count(&self, pred: impl Fn(&Event) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }

    pub(super) fn live_updates(&self) -> usize {
        self.count(|e| matches!(e, Event::LiveUpdate { .. }))
    }

    pub(super) fn finals(&self) -> usize {
        self.count(|e| matches!(e, Event::Final(_)))
    }

    pub(super) fn in_progress(&self) -> usize {
        self.count(|e| matches!(e, Event::Progress(p) if p.contains("In Progress")))
    }

    pub(super) fn retries(&self) -> usize {
        self.count(|e| matches!(e, Event::Progress(p) if p.contains("retry")))
    }

    /// Events emitted after the three start-up messages.
    pub(super) fn after_banner(&self) -> &[Event] {
        &self.events[3..]
    }
}

impl RenderSink for RecordingSink {
    fn on_message(&mut self, text: &str) {
        self.events.push(Event::Message(text.to_string()));
    }

    fn on_progress(&mut self, text: &str) {
        self.events.push(Event::Progress(text.to_string()));
    }

    fn on_live_update(&mut self, snapshot: &JobSnapshot, poll_count: u32) {
        self.events.push(Event::LiveUpdate {
            poll_count,
            snapshot: snapshot.clone(),
        });
    }

    fn on_final(&mut self, snapshot: &JobSnapshot) {
        self.events.push(Event::Final(snapshot.clone()));
    }

    fn on_error(&mut self, message: &str, error: &(dyn std::error::Error + 'static)) {
        self.events.push(Event::Error(format!("{}: {}", message, error)));
    }

    fn clear(&mut self) {
        self.events.push(Event::Clear);
    }

    fn wait_for_exit(&mut self) {
        self.events.push(Event::WaitForExit);
    }
}

pub(super) fn handle() -> JobHandle {
    JobHandle {
        session_id: "sess-1".to_string(),
    }
}

pub(super) fn snapshot() -> JobSnapshot {
    JobSnapshot::pending("sess-1")
}

pub(super) fn http_503() -> PollError {
    PollError::Status {
        code: 503,
        body: "service unavailable".to_string(),
    }
}
