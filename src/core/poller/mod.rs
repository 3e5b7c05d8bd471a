use std::time::Duration;

use tracing::{info, warn};

use crate::api::RcaApi;
use crate::api::types::JobSnapshot;
use crate::core::error::RcaError;
use crate::core::trigger::JobHandle;
use crate::interfaces::RenderSink;

/// Timing and budget of the monitor.
///
/// The retry budget (5s x 72) and the overall budget (2s x 300 polls) are
/// independent: a flaky connection must not end a progressing job early, and
/// a healthy connection to a job that never finishes must still stop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollSettings {
    pub max_attempts: u32,
    pub retry_delay: Duration,
    pub poll_interval: Duration,
    pub max_polls: u32,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            max_attempts: 72,
            retry_delay: Duration::from_secs(5),
            poll_interval: Duration::from_secs(2),
            max_polls: 300,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    Polling,
    Retrying(u32),
    Complete,
    Failed,
    TimedOut,
}

impl PollState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            PollState::Complete | PollState::Failed | PollState::TimedOut
        )
    }
}

/// Consecutive transient failures since the last good poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryState {
    pub attempt_count: u32,
    pub max_attempts: u32,
}

impl RetryState {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            attempt_count: 0,
            max_attempts,
        }
    }

    /// Counts one failure. Returns `true` once the budget is spent.
    pub fn record_failure(&mut self) -> bool {
        self.attempt_count += 1;
        self.attempt_count >= self.max_attempts
    }

    pub fn reset(&mut self) {
        self.attempt_count = 0;
    }
}

/// The parts of a snapshot whose change warrants a full redraw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fingerprint {
    problem_summary: String,
    recommendation: String,
    session_id: String,
    timeline_len: usize,
    evidence_len: usize,
    operations_len: usize,
}

impl From<&JobSnapshot> for Fingerprint {
    fn from(snapshot: &JobSnapshot) -> Self {
        Self {
            problem_summary: snapshot.problem_summary.clone(),
            recommendation: snapshot.recommendation.clone(),
            session_id: snapshot.session_id.clone(),
            timeline_len: snapshot.timeline.len(),
            evidence_len: snapshot.evidence.len(),
            operations_len: snapshot.operations_log.len(),
        }
    }
}

/// How monitoring ended when it did not fail.
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    Complete(JobSnapshot),
    /// Budget ran out; the session may still be running remotely.
    TimedOut { polls: u32 },
}

/// Drives one session from first poll to a terminal state.
pub struct Poller<'a> {
    api: &'a dyn RcaApi,
    sink: &'a mut dyn RenderSink,
    settings: PollSettings,
    state: PollState,
    retry: RetryState,
    poll_count: u32,
    last_fingerprint: Option<Fingerprint>,
}

impl<'a> Poller<'a> {
    pub fn new(api: &'a dyn RcaApi, sink: &'a mut dyn RenderSink, settings: PollSettings) -> Self {
        let retry = RetryState::new(settings.max_attempts);
        Self {
            api,
            sink,
            settings,
            state: PollState::Polling,
            retry,
            poll_count: 0,
            last_fingerprint: None,
        }
    }

    pub fn state(&self) -> PollState {
        self.state
    }

    pub fn poll_count(&self) -> u32 {
        self.poll_count
    }

    pub fn retry_state(&self) -> &RetryState {
        &self.retry
    }

    pub async fn run(&mut self, handle: &JobHandle) -> Result<PollOutcome, RcaError> {
        self.sink.on_message("\n🔄 Starting live RCA monitoring...");
        self.sink.on_message("Press Ctrl+C to stop monitoring");
        self.sink.on_message("");

        loop {
            self.poll_count += 1;

            let snapshot = match self.api.fetch_session(&handle.session_id).await {
                Ok(snapshot) => snapshot,
                Err(err) => {
                    let exhausted = self.retry.record_failure();
                    let attempts = self.retry.attempt_count;
                    warn!(
                        "Poll {} failed (retry {}/{}): {}",
                        self.poll_count, attempts, self.retry.max_attempts, err
                    );

                    if exhausted {
                        self.state = PollState::Failed;
                        self.sink.on_error(
                            &format!("Polling failed after {} retries", attempts),
                            &err,
                        );
                        return Err(RcaError::PollExhausted {
                            attempts,
                            source: err,
                        });
                    }

                    self.state = PollState::Retrying(attempts);
                    self.sink.on_progress(&format!(
                        "❌ {} (retry {}/{})",
                        err, attempts, self.retry.max_attempts
                    ));
                    tokio::time::sleep(self.settings.retry_delay).await;
                    continue;
                }
            };

            self.retry.reset();
            self.state = PollState::Polling;

            let fingerprint = Fingerprint::from(&snapshot);
            if self.last_fingerprint.as_ref() != Some(&fingerprint) {
                info!("RCA data updated - refreshing display");
                self.sink.clear();
                self.sink.on_live_update(&snapshot, self.poll_count);
                self.last_fingerprint = Some(fingerprint);
            } else {
                self.sink.on_progress("⏳ In Progress...");
            }

            if snapshot.is_complete {
                self.sink.clear();
                self.sink.on_final(&snapshot);
                self.state = PollState::Complete;
                info!("RCA completed successfully.");
                for (key, value) in snapshot.extra_fields() {
                    info!("Final RCA field {}: {}", key, value);
                }
                return Ok(PollOutcome::Complete(snapshot));
            }

            if self.poll_count > self.settings.max_polls {
                self.sink.on_message(&format!(
                    "\n⏰ Timeout reached after {} polls. RCA may still be processing.",
                    self.poll_count
                ));
                self.state = PollState::TimedOut;
                info!("RCA polling timed out after {} attempts", self.poll_count);
                return Ok(PollOutcome::TimedOut {
                    polls: self.poll_count,
                });
            }

            tokio::time::sleep(self.settings.poll_interval).await;
        }
    }
}

#[cfg(test)]
mod tests;
