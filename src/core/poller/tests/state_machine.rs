use std::time::Duration;

use super::{Event, RecordingSink, ScriptedApi, handle, http_503, snapshot};
use crate::core::error::{DecodeStage, PollError, RcaError};
use crate::core::poller::{PollOutcome, PollSettings, PollState, Poller, RetryState};

fn complete() -> crate::api::types::JobSnapshot {
    crate::api::types::JobSnapshot {
        is_complete: true,
        problem_summary: "Container OOMKilled".to_string(),
        ..snapshot()
    }
}

#[tokio::test(start_paused = true)]
async fn gives_up_after_exactly_72_consecutive_failures() {
    let api = ScriptedApi::new(|_| Err(http_503()));
    let mut sink = RecordingSink::default();
    let mut poller = Poller::new(&api, &mut sink, PollSettings::default());

    let err = poller.run(&handle()).await.unwrap_err();

    assert_eq!(poller.state(), PollState::Failed);
    drop(poller);
    match err {
        RcaError::PollExhausted { attempts, source } => {
            assert_eq!(attempts, 72);
            assert!(matches!(source, PollError::Status { code: 503, .. }));
        }
        other => panic!("unexpected {:?}", other),
    }
    assert_eq!(api.call_count(), 72);
    assert_eq!(sink.retries(), 71);
    assert_eq!(sink.count(|e| matches!(e, Event::Error(_))), 1);
    assert_eq!(sink.finals(), 0);
}

#[tokio::test(start_paused = true)]
async fn failed_polls_back_off_five_seconds() {
    let api = ScriptedApi::new(|n| if n <= 3 { Err(http_503()) } else { Ok(complete()) });
    let mut sink = RecordingSink::default();
    let mut poller = Poller::new(&api, &mut sink, PollSettings::default());

    poller.run(&handle()).await.unwrap();

    assert_eq!(api.gaps(), vec![Duration::from_secs(5); 3]);
}

#[tokio::test(start_paused = true)]
async fn healthy_polls_are_two_seconds_apart() {
    let api = ScriptedApi::new(|n| if n < 4 { Ok(snapshot()) } else { Ok(complete()) });
    let mut sink = RecordingSink::default();
    let mut poller = Poller::new(&api, &mut sink, PollSettings::default());

    poller.run(&handle()).await.unwrap();

    assert_eq!(api.gaps(), vec![Duration::from_secs(2); 3]);
}

#[tokio::test(start_paused = true)]
async fn success_resets_the_attempt_counter() {
    // 71 failures, one good poll, 71 more failures: never 72 in a row.
    let api = ScriptedApi::new(|n| match n {
        1..=71 => Err(http_503()),
        72 => Ok(snapshot()),
        73..=143 => Err(PollError::Transport("connection reset".to_string())),
        _ => Ok(complete()),
    });
    let mut sink = RecordingSink::default();
    let mut poller = Poller::new(&api, &mut sink, PollSettings::default());

    let outcome = poller.run(&handle()).await.unwrap();

    assert!(matches!(outcome, PollOutcome::Complete(_)));
    assert_eq!(poller.retry_state().attempt_count, 0);
    assert_eq!(poller.state(), PollState::Complete);
    drop(poller);
    assert_eq!(api.call_count(), 144);
}

#[tokio::test(start_paused = true)]
async fn each_failure_adds_exactly_one_attempt() {
    let api = ScriptedApi::new(|n| if n <= 2 { Err(http_503()) } else { Ok(complete()) });
    let mut sink = RecordingSink::default();
    let mut poller = Poller::new(&api, &mut sink, PollSettings::default());

    poller.run(&handle()).await.unwrap();
    drop(poller);

    let retries: Vec<&Event> = sink
        .events
        .iter()
        .filter(|e| matches!(e, Event::Progress(p) if p.contains("retry")))
        .collect();
    assert_eq!(
        retries,
        vec![
            &Event::Progress(
                "❌ polling failed (HTTP 503): service unavailable (retry 1/72)".to_string()
            ),
            &Event::Progress(
                "❌ polling failed (HTTP 503): service unavailable (retry 2/72)".to_string()
            ),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn decode_failures_are_transient() {
    let api = ScriptedApi::new(|n| {
        if n <= 71 {
            Err(PollError::Decode {
                stage: if n % 2 == 0 {
                    DecodeStage::Raw
                } else {
                    DecodeStage::Structured
                },
                message: "expected value".to_string(),
            })
        } else {
            Ok(complete())
        }
    });
    let mut sink = RecordingSink::default();
    let mut poller = Poller::new(&api, &mut sink, PollSettings::default());

    let outcome = poller.run(&handle()).await.unwrap();

    assert!(matches!(outcome, PollOutcome::Complete(_)));
}

#[tokio::test(start_paused = true)]
async fn completion_emits_one_final_and_stops() {
    let api = ScriptedApi::new(|n| if n < 3 { Ok(snapshot()) } else { Ok(complete()) });
    let mut sink = RecordingSink::default();
    let mut poller = Poller::new(&api, &mut sink, PollSettings::default());

    let outcome = poller.run(&handle()).await.unwrap();

    assert_eq!(outcome, PollOutcome::Complete(complete()));
    drop(poller);
    assert_eq!(api.call_count(), 3);
    assert_eq!(sink.finals(), 1);
    assert_eq!(sink.events.last(), Some(&Event::Final(complete())));
    assert_eq!(sink.events[sink.events.len() - 2], Event::Clear);
}

#[tokio::test(start_paused = true)]
async fn completion_right_after_failures_still_finalizes() {
    let api = ScriptedApi::new(|n| if n <= 71 { Err(http_503()) } else { Ok(complete()) });
    let mut sink = RecordingSink::default();
    let mut poller = Poller::new(&api, &mut sink, PollSettings::default());

    poller.run(&handle()).await.unwrap();
    drop(poller);

    assert_eq!(sink.finals(), 1);
    assert_eq!(sink.count(|e| matches!(e, Event::Error(_))), 0);
}

#[tokio::test(start_paused = true)]
async fn times_out_after_301_healthy_polls() {
    let api = ScriptedApi::new(|_| Ok(snapshot()));
    let mut sink = RecordingSink::default();
    let mut poller = Poller::new(&api, &mut sink, PollSettings::default());

    let outcome = poller.run(&handle()).await.unwrap();

    assert_eq!(outcome, PollOutcome::TimedOut { polls: 301 });
    assert_eq!(poller.state(), PollState::TimedOut);
    drop(poller);
    assert_eq!(api.call_count(), 301);
    assert!(api.gaps().iter().all(|gap| *gap == Duration::from_secs(2)));
    assert!(matches!(
        sink.events.last(),
        Some(Event::Message(m)) if m.contains("Timeout reached after 301 polls")
    ));
    assert_eq!(sink.finals(), 0);
}

#[tokio::test(start_paused = true)]
async fn completion_on_the_last_poll_beats_the_timeout() {
    let api = ScriptedApi::new(|n| if n < 301 { Ok(snapshot()) } else { Ok(complete()) });
    let mut sink = RecordingSink::default();
    let mut poller = Poller::new(&api, &mut sink, PollSettings::default());

    let outcome = poller.run(&handle()).await.unwrap();

    assert!(matches!(outcome, PollOutcome::Complete(_)));
}

#[tokio::test(start_paused = true)]
async fn failed_attempts_count_toward_the_poll_budget() {
    let api = ScriptedApi::new(|n| if n <= 10 { Err(http_503()) } else { Ok(snapshot()) });
    let mut sink = RecordingSink::default();
    let mut poller = Poller::new(&api, &mut sink, PollSettings::default());

    let outcome = poller.run(&handle()).await.unwrap();

    assert_eq!(outcome, PollOutcome::TimedOut { polls: 301 });
    drop(poller);
    // The first live update carries the attempt number, failures included.
    assert!(matches!(
        sink.after_banner().iter().find(|e| matches!(e, Event::LiveUpdate { .. })),
        Some(Event::LiveUpdate { poll_count: 11, .. })
    ));
}

#[tokio::test(start_paused = true)]
async fn shrunken_settings_are_honoured() {
    let settings = PollSettings {
        max_attempts: 3,
        retry_delay: Duration::from_millis(10),
        poll_interval: Duration::from_millis(10),
        max_polls: 5,
    };
    let api = ScriptedApi::new(|_| Err(http_503()));
    let mut sink = RecordingSink::default();
    let mut poller = Poller::new(&api, &mut sink, settings);

    let err = poller.run(&handle()).await.unwrap_err();

    assert!(matches!(err, RcaError::PollExhausted { attempts: 3, .. }));
    drop(poller);
    assert_eq!(api.gaps(), vec![Duration::from_millis(10); 2]);
}

#[test]
fn retry_state_budget() {
    let mut retry = RetryState::new(3);
    assert!(!retry.record_failure());
    assert!(!retry.record_failure());
    retry.reset();
    assert_eq!(retry.attempt_count, 0);
    assert!(!retry.record_failure());
    assert!(!retry.record_failure());
    assert!(retry.record_failure());
}

#[test]
fn terminal_states() {
    assert!(!PollState::Polling.is_terminal());
    assert!(!PollState::Retrying(4).is_terminal());
    assert!(PollState::Complete.is_terminal());
    assert!(PollState::Failed.is_terminal());
    assert!(PollState::TimedOut.is_terminal());
}
