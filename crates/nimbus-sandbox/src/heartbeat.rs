//! Heartbeat ticker and log-tail streamer: child tasks with an explicit
//! stop signal, canceled at stage end (spec §5 "Concurrency &
//! resource model", SPEC_FULL §5 "Mapping to Rust primitives").

use crate::events::SandboxEvent;
use crate::sandbox::Sandbox;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);
const LOG_TAIL_INTERVAL: Duration = Duration::from_secs(5);
const MAX_LOG_TAIL_LINES: usize = 200;
const MAX_LOG_TAIL_CHARS: usize = 4000;

/// Handle to a pair of background tasks for one pipeline stage. Dropping
/// or calling `stop` sends the cancellation signal; the tasks exit at
/// their next tick.
pub struct StageTickers {
    heartbeat_stop: Option<oneshot::Sender<()>>,
    log_tail_stop: Option<oneshot::Sender<()>>,
}

impl StageTickers {
    pub fn stop(mut self) {
        if let Some(tx) = self.heartbeat_stop.take() {
            let _ = tx.send(());
        }
        if let Some(tx) = self.log_tail_stop.take() {
            let _ = tx.send(());
        }
    }
}

/// Spawn a heartbeat ticker (re-emits `event` every 15s) and a log-tail
/// streamer (reads `log_path`'s tail every 5s and emits only the content
/// new since the last read) for the current stage.
pub fn spawn_stage_tickers(
    sandbox: std::sync::Arc<dyn Sandbox>,
    events: mpsc::UnboundedSender<SandboxEvent>,
    heartbeat_event: SandboxEvent,
    log_phase: String,
    log_path: String,
) -> StageTickers {
    let (heartbeat_stop_tx, mut heartbeat_stop_rx) = oneshot::channel();
    let heartbeat_events = events.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(HEARTBEAT_INTERVAL);
        interval.tick().await;
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if heartbeat_events.send(heartbeat_event.clone()).is_err() {
                        break;
                    }
                }
                _ = &mut heartbeat_stop_rx => break,
            }
        }
    });

    let (log_tail_stop_tx, mut log_tail_stop_rx) = oneshot::channel();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(LOG_TAIL_INTERVAL);
        interval.tick().await;
        let mut last_tail = String::new();
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let Ok(current) = sandbox
                        .read_log_tail(&log_path, MAX_LOG_TAIL_LINES, MAX_LOG_TAIL_CHARS)
                        .await
                    else {
                        continue;
                    };
                    if let Some(new_content) = diff_new_suffix(&last_tail, &current) {
                        if !new_content.is_empty() {
                            let sent = events.send(SandboxEvent::Log {
                                phase: log_phase.clone(),
                                message: new_content,
                            });
                            if sent.is_err() {
                                break;
                            }
                        }
                        last_tail = current;
                    }
                }
                _ = &mut log_tail_stop_rx => break,
            }
        }
    });

    StageTickers {
        heartbeat_stop: Some(heartbeat_stop_tx),
        log_tail_stop: Some(log_tail_stop_tx),
    }
}

/// Diff against the last known trailing line, returning only content new
/// since the previous read (spec §4.3 "The streamer diffs against the
/// last known trailing line to emit only new content").
fn diff_new_suffix(previous: &str, current: &str) -> Option<String> {
    if current.len() >= previous.len() && current.starts_with(previous) {
        Some(current[previous.len()..].to_string())
    } else {
        // Tail window shifted (previous content fell off the front); treat
        // the whole current tail as new rather than guessing at overlap.
        Some(current.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diff_returns_only_appended_suffix() {
        let diff = diff_new_suffix("line1\n", "line1\nline2\n").unwrap();
        assert_eq!(diff, "line2\n");
    }

    #[test]
    fn diff_returns_empty_when_unchanged() {
        let diff = diff_new_suffix("line1\n", "line1\n").unwrap();
        assert_eq!(diff, "");
    }

    #[test]
    fn diff_returns_whole_tail_when_window_shifted() {
        let diff = diff_new_suffix("stale prefix\n", "entirely different content\n").unwrap();
        assert_eq!(diff, "entirely different content\n");
    }
}
