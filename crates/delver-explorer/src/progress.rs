//! Progress notifications emitted while an exploration runs.
//!
//! Notifiers are called inline from the loop and must not block. Use
//! [`ChannelProgress`] to hand events to another task.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::UnboundedSender;

use crate::types::{ExplorationResult, ExplorationRound, ToolExecution};

/// A progress event, as delivered by [`ChannelProgress`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProgressEvent {
    /// A tool call finished (or was skipped).
    ToolExecuted { execution: ToolExecution },
    /// A round finished.
    RoundComplete { round: ExplorationRound },
    /// The session finished.
    ExplorationComplete {
        success: bool,
        summary: Option<String>,
    },
}

/// Receives progress callbacks from the loop.
pub trait ProgressNotifier: Send + Sync {
    fn on_tool_execution(&self, _execution: &ToolExecution) {}

    fn on_round_complete(&self, _round: &ExplorationRound) {}

    fn on_exploration_complete(&self, _result: &ExplorationResult) {}
}

/// Adapts a closure over [`ProgressEvent`] into a notifier.
pub struct FnProgress<F>(F);

impl<F> FnProgress<F>
where
    F: Fn(ProgressEvent) + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

impl<F> ProgressNotifier for FnProgress<F>
where
    F: Fn(ProgressEvent) + Send + Sync,
{
    fn on_tool_execution(&self, execution: &ToolExecution) {
        (self.0)(ProgressEvent::ToolExecuted {
            execution: execution.clone(),
        });
    }

    fn on_round_complete(&self, round: &ExplorationRound) {
        (self.0)(ProgressEvent::RoundComplete {
            round: round.clone(),
        });
    }

    fn on_exploration_complete(&self, result: &ExplorationResult) {
        (self.0)(ProgressEvent::ExplorationComplete {
            success: result.success,
            summary: result.summary.clone(),
        });
    }
}

/// Forwards events over an unbounded channel. A closed receiver is ignored.
#[derive(Debug, Clone)]
pub struct ChannelProgress {
    tx: UnboundedSender<ProgressEvent>,
}

impl ChannelProgress {
    pub fn new(tx: UnboundedSender<ProgressEvent>) -> Self {
        Self { tx }
    }

    fn send(&self, event: ProgressEvent) {
        if self.tx.send(event).is_err() {
            tracing::trace!("Progress receiver dropped");
        }
    }
}

impl ProgressNotifier for ChannelProgress {
    fn on_tool_execution(&self, execution: &ToolExecution) {
        self.send(ProgressEvent::ToolExecuted {
            execution: execution.clone(),
        });
    }

    fn on_round_complete(&self, round: &ExplorationRound) {
        self.send(ProgressEvent::RoundComplete {
            round: round.clone(),
        });
    }

    fn on_exploration_complete(&self, result: &ExplorationResult) {
        self.send(ProgressEvent::ExplorationComplete {
            success: result.success,
            summary: result.summary.clone(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Parameters;
    use std::sync::Mutex;

    #[test]
    fn test_fn_progress() {
        let seen = Mutex::new(Vec::new());
        let notifier = FnProgress::new(|event| seen.lock().unwrap().push(event));

        notifier.on_tool_execution(&ToolExecution::success("read_file", Parameters::new(), "ok"));
        notifier.on_round_complete(&ExplorationRound::new("Round 1"));

        let events = seen.lock().unwrap();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], ProgressEvent::ToolExecuted { .. }));
        assert!(matches!(
            events[1],
            ProgressEvent::RoundComplete { ref round } if round.name == "Round 1"
        ));
    }

    #[tokio::test]
    async fn test_channel_progress_survives_dropped_receiver() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let notifier = ChannelProgress::new(tx);

        notifier.on_round_complete(&ExplorationRound::new("Planning"));
        let event = rx.recv().await.unwrap();
        assert!(matches!(event, ProgressEvent::RoundComplete { .. }));

        drop(rx);
        notifier.on_round_complete(&ExplorationRound::new("Round 1"));
    }

    #[test]
    fn test_event_serialization() {
        let event = ProgressEvent::ExplorationComplete {
            success: true,
            summary: None,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "exploration_complete");
    }
}
