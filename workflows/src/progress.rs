//! # Flow Progress
//!
//! Issuance moves through a fixed, linear sequence of stages:
//!
//! ```text
//! Unstarted → Generating → Verifying → Signing → GatheringSignatures → Finalising → Done
//!      \___________\___________\__________\_______________\_______________\→ Failed
//! ```
//!
//! [`ProgressTracker`] enforces that order. Each accepted transition is
//! published as a [`ProgressEvent`] on a broadcast channel and logged.
//! `Done` and `Failed` are terminal: once reached, further transitions are
//! ignored.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;
use uuid::Uuid;

use reledger_protocol::config;

/// A stage of the issuance flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FlowStage {
    Unstarted,
    Generating,
    Verifying,
    Signing,
    GatheringSignatures,
    Finalising,
    Done,
    Failed,
}

impl FlowStage {
    /// The stage that follows this one on the success path.
    pub fn next(self) -> Option<FlowStage> {
        match self {
            FlowStage::Unstarted => Some(FlowStage::Generating),
            FlowStage::Generating => Some(FlowStage::Verifying),
            FlowStage::Verifying => Some(FlowStage::Signing),
            FlowStage::Signing => Some(FlowStage::GatheringSignatures),
            FlowStage::GatheringSignatures => Some(FlowStage::Finalising),
            FlowStage::Finalising => Some(FlowStage::Done),
            FlowStage::Done | FlowStage::Failed => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, FlowStage::Done | FlowStage::Failed)
    }

    /// Operator-facing description of what the flow is doing.
    pub fn label(self) -> &'static str {
        match self {
            FlowStage::Unstarted => "Not started.",
            FlowStage::Generating => "Generating transaction based on new attestation.",
            FlowStage::Verifying => "Verifying contract constraints.",
            FlowStage::Signing => "Signing transaction with our private key.",
            FlowStage::GatheringSignatures => "Gathering the counterparties' signatures.",
            FlowStage::Finalising => "Obtaining notary signature and recording transaction.",
            FlowStage::Done => "Done.",
            FlowStage::Failed => "Failed.",
        }
    }
}

impl fmt::Display for FlowStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FlowStage::Unstarted => "unstarted",
            FlowStage::Generating => "generating",
            FlowStage::Verifying => "verifying",
            FlowStage::Signing => "signing",
            FlowStage::GatheringSignatures => "gathering_signatures",
            FlowStage::Finalising => "finalising",
            FlowStage::Done => "done",
            FlowStage::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Published on every accepted stage transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub flow_id: Uuid,
    pub from: FlowStage,
    pub to: FlowStage,
    pub at: DateTime<Utc>,
    /// Set when `to` is [`FlowStage::Failed`].
    pub reason: Option<String>,
}

/// Tracks and publishes the stage of one flow instance.
pub struct ProgressTracker {
    flow_id: Uuid,
    current: FlowStage,
    history: Vec<FlowStage>,
    events: broadcast::Sender<ProgressEvent>,
}

impl ProgressTracker {
    pub fn new(flow_id: Uuid) -> Self {
        let (events, _) = broadcast::channel(config::PROGRESS_CHANNEL_CAPACITY);
        Self {
            flow_id,
            current: FlowStage::Unstarted,
            history: vec![FlowStage::Unstarted],
            events,
        }
    }

    pub fn flow_id(&self) -> Uuid {
        self.flow_id
    }

    pub fn current(&self) -> FlowStage {
        self.current
    }

    /// Every stage visited so far, oldest first.
    pub fn history(&self) -> &[FlowStage] {
        &self.history
    }

    /// Receive events for transitions made after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<ProgressEvent> {
        self.events.subscribe()
    }

    /// Move to the next stage on the success path. Returns `false` (and does
    /// nothing) if `to` is not the immediate successor of the current stage.
    pub fn advance(&mut self, to: FlowStage) -> bool {
        if self.current.next() != Some(to) {
            tracing::debug!(flow_id = %self.flow_id, from = %self.current, %to, "ignored out-of-order stage transition");
            return false;
        }
        self.transition(to, None);
        true
    }

    /// Abort from any non-terminal stage.
    pub fn fail(&mut self, reason: impl Into<String>) -> bool {
        if self.current.is_terminal() {
            return false;
        }
        self.transition(FlowStage::Failed, Some(reason.into()));
        true
    }

    fn transition(&mut self, to: FlowStage, reason: Option<String>) {
        let from = self.current;
        self.current = to;
        self.history.push(to);

        match &reason {
            Some(reason) => {
                tracing::warn!(flow_id = %self.flow_id, stage = %from, %reason, "flow failed")
            }
            None => tracing::info!(flow_id = %self.flow_id, stage = %to, "{}", to.label()),
        }

        // No subscribers is fine.
        let _ = self.events.send(ProgressEvent {
            flow_id: self.flow_id,
            from,
            to,
            at: Utc::now(),
            reason,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PATH: [FlowStage; 6] = [
        FlowStage::Generating,
        FlowStage::Verifying,
        FlowStage::Signing,
        FlowStage::GatheringSignatures,
        FlowStage::Finalising,
        FlowStage::Done,
    ];

    #[test]
    fn success_path_is_linear() {
        let mut t = ProgressTracker::new(Uuid::new_v4());
        for stage in PATH {
            assert!(t.advance(stage), "should accept {stage}");
        }
        assert_eq!(t.current(), FlowStage::Done);
        assert_eq!(t.history().len(), 7);
    }

    #[test]
    fn skipping_a_stage_is_ignored() {
        let mut t = ProgressTracker::new(Uuid::new_v4());
        assert!(t.advance(FlowStage::Generating));
        assert!(!t.advance(FlowStage::Signing));
        assert_eq!(t.current(), FlowStage::Generating);
    }

    #[test]
    fn terminal_stages_are_immutable() {
        let mut t = ProgressTracker::new(Uuid::new_v4());
        assert!(t.advance(FlowStage::Generating));
        assert!(t.fail("boom"));
        assert!(!t.fail("again"));
        assert!(!t.advance(FlowStage::Verifying));
        assert_eq!(t.current(), FlowStage::Failed);

        let mut done = ProgressTracker::new(Uuid::new_v4());
        for stage in PATH {
            done.advance(stage);
        }
        assert!(!done.fail("too late"));
        assert_eq!(done.current(), FlowStage::Done);
    }

    #[tokio::test]
    async fn transitions_are_broadcast() {
        let mut t = ProgressTracker::new(Uuid::new_v4());
        let mut rx = t.subscribe();
        t.advance(FlowStage::Generating);
        t.fail("no notary");

        let first = rx.recv().await.unwrap();
        assert_eq!((first.from, first.to), (FlowStage::Unstarted, FlowStage::Generating));
        let second = rx.recv().await.unwrap();
        assert_eq!(second.to, FlowStage::Failed);
        assert_eq!(second.reason.as_deref(), Some("no notary"));
        assert_eq!(second.flow_id, t.flow_id());
    }

    #[test]
    fn labels_match_operator_wording() {
        assert_eq!(FlowStage::Verifying.label(), "Verifying contract constraints.");
        assert_eq!(FlowStage::GatheringSignatures.to_string(), "gathering_signatures");
    }
}
