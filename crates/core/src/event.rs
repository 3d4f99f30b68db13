//! Runtime event model — the closed set of observability events the
//! scheduler and its collaborators exchange.
//!
//! Events are values: an id, a creation timestamp, and a tagged-union
//! payload. Delivery is someone else's job (`agentloom-events`); nothing
//! here blocks or fails.

use crate::control::ControlKind;
use crate::result::RunOutcome;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

/// The payload of a runtime event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventPayload {
    /// A run began.
    RunStarted { task: String, trace_id: Uuid },

    /// A step began executing.
    StepStarted { step_number: usize },

    /// A step completed and was appended to the run's memory.
    StepCompleted {
        step_number: usize,
        is_final_answer: bool,
        duration_ms: u64,
    },

    /// A step raised and terminated the run.
    StepFailed { step_number: usize, message: String },

    /// The coroutine suspended on a control request.
    ControlYielded {
        request_id: String,
        kind: ControlKind,
    },

    /// The coroutine resumed with a control response.
    ControlResumed { request_id: String, approved: bool },

    /// The run reached its terminal state.
    RunCompleted {
        state: RunOutcome,
        steps: usize,
        total_tokens: u64,
    },

    /// A retry was scheduled for later delivery. `due_at` is absolute,
    /// computed at creation from the retry-after delay.
    RetryScheduled {
        due_at: DateTime<Utc>,
        reason: String,
        attempt: u32,
    },
}

/// Discriminant of [`EventPayload`], used as the subscription key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    RunStarted,
    StepStarted,
    StepCompleted,
    StepFailed,
    ControlYielded,
    ControlResumed,
    RunCompleted,
    RetryScheduled,
}

/// An observability event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeEvent {
    /// Unique event id.
    pub id: Uuid,

    /// When the event was created.
    pub created_at: DateTime<Utc>,

    /// The typed payload.
    #[serde(flatten)]
    pub payload: EventPayload,
}

impl RuntimeEvent {
    /// Create an event stamped now.
    pub fn new(payload: EventPayload) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            payload,
        }
    }

    /// A retry event due `retry_after` from now.
    pub fn retry_scheduled(retry_after: Duration, reason: impl Into<String>, attempt: u32) -> Self {
        let delay = chrono::Duration::from_std(retry_after).unwrap_or(chrono::TimeDelta::MAX);
        Self::new(EventPayload::RetryScheduled {
            due_at: Utc::now() + delay,
            reason: reason.into(),
            attempt,
        })
    }

    /// The event's subscription key.
    pub fn kind(&self) -> EventKind {
        match &self.payload {
            EventPayload::RunStarted { .. } => EventKind::RunStarted,
            EventPayload::StepStarted { .. } => EventKind::StepStarted,
            EventPayload::StepCompleted { .. } => EventKind::StepCompleted,
            EventPayload::StepFailed { .. } => EventKind::StepFailed,
            EventPayload::ControlYielded { .. } => EventKind::ControlYielded,
            EventPayload::ControlResumed { .. } => EventKind::ControlResumed,
            EventPayload::RunCompleted { .. } => EventKind::RunCompleted,
            EventPayload::RetryScheduled { .. } => EventKind::RetryScheduled,
        }
    }

    /// Absolute time after which the event becomes deliverable. `None` for
    /// events that are deliverable immediately.
    pub fn due_at(&self) -> Option<DateTime<Utc>> {
        match &self.payload {
            EventPayload::RetryScheduled { due_at, .. } => Some(*due_at),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_ids_are_unique() {
        let a = RuntimeEvent::new(EventPayload::StepStarted { step_number: 0 });
        let b = RuntimeEvent::new(EventPayload::StepStarted { step_number: 0 });
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn kind_matches_payload() {
        let event = RuntimeEvent::new(EventPayload::ControlYielded {
            request_id: "req-1".into(),
            kind: ControlKind::Confirmation,
        });
        assert_eq!(event.kind(), EventKind::ControlYielded);
        assert!(event.due_at().is_none());
    }

    #[test]
    fn retry_due_at_computed_from_delay() {
        let before = Utc::now();
        let event = RuntimeEvent::retry_scheduled(Duration::from_secs(60), "rate limited", 1);
        let due = event.due_at().expect("retry events carry due_at");
        assert!(due >= before + chrono::Duration::seconds(59));
        assert!(due <= Utc::now() + chrono::Duration::seconds(61));
    }

    #[test]
    fn event_serialization_tags_payload() {
        let event = RuntimeEvent::new(EventPayload::RunCompleted {
            state: RunOutcome::Success,
            steps: 4,
            total_tokens: 1200,
        });
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""type":"run_completed""#));
        assert!(json.contains(r#""steps":4"#));
    }
}
