//! Run results — the terminal record of one execution of the step loop.

use crate::step::{ActionStep, TokenUsage};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    /// A step produced the final answer.
    Success,
    /// Step execution raised an uncaught error.
    Error,
    /// The configured step limit was reached before a final answer.
    MaxStepsReached,
}

/// Wall-clock timing of a whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunTiming {
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
}

impl RunTiming {
    pub fn duration_ms(&self) -> u64 {
        (self.ended_at - self.started_at).num_milliseconds().max(0) as u64
    }
}

/// The terminal record of a run. Exactly one is produced per run, and it
/// ends the run's lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    /// Final output: the answer on success, the error message on failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<serde_json::Value>,

    /// Terminal state of the run.
    pub state: RunOutcome,

    /// The full ordered step history.
    pub steps: Vec<ActionStep>,

    /// Aggregate token usage across all steps.
    pub token_usage: TokenUsage,

    /// Aggregate timing for the run.
    pub timing: RunTiming,
}

impl RunResult {
    pub fn is_success(&self) -> bool {
        self.state == RunOutcome::Success
    }
}
