//! Action steps — the immutable record of one completed loop iteration.
//!
//! Steps are built incrementally by [`ActionStepBuilder`] while the
//! iteration runs, then frozen by `finish()`. Once appended to the run's
//! memory a step is never mutated again.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Token usage for one step, or aggregated for a whole run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}

impl TokenUsage {
    pub fn new(prompt_tokens: u64, completion_tokens: u64) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
        }
    }

    /// Total tokens consumed.
    pub fn total(&self) -> u64 {
        self.prompt_tokens + self.completion_tokens
    }

    /// Fold another usage record into this accumulator.
    pub fn absorb(&mut self, other: &TokenUsage) {
        self.prompt_tokens += other.prompt_tokens;
        self.completion_tokens += other.completion_tokens;
    }
}

/// Wall-clock timing of one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepTiming {
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
}

impl StepTiming {
    pub fn duration_ms(&self) -> u64 {
        (self.ended_at - self.started_at).num_milliseconds().max(0) as u64
    }
}

/// One tool call issued during a step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocation {
    /// Call id, as assigned by the model.
    pub id: String,
    /// Tool name.
    pub name: String,
    /// Parsed arguments.
    pub arguments: serde_json::Value,
}

/// The frozen record of one completed iteration of the reasoning loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionStep {
    /// Monotonic, 0-based position within the run.
    pub step_number: usize,

    /// Start/end timestamps of the iteration.
    pub timing: StepTiming,

    /// Raw model output for this step.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_output: Option<String>,

    /// Tool calls issued during the step.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolInvocation>,

    /// Observations produced by tool execution.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub observations: Vec<String>,

    /// Error message, when the step recovered from a tool/model failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// The step's structured output, if it produced one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_output: Option<serde_json::Value>,

    /// Whether this step carries the run's final answer.
    pub is_final_answer: bool,

    /// Tokens consumed by this step.
    #[serde(default)]
    pub token_usage: TokenUsage,

    /// Trace id of the run this step belongs to.
    pub trace_id: Uuid,

    /// Trace id of the parent run, for sub-agent steps.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_trace_id: Option<Uuid>,
}

/// Mutable builder for an [`ActionStep`].
///
/// Captures the start timestamp at creation; `finish()` stamps the end time
/// and freezes the step.
#[derive(Debug)]
pub struct ActionStepBuilder {
    step_number: usize,
    started_at: DateTime<Utc>,
    model_output: Option<String>,
    tool_calls: Vec<ToolInvocation>,
    observations: Vec<String>,
    error: Option<String>,
    action_output: Option<serde_json::Value>,
    is_final_answer: bool,
    token_usage: TokenUsage,
    trace_id: Uuid,
    parent_trace_id: Option<Uuid>,
}

impl ActionStepBuilder {
    /// Start building the step at `step_number` for the given run trace.
    pub fn new(step_number: usize, trace_id: Uuid) -> Self {
        Self {
            step_number,
            started_at: Utc::now(),
            model_output: None,
            tool_calls: Vec::new(),
            observations: Vec::new(),
            error: None,
            action_output: None,
            is_final_answer: false,
            token_usage: TokenUsage::default(),
            trace_id,
            parent_trace_id: None,
        }
    }

    pub fn model_output(mut self, output: impl Into<String>) -> Self {
        self.model_output = Some(output.into());
        self
    }

    pub fn tool_call(mut self, call: ToolInvocation) -> Self {
        self.tool_calls.push(call);
        self
    }

    pub fn observation(mut self, observation: impl Into<String>) -> Self {
        self.observations.push(observation.into());
        self
    }

    pub fn error(mut self, message: impl Into<String>) -> Self {
        self.error = Some(message.into());
        self
    }

    pub fn action_output(mut self, output: serde_json::Value) -> Self {
        self.action_output = Some(output);
        self
    }

    pub fn final_answer(mut self, is_final: bool) -> Self {
        self.is_final_answer = is_final;
        self
    }

    pub fn token_usage(mut self, usage: TokenUsage) -> Self {
        self.token_usage = usage;
        self
    }

    pub fn parent_trace(mut self, parent: Uuid) -> Self {
        self.parent_trace_id = Some(parent);
        self
    }

    /// Freeze the step, stamping its end time.
    pub fn finish(self) -> ActionStep {
        ActionStep {
            step_number: self.step_number,
            timing: StepTiming {
                started_at: self.started_at,
                ended_at: Utc::now(),
            },
            model_output: self.model_output,
            tool_calls: self.tool_calls,
            observations: self.observations,
            error: self.error,
            action_output: self.action_output,
            is_final_answer: self.is_final_answer,
            token_usage: self.token_usage,
            trace_id: self.trace_id,
            parent_trace_id: self.parent_trace_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_freezes_all_fields() {
        let trace = Uuid::new_v4();
        let step = ActionStepBuilder::new(3, trace)
            .model_output("I should check the weather")
            .tool_call(ToolInvocation {
                id: "call_1".into(),
                name: "weather_lookup".into(),
                arguments: serde_json::json!({"location": "Tokyo"}),
            })
            .observation("Sunny, 24C")
            .token_usage(TokenUsage::new(120, 40))
            .final_answer(true)
            .finish();

        assert_eq!(step.step_number, 3);
        assert_eq!(step.trace_id, trace);
        assert!(step.is_final_answer);
        assert_eq!(step.tool_calls.len(), 1);
        assert_eq!(step.observations, vec!["Sunny, 24C".to_string()]);
        assert_eq!(step.token_usage.total(), 160);
        assert!(step.timing.ended_at >= step.timing.started_at);
    }

    #[test]
    fn usage_absorb_accumulates() {
        let mut total = TokenUsage::default();
        total.absorb(&TokenUsage::new(10, 5));
        total.absorb(&TokenUsage::new(20, 15));
        assert_eq!(total.prompt_tokens, 30);
        assert_eq!(total.completion_tokens, 20);
        assert_eq!(total.total(), 50);
    }

    #[test]
    fn step_serialization_round_trip() {
        let step = ActionStepBuilder::new(0, Uuid::new_v4())
            .model_output("final")
            .final_answer(true)
            .finish();
        let json = serde_json::to_string(&step).unwrap();
        let back: ActionStep = serde_json::from_str(&json).unwrap();
        assert_eq!(back.step_number, 0);
        assert!(back.is_final_answer);
        assert_eq!(back.model_output.as_deref(), Some("final"));
    }
}
