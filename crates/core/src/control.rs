//! Control request/response types — the suspend/resume pair that lets a
//! run ask an external party (user, supervisor, sub-agent) for input
//! mid-execution.
//!
//! A `ControlRequest` is yielded by the coroutine; exactly one
//! `ControlResponse` with the matching `request_id` answers it, after which
//! the request is inert. Non-interactive consumption modes resolve requests
//! automatically according to the request's declared [`SyncBehavior`].

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What kind of external input a request is asking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlKind {
    /// Free-form text from the user.
    UserInput,
    /// A yes/no approval.
    Confirmation,
    /// An arbitrary query escalated to a parent agent.
    SubAgentQuery,
}

impl std::fmt::Display for ControlKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ControlKind::UserInput => "user_input",
            ControlKind::Confirmation => "confirmation",
            ControlKind::SubAgentQuery => "sub_agent_query",
        };
        f.write_str(name)
    }
}

/// How non-interactive (sync/streaming) callers resolve a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncBehavior {
    /// Use the request's declared default value; fail if there is none.
    Default,
    /// Synthesize an affirmative response.
    Approve,
    /// Synthesize a response with no value.
    Skip,
}

/// A request for external input, yielded through the suspension channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlRequest {
    /// Unique request id; a response must carry it back exactly.
    pub id: String,

    /// What kind of input is being requested.
    pub kind: ControlKind,

    /// Human-readable prompt or query.
    pub prompt: String,

    /// Constrained answer options, when the request has any.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,

    /// Declared default value, used by `SyncBehavior::Default`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,

    /// How long the requester is willing to wait, in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,

    /// Free-form context for whoever answers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<serde_json::Value>,

    /// Resolution policy for non-interactive callers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sync_behavior: Option<SyncBehavior>,
}

impl ControlRequest {
    fn new(kind: ControlKind, prompt: impl Into<String>) -> Self {
        Self {
            id: format!("req-{}", Uuid::new_v4()),
            kind,
            prompt: prompt.into(),
            options: Vec::new(),
            default: None,
            timeout_secs: None,
            context: None,
            sync_behavior: None,
        }
    }

    /// Ask the user for free-form text.
    pub fn user_input(prompt: impl Into<String>) -> Self {
        Self::new(ControlKind::UserInput, prompt)
    }

    /// Ask for a yes/no approval.
    pub fn confirmation(prompt: impl Into<String>) -> Self {
        Self::new(ControlKind::Confirmation, prompt)
    }

    /// Escalate a query to a parent agent.
    pub fn sub_agent_query(prompt: impl Into<String>) -> Self {
        Self::new(ControlKind::SubAgentQuery, prompt)
    }

    /// Constrain the answer to a fixed set of options.
    pub fn with_options(mut self, options: Vec<String>) -> Self {
        self.options = options;
        self
    }

    /// Declare a default value for sync-mode resolution.
    pub fn with_default(mut self, value: serde_json::Value) -> Self {
        self.default = Some(value);
        self
    }

    /// Set a timeout hint, in seconds.
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    /// Attach free-form context for whoever answers.
    pub fn with_context(mut self, context: serde_json::Value) -> Self {
        self.context = Some(context);
        self
    }

    /// Set the non-interactive resolution policy.
    pub fn with_sync_behavior(mut self, behavior: SyncBehavior) -> Self {
        self.sync_behavior = Some(behavior);
        self
    }
}

/// The answer to a [`ControlRequest`].
///
/// At most one response is ever accepted per request id; the suspension
/// channel clears the pending request once a matching response resumes it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlResponse {
    /// Id of the request this answers.
    pub request_id: String,

    /// Whether the external party approved the request.
    pub approved: bool,

    /// The supplied value, if any. `None` reads as nil at the call site.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,
}

impl ControlResponse {
    /// An affirmative response.
    pub fn approve(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            approved: true,
            value: Some(serde_json::Value::Bool(true)),
        }
    }

    /// A negative response.
    pub fn deny(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            approved: false,
            value: Some(serde_json::Value::Bool(false)),
        }
    }

    /// An approved response carrying a value.
    pub fn answer(request_id: impl Into<String>, value: serde_json::Value) -> Self {
        Self {
            request_id: request_id.into(),
            approved: true,
            value: Some(value),
        }
    }

    /// A response with no value, produced by `SyncBehavior::Skip`.
    pub fn skip(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            approved: false,
            value: None,
        }
    }
}
