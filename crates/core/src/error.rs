//! Error types for the agentloom domain.
//!
//! Uses `thiserror` for ergonomic error definitions. Each bounded context
//! has its own error variant; concurrency-protocol failures get their own
//! sub-enum so callers can match on them precisely.

use crate::control::ControlKind;
use thiserror::Error;

/// The top-level error type for all agentloom operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Suspension / control protocol errors ---
    #[error("Control flow error: {0}")]
    ControlFlow(#[from] ControlFlowError),

    // --- Priority queue errors ---
    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),

    // --- Model invocation errors (opaque to the scheduler) ---
    #[error("Model error: {0}")]
    Model(String),

    // --- Step execution errors ---
    #[error("Step execution failed: {0}")]
    Step(String),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Failures of the three-way yield/resume protocol.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ControlFlowError {
    #[error("control primitive invoked outside an active run")]
    OutsideRun,

    #[error("run abandoned: suspension channel closed")]
    ChannelClosed,

    #[error("request {request_id} is pending; resume with a matching response")]
    ResponseRequired { request_id: String },

    #[error("no control request is pending, resume without a response")]
    NoPendingRequest,

    #[error("response targets request {got}, but request {expected} is pending")]
    MismatchedResponse { expected: String, got: String },

    #[error("received a response where none was expected")]
    UnexpectedResponse,

    #[error("cannot auto-resolve {kind} request {request_id}: {reason}")]
    Unresolvable {
        kind: ControlKind,
        request_id: String,
        reason: String,
    },
}

/// Failures of the bounded priority event queue.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueueError {
    #[error("priority queue at capacity ({max_depth}), event rejected")]
    Full { max_depth: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn control_flow_error_displays_request_id() {
        let err = Error::ControlFlow(ControlFlowError::MismatchedResponse {
            expected: "req-1".into(),
            got: "req-2".into(),
        });
        assert!(err.to_string().contains("req-1"));
        assert!(err.to_string().contains("req-2"));
    }

    #[test]
    fn unresolvable_names_the_request_kind() {
        let err = ControlFlowError::Unresolvable {
            kind: ControlKind::Confirmation,
            request_id: "req-9".into(),
            reason: "no sync behavior declared".into(),
        };
        assert!(err.to_string().contains("confirmation"));
        assert!(err.to_string().contains("no sync behavior"));
    }

    #[test]
    fn queue_full_displays_capacity() {
        let err = Error::Queue(QueueError::Full { max_depth: 100 });
        assert!(err.to_string().contains("100"));
    }
}
