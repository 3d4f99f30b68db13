//! The model collaborator trait and its message types.
//!
//! The scheduler never calls a model itself; step logic supplied by the
//! enclosing agent does. The trait exists so that step executors can be
//! tested against mocks.

use crate::error::Error;
use crate::step::{TokenUsage, ToolInvocation};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// One message in a model conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMessage {
    pub role: Role,
    pub content: String,
}

impl ModelMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    pub fn tool(content: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: content.into(),
        }
    }
}

/// One model generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelOutput {
    /// Generated text.
    pub content: String,

    /// Tool calls the model wants executed.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolInvocation>,

    /// Token usage, when the backend reports it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<TokenUsage>,
}

/// A text-generation backend.
#[async_trait]
pub trait Model: Send + Sync {
    /// Backend name, for logging.
    fn name(&self) -> &str;

    /// Generate a completion for the rendered conversation.
    async fn generate(&self, messages: Vec<ModelMessage>) -> Result<ModelOutput, Error>;
}
