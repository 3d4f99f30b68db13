//! # Agentloom Core
//!
//! Domain types, traits, and error definitions for the agentloom execution
//! runtime. This crate defines the value types that cross the suspension
//! boundary — action steps, control requests/responses, run results, and
//! runtime events — plus the collaborator traits (model, run memory) that
//! the scheduler consumes but never implements.
//!
//! ## Design Philosophy
//!
//! Everything here is either an immutable value type or a trait. The
//! concurrency machinery (scheduler, suspension channel, event queues)
//! lives in the `agentloom-runtime` and `agentloom-events` crates and
//! depends inward on this one.

pub mod control;
pub mod error;
pub mod event;
pub mod memory;
pub mod model;
pub mod result;
pub mod step;

// Re-export key types at crate root for ergonomics
pub use control::{ControlKind, ControlRequest, ControlResponse, SyncBehavior};
pub use error::{ControlFlowError, Error, QueueError, Result};
pub use event::{EventKind, EventPayload, RuntimeEvent};
pub use memory::{RunMemory, StepHistory};
pub use model::{Model, ModelMessage, ModelOutput, Role};
pub use result::{RunOutcome, RunResult, RunTiming};
pub use step::{ActionStep, ActionStepBuilder, StepTiming, TokenUsage, ToolInvocation};
