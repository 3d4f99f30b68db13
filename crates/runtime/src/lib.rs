//! # Agentloom Runtime
//!
//! The step-scheduling state machine and the cooperative suspension
//! protocol that let one run of agent reasoning be paused for external
//! input and resumed deterministically.
//!
//! A run is a spawned coroutine task connected to its driver by a
//! [`SuspensionChannel`]: each resume produces exactly one yield — a
//! completed [`ActionStep`](agentloom_core::ActionStep), a
//! [`ControlRequest`](agentloom_core::ControlRequest) awaiting an answer,
//! or the terminal [`RunResult`](agentloom_core::RunResult). The
//! [`StepScheduler`] drives that coroutine in three consumption modes:
//! synchronous, streaming, and interactive.

pub mod config;
pub mod protocol;
pub mod scheduler;
pub mod suspend;

pub use config::RunConfig;
pub use protocol::resolve_sync;
pub use scheduler::{RunContext, StepExecutor, StepScheduler};
pub use suspend::{RunHandle, RunState, SuspensionChannel, SuspensionPort, YieldPoint};
