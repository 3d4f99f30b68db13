//! The step scheduler — drives one run of step logic through the
//! suspension channel, in three consumption modes.
//!
//! The scheduler owns the loop mechanics (step numbering, the step limit,
//! memory appends, event emission, terminal-result assembly); the actual
//! reasoning lives behind [`StepExecutor`], supplied by the enclosing
//! agent. Every mode spawns the same drive coroutine and differs only in
//! how the resulting [`RunHandle`] is consumed:
//!
//! - `run` resumes to completion, auto-resolving control requests by their
//!   declared sync policy.
//! - `run_stream` forwards completed steps into a bounded channel,
//!   auto-approving control requests.
//! - `run_interactive` hands the [`RunHandle`] to the caller.

use crate::config::RunConfig;
use crate::protocol::resolve_sync;
use crate::suspend::{RunHandle, SuspensionChannel, SuspensionPort, YieldPoint};
use agentloom_core::control::ControlResponse;
use agentloom_core::error::{ControlFlowError, Error};
use agentloom_core::event::{EventPayload, RuntimeEvent};
use agentloom_core::memory::{RunMemory, StepHistory};
use agentloom_core::result::{RunOutcome, RunResult, RunTiming};
use agentloom_core::step::{ActionStep, TokenUsage};
use agentloom_events::EventEmitter;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, warn};
use uuid::Uuid;

/// Per-run mutable state threaded through the step loop.
pub struct RunContext {
    /// The task the run is working on.
    pub task: String,
    /// Number of the step about to execute (0-based, gapless).
    pub step_number: usize,
    /// Append-only step history.
    pub memory: Box<dyn RunMemory>,
    /// Aggregate token usage so far.
    pub usage: TokenUsage,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// Trace id stamped on every step of this run.
    pub trace_id: Uuid,
}

impl RunContext {
    pub fn new(task: impl Into<String>) -> Self {
        Self {
            task: task.into(),
            step_number: 0,
            memory: Box::new(StepHistory::new()),
            usage: TokenUsage::default(),
            started_at: Utc::now(),
            trace_id: Uuid::new_v4(),
        }
    }

    /// Replace the default in-memory history.
    pub fn with_memory(mut self, memory: Box<dyn RunMemory>) -> Self {
        self.memory = memory;
        self
    }
}

/// One iteration of agent reasoning.
///
/// `execute_step` builds and returns the step record for
/// `ctx.step_number`; it may suspend mid-step through the port's control
/// primitives. The scheduler appends the returned step to memory and
/// advances the counter. An `Err` terminates the run.
#[async_trait]
pub trait StepExecutor: Send + Sync + 'static {
    async fn execute_step(
        &self,
        ctx: &mut RunContext,
        port: &SuspensionPort,
    ) -> Result<ActionStep, Error>;

    /// Release per-run resources. Called exactly once per run, on every
    /// termination path including abandonment.
    async fn cleanup(&self) {}
}

/// Drives runs of a [`StepExecutor`].
pub struct StepScheduler<E> {
    executor: Arc<E>,
    config: RunConfig,
    emitter: Arc<EventEmitter>,
}

impl<E: StepExecutor> StepScheduler<E> {
    pub fn new(executor: E, emitter: Arc<EventEmitter>) -> Self {
        Self {
            executor: Arc::new(executor),
            config: RunConfig::default(),
            emitter,
        }
    }

    pub fn with_config(mut self, config: RunConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.config.max_steps = max_steps;
        self
    }

    /// Run to completion synchronously.
    ///
    /// Control requests are auto-resolved by their declared sync policy;
    /// a request with no usable policy fails the call.
    pub async fn run(&self, task: impl Into<String>) -> Result<RunResult, Error> {
        let mut handle = self.run_interactive(task);
        let mut next: Option<ControlResponse> = None;
        loop {
            let point = match next.take() {
                Some(response) => handle.resume_with(response).await?,
                None => handle.resume().await?,
            };
            match point {
                YieldPoint::Step(_) => {}
                YieldPoint::Control(request) => {
                    next = Some(resolve_sync(&request)?);
                }
                YieldPoint::Done(result) => return Ok(result),
            }
        }
    }

    /// Run in streaming mode: completed steps (the final one included)
    /// arrive on the returned stream as they happen. Control requests are
    /// auto-approved. The stream ends when the run does; dropping it
    /// abandons the run.
    pub fn run_stream(&self, task: impl Into<String>) -> ReceiverStream<ActionStep> {
        let (tx, rx) = mpsc::channel(self.config.stream_buffer);
        let mut handle = self.run_interactive(task);
        tokio::spawn(async move {
            let mut next: Option<ControlResponse> = None;
            loop {
                let point = match next.take() {
                    Some(response) => handle.resume_with(response).await,
                    None => handle.resume().await,
                };
                match point {
                    Ok(YieldPoint::Step(step)) => {
                        if tx.send(step).await.is_err() {
                            break;
                        }
                    }
                    Ok(YieldPoint::Control(request)) => {
                        next = Some(ControlResponse::approve(&request.id));
                    }
                    Ok(YieldPoint::Done(_)) | Err(_) => break,
                }
            }
        });
        ReceiverStream::new(rx)
    }

    /// Run in interactive mode: the caller drives the run one resume at a
    /// time through the returned handle, answering control requests
    /// itself. Dropping the handle abandons the run.
    pub fn run_interactive(&self, task: impl Into<String>) -> RunHandle {
        self.resume_interactive(RunContext::new(task))
    }

    /// Start driving an existing context, for continuing a run whose state
    /// was built elsewhere.
    pub fn resume_interactive(&self, ctx: RunContext) -> RunHandle {
        let (handle, port) = SuspensionChannel::new(self.emitter.clone());
        let executor = self.executor.clone();
        let max_steps = self.config.max_steps;
        tokio::spawn(drive(executor, max_steps, ctx, port));
        handle
    }
}

/// The run coroutine. Parks on the port before the first step and after
/// every yielded step, so the run advances only under the driver's resumes.
async fn drive<E: StepExecutor>(
    executor: Arc<E>,
    max_steps: usize,
    mut ctx: RunContext,
    port: SuspensionPort,
) {
    if port.await_start().await.is_err() {
        // Abandoned before it ever ran.
        executor.cleanup().await;
        return;
    }

    let emitter = port.emitter().clone();
    emitter.emit(RuntimeEvent::new(EventPayload::RunStarted {
        task: ctx.task.clone(),
        trace_id: ctx.trace_id,
    }));

    let mut failure: Option<String> = None;
    let outcome = loop {
        if ctx.step_number >= max_steps {
            debug!(trace_id = %ctx.trace_id, max_steps, "step limit reached");
            break RunOutcome::MaxStepsReached;
        }

        emitter.emit(RuntimeEvent::new(EventPayload::StepStarted {
            step_number: ctx.step_number,
        }));

        match executor.execute_step(&mut ctx, &port).await {
            Ok(step) => {
                ctx.usage.absorb(&step.token_usage);
                emitter.emit(RuntimeEvent::new(EventPayload::StepCompleted {
                    step_number: step.step_number,
                    is_final_answer: step.is_final_answer,
                    duration_ms: step.timing.duration_ms(),
                }));
                let is_final = step.is_final_answer;
                ctx.memory.append(step.clone());
                ctx.step_number += 1;

                if port.yield_step(step).await.is_err() {
                    // Driver dropped the handle mid-run.
                    executor.cleanup().await;
                    return;
                }
                if is_final {
                    break RunOutcome::Success;
                }
            }
            Err(Error::ControlFlow(ControlFlowError::ChannelClosed)) => {
                // The driver dropped the handle while the step was
                // suspended on a control request.
                executor.cleanup().await;
                return;
            }
            Err(error) => {
                warn!(
                    trace_id = %ctx.trace_id,
                    step_number = ctx.step_number,
                    %error,
                    "step failed"
                );
                emitter.emit(RuntimeEvent::new(EventPayload::StepFailed {
                    step_number: ctx.step_number,
                    message: error.to_string(),
                }));
                failure = Some(error.to_string());
                break RunOutcome::Error;
            }
        }
    };

    executor.cleanup().await;

    let output = match outcome {
        RunOutcome::Success => ctx.memory.steps().last().and_then(|step| {
            step.action_output
                .clone()
                .or_else(|| step.model_output.clone().map(serde_json::Value::String))
        }),
        RunOutcome::Error => failure.map(serde_json::Value::String),
        RunOutcome::MaxStepsReached => None,
    };
    let result = RunResult {
        output,
        state: outcome,
        steps: ctx.memory.steps().to_vec(),
        token_usage: ctx.usage,
        timing: RunTiming {
            started_at: ctx.started_at,
            ended_at: Utc::now(),
        },
    };

    emitter.emit(RuntimeEvent::new(EventPayload::RunCompleted {
        state: outcome,
        steps: result.steps.len(),
        total_tokens: result.token_usage.total(),
    }));
    let _ = port.finish(result).await;
}
