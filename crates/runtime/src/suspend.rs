//! The suspension channel — a channel-based coroutine handshake.
//!
//! One run of agent reasoning executes inside a spawned task (the
//! coroutine). Its driver holds a [`RunHandle`]; the coroutine holds the
//! matching [`SuspensionPort`]. Two capacity-1 channels connect them:
//! resume signals flow in, yields flow out. Each resume produces exactly
//! one yield:
//!
//! - `Step` — an iteration completed; resume with no argument to continue.
//! - `Control` — the run wants external input; resume with a
//!   [`ControlResponse`] carrying the matching request id.
//! - `Done` — the terminal [`RunResult`]; the channel is spent.
//!
//! The coroutine parks between yields, so the run advances only when the
//! driver resumes it. Dropping the handle abandons the run: the coroutine
//! observes the closed channel at its next suspension point and unwinds
//! through its cleanup path.

use agentloom_core::control::{ControlRequest, ControlResponse};
use agentloom_core::error::{ControlFlowError, Error};
use agentloom_core::event::{EventPayload, RuntimeEvent};
use agentloom_core::result::{RunOutcome, RunResult};
use agentloom_core::step::ActionStep;
use agentloom_events::EventEmitter;
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};

/// One value handed to the driver per resume.
#[derive(Debug)]
pub enum YieldPoint {
    /// A completed step.
    Step(ActionStep),
    /// The run is suspended awaiting a response to this request.
    Control(ControlRequest),
    /// The run's terminal record.
    Done(RunResult),
}

/// Driver-visible lifecycle of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunState {
    /// Created, not yet resumed.
    Idle,
    /// Between resume and yield.
    Running,
    /// Parked on a control request with this id.
    Suspended(String),
    /// Terminal.
    Completed(RunOutcome),
}

/// The resume argument: `None` after a step yield (or to start the run),
/// `Some(response)` after a control yield.
type ResumeArg = Option<ControlResponse>;

/// Builder for the handle/port pair.
pub struct SuspensionChannel;

impl SuspensionChannel {
    /// Create a connected handle/port pair. Control events raised through
    /// the port are emitted synchronously on `emitter`.
    pub fn new(emitter: Arc<EventEmitter>) -> (RunHandle, SuspensionPort) {
        let (yield_tx, yield_rx) = mpsc::channel(1);
        let (resume_tx, resume_rx) = mpsc::channel(1);
        (
            RunHandle {
                yields: yield_rx,
                resumes: resume_tx,
                pending: None,
                state: RunState::Idle,
            },
            SuspensionPort {
                inner: Some(PortInner {
                    yields: yield_tx,
                    resumes: Mutex::new(resume_rx),
                }),
                emitter,
            },
        )
    }
}

/// The driver side of a suspended run.
pub struct RunHandle {
    yields: mpsc::Receiver<YieldPoint>,
    resumes: mpsc::Sender<ResumeArg>,
    pending: Option<String>,
    state: RunState,
}

impl RunHandle {
    /// Current lifecycle state.
    pub fn state(&self) -> &RunState {
        &self.state
    }

    /// Id of the pending control request, if the run is suspended on one.
    pub fn pending_request(&self) -> Option<&str> {
        self.pending.as_deref()
    }

    /// Start the run, or resume it after a step yield.
    ///
    /// Rejected while a control request is pending: that request needs a
    /// response first.
    pub async fn resume(&mut self) -> Result<YieldPoint, Error> {
        if let Some(request_id) = &self.pending {
            return Err(ControlFlowError::ResponseRequired {
                request_id: request_id.clone(),
            }
            .into());
        }
        self.advance(None).await
    }

    /// Resume the pending control request with its response.
    ///
    /// The response's `request_id` must match the pending request exactly;
    /// a mismatch is rejected and the request stays answerable.
    pub async fn resume_with(&mut self, response: ControlResponse) -> Result<YieldPoint, Error> {
        match &self.pending {
            Some(expected) if *expected == response.request_id => {}
            Some(expected) => {
                return Err(ControlFlowError::MismatchedResponse {
                    expected: expected.clone(),
                    got: response.request_id,
                }
                .into());
            }
            None => return Err(ControlFlowError::NoPendingRequest.into()),
        }
        self.advance(Some(response)).await
    }

    async fn advance(&mut self, arg: ResumeArg) -> Result<YieldPoint, Error> {
        self.resumes
            .send(arg)
            .await
            .map_err(|_| ControlFlowError::ChannelClosed)?;
        self.pending = None;
        self.state = RunState::Running;

        let point = self
            .yields
            .recv()
            .await
            .ok_or(ControlFlowError::ChannelClosed)?;
        match &point {
            YieldPoint::Step(_) => {}
            YieldPoint::Control(request) => {
                self.pending = Some(request.id.clone());
                self.state = RunState::Suspended(request.id.clone());
            }
            YieldPoint::Done(result) => {
                self.state = RunState::Completed(result.state);
            }
        }
        Ok(point)
    }
}

/// The coroutine side of the channel.
///
/// The scheduler's drive loop yields steps and the terminal result through
/// it; step logic calls the control primitives (`request_input`,
/// `request_confirmation`, `escalate_query` — see the `protocol` module)
/// which suspend through it.
pub struct SuspensionPort {
    inner: Option<PortInner>,
    emitter: Arc<EventEmitter>,
}

struct PortInner {
    yields: mpsc::Sender<YieldPoint>,
    resumes: Mutex<mpsc::Receiver<ResumeArg>>,
}

impl SuspensionPort {
    /// A port connected to nothing. Control primitives on it fail with
    /// `ControlFlowError::OutsideRun`, the contract for step logic invoked
    /// outside an active run.
    pub fn detached(emitter: Arc<EventEmitter>) -> Self {
        Self {
            inner: None,
            emitter,
        }
    }

    pub(crate) fn emitter(&self) -> &Arc<EventEmitter> {
        &self.emitter
    }

    fn inner(&self) -> Result<&PortInner, ControlFlowError> {
        self.inner.as_ref().ok_or(ControlFlowError::OutsideRun)
    }

    /// Park until the driver's first resume.
    pub(crate) async fn await_start(&self) -> Result<(), ControlFlowError> {
        let inner = self.inner()?;
        let mut resumes = inner.resumes.lock().await;
        match resumes.recv().await {
            Some(None) => Ok(()),
            Some(Some(_)) => Err(ControlFlowError::UnexpectedResponse),
            None => Err(ControlFlowError::ChannelClosed),
        }
    }

    /// Yield a completed step and park until the driver resumes.
    pub(crate) async fn yield_step(&self, step: ActionStep) -> Result<(), ControlFlowError> {
        let inner = self.inner()?;
        inner
            .yields
            .send(YieldPoint::Step(step))
            .await
            .map_err(|_| ControlFlowError::ChannelClosed)?;
        let mut resumes = inner.resumes.lock().await;
        match resumes.recv().await {
            Some(None) => Ok(()),
            Some(Some(_)) => Err(ControlFlowError::UnexpectedResponse),
            None => Err(ControlFlowError::ChannelClosed),
        }
    }

    /// Yield the terminal result. The channel is spent afterwards.
    pub(crate) async fn finish(&self, result: RunResult) -> Result<(), ControlFlowError> {
        let inner = self.inner()?;
        inner
            .yields
            .send(YieldPoint::Done(result))
            .await
            .map_err(|_| ControlFlowError::ChannelClosed)
    }

    /// Yield a control request and park until a matching response arrives.
    ///
    /// Emits `ControlYielded` synchronously before suspending (so observers
    /// see the request before anything else happens) and `ControlResumed`
    /// after the response is accepted.
    pub async fn suspend(&self, request: ControlRequest) -> Result<ControlResponse, ControlFlowError> {
        let inner = self.inner()?;
        let request_id = request.id.clone();
        let kind = request.kind;

        self.emitter.emit_sync(&RuntimeEvent::new(EventPayload::ControlYielded {
            request_id: request_id.clone(),
            kind,
        }));

        inner
            .yields
            .send(YieldPoint::Control(request))
            .await
            .map_err(|_| ControlFlowError::ChannelClosed)?;

        let response = {
            let mut resumes = inner.resumes.lock().await;
            match resumes.recv().await {
                Some(Some(response)) => response,
                Some(None) => return Err(ControlFlowError::UnexpectedResponse),
                None => return Err(ControlFlowError::ChannelClosed),
            }
        };

        // The driver already rejects mismatches; this guards direct users
        // of the channel.
        if response.request_id != request_id {
            return Err(ControlFlowError::MismatchedResponse {
                expected: request_id,
                got: response.request_id,
            });
        }

        self.emitter.emit_sync(&RuntimeEvent::new(EventPayload::ControlResumed {
            request_id,
            approved: response.approved,
        }));
        Ok(response)
    }
}
