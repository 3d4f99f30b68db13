//! Background dispatch queue — runs (event, handler) pairs on a single
//! worker thread so emitters never block on their observers.
//!
//! Lifecycle: the worker starts lazily on the first `push` (or explicitly
//! via `start`), drains on demand, and stops on `shutdown`. All state is
//! guarded by one mutex; one condition variable serves both the worker's
//! wake-up and `drain`'s completion signal, so draining never polls.

use agentloom_core::event::RuntimeEvent;
use std::collections::VecDeque;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::{debug, error};

type DispatchHandler = Box<dyn FnOnce(&RuntimeEvent) + Send + 'static>;

/// A single-worker asynchronous dispatch queue.
///
/// Cheap to clone; clones share the same queue and worker. Inject it where
/// needed instead of reaching for a global.
#[derive(Clone)]
pub struct AsyncDispatchQueue {
    inner: Arc<Inner>,
}

struct Inner {
    state: Mutex<State>,
    signal: Condvar,
}

struct State {
    queue: VecDeque<(RuntimeEvent, DispatchHandler)>,
    worker: Option<JoinHandle<()>>,
    running: bool,
    stop: bool,
    in_flight: bool,
}

impl AsyncDispatchQueue {
    /// Create a queue with no worker yet; the worker starts on first use.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(State {
                    queue: VecDeque::new(),
                    worker: None,
                    running: false,
                    stop: false,
                    in_flight: false,
                }),
                signal: Condvar::new(),
            }),
        }
    }

    /// Start the worker thread. Idempotent: concurrent calls converge on
    /// one worker.
    pub fn start(&self) {
        let mut state = self.inner.state.lock().unwrap();
        self.ensure_worker(&mut state);
    }

    /// Enqueue an (event, handler) pair, auto-starting the worker.
    ///
    /// FIFO per caller; handlers run one at a time on the worker thread.
    pub fn push(&self, event: RuntimeEvent, handler: impl FnOnce(&RuntimeEvent) + Send + 'static) {
        let mut state = self.inner.state.lock().unwrap();
        state.queue.push_back((event, Box::new(handler)));
        self.ensure_worker(&mut state);
        self.inner.signal.notify_all();
    }

    /// Block until the queue is empty and no handler is mid-execution.
    ///
    /// Returns true iff pending work reached zero within `timeout`.
    pub fn drain(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut state = self.inner.state.lock().unwrap();
        while !state.queue.is_empty() || state.in_flight {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            let (guard, _) = self
                .inner
                .signal
                .wait_timeout(state, deadline - now)
                .unwrap();
            state = guard;
        }
        true
    }

    /// Drain outstanding work, then stop and join the worker.
    ///
    /// Safe to call when already stopped, or repeatedly. Returns the drain
    /// result; even on a drain timeout the worker finishes its remaining
    /// queue before exiting.
    pub fn shutdown(&self, timeout: Duration) -> bool {
        let drained = self.drain(timeout);
        let worker = {
            let mut state = self.inner.state.lock().unwrap();
            state.stop = true;
            self.inner.signal.notify_all();
            state.worker.take()
        };
        if let Some(handle) = worker {
            let _ = handle.join();
        }
        drained
    }

    /// Whether the worker thread is alive.
    pub fn running(&self) -> bool {
        self.inner.state.lock().unwrap().running
    }

    /// Point-in-time pending work count, including any handler currently
    /// executing.
    pub fn pending_count(&self) -> usize {
        let state = self.inner.state.lock().unwrap();
        state.queue.len() + usize::from(state.in_flight)
    }

    fn ensure_worker(&self, state: &mut State) {
        if state.running {
            return;
        }
        state.running = true;
        state.stop = false;
        let inner = self.inner.clone();
        debug!("starting dispatch worker");
        state.worker = Some(std::thread::spawn(move || worker_loop(inner)));
    }
}

impl Default for AsyncDispatchQueue {
    fn default() -> Self {
        Self::new()
    }
}

fn worker_loop(inner: Arc<Inner>) {
    let mut state = inner.state.lock().unwrap();
    loop {
        while state.queue.is_empty() && !state.stop {
            state = inner.signal.wait(state).unwrap();
        }
        if state.stop && state.queue.is_empty() {
            state.running = false;
            inner.signal.notify_all();
            return;
        }

        let (event, handler) = state.queue.pop_front().unwrap();
        state.in_flight = true;
        drop(state);

        // Handler failures are isolated: logged, never fatal to the worker.
        if catch_unwind(AssertUnwindSafe(|| handler(&event))).is_err() {
            error!(event_id = %event.id, kind = ?event.kind(), "dispatch handler panicked");
        }

        state = inner.state.lock().unwrap();
        state.in_flight = false;
        inner.signal.notify_all();
    }
}
