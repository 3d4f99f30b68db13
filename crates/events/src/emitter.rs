//! Event emitter — the producer side of the in-process pub/sub pair.
//!
//! `emit` is fire-and-forget: delivery happens on the dispatch queue's
//! worker thread, so emitters never block on observers. `emit_sync`
//! bypasses the worker and delivers in-thread, for call sites where
//! ordering relative to the caller's next action matters (acknowledging a
//! control yield before the coroutine advances, for example).

use crate::consumer::EventConsumer;
use crate::dispatch::AsyncDispatchQueue;
use agentloom_core::event::RuntimeEvent;
use std::sync::{Arc, RwLock};

/// Emits runtime events toward a connected [`EventConsumer`].
pub struct EventEmitter {
    consumer: RwLock<Option<Arc<EventConsumer>>>,
    dispatch: AsyncDispatchQueue,
}

impl EventEmitter {
    /// Create an emitter delivering through the given dispatch queue.
    pub fn new(dispatch: AsyncDispatchQueue) -> Self {
        Self {
            consumer: RwLock::new(None),
            dispatch,
        }
    }

    /// Bind the delivery target. Replaces any previous consumer.
    pub fn connect(&self, consumer: Arc<EventConsumer>) {
        *self.consumer.write().unwrap() = Some(consumer);
    }

    /// Deliver asynchronously via the dispatch worker. No-op when nothing
    /// is connected or the consumer has no handlers.
    pub fn emit(&self, event: RuntimeEvent) {
        let Some(consumer) = self.consumer.read().unwrap().clone() else {
            return;
        };
        if consumer.handler_count() == 0 {
            return;
        }
        self.dispatch.push(event, move |e| {
            consumer.consume(e);
        });
    }

    /// Deliver immediately, in-thread, returning the handlers' results.
    pub fn emit_sync(&self, event: &RuntimeEvent) -> Vec<serde_json::Value> {
        match self.consumer.read().unwrap().clone() {
            Some(consumer) => consumer.consume(event),
            None => Vec::new(),
        }
    }

    /// The dispatch queue this emitter delivers through.
    pub fn dispatch(&self) -> &AsyncDispatchQueue {
        &self.dispatch
    }
}

impl Default for EventEmitter {
    fn default() -> Self {
        Self::new(AsyncDispatchQueue::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentloom_core::event::{EventKind, EventPayload};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn step_event(step_number: usize) -> RuntimeEvent {
        RuntimeEvent::new(EventPayload::StepStarted { step_number })
    }

    #[test]
    fn emit_without_consumer_is_noop() {
        let emitter = EventEmitter::default();
        emitter.emit(step_event(0));
        // Nothing was enqueued, so the worker never started.
        assert!(!emitter.dispatch().running());
    }

    #[test]
    fn emit_delivers_through_worker() {
        let emitter = EventEmitter::default();
        let consumer = Arc::new(EventConsumer::new());
        let counter = Arc::new(AtomicUsize::new(0));
        let c = counter.clone();
        consumer.on(EventKind::StepStarted, move |_| {
            c.fetch_add(1, Ordering::SeqCst);
            serde_json::Value::Null
        });
        emitter.connect(consumer);

        emitter.emit(step_event(0));
        emitter.emit(step_event(1));
        assert!(emitter.dispatch().drain(Duration::from_secs(1)));
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn emit_sync_delivers_in_thread() {
        let emitter = EventEmitter::default();
        let consumer = Arc::new(EventConsumer::new());
        consumer.on(EventKind::StepStarted, |_| serde_json::json!("seen"));
        emitter.connect(consumer);

        let results = emitter.emit_sync(&step_event(0));
        assert_eq!(results, vec![serde_json::json!("seen")]);
        // The async worker was never involved.
        assert!(!emitter.dispatch().running());
    }

    #[test]
    fn emit_with_handlerless_consumer_is_noop() {
        let emitter = EventEmitter::default();
        emitter.connect(Arc::new(EventConsumer::new()));
        emitter.emit(step_event(0));
        assert!(!emitter.dispatch().running());
    }
}
