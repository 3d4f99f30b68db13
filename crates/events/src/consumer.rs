//! Event consumer — typed, ordered handler dispatch with isolation.
//!
//! Handlers are keyed by [`EventKind`] (or registered for every kind) with
//! an optional filter predicate. `consume` invokes every matching handler
//! in registration order; a panicking handler is logged and skipped, never
//! aborting dispatch or reaching the caller.

use agentloom_core::event::{EventKind, RuntimeEvent};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::RwLock;
use tracing::error;

type HandlerFn = Box<dyn Fn(&RuntimeEvent) -> serde_json::Value + Send + Sync>;
type FilterFn = Box<dyn Fn(&RuntimeEvent) -> bool + Send + Sync>;

enum EventKey {
    Kind(EventKind),
    Any,
}

struct Registration {
    key: EventKey,
    filter: Option<FilterFn>,
    handler: HandlerFn,
}

impl Registration {
    fn matches(&self, event: &RuntimeEvent) -> bool {
        let key_matches = match &self.key {
            EventKey::Kind(kind) => *kind == event.kind(),
            EventKey::Any => true,
        };
        key_matches && self.filter.as_ref().is_none_or(|f| f(event))
    }
}

/// An ordered set of event handlers.
#[derive(Default)]
pub struct EventConsumer {
    registrations: RwLock<Vec<Registration>>,
}

impl EventConsumer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for one event kind.
    pub fn on(
        &self,
        kind: EventKind,
        handler: impl Fn(&RuntimeEvent) -> serde_json::Value + Send + Sync + 'static,
    ) {
        self.register(EventKey::Kind(kind), None, Box::new(handler));
    }

    /// Register a handler for one event kind with a filter predicate.
    pub fn on_filtered(
        &self,
        kind: EventKind,
        filter: impl Fn(&RuntimeEvent) -> bool + Send + Sync + 'static,
        handler: impl Fn(&RuntimeEvent) -> serde_json::Value + Send + Sync + 'static,
    ) {
        self.register(EventKey::Kind(kind), Some(Box::new(filter)), Box::new(handler));
    }

    /// Register a handler for every event kind.
    pub fn on_any(
        &self,
        handler: impl Fn(&RuntimeEvent) -> serde_json::Value + Send + Sync + 'static,
    ) {
        self.register(EventKey::Any, None, Box::new(handler));
    }

    fn register(&self, key: EventKey, filter: Option<FilterFn>, handler: HandlerFn) {
        self.registrations.write().unwrap().push(Registration {
            key,
            filter,
            handler,
        });
    }

    /// Number of registered handlers.
    pub fn handler_count(&self) -> usize {
        self.registrations.read().unwrap().len()
    }

    /// Invoke every matching handler in registration order and collect the
    /// successful results. A handler that panics is logged and skipped.
    pub fn consume(&self, event: &RuntimeEvent) -> Vec<serde_json::Value> {
        let registrations = self.registrations.read().unwrap();
        let mut results = Vec::new();
        for (index, registration) in registrations.iter().enumerate() {
            if !registration.matches(event) {
                continue;
            }
            match catch_unwind(AssertUnwindSafe(|| (registration.handler)(event))) {
                Ok(value) => results.push(value),
                Err(_) => {
                    error!(
                        handler_index = index,
                        kind = ?event.kind(),
                        event_id = %event.id,
                        "event handler panicked"
                    );
                }
            }
        }
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentloom_core::event::EventPayload;

    fn step_completed(step_number: usize) -> RuntimeEvent {
        RuntimeEvent::new(EventPayload::StepCompleted {
            step_number,
            is_final_answer: false,
            duration_ms: 10,
        })
    }

    #[test]
    fn handlers_dispatch_by_kind() {
        let consumer = EventConsumer::new();
        consumer.on(EventKind::StepCompleted, |_| serde_json::json!("step"));
        consumer.on(EventKind::RunCompleted, |_| serde_json::json!("run"));

        let results = consumer.consume(&step_completed(0));
        assert_eq!(results, vec![serde_json::json!("step")]);
    }

    #[test]
    fn handlers_run_in_registration_order() {
        let consumer = EventConsumer::new();
        consumer.on(EventKind::StepCompleted, |_| serde_json::json!(1));
        consumer.on_any(|_| serde_json::json!(2));
        consumer.on(EventKind::StepCompleted, |_| serde_json::json!(3));

        let results = consumer.consume(&step_completed(0));
        assert_eq!(
            results,
            vec![serde_json::json!(1), serde_json::json!(2), serde_json::json!(3)]
        );
    }

    #[test]
    fn filter_predicate_gates_dispatch() {
        let consumer = EventConsumer::new();
        consumer.on_filtered(
            EventKind::StepCompleted,
            |event| {
                matches!(
                    event.payload,
                    EventPayload::StepCompleted { step_number, .. } if step_number > 2
                )
            },
            |_| serde_json::json!("late step"),
        );

        assert!(consumer.consume(&step_completed(1)).is_empty());
        assert_eq!(consumer.consume(&step_completed(3)).len(), 1);
    }

    #[test]
    fn panicking_handler_does_not_abort_dispatch() {
        let consumer = EventConsumer::new();
        consumer.on(EventKind::StepCompleted, |_| panic!("bad handler"));
        consumer.on(EventKind::StepCompleted, |_| serde_json::json!("survivor"));

        let results = consumer.consume(&step_completed(0));
        assert_eq!(results, vec![serde_json::json!("survivor")]);
    }

    #[test]
    fn no_handlers_yields_no_results() {
        let consumer = EventConsumer::new();
        assert!(consumer.consume(&step_completed(0)).is_empty());
        assert_eq!(consumer.handler_count(), 0);
    }
}
