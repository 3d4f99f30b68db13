//! # Agentloom Events
//!
//! The two event-delivery primitives of the execution core, plus the
//! emitter/consumer pair built on them:
//!
//! - [`AsyncDispatchQueue`] — a single-worker background queue that runs
//!   (event, handler) pairs off the calling thread, with race-free
//!   drain/shutdown.
//! - [`PriorityEventQueue`] — a bounded, priority- and due-time-ordered
//!   mailbox for scheduled/deferred events.
//! - [`EventEmitter`] / [`EventConsumer`] — in-process pub/sub with typed
//!   subscription, filtering, and handler isolation.

pub mod consumer;
pub mod dispatch;
pub mod emitter;
pub mod priority;

pub use consumer::EventConsumer;
pub use dispatch::AsyncDispatchQueue;
pub use emitter::EventEmitter;
pub use priority::{EventPriority, PriorityEventQueue, QueueEntry, QueueStats};
