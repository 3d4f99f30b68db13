//! Bounded priority mailbox for scheduled/deferred events.
//!
//! Entries carry a priority class and an absolute due time. `pop_ready`
//! never returns an entry that is not yet due; pushing beyond `max_depth`
//! fails loudly instead of evicting. Every operation takes the internal
//! lock once and releases it before returning — no operation holds the
//! lock across another.

use agentloom_core::error::QueueError;
use agentloom_core::event::RuntimeEvent;
use chrono::{DateTime, Utc};
use std::sync::Mutex;
use std::time::Duration;

/// Priority class of a queued entry. `Error` outranks `Immediate`, which
/// outranks `Scheduled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventPriority {
    Error,
    Immediate,
    Scheduled,
}

impl EventPriority {
    fn rank(&self) -> u8 {
        match self {
            EventPriority::Error => 0,
            EventPriority::Immediate => 1,
            EventPriority::Scheduled => 2,
        }
    }
}

/// A queued event plus its scheduling metadata.
#[derive(Debug, Clone)]
pub struct QueueEntry {
    pub event: RuntimeEvent,
    pub priority: EventPriority,
    /// Absolute time after which the entry is deliverable. Inherited from
    /// the event's own due time, else the event's creation time.
    pub due_at: DateTime<Utc>,
    /// Insertion order, the final tie-breaker.
    seq: u64,
}

/// Point-in-time queue statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueStats {
    pub depth: usize,
    pub max_depth: usize,
    pub ready: usize,
    pub error: usize,
    pub immediate: usize,
    pub scheduled: usize,
}

/// A bounded, priority- and due-time-ordered event mailbox.
pub struct PriorityEventQueue {
    max_depth: usize,
    inner: Mutex<QueueInner>,
}

struct QueueInner {
    entries: Vec<QueueEntry>,
    next_seq: u64,
}

impl PriorityEventQueue {
    pub fn new(max_depth: usize) -> Self {
        Self {
            max_depth,
            inner: Mutex::new(QueueInner {
                entries: Vec::new(),
                next_seq: 0,
            }),
        }
    }

    /// Enqueue an event. Fails with `QueueError::Full` at capacity.
    pub fn push(&self, event: RuntimeEvent, priority: EventPriority) -> Result<(), QueueError> {
        let due_at = event.due_at().unwrap_or(event.created_at);
        let mut inner = self.inner.lock().unwrap();
        if inner.entries.len() >= self.max_depth {
            return Err(QueueError::Full {
                max_depth: self.max_depth,
            });
        }
        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.entries.push(QueueEntry {
            event,
            priority,
            due_at,
            seq,
        });
        Ok(())
    }

    /// Remove and return the best entry whose due time has passed, or
    /// `None` if nothing is ready. Non-blocking.
    ///
    /// Order: priority class, then earliest `due_at`, then insertion order.
    pub fn pop_ready(&self) -> Option<QueueEntry> {
        let now = Utc::now();
        let mut inner = self.inner.lock().unwrap();
        let index = inner
            .entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.due_at <= now)
            .min_by_key(|(_, e)| (e.priority.rank(), e.due_at, e.seq))
            .map(|(i, _)| i)?;
        Some(inner.entries.remove(index))
    }

    /// Pop up to `max` ready entries.
    pub fn drain(&self, max: usize) -> Vec<QueueEntry> {
        (0..max).map_while(|_| self.pop_ready()).collect()
    }

    /// Remove and return every entry whose due time is more than
    /// `threshold` in the past.
    pub fn cleanup_stale(&self, threshold: Duration) -> Vec<QueueEntry> {
        let threshold = chrono::Duration::from_std(threshold).unwrap_or(chrono::TimeDelta::MAX);
        let cutoff = Utc::now() - threshold;
        let mut inner = self.inner.lock().unwrap();
        let (stale, keep) = inner
            .entries
            .drain(..)
            .partition(|e: &QueueEntry| e.due_at < cutoff);
        inner.entries = keep;
        stale
    }

    /// Time until the next not-yet-ready entry becomes due, for callers
    /// sizing their own wait loop. `None` when nothing is scheduled ahead.
    pub fn next_due_in(&self) -> Option<Duration> {
        let now = Utc::now();
        let inner = self.inner.lock().unwrap();
        inner
            .entries
            .iter()
            .filter(|e| e.due_at > now)
            .map(|e| e.due_at - now)
            .min()
            .and_then(|d| d.to_std().ok())
    }

    /// Snapshot of the queue's composition.
    pub fn stats(&self) -> QueueStats {
        let now = Utc::now();
        let inner = self.inner.lock().unwrap();
        let mut stats = QueueStats {
            depth: inner.entries.len(),
            max_depth: self.max_depth,
            ready: 0,
            error: 0,
            immediate: 0,
            scheduled: 0,
        };
        for entry in &inner.entries {
            if entry.due_at <= now {
                stats.ready += 1;
            }
            match entry.priority {
                EventPriority::Error => stats.error += 1,
                EventPriority::Immediate => stats.immediate += 1,
                EventPriority::Scheduled => stats.scheduled += 1,
            }
        }
        stats
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
