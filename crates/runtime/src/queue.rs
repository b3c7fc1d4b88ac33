// SPDX-License-Identifier: MIT

//! Incoming queue and batch collector (SPEC_FULL.md §4.4).
//!
//! The source's falsy-sentinel disarm pattern (REDESIGN FLAGS
//! "disarmed-queue sentinel") is re-architected as an explicit `disarmed`
//! flag plus a closed-queue dequeue outcome: once disarmed, `queue_event`
//! is a silent no-op and dequeuing always reports [`Dequeued::Closed`]
//! rather than returning a distinguished falsy value.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use scanmod_adapters::ScanStatus;
use scanmod_core::{ControlToken, Event, QueueItem};
use tokio::sync::Notify;

/// Outcome of one dequeue attempt.
#[derive(Debug)]
pub enum Dequeued {
    Item(QueueItem),
    /// Nothing arrived within the timeout; the queue is still open.
    Empty,
    /// The queue has been disarmed (SPEC_FULL.md §8 law 2) — the worker
    /// loop should exit.
    Closed,
}

/// A module's bounded incoming FIFO of events and control tokens.
#[derive(Clone)]
pub struct IncomingQueue {
    items: Arc<Mutex<VecDeque<QueueItem>>>,
    notify: Arc<Notify>,
    disarmed: Arc<AtomicBool>,
}

impl IncomingQueue {
    pub fn new() -> Self {
        Self {
            items: Arc::new(Mutex::new(VecDeque::new())),
            notify: Arc::new(Notify::new()),
            disarmed: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn depth(&self) -> usize {
        self.items.lock().len()
    }

    pub fn is_disarmed(&self) -> bool {
        self.disarmed.load(Ordering::SeqCst)
    }

    /// Enqueue an item. A no-op once disarmed (SPEC_FULL.md §8 law 2).
    pub fn queue_event(&self, item: impl Into<QueueItem>) {
        if self.is_disarmed() {
            tracing::debug!("queue_event: not in acceptable state");
            return;
        }
        self.items.lock().push_back(item.into());
        self.notify.notify_one();
    }

    /// Drain every queued item and disarm the queue so further
    /// `queue_event` calls become silent no-ops. Idempotent: calling this
    /// again on an already-disarmed queue just returns an empty vector.
    pub fn drain_and_disarm(&self) -> Vec<QueueItem> {
        self.disarmed.store(true, Ordering::SeqCst);
        let drained = self.items.lock().drain(..).collect();
        self.notify.notify_waiters();
        drained
    }

    /// Dequeue one item, waiting up to `timeout` for something to arrive.
    pub async fn dequeue(&self, timeout: Duration) -> Dequeued {
        if self.is_disarmed() {
            return Dequeued::Closed;
        }
        if let Some(item) = self.items.lock().pop_front() {
            return Dequeued::Item(item);
        }
        match tokio::time::timeout(timeout, self.notify.notified()).await {
            Ok(()) => {
                if self.is_disarmed() {
                    return Dequeued::Closed;
                }
                match self.items.lock().pop_front() {
                    Some(item) => Dequeued::Item(item),
                    None => Dequeued::Empty,
                }
            }
            Err(_elapsed) => Dequeued::Empty,
        }
    }

    /// Drain up to `batch_size` non-token items, recording whether FINISH
    /// and/or REPORT tokens were observed during the drain. Tokens never
    /// count against the batch-size budget (SPEC_FULL.md §4.4, §8 law 6).
    pub fn events_waiting(&self, batch_size: usize) -> DrainedBatch {
        let mut items = self.items.lock();
        let mut events = Vec::new();
        let mut saw_finish = false;
        let mut saw_report = false;

        while events.len() < batch_size {
            match items.pop_front() {
                Some(QueueItem::Event(event)) => events.push(event),
                Some(QueueItem::Token(ControlToken::Finish)) => saw_finish = true,
                Some(QueueItem::Token(ControlToken::Report)) => saw_report = true,
                None => break,
            }
        }

        DrainedBatch {
            events,
            saw_finish,
            saw_report,
        }
    }
}

impl Default for IncomingQueue {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of one `events_waiting` drain.
#[derive(Debug, Default)]
pub struct DrainedBatch {
    pub events: Vec<Event>,
    pub saw_finish: bool,
    pub saw_report: bool,
}

impl DrainedBatch {
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn saw_any_token(&self) -> bool {
        self.saw_finish || self.saw_report
    }
}

/// Force-flush predicate (SPEC_FULL.md §4.4): true when the batch has been
/// idle at least `batch_wait`, the scan is finishing, or every batch-capable
/// module in `registry` is idle (a global stalemate).
pub fn force_batch(
    batch_idle: Duration,
    batch_wait: Duration,
    scan_status: ScanStatus,
    registry: &crate::status::StatusRegistry,
) -> bool {
    batch_idle >= batch_wait
        || scan_status == ScanStatus::Finishing
        || !registry.any_batch_capable_running()
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
