// SPDX-License-Identifier: MIT

//! Status snapshots and the cross-module registry that backs the
//! force-flush stalemate rule (SPEC_FULL.md §4.8).

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// Point-in-time view of one module's runtime state (SPEC_FULL.md §4.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusSnapshot {
    pub incoming_depth: usize,
    pub outgoing_in_flight: usize,
    pub main_pool_tasks: usize,
    pub internal_pool_tasks: usize,
    pub errored: bool,
    pub running: bool,
}

/// Shared counters a module's status is derived from.
///
/// `main_pool_tasks`/`internal_pool_tasks` are the *same* atomics a
/// module's two [`crate::pool::PoolWrapper`]s maintain internally — built
/// via [`StatusCounters::from_pools`] — so a module's status and the
/// registry's stalemate check never drift relative to the pools' own
/// bookkeeping. [`StatusCounters::new`] is for tests that want to drive the
/// counters directly without standing up real pools.
#[derive(Clone)]
pub struct StatusCounters {
    main_pool_tasks: Arc<AtomicUsize>,
    internal_pool_tasks: Arc<AtomicUsize>,
    errored: Arc<AtomicBool>,
    batch_capable: Arc<AtomicBool>,
}

impl StatusCounters {
    pub fn new(batch_capable: bool) -> Self {
        Self {
            main_pool_tasks: Arc::new(AtomicUsize::new(0)),
            internal_pool_tasks: Arc::new(AtomicUsize::new(0)),
            errored: Arc::new(AtomicBool::new(false)),
            batch_capable: Arc::new(AtomicBool::new(batch_capable)),
        }
    }

    pub fn from_pools(
        general: &crate::pool::PoolWrapper,
        internal: &crate::pool::PoolWrapper,
        batch_capable: bool,
    ) -> Self {
        Self {
            main_pool_tasks: general.num_tasks().clone(),
            internal_pool_tasks: internal.num_tasks().clone(),
            errored: Arc::new(AtomicBool::new(false)),
            batch_capable: Arc::new(AtomicBool::new(batch_capable)),
        }
    }

    pub fn set_errored(&self) {
        self.errored.store(true, Ordering::SeqCst);
    }

    pub fn errored(&self) -> bool {
        self.errored.load(Ordering::SeqCst)
    }

    pub fn main_pool_tasks(&self) -> usize {
        self.main_pool_tasks.load(Ordering::SeqCst)
    }

    pub fn internal_pool_tasks(&self) -> usize {
        self.internal_pool_tasks.load(Ordering::SeqCst)
    }

    pub(crate) fn main_pool_counter(&self) -> &AtomicUsize {
        &self.main_pool_tasks
    }

    pub(crate) fn internal_pool_counter(&self) -> &AtomicUsize {
        &self.internal_pool_tasks
    }

    /// Whether this module is capable of holding a partial batch, i.e.
    /// `batch_size > 1`. Only such modules participate in the stalemate
    /// check.
    pub fn batch_capable(&self) -> bool {
        self.batch_capable.load(Ordering::SeqCst)
    }

    /// `true` iff any task count is nonzero.
    pub fn running(&self) -> bool {
        self.main_pool_tasks() > 0 || self.internal_pool_tasks() > 0
    }
}

/// Shared table every module registers its [`StatusCounters`] handle into.
/// Backs the global stalemate check in the incoming-queue batcher and the
/// orchestrator-facing aggregate view (SPEC_FULL.md §2 item 7).
#[derive(Clone, Default)]
pub struct StatusRegistry {
    modules: Arc<parking_lot::Mutex<HashMap<String, StatusCounters>>>,
}

impl StatusRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, module_name: impl Into<String>, counters: StatusCounters) {
        self.modules.lock().insert(module_name.into(), counters);
    }

    pub fn deregister(&self, module_name: &str) {
        self.modules.lock().remove(module_name);
    }

    /// `true` if every batch-capable registered module is currently idle.
    /// An empty registry (no batch-capable modules at all) is vacuously a
    /// stalemate, matching the spec's "every module with batch_size > 1
    /// reports running = false".
    pub fn any_batch_capable_running(&self) -> bool {
        self.modules
            .lock()
            .values()
            .filter(|c| c.batch_capable())
            .any(|c| c.running())
    }
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;
