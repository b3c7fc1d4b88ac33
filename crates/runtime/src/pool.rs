// SPDX-License-Identifier: MIT

//! Shared worker pool and per-module wrapper (SPEC_FULL.md §4.1).
//!
//! Two process-wide bounded pools exist in a full deployment — a general
//! pool for ancillary module work and an internal pool that invokes user
//! handlers. Both are modeled by the same [`SharedPool`] type; the module
//! runtime holds one instance of each. A module draws from a shared pool
//! through a [`PoolWrapper`] that caps its own concurrent in-flight tasks at
//! `K` without letting it starve other modules: the shared pool's own
//! semaphore interleaves ready tasks from every wrapper fairly, and a
//! module's wrapper semaphore only ever limits *that module's* share.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

use crate::error::PoolError;

/// Process-wide bounded worker pool. Cheap to clone; every clone shares the
/// same underlying concurrency limit.
#[derive(Clone)]
pub struct SharedPool {
    semaphore: Arc<Semaphore>,
    capacity: usize,
}

impl SharedPool {
    pub fn new(capacity: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Permits not currently held by any module's dispatched task. Advisory
    /// only, per SPEC_FULL.md §5.
    pub fn available_permits(&self) -> usize {
        self.semaphore.available_permits()
    }
}

/// Per-module view over a [`SharedPool`], capping this module's concurrent
/// in-flight tasks at `K` (SPEC_FULL.md §4.1).
pub struct PoolWrapper {
    shared: SharedPool,
    own_capacity: Arc<Semaphore>,
    num_tasks: Arc<AtomicUsize>,
}

impl PoolWrapper {
    pub fn new(shared: SharedPool, cap: usize) -> Self {
        Self {
            shared,
            own_capacity: Arc::new(Semaphore::new(cap.max(1))),
            num_tasks: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Tasks of this module currently in flight (dispatched but not yet
    /// terminated, success or exception).
    pub fn num_tasks(&self) -> &Arc<AtomicUsize> {
        &self.num_tasks
    }

    /// Submit a task. Blocks the caller until both this module's own cap
    /// and the shared pool have a slot, then spawns the task and returns
    /// immediately with its `JoinHandle` — submission never waits for the
    /// task itself to finish.
    ///
    /// Wrapper failure policy: if acquiring either semaphore fails (the
    /// pool was shut down), `num_tasks` is left untouched and the error
    /// propagates. Once dispatched, the task's own success or failure never
    /// poisons the wrapper — `fut` is expected to have already converted
    /// any handler exception into its `Output`, typically via
    /// [`crate::catch::CatchHarness`].
    pub async fn submit<F>(&self, fut: F) -> Result<JoinHandle<F::Output>, PoolError>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        let own_permit = self
            .own_capacity
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| PoolError::new("module pool wrapper is closed"))?;
        let shared_permit = self
            .shared
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| PoolError::new("shared pool is closed"))?;

        let num_tasks = self.num_tasks.clone();
        num_tasks.fetch_add(1, Ordering::SeqCst);

        let handle = tokio::task::spawn(async move {
            // Held for the guard's whole lifetime, including across a panic
            // unwind, so a handler panic still releases the slot.
            let _guard = TaskGuard {
                num_tasks,
                _own_permit: own_permit,
                _shared_permit: shared_permit,
            };
            fut.await
        });

        Ok(handle)
    }
}

/// Releases this task's pool slot when dropped, including during a panic
/// unwind — this is what keeps a handler panic from poisoning the wrapper.
struct TaskGuard {
    num_tasks: Arc<AtomicUsize>,
    _own_permit: tokio::sync::OwnedSemaphorePermit,
    _shared_permit: tokio::sync::OwnedSemaphorePermit,
}

impl Drop for TaskGuard {
    fn drop(&mut self) {
        self.num_tasks.fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
#[path = "pool_tests.rs"]
mod tests;
