// SPDX-License-Identifier: MIT

//! The public module runtime type, tying together the pool, gate, filter,
//! queue, catch harness, worker loop, lifecycle, and status modules.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use scanmod_adapters::ScanHandle;
use scanmod_core::{Clock, ModuleConfig, ModuleKind, QueueItem, SystemClock};
use tokio::task::JoinHandle;

use crate::capability::{call_filter_event_fail_open, ModuleHandlers};
use crate::filter::AcceptanceFilter;
use crate::gate::EmissionGate;
use crate::lifecycle::{self, SetupStatus};
use crate::pool::{PoolWrapper, SharedPool};
use crate::queue::IncomingQueue;
use crate::status::{StatusCounters, StatusRegistry, StatusSnapshot};

/// One running module instance (SPEC_FULL.md §3 "Module Descriptor" and
/// §6 "Exposed to the orchestrator").
pub struct Module<H: ScanHandle, C: Clock = SystemClock> {
    pub(crate) name: String,
    pub(crate) config: ModuleConfig,
    pub(crate) handlers: Arc<dyn ModuleHandlers>,
    pub(crate) queue: IncomingQueue,
    pub(crate) general_pool: PoolWrapper,
    pub(crate) internal_pool: PoolWrapper,
    pub(crate) gate: EmissionGate,
    pub(crate) scan: Arc<H>,
    pub(crate) clock: C,
    pub(crate) counters: StatusCounters,
    pub(crate) registry: StatusRegistry,
    errored: AtomicBool,
    excluded: AtomicBool,
    cleaned_up: AtomicBool,
    cleanup_callbacks: Mutex<Vec<Box<dyn FnOnce() + Send>>>,
    worker_handle: Mutex<Option<JoinHandle<()>>>,
}

impl<H: ScanHandle> Module<H, SystemClock> {
    /// Construct a module with the real system clock.
    pub fn new(
        config: ModuleConfig,
        handlers: Arc<dyn ModuleHandlers>,
        scan: Arc<H>,
        general_pool: SharedPool,
        internal_pool: SharedPool,
        registry: StatusRegistry,
    ) -> Arc<Self> {
        Self::with_clock(
            config,
            handlers,
            scan,
            SystemClock,
            general_pool,
            internal_pool,
            registry,
        )
    }
}

impl<H: ScanHandle, C: Clock> Module<H, C> {
    pub fn with_clock(
        config: ModuleConfig,
        handlers: Arc<dyn ModuleHandlers>,
        scan: Arc<H>,
        clock: C,
        general_pool: SharedPool,
        internal_pool: SharedPool,
        registry: StatusRegistry,
    ) -> Arc<Self> {
        let name = config.name.clone();
        let general_pool = PoolWrapper::new(general_pool, config.max_threads.max(1));
        let internal_pool = PoolWrapper::new(internal_pool, config.max_event_handlers.max(1));
        let counters = StatusCounters::from_pools(&general_pool, &internal_pool, config.batch_size > 1);
        registry.register(name.clone(), counters.clone());

        let gate = EmissionGate::new(config.outgoing_gate_capacity.max(1));

        Arc::new(Self {
            name,
            config,
            handlers,
            queue: IncomingQueue::new(),
            general_pool,
            internal_pool,
            gate,
            scan,
            clock,
            counters,
            registry,
            errored: AtomicBool::new(false),
            excluded: AtomicBool::new(false),
            cleaned_up: AtomicBool::new(false),
            cleanup_callbacks: Mutex::new(Vec::new()),
            worker_handle: Mutex::new(None),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn priority(&self) -> u8 {
        self.config.priority()
    }

    pub fn auth_required(&self) -> bool {
        self.config.auth_required
    }

    pub fn get_watched_events(&self) -> &HashSet<String> {
        &self.config.watched_events
    }

    pub fn errored(&self) -> bool {
        self.errored.load(Ordering::SeqCst)
    }

    /// Whether `cleanup()` has already run. `finish`/`report` control
    /// tokens dequeued after this point are rejected (SPEC_FULL.md §4.6).
    pub(crate) fn is_cleaned_up(&self) -> bool {
        self.cleaned_up.load(Ordering::SeqCst)
    }

    pub fn running(&self) -> bool {
        self.counters.running()
    }

    pub fn gate(&self) -> &EmissionGate {
        &self.gate
    }

    pub fn scan(&self) -> &Arc<H> {
        &self.scan
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn general_pool(&self) -> &PoolWrapper {
        &self.general_pool
    }

    /// Register a callback to run during cleanup, in registration order,
    /// after the module's own `cleanup()` hook (SPEC_FULL.md §3, §4.6).
    pub fn register_cleanup_callback(&self, callback: impl FnOnce() + Send + 'static) {
        self.cleanup_callbacks.lock().push(Box::new(callback));
    }

    /// Snapshot view of this module's runtime state (SPEC_FULL.md §4.7).
    pub fn status(&self) -> StatusSnapshot {
        StatusSnapshot {
            incoming_depth: self.queue.depth(),
            outgoing_in_flight: self.gate.in_flight(),
            main_pool_tasks: self.counters.main_pool_tasks(),
            internal_pool_tasks: self.counters.internal_pool_tasks(),
            errored: self.errored(),
            running: self.running(),
        }
    }

    /// Apply the two-phase acceptance filter and, if accepted, enqueue the
    /// item and notify the scan's statistics collector (SPEC_FULL.md §4.3).
    pub fn queue_event(&self, item: impl Into<QueueItem>) {
        let item = item.into();

        if self.errored() {
            tracing::debug!(module = %self.name, "queue_event: module is errored");
            return;
        }

        let filter = AcceptanceFilter::new(&self.config, &self.name);
        if let Err(reason) = filter.pre_check(&item) {
            tracing::debug!(module = %self.name, reason = %reason, "event rejected (pre-check)");
            return;
        }

        let item = match item {
            QueueItem::Event(event) => {
                let custom_ok = call_filter_event_fail_open(self.handlers.as_ref(), &event);
                match filter.post_check(&event, self.scan.scope_search_distance(), custom_ok) {
                    Ok(()) => QueueItem::Event(event),
                    Err(reason) => {
                        tracing::debug!(module = %self.name, reason = %reason, "event rejected (post-check)");
                        return;
                    }
                }
            }
            token @ QueueItem::Token(_) => token,
        };

        if let QueueItem::Event(ref event) = item {
            self.scan.event_consumed(event, &self.name);
        }
        self.queue.queue_event(item);
    }

    /// Whether handlers for this module run synchronously on the worker
    /// loop (output-type modules) rather than on the internal pool.
    pub(crate) fn is_output_module(&self) -> bool {
        self.config.kind == ModuleKind::Output
    }

    /// Run `setup()` and, on hard failure, transition directly to the
    /// errored state. Returns the outward-facing status/message pair
    /// (SPEC_FULL.md §4.6, §6).
    pub async fn setup(&self) -> (SetupStatus, Option<String>) {
        let (status, message) = lifecycle::run_setup(self.handlers.clone()).await;
        match status {
            SetupStatus::Success => {}
            SetupStatus::SoftFail => self.excluded.store(true, Ordering::SeqCst),
            SetupStatus::HardFail => {
                self.excluded.store(true, Ordering::SeqCst);
                self.set_error_state(message.clone());
            }
        }
        (status, message)
    }

    /// Spawn the worker loop thread after a successful setup. A no-op if
    /// the module was excluded by setup or is already running.
    pub async fn start(self: &Arc<Self>) {
        if self.errored() || self.excluded.load(Ordering::SeqCst) {
            return;
        }
        let mut handle_slot = self.worker_handle.lock();
        if handle_slot.is_some() {
            return;
        }
        let module = self.clone();
        *handle_slot = Some(tokio::task::spawn(async move {
            crate::worker::run_worker_loop(module).await;
        }));
    }

    /// Mark the module errored: logs `message` if given, drains and
    /// disarms the incoming queue, and marks `errored`. Idempotent
    /// (SPEC_FULL.md §4.6, §8 law 2).
    pub fn set_error_state(&self, message: Option<String>) {
        if let Some(message) = &message {
            tracing::error!(module = %self.name, error = %message, "module entering errored state");
        }
        self.errored.store(true, Ordering::SeqCst);
        self.counters.set_errored();
        self.queue.drain_and_disarm();
    }

    /// Run cleanup exactly once: the module's own `cleanup()` hook followed
    /// by each registered callback in order, both under the catch harness
    /// with `force` set so they run even while the scan is stopping
    /// (SPEC_FULL.md §4.6, §8 law 3).
    pub async fn cleanup(&self) {
        if self.cleaned_up.swap(true, Ordering::SeqCst) {
            return;
        }
        lifecycle::run_cleanup(self.handlers.clone(), self.take_cleanup_callbacks()).await;
        self.registry.deregister(&self.name);
    }

    fn take_cleanup_callbacks(&self) -> Vec<Box<dyn FnOnce() + Send>> {
        std::mem::take(&mut *self.cleanup_callbacks.lock())
    }
}

#[cfg(test)]
#[path = "module_tests.rs"]
mod tests;
