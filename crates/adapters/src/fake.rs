// SPDX-License-Identifier: MIT

//! A recording, fully-controllable [`ScanHandle`] for unit and scenario
//! tests. Grounded in the teacher repo's `FakeAgentAdapter`/
//! `FakeSessionAdapter` pattern: every call is recorded so tests can assert
//! on call order and arguments, and every externally-observable knob
//! (`stopping`, `status`, `scope_search_distance`, emit failure) is
//! independently settable.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use scanmod_core::{Event, EventBuilder, EventError, ModuleConfig};

use crate::{EmitError, EmitOptions, EventRequest, ScanHandle, ScanStatus};

/// A recorded call to `emit_event`.
#[derive(Debug, Clone)]
pub struct EmitCall {
    pub event_type: String,
    pub producer: String,
}

/// Fake implementation of [`ScanHandle`] for tests.
///
/// `emit_event` holds onto accepted events (and therefore their gate
/// permits) until the test explicitly releases them via
/// [`FakeScanHandle::release_one_emitted`] or
/// [`FakeScanHandle::take_emitted`] — this is what lets backpressure tests
/// (S5) simulate a downstream consumer that hasn't caught up yet.
pub struct FakeScanHandle {
    stopping: AtomicBool,
    status: Mutex<ScanStatus>,
    scope_search_distance: AtomicI32,
    fail_emit: AtomicBool,
    emitted: Mutex<Vec<Event>>,
    emit_calls: Mutex<Vec<EmitCall>>,
    consumed: Mutex<Vec<(String, String)>>,
    configs: Mutex<HashMap<String, ModuleConfig>>,
}

impl FakeScanHandle {
    pub fn new() -> Self {
        Self {
            stopping: AtomicBool::new(false),
            status: Mutex::new(ScanStatus::Running),
            scope_search_distance: AtomicI32::new(1),
            fail_emit: AtomicBool::new(false),
            emitted: Mutex::new(Vec::new()),
            emit_calls: Mutex::new(Vec::new()),
            consumed: Mutex::new(Vec::new()),
            configs: Mutex::new(HashMap::new()),
        }
    }

    pub fn set_stopping(&self, stopping: bool) {
        self.stopping.store(stopping, Ordering::SeqCst);
    }

    pub fn set_status(&self, status: ScanStatus) {
        *self.status.lock() = status;
    }

    pub fn set_scope_search_distance(&self, distance: i32) {
        self.scope_search_distance.store(distance, Ordering::SeqCst);
    }

    /// Make the next (and all subsequent) `emit_event` calls fail, as if
    /// the orchestrator's handoff raised.
    pub fn set_emit_failure(&self, fail: bool) {
        self.fail_emit.store(fail, Ordering::SeqCst);
    }

    pub fn set_module_config(&self, name: impl Into<String>, config: ModuleConfig) {
        self.configs.lock().insert(name.into(), config);
    }

    /// Number of events currently held (accepted but not yet released).
    pub fn emitted_count(&self) -> usize {
        self.emitted.lock().len()
    }

    /// Release the oldest held event, dropping it (and therefore its gate
    /// permit) — simulating the downstream consumer catching up by one.
    pub fn release_one_emitted(&self) -> Option<Event> {
        let mut emitted = self.emitted.lock();
        if emitted.is_empty() {
            None
        } else {
            Some(emitted.remove(0))
        }
    }

    /// Release every held event at once.
    pub fn take_emitted(&self) -> Vec<Event> {
        std::mem::take(&mut *self.emitted.lock())
    }

    pub fn emit_calls(&self) -> Vec<EmitCall> {
        self.emit_calls.lock().clone()
    }

    pub fn consumed_events(&self) -> Vec<(String, String)> {
        self.consumed.lock().clone()
    }
}

impl Default for FakeScanHandle {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ScanHandle for FakeScanHandle {
    fn stopping(&self) -> bool {
        self.stopping.load(Ordering::SeqCst)
    }

    fn status(&self) -> ScanStatus {
        *self.status.lock()
    }

    fn scope_search_distance(&self) -> i32 {
        self.scope_search_distance.load(Ordering::SeqCst)
    }

    fn make_event(&self, producer: &str, request: EventRequest) -> Result<Event, EventError> {
        let mut builder = EventBuilder::new(request.event_type, producer).tags(request.tags);
        if let Some(source) = request.source {
            builder = builder.source(source);
        }
        if let Some(distance) = request.scope_distance {
            builder = builder.scope_distance(distance);
        }
        builder.build()
    }

    async fn emit_event(&self, event: Event, opts: EmitOptions) -> Result<(), EmitError> {
        if self.fail_emit.load(Ordering::SeqCst) {
            return Err(EmitError("simulated emit_event failure".into()));
        }
        self.emit_calls.lock().push(EmitCall {
            event_type: event.event_type().to_string(),
            producer: event.producer().to_string(),
        });
        if let Some(on_success) = opts.on_success {
            on_success();
        }
        self.emitted.lock().push(event);
        Ok(())
    }

    fn event_consumed(&self, event: &Event, module: &str) {
        self.consumed
            .lock()
            .push((event.event_type().to_string(), module.to_string()));
    }

    fn module_config(&self, module_name: &str) -> Option<ModuleConfig> {
        self.configs.lock().get(module_name).cloned()
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
