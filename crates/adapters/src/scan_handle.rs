// SPDX-License-Identifier: MIT

//! The `ScanHandle` contract: everything a module consumes from the scan
//! orchestrator (SPEC_FULL.md §6).

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use scanmod_core::{Event, EventError, ModuleConfig};
use thiserror::Error;

/// Coarse scan lifecycle phase, read by modules to decide on force-flush
/// and other phase-sensitive behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanStatus {
    Starting,
    Running,
    Finishing,
    Aborting,
}

/// Arguments for constructing an event via the (external) scan event
/// factory. Mirrors `scan.make_event(...)`.
#[derive(Debug, Clone, Default)]
pub struct EventRequest {
    pub event_type: String,
    pub source: Option<Arc<Event>>,
    pub tags: HashSet<String>,
    /// Leave unset (`None`) to let the factory resolve it; `Some(d)` to
    /// construct an already-resolved event (used heavily in tests).
    pub scope_distance: Option<i32>,
}

impl EventRequest {
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            ..Default::default()
        }
    }

    pub fn with_source(mut self, source: Arc<Event>) -> Self {
        self.source = Some(source);
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    pub fn with_scope_distance(mut self, distance: i32) -> Self {
        self.scope_distance = Some(distance);
        self
    }
}

/// Options accompanying `emit_event`, mirroring
/// `scan.manager.emit_event(event, abort_if, on_success_callback, quick)`.
#[derive(Clone, Default)]
pub struct EmitOptions {
    /// Abort the emission if this predicate returns true for the event.
    pub abort_if: Option<Arc<dyn Fn(&Event) -> bool + Send + Sync>>,
    /// Invoked once the orchestrator has accepted the event.
    pub on_success: Option<Arc<dyn Fn() + Send + Sync>>,
    pub quick: bool,
}

impl std::fmt::Debug for EmitOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmitOptions")
            .field("abort_if", &self.abort_if.is_some())
            .field("on_success", &self.on_success.is_some())
            .field("quick", &self.quick)
            .finish()
    }
}

/// Raised when the orchestrator's `emit_event` call itself fails (e.g. the
/// event was rejected downstream). The emission primitive (§4.2) releases
/// the permit it just acquired and logs an error on this path.
#[derive(Debug, Error)]
#[error("emit_event failed: {0}")]
pub struct EmitError(pub String);

/// Everything the module runtime consumes from the scan orchestrator.
#[async_trait]
pub trait ScanHandle: Send + Sync + 'static {
    /// True once the scan has begun shutting down. All blocking waits in
    /// the runtime check this at their timeout granularity.
    fn stopping(&self) -> bool;

    /// Coarse scan lifecycle phase.
    fn status(&self) -> ScanStatus;

    /// The scan's configured scope search distance (`>= 0`).
    fn scope_search_distance(&self) -> i32;

    /// Construct an event via the scan's factory. May fail with
    /// [`EventError`] on invalid arguments.
    fn make_event(&self, producer: &str, request: EventRequest) -> Result<Event, EventError>;

    /// Hand an event to the orchestrator for downstream dispatch. The
    /// module never releases the event's gate permit itself on the
    /// success path; the permit travels with the event until the
    /// orchestrator (or a terminal sink) retires it.
    async fn emit_event(&self, event: Event, opts: EmitOptions) -> Result<(), EmitError>;

    /// Notify the scan's statistics collector that an event was accepted
    /// into a module's incoming queue.
    fn event_consumed(&self, event: &Event, module: &str);

    /// Look up a module's declared configuration, e.g. from
    /// `scan.config["modules"][module_name]`.
    fn module_config(&self, module_name: &str) -> Option<ModuleConfig>;
}
