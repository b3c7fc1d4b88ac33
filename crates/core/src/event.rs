// SPDX-License-Identifier: MIT

//! The event type flowing between modules.
//!
//! An event's lifetime runs from factory construction until every
//! per-module emission gate it acquired has been released. Rather than the
//! source's manual `acquire_semaphore`/`release_semaphore` pair, the permit
//! is carried directly inside the `Event` as a
//! [`tokio::sync::OwnedSemaphorePermit`]: dropping the event (or the last
//! `Arc` referencing it, including transitively through its `source` chain)
//! releases the permit automatically. This is the idiomatic Rust rendering
//! of "the downstream consumer releases the permit when the event is
//! retired."

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::OwnedSemaphorePermit;

use crate::error::EventError;
use crate::{define_id, id::UuidIdGen, IdGen};

define_id! {
    /// Unique identifier for an event instance.
    pub struct EventId;
}

/// An event flowing between modules.
///
/// Opaque beyond the fields this core cares about: a type tag, an optional
/// source event (itself possibly carrying a gate permit), a tag set, a
/// scope distance (negative until resolved), and the module that produced
/// it.
#[derive(Debug)]
pub struct Event {
    id: EventId,
    event_type: String,
    source: Option<Arc<Event>>,
    tags: HashSet<String>,
    scope_distance: i32,
    producer: String,
    gate_permit: Option<OwnedSemaphorePermit>,
}

/// Sentinel `scope_distance` meaning "not yet resolved".
pub const SCOPE_DISTANCE_UNRESOLVED: i32 = -1;

impl Event {
    /// The event's identifier.
    pub fn id(&self) -> &EventId {
        &self.id
    }

    /// The event's type tag, e.g. `"DNS_NAME"`.
    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    /// The event this one was derived from, if any.
    pub fn source(&self) -> Option<&Event> {
        self.source.as_deref()
    }

    /// The event's tag set.
    pub fn tags(&self) -> &HashSet<String> {
        &self.tags
    }

    /// Non-negative once resolved; [`SCOPE_DISTANCE_UNRESOLVED`] before.
    pub fn scope_distance(&self) -> i32 {
        self.scope_distance
    }

    /// Name of the module that produced this event.
    pub fn producer(&self) -> &str {
        &self.producer
    }

    /// Record the event's resolved scope distance. Called by the (external)
    /// DNS-resolution/scoping helper once the event's place relative to the
    /// scan's targets is known.
    pub fn resolve_scope_distance(&mut self, distance: i32) {
        self.scope_distance = distance;
    }

    /// Attach the emission-gate permit acquired for this event. Consumes
    /// and returns `self` so it reads naturally at the emission call site.
    pub fn with_gate_permit(mut self, permit: OwnedSemaphorePermit) -> Self {
        self.gate_permit = Some(permit);
        self
    }

    /// Detach the gate permit without dropping the event, e.g. when an
    /// emission attempt fails after acquiring the permit and the producer
    /// needs to release it immediately rather than waiting for the event
    /// (which the producer may still want to retry with) to be dropped.
    pub fn take_gate_permit(&mut self) -> Option<OwnedSemaphorePermit> {
        self.gate_permit.take()
    }

    /// True once a gate permit has been attached.
    pub fn holds_gate_permit(&self) -> bool {
        self.gate_permit.is_some()
    }
}

/// Builder standing in for the (external) scan event factory's contract.
/// Construction may fail with [`EventError`], matching `scan.make_event`'s
/// `ValidationError` outcome in SPEC_FULL.md §6/§7.
pub struct EventBuilder {
    id: Option<EventId>,
    event_type: String,
    source: Option<Arc<Event>>,
    tags: HashSet<String>,
    scope_distance: i32,
    producer: String,
}

impl EventBuilder {
    pub fn new(event_type: impl Into<String>, producer: impl Into<String>) -> Self {
        Self {
            id: None,
            event_type: event_type.into(),
            source: None,
            tags: HashSet::new(),
            scope_distance: SCOPE_DISTANCE_UNRESOLVED,
            producer: producer.into(),
        }
    }

    pub fn id(mut self, id: EventId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn source(mut self, source: Arc<Event>) -> Self {
        self.source = Some(source);
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    pub fn tags(mut self, tags: impl IntoIterator<Item = String>) -> Self {
        self.tags.extend(tags);
        self
    }

    pub fn scope_distance(mut self, distance: i32) -> Self {
        self.scope_distance = distance;
        self
    }

    /// Validate and construct the event. Returns [`EventError`] for
    /// malformed arguments, mirroring the source's `ValidationError`.
    pub fn build(self) -> Result<Event, EventError> {
        if self.event_type.trim().is_empty() {
            return Err(EventError::new("event type must not be empty"));
        }
        if self.producer.trim().is_empty() {
            return Err(EventError::new("producer module name must not be empty"));
        }
        let id = self.id.unwrap_or_else(|| EventId::new(UuidIdGen.next()));
        Ok(Event {
            id,
            event_type: self.event_type,
            source: self.source,
            tags: self.tags,
            scope_distance: self.scope_distance,
            producer: self.producer,
            gate_permit: None,
        })
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
