// SPDX-License-Identifier: MIT

//! Bounded emission gate and the emission primitive (SPEC_FULL.md §4.2).
//!
//! Each module owns a counting semaphore sized to `outgoing_gate_capacity`.
//! A permit is acquired by the producer before handoff and released by the
//! downstream consumer once the event is retired — modeled in this crate
//! by [`scanmod_core::Event`] carrying an `OwnedSemaphorePermit` directly
//! (see `scanmod_core::event`), so "the consumer releases the permit"
//! happens for free when the event (or its last reference) is dropped.

use std::time::Duration;

use scanmod_adapters::{EmitError, EmitOptions, EventRequest, ScanHandle};
use scanmod_core::{Event, EventError};
use tokio::sync::Semaphore;
use tokio::time::timeout;

use std::sync::Arc;

/// How long one acquisition attempt waits before checking `scan.stopping()`
/// again (SPEC_FULL.md §4.2/§5).
const ACQUIRE_RETRY: Duration = Duration::from_millis(100);

/// Outcome of an emission attempt.
#[derive(Debug)]
pub enum EmitOutcome {
    /// The event was handed to the orchestrator.
    Emitted,
    /// Skipped: the scan was already stopping, or the event failed
    /// validation (logged at warning level, not propagated).
    Skipped,
    /// The orchestrator's `emit_event` call itself failed; the gate permit
    /// that was acquired for it has already been released.
    Failed(EmitError),
}

/// Per-module counting semaphore bounding outstanding outgoing events.
pub struct EmissionGate {
    semaphore: Arc<Semaphore>,
    capacity: usize,
}

impl EmissionGate {
    pub fn new(capacity: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Permits not currently held by an in-flight outgoing event.
    pub fn remaining_permits(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Outgoing events currently in flight for this module.
    pub fn in_flight(&self) -> usize {
        self.capacity.saturating_sub(self.remaining_permits())
    }

    /// Acquire one permit, retrying every [`ACQUIRE_RETRY`] while the scan
    /// is not stopping. Returns `None` if the scan started stopping before
    /// a permit was acquired (SPEC_FULL.md §4.2 step 3).
    async fn acquire<H: ScanHandle>(&self, scan: &H) -> Option<tokio::sync::OwnedSemaphorePermit> {
        loop {
            if scan.stopping() {
                return None;
            }
            match timeout(ACQUIRE_RETRY, self.semaphore.clone().acquire_owned()).await {
                Ok(Ok(permit)) => return Some(permit),
                Ok(Err(_)) => return None,
                Err(_elapsed) => continue,
            }
        }
    }

    /// The full emission primitive (SPEC_FULL.md §4.2 steps 1-5):
    /// construct the event, acquire a gate permit (respecting
    /// `scan.stopping()`), hand it to the orchestrator, and release the
    /// permit immediately if the handoff itself fails.
    pub async fn emit<H: ScanHandle>(
        &self,
        scan: &H,
        producer: &str,
        request: EventRequest,
        opts: EmitOptions,
    ) -> EmitOutcome {
        if scan.stopping() {
            return EmitOutcome::Skipped;
        }

        let event = match scan.make_event(producer, request) {
            Ok(event) => event,
            Err(EventError(message)) => {
                tracing::warn!(producer, error = %message, "event failed validation, skipping emission");
                return EmitOutcome::Skipped;
            }
        };

        let permit = match self.acquire(scan).await {
            Some(permit) => permit,
            None => return EmitOutcome::Skipped,
        };

        let event = event.with_gate_permit(permit);
        match scan.emit_event(event, opts).await {
            Ok(()) => EmitOutcome::Emitted,
            Err(err) => {
                tracing::error!(producer, error = %err, "emit_event failed, releasing gate permit");
                EmitOutcome::Failed(err)
            }
        }
    }
}

#[cfg(test)]
#[path = "gate_tests.rs"]
mod tests;
