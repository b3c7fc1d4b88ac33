// SPDX-License-Identifier: MIT

//! The per-module capability record (SPEC_FULL.md REDESIGN FLAGS item 1).
//!
//! The source's subclass-override pattern (`setup`, `handle_event`,
//! `handle_batch`, `filter_event`, `finish`, `report`, `cleanup`) is
//! re-architected as an `async_trait` with documented default
//! implementations, grounded in the teacher repo's `SessionAdapter`/
//! `AgentAdapter` pattern: a module author implements only the methods
//! they need, the runtime dispatches through the trait object uniformly.

use async_trait::async_trait;
use scanmod_core::{Event, WordlistError};

use crate::error::HandlerError;

/// Failure returned from [`ModuleHandlers::setup`]. The lifecycle
/// controller coerces [`SetupFailure::Wordlist`] to a soft failure (module
/// excluded, not reported as a bug) and [`SetupFailure::Other`] to a hard
/// failure (module excluded and transitioned to the errored state),
/// collapsing the source's `true`/`false`/`none`-with-message trio into an
/// ordinary `Result`.
#[derive(Debug)]
pub enum SetupFailure {
    Wordlist(WordlistError),
    Other(HandlerError),
}

impl std::fmt::Display for SetupFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Wordlist(e) => write!(f, "{e}"),
            Self::Other(e) => write!(f, "{e}"),
        }
    }
}

/// Per-module business logic. Every method has a no-op/accept-all default
/// so a module implements only what its behavior requires.
#[async_trait]
pub trait ModuleHandlers: Send + Sync + 'static {
    /// Runs once at scan start, before the worker loop is spawned.
    async fn setup(&self) -> Result<(), SetupFailure> {
        Ok(())
    }

    /// Invoked for a single accepted event when `batch_size == 1`.
    async fn handle_event(&self, _event: Event) -> Result<(), HandlerError> {
        Ok(())
    }

    /// Invoked with up to `batch_size` accepted events when batching.
    async fn handle_batch(&self, _events: Vec<Event>) -> Result<(), HandlerError> {
        Ok(())
    }

    /// The module's custom acceptance predicate, run during the acceptance
    /// filter's post-check. A panic here is caught by the caller and
    /// treated as `true` (fail-open), per SPEC_FULL.md §4.3.
    fn filter_event(&self, _event: &Event) -> bool {
        true
    }

    /// Invoked on a FINISH control token. May be invoked more than once
    /// per scan, since finishing may itself emit events that cause further
    /// upstream work.
    async fn finish(&self) -> Result<(), HandlerError> {
        Ok(())
    }

    /// Invoked on a REPORT control token, expected once near end of scan.
    async fn report(&self) -> Result<(), HandlerError> {
        Ok(())
    }

    /// Invoked exactly once during module cleanup. Must not emit events.
    async fn cleanup(&self) -> Result<(), HandlerError> {
        Ok(())
    }
}

/// Calls a module's [`ModuleHandlers::filter_event`], treating a panic as
/// `true` (fail-open) rather than propagating it, per SPEC_FULL.md §4.3's
/// "if it raises, log the error and continue as if it returned true".
pub(crate) fn call_filter_event_fail_open(handlers: &dyn ModuleHandlers, event: &Event) -> bool {
    match std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| handlers.filter_event(event))) {
        Ok(accepted) => accepted,
        Err(_) => {
            tracing::error!("filter_event panicked; treating as accept (fail-open)");
            true
        }
    }
}

#[cfg(test)]
#[path = "capability_tests.rs"]
mod tests;
