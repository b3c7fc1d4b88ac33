// SPDX-License-Identifier: MIT

//! Errors raised inside the module runtime itself, as distinct from the
//! event-construction/setup errors owned by `scanmod-core`.

use thiserror::Error;

/// Raised by a module's handler (`handle_event`/`handle_batch`/`finish`/
/// `report`). Caught by the catch harness, logged, and never propagated to
/// the orchestrator.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("handler error: {0}")]
pub struct HandlerError(pub String);

impl HandlerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Raised by a wrapper when the shared pool itself refuses a submission
/// (as opposed to the submitted task failing once running).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("pool error: {0}")]
pub struct PoolError(pub String);

impl PoolError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Raised by the lifecycle controller for ordering violations, e.g. finish
/// or report requested during cleanup.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LifecycleError {
    #[error("{0} requested during cleanup")]
    DuringCleanup(&'static str),
    #[error("module errored before setup could complete: {0}")]
    SetupFailed(String),
}
