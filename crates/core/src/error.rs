// SPDX-License-Identifier: MIT

//! Error taxonomy for event construction and module setup/execution.

use thiserror::Error;

/// Raised by the (external) event factory when constructor arguments don't
/// form a valid event. Handled by logging a warning and silently skipping
/// emission, never by propagating to the orchestrator.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("validation error: {0}")]
pub struct EventError(pub String);

impl EventError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Raised during module `setup()` when a required wordlist is missing or
/// unreadable. Coerced to a soft failure (module excluded, not reported as
/// a bug) rather than a hard failure.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("wordlist error: {0}")]
pub struct WordlistError(pub String);

impl WordlistError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Raised anywhere in the worker loop when the scan has been cancelled.
/// Logged at verbose level; the loop exits cleanly without entering the
/// errored state.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("scan cancelled: {0}")]
pub struct ScanCancelledError(pub String);

impl ScanCancelledError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}
