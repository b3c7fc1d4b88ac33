// SPDX-License-Identifier: MIT

//! Lifecycle ordering: setup, finish/report gating, and cleanup
//! (SPEC_FULL.md §4.6).
//!
//! `start()` (spawning the worker loop) lives on [`crate::module::Module`]
//! itself since it owns the `JoinHandle`; this module owns the two pieces
//! that need their own error-coercion policy: `setup()`'s three-way
//! success/soft-fail/hard-fail outcome, and `cleanup()`'s "run the user
//! hook, then every registered callback, in order, under the forced catch
//! harness" sequence.

use std::sync::Arc;

use crate::capability::{ModuleHandlers, SetupFailure};
use crate::catch::{CatchHarness, CatchOptions};
use crate::error::LifecycleError;

/// Outward status from `_setup()` (SPEC_FULL.md §4.6, §6, §7).
///
/// Maps the source's `true` / `false` / `none`-with-message trio onto an
/// ordinary three-variant enum: `Success`, `HardFail` (module excluded,
/// treated as a bug), `SoftFail` (module excluded, not a bug — typically a
/// missing wordlist).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetupStatus {
    Success,
    SoftFail,
    HardFail,
}

/// Runs a module's `setup()` hook exactly once, coercing a wordlist
/// failure to [`SetupStatus::SoftFail`], any other failure or panic to
/// [`SetupStatus::HardFail`], and a clean return to [`SetupStatus::Success`]
/// (SPEC_FULL.md §4.6, §7).
pub async fn run_setup(handlers: Arc<dyn ModuleHandlers>) -> (SetupStatus, Option<String>) {
    match tokio::task::spawn(async move { handlers.setup().await }).await {
        Ok(Ok(())) => (SetupStatus::Success, None),
        Ok(Err(SetupFailure::Wordlist(err))) => {
            tracing::warn!(error = %err, "module setup: wordlist error, soft failure");
            (SetupStatus::SoftFail, Some(err.to_string()))
        }
        Ok(Err(SetupFailure::Other(err))) => {
            tracing::error!(error = %err, "module setup: hard failure");
            (SetupStatus::HardFail, Some(err.to_string()))
        }
        Err(join_err) => {
            tracing::error!(error = %join_err, "module setup panicked, hard failure");
            (
                SetupStatus::HardFail,
                Some(format!("setup panicked: {join_err}")),
            )
        }
    }
}

/// Runs cleanup exactly once: the module's own `cleanup()` hook followed by
/// each registered callback in declared order, both under the catch harness
/// with `force: true` so they run even while the scan is stopping
/// (SPEC_FULL.md §4.6, §8 law 3). The caller (`Module::cleanup`) is
/// responsible for the "exactly once" guarantee via its `cleaned_up` flag;
/// this function just runs the sequence.
pub async fn run_cleanup(
    handlers: Arc<dyn ModuleHandlers>,
    callbacks: Vec<Box<dyn FnOnce() + Send>>,
) {
    let harness = CatchHarness::new();

    let _ = harness
        .run(
            false,
            async move { handlers.cleanup().await },
            CatchOptions::forced(),
        )
        .await;

    for callback in callbacks {
        let _ = harness
            .run(
                false,
                async move {
                    callback();
                    Ok(())
                },
                CatchOptions::forced(),
            )
            .await;
    }
}

/// Rejects a `finish`/`report` request arriving after cleanup has already
/// run (SPEC_FULL.md §4.6: "Neither is allowed during cleanup").
pub fn reject_if_cleaning_up(hook: &'static str, cleaned_up: bool) -> Result<(), LifecycleError> {
    if cleaned_up {
        Err(LifecycleError::DuringCleanup(hook))
    } else {
        Ok(())
    }
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
