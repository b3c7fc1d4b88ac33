// SPDX-License-Identifier: MIT

//! The exception-safe dispatch harness (SPEC_FULL.md §4.5, REDESIGN FLAGS
//! "catch-harness with keyword side-channels").
//!
//! The source's `scan.manager.catch(fn, *args, _on_finish_callback?,
//! _force?, **kwargs)` becomes an explicit [`CatchHarness::run`] primitive:
//! it spawns the wrapped task on its own tokio task so a handler panic is
//! caught at the `JoinHandle` boundary instead of propagating, logs any
//! failure, and always invokes the configured finish callback before
//! returning — even when the task failed or panicked.

use std::future::Future;

use crate::error::HandlerError;

/// Callback invoked once a harness-wrapped task has finished, regardless of
/// outcome. Boxed so `CatchOptions` stays an ordinary owned value.
pub type OnFinish = Box<dyn FnOnce() + Send>;

/// Options accompanying a [`CatchHarness::run`] call.
#[derive(Default)]
pub struct CatchOptions {
    pub on_finish: Option<OnFinish>,
    /// Suppresses the cancellation short-circuit below. Cleanup always
    /// passes `force: true` so it runs even while the scan is stopping.
    pub force: bool,
}

impl CatchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_on_finish(mut self, on_finish: impl FnOnce() + Send + 'static) -> Self {
        self.on_finish = Some(Box::new(on_finish));
        self
    }

    pub fn forced() -> Self {
        Self {
            on_finish: None,
            force: true,
        }
    }
}

/// Runs module handler invocations under a uniform catch policy.
#[derive(Clone, Copy, Default)]
pub struct CatchHarness;

impl CatchHarness {
    pub fn new() -> Self {
        Self
    }

    /// Run `task`, observing `stopping` unless `opts.force` is set. The
    /// task is spawned on its own tokio task so a panic inside it is caught
    /// at the `JoinHandle` boundary rather than unwinding into the caller;
    /// `opts.on_finish` always runs before `run` returns, whatever the
    /// outcome.
    pub async fn run<F>(&self, stopping: bool, task: F, opts: CatchOptions) -> Result<(), HandlerError>
    where
        F: Future<Output = Result<(), HandlerError>> + Send + 'static,
    {
        let result = if stopping && !opts.force {
            tracing::debug!("catch harness: skipping task, scan is stopping");
            Err(HandlerError::new("skipped: scan is stopping"))
        } else {
            match tokio::task::spawn(task).await {
                Ok(Ok(())) => Ok(()),
                Ok(Err(e)) => {
                    tracing::warn!(error = %e, "handler error");
                    Err(e)
                }
                Err(join_err) => {
                    tracing::error!(error = %join_err, "handler panicked");
                    Err(HandlerError::new(format!("handler panicked: {join_err}")))
                }
            }
        };

        if let Some(on_finish) = opts.on_finish {
            on_finish();
        }

        result
    }
}

#[cfg(test)]
#[path = "catch_tests.rs"]
mod tests;
