// SPDX-License-Identifier: MIT

//! The module worker loop (SPEC_FULL.md §4.5).
//!
//! One long-lived tokio task per module. In single-event mode it dequeues
//! with a 100 ms timeout and dispatches one item at a time; in batch mode
//! (`batch_size > 1`) it drives the batch collector instead, tracking idle
//! time via a monotonic clock delta rather than the source's "every tenth
//! iteration" counter (REDESIGN FLAGS "idle-time bookkeeping by iteration
//! counting").

use std::sync::Arc;
use std::time::Duration;

use scanmod_adapters::ScanHandle;
use scanmod_core::{Clock, ControlToken, Event, QueueItem};

use crate::catch::{CatchHarness, CatchOptions};
use crate::lifecycle;
use crate::module::Module;
use crate::queue::{force_batch, Dequeued, DrainedBatch};

/// Dequeue timeout in single-event mode, and the sleep taken when a batch
/// iteration submits no work — the ≤100 ms suspension granularity
/// SPEC_FULL.md §5 requires at every blocking point.
const LOOP_TICK: Duration = Duration::from_millis(100);

/// Runs the worker loop until the scan starts stopping, the module's queue
/// is disarmed, or the module enters the errored state. Spawned by
/// [`Module::start`].
pub async fn run_worker_loop<H: ScanHandle, C: Clock>(module: Arc<Module<H, C>>) {
    let mut batch_idle_since = module.clock.now();

    loop {
        if module.scan().stopping() {
            tracing::debug!(module = %module.name(), "worker loop: scan stopping, exiting");
            break;
        }
        if module.errored() {
            tracing::debug!(module = %module.name(), "worker loop: module errored, exiting");
            break;
        }

        if module.config.batch_size > 1 {
            let idle = module.clock.now().duration_since(batch_idle_since);
            let force = force_batch(
                idle,
                module.config.batch_wait,
                module.scan().status(),
                &module.registry,
            );
            if force {
                batch_idle_since = module.clock.now();
            }

            match handle_batch(&module, force, &mut batch_idle_since).await {
                Ok(true) => {}
                Ok(false) => tokio::time::sleep(LOOP_TICK).await,
                Err(()) => break,
            }
        } else {
            match module.queue.dequeue(LOOP_TICK).await {
                Dequeued::Empty => continue,
                Dequeued::Closed => {
                    tracing::debug!(module = %module.name(), "worker loop: queue disarmed, exiting");
                    break;
                }
                Dequeued::Item(QueueItem::Token(token)) => {
                    if dispatch_token(&module, token).await.is_err() {
                        break;
                    }
                }
                Dequeued::Item(QueueItem::Event(event)) => {
                    if dispatch_event(&module, event).await.is_err() {
                        break;
                    }
                }
            }
        }
    }
}

/// Single-event dispatch (SPEC_FULL.md §4.5): output-type modules run
/// `handle_event` synchronously on this loop so their emissions stay
/// strictly FIFO; every other module submits it to the internal pool.
async fn dispatch_event<H: ScanHandle, C: Clock>(
    module: &Arc<Module<H, C>>,
    event: Event,
) -> Result<(), ()> {
    let stopping = module.scan().stopping();
    let handlers = module.handlers.clone();

    if module.is_output_module() {
        CatchHarness::new()
            .run(
                stopping,
                async move { handlers.handle_event(event).await },
                CatchOptions::new(),
            )
            .await
            .ok();
        return Ok(());
    }

    let submission = module
        .internal_pool
        .submit(async move {
            CatchHarness::new()
                .run(
                    stopping,
                    async move { handlers.handle_event(event).await },
                    CatchOptions::new(),
                )
                .await
        })
        .await;

    fail_module_on_pool_error(module, submission)
}

/// Control-token dispatch in single-event mode: schedules `finish()` or
/// `report()` on the internal pool. `schedule_finish`/`schedule_report`
/// reject the request once cleanup has run (SPEC_FULL.md §4.6).
async fn dispatch_token<H: ScanHandle, C: Clock>(
    module: &Arc<Module<H, C>>,
    token: ControlToken,
) -> Result<(), ()> {
    match token {
        ControlToken::Finish => schedule_finish(module).await,
        ControlToken::Report => schedule_report(module).await,
    }
}

/// Schedules `finish()` on the internal pool, unless cleanup has already
/// run (SPEC_FULL.md §4.6: "Neither is allowed during cleanup"). Every
/// caller — `dispatch_token`, `handle_batch`'s isolated-token path, and
/// `spawn_hook`'s batch on-finish callback — goes through this gate, so a
/// batch-capable module can't run a lifecycle hook after cleanup just
/// because it took the batch path instead of single-event dispatch.
async fn schedule_finish<H: ScanHandle, C: Clock>(module: &Arc<Module<H, C>>) -> Result<(), ()> {
    if let Err(err) = lifecycle::reject_if_cleaning_up("finish", module.is_cleaned_up()) {
        tracing::warn!(module = %module.name(), error = %err, "control token ignored");
        return Ok(());
    }
    let stopping = module.scan().stopping();
    let handlers = module.handlers.clone();
    let submission = module
        .internal_pool
        .submit(async move {
            CatchHarness::new()
                .run(stopping, async move { handlers.finish().await }, CatchOptions::new())
                .await
        })
        .await;
    fail_module_on_pool_error(module, submission)
}

/// Schedules `report()` on the internal pool, unless cleanup has already
/// run. See [`schedule_finish`] for why every caller goes through this gate.
async fn schedule_report<H: ScanHandle, C: Clock>(module: &Arc<Module<H, C>>) -> Result<(), ()> {
    if let Err(err) = lifecycle::reject_if_cleaning_up("report", module.is_cleaned_up()) {
        tracing::warn!(module = %module.name(), error = %err, "control token ignored");
        return Ok(());
    }
    let stopping = module.scan().stopping();
    let handlers = module.handlers.clone();
    let submission = module
        .internal_pool
        .submit(async move {
            CatchHarness::new()
                .run(stopping, async move { handlers.report().await }, CatchOptions::new())
                .await
        })
        .await;
    fail_module_on_pool_error(module, submission)
}

/// The batch collector's "handle-batch step" (SPEC_FULL.md §4.4).
///
/// `queued` here mirrors the source's `qsize()` on the raw queue: it counts
/// events *and* tokens together, since an isolated token sitting alone in
/// the queue must still be able to reach the force-flush threshold.
async fn handle_batch<H: ScanHandle, C: Clock>(
    module: &Arc<Module<H, C>>,
    force: bool,
    batch_idle_since: &mut std::time::Instant,
) -> Result<bool, ()> {
    let queued = module.queue.depth();
    if queued == 0 || (queued < module.config.batch_size && !force) {
        return Ok(false);
    }

    *batch_idle_since = module.clock.now();

    let drained = module.queue.events_waiting(module.config.batch_size);

    if drained.is_empty() {
        // Open Question (resolved): an isolated token with no events still
        // gets its callback scheduled, rather than being silently dropped.
        if drained.saw_finish {
            schedule_finish(module).await?;
            return Ok(true);
        }
        if drained.saw_report {
            schedule_report(module).await?;
            return Ok(true);
        }
        return Ok(false);
    }

    schedule_batch(module, drained).await?;
    Ok(true)
}

/// Submits one `handle_batch(events)` invocation to the internal pool,
/// chained with an on-finish callback selected by token priority — FINISH
/// wins over REPORT when both were observed in the same drain
/// (SPEC_FULL.md §4.4).
async fn schedule_batch<H: ScanHandle, C: Clock>(
    module: &Arc<Module<H, C>>,
    drained: DrainedBatch,
) -> Result<(), ()> {
    let stopping = module.scan().stopping();
    let handlers = module.handlers.clone();
    let events = drained.events;

    let mut opts = CatchOptions::new();
    if drained.saw_finish {
        let module = module.clone();
        opts = opts.with_on_finish(move || spawn_hook(module, ControlToken::Finish));
    } else if drained.saw_report {
        let module = module.clone();
        opts = opts.with_on_finish(move || spawn_hook(module, ControlToken::Report));
    }

    let submission = module
        .internal_pool
        .submit(async move {
            CatchHarness::new()
                .run(stopping, async move { handlers.handle_batch(events).await }, opts)
                .await
        })
        .await;
    fail_module_on_pool_error(module, submission)
}

/// The catch harness's `on_finish` callback is a synchronous closure, but
/// `finish`/`report` are async — so the callback fires off its own task
/// rather than running the hook inline. This mirrors the source's
/// `_on_finish_callback=self.finish` kwarg, which the underlying executor
/// also just calls without awaiting its result (DESIGN NOTES open question
/// 3: the submission's return value is fire-and-forget).
fn spawn_hook<H: ScanHandle, C: Clock>(module: Arc<Module<H, C>>, token: ControlToken) {
    tokio::spawn(async move {
        match token {
            ControlToken::Finish => {
                let _ = schedule_finish(&module).await;
            }
            ControlToken::Report => {
                let _ = schedule_report(&module).await;
            }
        }
    });
}

/// A pool submission failure is "any other exception in the worker loop
/// itself" (SPEC_FULL.md §4.5, §7): it transitions the module to the
/// errored state rather than being caught and logged like a handler error.
fn fail_module_on_pool_error<H: ScanHandle, C: Clock, T>(
    module: &Arc<Module<H, C>>,
    submission: Result<T, crate::error::PoolError>,
) -> Result<(), ()> {
    match submission {
        Ok(_) => Ok(()),
        Err(err) => {
            module.set_error_state(Some(err.to_string()));
            Err(())
        }
    }
}

#[cfg(test)]
#[path = "worker_tests.rs"]
mod tests;
