use super::*;
use crate::error::HandlerError;
use crate::pool::SharedPool;
use crate::status::StatusRegistry;
use scanmod_adapters::FakeScanHandle;
use scanmod_core::{EventBuilder, FakeClock, ModuleConfig, ModuleKind};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex as StdMutex;

#[derive(Default)]
struct RecordingHandlers {
    handle_event_calls: AtomicUsize,
    handle_batch_calls: AtomicUsize,
    last_batch: StdMutex<Vec<String>>,
    finish_calls: AtomicUsize,
    report_calls: AtomicUsize,
}

#[async_trait::async_trait]
impl crate::capability::ModuleHandlers for RecordingHandlers {
    async fn handle_event(&self, _event: Event) -> Result<(), HandlerError> {
        self.handle_event_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn handle_batch(&self, events: Vec<Event>) -> Result<(), HandlerError> {
        self.handle_batch_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_batch.lock().unwrap() =
            events.iter().map(|e| e.event_type().to_string()).collect();
        Ok(())
    }

    async fn finish(&self) -> Result<(), HandlerError> {
        self.finish_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn report(&self) -> Result<(), HandlerError> {
        self.report_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn make_module(
    config: ModuleConfig,
    handlers: Arc<RecordingHandlers>,
) -> Arc<Module<FakeScanHandle, FakeClock>> {
    Module::with_clock(
        config,
        handlers,
        Arc::new(FakeScanHandle::new()),
        FakeClock::new(),
        SharedPool::new(8),
        SharedPool::new(8),
        StatusRegistry::new(),
    )
}

fn event(event_type: &str) -> Event {
    EventBuilder::new(event_type, "producer")
        .scope_distance(0)
        .build()
        .unwrap()
}

/// `queue_event` runs the full acceptance filter; tests that go through it
/// (rather than calling `dispatch_event`/`dispatch_token` directly) need a
/// config that watches everything.
fn watch_everything(mut config: ModuleConfig) -> ModuleConfig {
    config.watched_events.insert("*".to_string());
    config
}

async fn wait_for(mut check: impl FnMut() -> bool) {
    for _ in 0..200 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition never became true");
}

#[tokio::test]
async fn dispatch_event_submits_to_internal_pool() {
    let handlers = Arc::new(RecordingHandlers::default());
    let module = make_module(ModuleConfig::new("m"), handlers.clone());

    dispatch_event(&module, event("DNS_NAME")).await.unwrap();
    wait_for(|| handlers.handle_event_calls.load(Ordering::SeqCst) == 1).await;
}

#[tokio::test]
async fn output_modules_handle_events_synchronously() {
    let handlers = Arc::new(RecordingHandlers::default());
    let mut config = ModuleConfig::new("csv");
    config.kind = ModuleKind::Output;
    let module = make_module(config, handlers.clone());

    dispatch_event(&module, event("DNS_NAME")).await.unwrap();
    // Synchronous: already observable without a wait_for retry loop.
    assert_eq!(handlers.handle_event_calls.load(Ordering::SeqCst), 1);
    assert_eq!(module.internal_pool.num_tasks().load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn dispatch_token_schedules_finish_and_report() {
    let handlers = Arc::new(RecordingHandlers::default());
    let module = make_module(ModuleConfig::new("m"), handlers.clone());

    dispatch_token(&module, ControlToken::Finish).await.unwrap();
    dispatch_token(&module, ControlToken::Report).await.unwrap();

    wait_for(|| {
        handlers.finish_calls.load(Ordering::SeqCst) == 1
            && handlers.report_calls.load(Ordering::SeqCst) == 1
    })
    .await;
}

#[tokio::test]
async fn control_tokens_are_rejected_once_cleaned_up() {
    let handlers = Arc::new(RecordingHandlers::default());
    let module = make_module(ModuleConfig::new("m"), handlers.clone());
    module.cleanup().await;

    dispatch_token(&module, ControlToken::Finish).await.unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(handlers.finish_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn handle_batch_does_nothing_below_threshold_without_force() {
    let handlers = Arc::new(RecordingHandlers::default());
    let mut config = ModuleConfig::new("m");
    config.batch_size = 10;
    let module = make_module(watch_everything(config), handlers.clone());
    module.queue_event(event("A"));

    let mut idle_since = module.clock.now();
    let submitted = handle_batch(&module, false, &mut idle_since).await.unwrap();
    assert!(!submitted);
    assert_eq!(handlers.handle_batch_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn handle_batch_flushes_partial_batch_when_forced() {
    let handlers = Arc::new(RecordingHandlers::default());
    let mut config = ModuleConfig::new("m");
    config.batch_size = 10;
    let module = make_module(watch_everything(config), handlers.clone());
    module.queue_event(event("A"));
    module.queue_event(event("B"));

    let mut idle_since = module.clock.now();
    let submitted = handle_batch(&module, true, &mut idle_since).await.unwrap();
    assert!(submitted);

    wait_for(|| handlers.handle_batch_calls.load(Ordering::SeqCst) == 1).await;
    assert_eq!(*handlers.last_batch.lock().unwrap(), vec!["A", "B"]);
}

#[tokio::test]
async fn handle_batch_schedules_isolated_token_with_no_events() {
    let handlers = Arc::new(RecordingHandlers::default());
    let mut config = ModuleConfig::new("m");
    config.batch_size = 10;
    let module = make_module(watch_everything(config), handlers.clone());
    module.queue_event(ControlToken::Finish);

    let mut idle_since = module.clock.now();
    let submitted = handle_batch(&module, true, &mut idle_since).await.unwrap();
    assert!(submitted);

    wait_for(|| handlers.finish_calls.load(Ordering::SeqCst) == 1).await;
    assert_eq!(handlers.handle_batch_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn handle_batch_rejects_isolated_finish_token_once_cleaned_up() {
    let handlers = Arc::new(RecordingHandlers::default());
    let mut config = ModuleConfig::new("m");
    config.batch_size = 10;
    let module = make_module(watch_everything(config), handlers.clone());
    module.queue_event(ControlToken::Finish);
    module.cleanup().await;

    let mut idle_since = module.clock.now();
    handle_batch(&module, true, &mut idle_since).await.unwrap();

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(handlers.finish_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn handle_batch_token_priority_finish_wins_over_report() {
    let handlers = Arc::new(RecordingHandlers::default());
    let mut config = ModuleConfig::new("m");
    config.batch_size = 10;
    let module = make_module(watch_everything(config), handlers.clone());
    module.queue_event(event("A"));
    module.queue_event(ControlToken::Report);
    module.queue_event(ControlToken::Finish);

    let mut idle_since = module.clock.now();
    handle_batch(&module, true, &mut idle_since).await.unwrap();

    wait_for(|| handlers.finish_calls.load(Ordering::SeqCst) == 1).await;
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(handlers.report_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn run_worker_loop_dispatches_single_events_and_exits_on_stop() {
    let handlers = Arc::new(RecordingHandlers::default());
    let config = watch_everything(ModuleConfig::new("m"));
    let scan = Arc::new(FakeScanHandle::new());
    let module = Module::with_clock(
        config,
        handlers.clone(),
        scan.clone(),
        FakeClock::new(),
        SharedPool::new(8),
        SharedPool::new(8),
        StatusRegistry::new(),
    );

    module.queue_event(event("DNS_NAME"));
    let running = tokio::spawn({
        let module = module.clone();
        async move { run_worker_loop(module).await }
    });

    wait_for(|| handlers.handle_event_calls.load(Ordering::SeqCst) == 1).await;
    scan.set_stopping(true);
    tokio::time::timeout(Duration::from_secs(1), running)
        .await
        .expect("worker loop should exit once the scan is stopping")
        .unwrap();
}

#[tokio::test]
async fn run_worker_loop_exits_when_queue_is_disarmed() {
    let handlers = Arc::new(RecordingHandlers::default());
    let module = make_module(ModuleConfig::new("m"), handlers);
    module.set_error_state(Some("boom".into()));

    tokio::time::timeout(Duration::from_secs(1), run_worker_loop(module))
        .await
        .expect("worker loop should exit promptly once errored");
}
