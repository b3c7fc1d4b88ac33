use super::*;
use crate::status::StatusRegistry;
use scanmod_core::EventBuilder;
use std::time::Duration;

fn event(event_type: &str) -> Event {
    EventBuilder::new(event_type, "producer").build().unwrap()
}

#[tokio::test]
async fn dequeue_returns_items_in_fifo_order() {
    let queue = IncomingQueue::new();
    queue.queue_event(event("A"));
    queue.queue_event(event("B"));

    let first = queue.dequeue(Duration::from_millis(50)).await;
    let second = queue.dequeue(Duration::from_millis(50)).await;

    match (first, second) {
        (Dequeued::Item(QueueItem::Event(a)), Dequeued::Item(QueueItem::Event(b))) => {
            assert_eq!(a.event_type(), "A");
            assert_eq!(b.event_type(), "B");
        }
        other => panic!("unexpected dequeue outcomes: {other:?}"),
    }
}

#[tokio::test]
async fn dequeue_times_out_on_empty_queue() {
    let queue = IncomingQueue::new();
    let outcome = queue.dequeue(Duration::from_millis(20)).await;
    assert!(matches!(outcome, Dequeued::Empty));
}

#[test]
fn drain_and_disarm_empties_queue_and_blocks_further_enqueues() {
    let queue = IncomingQueue::new();
    for _ in 0..100 {
        queue.queue_event(event("DNS_NAME"));
    }
    assert_eq!(queue.depth(), 100);

    let drained = queue.drain_and_disarm();
    assert_eq!(drained.len(), 100);
    assert_eq!(queue.depth(), 0);
    assert!(queue.is_disarmed());

    queue.queue_event(event("DNS_NAME"));
    assert_eq!(queue.depth(), 0);
}

#[tokio::test]
async fn dequeue_reports_closed_once_disarmed() {
    let queue = IncomingQueue::new();
    queue.drain_and_disarm();
    let outcome = queue.dequeue(Duration::from_millis(20)).await;
    assert!(matches!(outcome, Dequeued::Closed));
}

#[test]
fn events_waiting_caps_at_batch_size_and_tracks_tokens() {
    let queue = IncomingQueue::new();
    queue.queue_event(event("A"));
    queue.queue_event(ControlToken::Finish);
    queue.queue_event(event("B"));
    queue.queue_event(event("C"));
    queue.queue_event(ControlToken::Report);
    queue.queue_event(event("D"));

    let batch = queue.events_waiting(2);
    assert_eq!(batch.events.len(), 2);
    assert_eq!(batch.events[0].event_type(), "A");
    assert_eq!(batch.events[1].event_type(), "B");
    assert!(batch.saw_finish);
    assert!(!batch.saw_report);

    // Remaining items are untouched, in original order.
    assert_eq!(queue.depth(), 3);
    let rest = queue.events_waiting(10);
    assert_eq!(rest.events.len(), 2);
    assert!(rest.saw_report);
}

#[test]
fn force_batch_triggers_on_idle_timeout() {
    let registry = StatusRegistry::new();
    assert!(force_batch(
        Duration::from_secs(2),
        Duration::from_secs(1),
        ScanStatus::Running,
        &registry,
    ));
}

#[test]
fn force_batch_triggers_when_scan_finishing() {
    let registry = StatusRegistry::new();
    assert!(force_batch(
        Duration::ZERO,
        Duration::from_secs(10),
        ScanStatus::Finishing,
        &registry,
    ));
}

#[test]
fn force_batch_triggers_on_global_stalemate() {
    // An empty registry is vacuously a stalemate.
    let registry = StatusRegistry::new();
    assert!(force_batch(
        Duration::ZERO,
        Duration::from_secs(10),
        ScanStatus::Running,
        &registry,
    ));
}

#[test]
fn force_batch_false_when_active_idle_budget_remains_and_others_are_busy() {
    use crate::status::StatusCounters;
    let registry = StatusRegistry::new();
    let busy = StatusCounters::new(true);
    busy.internal_pool_counter().fetch_add(1, std::sync::atomic::Ordering::SeqCst);
    registry.register("other_module", busy);

    assert!(!force_batch(
        Duration::ZERO,
        Duration::from_secs(10),
        ScanStatus::Running,
        &registry,
    ));
}
