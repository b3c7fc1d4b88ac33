use super::*;
use scanmod_adapters::FakeScanHandle;

#[tokio::test]
async fn emits_and_tracks_in_flight_permits() {
    let scan = FakeScanHandle::new();
    let gate = EmissionGate::new(2);
    assert_eq!(gate.remaining_permits(), 2);

    let outcome = gate
        .emit(&scan, "httpx", EventRequest::new("URL"), EmitOptions::default())
        .await;
    assert!(matches!(outcome, EmitOutcome::Emitted));
    assert_eq!(gate.in_flight(), 1);
    assert_eq!(scan.emitted_count(), 1);
}

#[tokio::test]
async fn skips_emission_when_scan_is_stopping() {
    let scan = FakeScanHandle::new();
    scan.set_stopping(true);
    let gate = EmissionGate::new(2);

    let outcome = gate
        .emit(&scan, "httpx", EventRequest::new("URL"), EmitOptions::default())
        .await;
    assert!(matches!(outcome, EmitOutcome::Skipped));
    assert_eq!(gate.remaining_permits(), 2);
    assert_eq!(scan.emitted_count(), 0);
}

#[tokio::test]
async fn skips_emission_on_validation_failure() {
    let scan = FakeScanHandle::new();
    let gate = EmissionGate::new(2);

    let outcome = gate
        .emit(&scan, "httpx", EventRequest::new(""), EmitOptions::default())
        .await;
    assert!(matches!(outcome, EmitOutcome::Skipped));
    assert_eq!(gate.remaining_permits(), 2);
}

#[tokio::test]
async fn failed_handoff_releases_the_permit_it_acquired() {
    let scan = FakeScanHandle::new();
    scan.set_emit_failure(true);
    let gate = EmissionGate::new(1);

    let outcome = gate
        .emit(&scan, "httpx", EventRequest::new("URL"), EmitOptions::default())
        .await;
    assert!(matches!(outcome, EmitOutcome::Failed(_)));
    assert_eq!(gate.remaining_permits(), 1);
}

#[tokio::test]
async fn backpressure_blocks_beyond_capacity_until_a_permit_is_released() {
    let scan = FakeScanHandle::new();
    let gate = EmissionGate::new(2);

    for i in 0..2 {
        let outcome = gate
            .emit(&scan, "httpx", EventRequest::new(format!("URL{i}")), EmitOptions::default())
            .await;
        assert!(matches!(outcome, EmitOutcome::Emitted));
    }
    assert_eq!(gate.remaining_permits(), 0);

    // A third attempt would block forever on a real (non-stopping) scan;
    // simulate the downstream consumer catching up by releasing one event,
    // which drops its gate permit.
    scan.release_one_emitted();
    assert_eq!(gate.remaining_permits(), 1);

    let outcome = gate
        .emit(&scan, "httpx", EventRequest::new("URL2"), EmitOptions::default())
        .await;
    assert!(matches!(outcome, EmitOutcome::Emitted));
    assert_eq!(gate.remaining_permits(), 0);
}
