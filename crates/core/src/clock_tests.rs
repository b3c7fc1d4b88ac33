use super::*;

#[test]
fn system_clock_advances_on_its_own() {
    let clock = SystemClock;
    let t0 = clock.now();
    std::thread::sleep(Duration::from_millis(5));
    assert!(clock.now() > t0);
}

#[test]
fn fake_clock_only_advances_when_told() {
    let clock = FakeClock::new();
    let t0 = clock.now();
    assert_eq!(clock.now(), t0);
    clock.advance(Duration::from_secs(1));
    assert_eq!(clock.now(), t0 + Duration::from_secs(1));
}

#[test]
fn fake_clock_clone_shares_offset() {
    let clock = FakeClock::new();
    let clone = clock.clone();
    clock.advance(Duration::from_millis(250));
    assert_eq!(clock.now(), clone.now());
}
