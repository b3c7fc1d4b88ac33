use super::*;
use scanmod_core::EventBuilder;

struct AlwaysAccept;
#[async_trait::async_trait]
impl ModuleHandlers for AlwaysAccept {}

struct AlwaysReject;
#[async_trait::async_trait]
impl ModuleHandlers for AlwaysReject {
    fn filter_event(&self, _event: &Event) -> bool {
        false
    }
}

struct PanicsOnFilter;
#[async_trait::async_trait]
impl ModuleHandlers for PanicsOnFilter {
    fn filter_event(&self, _event: &Event) -> bool {
        panic!("custom predicate exploded")
    }
}

fn event() -> Event {
    EventBuilder::new("DNS_NAME", "producer").build().unwrap()
}

#[test]
fn default_predicate_accepts() {
    assert!(call_filter_event_fail_open(&AlwaysAccept, &event()));
}

#[test]
fn custom_predicate_rejection_is_honored() {
    assert!(!call_filter_event_fail_open(&AlwaysReject, &event()));
}

#[test]
fn panicking_predicate_fails_open() {
    assert!(call_filter_event_fail_open(&PanicsOnFilter, &event()));
}
