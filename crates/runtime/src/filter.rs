// SPDX-License-Identifier: MIT

//! Two-phase acceptance filter (SPEC_FULL.md §4.3).

use scanmod_core::{ControlToken, Event, ModuleConfig, QueueItem};

/// Why an item was rejected by the acceptance filter. Carries the message
/// the source logs at debug/warning level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectReason(pub String);

impl RejectReason {
    fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Evaluates one module's acceptance policy against incoming queue items.
///
/// Control tokens never reach this filter as loose strings: invalid wire
/// values are rejected by [`ControlToken::from_wire`] at the orchestrator
/// boundary before an item is ever constructed, which is this filter's
/// Rust-native equivalent of the pre-check's "invalid string value" rule.
pub struct AcceptanceFilter<'a> {
    config: &'a ModuleConfig,
    module_name: &'a str,
}

impl<'a> AcceptanceFilter<'a> {
    pub fn new(config: &'a ModuleConfig, module_name: &'a str) -> Self {
        Self {
            config,
            module_name,
        }
    }

    /// Pre-resolution checks: watched types, `target_only`, and the
    /// speculation-collision rule. Safe to run before scope distance is
    /// resolved.
    pub fn pre_check(&self, item: &QueueItem) -> Result<(), RejectReason> {
        let event = match item {
            QueueItem::Token(ControlToken::Finish | ControlToken::Report) => return Ok(()),
            QueueItem::Event(event) => event,
        };

        if !self.config.watches(event.event_type()) {
            return Err(RejectReason::new("its type is not in watched_events"));
        }

        if self.config.target_only && !event.tags().contains("target") {
            return Err(RejectReason::new(
                "target_only is set and event is not a target",
            ));
        }

        if self.is_speculation_collision(event) {
            return Err(RejectReason::new("module consumes IP ranges directly"));
        }

        Ok(())
    }

    fn is_speculation_collision(&self, event: &Event) -> bool {
        let Some(source) = event.source() else {
            return false;
        };
        source.event_type() == "IP_RANGE"
            && event.event_type() == "IP_ADDRESS"
            && event.producer() == "speculate"
            && self.module_name != "speculate"
            && self.config.watches("IP_RANGE")
            && self.config.watches("IP_ADDRESS")
    }

    /// Post-resolution checks: `in_scope_only`, the scope-distance cap, and
    /// the module's custom predicate. Skipped entirely for control tokens.
    ///
    /// `custom_predicate` should already have applied the fail-open panic
    /// policy documented on [`crate::capability::ModuleHandlers::filter_event`];
    /// this function just treats a `false` return as a rejection.
    pub fn post_check(
        &self,
        event: &Event,
        scope_search_distance: i32,
        custom_predicate: bool,
    ) -> Result<(), RejectReason> {
        if self.config.in_scope_only && event.scope_distance() > 0 {
            return Err(RejectReason::new(
                "in_scope_only is set and event is out of scope",
            ));
        }

        if self.config.scope_distance_modifier.is_some() {
            // Gated on the modifier itself, not on `max_scope_distance()`
            // returning `Some`: a `target_only`/`in_scope_only` module with
            // `scope_distance_modifier = None` must skip this block
            // entirely (SPEC_FULL.md §3), and `max_scope_distance()` only
            // returns `None` in that same case, so this `unwrap_or` never
            // actually falls back.
            let max_distance = self
                .config
                .max_scope_distance(scope_search_distance)
                .unwrap_or(0);
            if event.scope_distance() < 0 {
                return Err(RejectReason::new("scope distance is not yet resolved"));
            }
            if event.scope_distance() > max_distance {
                return Err(RejectReason::new(
                    "its scope distance exceeds the maximum allowed",
                ));
            }
        }

        if !custom_predicate {
            return Err(RejectReason::new("rejected by module's filter_event"));
        }

        Ok(())
    }
}

#[cfg(test)]
#[path = "filter_tests.rs"]
mod tests;
