// SPDX-License-Identifier: MIT

//! Per-module declared configuration (SPEC_FULL.md §3, §6).

use std::collections::HashSet;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Distinguishes modules whose handlers must serialize emission on the
/// worker loop itself (to preserve strict FIFO output ordering) from
/// ordinary modules, whose handlers run on the shared internal pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModuleKind {
    Standard,
    Output,
}

impl Default for ModuleKind {
    fn default() -> Self {
        Self::Standard
    }
}

/// Wildcard watched-event entry meaning "accept every event type".
pub const WATCH_ALL: &str = "*";

/// Declared identity, behavioral flags, and capacity for one module
/// instance. Deserializable directly from the orchestrator's
/// `scan.config["modules"][name]` option map.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModuleConfig {
    pub name: String,
    pub kind: ModuleKind,
    /// Raw configured priority; use [`ModuleConfig::priority`] to read the
    /// clamped [1,5] value.
    pub priority: i32,
    pub watched_events: HashSet<String>,
    pub produced_events: HashSet<String>,
    pub accept_dupes: bool,
    pub suppress_dupes: bool,
    pub target_only: bool,
    pub in_scope_only: bool,
    /// `None` disables the scope-distance cap entirely (sentinel-none).
    pub scope_distance_modifier: Option<i32>,
    pub scope_shepherding: bool,
    pub max_event_handlers: usize,
    pub max_threads: usize,
    pub batch_size: usize,
    #[serde(with = "duration_secs")]
    pub batch_wait: Duration,
    pub outgoing_gate_capacity: usize,
    pub auth_required: bool,
    pub description: Option<String>,
}

impl Default for ModuleConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            kind: ModuleKind::Standard,
            priority: 3,
            watched_events: HashSet::new(),
            produced_events: HashSet::new(),
            accept_dupes: false,
            suppress_dupes: true,
            target_only: false,
            in_scope_only: false,
            scope_distance_modifier: Some(-1),
            scope_shepherding: true,
            max_event_handlers: 1,
            max_threads: 10,
            batch_size: 1,
            batch_wait: Duration::from_secs(10),
            outgoing_gate_capacity: 100,
            auth_required: false,
            description: None,
        }
    }
}

impl ModuleConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Priority clamped to `[1, 5]`, 1 being highest (SPEC_FULL.md §3).
    pub fn priority(&self) -> u8 {
        self.priority.clamp(1, 5) as u8
    }

    /// Whether this module watches `event_type` (including the `"*"` wildcard).
    pub fn watches(&self, event_type: &str) -> bool {
        self.watched_events.contains(WATCH_ALL) || self.watched_events.contains(event_type)
    }

    /// `max_scope_distance` per SPEC_FULL.md §3: `None` when
    /// `scope_distance_modifier` is the sentinel-none — the scope-distance
    /// cap is disabled entirely, regardless of `in_scope_only`/
    /// `target_only` — else `0` if `in_scope_only` or `target_only`, else
    /// `max(0, scope_search_distance + modifier)`.
    pub fn max_scope_distance(&self, scope_search_distance: i32) -> Option<i32> {
        let modifier = self.scope_distance_modifier?;
        if self.in_scope_only || self.target_only {
            return Some(0);
        }
        Some(std::cmp::max(0, scope_search_distance + modifier))
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = u64::deserialize(d)?;
        Ok(Duration::from_secs(secs))
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
