// SPDX-License-Identifier: MIT

//! Control tokens: in-band lifecycle signals carried on a module's incoming
//! queue alongside events.
//!
//! Per SPEC_FULL.md REDESIGN FLAGS, the source's string sentinels
//! (`"FINISHED"` / `"REPORT"` mixed into an otherwise-typed queue) are
//! re-architected as a closed enum. The wire values are preserved for
//! compatibility at the orchestrator boundary via [`ControlToken::to_wire`]
//! and [`ControlToken::from_wire`].

use crate::Event;

/// A lifecycle signal travelling through a module's incoming queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlToken {
    /// Requests the module's `finish()` hook. May be observed more than
    /// once per scan, because `finish()` may itself emit events that cause
    /// further upstream work.
    Finish,
    /// Requests the module's `report()` hook. Expected once near end of scan.
    Report,
}

impl ControlToken {
    /// The literal wire value recognized at the orchestrator boundary.
    pub const FINISHED_WIRE: &'static str = "FINISHED";
    /// The literal wire value recognized at the orchestrator boundary.
    pub const REPORT_WIRE: &'static str = "REPORT";

    /// Parses a wire string into a control token. Any other string value is
    /// rejected (per the acceptance filter's pre-check, "invalid string
    /// value").
    pub fn from_wire(s: &str) -> Option<Self> {
        match s {
            Self::FINISHED_WIRE => Some(Self::Finish),
            Self::REPORT_WIRE => Some(Self::Report),
            _ => None,
        }
    }

    /// The wire value for this token.
    pub fn to_wire(self) -> &'static str {
        match self {
            Self::Finish => Self::FINISHED_WIRE,
            Self::Report => Self::REPORT_WIRE,
        }
    }
}

impl std::fmt::Display for ControlToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_wire())
    }
}

/// An item flowing through a module's incoming queue: either a produced
/// event, or a control token requesting a lifecycle transition.
#[derive(Debug)]
pub enum QueueItem {
    Event(Event),
    Token(ControlToken),
}

impl From<Event> for QueueItem {
    fn from(event: Event) -> Self {
        Self::Event(event)
    }
}

impl From<ControlToken> for QueueItem {
    fn from(token: ControlToken) -> Self {
        Self::Token(token)
    }
}

#[cfg(test)]
#[path = "token_tests.rs"]
mod tests;
