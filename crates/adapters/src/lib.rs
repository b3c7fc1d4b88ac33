// SPDX-License-Identifier: MIT

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! scanmod-adapters: the orchestrator-facing contract.
//!
//! Everything the module runtime consumes from the scan orchestrator
//! (SPEC_FULL.md §6, "Consumed from the orchestrator/scan") is captured in
//! the [`ScanHandle`] trait, mirroring the teacher repo's
//! `SessionAdapter`/`AgentAdapter` pattern: the runtime is generic over an
//! implementation of this trait, and the orchestrator itself (out of scope
//! for this core) is the real implementation. A `FakeScanHandle` is
//! provided under `test-support` for unit and scenario tests.

mod scan_handle;

pub use scan_handle::{EmitError, EmitOptions, EventRequest, ScanHandle, ScanStatus};

#[cfg(any(test, feature = "test-support"))]
mod fake;

#[cfg(any(test, feature = "test-support"))]
pub use fake::{EmitCall, FakeScanHandle};
