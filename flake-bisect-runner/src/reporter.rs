// Copyright (c) The flake-bisect Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Progress snapshots and bisection events.
//!
//! A monitored run sends [`ProgressSnapshot`]s to a [`ProgressSink`], which
//! [`ProgressBarDisplay`] renders as a terminal progress bar. The search itself reports what it
//! is doing through [`BisectEvent`]s.

mod events;
mod progress;

pub use events::*;
pub use progress::*;

use crate::runner::UnitKind;

/// The state of a monitored run at a point in time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProgressSnapshot {
    /// Units counted so far. May exceed `total`, since counting is a heuristic.
    pub completed: usize,

    /// The approximate number of units the run will complete.
    pub total: usize,

    /// What is being counted.
    pub kind: UnitKind,
}

/// Receives progress while a monitored run executes.
pub trait ProgressSink {
    /// Called periodically, and whenever a unit completes.
    fn snapshot(&mut self, snapshot: ProgressSnapshot);

    /// Called once the run has ended. The next snapshot, if any, belongs to a new run.
    fn finish(&mut self);
}
