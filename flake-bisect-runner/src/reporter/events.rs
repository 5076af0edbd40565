// Copyright (c) The flake-bisect Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{
    location::SpecLocation,
    runner::{RunResult, UnitKind},
};
use std::{fmt, time::Duration};

/// A bisection event.
///
/// Events are produced by a [`Bisector`](crate::bisect::Bisector) and the
/// [`Minimizer`](crate::minimize::Minimizer), in the order the steps happen.
#[derive(Clone, Debug)]
pub enum BisectEvent<'a> {
    /// The target is about to be run alone.
    IsolationStarted {
        /// The target.
        target: &'a SpecLocation,
    },

    /// The isolation run finished.
    IsolationFinished {
        /// The result of running the target alone.
        result: &'a RunResult,
    },

    /// The target's file has no other test cases, so the co-location run was skipped.
    CoLocationSkipped,

    /// The target is about to be run with every other test case in its file.
    CoLocationStarted {
        /// The other test cases, in the order they are run.
        siblings: &'a [SpecLocation],
    },

    /// The co-location run finished.
    CoLocationFinished {
        /// True if the run failed, meaning the culprit is in the target's own file.
        reproduced: bool,
    },

    /// A search phase started.
    SearchStarted {
        /// What is being searched.
        scope: SearchScope<'a>,

        /// The number of candidates.
        candidate_count: usize,
    },

    /// A probe is about to run the target with half of the remaining candidates.
    ProbeStarted {
        /// Which half.
        half: Half,

        /// The number of candidates in the half.
        count: usize,

        /// What the candidates are.
        kind: UnitKind,
    },

    /// A probe finished.
    ProbeFinished {
        /// Which half.
        half: Half,

        /// True if the target failed, meaning the culprit is in this half.
        reproduced: bool,

        /// How long the probe took.
        elapsed: Duration,
    },

    /// Neither half reproduced the failure on its own, so the search gave up.
    NeitherHalfReproduced {
        /// The number of candidates still in play.
        remaining: usize,
    },

    /// The file-level search found a file.
    CulpritFileFound {
        /// The file.
        file: &'a SpecLocation,
    },
}

/// What a search phase is searching over.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SearchScope<'a> {
    /// Every test file other than the target's.
    Files,

    /// The test cases in a single file.
    Cases {
        /// The file.
        file: &'a SpecLocation,
    },
}

impl SearchScope<'_> {
    /// Returns the kind of unit this scope contains.
    pub fn unit_kind(&self) -> UnitKind {
        match self {
            Self::Files => UnitKind::Files,
            Self::Cases { .. } => UnitKind::Cases,
        }
    }
}

/// One half of a candidate range.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Half {
    /// The first `⌊n/2⌋` candidates.
    Left,

    /// The remaining `⌈n/2⌉` candidates.
    Right,
}

impl fmt::Display for Half {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Left => f.write_str("left"),
            Self::Right => f.write_str("right"),
        }
    }
}
