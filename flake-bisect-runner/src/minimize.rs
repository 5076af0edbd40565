// Copyright (c) The flake-bisect Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Binary search for the candidate that makes the target fail.
//!
//! The search relies on a monotonicity assumption: a candidate that breaks the target does so no
//! matter which other harmless candidates run alongside it. Real shared-state bugs can violate
//! this, for example when the effect depends on how many tests ran or how long they took. When it
//! does not hold the search may find nothing, or a candidate that is only part of the story.

use crate::{
    errors::RunError,
    location::SpecLocation,
    reporter::{BisectEvent, Half},
    runner::{Probe, ProgressRequest, UnitKind},
};
use std::time::Instant;
use tracing::debug;

/// Counters describing the work a [`Minimizer`] has done.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MinimizeStats {
    /// The number of times the candidate range was split. At most `⌈log2 n⌉`.
    pub levels: usize,

    /// The number of probes run. At most two per level.
    pub probes: usize,
}

/// Narrows a candidate set down to the single candidate that makes the target fail.
#[derive(Debug)]
pub struct Minimizer<'a, P: ?Sized> {
    probe: &'a mut P,
    kind: UnitKind,
    stats: MinimizeStats,
}

impl<'a, P: Probe + ?Sized> Minimizer<'a, P> {
    /// Creates a new minimizer over candidates of the given kind.
    pub fn new(probe: &'a mut P, kind: UnitKind) -> Self {
        Self {
            probe,
            kind,
            stats: MinimizeStats::default(),
        }
    }

    /// Returns counters for the searches run so far.
    pub fn stats(&self) -> MinimizeStats {
        self.stats
    }

    /// Finds the candidate that makes the target fail.
    ///
    /// The caller must already know that running the target after all of `candidates` fails.
    /// The candidates are split into a left half of `⌊n/2⌋` and a right half of the rest. The left
    /// half is probed first, then the right half if the left one passed, and the search continues
    /// in the first half that failed. Returns `None` if neither half fails on its own, which
    /// points to several candidates interacting or to something nondeterministic.
    ///
    /// A single candidate is returned without running anything.
    pub fn minimize<F>(
        &mut self,
        candidates: &[SpecLocation],
        callback: &mut F,
    ) -> Result<Option<SpecLocation>, RunError>
    where
        F: FnMut(BisectEvent<'_>),
    {
        let (mut start, mut end) = (0, candidates.len());

        loop {
            let remaining = end - start;
            match remaining {
                0 => return Ok(None),
                1 => return Ok(Some(candidates[start].clone())),
                _ => {}
            }

            self.stats.levels += 1;
            let mid = start + remaining / 2;
            debug!(
                "bisecting {remaining} {}: [{start}, {mid}) and [{mid}, {end})",
                self.kind
            );

            if self.probe_half(Half::Left, &candidates[start..mid], callback)? {
                end = mid;
            } else if self.probe_half(Half::Right, &candidates[mid..end], callback)? {
                start = mid;
            } else {
                callback(BisectEvent::NeitherHalfReproduced { remaining });
                return Ok(None);
            }
        }
    }

    /// Runs the target after `half`, returning true if it failed.
    fn probe_half<F>(
        &mut self,
        half: Half,
        candidates: &[SpecLocation],
        callback: &mut F,
    ) -> Result<bool, RunError>
    where
        F: FnMut(BisectEvent<'_>),
    {
        callback(BisectEvent::ProbeStarted {
            half,
            count: candidates.len(),
            kind: self.kind,
        });

        let start = Instant::now();
        let result = self.probe.run(
            candidates,
            Some(ProgressRequest {
                // The target is one more unit.
                total: candidates.len() + 1,
                kind: self.kind,
            }),
        )?;
        self.stats.probes += 1;

        let reproduced = !result.success;
        callback(BisectEvent::ProbeFinished {
            half,
            reproduced,
            elapsed: start.elapsed(),
        });
        Ok(reproduced)
    }
}
