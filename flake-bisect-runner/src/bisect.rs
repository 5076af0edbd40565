// Copyright (c) The flake-bisect Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The full search for the test that breaks a target.
//!
//! The main structure in this module is [`Bisector`], which runs these steps in order:
//!
//! 1. Run the target alone. If that fails, stop: the target is broken by itself.
//! 2. Run the target after every other case in its own file. If that fails, the culprit is one
//!    of those cases; search them and stop.
//! 3. Search every other test file for one that makes the target fail.
//! 4. Search the cases in that file.

use crate::{
    discovery::CandidateSource,
    errors::BisectError,
    location::SpecLocation,
    minimize::Minimizer,
    reporter::{BisectEvent, SearchScope},
    runner::{Probe, RunResult, UnitKind},
    verify::{self, CoLocation},
};
use tracing::debug;

/// The verdict of a bisection.
///
/// None of these is an error: each one is a complete answer to report.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BisectOutcome {
    /// The target fails even when run alone.
    FailsInIsolation {
        /// The result of running the target alone.
        result: RunResult,
    },

    /// The test case that makes the target fail.
    Found {
        /// The culprit.
        culprit: SpecLocation,
    },

    /// No single other test file makes the target fail.
    NoCulpritFile,

    /// The target fails after `file`, but no single test case in it makes the target fail.
    NoCulpritCase {
        /// The file that was searched.
        file: SpecLocation,
    },

    /// The target fails after `file`, but no test cases could be found in it.
    NoCasesInFile {
        /// The file.
        file: SpecLocation,
    },

    /// There are no other test files to search.
    NoCandidates,
}

/// Searches for the test case that makes a target fail.
pub struct Bisector<'a, P: ?Sized, S: ?Sized> {
    probe: &'a mut P,
    source: &'a S,
    target: SpecLocation,
}

impl<'a, P, S> Bisector<'a, P, S>
where
    P: Probe + ?Sized,
    S: CandidateSource + ?Sized,
{
    /// Creates a new bisector.
    ///
    /// `probe` must run `target`, and `source` must describe the project `target` belongs to.
    pub fn new(probe: &'a mut P, source: &'a S, target: SpecLocation) -> Self {
        Self {
            probe,
            source,
            target,
        }
    }

    /// Runs the search, reporting each step to `callback`.
    pub fn run<F>(&mut self, mut callback: F) -> Result<BisectOutcome, BisectError>
    where
        F: FnMut(BisectEvent<'_>),
    {
        callback(BisectEvent::IsolationStarted {
            target: &self.target,
        });
        let result = verify::isolation(&mut *self.probe)?;
        callback(BisectEvent::IsolationFinished { result: &result });
        if !result.success {
            return Ok(BisectOutcome::FailsInIsolation { result });
        }

        let target_file = SpecLocation::file(self.target.path());
        let siblings: Vec<_> = self
            .source
            .test_cases(self.target.path())?
            .into_iter()
            .filter(|case| *case != self.target)
            .collect();

        if siblings.is_empty() {
            callback(BisectEvent::CoLocationSkipped);
        } else {
            callback(BisectEvent::CoLocationStarted {
                siblings: &siblings,
            });
        }
        let co_location = verify::co_location(&mut *self.probe, &siblings)?;
        if co_location != CoLocation::Skipped {
            callback(BisectEvent::CoLocationFinished {
                reproduced: co_location.reproduced(),
            });
        }
        if co_location.reproduced() {
            debug!("failure reproduced within {target_file}");
            return self.search_cases(target_file, &siblings, &mut callback);
        }

        let files: Vec<_> = self
            .source
            .test_files()?
            .into_iter()
            .filter(|file| file.path() != self.target.path())
            .collect();
        if files.is_empty() {
            return Ok(BisectOutcome::NoCandidates);
        }

        callback(BisectEvent::SearchStarted {
            scope: SearchScope::Files,
            candidate_count: files.len(),
        });
        let mut minimizer = Minimizer::new(&mut *self.probe, UnitKind::Files);
        let Some(file) = minimizer.minimize(&files, &mut callback)? else {
            return Ok(BisectOutcome::NoCulpritFile);
        };
        debug!("file search: {:?}", minimizer.stats());
        callback(BisectEvent::CulpritFileFound { file: &file });

        let cases = self.source.test_cases(file.path())?;
        if cases.is_empty() {
            return Ok(BisectOutcome::NoCasesInFile { file });
        }
        self.search_cases(file, &cases, &mut callback)
    }

    fn search_cases<F>(
        &mut self,
        file: SpecLocation,
        cases: &[SpecLocation],
        callback: &mut F,
    ) -> Result<BisectOutcome, BisectError>
    where
        F: FnMut(BisectEvent<'_>),
    {
        callback(BisectEvent::SearchStarted {
            scope: SearchScope::Cases { file: &file },
            candidate_count: cases.len(),
        });

        let mut minimizer = Minimizer::new(&mut *self.probe, UnitKind::Cases);
        let found = minimizer.minimize(cases, callback)?;
        debug!("case search in {file}: {:?}", minimizer.stats());

        Ok(match found {
            Some(culprit) => BisectOutcome::Found { culprit },
            None => BisectOutcome::NoCulpritCase { file },
        })
    }
}
