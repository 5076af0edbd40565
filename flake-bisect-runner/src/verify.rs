// Copyright (c) The flake-bisect Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The two checks that run before any search.

use crate::{
    errors::RunError,
    location::SpecLocation,
    runner::{Probe, RunResult},
};
use tracing::debug;

/// Runs the target alone.
///
/// If this fails the target is broken on its own, and searching for a culprit makes no sense.
pub fn isolation<P: Probe + ?Sized>(probe: &mut P) -> Result<RunResult, RunError> {
    let result = probe.run(&[], None)?;
    debug!(
        "isolation run {}",
        if result.success { "passed" } else { "failed" }
    );
    Ok(result)
}

/// The outcome of running the target together with the rest of its file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CoLocation {
    /// The target's file has no other test cases, so nothing was run.
    Skipped,

    /// The run passed: the culprit, if any, is in another file.
    Passed,

    /// The run failed: the culprit is in the target's own file.
    Reproduced,
}

impl CoLocation {
    /// Returns true if the failure was reproduced.
    pub fn reproduced(&self) -> bool {
        matches!(self, Self::Reproduced)
    }
}

/// Runs every test case in `siblings`, then the target.
///
/// `siblings` must not contain the target. If it is empty nothing is run, and the search
/// continues across files.
pub fn co_location<P: Probe + ?Sized>(
    probe: &mut P,
    siblings: &[SpecLocation],
) -> Result<CoLocation, RunError> {
    if siblings.is_empty() {
        debug!("no other cases in the target's file, skipping co-location run");
        return Ok(CoLocation::Skipped);
    }

    let result = probe.run(siblings, None)?;
    Ok(if result.success {
        CoLocation::Passed
    } else {
        CoLocation::Reproduced
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{FakeProbe, case};
    use pretty_assertions::assert_eq;

    #[test]
    fn isolation_runs_target_alone() {
        let mut probe = FakeProbe::never_fails();
        let result = isolation(&mut probe).expect("fake probe does not error");
        assert!(result.success);
        assert_eq!(probe.calls.len(), 1);
        assert!(probe.calls[0].others.is_empty());
        assert_eq!(probe.calls[0].progress, None);
    }

    #[test]
    fn co_location_outcomes() {
        let siblings = vec![case("spec/a_spec.rb", 4), case("spec/a_spec.rb", 20)];

        let mut probe = FakeProbe::never_fails();
        assert_eq!(
            co_location(&mut probe, &[]).expect("no error"),
            CoLocation::Skipped
        );
        assert!(probe.calls.is_empty(), "nothing to run");

        assert_eq!(
            co_location(&mut probe, &siblings).expect("no error"),
            CoLocation::Passed
        );
        assert_eq!(probe.calls[0].others, siblings);

        let mut probe = FakeProbe::poisoned_by(case("spec/a_spec.rb", 20));
        let outcome = co_location(&mut probe, &siblings).expect("no error");
        assert!(outcome.reproduced());
    }
}
