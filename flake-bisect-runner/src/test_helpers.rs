// Copyright (c) The flake-bisect Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fakes shared by unit tests.

use crate::{
    discovery::CandidateSource,
    errors::{DiscoveryError, RunError},
    location::SpecLocation,
    runner::{Probe, ProgressRequest, RunResult},
};
use camino::Utf8Path;
use std::{collections::BTreeMap, num::NonZeroU32};

pub(crate) fn case(path: &str, line: u32) -> SpecLocation {
    SpecLocation::case(path, NonZeroU32::new(line).expect("non-zero line"))
}

pub(crate) fn files(count: usize) -> Vec<SpecLocation> {
    (0..count)
        .map(|idx| SpecLocation::file(format!("spec/f{idx:03}_spec.rb")))
        .collect()
}

/// A single call to [`FakeProbe::run`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct ProbeCall {
    pub(crate) others: Vec<SpecLocation>,
    pub(crate) progress: Option<ProgressRequest>,
}

type Reproduces = dyn Fn(&[SpecLocation]) -> bool;

/// A probe whose verdict is computed from the set of other locations.
pub(crate) struct FakeProbe {
    reproduces: Box<Reproduces>,
    pub(crate) calls: Vec<ProbeCall>,
}

impl FakeProbe {
    pub(crate) fn new(reproduces: impl Fn(&[SpecLocation]) -> bool + 'static) -> Self {
        Self {
            reproduces: Box::new(reproduces),
            calls: Vec::new(),
        }
    }

    /// The target fails whenever `culprit` runs before it.
    pub(crate) fn poisoned_by(culprit: SpecLocation) -> Self {
        Self::new(move |others| others.contains(&culprit))
    }

    /// The target fails only if every one of `culprits` runs before it.
    pub(crate) fn poisoned_jointly_by(culprits: Vec<SpecLocation>) -> Self {
        Self::new(move |others| culprits.iter().all(|culprit| others.contains(culprit)))
    }

    pub(crate) fn always_fails() -> Self {
        Self::new(|_| true)
    }

    pub(crate) fn never_fails() -> Self {
        Self::new(|_| false)
    }
}

impl Probe for FakeProbe {
    fn run(
        &mut self,
        others: &[SpecLocation],
        progress: Option<ProgressRequest>,
    ) -> Result<RunResult, RunError> {
        self.calls.push(ProbeCall {
            others: others.to_vec(),
            progress,
        });
        let reproduced = (self.reproduces)(others);
        Ok(RunResult {
            success: !reproduced,
            output: if reproduced {
                "F".to_owned()
            } else {
                ".".to_owned()
            },
            command: self.command_line(others),
        })
    }

    fn command_line(&self, others: &[SpecLocation]) -> String {
        let mut words: Vec<String> = vec!["rspec".to_owned()];
        words.extend(others.iter().map(ToString::to_string));
        words.push("<target>".to_owned());
        words.join(" ")
    }
}

/// An in-memory project.
#[derive(Default)]
pub(crate) struct FakeSource {
    pub(crate) files: Vec<SpecLocation>,
    pub(crate) cases: BTreeMap<String, Vec<SpecLocation>>,
}

impl FakeSource {
    pub(crate) fn with_cases(mut self, file: &str, lines: &[u32]) -> Self {
        self.cases.insert(
            file.to_owned(),
            lines.iter().map(|&line| case(file, line)).collect(),
        );
        self
    }
}

impl CandidateSource for FakeSource {
    fn test_files(&self) -> Result<Vec<SpecLocation>, DiscoveryError> {
        Ok(self.files.clone())
    }

    fn test_cases(&self, file: &Utf8Path) -> Result<Vec<SpecLocation>, DiscoveryError> {
        Ok(self.cases.get(file.as_str()).cloned().unwrap_or_default())
    }
}
