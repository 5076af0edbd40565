// Copyright (c) The flake-bisect Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Running the test runner on a set of locations.
//!
//! Every run executes a set of other locations followed by the target. The main structure in this
//! module is [`ProcessRunner`], which does this by spawning the configured command. Runs that ask
//! for progress are monitored through a pseudo-terminal on Unix; see [`StreamingProgressMonitor`].

mod classify;
#[cfg(unix)]
mod monitor;

pub use classify::*;
#[cfg(unix)]
pub use monitor::*;

use crate::{
    config::ProgressConfig,
    errors::RunError,
    location::SpecLocation,
    reporter::{ProgressSink, ProgressSnapshot},
    test_command::{TestCommand, TestInvocation},
};
use std::fmt;
use tracing::debug;

/// What a progress display counts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UnitKind {
    /// Whole test files.
    Files,

    /// Individual test cases.
    Cases,
}

impl UnitKind {
    /// Returns the label shown next to the count.
    pub fn label(self) -> &'static str {
        match self {
            Self::Files => "files",
            Self::Cases => "specs",
        }
    }
}

impl fmt::Display for UnitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A request to display progress while a run executes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProgressRequest {
    /// The approximate number of units the run will complete.
    pub total: usize,

    /// What to count.
    pub kind: UnitKind,
}

impl ProgressRequest {
    /// Returns a snapshot for this request with `completed` units done.
    pub fn snapshot(&self, completed: usize) -> ProgressSnapshot {
        ProgressSnapshot {
            completed,
            total: self.total,
            kind: self.kind,
        }
    }
}

/// The outcome of a single run of the test runner.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunResult {
    /// True if the runner exited with status 0.
    pub success: bool,

    /// Everything the runner wrote to stdout and stderr, lossily decoded.
    pub output: String,

    /// The command line that was run.
    pub command: String,
}

/// Runs the target together with a set of other locations and reports whether that passed.
///
/// This is the seam between the search and the outside world: [`ProcessRunner`] is the real
/// implementation, and tests substitute fakes.
pub trait Probe {
    /// Runs `others` followed by the target.
    ///
    /// `others` must not contain the target. If `progress` is set and the implementation supports
    /// it, completed units are reported while the run executes.
    fn run(
        &mut self,
        others: &[SpecLocation],
        progress: Option<ProgressRequest>,
    ) -> Result<RunResult, RunError>;

    /// Returns the command line that would run `others` followed by the target.
    fn command_line(&self, others: &[SpecLocation]) -> String;
}

/// Runs the target by spawning the test runner.
pub struct ProcessRunner {
    command: TestCommand,
    target: SpecLocation,
    progress: ProgressConfig,
    sink: Option<Box<dyn ProgressSink>>,
}

impl ProcessRunner {
    /// Creates a new runner for `target`.
    ///
    /// If `sink` is `None`, progress requests are ignored and every run is captured synchronously.
    pub fn new(
        command: TestCommand,
        target: SpecLocation,
        progress: ProgressConfig,
        sink: Option<Box<dyn ProgressSink>>,
    ) -> Self {
        Self {
            command,
            target,
            progress,
            sink,
        }
    }

    fn run_captured(invocation: &TestInvocation) -> Result<RunResult, RunError> {
        let captured = invocation.run_captured()?;
        Ok(RunResult {
            success: captured.success,
            output: String::from_utf8_lossy(&captured.output).into_owned(),
            command: invocation.display(),
        })
    }
}

impl fmt::Debug for ProcessRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessRunner")
            .field("command", &self.command)
            .field("target", &self.target)
            .field("progress", &self.progress)
            .field("sink", &self.sink.is_some())
            .finish()
    }
}

impl Probe for ProcessRunner {
    fn run(
        &mut self,
        others: &[SpecLocation],
        progress: Option<ProgressRequest>,
    ) -> Result<RunResult, RunError> {
        debug_assert!(
            !others.contains(&self.target),
            "the target must not be passed as one of the other locations"
        );

        match (progress, self.sink.as_deref_mut()) {
            (Some(request), Some(sink)) => {
                let invocation = self.command.invocation(others, &self.target, true);
                debug!("running with progress: {}", invocation.display());
                run_with_progress(&invocation, &self.progress, request, sink)
            }
            _ => {
                let invocation = self.command.invocation(others, &self.target, false);
                debug!("running: {}", invocation.display());
                Self::run_captured(&invocation)
            }
        }
    }

    fn command_line(&self, others: &[SpecLocation]) -> String {
        self.command
            .invocation(others, &self.target, false)
            .display()
    }
}

cfg_if::cfg_if! {
    if #[cfg(unix)] {
        fn run_with_progress(
            invocation: &TestInvocation,
            config: &ProgressConfig,
            request: ProgressRequest,
            sink: &mut dyn ProgressSink,
        ) -> Result<RunResult, RunError> {
            StreamingProgressMonitor::new(config, request, sink).run(invocation)
        }
    } else {
        fn run_with_progress(
            invocation: &TestInvocation,
            _config: &ProgressConfig,
            _request: ProgressRequest,
            _sink: &mut dyn ProgressSink,
        ) -> Result<RunResult, RunError> {
            debug!("progress monitoring requires a pseudo-terminal, running without it");
            ProcessRunner::run_captured(invocation)
        }
    }
}
