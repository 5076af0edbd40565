// Copyright (c) The flake-bisect Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Building test runner command lines.

use crate::{config::RunnerConfig, errors::RunError, location::SpecLocation};
use camino::{Utf8Path, Utf8PathBuf};
use std::process::Command;
use tracing::{debug, trace};

/// How to invoke the test runner for a project.
#[derive(Clone, Debug)]
pub struct TestCommand {
    config: RunnerConfig,
    dir: Utf8PathBuf,
}

impl TestCommand {
    /// Creates a new `TestCommand` that runs from the project root `dir`.
    pub fn new(config: &RunnerConfig, dir: impl Into<Utf8PathBuf>) -> Self {
        Self {
            config: config.clone(),
            dir: dir.into(),
        }
    }

    /// Builds the invocation that runs `others` followed by `target`.
    ///
    /// The target is always the last location on the command line, so that it runs after
    /// everything else in the runner's default ordering. If `tty` is true, the arguments that
    /// make the runner emit progress characters to a terminal are appended.
    pub fn invocation(
        &self,
        others: &[SpecLocation],
        target: &SpecLocation,
        tty: bool,
    ) -> TestInvocation {
        let (program, leading) = self
            .config
            .command
            .split_first()
            .expect("runner.command is checked to be non-empty while loading config");

        let mut args = leading.to_vec();
        args.extend(others.iter().map(|location| location.to_string()));
        args.push(target.to_string());
        args.extend(self.config.format_args.iter().cloned());
        if tty {
            args.extend(self.config.tty_args.iter().cloned());
        }

        TestInvocation {
            program: program.clone(),
            args,
            dir: self.dir.clone(),
        }
    }
}

/// A single, fully-specified run of the test runner.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TestInvocation {
    program: String,
    args: Vec<String>,
    dir: Utf8PathBuf,
}

impl TestInvocation {
    /// Returns the program.
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Returns the arguments passed to the program.
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Returns the working directory.
    pub fn dir(&self) -> &Utf8Path {
        &self.dir
    }

    /// Returns the command line, quoted so that it can be pasted into a shell.
    pub fn display(&self) -> String {
        shell_words::join(std::iter::once(&self.program).chain(&self.args))
    }

    /// Converts the invocation to a [`duct::Expression`].
    pub fn to_expression(&self) -> duct::Expression {
        duct::cmd(self.program.as_str(), self.args.iter().map(|arg| &**arg))
            .dir(self.dir.as_std_path())
    }

    /// Converts the invocation to a [`std::process::Command`], with no stdio configured.
    pub fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args).current_dir(&self.dir);
        cmd
    }

    /// Runs the invocation to completion with stdin closed, capturing stdout and stderr together.
    ///
    /// A non-zero exit is reported through [`CapturedRun::success`], not as an error.
    pub fn run_captured(&self) -> Result<CapturedRun, RunError> {
        let expression = self.to_expression();
        trace!("executing command: {:?}", expression);

        let output = expression
            .stdin_null()
            .stderr_to_stdout()
            .stdout_capture()
            .unchecked()
            .run()
            .map_err(|error| RunError::Spawn {
                command: self.display(),
                error,
            })?;

        debug!("`{}` exited with {}", self.display(), output.status);
        Ok(CapturedRun {
            success: output.status.success(),
            output: output.stdout,
        })
    }
}

/// The output of [`TestInvocation::run_captured`].
#[derive(Clone, Debug)]
pub struct CapturedRun {
    /// True if the runner exited with status 0.
    pub success: bool,

    /// Combined stdout and stderr.
    pub output: Vec<u8>,
}
