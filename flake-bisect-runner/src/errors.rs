// Copyright (c) The flake-bisect Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Errors produced by flake-bisect.

use camino::Utf8PathBuf;
use std::{io, num::ParseIntError};
use thiserror::Error;

/// An error that occurs while parsing a [`SpecLocation`](crate::location::SpecLocation).
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum SpecLocationParseError {
    /// The input had no `:LINE` suffix, but a line number is required.
    #[error("`{input}` has no line number (expected PATH:LINE)")]
    MissingLine {
        /// The input that failed to parse.
        input: String,
    },

    /// The path portion of the input was empty.
    #[error("`{input}` has an empty path")]
    EmptyPath {
        /// The input that failed to parse.
        input: String,
    },

    /// The line number was not a positive integer.
    #[error("invalid line number `{line}` in `{input}`")]
    InvalidLine {
        /// The input that failed to parse.
        input: String,

        /// The line portion of the input.
        line: String,

        /// The underlying error.
        #[source]
        err: ParseIntError,
    },
}

/// An error that occurred while loading configuration.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// An explicitly requested config file does not exist.
    #[error("config file not found at {path}")]
    FileNotFound {
        /// The path that was requested.
        path: Utf8PathBuf,
    },

    /// A config file could not be read.
    #[error("failed to read config file {path}")]
    Read {
        /// The config file.
        path: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: io::Error,
    },

    /// A config file could not be parsed as TOML of the expected shape.
    #[error("failed to parse config file {path}")]
    Parse {
        /// The config file.
        path: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: toml::de::Error,
    },

    /// A progress marker was not exactly one ASCII character.
    #[error("in config file {path}, `progress.{key}` must be a single ASCII character, found `{value}`")]
    InvalidMarker {
        /// The config file.
        path: Utf8PathBuf,

        /// The offending key.
        key: &'static str,

        /// The offending value.
        value: String,
    },

    /// The file pattern was not a valid regular expression.
    #[error("in config file {path}, `progress.file-pattern` is not a valid regex")]
    InvalidFilePattern {
        /// The config file.
        path: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: regex::Error,
    },

    /// The runner command was empty.
    #[error("in config file {path}, `runner.command` must not be empty")]
    EmptyCommand {
        /// The config file.
        path: Utf8PathBuf,
    },
}

/// An error that occurred while locating the project or enumerating its tests.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DiscoveryError {
    /// The target file does not exist or could not be resolved.
    #[error("target file not found: {path}")]
    TargetNotFound {
        /// The path as given.
        path: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: io::Error,
    },

    /// No ancestor of the target file contains the root marker.
    #[error("could not find a project root (a directory containing `{marker}`) above {start}")]
    ProjectRootNotFound {
        /// The directory the search started from.
        start: Utf8PathBuf,

        /// The marker file name that was searched for.
        marker: String,
    },

    /// The test directory could not be walked.
    #[error("failed to walk test directory {dir}")]
    WalkDir {
        /// The test directory.
        dir: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: walkdir::Error,
    },

    /// A path under the test directory was not valid UTF-8.
    #[error("test file path is not valid UTF-8")]
    NonUtf8Path {
        /// The underlying error.
        #[source]
        error: camino::FromPathBufError,
    },

    /// A test file could not be read.
    #[error("failed to read test file {path}")]
    ReadFile {
        /// The test file.
        path: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: io::Error,
    },
}

/// An error that occurred while executing the test runner.
///
/// A run that exits non-zero is not an error: it is a [`RunResult`](crate::runner::RunResult)
/// with `success` set to false. These variants mean that no verdict could be obtained at all.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RunError {
    /// The test runner process could not be started.
    #[error("failed to execute `{command}`")]
    Spawn {
        /// The command line.
        command: String,

        /// The underlying error.
        #[source]
        error: io::Error,
    },

    /// A pseudo-terminal could not be allocated for a monitored run.
    #[error("failed to set up a pseudo-terminal for `{command}`")]
    PtySetup {
        /// The command line.
        command: String,

        /// The underlying error.
        #[source]
        error: io::Error,
    },

    /// Reading the output of a monitored run failed.
    #[error("failed to read output of `{command}`")]
    Read {
        /// The command line.
        command: String,

        /// The underlying error.
        #[source]
        error: io::Error,
    },

    /// Waiting for the test runner to exit failed.
    #[error("failed to wait for `{command}` to exit")]
    Wait {
        /// The command line.
        command: String,

        /// The underlying error.
        #[source]
        error: io::Error,
    },
}

/// An error that aborts a bisection before a verdict is reached.
#[derive(Debug, Error)]
pub enum BisectError {
    /// Running a probe failed.
    #[error(transparent)]
    Run(#[from] RunError),

    /// Enumerating candidates failed.
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),
}
