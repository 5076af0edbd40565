// Copyright (c) The flake-bisect Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::output::{NO_HEADING, StderrStyles};
use camino::Utf8PathBuf;
use flake_bisect_metadata::BisectExitCode;
use flake_bisect_runner::errors::{
    BisectError, ConfigError, DiscoveryError, RunError, SpecLocationParseError,
};
use owo_colors::OwoColorize;
use std::error::Error;
use thiserror::Error;
use tracing::error;

pub(crate) type Result<T, E = ExpectedError> = std::result::Result<T, E>;

// Note that the #[error()] strings are mostly placeholder messages -- the expected way to print out
// errors is with the display_to_stderr method, which colorizes errors.

/// An error that prevented flake-bisect from reaching a verdict.
#[derive(Debug, Error)]
#[doc(hidden)]
pub enum ExpectedError {
    #[error("invalid target")]
    InvalidTarget {
        #[from]
        err: SpecLocationParseError,
    },
    #[error("target not found")]
    TargetNotFound { err: DiscoveryError },
    #[error("invalid runner override")]
    InvalidRunnerOverride {
        runner: String,
        #[source]
        err: Option<shell_words::ParseError>,
    },
    #[error("config error")]
    ConfigError {
        #[from]
        err: ConfigError,
    },
    #[error("project root not found")]
    ProjectRootNotFound { err: DiscoveryError },
    #[error("project root is invalid")]
    ProjectRootInvalid {
        project_root: Utf8PathBuf,
        #[source]
        err: std::io::Error,
    },
    #[error("test runner failed")]
    RunError {
        #[from]
        err: RunError,
    },
    #[error("test discovery failed")]
    DiscoveryError { err: DiscoveryError },
    #[error("error writing output")]
    WriteOutputError {
        #[source]
        err: std::io::Error,
    },
}

impl ExpectedError {
    pub(crate) fn invalid_runner_override(
        runner: impl Into<String>,
        err: Option<shell_words::ParseError>,
    ) -> Self {
        Self::InvalidRunnerOverride {
            runner: runner.into(),
            err,
        }
    }

    pub(crate) fn write_output(err: std::io::Error) -> Self {
        Self::WriteOutputError { err }
    }

    /// Returns the exit code for the process.
    pub fn process_exit_code(&self) -> i32 {
        match self {
            Self::InvalidTarget { .. }
            | Self::TargetNotFound { .. }
            | Self::InvalidRunnerOverride { .. } => BisectExitCode::USAGE_ERROR,
            Self::ConfigError { .. } => BisectExitCode::CONFIG_PARSE_FAILED,
            Self::ProjectRootNotFound { .. } | Self::ProjectRootInvalid { .. } => {
                BisectExitCode::PROJECT_ROOT_NOT_FOUND
            }
            Self::RunError { .. } => BisectExitCode::RUNNER_EXEC_FAILED,
            Self::DiscoveryError { .. } => BisectExitCode::DISCOVERY_FAILED,
            Self::WriteOutputError { .. } => BisectExitCode::WRITE_OUTPUT_ERROR,
        }
    }

    /// Displays this error to stderr.
    pub fn display_to_stderr(&self, styles: &StderrStyles) {
        let mut next_error: Option<&dyn Error> = match &self {
            Self::InvalidTarget { err } => {
                error!("invalid target: {err}");
                error!(
                    target: NO_HEADING,
                    "(expected a test file and line, e.g. {})",
                    "spec/models/user_spec.rb:42".style(styles.bold)
                );
                None
            }
            Self::TargetNotFound { err } => {
                // The message from the error includes the path.
                error!("{err}");
                err.source()
            }
            Self::InvalidRunnerOverride { runner, err } => {
                error!(
                    "invalid value for --runner: `{}`",
                    runner.style(styles.bold)
                );
                match err {
                    Some(err) => Some(err as &dyn Error),
                    None => {
                        error!(target: NO_HEADING, "(the runner command must not be empty)");
                        None
                    }
                }
            }
            Self::ConfigError { err } => {
                error!("{err}");
                err.source()
            }
            Self::ProjectRootNotFound { err } => {
                error!("{err}");
                error!(
                    target: NO_HEADING,
                    "(pass {} to set it explicitly)",
                    "--project-root".style(styles.bold)
                );
                None
            }
            Self::ProjectRootInvalid { project_root, err } => {
                error!(
                    "project root `{}` is invalid",
                    project_root.style(styles.bold)
                );
                Some(err as &dyn Error)
            }
            Self::RunError { err } => {
                match err {
                    RunError::Spawn { command, .. } => {
                        error!("failed to execute `{}`", command.style(styles.bold));
                    }
                    RunError::Wait { command, .. } => {
                        error!(
                            "failed to wait for `{}` to exit",
                            command.style(styles.bold)
                        );
                    }
                    other => error!("{other}"),
                }
                err.source()
            }
            Self::DiscoveryError { err } => {
                error!("{err}");
                err.source()
            }
            Self::WriteOutputError { err } => {
                error!("error writing output");
                Some(err as &dyn Error)
            }
        };

        while let Some(err) = next_error {
            error!(target: NO_HEADING, "\nCaused by:\n  {}", err);
            next_error = err.source();
        }
    }
}

impl From<BisectError> for ExpectedError {
    fn from(err: BisectError) -> Self {
        match err {
            BisectError::Run(err) => Self::RunError { err },
            BisectError::Discovery(err) => Self::DiscoveryError { err },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flake_bisect_runner::location::SpecLocation;
    use pretty_assertions::assert_eq;

    #[test]
    fn exit_codes() {
        let parse_err = SpecLocation::parse_target("spec/a_spec.rb").expect_err("no line number");
        assert_eq!(
            ExpectedError::from(parse_err).process_exit_code(),
            BisectExitCode::USAGE_ERROR
        );

        assert_eq!(
            ExpectedError::invalid_runner_override("", None).process_exit_code(),
            BisectExitCode::USAGE_ERROR
        );

        let run_err = RunError::Spawn {
            command: "rspec".to_owned(),
            error: std::io::Error::from(std::io::ErrorKind::NotFound),
        };
        assert_eq!(
            ExpectedError::from(BisectError::from(run_err)).process_exit_code(),
            BisectExitCode::RUNNER_EXEC_FAILED
        );

        let discovery_err = DiscoveryError::ProjectRootNotFound {
            start: "/tmp".into(),
            marker: "Gemfile".to_owned(),
        };
        assert_eq!(
            ExpectedError::from(BisectError::from(discovery_err)).process_exit_code(),
            BisectExitCode::DISCOVERY_FAILED
        );

        assert_eq!(
            ExpectedError::write_output(std::io::Error::from(std::io::ErrorKind::BrokenPipe))
                .process_exit_code(),
            BisectExitCode::WRITE_OUTPUT_ERROR
        );
    }
}
