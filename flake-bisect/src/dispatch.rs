// Copyright (c) The flake-bisect Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Command-line parsing and the top-level flow.

use crate::{
    ExpectedError, Result,
    output::{OutputContext, OutputOpts, OutputWriter},
    report::FinalReport,
    reporter::EventDisplayer,
};
use camino::{Utf8Path, Utf8PathBuf};
use clap::Parser;
use flake_bisect_metadata::BisectExitCode;
use flake_bisect_runner::{
    bisect::Bisector,
    config::BisectConfig,
    discovery::{TestDiscovery, canonicalize_target, find_project_root},
    location::SpecLocation,
    reporter::{ProgressBarDisplay, ProgressSink},
    runner::ProcessRunner,
    test_command::TestCommand,
};
use tracing::debug;

/// Find the test that makes an order-dependent test fail.
///
/// Given a test that passes alone but fails in a full run, flake-bisect runs it after halves of
/// the rest of the suite until it finds the single test file, and then the single test, that
/// breaks it.
#[derive(Debug, Parser)]
#[command(
    version,
    name = "flake-bisect",
    styles = crate::output::clap_styles::style(),
    max_term_width = 100,
)]
pub struct FlakeBisectApp {
    /// The flaky test, as PATH:LINE
    #[arg(value_name = "PATH:LINE")]
    target: String,

    /// Config file [default: <project-root>/.config/flake-bisect.toml]
    #[arg(long, value_name = "PATH", env = "FLAKE_BISECT_CONFIG")]
    config_file: Option<Utf8PathBuf>,

    /// Command used to run tests, overriding the config (e.g. "bin/rspec")
    #[arg(long, value_name = "COMMAND")]
    runner: Option<String>,

    /// Project root [default: closest ancestor of the target containing the root marker]
    #[arg(long, value_name = "DIR")]
    project_root: Option<Utf8PathBuf>,

    /// Do not display a progress bar while tests run
    #[arg(long, env = "FLAKE_BISECT_NO_PROGRESS")]
    no_progress: bool,

    #[clap(flatten)]
    output: OutputOpts,
}

impl FlakeBisectApp {
    /// Initializes the output context.
    pub fn init_output(&self) -> OutputContext {
        self.output.init()
    }

    /// Executes the app.
    pub fn exec(self, output: OutputContext, output_writer: &mut OutputWriter) -> Result<i32> {
        let target = SpecLocation::parse_target(&self.target)?;
        let target = canonicalize_target(&target)
            .map_err(|err| ExpectedError::TargetNotFound { err })?;

        let explicit_config = self
            .config_file
            .as_deref()
            .map(|path| BisectConfig::from_sources(Utf8Path::new("."), Some(path)))
            .transpose()?;
        let project_root = self.resolve_project_root(&target, explicit_config.as_ref())?;
        debug!("project root: {project_root}");

        let mut config = match explicit_config {
            Some(config) => config,
            None => BisectConfig::from_sources(&project_root, None)?,
        };
        if let Some(runner) = &self.runner {
            config.runner.command = parse_runner(runner)?;
        }

        let discovery = TestDiscovery::new(&project_root, &config.discovery);
        let sink: Box<dyn ProgressSink> = if self.no_progress {
            Box::new(ProgressBarDisplay::hidden())
        } else {
            Box::new(ProgressBarDisplay::new())
        };
        let mut runner = ProcessRunner::new(
            TestCommand::new(&config.runner, &project_root),
            target.clone(),
            config.progress.clone(),
            Some(sink),
        );

        let mut displayer = EventDisplayer::new(output.verbose);
        if output.color.should_colorize(supports_color::Stream::Stderr) {
            displayer.colorize();
        }

        let mut write_error = None;
        let outcome = Bisector::new(&mut runner, &discovery, target.clone()).run(|event| {
            if write_error.is_none()
                && let Err(err) = displayer.write_event(&event, output_writer.stderr_writer())
            {
                write_error = Some(err);
            }
        })?;
        if let Some(err) = write_error {
            return Err(ExpectedError::write_output(err));
        }

        let mut report =
            FinalReport::new(&outcome, &target, &project_root, &config.runner.command);
        if output.color.should_colorize(supports_color::Stream::Stdout) {
            report.colorize();
        }
        report
            .write(output_writer.stdout_writer())
            .map_err(ExpectedError::write_output)?;

        Ok(BisectExitCode::OK)
    }

    fn resolve_project_root(
        &self,
        target: &SpecLocation,
        explicit_config: Option<&BisectConfig>,
    ) -> Result<Utf8PathBuf> {
        if let Some(project_root) = &self.project_root {
            return project_root.canonicalize_utf8().map_err(|err| {
                ExpectedError::ProjectRootInvalid {
                    project_root: project_root.clone(),
                    err,
                }
            });
        }

        // The project config file lives under the root, so only an explicit config file can
        // change the marker used to find it.
        let marker = match explicit_config {
            Some(config) => config.discovery.root_marker.clone(),
            None => BisectConfig::default_config().discovery.root_marker,
        };
        find_project_root(target.path(), &marker)
            .map_err(|err| ExpectedError::ProjectRootNotFound { err })
    }
}

fn parse_runner(runner: &str) -> Result<Vec<String>> {
    let command = shell_words::split(runner)
        .map_err(|err| ExpectedError::invalid_runner_override(runner, Some(err)))?;
    if command.is_empty() {
        return Err(ExpectedError::invalid_runner_override(runner, None));
    }
    Ok(command)
}
