// Copyright (c) The flake-bisect Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration for flake-bisect.
//!
//! Settings are resolved in the following order (highest priority first):
//!
//! 1. CLI arguments (e.g. `--runner "bin/rspec"`), applied by the caller after loading.
//! 2. The project config file: `--config-file` if given, otherwise
//!    `<project-root>/.config/flake-bisect.toml` if it exists.
//! 3. Built-in defaults (`default-config.toml` in this crate), which target RSpec.

use crate::{errors::ConfigError, runner::CaseMarkers};
use camino::{Utf8Path, Utf8PathBuf};
use regex::bytes::Regex;
use serde::Deserialize;
use std::{collections::BTreeSet, io};
use tracing::{debug, warn};

/// The location of the project config file, relative to the project root.
pub const CONFIG_PATH: &str = ".config/flake-bisect.toml";

/// Resolved configuration.
#[derive(Clone, Debug)]
pub struct BisectConfig {
    /// How to invoke the test runner.
    pub runner: RunnerConfig,

    /// How to find the project root, test files and test cases.
    pub discovery: DiscoveryConfig,

    /// How to recognize finished units in the runner's output.
    pub progress: ProgressConfig,
}

/// How to invoke the test runner.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunnerConfig {
    /// The program followed by its leading arguments. Never empty.
    pub command: Vec<String>,

    /// Arguments appended to every invocation.
    pub format_args: Vec<String>,

    /// Arguments appended to invocations whose output is monitored through a pseudo-terminal.
    pub tty_args: Vec<String>,
}

/// How to find the project root, test files and test cases.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DiscoveryConfig {
    /// A file name whose presence marks the project root.
    pub root_marker: String,

    /// The test directory, relative to the project root.
    pub test_dir: Utf8PathBuf,

    /// The suffix test file names end with.
    pub file_suffix: String,

    /// Prefixes of (whitespace-trimmed) lines that start a test case.
    pub case_prefixes: Vec<String>,
}

/// How to recognize finished units in the runner's output.
#[derive(Clone, Debug)]
pub struct ProgressConfig {
    /// Matched against recent output at each newline when counting files.
    pub file_pattern: Regex,

    /// Single-character per-case result markers.
    pub markers: CaseMarkers,
}

impl BisectConfig {
    /// Loads configuration for the project at `project_root`.
    ///
    /// If `config_file` is given it must exist. Otherwise the config file at [`CONFIG_PATH`] is
    /// used if present, and the built-in defaults if not.
    pub fn from_sources(
        project_root: &Utf8Path,
        config_file: Option<&Utf8Path>,
    ) -> Result<Self, ConfigError> {
        Self::from_sources_with_warnings(project_root, config_file, &mut DefaultConfigWarnings)
    }

    /// Returns the built-in defaults.
    pub fn default_config() -> Self {
        Self::resolve(
            DefaultConfig::from_embedded(),
            DeserializedConfig::default(),
            Utf8Path::new(DefaultConfig::NAME),
        )
        .expect("embedded default config should resolve")
    }

    fn from_sources_with_warnings(
        project_root: &Utf8Path,
        config_file: Option<&Utf8Path>,
        warnings: &mut impl ConfigWarnings,
    ) -> Result<Self, ConfigError> {
        let (path, deserialized) = match config_file {
            Some(path) => {
                debug!("config: loading from explicit path {path}");
                match DeserializedConfig::from_path_with_warnings(path, warnings)? {
                    Some(config) => (path.to_owned(), config),
                    None => {
                        return Err(ConfigError::FileNotFound {
                            path: path.to_owned(),
                        });
                    }
                }
            }
            None => {
                let path = project_root.join(CONFIG_PATH);
                let config = DeserializedConfig::from_path_with_warnings(&path, warnings)?
                    .unwrap_or_default();
                (path, config)
            }
        };

        Self::resolve(DefaultConfig::from_embedded(), deserialized, &path)
    }

    fn resolve(
        defaults: DefaultConfig,
        config: DeserializedConfig,
        path: &Utf8Path,
    ) -> Result<Self, ConfigError> {
        let runner = RunnerConfig {
            command: config.runner.command.unwrap_or(defaults.runner.command),
            format_args: config
                .runner
                .format_args
                .unwrap_or(defaults.runner.format_args),
            tty_args: config.runner.tty_args.unwrap_or(defaults.runner.tty_args),
        };
        if runner.command.is_empty() {
            return Err(ConfigError::EmptyCommand {
                path: path.to_owned(),
            });
        }

        let discovery = DiscoveryConfig {
            root_marker: config
                .discovery
                .root_marker
                .unwrap_or(defaults.discovery.root_marker),
            test_dir: config
                .discovery
                .test_dir
                .unwrap_or(defaults.discovery.test_dir),
            file_suffix: config
                .discovery
                .file_suffix
                .unwrap_or(defaults.discovery.file_suffix),
            case_prefixes: config
                .discovery
                .case_prefixes
                .unwrap_or(defaults.discovery.case_prefixes),
        };

        let progress = config.progress;
        let defaults = defaults.progress;
        let file_pattern = progress.file_pattern.unwrap_or(defaults.file_pattern);
        let file_pattern =
            Regex::new(&file_pattern).map_err(|error| ConfigError::InvalidFilePattern {
                path: path.to_owned(),
                error,
            })?;
        let markers = CaseMarkers {
            pass: parse_marker(
                path,
                "pass-marker",
                progress.pass_marker.unwrap_or(defaults.pass_marker),
            )?,
            failure: parse_marker(
                path,
                "failure-marker",
                progress.failure_marker.unwrap_or(defaults.failure_marker),
            )?,
            pending: parse_marker(
                path,
                "pending-marker",
                progress.pending_marker.unwrap_or(defaults.pending_marker),
            )?,
            error: parse_marker(
                path,
                "error-marker",
                progress.error_marker.unwrap_or(defaults.error_marker),
            )?,
        };

        Ok(Self {
            runner,
            discovery,
            progress: ProgressConfig {
                file_pattern,
                markers,
            },
        })
    }
}

fn parse_marker(path: &Utf8Path, key: &'static str, value: String) -> Result<u8, ConfigError> {
    match value.as_bytes() {
        [byte] if byte.is_ascii() => Ok(*byte),
        _ => Err(ConfigError::InvalidMarker {
            path: path.to_owned(),
            key,
            value,
        }),
    }
}

/// Handles warnings produced while loading configuration.
trait ConfigWarnings {
    /// Called with the unknown keys found in a config file.
    fn unknown_config_keys(&mut self, config_file: &Utf8Path, unknown: &BTreeSet<String>);
}

/// Logs warnings using the tracing crate.
struct DefaultConfigWarnings;

impl ConfigWarnings for DefaultConfigWarnings {
    fn unknown_config_keys(&mut self, config_file: &Utf8Path, unknown: &BTreeSet<String>) {
        let mut unknown_str = String::new();
        if unknown.len() == 1 {
            // Print this on the same line.
            unknown_str.push_str("key: ");
            unknown_str.push_str(unknown.iter().next().expect("length is 1"));
        } else {
            unknown_str.push_str("keys:\n");
            for ignored_key in unknown {
                unknown_str.push('\n');
                unknown_str.push_str("  - ");
                unknown_str.push_str(ignored_key);
            }
        }

        warn!("in config file {config_file}, ignoring unknown configuration {unknown_str}");
    }
}

/// A project config file. Every setting is optional and falls back to the defaults.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct DeserializedConfig {
    #[serde(default)]
    runner: DeserializedRunnerConfig,
    #[serde(default)]
    discovery: DeserializedDiscoveryConfig,
    #[serde(default)]
    progress: DeserializedProgressConfig,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct DeserializedRunnerConfig {
    command: Option<Vec<String>>,
    format_args: Option<Vec<String>>,
    tty_args: Option<Vec<String>>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct DeserializedDiscoveryConfig {
    root_marker: Option<String>,
    test_dir: Option<Utf8PathBuf>,
    file_suffix: Option<String>,
    case_prefixes: Option<Vec<String>>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct DeserializedProgressConfig {
    file_pattern: Option<String>,
    pass_marker: Option<String>,
    failure_marker: Option<String>,
    pending_marker: Option<String>,
    error_marker: Option<String>,
}

impl DeserializedConfig {
    /// Loads a config file, returning `Ok(None)` if it does not exist.
    fn from_path_with_warnings(
        path: &Utf8Path,
        warnings: &mut impl ConfigWarnings,
    ) -> Result<Option<Self>, ConfigError> {
        debug!("config: attempting to load from {path}");
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(error) if error.kind() == io::ErrorKind::NotFound => {
                debug!("config: file does not exist at {path}");
                return Ok(None);
            }
            Err(error) => {
                return Err(ConfigError::Read {
                    path: path.to_owned(),
                    error,
                });
            }
        };

        let (config, unknown) =
            Self::deserialize_toml(&contents).map_err(|error| ConfigError::Parse {
                path: path.to_owned(),
                error,
            })?;

        if !unknown.is_empty() {
            warnings.unknown_config_keys(path, &unknown);
        }

        debug!("config: loaded successfully from {path}");
        Ok(Some(config))
    }

    fn deserialize_toml(contents: &str) -> Result<(Self, BTreeSet<String>), toml::de::Error> {
        let deserializer = toml::Deserializer::parse(contents)?;
        let mut unknown = BTreeSet::new();
        let config: DeserializedConfig = serde_ignored::deserialize(deserializer, |path| {
            unknown.insert(path.to_string());
        })?;
        Ok((config, unknown))
    }
}

/// The embedded defaults: every setting is required.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct DefaultConfig {
    runner: DefaultRunnerConfig,
    discovery: DefaultDiscoveryConfig,
    progress: DefaultProgressConfig,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct DefaultRunnerConfig {
    command: Vec<String>,
    format_args: Vec<String>,
    tty_args: Vec<String>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct DefaultDiscoveryConfig {
    root_marker: String,
    test_dir: Utf8PathBuf,
    file_suffix: String,
    case_prefixes: Vec<String>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct DefaultProgressConfig {
    file_pattern: String,
    pass_marker: String,
    failure_marker: String,
    pending_marker: String,
    error_marker: String,
}

impl DefaultConfig {
    const CONTENTS: &'static str = include_str!("../default-config.toml");
    const NAME: &'static str = "<default config>";

    /// Parses the embedded default config.
    ///
    /// Panics if the embedded TOML is invalid or contains unknown keys.
    fn from_embedded() -> Self {
        let deserializer = toml::Deserializer::parse(Self::CONTENTS)
            .expect("embedded default config should parse");
        let mut unknown = BTreeSet::new();
        let config: DefaultConfig =
            serde_ignored::deserialize(deserializer, |path: serde_ignored::Path| {
                unknown.insert(path.to_string());
            })
            .expect("embedded default config should be valid");

        // The default config ships with this binary, so unknown keys are a bug.
        if !unknown.is_empty() {
            panic!(
                "found unknown keys in default config: {}",
                unknown.into_iter().collect::<Vec<_>>().join(", ")
            );
        }

        config
    }
}
