// Copyright (c) The flake-bisect Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Locating the project and enumerating its tests.
//!
//! None of this is clever: test files are found by suffix, and test cases by looking for lines
//! that start with one of a few keywords. The search only needs the candidate sets to be complete
//! enough to contain the culprit, and to come out in the same order every time.

use crate::{config::DiscoveryConfig, errors::DiscoveryError, location::SpecLocation};
use camino::{Utf8Path, Utf8PathBuf};
use std::{io, num::NonZeroU32};
use tracing::debug;
use walkdir::WalkDir;

/// A source of candidates to bisect over.
pub trait CandidateSource {
    /// Returns every test file in the project, sorted by path.
    fn test_files(&self) -> Result<Vec<SpecLocation>, DiscoveryError>;

    /// Returns every test case in `file`, in ascending line order.
    fn test_cases(&self, file: &Utf8Path) -> Result<Vec<SpecLocation>, DiscoveryError>;
}

/// Resolves the target's path to an absolute, canonical one, checking that it is a file.
pub fn canonicalize_target(target: &SpecLocation) -> Result<SpecLocation, DiscoveryError> {
    let not_found = |error| DiscoveryError::TargetNotFound {
        path: target.path().to_owned(),
        error,
    };

    let path = target.path().canonicalize_utf8().map_err(not_found)?;
    if !path.is_file() {
        return Err(not_found(io::Error::new(
            io::ErrorKind::InvalidInput,
            "not a regular file",
        )));
    }

    Ok(target.with_path(path))
}

/// Returns the closest ancestor of `target_file` that contains a file named `marker`.
pub fn find_project_root(
    target_file: &Utf8Path,
    marker: &str,
) -> Result<Utf8PathBuf, DiscoveryError> {
    for dir in target_file.ancestors().skip(1) {
        if dir.join(marker).exists() {
            debug!("found project root at {dir}");
            return Ok(dir.to_owned());
        }
    }

    Err(DiscoveryError::ProjectRootNotFound {
        start: target_file
            .parent()
            .unwrap_or(target_file)
            .to_owned(),
        marker: marker.to_owned(),
    })
}

/// Finds tests on the filesystem according to a [`DiscoveryConfig`].
#[derive(Clone, Debug)]
pub struct TestDiscovery {
    root: Utf8PathBuf,
    config: DiscoveryConfig,
}

impl TestDiscovery {
    /// Creates a new `TestDiscovery` for the project at `root`.
    pub fn new(root: impl Into<Utf8PathBuf>, config: &DiscoveryConfig) -> Self {
        Self {
            root: root.into(),
            config: config.clone(),
        }
    }

    fn is_case_start(&self, line: &str) -> bool {
        let line = line.trim();
        self.config
            .case_prefixes
            .iter()
            .any(|prefix| line.starts_with(prefix.as_str()))
    }
}

impl CandidateSource for TestDiscovery {
    fn test_files(&self) -> Result<Vec<SpecLocation>, DiscoveryError> {
        let dir = self.root.join(&self.config.test_dir);
        if !dir.is_dir() {
            debug!("test directory {dir} does not exist, no test files found");
            return Ok(Vec::new());
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(&dir) {
            let entry = entry.map_err(|error| DiscoveryError::WalkDir {
                dir: dir.clone(),
                error,
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let path = Utf8PathBuf::try_from(entry.into_path())
                .map_err(|error| DiscoveryError::NonUtf8Path { error })?;
            let matches = path
                .file_name()
                .is_some_and(|name| name.ends_with(self.config.file_suffix.as_str()));
            if matches {
                files.push(path);
            }
        }

        files.sort();
        debug!("found {} test files under {dir}", files.len());
        Ok(files.into_iter().map(SpecLocation::file).collect())
    }

    fn test_cases(&self, file: &Utf8Path) -> Result<Vec<SpecLocation>, DiscoveryError> {
        let contents =
            std::fs::read_to_string(file).map_err(|error| DiscoveryError::ReadFile {
                path: file.to_owned(),
                error,
            })?;

        Ok(contents
            .lines()
            .enumerate()
            .filter(|(_, line)| self.is_case_start(line))
            .filter_map(|(idx, _)| {
                let line = NonZeroU32::new(u32::try_from(idx + 1).ok()?)?;
                Some(SpecLocation::case(file, line))
            })
            .collect())
    }
}
