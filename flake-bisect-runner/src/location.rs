// Copyright (c) The flake-bisect Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test identifiers.
//!
//! A [`SpecLocation`] names either a whole test file (`spec/models/user_spec.rb`) or the test case
//! starting at a given line of that file (`spec/models/user_spec.rb:42`). This is the same syntax
//! the test runner itself accepts on its command line.

use crate::errors::SpecLocationParseError;
use camino::{Utf8Path, Utf8PathBuf};
use std::{fmt, num::NonZeroU32, str::FromStr};

/// A test file, or a test case within a file.
///
/// Equality and ordering are by `(path, line)`, with whole-file locations sorting before any case
/// in the same file.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct SpecLocation {
    path: Utf8PathBuf,
    line: Option<NonZeroU32>,
}

impl SpecLocation {
    /// Creates a location for a whole test file.
    pub fn file(path: impl Into<Utf8PathBuf>) -> Self {
        Self {
            path: path.into(),
            line: None,
        }
    }

    /// Creates a location for the test case starting at `line`.
    pub fn case(path: impl Into<Utf8PathBuf>, line: NonZeroU32) -> Self {
        Self {
            path: path.into(),
            line: Some(line),
        }
    }

    /// Parses the identifier of a flaky test: `PATH:LINE`, where the line is required.
    pub fn parse_target(input: &str) -> Result<Self, SpecLocationParseError> {
        let location: Self = input.parse()?;
        if location.line.is_none() {
            return Err(SpecLocationParseError::MissingLine {
                input: input.to_owned(),
            });
        }
        Ok(location)
    }

    /// Returns the file path.
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Returns the line number, or `None` for a whole-file location.
    pub fn line(&self) -> Option<NonZeroU32> {
        self.line
    }

    /// Returns true if this location is a single test case rather than a whole file.
    pub fn is_case(&self) -> bool {
        self.line.is_some()
    }

    /// Returns a location with the same line number but a different path.
    pub fn with_path(&self, path: impl Into<Utf8PathBuf>) -> Self {
        Self {
            path: path.into(),
            line: self.line,
        }
    }
}

impl FromStr for SpecLocation {
    type Err = SpecLocationParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // The line is everything after the last colon, so paths containing colons still parse
        // as long as a line number is present.
        let (path, line) = match s.rsplit_once(':') {
            Some((path, line)) => {
                let line = line
                    .parse::<NonZeroU32>()
                    .map_err(|err| SpecLocationParseError::InvalidLine {
                        input: s.to_owned(),
                        line: line.to_owned(),
                        err,
                    })?;
                (path, Some(line))
            }
            None => (s, None),
        };

        if path.is_empty() {
            return Err(SpecLocationParseError::EmptyPath {
                input: s.to_owned(),
            });
        }

        Ok(Self {
            path: path.into(),
            line,
        })
    }
}

impl fmt::Display for SpecLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "{}:{}", self.path, line),
            None => write!(f, "{}", self.path),
        }
    }
}
