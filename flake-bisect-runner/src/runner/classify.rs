// Copyright (c) The flake-bisect Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::UnitKind;
use regex::bytes::Regex;

/// Once the window of recent output grows past this many bytes, it is discarded.
const MAX_WINDOW_LEN: usize = 1000;

/// The single-character markers a progress formatter prints for each finished test case.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CaseMarkers {
    /// Printed for a passing case.
    pub pass: u8,

    /// Printed for a failing case.
    pub failure: u8,

    /// Printed for a pending or skipped case.
    pub pending: u8,

    /// Printed for a case that errored outside of an assertion.
    pub error: u8,
}

impl CaseMarkers {
    /// Returns the result `byte` marks, if any.
    pub fn classify(&self, byte: u8) -> Option<CaseMarker> {
        if byte == self.pass {
            Some(CaseMarker::Pass)
        } else if byte == self.failure {
            Some(CaseMarker::Failure)
        } else if byte == self.pending {
            Some(CaseMarker::Pending)
        } else if byte == self.error {
            Some(CaseMarker::Error)
        } else {
            None
        }
    }
}

/// The result of a single test case, as reported by a progress marker.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CaseMarker {
    /// The case passed.
    Pass,

    /// The case failed.
    Failure,

    /// The case is pending.
    Pending,

    /// The case errored.
    Error,
}

/// A finished unit of work observed in the runner's output.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnitEvent {
    /// A test file finished.
    FileCompleted,

    /// A test case finished.
    CaseCompleted(CaseMarker),
}

/// Recognizes finished units in a stream of output bytes.
pub trait UnitClassifier {
    /// Observes the next byte of output, returning an event if it completes a unit.
    fn feed(&mut self, byte: u8) -> Option<UnitEvent>;
}

/// A [`UnitClassifier`] driven by a file-name pattern and per-case markers.
///
/// This is a heuristic. When counting files, any line that mentions something matching the
/// pattern counts as a finished file. When counting cases, every marker byte counts as a finished
/// case, including marker characters that appear in unrelated output. Counts are only ever used
/// for display.
#[derive(Clone, Debug)]
pub struct MarkerClassifier {
    kind: UnitKind,
    markers: CaseMarkers,
    file_pattern: Regex,
    window: Vec<u8>,
}

impl MarkerClassifier {
    /// Creates a new classifier counting units of the given kind.
    pub fn new(kind: UnitKind, markers: CaseMarkers, file_pattern: Regex) -> Self {
        Self {
            kind,
            markers,
            file_pattern,
            window: Vec::new(),
        }
    }
}

impl UnitClassifier for MarkerClassifier {
    fn feed(&mut self, byte: u8) -> Option<UnitEvent> {
        self.window.push(byte);

        let event = match self.kind {
            UnitKind::Files => {
                if byte == b'\n' && self.file_pattern.is_match(&self.window) {
                    self.window.clear();
                    Some(UnitEvent::FileCompleted)
                } else {
                    None
                }
            }
            UnitKind::Cases => self.markers.classify(byte).map(UnitEvent::CaseCompleted),
        };

        if self.window.len() > MAX_WINDOW_LEN {
            self.window.clear();
        }

        event
    }
}
