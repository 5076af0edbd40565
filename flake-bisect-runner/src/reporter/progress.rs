// Copyright (c) The flake-bisect Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::{ProgressSink, ProgressSnapshot};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

/// Spinner frames, followed by the frame shown once a bar is finished.
const TICK_STRINGS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", " "];

const TEMPLATE: &str = "[{bar:20}] {spinner} [{pos}/~{len} {msg} tested]";

/// Renders progress snapshots as a progress bar on stderr.
///
/// Each monitored run gets its own bar, created on the first snapshot and cleared when the run
/// finishes. The spinner advances by one frame per snapshot.
#[derive(Debug)]
pub struct ProgressBarDisplay {
    bar: Option<ProgressBar>,
    hidden: bool,
}

impl ProgressBarDisplay {
    /// Creates a new display that draws to stderr.
    pub fn new() -> Self {
        Self {
            bar: None,
            hidden: false,
        }
    }

    /// Creates a new display that never draws anything.
    pub fn hidden() -> Self {
        Self {
            bar: None,
            hidden: true,
        }
    }

    /// Returns the current bar, if a run is in progress.
    pub fn bar(&self) -> Option<&ProgressBar> {
        self.bar.as_ref()
    }

    fn make_bar(&self, snapshot: &ProgressSnapshot) -> ProgressBar {
        let target = if self.hidden {
            ProgressDrawTarget::hidden()
        } else {
            ProgressDrawTarget::stderr_with_hz(20)
        };
        let bar = ProgressBar::with_draw_target(Some(snapshot.total as u64), target);
        bar.set_style(
            ProgressStyle::default_bar()
                .template(TEMPLATE)
                .expect("template is known to be valid")
                .progress_chars("* ")
                .tick_strings(TICK_STRINGS),
        );
        bar.set_message(snapshot.kind.label());
        bar
    }
}

impl Default for ProgressBarDisplay {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressSink for ProgressBarDisplay {
    fn snapshot(&mut self, snapshot: ProgressSnapshot) {
        if self.bar.is_none() {
            self.bar = Some(self.make_bar(&snapshot));
        }
        if let Some(bar) = &self.bar {
            bar.set_length(snapshot.total as u64);
            bar.set_position(snapshot.completed as u64);
            bar.tick();
        }
    }

    fn finish(&mut self) {
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::UnitKind;

    fn snapshot(completed: usize, total: usize) -> ProgressSnapshot {
        ProgressSnapshot {
            completed,
            total,
            kind: UnitKind::Files,
        }
    }

    #[test]
    fn bar_per_run() {
        let mut display = ProgressBarDisplay::hidden();
        assert!(display.bar().is_none());

        display.snapshot(snapshot(0, 5));
        display.snapshot(snapshot(2, 5));
        let bar = display.bar().expect("bar created on first snapshot");
        assert_eq!(bar.position(), 2);
        assert_eq!(bar.length(), Some(5));
        assert_eq!(bar.message(), "files");

        display.finish();
        assert!(display.bar().is_none(), "bar cleared when the run ends");

        display.snapshot(snapshot(1, 3));
        assert_eq!(
            display.bar().expect("new bar for the next run").length(),
            Some(3)
        );
    }

    #[test]
    fn count_may_exceed_total() {
        let mut display = ProgressBarDisplay::hidden();
        display.snapshot(snapshot(9, 4));
        assert_eq!(display.bar().expect("bar exists").position(), 9);
        display.finish();
    }

    #[test]
    fn finish_without_snapshot() {
        let mut display = ProgressBarDisplay::hidden();
        display.finish();
        assert!(display.bar().is_none());
    }
}
