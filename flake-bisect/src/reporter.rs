// Copyright (c) The flake-bisect Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Step-by-step display of a bisection.

use flake_bisect_runner::{
    reporter::{BisectEvent, SearchScope},
    runner::UnitKind,
};
use owo_colors::{OwoColorize, Style};
use std::{
    io::{self, Write},
    time::Duration,
};
use swrite::{SWrite, swrite, swriteln};

/// Writes [`BisectEvent`]s as human-readable lines.
#[derive(Debug, Default)]
pub(crate) struct EventDisplayer {
    styles: Styles,
    verbose: bool,
}

impl EventDisplayer {
    pub(crate) fn new(verbose: bool) -> Self {
        Self {
            styles: Styles::default(),
            verbose,
        }
    }

    pub(crate) fn colorize(&mut self) {
        self.styles.colorize();
    }

    /// Writes a single event to `writer`, and flushes it.
    pub(crate) fn write_event(
        &self,
        event: &BisectEvent<'_>,
        mut writer: impl Write,
    ) -> io::Result<()> {
        let out = self.format_event(event);
        writer.write_all(out.as_bytes())?;
        writer.flush()
    }

    fn format_event(&self, event: &BisectEvent<'_>) -> String {
        let styles = &self.styles;
        let mut out = String::new();

        match event {
            BisectEvent::IsolationStarted { target } => {
                swriteln!(
                    out,
                    "{} verifying {} passes in isolation",
                    "Step 1:".style(styles.heading),
                    target.style(styles.location),
                );
            }
            BisectEvent::IsolationFinished { result } => {
                if self.verbose {
                    swriteln!(out, "  ran: {}", result.command.style(styles.command));
                }
                if result.success {
                    swriteln!(
                        out,
                        "  {} passes in isolation, searching for polluting tests",
                        "PASS".style(styles.pass),
                    );
                } else {
                    swriteln!(
                        out,
                        "  {} fails even in isolation: this is not a shared state issue",
                        "FAIL".style(styles.fail),
                    );
                    swriteln!(
                        out,
                        "  the test may have an inherent bug or an environmental dependency"
                    );
                    if self.verbose {
                        swriteln!(out, "{}", "--- output ---".style(styles.heading));
                        out.push_str(&result.output);
                        if !result.output.ends_with('\n') {
                            out.push('\n');
                        }
                        swriteln!(out, "{}", "--------------".style(styles.heading));
                    }
                }
            }
            BisectEvent::CoLocationSkipped => {
                swriteln!(
                    out,
                    "{} no other tests in the target's file, skipping to the search across files",
                    "Step 2:".style(styles.heading),
                );
            }
            BisectEvent::CoLocationStarted { siblings } => {
                swriteln!(
                    out,
                    "{} running the target after the {} in its own file",
                    "Step 2:".style(styles.heading),
                    plural(siblings.len(), UnitKind::Cases, styles),
                );
            }
            BisectEvent::CoLocationFinished { reproduced } => {
                if *reproduced {
                    swriteln!(
                        out,
                        "  {} the failure reproduces within the target's own file",
                        "FAIL".style(styles.fail),
                    );
                } else {
                    swriteln!(
                        out,
                        "  {} the target's own file does not break it",
                        "PASS".style(styles.pass),
                    );
                }
            }
            BisectEvent::SearchStarted {
                scope,
                candidate_count,
            } => {
                swrite!(
                    out,
                    "\n{} {}",
                    "Searching".style(styles.heading),
                    plural(*candidate_count, scope.unit_kind(), styles),
                );
                if let SearchScope::Cases { file } = scope {
                    swrite!(out, " in {}", file.style(styles.location));
                }
                swriteln!(out, "...");
            }
            BisectEvent::ProbeStarted { half, count, kind } => {
                swriteln!(
                    out,
                    "  testing {half} half ({})...",
                    plural(*count, *kind, styles),
                );
            }
            BisectEvent::ProbeFinished {
                half,
                reproduced,
                elapsed,
            } => {
                if *reproduced {
                    swriteln!(
                        out,
                        "  {} {half} half causes the failure {}",
                        "FAIL".style(styles.fail),
                        DisplayElapsed(*elapsed),
                    );
                } else {
                    swriteln!(
                        out,
                        "  {} {half} half passes {}",
                        "PASS".style(styles.pass),
                        DisplayElapsed(*elapsed),
                    );
                }
            }
            BisectEvent::NeitherHalfReproduced { remaining } => {
                swriteln!(
                    out,
                    "  {} neither half of the remaining {remaining} reproduces the failure",
                    "FAIL".style(styles.fail),
                );
            }
            BisectEvent::CulpritFileFound { file } => {
                swriteln!(
                    out,
                    "\n{} {}",
                    "Found polluting file:".style(styles.pass),
                    file.style(styles.location),
                );
            }
        }

        out
    }
}

fn plural(count: usize, kind: UnitKind, styles: &Styles) -> String {
    let noun = match (kind, count) {
        (UnitKind::Files, 1) => "test file",
        (UnitKind::Files, _) => "test files",
        (UnitKind::Cases, 1) => "test",
        (UnitKind::Cases, _) => "tests",
    };
    format!("{} {noun}", count.style(styles.count))
}

struct DisplayElapsed(Duration);

impl std::fmt::Display for DisplayElapsed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:.3}s]", self.0.as_secs_f64())
    }
}

#[derive(Debug, Default)]
pub(crate) struct Styles {
    pub(crate) heading: Style,
    pub(crate) count: Style,
    pub(crate) pass: Style,
    pub(crate) fail: Style,
    pub(crate) location: Style,
    pub(crate) command: Style,
}

impl Styles {
    pub(crate) fn colorize(&mut self) {
        self.heading = Style::new().bold();
        self.count = Style::new().bold();
        self.pass = Style::new().green().bold();
        self.fail = Style::new().red().bold();
        self.location = Style::new().cyan();
        self.command = Style::new().yellow();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flake_bisect_runner::{location::SpecLocation, reporter::Half, runner::RunResult};
    use indoc::indoc;
    use pretty_assertions::assert_eq;
    use std::num::NonZeroU32;

    fn display(displayer: &EventDisplayer, events: &[BisectEvent<'_>]) -> String {
        let mut buf = Vec::new();
        for event in events {
            displayer
                .write_event(event, &mut buf)
                .expect("writing to a Vec succeeds");
        }
        String::from_utf8(buf).expect("output is UTF-8")
    }

    #[test]
    fn search_transcript() {
        let target = SpecLocation::case("spec/t_spec.rb", NonZeroU32::new(5).expect("non-zero"));
        let file = SpecLocation::file("spec/p_spec.rb");
        let passed = RunResult {
            success: true,
            output: ".\n".to_owned(),
            command: "rspec spec/t_spec.rb:5".to_owned(),
        };
        let siblings = [SpecLocation::case(
            "spec/t_spec.rb",
            NonZeroU32::new(2).expect("non-zero"),
        )];

        let events = [
            BisectEvent::IsolationStarted { target: &target },
            BisectEvent::IsolationFinished { result: &passed },
            BisectEvent::CoLocationStarted {
                siblings: &siblings,
            },
            BisectEvent::CoLocationFinished { reproduced: false },
            BisectEvent::SearchStarted {
                scope: SearchScope::Files,
                candidate_count: 2,
            },
            BisectEvent::ProbeStarted {
                half: Half::Left,
                count: 1,
                kind: UnitKind::Files,
            },
            BisectEvent::ProbeFinished {
                half: Half::Left,
                reproduced: true,
                elapsed: Duration::from_millis(1500),
            },
            BisectEvent::CulpritFileFound { file: &file },
            BisectEvent::SearchStarted {
                scope: SearchScope::Cases { file: &file },
                candidate_count: 3,
            },
            BisectEvent::ProbeStarted {
                half: Half::Left,
                count: 1,
                kind: UnitKind::Cases,
            },
            BisectEvent::ProbeFinished {
                half: Half::Left,
                reproduced: false,
                elapsed: Duration::from_millis(250),
            },
            BisectEvent::NeitherHalfReproduced { remaining: 3 },
        ];

        assert_eq!(
            display(&EventDisplayer::new(false), &events),
            indoc! {"
                Step 1: verifying spec/t_spec.rb:5 passes in isolation
                  PASS passes in isolation, searching for polluting tests
                Step 2: running the target after the 1 test in its own file
                  PASS the target's own file does not break it

                Searching 2 test files...
                  testing left half (1 test file)...
                  FAIL left half causes the failure [1.500s]

                Found polluting file: spec/p_spec.rb

                Searching 3 tests in spec/p_spec.rb...
                  testing left half (1 test)...
                  PASS left half passes [0.250s]
                  FAIL neither half of the remaining 3 reproduces the failure
            "}
        );
    }

    #[test]
    fn isolation_failure_verbose() {
        let failed = RunResult {
            success: false,
            output: "F".to_owned(),
            command: "rspec spec/t_spec.rb:5".to_owned(),
        };
        let event = BisectEvent::IsolationFinished { result: &failed };

        let quiet = display(&EventDisplayer::new(false), std::slice::from_ref(&event));
        assert!(!quiet.contains("rspec"), "quiet output: {quiet}");

        let verbose = display(&EventDisplayer::new(true), &[event]);
        assert_eq!(
            verbose,
            indoc! {"
                  ran: rspec spec/t_spec.rb:5
                  FAIL fails even in isolation: this is not a shared state issue
                  the test may have an inherent bug or an environmental dependency
                --- output ---
                F
                --------------
            "}
        );
    }
}
