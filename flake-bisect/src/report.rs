// Copyright (c) The flake-bisect Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The final report printed once a verdict is reached.

use crate::reporter::Styles;
use camino::Utf8Path;
use flake_bisect_runner::{bisect::BisectOutcome, location::SpecLocation};
use owo_colors::OwoColorize;
use std::{
    io::{self, Write},
    num::NonZeroU32,
};
use swrite::{SWrite, swrite, swriteln};
use tracing::warn;

/// Lines of context shown on each side of the culprit.
const EXCERPT_CONTEXT: u32 = 5;

const RULE: &str = "================================================================================";
const THIN_RULE: &str = "--------------------------------------------------------------------------------";

/// Renders a [`BisectOutcome`] for a human.
pub(crate) struct FinalReport<'a> {
    outcome: &'a BisectOutcome,
    target: &'a SpecLocation,
    project_root: &'a Utf8Path,
    runner_command: &'a [String],
    styles: Styles,
}

impl<'a> FinalReport<'a> {
    pub(crate) fn new(
        outcome: &'a BisectOutcome,
        target: &'a SpecLocation,
        project_root: &'a Utf8Path,
        runner_command: &'a [String],
    ) -> Self {
        Self {
            outcome,
            target,
            project_root,
            runner_command,
            styles: Styles::default(),
        }
    }

    pub(crate) fn colorize(&mut self) {
        self.styles.colorize();
    }

    /// Writes the report, reading the culprit's source file for the excerpt.
    pub(crate) fn write(&self, mut writer: impl Write) -> io::Result<()> {
        let out = match self.outcome {
            BisectOutcome::Found { culprit } => {
                let source = match std::fs::read_to_string(culprit.path()) {
                    Ok(source) => Some(source),
                    Err(error) => {
                        warn!("could not read {} for an excerpt: {error}", culprit.path());
                        None
                    }
                };
                self.format_found(culprit, source.as_deref())
            }
            _ => self.format_diagnostic(),
        };
        writer.write_all(out.as_bytes())?;
        writer.flush()
    }

    fn format_found(&self, culprit: &SpecLocation, source: Option<&str>) -> String {
        let styles = &self.styles;
        let culprit_display = self.relative(culprit);
        let target_display = self.relative(self.target);
        let mut out = String::new();

        swriteln!(out, "\n{RULE}");
        swriteln!(out, "{}", "FOUND POLLUTING TEST".style(styles.pass));
        swriteln!(out, "{RULE}");
        swriteln!(
            out,
            "Conflicting test: {}",
            culprit_display.style(styles.location)
        );
        swriteln!(
            out,
            "Target test:      {}",
            target_display.style(styles.location)
        );

        if let (Some(source), Some(line)) = (source, culprit.line()) {
            swriteln!(out, "\nConflicting test context:");
            swriteln!(out, "{THIN_RULE}");
            out.push_str(&source_excerpt(source, line));
            swriteln!(out, "{THIN_RULE}");
        }

        swriteln!(out, "\n{RULE}");
        swriteln!(
            out,
            "{}",
            "PROMPT FOR A CODING ASSISTANT".style(styles.heading)
        );
        swriteln!(out, "{RULE}");
        out.push_str(&assistant_prompt(&target_display, &culprit_display));
        swriteln!(out, "{RULE}");

        swriteln!(out, "\nTo verify this conflict, run:");
        swriteln!(
            out,
            "  {}",
            self.verify_command(culprit).style(styles.command)
        );
        out
    }

    fn format_diagnostic(&self) -> String {
        let styles = &self.styles;
        let mut out = String::new();

        match self.outcome {
            BisectOutcome::FailsInIsolation { .. } => {
                swriteln!(
                    out,
                    "{} {} fails when run alone, so no other test is to blame",
                    "Could not bisect:".style(styles.fail),
                    self.relative(self.target).style(styles.location),
                );
                swriteln!(
                    out,
                    "  The test may have an inherent bug or an environmental issue."
                );
            }
            BisectOutcome::NoCulpritFile => {
                swriteln!(
                    out,
                    "{} could not identify a specific polluting file",
                    "Not found:".style(styles.fail),
                );
                write_possible_causes(&mut out);
            }
            BisectOutcome::NoCulpritCase { file } => {
                swriteln!(
                    out,
                    "{} {} breaks the target, but no single test in it does",
                    "Not found:".style(styles.fail),
                    self.relative(file).style(styles.location),
                );
                write_possible_causes(&mut out);
            }
            BisectOutcome::NoCasesInFile { file } => {
                swriteln!(
                    out,
                    "{} {} breaks the target, but no tests were found in it",
                    "Not found:".style(styles.fail),
                    self.relative(file).style(styles.location),
                );
                swriteln!(
                    out,
                    "  Code that runs when the file is loaded may be leaking state."
                );
            }
            BisectOutcome::NoCandidates => {
                swriteln!(
                    out,
                    "{} there are no other test files to search",
                    "Not found:".style(styles.fail),
                );
            }
            BisectOutcome::Found { .. } => {}
        }
        out
    }

    fn verify_command(&self, culprit: &SpecLocation) -> String {
        let locations = [self.relative(culprit), self.relative(self.target)];
        shell_words::join(
            self.runner_command
                .iter()
                .map(String::as_str)
                .chain(locations.iter().map(String::as_str)),
        )
    }

    /// Displays `location` relative to the project root, if it is inside it.
    fn relative(&self, location: &SpecLocation) -> String {
        match location.path().strip_prefix(self.project_root) {
            Ok(path) => location.with_path(path).to_string(),
            Err(_) => location.to_string(),
        }
    }
}

fn write_possible_causes(out: &mut String) {
    swriteln!(out, "  The flakiness may be caused by:");
    swriteln!(out, "  - multiple tests in combination");
    swriteln!(out, "  - test order within the target file");
    swriteln!(out, "  - environmental factors");
}

/// Returns the lines of `source` around `line`, each prefixed with its number.
///
/// `line` itself is marked with `>>> `. The window is clamped to the file.
pub(crate) fn source_excerpt(source: &str, line: NonZeroU32) -> String {
    let line = line.get();
    let first = line.saturating_sub(EXCERPT_CONTEXT).max(1);
    let last = line.saturating_add(EXCERPT_CONTEXT);

    let mut out = String::new();
    for (number, text) in (1..).zip(source.lines()) {
        if number < first {
            continue;
        }
        if number > last {
            break;
        }
        let marker = if number == line { ">>> " } else { "    " };
        swriteln!(out, "{marker}{number}: {text}");
    }
    out
}

/// Returns a prompt that asks a coding assistant to explain and fix the conflict.
pub(crate) fn assistant_prompt(target: &str, culprit: &str) -> String {
    let (target_file, target_line) = split_location(target);
    let (culprit_file, culprit_line) = split_location(culprit);

    let mut out = String::new();
    swriteln!(
        out,
        "\nI have a flaky test that passes in isolation but fails when run after another test.\n"
    );
    swriteln!(out, "**Target test (the one that's flaky):**");
    swriteln!(out, "File: {target_file}");
    swriteln!(out, "Line: {target_line}\n");
    swriteln!(out, "**Conflicting test (causes the target to fail):**");
    swriteln!(out, "File: {culprit_file}");
    swriteln!(out, "Line: {culprit_line}\n");
    swriteln!(out, "Please analyze both tests:");
    swriteln!(
        out,
        "1. Identify what shared state is being polluted (database records, class variables, \
         memoized values, global state, etc.)"
    );
    swriteln!(
        out,
        "2. Explain exactly how the conflicting test is affecting the target test"
    );
    swriteln!(out, "3. Provide a concrete plan to fix this, including:");
    swriteln!(out, "   - Whether to fix the conflicting test's cleanup");
    swriteln!(out, "   - Whether to fix the target test's setup or assumptions");
    swriteln!(
        out,
        "   - Whether to add proper test isolation (transaction rollback, before hooks, etc.)"
    );
    swriteln!(out, "4. Show the specific code changes needed\n");
    swrite!(out, "Read both files to understand the full context.\n\n");
    out
}

fn split_location(location: &str) -> (&str, &str) {
    location.rsplit_once(':').unwrap_or((location, "?"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino_tempfile::Utf8TempDir;
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    fn line(n: u32) -> NonZeroU32 {
        NonZeroU32::new(n).expect("non-zero")
    }

    fn numbered_source(count: u32) -> String {
        (1..=count).map(|n| format!("line {n}\n")).collect()
    }

    #[test]
    fn excerpt_windows() {
        let source = numbered_source(20);
        assert_eq!(
            source_excerpt(&source, line(10)),
            indoc! {"
                    5: line 5
                    6: line 6
                    7: line 7
                    8: line 8
                    9: line 9
                >>> 10: line 10
                    11: line 11
                    12: line 12
                    13: line 13
                    14: line 14
                    15: line 15
            "}
        );

        // Clamped at both ends of the file.
        assert_eq!(
            source_excerpt(&numbered_source(3), line(2)),
            "    1: line 1\n>>> 2: line 2\n    3: line 3\n"
        );
        assert!(source_excerpt(&source, line(1)).starts_with(">>> 1: line 1\n"));
        assert!(source_excerpt(&source, line(20)).ends_with(">>> 20: line 20\n"));
    }

    #[test]
    fn prompt_names_both_locations() {
        let prompt = assistant_prompt("spec/t_spec.rb:5", "spec/p_spec.rb:12");
        assert!(prompt.contains("File: spec/t_spec.rb\nLine: 5\n"), "{prompt}");
        assert!(prompt.contains("File: spec/p_spec.rb\nLine: 12\n"), "{prompt}");
        assert!(prompt.contains("shared state"));
    }

    #[test]
    fn found_report() {
        let dir = Utf8TempDir::new().expect("created temp dir");
        let culprit_path = dir.path().join("spec/p_spec.rb");
        std::fs::create_dir_all(dir.path().join("spec")).expect("created spec dir");
        std::fs::write(&culprit_path, numbered_source(4)).expect("wrote culprit");

        let outcome = BisectOutcome::Found {
            culprit: SpecLocation::case(culprit_path, line(2)),
        };
        let target = SpecLocation::case(dir.path().join("spec/t_spec.rb"), line(7));
        let command = ["bundle".to_owned(), "exec".to_owned(), "rspec".to_owned()];
        let report = FinalReport::new(&outcome, &target, dir.path(), &command);

        let mut buf = Vec::new();
        report.write(&mut buf).expect("writing to a Vec succeeds");
        let out = String::from_utf8(buf).expect("output is UTF-8");

        assert!(out.contains("Conflicting test: spec/p_spec.rb:2\n"), "{out}");
        assert!(out.contains("Target test:      spec/t_spec.rb:7\n"), "{out}");
        assert!(out.contains(">>> 2: line 2\n"), "{out}");
        assert!(out.contains("File: spec/p_spec.rb\nLine: 2\n"), "{out}");
        let verify_line = out.lines().last().expect("report is not empty");
        assert_eq!(
            shell_words::split(verify_line).expect("valid shell words"),
            [
                "bundle",
                "exec",
                "rspec",
                "spec/p_spec.rb:2",
                "spec/t_spec.rb:7"
            ]
        );
    }

    #[test]
    fn diagnostics() {
        let target = SpecLocation::case("/project/spec/t_spec.rb", line(7));
        let file = SpecLocation::file("/project/spec/p_spec.rb");
        let root = Utf8Path::new("/project");
        let command = ["rspec".to_owned()];

        let render = |outcome: BisectOutcome| {
            let mut buf = Vec::new();
            FinalReport::new(&outcome, &target, root, &command)
                .write(&mut buf)
                .expect("writing to a Vec succeeds");
            String::from_utf8(buf).expect("output is UTF-8")
        };

        let out = render(BisectOutcome::NoCulpritFile);
        assert!(out.contains("could not identify a specific polluting file"));
        assert!(out.contains("- multiple tests in combination"));

        let out = render(BisectOutcome::NoCulpritCase { file: file.clone() });
        assert!(out.contains("spec/p_spec.rb breaks the target, but no single test in it does"));

        let out = render(BisectOutcome::NoCasesInFile { file });
        assert!(out.contains("no tests were found in it"));

        let out = render(BisectOutcome::NoCandidates);
        assert!(out.contains("no other test files to search"));
    }
}
