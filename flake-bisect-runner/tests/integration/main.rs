// Copyright (c) The flake-bisect Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end tests driving a shell script as the test runner.

#![cfg(unix)]

mod fixtures;

use fixtures::{FakeProject, relative};
use flake_bisect_runner::{
    bisect::{BisectOutcome, Bisector},
    discovery::{CandidateSource, TestDiscovery, canonicalize_target, find_project_root},
    location::SpecLocation,
    reporter::{BisectEvent, ProgressBarDisplay, ProgressSink},
    runner::{Probe, ProcessRunner, UnitKind},
    test_command::TestCommand,
};
use pretty_assertions::assert_eq;

fn bisect(
    project: &FakeProject,
    target: &str,
    with_progress: bool,
) -> (BisectOutcome, Vec<UnitKind>) {
    let config = project.config();
    let target = SpecLocation::parse_target(target).expect("valid target");
    let target = canonicalize_target(&target.with_path(project.root().join(target.path())))
        .expect("target exists");
    let root = find_project_root(target.path(), &config.discovery.root_marker)
        .expect("project root found");
    assert_eq!(root, project.root());

    let discovery = TestDiscovery::new(&root, &config.discovery);
    let sink = with_progress
        .then(|| Box::new(ProgressBarDisplay::hidden()) as Box<dyn ProgressSink>);
    let mut runner = ProcessRunner::new(
        TestCommand::new(&config.runner, &root),
        target.clone(),
        config.progress.clone(),
        sink,
    );

    let mut probe_kinds = Vec::new();
    let outcome = Bisector::new(&mut runner, &discovery, target)
        .run(|event| {
            if let BisectEvent::ProbeStarted { kind, .. } = event {
                probe_kinds.push(kind);
            }
        })
        .expect("bisection completes");
    (outcome, probe_kinds)
}

#[test]
fn finds_culprit_in_other_file() {
    for with_progress in [false, true] {
        let project = FakeProject::new();
        let (outcome, probe_kinds) = bisect(&project, "spec/target_spec.rb:5", with_progress);

        let BisectOutcome::Found { culprit } = outcome else {
            panic!("expected a culprit, found {outcome:?}");
        };
        assert_eq!(
            relative(culprit.path(), &project.root()).as_str(),
            "spec/poison_spec.rb"
        );
        assert_eq!(culprit.line().map(|line| line.get()), Some(5));

        // Files: [a, b] passes, [poison, z] fails, [poison] fails.
        // Cases: [2] passes, [5, 8] fails, [5] fails.
        assert_eq!(
            probe_kinds,
            [
                UnitKind::Files,
                UnitKind::Files,
                UnitKind::Files,
                UnitKind::Cases,
                UnitKind::Cases,
                UnitKind::Cases,
            ],
            "with_progress = {with_progress}"
        );
    }
}

#[test]
fn fails_in_isolation() {
    let project = FakeProject::new();
    let (outcome, probe_kinds) = bisect(&project, "spec/poison_spec.rb:5", false);

    let BisectOutcome::FailsInIsolation { result } = outcome else {
        panic!("expected an isolation failure, found {outcome:?}");
    };
    assert!(!result.success);
    assert!(result.output.contains('F'), "output: {}", result.output);
    assert!(probe_kinds.is_empty(), "no search was run");
}

#[test]
fn culprit_in_own_file() {
    let project = FakeProject::new();
    // Line 8 of the poisoned file passes alone, but line 5 of the same file breaks it.
    project.write(
        "bin/fake-rspec",
        indoc::indoc! {r#"
            #!/bin/sh
            for arg in "$@"; do
              case "$arg" in
                *poison_spec.rb:5) printf 'F\n'; exit 1 ;;
              esac
            done
        "#},
    );
    let (outcome, probe_kinds) = bisect(&project, "spec/poison_spec.rb:8", false);

    let BisectOutcome::Found { culprit } = outcome else {
        panic!("expected a culprit, found {outcome:?}");
    };
    assert_eq!(culprit.to_string(), format!("{}:5", project.spec("poison")));
    assert_eq!(probe_kinds, [UnitKind::Cases, UnitKind::Cases]);
}

#[test]
fn no_culprit_file() {
    let project = FakeProject::new();
    project.write("bin/fake-rspec", "exit 0\n");
    let (outcome, _) = bisect(&project, "spec/target_spec.rb:5", false);
    assert_eq!(outcome, BisectOutcome::NoCulpritFile);
}

#[test]
fn discovery_lists_files_and_cases() {
    let project = FakeProject::new();
    let config = project.config();
    let discovery = TestDiscovery::new(project.root(), &config.discovery);

    let files: Vec<_> = discovery
        .test_files()
        .expect("files listed")
        .into_iter()
        .map(|file| relative(file.path(), &project.root()).to_string())
        .collect();
    assert_eq!(
        files,
        [
            "spec/a_spec.rb",
            "spec/b_spec.rb",
            "spec/poison_spec.rb",
            "spec/target_spec.rb",
            "spec/z_spec.rb",
        ]
    );

    let cases: Vec<_> = discovery
        .test_cases(&project.spec("a"))
        .expect("cases listed")
        .into_iter()
        .filter_map(|case| case.line())
        .map(|line| line.get())
        .collect();
    assert_eq!(cases, [2, 5, 8]);
}

#[test]
fn command_line_lists_target_last() {
    let project = FakeProject::new();
    let config = project.config();
    let target = SpecLocation::parse_target(&format!("{}:5", project.spec("target")))
        .expect("valid target");
    let runner = ProcessRunner::new(
        TestCommand::new(&config.runner, project.root()),
        target.clone(),
        config.progress.clone(),
        None,
    );

    let others = [SpecLocation::file(project.spec("a"))];
    let words = shell_words::split(&runner.command_line(&others)).expect("valid shell words");
    let target_pos = words
        .iter()
        .position(|word| *word == target.to_string())
        .expect("target present");
    let other_pos = words
        .iter()
        .position(|word| *word == others[0].to_string())
        .expect("other present");
    assert!(other_pos < target_pos);
}
