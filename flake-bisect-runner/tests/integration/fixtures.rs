// Copyright (c) The flake-bisect Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use camino::{Utf8Path, Utf8PathBuf};
use camino_tempfile::Utf8TempDir;
use flake_bisect_runner::config::BisectConfig;
use indoc::indoc;

/// A stand-in for the test runner.
///
/// Prints a progress marker per location and fails as soon as it sees one that leaks state:
/// either the whole poisoned file, or its case at line 5.
const FAKE_RUNNER: &str = indoc! {r#"
    #!/bin/sh
    for arg in "$@"; do
      case "$arg" in
        --*) ;;
        *poison_spec.rb|*poison_spec.rb:5) printf 'F\n'; exit 1 ;;
        *) printf '.' ;;
      esac
    done
    printf '\n'
"#};

const CASES: &str = indoc! {r#"
    RSpec.describe "things" do
      it "does one thing" do
      end

      it "does another thing" do
      end

      it "does a third thing" do
      end
    end
"#};

pub(crate) struct FakeProject {
    dir: Utf8TempDir,
}

impl FakeProject {
    /// Creates a project with four ordinary spec files, a poisoned one and the target's file.
    pub(crate) fn new() -> Self {
        let dir = Utf8TempDir::new().expect("created temp dir");
        let project = Self { dir };

        project.write("Gemfile", "source \"https://rubygems.org\"\n");
        project.write("bin/fake-rspec", FAKE_RUNNER);
        for name in ["a", "b", "poison", "target", "z"] {
            project.write(&format!("spec/{name}_spec.rb"), CASES);
        }
        project.write("spec/spec_helper.rb", "");
        project
    }

    pub(crate) fn root(&self) -> Utf8PathBuf {
        self.dir
            .path()
            .canonicalize_utf8()
            .expect("temp dir can be canonicalized")
    }

    pub(crate) fn write(&self, rel: &str, contents: &str) {
        let path = self.dir.path().join(rel);
        std::fs::create_dir_all(path.parent().expect("path has a parent")).expect("created dirs");
        std::fs::write(&path, contents).expect("wrote file");
    }

    /// Returns the default config with the runner replaced by the fake one.
    pub(crate) fn config(&self) -> BisectConfig {
        let mut config = BisectConfig::from_sources(&self.root(), None).expect("config loads");
        config.runner.command = vec![
            "sh".to_owned(),
            self.root().join("bin/fake-rspec").into_string(),
        ];
        config
    }

    pub(crate) fn spec(&self, name: &str) -> Utf8PathBuf {
        self.root().join("spec").join(format!("{name}_spec.rb"))
    }
}

pub(crate) fn relative<'a>(path: &'a Utf8Path, root: &Utf8Path) -> &'a Utf8Path {
    path.strip_prefix(root).expect("path is under root")
}
