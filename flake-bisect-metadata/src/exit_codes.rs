// Copyright (c) The flake-bisect Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

/// Documented exit codes for `flake-bisect` failures.
///
/// A search that reaches a verdict always exits with [`Self::OK`], whether or not a culprit was
/// found: "could not isolate" is an answer, not a failure. The codes below are reserved for runs
/// that could not produce a verdict at all.
///
/// Unknown/unexpected failures will always result in exit code 1.
pub enum BisectExitCode {}

impl BisectExitCode {
    /// A verdict was reached and reported.
    pub const OK: i32 = 0;

    /// The target identifier was malformed, or the target file does not exist.
    pub const USAGE_ERROR: i32 = 96;

    /// A configuration file could not be read or parsed.
    pub const CONFIG_PARSE_FAILED: i32 = 94;

    /// The project root could not be located from the target file.
    pub const PROJECT_ROOT_NOT_FOUND: i32 = 101;

    /// The test runner could not be launched.
    pub const RUNNER_EXEC_FAILED: i32 = 102;

    /// Test files or test cases could not be enumerated.
    pub const DISCOVERY_FAILED: i32 = 103;

    /// Writing the report to stdout or stderr produced an error.
    pub const WRITE_OUTPUT_ERROR: i32 = 110;
}
