// Copyright (c) The flake-bisect Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! Core functionality for `flake-bisect`: isolating the test that leaks state into a flaky one.
//!
//! The basic flow is:
//!
//! 1. Check that the target passes on its own ([`verify::isolation`]).
//! 2. Run it together with the rest of its own file ([`verify::co_location`]).
//! 3. Bisect over either every other test file, or the other cases in the target's file
//!    ([`minimize::Minimizer`]), and then over the cases of the culprit file.
//!
//! [`bisect::Bisector`] drives these steps against a [`runner::Probe`], which is normally a
//! [`runner::ProcessRunner`] invoking the real test runner.

pub mod bisect;
pub mod config;
pub mod discovery;
pub mod errors;
pub mod location;
pub mod minimize;
pub mod reporter;
pub mod runner;
pub mod test_command;
pub mod verify;

#[cfg(test)]
mod test_helpers;
