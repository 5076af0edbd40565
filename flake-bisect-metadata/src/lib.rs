// Copyright (c) The flake-bisect Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! Metadata shared between `flake-bisect` and tools that drive it.
//!
//! At the moment this is limited to the documented process exit codes, see [`BisectExitCode`].

mod exit_codes;

pub use exit_codes::*;
