// Copyright (c) The flake-bisect Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Find the test that makes an order-dependent test fail.
//!
//! Given a test that passes when run alone but fails as part of a larger run, `flake-bisect`
//! repeatedly runs it after halves of the rest of the suite, first narrowing down to a single
//! test file and then to a single test within it. The core search lives in
//! [`flake_bisect_runner`]; this crate is the command-line interface around it.

#![warn(missing_docs)]

mod dispatch;
mod errors;
mod output;
mod report;
mod reporter;

#[doc(hidden)]
pub use dispatch::*;
#[doc(hidden)]
pub use errors::*;
#[doc(hidden)]
pub use output::OutputWriter;
