//! Shared test utilities for the Nitrokey SDK.
//!
//! This crate provides common test helpers, mocks, and signed fixtures
//! to reduce code duplication across the test suite.
//!
//! # Modules
//!
//! - [`mod@must`] - Unwrap helpers with good error messages and `#[track_caller]`
//! - [`mock`] - Scripted device connections and bootloaders
//! - [`certificates`] - Throwaway RSA certificate chains
//! - [`fixtures`] - Builders for firmware containers and signed images
//! - [`prelude`] - Convenience re-exports
//!
//! # Usage
//!
//! Add to your `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! nitrokey-test-helpers = { workspace = true, features = ["mock"] }
//! ```
//!
//! Then import the prelude:
//!
//! ```rust,ignore
//! use nitrokey_test_helpers::prelude::*;
//! ```
//!
//! The `mock` and `fixtures` features depend on the crates they help to
//! test, so they are only usable from integration tests (`tests/`), never
//! from `#[cfg(test)]` modules inside those crates.

#![deny(unsafe_op_in_unsafe_fn)]
#![allow(clippy::unwrap_used, clippy::panic, clippy::expect_used, clippy::indexing_slicing)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod must;
pub mod prelude;

#[cfg(feature = "mock")]
#[cfg_attr(docsrs, doc(cfg(feature = "mock")))]
pub mod mock;

#[cfg(feature = "certificates")]
#[cfg_attr(docsrs, doc(cfg(feature = "certificates")))]
pub mod certificates;

#[cfg(feature = "fixtures")]
#[cfg_attr(docsrs, doc(cfg(feature = "fixtures")))]
pub mod fixtures;

pub use must::*;
