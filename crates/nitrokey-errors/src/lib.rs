//! Shared error types for the Nitrokey SDK
//!
//! This crate holds the error taxonomy that every layer of the SDK agrees on:
//! transport failures reported by a device connection, CTAP status codes
//! returned by the firmware, and the severity/category classification used by
//! front ends to pick exit codes and log levels.
//!
//! # Architecture
//!
//! - [`common`]: Severity levels and error categories used across all crates
//! - [`ctap`]: CTAP status codes returned by the Trussed firmware
//! - [`device`]: Device and transport errors
//!
//! # Example
//!
//! ```
//! use nitrokey_errors::prelude::*;
//!
//! fn read_uuid(reply: &[u8]) -> Result<[u8; 16], DeviceError> {
//!     reply
//!         .try_into()
//!         .ok()
//!         .ok_or_else(|| DeviceError::invalid_response("UUID", 16, reply.len()))
//! }
//!
//! let err = read_uuid(&[0u8; 4]).unwrap_err();
//! assert_eq!(err.severity(), ErrorSeverity::Error);
//! ```

#![deny(unsafe_op_in_unsafe_fn, clippy::unwrap_used)]
#![warn(missing_docs, rust_2018_idioms)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod common;
pub mod ctap;
pub mod device;
pub mod prelude;

pub use common::{ErrorCategory, ErrorSeverity};
pub use ctap::CtapCode;
pub use device::DeviceError;

/// A specialized `Result` type for device operations.
pub type DeviceResult<T> = std::result::Result<T, DeviceError>;
