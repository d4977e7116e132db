//! Firmware version model for Nitrokey Trussed devices
//!
//! Versions follow Semantic Versioning 2.0.0 with one twist: some sources of
//! version information (older firmware, the packed integer embedded in
//! firmware binaries) cannot report a pre-release component. Such versions
//! are marked as *incomplete* and compare equal to any version with the same
//! core, regardless of the pre-release tag.
//!
//! # Architecture
//!
//! - [`version`]: The [`Version`] type, its parsers and its ordering
//! - [`select`]: Picking version-ranged entries such as key sets
//! - [`error`]: Parse errors
//!
//! # Example
//!
//! ```
//! use nitrokey_version::prelude::*;
//!
//! # fn main() -> Result<(), VersionError> {
//! let release = Version::from_v_str("v1.8.2")?;
//! let candidate = Version::from_v_str("v1.8.2-rc.1")?;
//! assert!(candidate < release);
//!
//! // The packed representation carries no pre-release tag.
//! let packed = Version::from_packed(0x0040_0200);
//! assert_eq!(packed, Version::from_v_str("v1.8.0-rc.1")?);
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_op_in_unsafe_fn, clippy::unwrap_used)]
#![warn(missing_docs, rust_2018_idioms)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod error;
pub mod prelude;
pub mod select;
pub mod version;

pub use error::VersionError;
pub use select::select_by_start;
pub use version::Version;
