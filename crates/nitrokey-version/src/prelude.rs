//! Convenience re-exports for common version types.

pub use crate::{error::VersionError, select::select_by_start, version::Version};
