//! Error types for version parsing

use thiserror::Error;

/// Errors that can occur when parsing a firmware version
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VersionError {
    /// The core is not made of exactly three dot-separated components
    #[error("Invalid firmware version: {0}")]
    InvalidVersion(String),

    /// A core component is not an unsigned integer
    #[error("Invalid component in firmware version: {0}")]
    InvalidComponent(String),

    /// The string lacks the leading `v`
    #[error("Missing v prefix for firmware version: {0}")]
    MissingPrefix(String),

    /// A BCD-encoded component contains a nibble above nine
    #[error("Invalid BCD-encoded version component: {0:#06x}")]
    InvalidBcd(u16),
}
