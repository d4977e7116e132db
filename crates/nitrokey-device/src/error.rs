//! Error types for model parsing and the admin application.

use nitrokey_errors::DeviceError;

use crate::admin::AdminVariant;

/// Errors raised when mapping names or identifiers to models and variants.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    /// The string does not name a known model
    #[error("Unknown model {0}")]
    UnknownModel(String),

    /// The string does not name a known hardware variant
    #[error("Unknown variant {0}")]
    UnknownVariant(String),

    /// The admin app reported a variant that cannot be flashed
    #[error("Unsupported variant {0}")]
    UnsupportedVariant(AdminVariant),
}

/// Errors from admin-app commands that carry an application-level status.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AdminError {
    /// Transport or protocol failure
    #[error(transparent)]
    Device(#[from] DeviceError),

    /// The device answered with an empty reply where a status byte was required
    #[error("The device returned an empty response")]
    EmptyResponse,

    /// A configuration command was rejected
    #[error("{context}: {reason}")]
    Config {
        /// What was being attempted
        context: String,
        /// Reason reported by the device
        reason: String,
    },

    /// A factory reset command was rejected
    #[error("{context}: {reason}")]
    FactoryReset {
        /// What was being attempted
        context: String,
        /// Reason reported by the device
        reason: String,
    },
}

/// A specialized `Result` type for admin-app commands.
pub type AdminResult<T> = std::result::Result<T, AdminError>;
