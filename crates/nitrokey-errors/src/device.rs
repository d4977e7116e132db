//! Device and transport error types.
//!
//! A device connection reports every failure as a [`DeviceError`], whether it
//! is talking CTAPHID over HID or APDUs over CCID. Transport-specific timeouts
//! are folded into [`DeviceError::Timeout`] so callers never need to know which
//! transport produced them.

use crate::common::{ErrorCategory, ErrorSeverity};
use crate::ctap::CtapCode;

/// Device and transport errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeviceError {
    /// Device not found
    #[error("Device not found: {0}")]
    NotFound(String),

    /// Device disconnected
    #[error("Device disconnected: {0}")]
    Disconnected(String),

    /// Low-level I/O failure on the transport
    #[error("Communication error with device {device}: {message}")]
    CommunicationError {
        /// Device identifier
        device: String,
        /// Error message
        message: String,
    },

    /// The firmware rejected a command with a CTAP status code
    #[error("The CTAPHID {command} command failed with status {code}")]
    Ctap {
        /// Command name
        command: String,
        /// Returned status
        code: CtapCode,
    },

    /// A response had the wrong length
    #[error(
        "The response for the CTAPHID {command} command has an unexpected length (expected: {expected}, actual: {actual})"
    )]
    InvalidResponse {
        /// Command name
        command: String,
        /// Expected byte count
        expected: usize,
        /// Actual byte count
        actual: usize,
    },

    /// A response could not be decoded
    #[error("Malformed response for the {command} command: {message}")]
    MalformedResponse {
        /// Command name
        command: String,
        /// Error message
        message: String,
    },

    /// No response within the transport's time budget
    #[error("Device {device} timeout after {timeout_ms}ms")]
    Timeout {
        /// Device identifier
        device: String,
        /// Timeout in milliseconds
        timeout_ms: u64,
    },

    /// The user did not confirm a request with the touch button in time
    #[error("The user confirmation request timed out")]
    ConfirmationTimeout,

    /// Unsupported device
    #[error("Unsupported device: vendor={vendor_id:#06x}, product={product_id:#06x}")]
    UnsupportedDevice {
        /// USB vendor ID
        vendor_id: u16,
        /// USB product ID
        product_id: u16,
    },
}

impl DeviceError {
    /// Get the error severity.
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            DeviceError::NotFound(_) => ErrorSeverity::Error,
            DeviceError::Disconnected(_) => ErrorSeverity::Critical,
            DeviceError::CommunicationError { .. } => ErrorSeverity::Error,
            DeviceError::Ctap { .. } => ErrorSeverity::Error,
            DeviceError::InvalidResponse { .. } => ErrorSeverity::Error,
            DeviceError::MalformedResponse { .. } => ErrorSeverity::Error,
            DeviceError::Timeout { .. } => ErrorSeverity::Warning,
            DeviceError::ConfirmationTimeout => ErrorSeverity::Warning,
            DeviceError::UnsupportedDevice { .. } => ErrorSeverity::Error,
        }
    }

    /// All device errors belong to the device category.
    pub fn category(&self) -> ErrorCategory {
        ErrorCategory::Device
    }

    /// Check if this error means the device vanished from the bus.
    ///
    /// A device that reboots drops its connection mid-transaction, which shows
    /// up as either a disconnect or a raw I/O failure.
    pub fn is_disconnect(&self) -> bool {
        matches!(
            self,
            DeviceError::Disconnected(_) | DeviceError::CommunicationError { .. }
        )
    }

    /// The CTAP status code, if the firmware rejected the command.
    pub fn ctap_code(&self) -> Option<CtapCode> {
        match self {
            DeviceError::Ctap { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Create a not found error.
    pub fn not_found(device: impl Into<String>) -> Self {
        DeviceError::NotFound(device.into())
    }

    /// Create a disconnected error.
    pub fn disconnected(device: impl Into<String>) -> Self {
        DeviceError::Disconnected(device.into())
    }

    /// Create a communication error.
    pub fn communication(device: impl Into<String>, message: impl Into<String>) -> Self {
        DeviceError::CommunicationError {
            device: device.into(),
            message: message.into(),
        }
    }

    /// Create a CTAP status error.
    pub fn ctap(command: impl Into<String>, code: impl Into<CtapCode>) -> Self {
        DeviceError::Ctap {
            command: command.into(),
            code: code.into(),
        }
    }

    /// Create a response length error.
    pub fn invalid_response(command: impl Into<String>, expected: usize, actual: usize) -> Self {
        DeviceError::InvalidResponse {
            command: command.into(),
            expected,
            actual,
        }
    }

    /// Create a malformed response error.
    pub fn malformed(command: impl Into<String>, message: impl Into<String>) -> Self {
        DeviceError::MalformedResponse {
            command: command.into(),
            message: message.into(),
        }
    }

    /// Create a timeout error.
    pub fn timeout(device: impl Into<String>, timeout_ms: u64) -> Self {
        DeviceError::Timeout {
            device: device.into(),
            timeout_ms,
        }
    }

    /// Create an unsupported device error.
    pub fn unsupported(vendor_id: u16, product_id: u16) -> Self {
        DeviceError::UnsupportedDevice {
            vendor_id,
            product_id,
        }
    }
}
