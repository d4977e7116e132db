//! Error classification shared by all SDK crates.
//!
//! Every error type in the workspace maps onto an [`ErrorCategory`] and an
//! [`ErrorSeverity`]. Front ends use the category to pick a process exit code
//! and the severity to decide how loudly to report a failure.

use core::fmt;

/// Error category for classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ErrorCategory {
    /// Device and transport errors
    Device = 0,
    /// Version parsing errors
    Version = 1,
    /// Signature and certificate errors
    Crypto = 2,
    /// Firmware container errors
    Container = 3,
    /// Firmware image errors
    Image = 4,
    /// Release repository errors
    Release = 5,
    /// Update policy errors (downgrades, warnings, aborted confirmations)
    Policy = 6,
    /// I/O errors
    IO = 7,
    /// Configuration errors
    Config = 8,
    /// Other errors
    Other = 255,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCategory::Device => write!(f, "Device"),
            ErrorCategory::Version => write!(f, "Version"),
            ErrorCategory::Crypto => write!(f, "Crypto"),
            ErrorCategory::Container => write!(f, "Container"),
            ErrorCategory::Image => write!(f, "Image"),
            ErrorCategory::Release => write!(f, "Release"),
            ErrorCategory::Policy => write!(f, "Policy"),
            ErrorCategory::IO => write!(f, "IO"),
            ErrorCategory::Config => write!(f, "Config"),
            ErrorCategory::Other => write!(f, "Other"),
        }
    }
}

/// Error severity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum ErrorSeverity {
    /// Informational, no action required
    Info = 0,
    /// Warning, may require attention
    Warning = 1,
    /// Error, operation failed
    Error = 2,
    /// Critical, the device may be in an unknown state
    Critical = 3,
}

impl ErrorSeverity {
    /// Check if an error of this severity leaves the device untouched.
    pub fn is_recoverable(self) -> bool {
        self < ErrorSeverity::Critical
    }
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorSeverity::Info => write!(f, "INFO"),
            ErrorSeverity::Warning => write!(f, "WARN"),
            ErrorSeverity::Error => write!(f, "ERROR"),
            ErrorSeverity::Critical => write!(f, "CRITICAL"),
        }
    }
}
