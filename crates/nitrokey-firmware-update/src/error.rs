//! Error types for firmware update operations
//!
//! Every stage of the pipeline has its own error enum. [`UpdateError`] wraps
//! them at the orchestration level and adds the context of the step that
//! failed.

use nitrokey_crypto::CryptoError;
use nitrokey_device::{AdminVariant, Model, Variant};
use nitrokey_errors::{DeviceError, ErrorCategory, ErrorSeverity};
use nitrokey_version::{Version, VersionError};
use thiserror::Error;

use crate::updater::UpdateStep;
use crate::warning::Warning;

/// Errors raised while reading a firmware container
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ContainerError {
    /// The archive, one of its entries or the manifest is not well-formed
    #[error("Malformed firmware container: {0}")]
    Malformed(String),

    /// An entry is missing from `sha256sums` or its checksum differs
    #[error("Checksum verification failed for {path}: {reason}")]
    ChecksumMismatch {
        /// Archive entry
        path: String,
        /// What went wrong
        reason: String,
    },

    /// The container was built for another model
    #[error("Expected firmware container for {expected}, got {actual}")]
    ModelMismatch {
        /// Model the caller asked for
        expected: Model,
        /// Device string found in the manifest
        actual: String,
    },

    /// A version field of the manifest could not be parsed
    #[error("Invalid version in firmware container: {0}")]
    Version(#[from] VersionError),

    /// The container file could not be read
    #[error("Failed to read firmware container {path}: {message}")]
    Io {
        /// File path
        path: String,
        /// I/O error message
        message: String,
    },
}

/// Format-specific reasons why a firmware image could not be parsed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The NRF52 package is not a readable ZIP archive
    #[error("Invalid firmware package: {0}")]
    Archive(String),

    /// The NRF52 package manifest is missing or incomplete
    #[error("{0}")]
    Manifest(String),

    /// The DFU init packet could not be decoded
    #[error("Failed to decode init packet: {0}")]
    InitPacket(String),

    /// The init packet carries no init command
    #[error("The init packet does not contain an init command")]
    MissingInitCommand,

    /// The init command does not describe the application binary
    #[error("Invalid app size (expected {expected}, got {actual})")]
    InvalidAppSize {
        /// Size announced in the init command
        expected: u64,
        /// Size of the binary in the package
        actual: u64,
    },

    /// The init command hash does not match the application binary
    #[error("Invalid hash for firmware image")]
    InvalidHash,

    /// The image ended before a structure was complete
    #[error("Unexpected end of data at offset {offset} (needed {needed} more bytes)")]
    Truncated {
        /// Read position
        offset: usize,
        /// Bytes requested
        needed: usize,
    },

    /// The SB2.1 image header is invalid
    #[error("Invalid SB2.1 image header: {0}")]
    InvalidHeader(String),

    /// The SB2.1 certificate block is invalid
    #[error("Invalid certificate block: {0}")]
    InvalidCertificateBlock(String),

    /// Signature or certificate processing failed
    #[error("Signature verification failed: {0}")]
    Crypto(#[from] CryptoError),

    /// The image signature does not match the certificate chain
    #[error("Verification failed")]
    VerificationFailed,

    /// The hash of the bootable section does not match
    #[error("Invalid bootable section SHA")]
    InvalidBootableSectionHash,

    /// The embedded version is invalid
    #[error("Invalid firmware version: {0}")]
    Version(#[from] VersionError),
}

/// Errors raised when validating a firmware image for an update
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ImageError {
    /// The image could not be parsed
    #[error("Failed to parse firmware image")]
    ParseFailure {
        /// Parser error
        #[source]
        source: ParseError,
    },

    /// The image reports another version than its release
    #[error(
        "The firmware image for the release {expected} has an unexpected product version ({actual})."
    )]
    VersionMismatch {
        /// Release version
        expected: Version,
        /// Version embedded in the image
        actual: Version,
    },

    /// The image carries no signature
    #[error("Firmware image is not signed")]
    Unsigned,

    /// The image is signed, but not with an official key
    #[error("Firmware image is not signed by Nitrokey (signed by: {0})")]
    UntrustedSigner(String),
}

impl ContainerError {
    /// Error category of every container error.
    pub fn category(&self) -> ErrorCategory {
        ErrorCategory::Container
    }
}

impl ParseError {
    /// Error category of every parse error.
    pub fn category(&self) -> ErrorCategory {
        ErrorCategory::Image
    }
}

impl ImageError {
    /// Error category of every image error.
    pub fn category(&self) -> ErrorCategory {
        ErrorCategory::Image
    }
}

impl From<ParseError> for ImageError {
    fn from(source: ParseError) -> Self {
        ImageError::ParseFailure { source }
    }
}

/// Errors raised by a release repository
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReleaseError {
    /// The requested release does not exist
    #[error("Failed to find firmware release {tag}")]
    NotFound {
        /// Release tag
        tag: String,
    },

    /// The release has no assets at all
    #[error("No update files for firmware release {tag}")]
    NoAssets {
        /// Release tag
        tag: String,
    },

    /// No asset matches the pattern
    #[error("Failed to find asset for release {tag} matching {pattern}")]
    NoMatchingAsset {
        /// Release tag
        tag: String,
        /// Asset pattern
        pattern: String,
    },

    /// More than one asset matches the pattern
    #[error("Found multiple assets for release {tag} matching {pattern}")]
    AmbiguousAsset {
        /// Release tag
        tag: String,
        /// Asset pattern
        pattern: String,
    },

    /// The asset pattern is not a valid regular expression
    #[error("Invalid asset pattern {pattern}: {message}")]
    InvalidPattern {
        /// Asset pattern
        pattern: String,
        /// Regex error message
        message: String,
    },

    /// An HTTP request failed
    #[error("Cannot download firmware: {0}")]
    Http(String),

    /// The download target already exists
    #[error("File {0} already exists and may not be overwritten")]
    Overwrite(String),

    /// Writing a downloaded file failed
    #[error("I/O error: {0}")]
    Io(String),
}

impl ReleaseError {
    /// Error category of every repository error.
    pub fn category(&self) -> ErrorCategory {
        ErrorCategory::Release
    }
}

/// A warning id that does not name a known [`Warning`]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unexpected update warning id: {0}")]
pub struct UnknownWarning(pub String);

/// Errors raised by the update orchestrator
#[derive(Error, Debug, Clone)]
pub enum UpdateError {
    /// The user refused a confirmation
    #[error("The firmware update was aborted")]
    Aborted,

    /// A warning was triggered and not ignored
    #[error("{}", .0.message())]
    Warning(Warning),

    /// The new firmware is older than the installed one
    #[error(
        "The firmware version {new} is older than the firmware version {current} currently installed."
    )]
    DowngradeRejected {
        /// Installed version
        current: Version,
        /// Version of the update
        new: Version,
    },

    /// The container requires a newer client
    #[error(
        "This update requires pynitrokey {required} or newer, but the current version is {current}"
    )]
    OutdatedClient {
        /// Client version the container asks for
        required: Version,
        /// Client compatibility level of this crate
        current: Version,
    },

    /// The user did not confirm the reboot with the touch button
    #[error("The reboot was not confirmed with the touch button")]
    RebootNotConfirmed,

    /// The bootloader did not show up after the reboot
    #[error("Failed to connect to {model} bootloader")]
    BootloaderUnreachable {
        /// Device model
        model: Model,
        /// Number of connection attempts
        attempts: usize,
        /// Error of the last attempt
        #[source]
        last_error: Option<DeviceError>,
    },

    /// The container has no image for the hardware variant
    #[error("The firmware release does not contain an image for the {0} hardware variant")]
    NoImageForVariant(Variant),

    /// The image for the bootloader variant is invalid
    #[error("Failed to validate firmware image")]
    InvalidImage(#[source] ImageError),

    /// The device reports a variant that cannot be updated
    #[error("Cannot perform firmware update for {} runner", .0.to_string().to_uppercase())]
    UnsupportedVariant(AdminVariant),

    /// Writing the image to the bootloader failed
    #[error("Failed to perform firmware update")]
    FlashFailed(#[source] DeviceError),

    /// The device came back with another version than expected
    #[error(
        "The firmware update to {expected} was successful, but the firmware is still reporting version {actual}."
    )]
    PostUpdateVersionMismatch {
        /// Version of the update
        expected: Version,
        /// Version reported after the update
        actual: Version,
    },

    /// The release tag is not a version
    #[error("Failed to parse version from release tag {tag}")]
    InvalidReleaseTag {
        /// Release tag
        tag: String,
        /// Parser error
        #[source]
        source: VersionError,
    },

    /// The downloaded container does not belong to its release
    #[error("The firmware container for {tag} has the version {version}")]
    ReleaseVersionMismatch {
        /// Release tag
        tag: String,
        /// Container version
        version: Version,
    },

    /// No release repository was configured for a download
    #[error("No firmware release repository configured for {0}")]
    NoRepository(Model),

    /// Reading or parsing the container failed
    #[error("{context}")]
    Container {
        /// What was being done
        context: String,
        /// Container error
        #[source]
        source: ContainerError,
    },

    /// A release repository request failed
    #[error("{context}")]
    Release {
        /// What was being done
        context: String,
        /// Repository error
        #[source]
        source: ReleaseError,
    },

    /// Talking to the device failed
    #[error("{context}")]
    Device {
        /// Step of the update
        step: UpdateStep,
        /// What was being done
        context: String,
        /// Device error
        #[source]
        source: DeviceError,
    },
}

impl UpdateError {
    /// The step of the update this error belongs to.
    ///
    /// Returns `None` for refusals and warnings, which can happen at any step.
    pub fn step(&self) -> Option<UpdateStep> {
        match self {
            UpdateError::Aborted | UpdateError::Warning(_) => None,
            UpdateError::DowngradeRejected { .. }
            | UpdateError::OutdatedClient { .. }
            | UpdateError::InvalidReleaseTag { .. }
            | UpdateError::ReleaseVersionMismatch { .. }
            | UpdateError::NoRepository(_)
            | UpdateError::Container { .. }
            | UpdateError::Release { .. }
            | UpdateError::UnsupportedVariant(_) => Some(UpdateStep::VersionCheck),
            UpdateError::RebootNotConfirmed | UpdateError::BootloaderUnreachable { .. } => {
                Some(UpdateStep::BootloaderTransition)
            }
            UpdateError::NoImageForVariant(_) | UpdateError::InvalidImage(_) => {
                Some(UpdateStep::ImageValidation)
            }
            UpdateError::FlashFailed(_) => Some(UpdateStep::Flashing),
            UpdateError::PostUpdateVersionMismatch { .. } => Some(UpdateStep::FinalizationWait),
            UpdateError::Device { step, .. } => Some(*step),
        }
    }

    /// Whether the device firmware was changed before the error occurred.
    pub fn is_device_modified(&self) -> bool {
        matches!(self, UpdateError::PostUpdateVersionMismatch { .. })
    }

    /// Error category, used by front ends to pick an exit code.
    pub fn category(&self) -> ErrorCategory {
        match self {
            UpdateError::Aborted
            | UpdateError::Warning(_)
            | UpdateError::DowngradeRejected { .. }
            | UpdateError::OutdatedClient { .. } => ErrorCategory::Policy,
            UpdateError::Container { .. } => ErrorCategory::Container,
            UpdateError::NoImageForVariant(_) | UpdateError::InvalidImage(_) => {
                ErrorCategory::Image
            }
            UpdateError::Release { .. }
            | UpdateError::InvalidReleaseTag { .. }
            | UpdateError::ReleaseVersionMismatch { .. } => ErrorCategory::Release,
            UpdateError::NoRepository(_) => ErrorCategory::Config,
            UpdateError::RebootNotConfirmed
            | UpdateError::BootloaderUnreachable { .. }
            | UpdateError::UnsupportedVariant(_)
            | UpdateError::FlashFailed(_)
            | UpdateError::PostUpdateVersionMismatch { .. }
            | UpdateError::Device { .. } => ErrorCategory::Device,
        }
    }

    /// Severity used by front ends to pick log levels.
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            UpdateError::Aborted | UpdateError::Warning(_) => ErrorSeverity::Warning,
            UpdateError::FlashFailed(_) | UpdateError::PostUpdateVersionMismatch { .. } => {
                ErrorSeverity::Critical
            }
            UpdateError::Device { source, .. } => source.severity(),
            _ => ErrorSeverity::Error,
        }
    }

    /// Platform-specific advice for the operator, if any.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            UpdateError::BootloaderUnreachable { .. } if cfg!(target_os = "linux") => {
                Some("Are the Nitrokey udev rules installed and active?")
            }
            _ => None,
        }
    }

    pub(crate) fn device(step: UpdateStep, context: impl Into<String>, source: DeviceError) -> Self {
        UpdateError::Device {
            step,
            context: context.into(),
            source,
        }
    }

    pub(crate) fn container(context: impl Into<String>, source: ContainerError) -> Self {
        UpdateError::Container {
            context: context.into(),
            source,
        }
    }

    pub(crate) fn release(context: impl Into<String>, source: ReleaseError) -> Self {
        UpdateError::Release {
            context: context.into(),
            source,
        }
    }
}

/// Result type for update operations
pub type UpdateResult<T> = std::result::Result<T, UpdateError>;
