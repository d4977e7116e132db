//! Error types and exit codes for nkctl

use nitrokey_errors::ErrorCategory;
use nitrokey_firmware_update::{ContainerError, ImageError, ParseError, ReleaseError, UpdateError};
use thiserror::Error;

/// Errors raised by the command line front end itself.
#[derive(Error, Debug)]
pub enum CliError {
    #[error("Cannot determine the hardware variant of {0}, use --variant")]
    UnknownVariant(String),

    #[error("{count} of {total} firmware images failed validation")]
    ValidationFailed { count: usize, total: usize },
}

impl CliError {
    /// Whether the command already printed the details of this error.
    pub fn is_reported(&self) -> bool {
        matches!(self, CliError::ValidationFailed { .. })
    }
}

/// Process exit codes.
pub mod exit_code {
    pub const FAILURE: u8 = 1;
    pub const INVALID_INPUT: u8 = 2;
    pub const INVALID_CONTAINER: u8 = 3;
    pub const INVALID_IMAGE: u8 = 4;
    pub const UPDATE_REJECTED: u8 = 5;
    pub const RELEASE_ERROR: u8 = 6;
    pub const ABORTED: u8 = 7;
}

fn code_for_category(category: ErrorCategory) -> u8 {
    match category {
        ErrorCategory::Container => exit_code::INVALID_CONTAINER,
        ErrorCategory::Image => exit_code::INVALID_IMAGE,
        ErrorCategory::Policy => exit_code::UPDATE_REJECTED,
        ErrorCategory::Release => exit_code::RELEASE_ERROR,
        _ => exit_code::FAILURE,
    }
}

/// Pick the exit code for an error from the first cause we know about.
pub fn exit_code_for(error: &anyhow::Error) -> u8 {
    for cause in error.chain() {
        if let Some(err) = cause.downcast_ref::<CliError>() {
            return match err {
                CliError::UnknownVariant(_) => exit_code::INVALID_INPUT,
                CliError::ValidationFailed { .. } => exit_code::INVALID_IMAGE,
            };
        }
        if let Some(err) = cause.downcast_ref::<UpdateError>() {
            return match err {
                UpdateError::Aborted => exit_code::ABORTED,
                _ => code_for_category(err.category()),
            };
        }
        let category = if let Some(err) = cause.downcast_ref::<ContainerError>() {
            err.category()
        } else if let Some(err) = cause.downcast_ref::<ImageError>() {
            err.category()
        } else if let Some(err) = cause.downcast_ref::<ParseError>() {
            err.category()
        } else if let Some(err) = cause.downcast_ref::<ReleaseError>() {
            err.category()
        } else {
            continue;
        };
        return code_for_category(category);
    }
    exit_code::FAILURE
}
