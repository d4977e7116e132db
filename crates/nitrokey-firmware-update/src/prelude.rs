//! Convenience re-exports for common firmware update types

pub use crate::config::UpdateConfig;
pub use crate::container::FirmwareContainer;
pub use crate::error::{
    ContainerError, ImageError, ParseError, ReleaseError, UpdateError, UpdateResult,
};
pub use crate::image::{FirmwareMetadata, parse_firmware_image, validate_firmware_image};
pub use crate::migration::{
    Migration, extra_information, finalization_wait_retries, migrations_for,
};
pub use crate::release::{Asset, Release, ReleaseRepository};
pub use crate::retry::Retries;
pub use crate::ui::{DeviceHandler, ProgressBar, UpdateUi};
pub use crate::updater::{UpdateOutcome, UpdateSource, UpdateState, UpdateStep, Updater};
pub use crate::warning::Warning;
pub use nitrokey_device::{DeviceHandle, Model, Variant};
pub use nitrokey_version::Version;
