//! Firmware update pipeline for Nitrokey Trussed devices
//!
//! This crate parses and verifies firmware containers and drives a device
//! through the update:
//! - Release containers (ZIP) with per-entry SHA-256 checksums
//! - NRF52 DFU packages signed with ECDSA P-256
//! - LPC55 SB2.1 images signed with an RSA certificate chain
//! - Version-gated filesystem migrations
//! - Release download from GitHub (feature `github`)
//!
//! # Architecture
//!
//! - [`container`]: Firmware container parsing and checksum verification
//! - [`image`]: Per-variant image parsers and release validation
//! - [`migration`]: Migrations triggered by an update
//! - [`release`]: Release repositories and asset lookup
//! - [`updater`]: The update state machine
//! - [`ui`]: Operator and device-discovery boundaries of the updater
//! - [`config`]: Updater configuration
//! - [`warning`]: Ignorable update warnings
//! - [`retry`]: Bounded retry loops
//! - [`model_data`]: Per-model repositories and trust anchors
//! - [`error`]: Error types
//!
//! # Safety
//!
//! Nothing is written to a device before the image for its bootloader
//! variant has been parsed, matched against the release version and checked
//! for an official signature. Downgrades are rejected before any download.
//!
//! # Example
//!
//! ```
//! use nitrokey_firmware_update::prelude::*;
//!
//! let migrations = migrations_for(
//!     Model::Nk3,
//!     Variant::Nrf52,
//!     Some(&Version::new(1, 2, 2)),
//!     &Version::new(1, 3, 0),
//! );
//! assert!(migrations.contains(&Migration::NrfIfsMigration));
//! assert_eq!(finalization_wait_retries(&migrations), 500);
//! ```

#![deny(unsafe_op_in_unsafe_fn, clippy::unwrap_used)]
#![warn(missing_docs, rust_2018_idioms)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod config;
pub mod container;
pub mod error;
pub mod image;
pub mod migration;
pub mod model_data;
pub mod prelude;
mod reader;
pub mod release;
pub mod retry;
pub mod ui;
pub mod updater;
pub mod warning;

pub use config::{PYNITROKEY_COMPAT_VERSION, UpdateConfig};
pub use container::FirmwareContainer;
pub use error::{
    ContainerError, ImageError, ParseError, ReleaseError, UnknownWarning, UpdateError,
    UpdateResult,
};
pub use image::{
    FirmwareMetadata, parse_filename, parse_firmware_image, parse_firmware_image_with,
    validate_firmware_image, validate_firmware_image_with,
};
pub use migration::{Migration, extra_information, finalization_wait_retries, migrations_for};
pub use model_data::{ModelData, TrustAnchors, model_data};
#[cfg(feature = "github")]
pub use release::github::{GithubRepository, firmware_repository};
pub use release::{Asset, Release, ReleaseRepository, download_to_dir};
pub use retry::{Retries, Try};
pub use ui::{DeviceHandler, NoProgress, ProgressBar, UpdateUi};
pub use updater::{
    UpdateOutcome, UpdateSource, UpdateState, UpdateStep, Updater, check_client_requirements,
    compare_versions,
};
pub use warning::Warning;
