//! Firmware image parsing and validation
//!
//! Each hardware variant uses its own image format:
//!
//! - [`nrf52`]: Nordic DFU packages signed with ECDSA P-256
//! - [`lpc55`]: NXP SB2.1 images signed with an RSA certificate chain
//!
//! Both parsers report a [`FirmwareMetadata`]. [`validate_firmware_image`]
//! then decides whether the image may be flashed as part of a release.

pub mod lpc55;
pub mod nrf52;

use std::sync::OnceLock;

use nitrokey_device::{Model, Variant};
use nitrokey_version::Version;
use regex::Regex;
use serde::Serialize;
use tracing::{info, warn};

use crate::error::{ImageError, ParseError};
use crate::model_data::{TrustAnchors, model_data};

/// What an image says about itself.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FirmwareMetadata {
    /// Version embedded in the image
    pub version: Version,
    /// Name of the signer, `None` for unsigned images
    pub signed_by: Option<String>,
    /// Whether the signer is an official Nitrokey key
    pub signed_by_nitrokey: bool,
}

impl FirmwareMetadata {
    /// Metadata for an image without signature.
    pub fn unsigned(version: Version) -> Self {
        Self {
            version,
            signed_by: None,
            signed_by_nitrokey: false,
        }
    }
}

/// Parse an image with the trust anchors of `model`.
///
/// # Errors
///
/// Returns an error if the image is malformed or a signature check fails
/// structurally. An unknown signer is not an error.
pub fn parse_firmware_image(
    variant: Variant,
    data: &[u8],
    model: Model,
) -> Result<FirmwareMetadata, ParseError> {
    parse_firmware_image_with(variant, data, model_data(model).trust_anchors())
}

/// Parse an image with explicit trust anchors.
///
/// # Errors
///
/// See [`parse_firmware_image`].
pub fn parse_firmware_image_with(
    variant: Variant,
    data: &[u8],
    anchors: &TrustAnchors,
) -> Result<FirmwareMetadata, ParseError> {
    match variant {
        Variant::Lpc55 => lpc55::parse(data, anchors.lpc55_rkth()),
        Variant::Nrf52 => nrf52::parse(data, anchors.nrf52_key_sets()),
    }
}

/// Check that an image belongs to the release `version` and is officially signed.
///
/// # Errors
///
/// Returns [`ImageError::ParseFailure`] if the image cannot be parsed,
/// [`ImageError::VersionMismatch`] if it embeds another version,
/// [`ImageError::Unsigned`] if it carries no signature and
/// [`ImageError::UntrustedSigner`] if the signer is not official.
pub fn validate_firmware_image(
    variant: Variant,
    data: &[u8],
    version: &Version,
    model: Model,
) -> Result<FirmwareMetadata, ImageError> {
    validate_firmware_image_with(variant, data, version, model_data(model).trust_anchors())
}

/// Validate an image with explicit trust anchors.
///
/// # Errors
///
/// See [`validate_firmware_image`].
pub fn validate_firmware_image_with(
    variant: Variant,
    data: &[u8],
    version: &Version,
    anchors: &TrustAnchors,
) -> Result<FirmwareMetadata, ImageError> {
    let metadata = parse_firmware_image_with(variant, data, anchors)?;

    if version.core() != metadata.version {
        return Err(ImageError::VersionMismatch {
            expected: version.clone(),
            actual: metadata.version,
        });
    }
    let Some(signer) = &metadata.signed_by else {
        return Err(ImageError::Unsigned);
    };
    if !metadata.signed_by_nitrokey {
        warn!(%variant, signer = %signer, "Firmware image has an untrusted signer");
        return Err(ImageError::UntrustedSigner(signer.clone()));
    }

    info!(%variant, version = %metadata.version, "Firmware image validated");
    Ok(metadata)
}

/// Guess variant and version from a release file name.
///
/// Accepts names like `firmware-nk3xn-lpc55-v1.8.2.sb2` or
/// `firmware-nkpk-nrf52-v1.0.0.zip`.
pub fn parse_filename(name: &str) -> Option<(Variant, Version)> {
    for variant in Variant::ALL {
        let Some(captures) = filename_pattern(variant)?.captures(name) else {
            continue;
        };
        let version = captures.name("version")?;
        return Version::from_v_str(version.as_str())
            .ok()
            .map(|version| (variant, version));
    }
    None
}

fn filename_pattern(variant: Variant) -> Option<&'static Regex> {
    static LPC55: OnceLock<Option<Regex>> = OnceLock::new();
    static NRF52: OnceLock<Option<Regex>> = OnceLock::new();

    let (cell, pattern) = match variant {
        Variant::Lpc55 => (&LPC55, r"(firmware|alpha)-nk3..-lpc55-(?P<version>.*)\.sb2$"),
        Variant::Nrf52 => (
            &NRF52,
            r"(firmware|alpha)-(nk3..|nkpk)-nrf52-(?P<version>.*)\.zip$",
        ),
    };
    cell.get_or_init(|| Regex::new(pattern).ok()).as_ref()
}
