//! Firmware containers
//!
//! A container is a ZIP archive published with every firmware release. It
//! holds one image per hardware variant, a `manifest.json` describing the
//! release and a `sha256sums` file covering every other entry:
//!
//! ```text
//! manifest.json
//! sha256sums
//! firmware-nk3xn-lpc55-v1.8.2.sb2
//! firmware-nk3am-nrf52-v1.8.2.zip
//! ```

use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek};
use std::path::Path;

use nitrokey_crypto::{sha256, to_hex};
use nitrokey_device::{Model, Variant};
use nitrokey_version::Version;
use serde::Deserialize;
use tracing::{debug, info};
use zip::ZipArchive;

use crate::error::ContainerError;

/// Name of the release manifest.
pub const MANIFEST_FILENAME: &str = "manifest.json";
/// Name of the checksum list.
pub const CHECKSUMS_FILENAME: &str = "sha256sums";

#[derive(Debug, Deserialize)]
struct ContainerManifest {
    device: String,
    version: String,
    #[serde(default)]
    pynitrokey: Option<String>,
    #[serde(default)]
    sdk: Option<String>,
    images: BTreeMap<String, String>,
}

/// A parsed and checksum-verified firmware container.
#[derive(Debug, Clone, PartialEq)]
pub struct FirmwareContainer {
    /// Release version
    pub version: Version,
    /// Minimum legacy client version required for the update
    pub pynitrokey: Option<Version>,
    /// Minimum SDK version required for the update
    pub sdk: Option<Version>,
    /// Firmware image per hardware variant
    pub images: BTreeMap<Variant, Vec<u8>>,
}

impl FirmwareContainer {
    /// Parse a container and verify all checksums.
    ///
    /// Nothing is returned unless every entry verifies.
    ///
    /// # Errors
    ///
    /// Returns [`ContainerError::Malformed`] for unreadable archives or
    /// manifests, [`ContainerError::ChecksumMismatch`] if an entry is not
    /// covered by `sha256sums` or differs from it, and
    /// [`ContainerError::ModelMismatch`] if the container is for another model.
    pub fn parse<R: Read + Seek>(reader: R, model: Model) -> Result<Self, ContainerError> {
        let mut archive =
            ZipArchive::new(reader).map_err(|e| ContainerError::Malformed(e.to_string()))?;

        let checksums = parse_checksums(&read_entry(&mut archive, CHECKSUMS_FILENAME)?)?;

        let manifest_data = read_entry(&mut archive, MANIFEST_FILENAME)?;
        verify_checksum(&checksums, MANIFEST_FILENAME, &manifest_data)?;
        let manifest: ContainerManifest = serde_json::from_slice(&manifest_data)
            .map_err(|e| ContainerError::Malformed(format!("{MANIFEST_FILENAME}: {e}")))?;

        if manifest.device.parse::<Model>().ok() != Some(model) {
            return Err(ContainerError::ModelMismatch {
                expected: model,
                actual: manifest.device,
            });
        }

        let version = Version::from_v_str(&manifest.version)?;
        let pynitrokey = manifest
            .pynitrokey
            .as_deref()
            .map(Version::from_v_str)
            .transpose()?;
        let sdk = manifest.sdk.as_deref().map(Version::from_v_str).transpose()?;

        let mut images = BTreeMap::new();
        for (variant, path) in &manifest.images {
            let data = read_entry(&mut archive, path)?;
            verify_checksum(&checksums, path, &data)?;
            let variant = variant
                .parse::<Variant>()
                .map_err(|e| ContainerError::Malformed(e.to_string()))?;
            debug!(%variant, path = %path, size = data.len(), "Read firmware image");
            images.insert(variant, data);
        }

        info!(%model, %version, images = images.len(), "Parsed firmware container");
        Ok(Self {
            version,
            pynitrokey,
            sdk,
            images,
        })
    }

    /// Parse a container held in memory.
    ///
    /// # Errors
    ///
    /// See [`FirmwareContainer::parse`].
    pub fn from_bytes(data: &[u8], model: Model) -> Result<Self, ContainerError> {
        Self::parse(Cursor::new(data), model)
    }

    /// Parse a container file.
    ///
    /// # Errors
    ///
    /// Returns [`ContainerError::Io`] if the file cannot be opened, otherwise
    /// see [`FirmwareContainer::parse`].
    pub fn from_path(path: impl AsRef<Path>, model: Model) -> Result<Self, ContainerError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| ContainerError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::parse(BufReader::new(file), model)
    }

    /// The image for a variant.
    pub fn image(&self, variant: Variant) -> Option<&[u8]> {
        self.images.get(&variant).map(Vec::as_slice)
    }

    /// Variants with an image, in ascending order.
    pub fn variants(&self) -> impl Iterator<Item = Variant> + '_ {
        self.images.keys().copied()
    }
}

fn read_entry<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    name: &str,
) -> Result<Vec<u8>, ContainerError> {
    let mut file = archive
        .by_name(name)
        .map_err(|e| ContainerError::Malformed(format!("{name}: {e}")))?;
    let mut data = Vec::new();
    file.read_to_end(&mut data)
        .map_err(|e| ContainerError::Malformed(format!("{name}: {e}")))?;
    Ok(data)
}

fn parse_checksums(data: &[u8]) -> Result<HashMap<String, String>, ContainerError> {
    let text = std::str::from_utf8(data)
        .map_err(|e| ContainerError::Malformed(format!("{CHECKSUMS_FILENAME}: {e}")))?;
    text.lines()
        .map(|line| {
            line.split_once("  ")
                .map(|(checksum, path)| (path.to_string(), checksum.to_string()))
                .ok_or_else(|| {
                    ContainerError::Malformed(format!(
                        "{CHECKSUMS_FILENAME}: malformed line: {line}"
                    ))
                })
        })
        .collect()
}

fn verify_checksum(
    checksums: &HashMap<String, String>,
    path: &str,
    data: &[u8],
) -> Result<(), ContainerError> {
    let Some(expected) = checksums.get(path) else {
        return Err(ContainerError::ChecksumMismatch {
            path: path.to_string(),
            reason: format!("missing from {CHECKSUMS_FILENAME}"),
        });
    };
    let actual = to_hex(&sha256(data));
    if !actual.eq_ignore_ascii_case(expected) {
        return Err(ContainerError::ChecksumMismatch {
            path: path.to_string(),
            reason: format!("expected {expected}, got {actual}"),
        });
    }
    Ok(())
}
