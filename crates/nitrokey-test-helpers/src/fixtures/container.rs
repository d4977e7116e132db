//! Firmware container fixtures.

use std::collections::BTreeMap;
use std::io::{Cursor, Write};

use nitrokey_crypto::{sha256, to_hex};
use nitrokey_device::{Model, Variant};
use nitrokey_firmware_update::container::{CHECKSUMS_FILENAME, MANIFEST_FILENAME};
use nitrokey_version::Version;
use zip::{CompressionMethod, ZipWriter, write::SimpleFileOptions};

use super::{Nrf52PackageBuilder, Sb2ImageBuilder};

/// The file name a release uses for the image of `variant`.
pub fn image_filename(model: Model, variant: Variant, version: &Version) -> String {
    match (model, variant) {
        (Model::Nk3, Variant::Lpc55) => format!("firmware-nk3xn-lpc55-{version}.sb2"),
        (Model::Nk3, Variant::Nrf52) => format!("firmware-nk3am-nrf52-{version}.zip"),
        (Model::Nkpk, Variant::Nrf52) => format!("firmware-nkpk-nrf52-{version}.zip"),
        (Model::Nkpk, Variant::Lpc55) => format!("firmware-nkpk-lpc55-{version}.sb2"),
    }
}

/// Builds a release container with a manifest and checksums.
#[derive(Debug, Clone)]
pub struct ContainerBuilder {
    model: Model,
    version: Version,
    device: Option<String>,
    images: BTreeMap<Variant, Vec<u8>>,
    pynitrokey: Option<Version>,
    sdk: Option<Version>,
    corrupt_checksum: Option<String>,
    unlisted: Option<String>,
}

impl ContainerBuilder {
    /// An empty container for `model` and `version`.
    pub fn new(model: Model, version: Version) -> Self {
        Self {
            model,
            version,
            device: None,
            images: BTreeMap::new(),
            pynitrokey: None,
            sdk: None,
            corrupt_checksum: None,
            unlisted: None,
        }
    }

    /// A container with a valid signed image for every variant of `model`.
    pub fn signed(model: Model, version: Version) -> Self {
        let mut builder = Self::new(model, version.clone());
        for &variant in model.variants() {
            let image = match variant {
                Variant::Lpc55 => Sb2ImageBuilder::new(version.core()).build(),
                Variant::Nrf52 => Nrf52PackageBuilder::new(version.core()).build(),
            };
            builder = builder.image(variant, image);
        }
        builder
    }

    /// Add or replace the image for a variant.
    pub fn image(mut self, variant: Variant, data: impl Into<Vec<u8>>) -> Self {
        self.images.insert(variant, data.into());
        self
    }

    /// Override the `device` field of the manifest.
    pub fn device(mut self, device: impl Into<String>) -> Self {
        self.device = Some(device.into());
        self
    }

    /// Require a minimum legacy client version.
    pub fn pynitrokey(mut self, version: Version) -> Self {
        self.pynitrokey = Some(version);
        self
    }

    /// Require a minimum SDK version.
    pub fn sdk(mut self, version: Version) -> Self {
        self.sdk = Some(version);
        self
    }

    /// Write a wrong checksum for `path`.
    pub fn corrupt_checksum(mut self, path: impl Into<String>) -> Self {
        self.corrupt_checksum = Some(path.into());
        self
    }

    /// Leave `path` out of the checksum list.
    pub fn unlisted(mut self, path: impl Into<String>) -> Self {
        self.unlisted = Some(path.into());
        self
    }

    /// The file name of the image for `variant` in this container.
    pub fn filename(&self, variant: Variant) -> String {
        image_filename(self.model, variant, &self.version)
    }

    /// The file name of the container asset in a release.
    pub fn asset_name(&self) -> String {
        format!("firmware-{}-{}.zip", self.model.short_id(), self.version)
    }

    fn manifest(&self) -> String {
        let images: BTreeMap<&str, String> = self
            .images
            .keys()
            .map(|&variant| (variant.as_str(), self.filename(variant)))
            .collect();
        let mut manifest = serde_json::json!({
            "device": self.device.clone().unwrap_or_else(|| self.model.name().to_string()),
            "version": self.version.to_string(),
            "images": images,
        });
        if let Some(pynitrokey) = &self.pynitrokey {
            manifest["pynitrokey"] = pynitrokey.to_string().into();
        }
        if let Some(sdk) = &self.sdk {
            manifest["sdk"] = sdk.to_string().into();
        }
        manifest.to_string()
    }

    /// Build the container archive.
    pub fn build(&self) -> Vec<u8> {
        let mut entries = vec![(MANIFEST_FILENAME.to_string(), self.manifest().into_bytes())];
        for (&variant, data) in &self.images {
            entries.push((self.filename(variant), data.clone()));
        }

        let checksums: String = entries
            .iter()
            .filter(|(path, _)| self.unlisted.as_deref() != Some(path.as_str()))
            .map(|(path, data)| {
                let mut digest = sha256(data);
                if self.corrupt_checksum.as_deref() == Some(path.as_str()) {
                    digest[0] ^= 0xFF;
                }
                format!("{}  {path}\n", to_hex(&digest))
            })
            .collect();
        entries.push((CHECKSUMS_FILENAME.to_string(), checksums.into_bytes()));

        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        for (path, data) in entries {
            zip.start_file(path, options).expect("start zip entry");
            zip.write_all(&data).expect("write zip entry");
        }
        zip.finish().expect("finish zip").into_inner()
    }
}
