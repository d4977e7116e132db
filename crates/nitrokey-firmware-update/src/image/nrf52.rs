//! Nordic DFU packages for the NRF52 variant
//!
//! A package is a ZIP archive with a `manifest.json` naming the application
//! binary and its init packet. The init packet is a protobuf message that
//! describes the binary (size, SHA-256 hash, version) and optionally carries
//! an ECDSA P-256 signature over the encoded init command.

use std::io::{Cursor, Read};

use nitrokey_crypto::{KeySet, sha256};
use nitrokey_version::Version;
use prost::Message;
use serde::Deserialize;
use tracing::{debug, warn};
use zip::ZipArchive;

use super::FirmwareMetadata;
use crate::error::ParseError;

/// Name of the package manifest inside the archive.
pub const MANIFEST_FILENAME: &str = "manifest.json";

/// Signer reported for signed packages that no known key verifies.
pub const UNKNOWN_SIGNER: &str = "unknown";

/// Init packet messages of the Nordic `dfu-cc` protocol.
pub mod dfu {
    /// Top-level init packet.
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Packet {
        /// Unsigned command
        #[prost(message, optional, tag = "1")]
        pub command: Option<Command>,
        /// Signed command
        #[prost(message, optional, tag = "2")]
        pub signed_command: Option<SignedCommand>,
    }

    /// A command together with its signature.
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct SignedCommand {
        /// Signed command
        #[prost(message, optional, tag = "1")]
        pub command: Option<Command>,
        /// Signature algorithm
        #[prost(enumeration = "SignatureType", optional, tag = "2")]
        pub signature_type: Option<i32>,
        /// Raw signature, both halves little-endian
        #[prost(bytes = "vec", optional, tag = "3")]
        pub signature: Option<Vec<u8>>,
    }

    /// A DFU command.
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Command {
        /// Operation
        #[prost(enumeration = "OpCode", optional, tag = "1")]
        pub op_code: Option<i32>,
        /// Init command for [`OpCode::Init`]
        #[prost(message, optional, tag = "2")]
        pub init: Option<InitCommand>,
        /// Reset command for [`OpCode::Reset`]
        #[prost(message, optional, tag = "3")]
        pub reset: Option<ResetCommand>,
    }

    /// Description of the firmware being transferred.
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct InitCommand {
        /// Packed firmware version
        #[prost(uint32, optional, tag = "1")]
        pub fw_version: Option<u32>,
        /// Hardware version
        #[prost(uint32, optional, tag = "2")]
        pub hw_version: Option<u32>,
        /// Accepted SoftDevice ids
        #[prost(uint32, repeated, packed = "true", tag = "3")]
        pub sd_req: Vec<u32>,
        /// Firmware type
        #[prost(enumeration = "FwType", optional, tag = "4")]
        pub r#type: Option<i32>,
        /// SoftDevice size
        #[prost(uint32, optional, tag = "5")]
        pub sd_size: Option<u32>,
        /// Bootloader size
        #[prost(uint32, optional, tag = "6")]
        pub bl_size: Option<u32>,
        /// Application size
        #[prost(uint32, optional, tag = "7")]
        pub app_size: Option<u32>,
        /// Firmware hash
        #[prost(message, optional, tag = "8")]
        pub hash: Option<Hash>,
        /// Debug build marker
        #[prost(bool, optional, tag = "9")]
        pub is_debug: Option<bool>,
        /// Boot validation entries
        #[prost(message, repeated, tag = "10")]
        pub boot_validation: Vec<BootValidation>,
    }

    /// Reset request.
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct ResetCommand {
        /// Timeout in milliseconds
        #[prost(uint32, optional, tag = "1")]
        pub timeout: Option<u32>,
    }

    /// Firmware hash; the digest is stored in reverse byte order.
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Hash {
        /// Hash algorithm
        #[prost(enumeration = "HashType", optional, tag = "1")]
        pub hash_type: Option<i32>,
        /// Digest
        #[prost(bytes = "vec", optional, tag = "2")]
        pub hash: Option<Vec<u8>>,
    }

    /// Boot validation entry.
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct BootValidation {
        /// Validation method
        #[prost(enumeration = "ValidationType", optional, tag = "1")]
        pub r#type: Option<i32>,
        /// Validation data
        #[prost(bytes = "vec", optional, tag = "2")]
        pub bytes: Option<Vec<u8>>,
    }

    /// DFU operation.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
    #[repr(i32)]
    pub enum OpCode {
        /// Reset the device
        Reset = 0,
        /// Start a transfer
        Init = 1,
    }

    /// Kind of firmware in the package.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
    #[repr(i32)]
    pub enum FwType {
        /// Application
        Application = 0,
        /// SoftDevice
        Softdevice = 1,
        /// Bootloader
        Bootloader = 2,
        /// SoftDevice and bootloader
        SoftdeviceBootloader = 3,
        /// External application
        ExternalApplication = 4,
    }

    /// Hash algorithm.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
    #[repr(i32)]
    pub enum HashType {
        /// No hash
        NoHash = 0,
        /// CRC
        Crc = 1,
        /// SHA-128
        Sha128 = 2,
        /// SHA-256
        Sha256 = 3,
        /// SHA-512
        Sha512 = 4,
    }

    /// Boot validation method.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
    #[repr(i32)]
    pub enum ValidationType {
        /// No validation
        NoValidation = 0,
        /// CRC
        ValidateGeneratedCrc = 1,
        /// SHA-256
        ValidateGeneratedSha256 = 2,
        /// ECDSA P-256 signature
        ValidateEcdsaP256Sha256 = 3,
    }

    /// Signature algorithm.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
    #[repr(i32)]
    pub enum SignatureType {
        /// ECDSA P-256 with SHA-256
        EcdsaP256Sha256 = 0,
        /// Ed25519
        Ed25519 = 1,
    }
}

#[derive(Debug, Deserialize)]
struct PackageManifest {
    manifest: ApplicationManifest,
}

#[derive(Debug, Deserialize)]
struct ApplicationManifest {
    #[serde(default)]
    application: Option<ManifestFiles>,
}

#[derive(Debug, Deserialize)]
struct ManifestFiles {
    #[serde(default)]
    dat_file: Option<String>,
    #[serde(default)]
    bin_file: Option<String>,
}

/// A parsed and checked NRF52 DFU package.
#[derive(Debug, Clone)]
pub struct Nrf52Package {
    /// Decoded init packet
    pub init_packet: dfu::Packet,
    /// Raw init packet as stored in the package
    pub firmware_dat: Vec<u8>,
    /// Application binary
    pub firmware_bin: Vec<u8>,
}

impl Nrf52Package {
    /// Read a package and check the init command against the binary.
    ///
    /// # Errors
    ///
    /// Returns an error if the archive or manifest is incomplete, the init
    /// packet does not decode, or the size or hash of the binary does not
    /// match the init command.
    pub fn parse(data: &[u8]) -> Result<Self, ParseError> {
        let mut archive =
            ZipArchive::new(Cursor::new(data)).map_err(|e| ParseError::Archive(e.to_string()))?;

        let manifest: PackageManifest = serde_json::from_slice(&read_entry(&mut archive, MANIFEST_FILENAME)?)
            .map_err(|e| ParseError::Manifest(format!("Invalid firmware package manifest: {e}")))?;
        let application = manifest.manifest.application.ok_or_else(|| {
            ParseError::Manifest("Missing application in firmware package manifest".to_string())
        })?;
        let dat_file = application.dat_file.ok_or_else(|| {
            ParseError::Manifest(
                "Missing dat file for application in firmware package manifest".to_string(),
            )
        })?;
        let bin_file = application.bin_file.ok_or_else(|| {
            ParseError::Manifest(
                "Missing bin file for application in firmware package manifest".to_string(),
            )
        })?;

        let firmware_dat = read_entry(&mut archive, &dat_file)?;
        let firmware_bin = read_entry(&mut archive, &bin_file)?;
        let init_packet = dfu::Packet::decode(firmware_dat.as_slice())
            .map_err(|e| ParseError::InitPacket(e.to_string()))?;

        let package = Self {
            init_packet,
            firmware_dat,
            firmware_bin,
        };
        let init = package.init_command()?;
        check_sizes(init)?;

        let app_size = u64::from(init.app_size.unwrap_or_default());
        let actual = u64::try_from(package.firmware_bin.len()).unwrap_or(u64::MAX);
        if app_size != actual {
            return Err(ParseError::InvalidAppSize {
                expected: app_size,
                actual,
            });
        }

        let mut digest = sha256(&package.firmware_bin);
        digest.reverse();
        let expected = init.hash.as_ref().and_then(|h| h.hash.as_deref());
        if expected != Some(digest.as_slice()) {
            return Err(ParseError::InvalidHash);
        }

        Ok(package)
    }

    /// The init command, from the signed command if there is one.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::MissingInitCommand`] if the packet has no init
    /// command.
    pub fn init_command(&self) -> Result<&dfu::InitCommand, ParseError> {
        let command = match &self.init_packet.signed_command {
            Some(signed) => signed.command.as_ref(),
            None => self.init_packet.command.as_ref(),
        };
        command
            .and_then(|c| c.init.as_ref())
            .ok_or(ParseError::MissingInitCommand)
    }

    /// Whether the init packet carries a signature.
    pub fn is_signed(&self) -> bool {
        self.init_packet.signed_command.is_some()
    }

    /// The packed firmware version of the init command as a [`Version`].
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::MissingInitCommand`] if the packet has no init
    /// command.
    pub fn version(&self) -> Result<Version, ParseError> {
        Ok(Version::from_packed(
            self.init_command()?.fw_version.unwrap_or_default(),
        ))
    }

    /// Find the key that signed the init command.
    ///
    /// The signature is stored as two little-endian halves and is checked
    /// against the re-encoded init command. If several keys verify, the last
    /// one wins. A malformed signature matches no key.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::MissingInitCommand`] if the packet has no init
    /// command.
    pub fn signer<'k>(
        &self,
        keys: &'k KeySet,
    ) -> Result<Option<&'k nitrokey_crypto::SignatureKey>, ParseError> {
        let Some(signed) = &self.init_packet.signed_command else {
            return Ok(None);
        };
        let signature = signature_to_big_endian(signed.signature.as_deref().unwrap_or_default());
        let message = self.init_command()?.encode_to_vec();
        Ok(keys.find_signer(&message, &signature))
    }
}

/// Parse an NRF52 package and determine its version and signer.
///
/// # Errors
///
/// Returns an error if the package is invalid.
pub fn parse(data: &[u8], key_sets: &[KeySet]) -> Result<FirmwareMetadata, ParseError> {
    let package = Nrf52Package::parse(data)?;
    let version = package.version()?;
    let mut metadata = FirmwareMetadata::unsigned(version);

    if package.is_signed() {
        let signer = match KeySet::select(key_sets, &metadata.version) {
            Some(keys) => package.signer(keys)?,
            None => {
                warn!(version = %metadata.version, "No signature keys for firmware version");
                None
            }
        };
        match signer {
            Some(key) => {
                metadata.signed_by = Some(key.name().to_string());
                metadata.signed_by_nitrokey = key.is_official();
            }
            None => metadata.signed_by = Some(UNKNOWN_SIGNER.to_string()),
        }
    }

    debug!(
        version = %metadata.version,
        signed_by = ?metadata.signed_by,
        "Parsed NRF52 firmware package"
    );
    Ok(metadata)
}

fn read_entry(archive: &mut ZipArchive<Cursor<&[u8]>>, name: &str) -> Result<Vec<u8>, ParseError> {
    let mut file = archive
        .by_name(name)
        .map_err(|e| ParseError::Archive(format!("{name}: {e}")))?;
    let mut data = Vec::new();
    file.read_to_end(&mut data)
        .map_err(|e| ParseError::Archive(format!("{name}: {e}")))?;
    Ok(data)
}

fn check_sizes(init: &dfu::InitCommand) -> Result<(), ParseError> {
    use dfu::FwType;

    let fw_type = init
        .r#type
        .and_then(|t| FwType::try_from(t).ok())
        .unwrap_or(FwType::Application);
    let sd_size = init.sd_size.unwrap_or_default();
    let bl_size = init.bl_size.unwrap_or_default();

    let message = match fw_type {
        FwType::Application | FwType::ExternalApplication
            if init.app_size.unwrap_or_default() == 0 =>
        {
            "app_size is not set. It must be set when type is APPLICATION/EXTERNAL_APPLICATION"
        }
        FwType::Softdevice if sd_size == 0 => {
            "sd_size is not set. It must be set when type is SOFTDEVICE"
        }
        FwType::Bootloader if bl_size == 0 => {
            "bl_size is not set. It must be set when type is BOOTLOADER"
        }
        FwType::SoftdeviceBootloader if sd_size == 0 || bl_size == 0 => {
            "Either sd_size or bl_size is not set. Both must be set when type is SOFTDEVICE_BOOTLOADER"
        }
        _ => return Ok(()),
    };
    Err(ParseError::InitPacket(message.to_string()))
}

/// Convert a signature from the DFU wire order to `r || s` big-endian.
pub fn signature_to_big_endian(signature: &[u8]) -> Vec<u8> {
    let (r, s) = signature.split_at(signature.len().min(32));
    r.iter().rev().chain(s.iter().rev()).copied().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_halves_are_reversed() {
        let signature: Vec<u8> = (0u8..64).collect();
        let converted = signature_to_big_endian(&signature);

        let expected: Vec<u8> = (0u8..32).rev().chain((32u8..64).rev()).collect();
        assert_eq!(converted, expected);
    }

    #[test]
    fn test_short_signature_is_reversed_per_half() {
        assert_eq!(signature_to_big_endian(&[1, 2, 3]), vec![3, 2, 1]);
        assert!(signature_to_big_endian(&[]).is_empty());
    }

    #[test]
    fn test_not_a_zip() {
        let result = Nrf52Package::parse(b"not a zip archive");
        assert!(matches!(result, Err(ParseError::Archive(_))));
    }

    #[test]
    fn test_application_requires_app_size() {
        let init = dfu::InitCommand {
            r#type: Some(dfu::FwType::Application as i32),
            ..Default::default()
        };
        assert!(matches!(check_sizes(&init), Err(ParseError::InitPacket(_))));

        let init = dfu::InitCommand {
            app_size: Some(16),
            ..init
        };
        assert_eq!(check_sizes(&init), Ok(()));
    }

    #[test]
    fn test_init_command_encoding_is_stable() {
        let init = dfu::InitCommand {
            fw_version: Some(0x0040_0080),
            app_size: Some(4),
            sd_req: vec![0xFFFE],
            ..Default::default()
        };
        let encoded = init.encode_to_vec();
        assert_eq!(dfu::InitCommand::decode(encoded.as_slice()).ok(), Some(init));
        assert_eq!(encoded.first(), Some(&0x08));
    }
}
