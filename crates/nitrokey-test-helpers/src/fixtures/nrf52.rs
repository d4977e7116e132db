//! NRF52 DFU package fixtures.

use std::io::{Cursor, Write};

use nitrokey_crypto::sha256;
use nitrokey_firmware_update::image::nrf52::{dfu, signature_to_big_endian};
use nitrokey_version::Version;
use p256::ecdsa::{Signature, SigningKey, signature::Signer};
use prost::Message;
use zip::{ZipWriter, write::SimpleFileOptions};

use super::nrf52_signing_key;

const DAT_FILE: &str = "firmware.dat";
const BIN_FILE: &str = "firmware.bin";

/// Builds a Nordic DFU package around an application binary.
///
/// Defaults to a package signed with [`nrf52_signing_key`].
#[derive(Debug, Clone)]
pub struct Nrf52PackageBuilder {
    version: Version,
    binary: Vec<u8>,
    signer: Option<SigningKey>,
    raw_signature: Option<Vec<u8>>,
    wrong_hash: bool,
    app_size: Option<u32>,
    manifest: Option<String>,
}

impl Nrf52PackageBuilder {
    /// A signed package for `version`.
    pub fn new(version: Version) -> Self {
        Self {
            version,
            binary: (0u8..=255).cycle().take(1024).collect(),
            signer: Some(nrf52_signing_key()),
            raw_signature: None,
            wrong_hash: false,
            app_size: None,
            manifest: None,
        }
    }

    /// Replace the application binary.
    pub fn binary(mut self, binary: impl Into<Vec<u8>>) -> Self {
        self.binary = binary.into();
        self
    }

    /// Store the init command without signature.
    pub fn unsigned(mut self) -> Self {
        self.signer = None;
        self
    }

    /// Sign the init command with another key.
    pub fn signed_with(mut self, key: SigningKey) -> Self {
        self.signer = Some(key);
        self
    }

    /// Store `signature` as the signature bytes instead of signing.
    pub fn raw_signature(mut self, signature: impl Into<Vec<u8>>) -> Self {
        self.raw_signature = Some(signature.into());
        self
    }

    /// Store a hash that does not match the binary.
    pub fn wrong_hash(mut self) -> Self {
        self.wrong_hash = true;
        self
    }

    /// Override the application size in the init command.
    pub fn app_size(mut self, app_size: u32) -> Self {
        self.app_size = Some(app_size);
        self
    }

    /// Replace `manifest.json` with raw text.
    pub fn manifest(mut self, manifest: impl Into<String>) -> Self {
        self.manifest = Some(manifest.into());
        self
    }

    /// The packed version stored in the init command.
    pub fn packed_version(&self) -> u32 {
        (self.version.major() << 22) | (self.version.minor() << 6) | self.version.patch()
    }

    /// The init command describing the binary.
    pub fn init_command(&self) -> dfu::InitCommand {
        let mut digest = sha256(&self.binary);
        digest.reverse();
        if self.wrong_hash {
            digest[0] ^= 0xFF;
        }
        dfu::InitCommand {
            fw_version: Some(self.packed_version()),
            r#type: Some(dfu::FwType::Application as i32),
            app_size: Some(
                self.app_size
                    .unwrap_or_else(|| u32::try_from(self.binary.len()).expect("binary fits")),
            ),
            hash: Some(dfu::Hash {
                hash_type: Some(dfu::HashType::Sha256 as i32),
                hash: Some(digest.to_vec()),
            }),
            ..Default::default()
        }
    }

    /// The encoded init packet.
    pub fn init_packet(&self) -> Vec<u8> {
        let init = self.init_command();
        let message = init.encode_to_vec();
        let command = dfu::Command {
            op_code: Some(dfu::OpCode::Init as i32),
            init: Some(init),
            reset: None,
        };
        let signature = match (&self.raw_signature, &self.signer) {
            (Some(raw), _) => Some(raw.clone()),
            (None, Some(key)) => {
                let signature: Signature = key.sign(&message);
                Some(signature_to_big_endian(&signature.to_bytes()))
            }
            (None, None) => None,
        };
        let packet = match signature {
            Some(signature) => dfu::Packet {
                command: None,
                signed_command: Some(dfu::SignedCommand {
                    command: Some(command),
                    signature_type: Some(dfu::SignatureType::EcdsaP256Sha256 as i32),
                    signature: Some(signature),
                }),
            },
            None => dfu::Packet {
                command: Some(command),
                signed_command: None,
            },
        };
        packet.encode_to_vec()
    }

    /// Build the package archive.
    pub fn build(&self) -> Vec<u8> {
        let manifest = self.manifest.clone().unwrap_or_else(|| {
            serde_json::json!({
                "manifest": {
                    "application": {
                        "dat_file": DAT_FILE,
                        "bin_file": BIN_FILE,
                    }
                }
            })
            .to_string()
        });

        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default();
        for (name, data) in [
            ("manifest.json", manifest.into_bytes()),
            (DAT_FILE, self.init_packet()),
            (BIN_FILE, self.binary.clone()),
        ] {
            zip.start_file(name, options).expect("start zip entry");
            zip.write_all(&data).expect("write zip entry");
        }
        zip.finish().expect("finish zip").into_inner()
    }
}
