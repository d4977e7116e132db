//! Per-model release and signing data
//!
//! The tables are built once on first use and never change afterwards.

use std::sync::OnceLock;

use nitrokey_crypto::{KeySet, SignatureKey, TrustLevel};
use nitrokey_device::Model;
use nitrokey_version::Version;
use tracing::error;

/// GitHub organisation hosting the firmware releases.
pub const FIRMWARE_REPOSITORY_OWNER: &str = "Nitrokey";

/// Root key table hash of the Nitrokey LPC55 signing certificates.
pub const NITROKEY_LPC55_RKTH: &str =
    "050aad3e77791a81e59c5b2ba5a158937e9460ee325d8ccba09734b8fdebb171";

const NK3_NITROKEY_KEY: &str = "3059301306072a8648ce3d020106082a8648ce3d03010703420004a0849b19007ccd4661c01c533804b7fd0c4d8c0e7583653f1f36a8331afff298b542bd00a3dc47c16bf428ac4d2864137d63f702d89e5b42674e0549b4232618";
const NK3_TEST_KEY: &str = "3059301306072a8648ce3d020106082a8648ce3d0301070342000493e461ab0582bda1f45b0ce47d66bc4e8623e289c31af2098cde6ebd8631da85acf17e412d406c1e38c2de654a8fd0196506a85b169a756aeac2505a541cdd5d";
const NKPK_NITROKEY_KEY: &str = "3059301306072a8648ce3d020106082a8648ce3d0301070342000445121cdf7a10826faa58c8cbe7bb1a40fe71c85c7756324eac09610d4710e9dadd473c0c9d35838b5cce301e796b2e14a8c29c86f0eb15f36325096506e275e6";
const NKPK_TEST_KEY: &str = "3059301306072a8648ce3d020106082a8648ce3d03010703420004d9a355a2927bd6ecb7ed714294d4692ad31ae9dd21853bf99e2cf7182d1acd6c2ada4a9707ab43f9e6194480d94e477dce4de9be5c35119c714bac459b21cbdc";

/// Keys and hashes an image must chain to in order to count as official.
#[derive(Debug, Clone, Default)]
pub struct TrustAnchors {
    nrf52_key_sets: Vec<KeySet>,
    lpc55_rkth: Option<[u8; 32]>,
}

impl TrustAnchors {
    /// Create trust anchors from NRF52 key sets and an optional LPC55 RKTH.
    pub fn new(nrf52_key_sets: Vec<KeySet>, lpc55_rkth: Option<[u8; 32]>) -> Self {
        Self {
            nrf52_key_sets,
            lpc55_rkth,
        }
    }

    /// NRF52 signing keys, grouped by the first firmware version they apply to.
    pub fn nrf52_key_sets(&self) -> &[KeySet] {
        &self.nrf52_key_sets
    }

    /// The RKTH of the official LPC55 certificate block.
    pub fn lpc55_rkth(&self) -> Option<&[u8; 32]> {
        self.lpc55_rkth.as_ref()
    }
}

/// Static data describing where a model's firmware comes from and who signs it.
#[derive(Debug, Clone)]
pub struct ModelData {
    model: Model,
    firmware_repository: &'static str,
    firmware_pattern: &'static str,
    trust_anchors: TrustAnchors,
}

impl ModelData {
    /// Device model.
    pub fn model(&self) -> Model {
        self.model
    }

    /// Name of the GitHub repository with the firmware releases.
    pub fn firmware_repository(&self) -> &'static str {
        self.firmware_repository
    }

    /// Pattern matching the container asset of a release.
    pub fn firmware_pattern(&self) -> &'static str {
        self.firmware_pattern
    }

    /// Keys that sign official images.
    pub fn trust_anchors(&self) -> &TrustAnchors {
        &self.trust_anchors
    }
}

/// Look up the data for a model.
pub fn model_data(model: Model) -> &'static ModelData {
    static NK3: OnceLock<ModelData> = OnceLock::new();
    static NKPK: OnceLock<ModelData> = OnceLock::new();

    match model {
        Model::Nk3 => NK3.get_or_init(|| ModelData {
            model,
            firmware_repository: "nitrokey-3-firmware",
            firmware_pattern: r"firmware-nk3-v.*\.zip$",
            trust_anchors: TrustAnchors::new(
                vec![key_set(&[
                    ("Nitrokey", TrustLevel::Official, NK3_NITROKEY_KEY),
                    ("Nitrokey Test", TrustLevel::Test, NK3_TEST_KEY),
                ])],
                decode_rkth(NITROKEY_LPC55_RKTH),
            ),
        }),
        Model::Nkpk => NKPK.get_or_init(|| ModelData {
            model,
            firmware_repository: "nitrokey-passkey-firmware",
            firmware_pattern: r"firmware-nkpk-v.*\.zip$",
            trust_anchors: TrustAnchors::new(
                vec![key_set(&[
                    ("Nitrokey", TrustLevel::Official, NKPK_NITROKEY_KEY),
                    ("Nitrokey Test", TrustLevel::Test, NKPK_TEST_KEY),
                ])],
                None,
            ),
        }),
    }
}

fn key_set(keys: &[(&str, TrustLevel, &str)]) -> KeySet {
    let keys = keys
        .iter()
        .filter_map(
            |&(name, trust_level, der)| match SignatureKey::from_der_hex(name, trust_level, der) {
                Ok(key) => Some(key),
                Err(e) => {
                    error!(key = name, error = %e, "Dropping invalid signature key");
                    None
                }
            },
        )
        .collect();
    KeySet::new(Version::new(0, 0, 0), keys)
}

fn decode_rkth(hex_str: &str) -> Option<[u8; 32]> {
    let mut rkth = [0u8; 32];
    match hex::decode_to_slice(hex_str, &mut rkth) {
        Ok(()) => Some(rkth),
        Err(e) => {
            error!(error = %e, "Dropping invalid RKTH");
            None
        }
    }
}
