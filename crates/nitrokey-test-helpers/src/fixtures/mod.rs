//! Builders for signed firmware images and release containers.
//!
//! Every builder produces bytes that the production parsers accept as-is.
//! Signatures are made with fixed fixture keys, so use
//! [`fixture_trust_anchors`] (or the `Updater::with_trust_anchors` hook)
//! wherever an image has to count as official.

mod container;
mod lpc55;
mod nrf52;

pub use container::{ContainerBuilder, image_filename};
pub use lpc55::Sb2ImageBuilder;
pub use nrf52::Nrf52PackageBuilder;

use nitrokey_crypto::{EcdsaPublicKey, KeySet, SignatureKey, TrustLevel};
use nitrokey_firmware_update::TrustAnchors;
use nitrokey_version::Version;
use p256::ecdsa::SigningKey;

/// Name of the official fixture signer.
pub const FIXTURE_SIGNER: &str = "Nitrokey Fixture";
/// Name of the test fixture signer.
pub const FIXTURE_TEST_SIGNER: &str = "Nitrokey Fixture Test";

/// The P-256 key that signs official NRF52 fixture packages.
pub fn nrf52_signing_key() -> SigningKey {
    SigningKey::from_slice(&[0x42; 32]).expect("valid P-256 scalar")
}

/// A P-256 key registered with [`TrustLevel::Test`] in the fixture anchors.
pub fn nrf52_test_signing_key() -> SigningKey {
    SigningKey::from_slice(&[0x17; 32]).expect("valid P-256 scalar")
}

/// A P-256 key no trust anchor knows about.
pub fn nrf52_foreign_signing_key() -> SigningKey {
    SigningKey::from_slice(&[0x63; 32]).expect("valid P-256 scalar")
}

fn signature_key(name: &str, trust_level: TrustLevel, key: &SigningKey) -> SignatureKey {
    SignatureKey::new(
        name,
        trust_level,
        EcdsaPublicKey::from_verifying_key(key.verifying_key().clone()),
    )
}

/// Key set with the official and the test fixture keys, valid for all versions.
pub fn nrf52_key_set() -> KeySet {
    KeySet::new(
        Version::new(0, 0, 0),
        vec![
            signature_key(FIXTURE_SIGNER, TrustLevel::Official, &nrf52_signing_key()),
            signature_key(
                FIXTURE_TEST_SIGNER,
                TrustLevel::Test,
                &nrf52_test_signing_key(),
            ),
        ],
    )
}

/// Trust anchors that accept images from the default fixture builders.
pub fn fixture_trust_anchors() -> TrustAnchors {
    TrustAnchors::new(vec![nrf52_key_set()], Some(Sb2ImageBuilder::default_rkth()))
}
