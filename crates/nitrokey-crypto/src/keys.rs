//! Signing key allowlists
//!
//! Each device model ships a static allowlist of named public keys. Keys are
//! grouped into key sets that become valid at a start version; the key set
//! applicable to a firmware image is the one with the greatest start version
//! not greater than the image's embedded version.

use nitrokey_version::{Version, select_by_start};
use tracing::debug;

use crate::ecdsa::{EcdsaPublicKey, EcdsaVerifier};
use crate::error::CryptoResult;

/// Trust level for a signing key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrustLevel {
    /// First-party release key
    Official,
    /// Test or development key, recognized but not trusted for updates
    Test,
}

/// A named public key used to sign firmware images.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureKey {
    name: String,
    trust_level: TrustLevel,
    public_key: EcdsaPublicKey,
}

impl SignatureKey {
    /// Create a signing key entry.
    pub fn new(name: impl Into<String>, trust_level: TrustLevel, public_key: EcdsaPublicKey) -> Self {
        Self {
            name: name.into(),
            trust_level,
            public_key,
        }
    }

    /// Create a signing key entry from a hex-encoded SubjectPublicKeyInfo.
    ///
    /// # Errors
    ///
    /// Returns an error if the key does not decode.
    pub fn from_der_hex(
        name: impl Into<String>,
        trust_level: TrustLevel,
        der_hex: &str,
    ) -> CryptoResult<Self> {
        Ok(Self::new(name, trust_level, EcdsaPublicKey::from_der_hex(der_hex)?))
    }

    /// Human-readable key name, reported as the signer of an image.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether this is a first-party release key.
    pub fn is_official(&self) -> bool {
        self.trust_level == TrustLevel::Official
    }

    /// The trust level of this key.
    pub fn trust_level(&self) -> TrustLevel {
        self.trust_level
    }

    /// The public key.
    pub fn public_key(&self) -> &EcdsaPublicKey {
        &self.public_key
    }

    /// Check a raw signature against this key.
    pub fn verify(&self, data: &[u8], signature: &[u8]) -> bool {
        EcdsaVerifier::verify(data, signature, &self.public_key)
    }
}

/// Keys valid from a start version onward.
#[derive(Debug, Clone, PartialEq)]
pub struct KeySet {
    start: Version,
    keys: Vec<SignatureKey>,
}

impl KeySet {
    /// Create a key set.
    pub fn new(start: Version, keys: Vec<SignatureKey>) -> Self {
        Self { start, keys }
    }

    /// First version signed with this key set.
    pub fn start(&self) -> &Version {
        &self.start
    }

    /// The keys of this set.
    pub fn keys(&self) -> &[SignatureKey] {
        &self.keys
    }

    /// Select the key set applicable to `version`.
    pub fn select<'a>(sets: &'a [KeySet], version: &Version) -> Option<&'a KeySet> {
        select_by_start(sets, version, KeySet::start)
    }

    /// Find the key that produced `signature` over `data`.
    ///
    /// Every key of the set is tried; if several keys verify, the last one
    /// wins. Returns `None` if no key verifies, which includes a malformed
    /// signature.
    pub fn find_signer(&self, data: &[u8], signature: &[u8]) -> Option<&SignatureKey> {
        let mut signer = None;
        for key in &self.keys {
            if key.verify(data, signature) {
                debug!(key = key.name(), "signature verified");
                signer = Some(key);
            }
        }
        signer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use p256::ecdsa::{Signature, SigningKey, signature::Signer};
    use rand::rngs::OsRng;

    fn key(name: &str, trust_level: TrustLevel) -> (SigningKey, SignatureKey) {
        let signing = SigningKey::random(&mut OsRng);
        let public = EcdsaPublicKey::from_verifying_key(signing.verifying_key().clone());
        (signing, SignatureKey::new(name, trust_level, public))
    }

    #[test]
    fn test_find_signer_identifies_key() {
        let (official_signing, official) = key("Nitrokey", TrustLevel::Official);
        let (_, test) = key("Nitrokey Test", TrustLevel::Test);
        let set = KeySet::new(Version::new(0, 0, 0), vec![official, test]);

        let signature: Signature = official_signing.sign(b"packet");
        let signer = set.find_signer(b"packet", &signature.to_bytes());
        assert_eq!(signer.map(SignatureKey::name), Some("Nitrokey"));
        assert!(signer.is_some_and(SignatureKey::is_official));
    }

    #[test]
    fn test_find_signer_unknown_key() {
        let (_, official) = key("Nitrokey", TrustLevel::Official);
        let (foreign_signing, _) = key("Foreign", TrustLevel::Test);
        let set = KeySet::new(Version::new(0, 0, 0), vec![official]);

        let signature: Signature = foreign_signing.sign(b"packet");
        assert!(set.find_signer(b"packet", &signature.to_bytes()).is_none());
    }

    #[test]
    fn test_find_signer_malformed_signature_matches_no_key() {
        let (official_signing, official) = key("Nitrokey", TrustLevel::Official);
        let set = KeySet::new(Version::new(0, 0, 0), vec![official]);

        let signature: Signature = official_signing.sign(b"packet");
        let bytes = signature.to_bytes();
        let (truncated, _) = bytes.split_at(63);
        assert!(set.find_signer(b"packet", truncated).is_none());
        assert!(set.find_signer(b"packet", &[1u8; 63]).is_none());
    }

    #[test]
    fn test_select_key_set() {
        let sets = vec![
            KeySet::new(Version::new(0, 0, 0), vec![]),
            KeySet::new(Version::new(2, 0, 0), vec![]),
        ];
        let selected = KeySet::select(&sets, &Version::new(1, 9, 0));
        assert_eq!(selected.map(|s| s.start().to_string()).as_deref(), Some("v0.0.0"));
    }
}
