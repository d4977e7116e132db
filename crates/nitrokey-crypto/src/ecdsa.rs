//! ECDSA P-256 verification
//!
//! NRF52 init packets are signed with ECDSA over P-256 using SHA-256. Public
//! keys are distributed as DER-encoded SubjectPublicKeyInfo structures.

use p256::ecdsa::{Signature, VerifyingKey, signature::Verifier};
use p256::pkcs8::DecodePublicKey;

use tracing::debug;

use crate::error::{CryptoError, CryptoResult};
use crate::hash::{sha256, to_hex};

/// Length of a raw `r || s` P-256 signature.
pub const SIGNATURE_LENGTH: usize = 64;

/// A P-256 public key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EcdsaPublicKey {
    key: VerifyingKey,
}

impl EcdsaPublicKey {
    /// Decode a DER-encoded SubjectPublicKeyInfo.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::KeyFormatError`] if the DER is not a P-256 key.
    pub fn from_der(der: &[u8]) -> CryptoResult<Self> {
        let key = VerifyingKey::from_public_key_der(der)
            .map_err(|e| CryptoError::KeyFormatError(e.to_string()))?;
        Ok(Self { key })
    }

    /// Decode a hex string holding a DER-encoded SubjectPublicKeyInfo.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::KeyFormatError`] if the string is not valid hex
    /// or does not decode to a P-256 key.
    pub fn from_der_hex(der_hex: &str) -> CryptoResult<Self> {
        let der = hex::decode(der_hex)
            .map_err(|e| CryptoError::KeyFormatError(format!("Hex decode error: {e}")))?;
        Self::from_der(&der)
    }

    /// Wrap an existing verifying key.
    pub fn from_verifying_key(key: VerifyingKey) -> Self {
        Self { key }
    }

    /// SHA-256 fingerprint of the SEC1 uncompressed point, hex encoded.
    pub fn fingerprint(&self) -> String {
        to_hex(&sha256(self.key.to_encoded_point(false).as_bytes()))
    }

    /// The underlying verifying key.
    pub fn verifying_key(&self) -> &VerifyingKey {
        &self.key
    }
}

/// ECDSA P-256 / SHA-256 verifier.
pub struct EcdsaVerifier;

impl EcdsaVerifier {
    /// Verify a raw `r || s` signature over `data`.
    ///
    /// A malformed signature does not verify: a length other than 64 bytes or
    /// an out-of-range `r` or `s` yields `false`, like a mismatch.
    pub fn verify(data: &[u8], signature: &[u8], key: &EcdsaPublicKey) -> bool {
        if signature.len() != SIGNATURE_LENGTH {
            debug!(length = signature.len(), "malformed ECDSA signature");
            return false;
        }
        let Ok(signature) = Signature::from_slice(signature) else {
            return false;
        };
        key.key.verify(data, &signature).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use p256::ecdsa::{SigningKey, signature::Signer};
    use p256::pkcs8::EncodePublicKey;
    use rand::rngs::OsRng;

    fn keypair() -> (SigningKey, EcdsaPublicKey) {
        let signing = SigningKey::random(&mut OsRng);
        let public = EcdsaPublicKey::from_verifying_key(signing.verifying_key().clone());
        (signing, public)
    }

    #[test]
    fn test_verify_valid_signature() {
        let (signing, public) = keypair();
        let signature: Signature = signing.sign(b"init packet");
        assert!(EcdsaVerifier::verify(
            b"init packet",
            &signature.to_bytes(),
            &public
        ));
    }

    #[test]
    fn test_verify_wrong_data() {
        let (signing, public) = keypair();
        let signature: Signature = signing.sign(b"init packet");
        assert!(!EcdsaVerifier::verify(
            b"other packet",
            &signature.to_bytes(),
            &public
        ));
    }

    #[test]
    fn test_verify_zero_signature_is_false() {
        let (_, public) = keypair();
        assert!(!EcdsaVerifier::verify(b"data", &[0u8; 64], &public));
    }

    #[test]
    fn test_verify_wrong_length_is_false() {
        let (signing, public) = keypair();
        let signature: Signature = signing.sign(b"data");
        let bytes = signature.to_bytes();
        let (truncated, _) = bytes.split_at(63);

        assert!(!EcdsaVerifier::verify(b"data", &[1u8; 63], &public));
        assert!(!EcdsaVerifier::verify(b"data", truncated, &public));
        let mut padded = bytes.to_vec();
        padded.push(0);
        assert!(!EcdsaVerifier::verify(b"data", &padded, &public));
        assert!(!EcdsaVerifier::verify(b"data", &[], &public));
    }

    #[test]
    fn test_der_round_trip() -> Result<(), Box<dyn std::error::Error>> {
        let (signing, public) = keypair();
        let der = signing.verifying_key().to_public_key_der()?;
        let decoded = EcdsaPublicKey::from_der(der.as_bytes())?;
        assert_eq!(decoded, public);
        assert_eq!(decoded.fingerprint(), public.fingerprint());
        Ok(())
    }

    #[test]
    fn test_rejects_garbage_der() {
        assert!(matches!(
            EcdsaPublicKey::from_der_hex("3059"),
            Err(CryptoError::KeyFormatError(_))
        ));
        assert!(matches!(
            EcdsaPublicKey::from_der_hex("zz"),
            Err(CryptoError::KeyFormatError(_))
        ));
    }
}
