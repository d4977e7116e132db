//! X.509 certificate chains with RSA signatures
//!
//! SB2.1 images embed a certificate chain. The root certificate must be an
//! X.509 v3 self-signed certificate, each further certificate must be signed
//! by its predecessor, and the image itself is signed with the key of the last
//! certificate using RSA PKCS#1 v1.5 with SHA-256.

use der::{Decode, Encode};
use rsa::RsaPublicKey;
use rsa::pkcs1v15::{Signature, VerifyingKey};
use rsa::pkcs8::DecodePublicKey;
use rsa::signature::Verifier;
use rsa::traits::PublicKeyParts;
use sha2::Sha256;
use tracing::debug;
use x509_cert::Certificate;
use x509_cert::certificate::Version as CertificateVersion;

use crate::error::{CryptoError, CryptoResult};
use crate::hash::sha256;

/// OID of sha256WithRSAEncryption.
const SHA256_WITH_RSA: &str = "1.2.840.113549.1.1.11";

/// A parsed certificate chain, root first.
#[derive(Debug, Clone)]
pub struct CertificateChain {
    certificates: Vec<Certificate>,
}

impl CertificateChain {
    /// Parse DER-encoded certificates, root first.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::EmptyChain`] for an empty list and
    /// [`CryptoError::Der`] if a certificate does not decode.
    pub fn from_der<'a>(certificates: impl IntoIterator<Item = &'a [u8]>) -> CryptoResult<Self> {
        let certificates = certificates
            .into_iter()
            .map(Certificate::from_der)
            .collect::<Result<Vec<_>, _>>()?;
        if certificates.is_empty() {
            return Err(CryptoError::EmptyChain);
        }
        Ok(Self { certificates })
    }

    /// Number of certificates in the chain.
    pub fn len(&self) -> usize {
        self.certificates.len()
    }

    /// Always false; an empty chain cannot be constructed.
    pub fn is_empty(&self) -> bool {
        self.certificates.is_empty()
    }

    /// The certificates, root first.
    pub fn certificates(&self) -> &[Certificate] {
        &self.certificates
    }

    fn root(&self) -> CryptoResult<&Certificate> {
        self.certificates.first().ok_or(CryptoError::EmptyChain)
    }

    fn leaf(&self) -> CryptoResult<&Certificate> {
        self.certificates.last().ok_or(CryptoError::EmptyChain)
    }

    /// Length in bytes of the root certificate's signature.
    ///
    /// Images signed by this chain carry a signature of the same length.
    ///
    /// # Errors
    ///
    /// Returns an error if the chain is empty.
    pub fn root_signature_len(&self) -> CryptoResult<usize> {
        Ok(self.root()?.signature.raw_bytes().len())
    }

    /// SHA-256 of the root public key.
    ///
    /// The key is hashed as its big-endian modulus followed by its big-endian
    /// exponent, each without leading zero bytes. This is the form stored in
    /// a root key hash table.
    ///
    /// # Errors
    ///
    /// Returns an error if the root key is not an RSA key.
    pub fn root_key_hash(&self) -> CryptoResult<[u8; 32]> {
        let key = public_key(self.root()?)?;
        let mut exported = key.n().to_bytes_be();
        exported.extend_from_slice(&key.e().to_bytes_be());
        Ok(sha256(&exported))
    }

    /// Verify the structure and signatures of the chain.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::InvalidCertificate`] if a certificate is not a
    /// v3 certificate or the root is not self-signed, and [`CryptoError::BrokenChain`] if a
    /// certificate is not signed by its predecessor.
    pub fn verify(&self) -> CryptoResult<()> {
        for (index, certificate) in self.certificates.iter().enumerate() {
            if certificate.tbs_certificate.version != CertificateVersion::V3 {
                return Err(CryptoError::InvalidCertificate(format!(
                    "certificate {index} is not an X.509 v3 certificate"
                )));
            }
        }

        let root = self.root()?;
        if !verify_certificate(root, &public_key(root)?)? {
            return Err(CryptoError::InvalidCertificate(
                "root certificate is not self-signed".to_string(),
            ));
        }

        for (index, pair) in self.certificates.windows(2).enumerate() {
            let [parent, child] = pair else {
                continue;
            };
            if !verify_certificate(child, &public_key(parent)?)? {
                return Err(CryptoError::BrokenChain {
                    index: index.saturating_add(1),
                });
            }
        }
        debug!(certificates = self.certificates.len(), "certificate chain verified");
        Ok(())
    }

    /// Verify an RSA PKCS#1 v1.5 / SHA-256 signature with the leaf key.
    ///
    /// Returns `Ok(false)` if the signature does not match.
    ///
    /// # Errors
    ///
    /// Returns an error if the leaf key cannot be decoded.
    pub fn verify_data(&self, data: &[u8], signature: &[u8]) -> CryptoResult<bool> {
        let key = public_key(self.leaf()?)?;
        Ok(verify_rsa(&key, data, signature))
    }
}

fn public_key(certificate: &Certificate) -> CryptoResult<RsaPublicKey> {
    let spki = certificate.tbs_certificate.subject_public_key_info.to_der()?;
    RsaPublicKey::from_public_key_der(&spki)
        .map_err(|e| CryptoError::UnsupportedAlgorithm(format!("certificate key: {e}")))
}

fn verify_certificate(certificate: &Certificate, issuer_key: &RsaPublicKey) -> CryptoResult<bool> {
    let algorithm = certificate.signature_algorithm.oid.to_string();
    if algorithm != SHA256_WITH_RSA {
        return Err(CryptoError::UnsupportedAlgorithm(algorithm));
    }
    let tbs = certificate.tbs_certificate.to_der()?;
    Ok(verify_rsa(
        issuer_key,
        &tbs,
        certificate.signature.raw_bytes(),
    ))
}

fn verify_rsa(key: &RsaPublicKey, data: &[u8], signature: &[u8]) -> bool {
    let Ok(signature) = Signature::try_from(signature) else {
        return false;
    };
    VerifyingKey::<Sha256>::new(key.clone())
        .verify(data, &signature)
        .is_ok()
}
