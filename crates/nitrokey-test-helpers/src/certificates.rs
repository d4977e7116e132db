//! Throwaway RSA certificate chains for SB2.1 tests.
//!
//! Keys are derived from a fixed seed and generated once per test binary.
//! Chains are root first, each certificate signed by its predecessor unless
//! its [`CertificateSpec`] says otherwise.

use std::str::FromStr;
use std::sync::OnceLock;
use std::time::Duration;

use der::asn1::{BitString, UtcTime};
use der::{Decode, Encode};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rsa::RsaPrivateKey;
use rsa::pkcs1v15::SigningKey;
use rsa::pkcs8::EncodePublicKey;
use rsa::signature::{SignatureEncoding, Signer};
use rsa::traits::PublicKeyParts;
use sha2::{Digest, Sha256};
use x509_cert::certificate::{Certificate, TbsCertificate, Version};
use x509_cert::name::Name;
use x509_cert::serial_number::SerialNumber;
use x509_cert::spki::{AlgorithmIdentifierOwned, ObjectIdentifier, SubjectPublicKeyInfoOwned};
use x509_cert::time::{Time, Validity};

const KEY_BITS: usize = 1024;
const CHAIN_KEYS: usize = 4;
const FOREIGN_KEY: usize = CHAIN_KEYS;
const SHA256_WITH_RSA: &str = "1.2.840.113549.1.1.11";

fn keys() -> &'static [RsaPrivateKey] {
    static KEYS: OnceLock<Vec<RsaPrivateKey>> = OnceLock::new();
    KEYS.get_or_init(|| {
        let mut rng = StdRng::seed_from_u64(0x5b21);
        (0..=CHAIN_KEYS)
            .map(|_| RsaPrivateKey::new(&mut rng, KEY_BITS).expect("RSA key generation"))
            .collect()
    })
}

/// How a single certificate in a fixture chain is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CertificateSpec {
    v1: bool,
    foreign: bool,
}

impl CertificateSpec {
    /// A v3 self-signed root certificate.
    pub fn root() -> Self {
        Self {
            v1: false,
            foreign: false,
        }
    }

    /// A v3 certificate signed by its predecessor.
    pub fn intermediate() -> Self {
        Self::root()
    }

    /// Encode as an X.509 v1 certificate.
    pub fn v1(mut self) -> Self {
        self.v1 = true;
        self
    }

    /// Sign with a key outside the chain.
    pub fn signed_by_foreign_key(mut self) -> Self {
        self.foreign = true;
        self
    }
}

/// A DER-encoded certificate chain plus the leaf's private key.
#[derive(Debug, Clone)]
pub struct CertificateChainFixture {
    certificates: Vec<Vec<u8>>,
    depth: usize,
}

impl CertificateChainFixture {
    /// A valid chain with `depth` certificates.
    pub fn new(depth: usize) -> Self {
        let specs: Vec<CertificateSpec> = (0..depth)
            .map(|i| {
                if i == 0 {
                    CertificateSpec::root()
                } else {
                    CertificateSpec::intermediate()
                }
            })
            .collect();
        Self::from_specs(&specs)
    }

    /// A chain built from explicit specs, root first.
    pub fn from_specs(specs: &[CertificateSpec]) -> Self {
        assert!(
            !specs.is_empty() && specs.len() <= CHAIN_KEYS,
            "chains hold 1 to {CHAIN_KEYS} certificates"
        );
        let keys = keys();
        let certificates = specs
            .iter()
            .enumerate()
            .map(|(index, spec)| {
                let issuer_index = index.saturating_sub(1);
                let signer = if spec.foreign {
                    &keys[FOREIGN_KEY]
                } else {
                    &keys[issuer_index]
                };
                build_certificate(index, issuer_index, &keys[index], signer, spec.v1)
            })
            .collect();
        Self {
            certificates,
            depth: specs.len(),
        }
    }

    /// DER encodings, root first.
    pub fn certificates(&self) -> impl Iterator<Item = &[u8]> {
        self.certificates.iter().map(Vec::as_slice)
    }

    /// DER encodings, root first, as owned buffers.
    pub fn certificate_ders(&self) -> &[Vec<u8>] {
        &self.certificates
    }

    /// Signature length of every key in the chain.
    pub fn signature_len(&self) -> usize {
        KEY_BITS / 8
    }

    /// Sign `data` with the leaf key (RSA PKCS#1 v1.5, SHA-256).
    pub fn sign(&self, data: &[u8]) -> Vec<u8> {
        sign_with(&keys()[self.depth - 1], data)
    }

    /// Sign `data` with a key that is not part of the chain.
    pub fn sign_foreign(&self, data: &[u8]) -> Vec<u8> {
        sign_with(&keys()[FOREIGN_KEY], data)
    }

    /// Root key hash of the chain: SHA-256 over the root key's modulus and
    /// exponent, big-endian.
    pub fn root_hash(&self) -> [u8; 32] {
        key_hash(&keys()[0])
    }

    /// Root key hash of a key that never roots a fixture chain.
    pub fn foreign_root_hash() -> [u8; 32] {
        key_hash(&keys()[FOREIGN_KEY])
    }
}

fn key_hash(key: &RsaPrivateKey) -> [u8; 32] {
    let mut exported = key.n().to_bytes_be();
    exported.extend_from_slice(&key.e().to_bytes_be());
    Sha256::digest(&exported).into()
}

fn sign_with(key: &RsaPrivateKey, data: &[u8]) -> Vec<u8> {
    SigningKey::<Sha256>::new(key.clone()).sign(data).to_vec()
}

fn subject_name(index: usize) -> Name {
    let cn = if index == 0 {
        "CN=Nitrokey Test Root".to_string()
    } else {
        format!("CN=Nitrokey Test Intermediate {index}")
    };
    Name::from_str(&cn).expect("valid distinguished name")
}

fn build_certificate(
    index: usize,
    issuer_index: usize,
    subject_key: &RsaPrivateKey,
    signer: &RsaPrivateKey,
    v1: bool,
) -> Vec<u8> {
    let algorithm = AlgorithmIdentifierOwned {
        oid: ObjectIdentifier::new_unwrap(SHA256_WITH_RSA),
        parameters: None,
    };
    let spki_der = subject_key
        .to_public_key()
        .to_public_key_der()
        .expect("public key encoding");
    let spki = SubjectPublicKeyInfoOwned::from_der(spki_der.as_bytes()).expect("SPKI decoding");
    let time = |secs| {
        Time::UtcTime(UtcTime::from_unix_duration(Duration::from_secs(secs)).expect("UTC time"))
    };

    let tbs = TbsCertificate {
        version: if v1 { Version::V1 } else { Version::V3 },
        serial_number: SerialNumber::new(&[index as u8 + 1]).expect("serial number"),
        signature: algorithm.clone(),
        issuer: subject_name(issuer_index),
        validity: Validity {
            not_before: time(1_600_000_000),
            not_after: time(2_400_000_000),
        },
        subject: subject_name(index),
        subject_public_key_info: spki,
        issuer_unique_id: None,
        subject_unique_id: None,
        extensions: None,
    };
    let tbs_der = tbs.to_der().expect("TBS encoding");
    let signature = sign_with(signer, &tbs_der);

    Certificate {
        tbs_certificate: tbs,
        signature_algorithm: algorithm,
        signature: BitString::from_bytes(&signature).expect("signature bit string"),
    }
    .to_der()
    .expect("certificate encoding")
}
