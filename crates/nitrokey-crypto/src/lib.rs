//! Signature and certificate-chain verification for Nitrokey firmware images
//!
//! Firmware images for the two Nitrokey microcontroller families are signed in
//! different ways:
//! - NRF52 DFU packages carry an ECDSA P-256 signature over the init packet,
//!   checked against a small allowlist of named public keys
//! - LPC55 SB2.1 images carry an X.509 certificate chain and an RSA PKCS#1 v1.5
//!   signature, anchored by the hash of the root key table (RKTH)
//!
//! This crate verifies both. It only wraps the RustCrypto primitives; it never
//! implements them.
//!
//! # Architecture
//!
//! - [`ecdsa`]: P-256 public keys and signature verification
//! - [`keys`]: Named signing keys grouped into version-ranged key sets
//! - [`x509`]: Certificate-chain parsing and RSA verification
//! - [`hash`]: SHA-256 helpers and constant-time comparison
//! - [`error`]: Error types for cryptographic operations
//!
//! # Security Considerations
//!
//! - Digest comparisons use constant-time operations via the `subtle` crate
//! - A signature that fails to decode is treated as "not signed by this key",
//!   never as a verification success
//!
//! # Example
//!
//! ```
//! use nitrokey_crypto::prelude::*;
//!
//! let digest = sha256(b"firmware");
//! assert!(ct_eq(&digest, &sha256(b"firmware")));
//! assert_eq!(to_hex(&digest).len(), 64);
//! ```

#![deny(unsafe_op_in_unsafe_fn, clippy::unwrap_used)]
#![warn(missing_docs, rust_2018_idioms)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod ecdsa;
pub mod error;
pub mod hash;
pub mod keys;
pub mod prelude;
pub mod x509;

pub use ecdsa::{EcdsaPublicKey, EcdsaVerifier};
pub use error::{CryptoError, CryptoResult};
pub use hash::{ct_eq, sha256, to_hex};
pub use keys::{KeySet, SignatureKey, TrustLevel};
pub use x509::CertificateChain;
