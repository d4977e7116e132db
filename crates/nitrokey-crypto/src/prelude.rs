//! Prelude for nitrokey-crypto
//!
//! This module re-exports the most commonly used types and functions for convenience.

pub use crate::ecdsa::{EcdsaPublicKey, EcdsaVerifier};
pub use crate::error::{CryptoError, CryptoResult};
pub use crate::hash::{ct_eq, sha256, to_hex};
pub use crate::keys::{KeySet, SignatureKey, TrustLevel};
pub use crate::x509::CertificateChain;
