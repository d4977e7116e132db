//! Error types for cryptographic operations
//!
//! This module provides error types for all cryptographic operations in the crate.

use thiserror::Error;

/// Cryptographic operation errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// Invalid signature
    #[error("Invalid signature")]
    InvalidSignature,

    /// Key format error
    #[error("Key format error: {0}")]
    KeyFormatError(String),

    /// A certificate could not be decoded or violates a structural rule
    #[error("Invalid certificate: {0}")]
    InvalidCertificate(String),

    /// A certificate in the chain is not signed by its parent
    #[error("Certificate {index} is not signed by its parent")]
    BrokenChain {
        /// Position of the offending certificate, the root being 0
        index: usize,
    },

    /// The chain contains no certificates
    #[error("Empty certificate chain")]
    EmptyChain,

    /// Unsupported signature or key algorithm
    #[error("Unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// DER decoding error
    #[error("DER error: {0}")]
    Der(String),
}

impl From<der::Error> for CryptoError {
    fn from(e: der::Error) -> Self {
        CryptoError::Der(e.to_string())
    }
}

/// Result type for cryptographic operations
pub type CryptoResult<T> = std::result::Result<T, CryptoError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CryptoError::UnsupportedAlgorithm("ecdsa-with-SHA384".into());
        assert_eq!(err.to_string(), "Unsupported algorithm: ecdsa-with-SHA384");
        assert_eq!(
            CryptoError::BrokenChain { index: 1 }.to_string(),
            "Certificate 1 is not signed by its parent"
        );
    }
}
