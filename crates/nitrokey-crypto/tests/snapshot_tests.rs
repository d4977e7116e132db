//! Snapshot tests for crypto error messages.

use insta::assert_snapshot;
use nitrokey_crypto::CryptoError;

#[test]
fn test_broken_chain_message() {
    assert_snapshot!(CryptoError::BrokenChain { index: 2 }.to_string(), @"Certificate 2 is not signed by its parent");
}

#[test]
fn test_invalid_certificate_message() {
    assert_snapshot!(
        CryptoError::InvalidCertificate("root certificate is not self-signed".into()).to_string(),
        @"Invalid certificate: root certificate is not self-signed"
    );
}

#[test]
fn test_unsupported_algorithm_message() {
    assert_snapshot!(
        CryptoError::UnsupportedAlgorithm("1.2.840.10045.4.3.2".into()).to_string(),
        @"Unsupported algorithm: 1.2.840.10045.4.3.2"
    );
}
