//! Integration tests for signature and certificate-chain verification.

use nitrokey_crypto::prelude::*;
use nitrokey_test_helpers::certificates::{CertificateChainFixture, CertificateSpec};
use nitrokey_test_helpers::prelude::*;
use nitrokey_version::Version;

const NK3_OFFICIAL_KEY: &str = "3059301306072a8648ce3d020106082a8648ce3d03010703420004a0849b19007ccd4661c01c533804b7fd0c4d8c0e7583653f1f36a8331afff298b542bd00a3dc47c16bf428ac4d2864137d63f702d89e5b42674e0549b4232618";
const NK3_TEST_KEY: &str = "3059301306072a8648ce3d020106082a8648ce3d0301070342000493e461ab0582bda1f45b0ce47d66bc4e8623e289c31af2098cde6ebd8631da85acf17e412d406c1e38c2de654a8fd0196506a85b169a756aeac2505a541cdd5d";

mod key_tests {
    use super::*;

    #[test]
    fn test_release_keys_decode() -> TestResult {
        let official = SignatureKey::from_der_hex("Nitrokey", TrustLevel::Official, NK3_OFFICIAL_KEY)?;
        let test = SignatureKey::from_der_hex("Nitrokey Test", TrustLevel::Test, NK3_TEST_KEY)?;
        assert!(official.is_official());
        assert!(!test.is_official());
        assert_ne!(
            official.public_key().fingerprint(),
            test.public_key().fingerprint()
        );
        Ok(())
    }

    #[test]
    fn test_release_key_rejects_foreign_signature() -> TestResult {
        let official = SignatureKey::from_der_hex("Nitrokey", TrustLevel::Official, NK3_OFFICIAL_KEY)?;
        let set = KeySet::new(Version::new(0, 0, 0), vec![official]);
        let mut signature = [0x11u8; 64];
        signature[0] = 0x01;
        assert!(set.find_signer(b"init packet", &signature).is_none());
        Ok(())
    }
}

mod chain_tests {
    use super::*;

    #[test]
    fn test_single_root_chain_verifies() -> TestResult {
        let fixture = CertificateChainFixture::new(1);
        let chain = CertificateChain::from_der(fixture.certificates())?;
        chain.verify()?;
        assert_eq!(chain.len(), 1);
        Ok(())
    }

    #[test]
    fn test_root_key_hash_covers_modulus_and_exponent() -> TestResult {
        let fixture = CertificateChainFixture::new(3);
        let chain = CertificateChain::from_der(fixture.certificates())?;
        let single = CertificateChain::from_der(CertificateChainFixture::new(1).certificates())?;

        assert_eq!(chain.root_key_hash()?, fixture.root_hash());
        assert_eq!(chain.root_key_hash()?, single.root_key_hash()?);
        assert_ne!(
            chain.root_key_hash()?,
            CertificateChainFixture::foreign_root_hash()
        );
        Ok(())
    }

    #[test]
    fn test_three_level_chain_verifies() -> TestResult {
        let fixture = CertificateChainFixture::new(3);
        let chain = CertificateChain::from_der(fixture.certificates())?;
        chain.verify()?;
        assert_eq!(chain.len(), 3);
        Ok(())
    }

    #[test]
    fn test_root_signature_length_matches_key_size() -> TestResult {
        let fixture = CertificateChainFixture::new(2);
        let chain = CertificateChain::from_der(fixture.certificates())?;
        assert_eq!(chain.root_signature_len()?, fixture.signature_len());
        Ok(())
    }

    #[test]
    fn test_broken_chain_is_rejected() -> TestResult {
        let fixture = CertificateChainFixture::from_specs(&[
            CertificateSpec::root(),
            CertificateSpec::intermediate(),
            CertificateSpec::intermediate().signed_by_foreign_key(),
        ]);
        let chain = CertificateChain::from_der(fixture.certificates())?;
        assert_eq!(chain.verify(), Err(CryptoError::BrokenChain { index: 2 }));
        Ok(())
    }

    #[test]
    fn test_v1_root_is_rejected() -> TestResult {
        let fixture = CertificateChainFixture::from_specs(&[CertificateSpec::root().v1()]);
        let chain = CertificateChain::from_der(fixture.certificates())?;
        assert!(matches!(
            chain.verify(),
            Err(CryptoError::InvalidCertificate(_))
        ));
        Ok(())
    }

    #[test]
    fn test_root_not_self_signed_is_rejected() -> TestResult {
        let fixture =
            CertificateChainFixture::from_specs(&[CertificateSpec::root().signed_by_foreign_key()]);
        let chain = CertificateChain::from_der(fixture.certificates())?;
        assert!(matches!(
            chain.verify(),
            Err(CryptoError::InvalidCertificate(_))
        ));
        Ok(())
    }

    #[test]
    fn test_empty_chain() {
        let empty: Vec<&[u8]> = Vec::new();
        assert!(matches!(
            CertificateChain::from_der(empty),
            Err(CryptoError::EmptyChain)
        ));
    }

    #[test]
    fn test_garbage_certificate() {
        let garbage: &[u8] = &[0x30, 0x03, 0x02, 0x01];
        assert!(matches!(
            CertificateChain::from_der([garbage]),
            Err(CryptoError::Der(_))
        ));
    }
}

mod data_signature_tests {
    use super::*;

    #[test]
    fn test_leaf_signature_verifies() -> TestResult {
        let fixture = CertificateChainFixture::new(2);
        let chain = CertificateChain::from_der(fixture.certificates())?;
        let signature = fixture.sign(b"sb2 image body");
        assert!(chain.verify_data(b"sb2 image body", &signature)?);
        Ok(())
    }

    #[test]
    fn test_tampered_data_fails() -> TestResult {
        let fixture = CertificateChainFixture::new(2);
        let chain = CertificateChain::from_der(fixture.certificates())?;
        let signature = fixture.sign(b"sb2 image body");
        assert!(!chain.verify_data(b"sb2 image b0dy", &signature)?);
        Ok(())
    }

    #[test]
    fn test_truncated_signature_fails() -> TestResult {
        let fixture = CertificateChainFixture::new(1);
        let chain = CertificateChain::from_der(fixture.certificates())?;
        let signature = fixture.sign(b"data");
        let truncated = must_some(signature.get(..signature.len() - 1), "signature too short");
        assert!(!chain.verify_data(b"data", truncated)?);
        Ok(())
    }
}
