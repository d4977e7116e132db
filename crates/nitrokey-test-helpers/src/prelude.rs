//! Convenience re-exports for common test utilities.
//!
//! Import this module to get access to the most commonly used test helpers:
//!
//! ```rust,ignore
//! use nitrokey_test_helpers::prelude::*;
//! ```

pub use crate::must::{must, must_err, must_parse, must_some, must_with};

#[cfg(feature = "mock")]
pub use crate::mock::{MockBootloader, MockConnection, RecordedCall};

#[cfg(feature = "certificates")]
pub use crate::certificates::{CertificateChainFixture, CertificateSpec};

#[cfg(feature = "fixtures")]
pub use crate::fixtures::{
    ContainerBuilder, Nrf52PackageBuilder, Sb2ImageBuilder, fixture_trust_anchors,
    image_filename, nrf52_foreign_signing_key, nrf52_key_set, nrf52_signing_key,
    nrf52_test_signing_key,
};

pub type TestResult = Result<(), Box<dyn std::error::Error>>;
