//! Unit tests for version parsing, comparison and serialization.

use nitrokey_version::prelude::*;

mod parsing_tests {
    use super::*;

    #[test]
    fn test_parse_round_trips_through_display() -> Result<(), VersionError> {
        for s in ["v1.0.0", "v1.8.2-rc.1", "v0.1.0-test.20240101+git", "v12.34.56"] {
            let version = Version::from_v_str(s)?;
            assert_eq!(version.to_string(), s);
        }
        Ok(())
    }

    #[test]
    fn test_from_str_trait() -> Result<(), VersionError> {
        let version: Version = "1.3.1".parse()?;
        assert_eq!(version, Version::new(1, 3, 1));
        Ok(())
    }

    #[test]
    fn test_error_messages() {
        let missing = Version::from_v_str("1.0.0").err().map(|e| e.to_string());
        assert_eq!(
            missing.as_deref(),
            Some("Missing v prefix for firmware version: 1.0.0")
        );
        let invalid = Version::parse("1.0").err().map(|e| e.to_string());
        assert_eq!(invalid.as_deref(), Some("Invalid firmware version: 1.0"));
    }

    #[test]
    fn test_packed_round_trip_of_known_release() {
        // v1.2.2 as reported by the LPC55 runner
        let packed = (1u32 << 22) | (2 << 6) | 2;
        assert_eq!(Version::from_packed(packed).to_string(), "v1.2.2");
    }
}

mod comparison_tests {
    use super::*;

    #[test]
    fn test_complete_pre_release_before_release() -> Result<(), VersionError> {
        let rc = Version::parse("1.0.0-rc.1")?;
        let release = Version::parse("1.0.0")?;
        assert!(rc < release);
        assert!(!(release < rc));
        assert_ne!(rc, release);
        Ok(())
    }

    #[test]
    fn test_numeric_pre_components() -> Result<(), VersionError> {
        assert!(Version::parse("1.0.0-rc.2")? < Version::parse("1.0.0-rc.10")?);
        Ok(())
    }

    #[test]
    fn test_incomplete_compares_equal_to_any_pre() -> Result<(), VersionError> {
        let device = Version::from_packed((1 << 22) | (3 << 6));
        let release = Version::from_v_str("v1.3.0-rc.2")?;
        assert_eq!(device, release);
        assert!(device <= release);
        assert!(device >= release);
        Ok(())
    }

    #[test]
    fn test_core_comparison_for_downgrades() -> Result<(), VersionError> {
        let current = Version::from_v_str("v1.8.2")?;
        let new = Version::from_v_str("v1.8.2-rc.1")?;
        assert!(!(current.core() > new.core()));
        assert!(current > new);
        Ok(())
    }
}

mod serde_tests {
    use super::*;

    #[test]
    fn test_serialize_as_display_string() -> Result<(), serde_json::Error> {
        let version = Version::new(1, 8, 2).with_pre("rc.1");
        assert_eq!(serde_json::to_string(&version)?, "\"v1.8.2-rc.1\"");
        Ok(())
    }

    #[test]
    fn test_deserialize_with_and_without_prefix() -> Result<(), serde_json::Error> {
        let with: Version = serde_json::from_str("\"v1.8.2\"")?;
        let without: Version = serde_json::from_str("\"1.8.2\"")?;
        assert_eq!(with, without);
        assert!(with.is_complete());
        Ok(())
    }

    #[test]
    fn test_deserialize_rejects_garbage() {
        let result: Result<Version, _> = serde_json::from_str("\"v1.x\"");
        assert!(result.is_err());
    }
}
