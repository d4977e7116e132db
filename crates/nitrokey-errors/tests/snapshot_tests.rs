//! Snapshot tests for error message formatting.
//!
//! Operator-facing messages are part of the user interface and must stay
//! stable across changes.

use nitrokey_errors::{
    common::{ErrorCategory, ErrorSeverity},
    ctap::CtapCode,
    device::DeviceError,
};

mod device_error_snapshots {
    use super::*;
    use insta::assert_snapshot;

    #[test]
    fn test_not_found() {
        assert_snapshot!(DeviceError::not_found("Nitrokey 3").to_string(), @"Device not found: Nitrokey 3");
    }

    #[test]
    fn test_disconnected() {
        assert_snapshot!(DeviceError::disconnected("/dev/hidraw3").to_string(), @"Device disconnected: /dev/hidraw3");
    }

    #[test]
    fn test_timeout() {
        assert_snapshot!(DeviceError::timeout("/dev/hidraw3", 5000).to_string(), @"Device /dev/hidraw3 timeout after 5000ms");
    }

    #[test]
    fn test_confirmation_timeout() {
        assert_snapshot!(DeviceError::ConfirmationTimeout.to_string(), @"The user confirmation request timed out");
    }

    #[test]
    fn test_unsupported_device() {
        assert_snapshot!(DeviceError::unsupported(0x20a0, 0x4211).to_string(), @"Unsupported device: vendor=0x20a0, product=0x4211");
    }

    #[test]
    fn test_ctap() {
        assert_snapshot!(
            DeviceError::ctap("REBOOT", CtapCode::INVALID_LENGTH).to_string(),
            @"The CTAPHID REBOOT command failed with status INVALID_LENGTH (0x03)"
        );
    }

    #[test]
    fn test_malformed() {
        assert_snapshot!(
            DeviceError::malformed("STATUS", "The device returned an empty status").to_string(),
            @"Malformed response for the STATUS command: The device returned an empty status"
        );
    }
}

mod classification_snapshots {
    use super::*;
    use insta::assert_snapshot;

    #[test]
    fn test_severity_display() {
        let all = [
            ErrorSeverity::Info,
            ErrorSeverity::Warning,
            ErrorSeverity::Error,
            ErrorSeverity::Critical,
        ]
        .map(|s| s.to_string())
        .join(",");
        assert_snapshot!(all, @"INFO,WARN,ERROR,CRITICAL");
    }

    #[test]
    fn test_category_display() {
        let all = [
            ErrorCategory::Device,
            ErrorCategory::Container,
            ErrorCategory::Image,
            ErrorCategory::Policy,
        ]
        .map(|c| c.to_string())
        .join(",");
        assert_snapshot!(all, @"Device,Container,Image,Policy");
    }
}
