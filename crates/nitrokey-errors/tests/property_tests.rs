//! Property-based tests for error classification and message content.

use nitrokey_errors::{
    common::ErrorSeverity,
    ctap::CtapCode,
    device::DeviceError,
};
use proptest::prelude::*;

fn arb_severity() -> impl Strategy<Value = (u8, ErrorSeverity)> {
    prop_oneof![
        Just((0, ErrorSeverity::Info)),
        Just((1, ErrorSeverity::Warning)),
        Just((2, ErrorSeverity::Error)),
        Just((3, ErrorSeverity::Critical)),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn test_error_severity_ordering(a in arb_severity(), b in arb_severity()) {
        prop_assert_eq!(a.0.cmp(&b.0), a.1.cmp(&b.1));
    }

    #[test]
    fn test_device_error_message_contains_device(device in "[a-zA-Z0-9_/-]+") {
        let err = DeviceError::not_found(&device);
        prop_assert!(err.to_string().contains(&device));
    }

    #[test]
    fn test_invalid_response_reports_lengths(expected in 0usize..1024, actual in 0usize..1024) {
        let msg = DeviceError::invalid_response("RNG", expected, actual).to_string();
        let expected_part = format!("expected: {expected}");
        let actual_part = format!("actual: {actual}");
        prop_assert!(msg.contains(&expected_part));
        prop_assert!(msg.contains(&actual_part));
    }

    #[test]
    fn test_ctap_code_preserved(code in any::<u8>()) {
        let err = DeviceError::ctap("STATUS", code);
        prop_assert_eq!(err.ctap_code(), Some(CtapCode(code)));
        prop_assert!(!err.is_disconnect());
    }
}
