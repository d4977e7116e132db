//! Property-based tests for status decoding and USB identification.

use nitrokey_device::prelude::*;
use proptest::prelude::*;

fn arb_model() -> impl Strategy<Value = Model> {
    prop_oneof![Just(Model::Nk3), Just(Model::Nkpk)]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_status_decoding_never_panics(reply in prop::collection::vec(any::<u8>(), 0..16)) {
        let result = Status::from_reply(&reply);
        prop_assert_eq!(result.is_err(), reply.is_empty());
    }

    #[test]
    fn prop_status_fields_follow_reply_length(reply in prop::collection::vec(any::<u8>(), 1..8)) {
        let status = Status::from_reply(&reply).map_err(|e| TestCaseError::fail(e.to_string()))?;
        prop_assert!(status.init_status.is_some());
        prop_assert_eq!(status.ifs_blocks.is_some(), reply.len() >= 4);
        prop_assert_eq!(status.efs_blocks.is_some(), reply.len() >= 4);
        if reply.len() < 5 {
            prop_assert!(status.variant.is_none());
        }
    }

    #[test]
    fn prop_init_status_display_mentions_hex(bits in 1u8..=255) {
        let shown = InitStatus::from_bits(bits).to_string();
        let expected_suffix = format!("({bits:#x})");
        prop_assert!(shown.ends_with(&expected_suffix));
    }

    #[test]
    fn prop_uuid_display_is_32_hex_digits(value in any::<u128>()) {
        let shown = Uuid::from(value).to_string();
        prop_assert_eq!(shown.len(), 32);
        prop_assert_eq!(u128::from_str_radix(&shown, 16).ok(), Some(value));
    }

    #[test]
    fn prop_device_pid_roundtrip(model in arb_model()) {
        prop_assert_eq!(
            Model::from_vid_pid(VID_NITROKEY, model.device_pid()),
            Some((model, DeviceKind::Device))
        );
    }

    #[test]
    fn prop_model_parses_own_names(model in arb_model()) {
        prop_assert_eq!(model.name().parse::<Model>().ok(), Some(model));
        prop_assert_eq!(model.short_id().parse::<Model>().ok(), Some(model));
    }
}
