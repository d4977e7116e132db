//! Property-based tests for the version model.

use nitrokey_version::prelude::*;
use proptest::prelude::*;

fn arb_pre() -> impl Strategy<Value = Option<String>> {
    prop::option::of("(alpha|beta|rc|test)(\\.[0-9]{1,3}){0,2}")
}

fn arb_complete_version() -> impl Strategy<Value = Version> {
    (0u32..100, 0u32..100, 0u32..100, arb_pre(), prop::option::of("[a-z0-9]{1,8}")).prop_map(
        |(major, minor, patch, pre, build)| {
            let mut version = Version::new(major, minor, patch).into_complete();
            if let Some(pre) = pre {
                version = version.with_pre(pre);
            }
            if let Some(build) = build {
                version = version.with_build(build);
            }
            version
        },
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_v_str_round_trip(version in arb_complete_version()) {
        let parsed = Version::from_v_str(&version.to_string());
        prop_assert_eq!(parsed.as_ref().ok(), Some(&version));
    }

    #[test]
    fn prop_parse_without_prefix_round_trip(version in arb_complete_version()) {
        let display = version.to_string();
        let parsed = Version::parse(display.trim_start_matches('v'));
        prop_assert_eq!(parsed.as_ref().ok(), Some(&version));
    }

    #[test]
    fn prop_packed_decoding_masks(packed in any::<u32>()) {
        let version = Version::from_packed(packed);
        prop_assert_eq!(version.major(), packed >> 22);
        prop_assert!(version.minor() <= 0xFFFF);
        prop_assert!(version.patch() <= 0x3F);
        prop_assert!(!version.is_complete());
    }

    #[test]
    fn prop_pre_release_sorts_before_release(version in arb_complete_version()) {
        let release = version.core();
        let rc = version.core().with_pre("rc.1");
        prop_assert!(rc < release);
        prop_assert!(!(release < rc));
    }

    #[test]
    fn prop_ordering_antisymmetric(a in arb_complete_version(), b in arb_complete_version()) {
        prop_assert!(!(a < b && b < a));
        if a == b {
            prop_assert!(!(a < b));
        }
    }

    #[test]
    fn prop_core_is_incomplete_equal(version in arb_complete_version()) {
        let incomplete = Version::new(version.major(), version.minor(), version.patch());
        prop_assert_eq!(&incomplete, &version);
    }
}
