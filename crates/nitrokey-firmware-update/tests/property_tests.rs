//! Property-based tests for version checks, migrations and retry loops

use std::time::Duration;

use nitrokey_firmware_update::migration::DEFAULT_FINALIZATION_RETRIES;
use nitrokey_firmware_update::prelude::*;
use nitrokey_firmware_update::{compare_versions, parse_filename};
use nitrokey_test_helpers::prelude::image_filename;
use proptest::prelude::*;

fn arb_version() -> impl Strategy<Value = Version> {
    (0u32..20, 0u32..20, 0u32..20).prop_map(|(major, minor, patch)| Version::new(major, minor, patch))
}

fn arb_tag() -> impl Strategy<Value = String> {
    (
        0u32..20,
        0u32..20,
        0u32..20,
        proptest::option::of("(rc|test)\\.[0-9]{1,8}"),
    )
        .prop_map(|(major, minor, patch, pre)| match pre {
            Some(pre) => format!("v{major}.{minor}.{patch}-{pre}"),
            None => format!("v{major}.{minor}.{patch}"),
        })
}

fn arb_model() -> impl Strategy<Value = Model> {
    prop_oneof![Just(Model::Nk3), Just(Model::Nkpk)]
}

fn arb_variant() -> impl Strategy<Value = Variant> {
    prop_oneof![Just(Variant::Lpc55), Just(Variant::Nrf52)]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_downgrade_iff_core_is_older(current in arb_version(), new in arb_version()) {
        let result = compare_versions(Some(&current), &new);
        if current.core() > new.core() {
            let is_downgrade = matches!(result, Err(UpdateError::DowngradeRejected { .. }));
            prop_assert!(is_downgrade);
        } else {
            prop_assert!(result.is_ok());
        }
    }

    #[test]
    fn prop_same_version_is_reported(tag in arb_tag()) {
        let current = Version::from_v_str(&tag).map_err(|e| TestCaseError::fail(e.to_string()))?;
        let new = current.clone();
        let same = compare_versions(Some(&current), &new)
            .map_err(|e| TestCaseError::fail(e.to_string()))?;
        prop_assert_eq!(same.map(|v| v.to_string()), Some(tag));
    }

    #[test]
    fn prop_unknown_current_never_rejects(new in arb_version()) {
        prop_assert!(matches!(compare_versions(None, &new), Ok(None)));
    }

    #[test]
    fn prop_passkey_has_no_migrations(
        variant in arb_variant(),
        current in proptest::option::of(arb_version()),
        new in arb_version(),
    ) {
        prop_assert!(migrations_for(Model::Nkpk, variant, current.as_ref(), &new).is_empty());
    }

    #[test]
    fn prop_lpc55_never_migrates_nrf_ifs(
        current in proptest::option::of(arb_version()),
        new in arb_version(),
    ) {
        let migrations = migrations_for(Model::Nk3, Variant::Lpc55, current.as_ref(), &new);
        prop_assert!(!migrations.contains(&Migration::NrfIfsMigration));
    }

    #[test]
    fn prop_finalization_retries_cover_every_migration(
        model in arb_model(),
        variant in arb_variant(),
        current in proptest::option::of(arb_version()),
        new in arb_version(),
    ) {
        let migrations = migrations_for(model, variant, current.as_ref(), &new);
        let retries = finalization_wait_retries(&migrations);
        prop_assert!(retries >= DEFAULT_FINALIZATION_RETRIES);
        for migration in &migrations {
            prop_assert!(retries >= migration.retries());
        }
        prop_assert_eq!(extra_information(&migrations).is_empty(), !migrations.contains(&Migration::NrfIfsMigration));
    }

    #[test]
    fn prop_retries_sleep_between_tries(count in 0usize..20, millis in 1u64..1000) {
        let mut sleeps = Vec::new();
        let tries: Vec<_> = Retries::new(count)
            .with_timeout(Duration::from_millis(millis))
            .with_sleeper(|d| sleeps.push(d))
            .collect();

        prop_assert_eq!(tries.len(), count);
        prop_assert_eq!(sleeps.len(), count.saturating_sub(1));
        prop_assert!(sleeps.iter().all(|d| *d == Duration::from_millis(millis)));
        prop_assert_eq!(tries.iter().filter(|t| t.is_last()).count(), usize::from(count > 0));
    }

    #[test]
    fn prop_release_filenames_round_trip(model in arb_model(), version in arb_tag()) {
        let version = Version::from_v_str(&version).map_err(|e| TestCaseError::fail(e.to_string()))?;
        for &variant in model.variants() {
            let name = image_filename(model, variant, &version);
            let parsed = parse_filename(&name);
            prop_assert_eq!(parsed.as_ref().map(|(v, _)| *v), Some(variant));
            prop_assert_eq!(parsed.map(|(_, v)| v.to_string()), Some(version.to_string()));
        }
    }

    #[test]
    fn prop_warning_ids_parse_back(index in 0usize..Warning::ALL.len()) {
        let warning = Warning::ALL.get(index).copied().ok_or_else(|| TestCaseError::fail("index"))?;
        prop_assert_eq!(warning.id().parse::<Warning>().ok(), Some(warning));
    }
}
