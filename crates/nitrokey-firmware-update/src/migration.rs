//! Filesystem migrations triggered by an update
//!
//! Some firmware releases migrate the internal filesystem on first boot. The
//! migrations are derived from the installed and the new version; they are
//! never stored.

use std::collections::BTreeSet;
use std::fmt;

use nitrokey_device::{Model, Variant};
use nitrokey_version::Version;
use serde::Serialize;

/// Default number of retries while waiting for the device after an update.
pub const DEFAULT_FINALIZATION_RETRIES: usize = 60;

/// Number of retries while waiting for the device to finish the NRF52 IFS migration.
pub const NRF_IFS_MIGRATION_RETRIES: usize = 500;

/// Minimum number of free IFS blocks required by [`Migration::IfsMigrationV2`].
pub const IFS_MIGRATION_V2_MIN_BLOCKS: u16 = 5;

/// A data migration performed by the new firmware.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Migration {
    /// NRF52 internal filesystem layout change introduced with v1.3.0
    NrfIfsMigration,
    /// Internal filesystem v2 introduced with v1.8.2
    IfsMigrationV2,
}

impl Migration {
    /// Number of retries to wait for the device after this migration.
    pub fn retries(self) -> usize {
        match self {
            Migration::NrfIfsMigration => NRF_IFS_MIGRATION_RETRIES,
            Migration::IfsMigrationV2 => DEFAULT_FINALIZATION_RETRIES,
        }
    }
}

impl fmt::Display for Migration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Migration::NrfIfsMigration => f.write_str("nrf-ifs-migration"),
            Migration::IfsMigrationV2 => f.write_str("ifs-migration-v2"),
        }
    }
}

/// Compute the migrations caused by updating from `current` to `new`.
///
/// An unknown `current` version means the device was updated from the
/// bootloader.
pub fn migrations_for(
    model: Model,
    variant: Variant,
    current: Option<&Version>,
    new: &Version,
) -> BTreeSet<Migration> {
    let mut migrations = BTreeSet::new();
    if model != Model::Nk3 {
        return migrations;
    }

    let nrf_boundary = match current {
        None => true,
        Some(current) => *current <= Version::new(1, 2, 2) && *new >= Version::new(1, 3, 0),
    };
    if variant == Variant::Nrf52 && nrf_boundary {
        migrations.insert(Migration::NrfIfsMigration);
    }

    let v2 = Version::new(1, 8, 2);
    if current.is_some_and(|current| *current < v2) && *new >= v2 {
        migrations.insert(Migration::IfsMigrationV2);
    }

    migrations
}

/// Number of retries to wait for the device after applying `migrations`.
pub fn finalization_wait_retries(migrations: &BTreeSet<Migration>) -> usize {
    migrations
        .iter()
        .map(|migration| migration.retries())
        .max()
        .unwrap_or(DEFAULT_FINALIZATION_RETRIES)
}

/// Information the operator has to acknowledge before the update.
///
/// Returns an empty list if no migration needs attention.
pub fn extra_information(migrations: &BTreeSet<Migration>) -> Vec<String> {
    let mut lines = Vec::new();
    if migrations.contains(&Migration::NrfIfsMigration) {
        lines.extend(
            [
                "",
                "During this update process the internal filesystem will be migrated!",
                "- Migration will only work, if your internal filesystem does not contain more than 45 Resident Keys. If you have more please remove some.",
                "- After the update it might take up to 3 minutes for the first boot.",
                "Never unplug the device while the LED is active!",
            ]
            .map(String::from),
        );
    }
    lines
}
