//! Updater configuration

use std::collections::BTreeSet;
use std::time::Duration;

use nitrokey_version::Version;
use serde::{Deserialize, Deserializer};

use crate::warning::Warning;

/// Legacy client version at which the minimum client check was replaced by
/// the SDK version check.
pub const PYNITROKEY_COMPAT_VERSION: Version = Version::new(0, 4, 49);

/// Default wait between the reboot command and the first bootloader probe.
pub const DEFAULT_BOOTLOADER_SETTLE_DELAY: Duration = Duration::from_secs(1);

/// Default number of bootloader connection attempts.
pub const DEFAULT_BOOTLOADER_RETRIES: usize = 3;

/// Default wait between two bootloader connection attempts.
pub const DEFAULT_BOOTLOADER_RETRY_DELAY: Duration = Duration::from_millis(500);

/// Settings of an [`Updater`](crate::Updater).
///
/// Durations are given in milliseconds when deserialized:
///
/// ```
/// use nitrokey_firmware_update::{UpdateConfig, Warning};
///
/// let config: UpdateConfig = serde_json::from_str(
///     r#"{"ignore_warnings": ["missing-status"], "bootloader_settle_delay_ms": 2000}"#,
/// )?;
/// assert!(config.ignores(Warning::MissingStatus));
/// assert_eq!(config.bootloader_settle_delay.as_secs(), 2);
/// # Ok::<(), serde_json::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct UpdateConfig {
    /// Warnings that are shown instead of aborting the update
    pub ignore_warnings: BTreeSet<Warning>,
    /// Continue after confirmation if the container requires a newer legacy client
    pub ignore_pynitrokey_version: bool,
    /// SDK version compared against the container's minimum SDK version
    pub sdk_version: Version,
    /// Wait after the reboot command
    #[serde(rename = "bootloader_settle_delay_ms", deserialize_with = "millis")]
    pub bootloader_settle_delay: Duration,
    /// Bootloader connection attempts
    pub bootloader_retries: usize,
    /// Wait between two bootloader connection attempts
    #[serde(rename = "bootloader_retry_delay_ms", deserialize_with = "millis")]
    pub bootloader_retry_delay: Duration,
}

impl UpdateConfig {
    /// Version of this crate, used as the default SDK version.
    pub fn crate_version() -> Version {
        // The package version is always a valid version.
        Version::parse(env!("CARGO_PKG_VERSION")).unwrap_or(Version::new(0, 0, 0))
    }

    /// Whether `warning` is ignored.
    pub fn ignores(&self, warning: Warning) -> bool {
        self.ignore_warnings.contains(&warning)
    }

    /// Ignore an additional warning.
    pub fn ignore_warning(mut self, warning: Warning) -> Self {
        self.ignore_warnings.insert(warning);
        self
    }
}

impl Default for UpdateConfig {
    fn default() -> Self {
        Self {
            ignore_warnings: BTreeSet::new(),
            ignore_pynitrokey_version: false,
            sdk_version: Self::crate_version(),
            bootloader_settle_delay: DEFAULT_BOOTLOADER_SETTLE_DELAY,
            bootloader_retries: DEFAULT_BOOTLOADER_RETRIES,
            bootloader_retry_delay: DEFAULT_BOOTLOADER_RETRY_DELAY,
        }
    }
}

fn millis<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
    u64::deserialize(deserializer).map(Duration::from_millis)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = UpdateConfig::default();
        assert!(config.ignore_warnings.is_empty());
        assert_eq!(config.bootloader_retries, 3);
        assert_eq!(config.bootloader_retry_delay, Duration::from_millis(500));
        assert_eq!(config.sdk_version.to_string(), concat!("v", env!("CARGO_PKG_VERSION")));
    }

    #[test]
    fn test_deserialize() -> Result<(), serde_json::Error> {
        let config: UpdateConfig = serde_json::from_str(
            r#"{
                "ignore_warnings": ["ifs-migration-v2", "sdk-version"],
                "ignore_pynitrokey_version": true,
                "sdk_version": "0.9.0",
                "bootloader_retries": 5,
                "bootloader_retry_delay_ms": 100
            }"#,
        )?;
        assert!(config.ignores(Warning::IfsMigrationV2));
        assert!(config.ignores(Warning::SdkVersion));
        assert!(!config.ignores(Warning::MissingStatus));
        assert!(config.ignore_pynitrokey_version);
        assert_eq!(config.sdk_version, Version::new(0, 9, 0));
        assert_eq!(config.bootloader_retries, 5);
        assert_eq!(config.bootloader_retry_delay, Duration::from_millis(100));
        assert_eq!(config.bootloader_settle_delay, Duration::from_secs(1));
        Ok(())
    }

    #[test]
    fn test_unknown_warning_is_rejected() {
        let result = serde_json::from_str::<UpdateConfig>(r#"{"ignore_warnings": ["nope"]}"#);
        assert!(result.is_err());
    }
}
