//! Update warnings
//!
//! A warning stops the update unless the operator explicitly ignores it with
//! [`UpdateConfig::ignore_warnings`](crate::UpdateConfig::ignore_warnings).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::UnknownWarning;

/// Conditions that abort an update unless ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Warning {
    /// The internal filesystem is too full for the v2 migration
    IfsMigrationV2,
    /// The running firmware is too old to report its status
    MissingStatus,
    /// The container requires a newer SDK
    SdkVersion,
    /// The device is already in bootloader mode
    UpdateFromBootloader,
}

impl Warning {
    /// All warnings.
    pub const ALL: [Warning; 4] = [
        Warning::IfsMigrationV2,
        Warning::MissingStatus,
        Warning::SdkVersion,
        Warning::UpdateFromBootloader,
    ];

    /// Stable id used on the command line and in configuration files.
    pub fn id(self) -> &'static str {
        match self {
            Warning::IfsMigrationV2 => "ifs-migration-v2",
            Warning::MissingStatus => "missing-status",
            Warning::SdkVersion => "sdk-version",
            Warning::UpdateFromBootloader => "update-from-bootloader",
        }
    }

    /// Message shown to the operator.
    pub fn message(self) -> &'static str {
        match self {
            Warning::IfsMigrationV2 => {
                "Not enough space on the internal filesystem to perform the firmware update. \
                 See the release notes for more information: \
                 https://github.com/Nitrokey/nitrokey-3-firmware/releases/tag/v1.8.2-test.20250312"
            }
            Warning::MissingStatus => {
                "Could not determine the device state as the current firmware is too old. \
                 Please update to firmware version v1.3.1 first."
            }
            Warning::SdkVersion => {
                "Your Nitrokey SDK version is outdated.  \
                 Please update this program to the latest version and try again."
            }
            Warning::UpdateFromBootloader => {
                "The current state of the device cannot be checked as it is already in bootloader mode. \
                 Please review the release notes at: \
                 https://github.com/Nitrokey/nitrokey-3-firmware/releases"
            }
        }
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Warning {
    type Err = UnknownWarning;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Warning::ALL
            .into_iter()
            .find(|warning| warning.id() == s)
            .ok_or_else(|| UnknownWarning(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_parse_back() {
        for warning in Warning::ALL {
            assert_eq!(warning.id().parse::<Warning>(), Ok(warning));
        }
    }

    #[test]
    fn test_unknown_id() {
        let err = "ifs-migration".parse::<Warning>();
        assert_eq!(err, Err(UnknownWarning("ifs-migration".to_string())));
    }

    #[test]
    fn test_serde_uses_id() -> Result<(), serde_json::Error> {
        let json = serde_json::to_string(&Warning::UpdateFromBootloader)?;
        assert_eq!(json, "\"update-from-bootloader\"");
        Ok(())
    }

    #[test]
    fn test_sdk_message_keeps_double_space() {
        assert!(Warning::SdkVersion.message().contains("outdated.  Please"));
    }
}
