//! Device models, hardware variants and USB identifiers.

use core::fmt;
use core::str::FromStr;

use nitrokey_errors::{DeviceError, DeviceResult};
use serde::{Deserialize, Serialize};

use crate::admin::AdminVariant;
use crate::error::ModelError;

/// USB vendor ID shared by all Nitrokey devices.
pub const VID_NITROKEY: u16 = 0x20A0;

const PID_NK3_DEVICE: u16 = 0x42B2;
const PID_NK3_LPC55_BOOTLOADER: u16 = 0x42DD;
const PID_NK3_NRF52_BOOTLOADER: u16 = 0x42E8;
const PID_NKPK_DEVICE: u16 = 0x42F3;
const PID_NKPK_BOOTLOADER: u16 = 0x42F4;

/// A Nitrokey model running the Trussed framework.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Model {
    /// Nitrokey 3
    Nk3,
    /// Nitrokey Passkey
    Nkpk,
}

impl Model {
    /// All known models.
    pub const ALL: [Model; 2] = [Model::Nk3, Model::Nkpk];

    /// Human-readable model name, as used in firmware container manifests.
    pub fn name(self) -> &'static str {
        match self {
            Model::Nk3 => "Nitrokey 3",
            Model::Nkpk => "Nitrokey Passkey",
        }
    }

    /// Short identifier used in file names and on the command line.
    pub fn short_id(self) -> &'static str {
        match self {
            Model::Nk3 => "nk3",
            Model::Nkpk => "nkpk",
        }
    }

    /// USB product ID of the device when running its firmware.
    pub fn device_pid(self) -> u16 {
        match self {
            Model::Nk3 => PID_NK3_DEVICE,
            Model::Nkpk => PID_NKPK_DEVICE,
        }
    }

    /// USB product ID of the bootloader for a variant, if the model ships it.
    pub fn bootloader_pid(self, variant: Variant) -> Option<u16> {
        match (self, variant) {
            (Model::Nk3, Variant::Lpc55) => Some(PID_NK3_LPC55_BOOTLOADER),
            (Model::Nk3, Variant::Nrf52) => Some(PID_NK3_NRF52_BOOTLOADER),
            (Model::Nkpk, Variant::Nrf52) => Some(PID_NKPK_BOOTLOADER),
            (Model::Nkpk, Variant::Lpc55) => None,
        }
    }

    /// Hardware variants this model is built on.
    pub fn variants(self) -> &'static [Variant] {
        match self {
            Model::Nk3 => &[Variant::Lpc55, Variant::Nrf52],
            Model::Nkpk => &[Variant::Nrf52],
        }
    }

    /// Display name of the bootloader for a variant.
    pub fn bootloader_name(self, variant: Variant) -> String {
        match self {
            Model::Nk3 => format!("{} Bootloader ({})", self.name(), variant.label()),
            Model::Nkpk => format!("{} Bootloader", self.name()),
        }
    }

    /// Identify a model and operating mode from a USB VID:PID pair.
    pub fn from_vid_pid(vendor_id: u16, product_id: u16) -> Option<(Model, DeviceKind)> {
        if vendor_id != VID_NITROKEY {
            return None;
        }
        Model::ALL.into_iter().find_map(|model| {
            if model.device_pid() == product_id {
                return Some((model, DeviceKind::Device));
            }
            model
                .variants()
                .iter()
                .find(|variant| model.bootloader_pid(**variant) == Some(product_id))
                .map(|variant| (model, DeviceKind::Bootloader(*variant)))
        })
    }

    /// Check that a connection's VID:PID matches the expected device kind.
    pub fn validate_vid_pid(
        self,
        kind: DeviceKind,
        vendor_id: u16,
        product_id: u16,
    ) -> DeviceResult<()> {
        let expected = match kind {
            DeviceKind::Device => Some(self.device_pid()),
            DeviceKind::Bootloader(variant) => self.bootloader_pid(variant),
        };
        if vendor_id == VID_NITROKEY && expected == Some(product_id) {
            Ok(())
        } else {
            Err(DeviceError::unsupported(vendor_id, product_id))
        }
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Model {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Model::ALL
            .into_iter()
            .find(|model| model.name() == s || model.short_id().eq_ignore_ascii_case(s))
            .ok_or_else(|| ModelError::UnknownModel(s.to_string()))
    }
}

impl Serialize for Model {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for Model {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Microcontroller family a firmware image is built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    /// NXP LPC55S69
    Lpc55,
    /// Nordic nRF52840
    Nrf52,
}

impl Variant {
    /// All known variants.
    pub const ALL: [Variant; 2] = [Variant::Lpc55, Variant::Nrf52];

    /// Lower-case identifier used in manifests and file names.
    pub fn as_str(self) -> &'static str {
        match self {
            Variant::Lpc55 => "lpc55",
            Variant::Nrf52 => "nrf52",
        }
    }

    fn label(self) -> &'static str {
        match self {
            Variant::Lpc55 => "LPC55",
            Variant::Nrf52 => "NRF52",
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Variant {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Variant::ALL
            .into_iter()
            .find(|variant| variant.as_str() == s)
            .ok_or_else(|| ModelError::UnknownVariant(s.to_string()))
    }
}

impl TryFrom<AdminVariant> for Variant {
    type Error = ModelError;

    fn try_from(variant: AdminVariant) -> Result<Self, Self::Error> {
        match variant {
            AdminVariant::Lpc55 => Ok(Variant::Lpc55),
            AdminVariant::Nrf52 => Ok(Variant::Nrf52),
            AdminVariant::Usbip => Err(ModelError::UnsupportedVariant(variant)),
        }
    }
}

/// Whether a USB device runs the firmware or a bootloader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceKind {
    /// Regular firmware
    Device,
    /// Bootloader for the given variant
    Bootloader(Variant),
}
