//! The admin application protocol.
//!
//! Legacy commands (reboot, version, uuid, ...) are sent as raw vendor
//! commands; newer commands are prefixed with their code and routed to the
//! admin app. Firmware that does not know a command answers with
//! `INVALID_COMMAND`, which is surfaced as `None` rather than as an error.

use core::fmt;

use nitrokey_errors::{CtapCode, DeviceError, DeviceResult};
use nitrokey_version::Version;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::connection::{App, Connection, check_response_len};
use crate::device::Uuid;
use crate::error::{AdminError, AdminResult};

const RNG_LEN: usize = 57;
const UUID_LEN: usize = 16;
const VERSION_LEN: usize = 4;

/// Commands understood by the admin app.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdminCommand {
    /// Reboot into the bootloader (requires touch confirmation)
    Update,
    /// Reboot into the firmware
    Reboot,
    /// Random bytes
    Rng,
    /// Firmware version
    Version,
    /// Device UUID
    Uuid,
    /// Lock state (LPC55 only)
    Locked,
    /// Initialization status
    Status,
    /// SE050 self test
    TestSe050,
    /// Read a configuration value
    GetConfig,
    /// Write a configuration value
    SetConfig,
    /// Factory reset the whole device
    FactoryReset,
    /// Factory reset a single application
    FactoryResetApp,
    /// List configuration fields
    ListAvailableFields,
}

impl AdminCommand {
    /// Command byte.
    pub fn code(self) -> u8 {
        match self {
            AdminCommand::Update => 0x51,
            AdminCommand::Reboot => 0x53,
            AdminCommand::Rng => 0x60,
            AdminCommand::Version => 0x61,
            AdminCommand::Uuid => 0x62,
            AdminCommand::Locked => 0x63,
            AdminCommand::Status => 0x80,
            AdminCommand::TestSe050 => 0x81,
            AdminCommand::GetConfig => 0x82,
            AdminCommand::SetConfig => 0x83,
            AdminCommand::FactoryReset => 0x84,
            AdminCommand::FactoryResetApp => 0x85,
            AdminCommand::ListAvailableFields => 0x86,
        }
    }

    /// Command name used in log lines and error messages.
    pub fn name(self) -> &'static str {
        match self {
            AdminCommand::Update => "UPDATE",
            AdminCommand::Reboot => "REBOOT",
            AdminCommand::Rng => "RNG",
            AdminCommand::Version => "VERSION",
            AdminCommand::Uuid => "UUID",
            AdminCommand::Locked => "LOCKED",
            AdminCommand::Status => "STATUS",
            AdminCommand::TestSe050 => "TEST_SE050",
            AdminCommand::GetConfig => "GET_CONFIG",
            AdminCommand::SetConfig => "SET_CONFIG",
            AdminCommand::FactoryReset => "FACTORY_RESET",
            AdminCommand::FactoryResetApp => "FACTORY_RESET_APP",
            AdminCommand::ListAvailableFields => "LIST_AVAILABLE_FIELDS",
        }
    }

    /// Legacy commands are sent directly instead of through the admin app.
    pub fn is_legacy(self) -> bool {
        self.code() < 0x80
    }
}

/// Target of a reboot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BootMode {
    /// Restart the firmware
    #[default]
    Firmware,
    /// Restart into the bootloader for a firmware update
    Bootrom,
}

/// Initialization status bit set reported by the firmware.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct InitStatus(u8);

impl InitStatus {
    /// NFC initialization failed
    pub const NFC_ERROR: InitStatus = InitStatus(0x01);
    /// Internal flash could not be mounted
    pub const INTERNAL_FLASH_ERROR: InitStatus = InitStatus(0x02);
    /// External flash could not be mounted
    pub const EXTERNAL_FLASH_ERROR: InitStatus = InitStatus(0x04);
    /// A data migration failed
    pub const MIGRATION_ERROR: InitStatus = InitStatus(0x08);
    /// The SE050 secure element did not respond
    pub const SE050_ERROR: InitStatus = InitStatus(0x10);
    /// The configuration could not be loaded
    pub const CONFIG_ERROR: InitStatus = InitStatus(0x20);
    /// The RNG failed
    pub const RNG_ERROR: InitStatus = InitStatus(0x40);
    /// The external flash has to be reformatted
    pub const EXT_FLASH_NEED_REFORMAT: InitStatus = InitStatus(0x80);

    const NAMED: [(InitStatus, &'static str); 8] = [
        (InitStatus::NFC_ERROR, "NFC_ERROR"),
        (InitStatus::INTERNAL_FLASH_ERROR, "INTERNAL_FLASH_ERROR"),
        (InitStatus::EXTERNAL_FLASH_ERROR, "EXTERNAL_FLASH_ERROR"),
        (InitStatus::MIGRATION_ERROR, "MIGRATION_ERROR"),
        (InitStatus::SE050_ERROR, "SE050_ERROR"),
        (InitStatus::CONFIG_ERROR, "CONFIG_ERROR"),
        (InitStatus::RNG_ERROR, "RNG_ERROR"),
        (InitStatus::EXT_FLASH_NEED_REFORMAT, "EXT_FLASH_NEED_REFORMAT"),
    ];

    /// Wrap a raw status byte.
    pub const fn from_bits(bits: u8) -> Self {
        InitStatus(bits)
    }

    /// Raw status byte.
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Whether all bits of `other` are set.
    pub const fn contains(self, other: InitStatus) -> bool {
        self.0 & other.0 == other.0
    }

    /// Any bit set means initialization reported a problem.
    pub const fn is_error(self) -> bool {
        self.0 != 0
    }
}

impl fmt::Display for InitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 == 0 {
            return f.write_str("ok");
        }
        let mut names = Vec::new();
        let mut known = 0u8;
        for (flag, name) in InitStatus::NAMED {
            if self.contains(flag) {
                names.push(name);
                known |= flag.0;
            }
        }
        if known != self.0 {
            names.push("UNKNOWN");
        }
        write!(f, "{} ({:#x})", names.join(", "), self.0)
    }
}

/// Hardware variant as reported by the admin app.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdminVariant {
    /// Simulated device over USB/IP
    Usbip,
    /// NXP LPC55
    Lpc55,
    /// Nordic nRF52
    Nrf52,
}

impl AdminVariant {
    /// Decode the variant byte of a status reply.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(AdminVariant::Usbip),
            1 => Some(AdminVariant::Lpc55),
            2 => Some(AdminVariant::Nrf52),
            _ => None,
        }
    }
}

impl fmt::Display for AdminVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdminVariant::Usbip => f.write_str("usbip"),
            AdminVariant::Lpc55 => f.write_str("lpc55"),
            AdminVariant::Nrf52 => f.write_str("nrf52"),
        }
    }
}

/// Device status. Every field is optional because older firmware reports
/// less information or nothing at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Status {
    /// Initialization status
    pub init_status: Option<InitStatus>,
    /// Free blocks on the internal filesystem
    pub ifs_blocks: Option<u16>,
    /// Free blocks on the external filesystem
    pub efs_blocks: Option<u32>,
    /// Hardware variant
    pub variant: Option<AdminVariant>,
}

impl Status {
    /// Decode a status reply: `[init, ifs, efs_hi, efs_lo, variant]`.
    pub fn from_reply(reply: &[u8]) -> DeviceResult<Self> {
        let mut status = Status::default();
        let Some(init) = reply.first() else {
            return Err(DeviceError::malformed(
                AdminCommand::Status.name(),
                "The device returned an empty status",
            ));
        };
        status.init_status = Some(InitStatus::from_bits(*init));
        if let [_, ifs, efs_hi, efs_lo, rest @ ..] = reply {
            status.ifs_blocks = Some(u16::from(*ifs));
            status.efs_blocks = Some(u32::from(u16::from_be_bytes([*efs_hi, *efs_lo])));
            status.variant = rest.first().copied().and_then(AdminVariant::from_code);
        }
        Ok(status)
    }
}

/// Result codes of the configuration commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigStatus {
    /// Success
    Success,
    /// Reading the configuration failed
    ReadFailed,
    /// Writing the configuration failed
    WriteFailed,
    /// The stored configuration could not be deserialized
    DeserializationFailed,
    /// The configuration could not be serialized
    SerializationFailed,
    /// Unknown configuration key
    InvalidKey,
    /// Invalid value for the key
    InvalidValue,
    /// The value is too long
    DataTooLong,
}

impl ConfigStatus {
    /// Decode a status byte.
    pub fn from_code(code: u8) -> Option<Self> {
        Some(match code {
            0 => ConfigStatus::Success,
            1 => ConfigStatus::ReadFailed,
            2 => ConfigStatus::WriteFailed,
            3 => ConfigStatus::DeserializationFailed,
            4 => ConfigStatus::SerializationFailed,
            5 => ConfigStatus::InvalidKey,
            6 => ConfigStatus::InvalidValue,
            7 => ConfigStatus::DataTooLong,
            _ => return None,
        })
    }

    fn check(code: u8, context: &str) -> AdminResult<()> {
        let reason = match ConfigStatus::from_code(code) {
            Some(ConfigStatus::Success) => return Ok(()),
            Some(status) => status.to_string(),
            None => format!("unknown error {code:x}"),
        };
        Err(AdminError::Config {
            context: context.to_string(),
            reason,
        })
    }
}

impl fmt::Display for ConfigStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConfigStatus::Success => "success",
            ConfigStatus::ReadFailed => "read failed",
            ConfigStatus::WriteFailed => "write failed",
            ConfigStatus::DeserializationFailed => "deserialization failed",
            ConfigStatus::SerializationFailed => "serialization failed",
            ConfigStatus::InvalidKey => "invalid key",
            ConfigStatus::InvalidValue => "invalid value",
            ConfigStatus::DataTooLong => "data too long",
        };
        f.write_str(s)
    }
}

fn check_factory_reset(code: u8, context: &str) -> AdminResult<()> {
    let reason = match code {
        0x00 => return Ok(()),
        0x01 => "Operation was not confirmed with touch".to_string(),
        0x02 => "The application does not support factory reset through nitropy".to_string(),
        0x03 => "The application name must be utf-8".to_string(),
        other => format!("Unknown error {other:x}"),
    };
    Err(AdminError::FactoryReset {
        context: context.to_string(),
        reason,
    })
}

/// Client for the admin app of a connected device.
pub struct AdminApp<'a> {
    connection: &'a mut dyn Connection,
}

impl<'a> AdminApp<'a> {
    /// Talk to the admin app over `connection`.
    pub fn new(connection: &'a mut dyn Connection) -> Self {
        Self { connection }
    }

    /// Send a command. Returns `None` if the firmware does not support it.
    pub fn call(
        &mut self,
        command: AdminCommand,
        data: &[u8],
        response_len: Option<usize>,
    ) -> DeviceResult<Option<Vec<u8>>> {
        let result = if command.is_legacy() {
            self.connection
                .call_admin_app_legacy(command.code(), command.name(), data, response_len)
        } else {
            let mut request = Vec::with_capacity(data.len() + 1);
            request.push(command.code());
            request.extend_from_slice(data);
            self.connection.call_app(App::Admin, &request, response_len)
        };

        match result {
            Ok(reply) => {
                check_response_len(command.name(), &reply, response_len)?;
                Ok(Some(reply))
            }
            Err(e) if e.ctap_code() == Some(CtapCode::INVALID_COMMAND) => {
                debug!(command = command.name(), "Command not supported by the firmware");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    fn call_required(
        &mut self,
        command: AdminCommand,
        data: &[u8],
        response_len: Option<usize>,
    ) -> DeviceResult<Vec<u8>> {
        self.call(command, data, response_len)?
            .ok_or_else(|| DeviceError::ctap(command.name(), CtapCode::INVALID_COMMAND))
    }

    /// Whether the device is locked.
    pub fn is_locked(&mut self) -> DeviceResult<bool> {
        let reply = self.call_required(AdminCommand::Locked, &[], Some(1))?;
        Ok(reply.first() == Some(&1))
    }

    /// Reboot the device.
    ///
    /// Rebooting into the bootloader requires a touch confirmation; if the
    /// user does not confirm in time, [`DeviceError::ConfirmationTimeout`] is
    /// returned. Transport errors caused by the device dropping off the bus
    /// are expected and ignored.
    pub fn reboot(&mut self, mode: BootMode) -> DeviceResult<bool> {
        let command = match mode {
            BootMode::Firmware => AdminCommand::Reboot,
            BootMode::Bootrom => AdminCommand::Update,
        };
        match self.call(command, &[], None) {
            Ok(_) => {}
            Err(e)
                if mode == BootMode::Bootrom && e.ctap_code() == Some(CtapCode::INVALID_LENGTH) =>
            {
                return Err(DeviceError::ConfirmationTimeout);
            }
            Err(e) if e.is_disconnect() => {
                debug!(error = %e, "Ignoring transport error after reboot");
            }
            Err(e) => return Err(e),
        }
        Ok(true)
    }

    /// Random bytes from the device RNG.
    pub fn rng(&mut self) -> DeviceResult<Vec<u8>> {
        self.call_required(AdminCommand::Rng, &[], Some(RNG_LEN))
    }

    /// Device status; empty if the firmware predates the status command.
    pub fn status(&mut self) -> DeviceResult<Status> {
        match self.call(AdminCommand::Status, &[], None)? {
            Some(reply) => Status::from_reply(&reply),
            None => Ok(Status::default()),
        }
    }

    /// Device UUID, or `None` on firmware that cannot report it.
    pub fn uuid(&mut self) -> DeviceResult<Option<Uuid>> {
        let reply = match self.call(AdminCommand::Uuid, &[], None)? {
            Some(reply) if !reply.is_empty() => reply,
            _ => return Ok(None),
        };
        let bytes: [u8; UUID_LEN] = reply.as_slice().try_into().ok().ok_or_else(|| {
            DeviceError::malformed(
                AdminCommand::Uuid.name(),
                format!("UUID response has invalid length {}", reply.len()),
            )
        })?;
        Ok(Some(Uuid::from_bytes(bytes)))
    }

    /// Firmware version.
    ///
    /// Devices answer either with the packed integer form (no pre-release
    /// information) or with the full version string.
    pub fn version(&mut self) -> DeviceResult<Version> {
        let command = AdminCommand::Version;
        let reply = self.call_required(command, &[0x01], None)?;
        if let Ok(packed) = <[u8; VERSION_LEN]>::try_from(reply.as_slice()) {
            return Ok(Version::from_packed(u32::from_be_bytes(packed)));
        }
        let s = core::str::from_utf8(&reply)
            .map_err(|e| DeviceError::malformed(command.name(), e.to_string()))?;
        s.parse::<Version>()
            .map_err(|e| DeviceError::malformed(command.name(), e.to_string()))
    }

    /// Run the SE050 self test; `None` if unsupported.
    pub fn se050_tests(&mut self) -> DeviceResult<Option<Vec<u8>>> {
        self.call(AdminCommand::TestSe050, &[], None)
    }

    /// Whether a configuration key can be read.
    pub fn has_config(&mut self, key: &str) -> DeviceResult<bool> {
        let reply = self.call(AdminCommand::GetConfig, key.as_bytes(), None)?;
        Ok(reply
            .as_deref()
            .and_then(|reply| reply.first())
            .and_then(|code| ConfigStatus::from_code(*code))
            == Some(ConfigStatus::Success))
    }

    /// Read a configuration value.
    pub fn get_config(&mut self, key: &str) -> AdminResult<String> {
        let reply = self
            .call(AdminCommand::GetConfig, key.as_bytes(), None)?
            .unwrap_or_default();
        let Some((code, value)) = reply.split_first() else {
            return Err(AdminError::EmptyResponse);
        };
        ConfigStatus::check(*code, "Failed to get config value")?;
        String::from_utf8(value.to_vec()).map_err(|e| {
            AdminError::Device(DeviceError::malformed(
                AdminCommand::GetConfig.name(),
                e.to_string(),
            ))
        })
    }

    /// Factory reset the device. Returns `false` if unsupported.
    pub fn factory_reset(&mut self) -> AdminResult<bool> {
        let reply = match self.call(AdminCommand::FactoryReset, &[], Some(1)) {
            Ok(reply) => reply,
            Err(e) if e.is_disconnect() => {
                debug!(error = %e, "Ignoring transport error after reboot");
                return Ok(true);
            }
            Err(e) => return Err(e.into()),
        };
        if let Some(code) = reply.as_deref().and_then(|reply| reply.first()) {
            check_factory_reset(*code, "Failed to factory reset the device")?;
        }
        Ok(reply.is_some())
    }

    /// Factory reset a single application. Returns `false` if unsupported.
    pub fn factory_reset_app(&mut self, application: &str) -> AdminResult<bool> {
        let reply = self.call(AdminCommand::FactoryResetApp, application.as_bytes(), Some(1))?;
        if let Some(code) = reply.as_deref().and_then(|reply| reply.first()) {
            check_factory_reset(*code, "Failed to factory reset the application")?;
        }
        Ok(reply.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_status_display() {
        assert_eq!(InitStatus::from_bits(0).to_string(), "ok");
        assert_eq!(
            InitStatus::from_bits(0x05).to_string(),
            "NFC_ERROR, EXTERNAL_FLASH_ERROR (0x5)"
        );
        assert_eq!(
            InitStatus::from_bits(0x88).to_string(),
            "MIGRATION_ERROR, EXT_FLASH_NEED_REFORMAT (0x88)"
        );
    }

    #[test]
    fn test_status_from_reply() -> Result<(), DeviceError> {
        let status = Status::from_reply(&[0x00, 0x0a, 0x01, 0x02, 0x02])?;
        assert_eq!(status.init_status, Some(InitStatus::from_bits(0)));
        assert_eq!(status.ifs_blocks, Some(10));
        assert_eq!(status.efs_blocks, Some(0x0102));
        assert_eq!(status.variant, Some(AdminVariant::Nrf52));

        let short = Status::from_reply(&[0x02])?;
        assert_eq!(short.init_status, Some(InitStatus::INTERNAL_FLASH_ERROR));
        assert_eq!(short.ifs_blocks, None);

        let unknown_variant = Status::from_reply(&[0x00, 1, 0, 0, 9])?;
        assert_eq!(unknown_variant.variant, None);
        assert_eq!(unknown_variant.ifs_blocks, Some(1));

        assert!(Status::from_reply(&[]).is_err());
        Ok(())
    }

    #[test]
    fn test_command_kinds() {
        assert!(AdminCommand::Update.is_legacy());
        assert!(AdminCommand::Locked.is_legacy());
        assert!(!AdminCommand::Status.is_legacy());
        assert_eq!(AdminCommand::Status.code(), 0x80);
    }

    #[test]
    fn test_config_status_check() {
        assert!(ConfigStatus::check(0, "ctx").is_ok());
        assert_eq!(
            ConfigStatus::check(5, "Failed to get config value"),
            Err(AdminError::Config {
                context: "Failed to get config value".to_string(),
                reason: "invalid key".to_string(),
            })
        );
        assert!(matches!(
            ConfigStatus::check(0x42, "ctx"),
            Err(AdminError::Config { reason, .. }) if reason == "unknown error 42"
        ));
    }
}
