//! Owned handles for devices in firmware and bootloader mode.

use core::fmt;

use nitrokey_errors::DeviceResult;
use nitrokey_version::Version;
use tracing::{debug, warn};

use crate::admin::{AdminApp, BootMode, Status};
use crate::connection::Connection;
use crate::model::{DeviceKind, Model, Variant};

/// 128-bit device identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Uuid(u128);

impl Uuid {
    /// Decode a big-endian UUID.
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Uuid(u128::from_be_bytes(bytes))
    }

    /// Numeric value.
    pub fn value(self) -> u128 {
        self.0
    }
}

impl From<u128> for Uuid {
    fn from(value: u128) -> Self {
        Uuid(value)
    }
}

impl fmt::Display for Uuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:032X}", self.0)
    }
}

/// A device running the Trussed firmware.
///
/// The connection is closed exactly once, either by [`TrussedDevice::close`]
/// or when the handle is dropped.
pub struct TrussedDevice {
    model: Model,
    connection: Box<dyn Connection>,
    closed: bool,
}

impl TrussedDevice {
    /// Wrap a connection, checking its USB identifiers if it reports them.
    pub fn new(model: Model, connection: Box<dyn Connection>) -> DeviceResult<Self> {
        if let Some((vid, pid)) = connection.vid_pid() {
            model.validate_vid_pid(DeviceKind::Device, vid, pid)?;
        }
        debug!(model = %model, path = ?connection.path(), "Opened device");
        Ok(Self {
            model,
            connection,
            closed: false,
        })
    }

    /// Device model.
    pub fn model(&self) -> Model {
        self.model
    }

    /// Display name.
    pub fn name(&self) -> &'static str {
        self.model.name()
    }

    /// Platform path of the device.
    pub fn path(&self) -> Option<&str> {
        self.connection.path()
    }

    /// Access the admin app.
    pub fn admin(&mut self) -> AdminApp<'_> {
        AdminApp::new(self.connection.as_mut())
    }

    /// Device UUID.
    pub fn uuid(&mut self) -> DeviceResult<Option<Uuid>> {
        self.admin().uuid()
    }

    /// Firmware version.
    pub fn version(&mut self) -> DeviceResult<Version> {
        self.admin().version()
    }

    /// Device status.
    pub fn status(&mut self) -> DeviceResult<Status> {
        self.admin().status()
    }

    /// Reboot the device.
    pub fn reboot(&mut self, mode: BootMode) -> DeviceResult<bool> {
        self.admin().reboot(mode)
    }

    /// Make the device blink.
    pub fn wink(&mut self) -> DeviceResult<()> {
        self.connection.wink()
    }

    /// Close the connection. Further calls are no-ops.
    pub fn close(&mut self) -> DeviceResult<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.connection.close()
    }
}

impl fmt::Debug for TrussedDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrussedDevice")
            .field("model", &self.model)
            .field("path", &self.connection.path())
            .field("closed", &self.closed)
            .finish()
    }
}

impl Drop for TrussedDevice {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!(error = %e, "Failed to close device connection");
        }
    }
}

/// A device in bootloader mode.
///
/// Implementations own their transport and release it in `close` and on drop.
pub trait Bootloader {
    /// Device model.
    fn model(&self) -> Model;

    /// Hardware variant the bootloader runs on.
    fn variant(&self) -> Variant;

    /// Platform path of the device.
    fn path(&self) -> Option<&str>;

    /// Display name.
    fn name(&self) -> String {
        self.model().bootloader_name(self.variant())
    }

    /// Device UUID, if the bootloader can report it.
    fn uuid(&mut self) -> DeviceResult<Option<Uuid>>;

    /// Flash a firmware image. `progress` receives `(written, total)`.
    fn update(&mut self, image: &[u8], progress: &mut dyn FnMut(u64, u64)) -> DeviceResult<()>;

    /// Leave the bootloader.
    fn reboot(&mut self) -> DeviceResult<bool>;

    /// Release the transport.
    fn close(&mut self) -> DeviceResult<()>;
}

/// A connected device in either operating mode.
pub enum DeviceHandle {
    /// Bootloader mode
    Bootloader(Box<dyn Bootloader>),
    /// Firmware mode
    Device(TrussedDevice),
}

impl DeviceHandle {
    /// Device model.
    pub fn model(&self) -> Model {
        match self {
            DeviceHandle::Bootloader(bootloader) => bootloader.model(),
            DeviceHandle::Device(device) => device.model(),
        }
    }

    /// Display name.
    pub fn name(&self) -> String {
        match self {
            DeviceHandle::Bootloader(bootloader) => bootloader.name(),
            DeviceHandle::Device(device) => device.name().to_string(),
        }
    }

    /// Operating mode.
    pub fn kind(&self) -> DeviceKind {
        match self {
            DeviceHandle::Bootloader(bootloader) => DeviceKind::Bootloader(bootloader.variant()),
            DeviceHandle::Device(_) => DeviceKind::Device,
        }
    }

    /// Device UUID.
    pub fn uuid(&mut self) -> DeviceResult<Option<Uuid>> {
        match self {
            DeviceHandle::Bootloader(bootloader) => bootloader.uuid(),
            DeviceHandle::Device(device) => device.uuid(),
        }
    }

    /// Release the connection.
    pub fn close(&mut self) -> DeviceResult<()> {
        match self {
            DeviceHandle::Bootloader(bootloader) => bootloader.close(),
            DeviceHandle::Device(device) => device.close(),
        }
    }
}

impl fmt::Debug for DeviceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceHandle::Bootloader(bootloader) => f
                .debug_tuple("Bootloader")
                .field(&bootloader.name())
                .finish(),
            DeviceHandle::Device(device) => f.debug_tuple("Device").field(device).finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uuid_display() {
        let uuid = Uuid::from_bytes([
            0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0a, 0x0b, 0x0c, 0x0d,
            0x0e, 0xff,
        ]);
        assert_eq!(uuid.to_string(), "000102030405060708090A0B0C0D0EFF");
        assert_eq!(Uuid::from(1u128).to_string(), format!("{:0>32}", "1"));
    }
}
