//! The transport capability used to talk to a device running its firmware.
//!
//! Transports (CTAPHID over HID, APDUs over CCID) live outside this crate.
//! Whatever the transport, it reports failures as [`DeviceError`] and folds
//! its own timeouts into [`DeviceError::Timeout`].

use core::fmt;

use nitrokey_errors::{DeviceError, DeviceResult};

/// A Trussed application reachable through a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum App {
    /// Secrets (OTP and password safe)
    Secrets,
    /// Provisioner, only present on provisioning firmware
    Provisioner,
    /// Admin app
    Admin,
}

impl App {
    /// Vendor command byte used to address the app over CTAPHID.
    pub fn command(self) -> u8 {
        match self {
            App::Secrets => 0x70,
            App::Provisioner => 0x71,
            App::Admin => 0x72,
        }
    }

    /// Application identifier used to select the app over CCID.
    pub fn aid(self) -> &'static [u8] {
        match self {
            App::Secrets => &[0xA0, 0x00, 0x00, 0x05, 0x27, 0x21, 0x01],
            App::Provisioner | App::Admin => &[0xA0, 0x00, 0x00, 0x08, 0x47, 0x00, 0x00, 0x00, 0x01],
        }
    }
}

impl fmt::Display for App {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            App::Secrets => f.write_str("SECRETS"),
            App::Provisioner => f.write_str("PROVISIONER"),
            App::Admin => f.write_str("ADMIN"),
        }
    }
}

/// An open connection to a device running the Trussed firmware.
pub trait Connection {
    /// Platform path of the device, if the transport has one.
    fn path(&self) -> Option<&str>;

    /// USB vendor and product ID, if the transport exposes them.
    fn vid_pid(&self) -> Option<(u16, u16)>;

    /// Release the underlying transport handle.
    fn close(&mut self) -> DeviceResult<()>;

    /// Make the device blink.
    fn wink(&mut self) -> DeviceResult<()>;

    /// Send a legacy admin command directly as a vendor command.
    ///
    /// `name` is only used for error messages.
    fn call_admin_app_legacy(
        &mut self,
        command: u8,
        name: &str,
        data: &[u8],
        response_len: Option<usize>,
    ) -> DeviceResult<Vec<u8>>;

    /// Send a request to an application.
    fn call_app(&mut self, app: App, data: &[u8], response_len: Option<usize>)
    -> DeviceResult<Vec<u8>>;
}

impl<C: Connection + ?Sized> Connection for Box<C> {
    fn path(&self) -> Option<&str> {
        (**self).path()
    }

    fn vid_pid(&self) -> Option<(u16, u16)> {
        (**self).vid_pid()
    }

    fn close(&mut self) -> DeviceResult<()> {
        (**self).close()
    }

    fn wink(&mut self) -> DeviceResult<()> {
        (**self).wink()
    }

    fn call_admin_app_legacy(
        &mut self,
        command: u8,
        name: &str,
        data: &[u8],
        response_len: Option<usize>,
    ) -> DeviceResult<Vec<u8>> {
        (**self).call_admin_app_legacy(command, name, data, response_len)
    }

    fn call_app(
        &mut self,
        app: App,
        data: &[u8],
        response_len: Option<usize>,
    ) -> DeviceResult<Vec<u8>> {
        (**self).call_app(app, data, response_len)
    }
}

/// Check a response against an expected length.
///
/// Transports call this after receiving a reply so that every implementation
/// reports length mismatches the same way.
pub fn check_response_len(command: &str, response: &[u8], expected: Option<usize>) -> DeviceResult<()> {
    match expected {
        Some(expected) if response.len() != expected => {
            Err(DeviceError::invalid_response(command, expected, response.len()))
        }
        _ => Ok(()),
    }
}
