//! Convenience re-exports for device handling.

pub use crate::{
    admin::{AdminApp, AdminCommand, AdminVariant, BootMode, ConfigStatus, InitStatus, Status},
    connection::{App, Connection},
    device::{Bootloader, DeviceHandle, TrussedDevice, Uuid},
    error::{AdminError, AdminResult, ModelError},
    model::{DeviceKind, Model, VID_NITROKEY, Variant},
};
pub use nitrokey_errors::{CtapCode, DeviceError, DeviceResult};
pub use nitrokey_version::Version;
