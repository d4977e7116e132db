//! Device abstractions for Nitrokey Trussed devices
//!
//! A Trussed device shows up on the USB bus either running its firmware or
//! in bootloader mode. This crate models both states without depending on a
//! particular transport: the firmware side talks to the device through an
//! opaque [`Connection`], and bootloaders are reached through the
//! [`Bootloader`] trait.
//!
//! # Architecture
//!
//! - [`model`]: Device models, hardware variants and USB identifiers
//! - [`connection`]: The transport capability and the application identifiers
//! - [`admin`]: The admin application protocol (status, version, reboot, ...)
//! - [`device`]: Owned device handles that release their connection on drop
//! - [`error`]: Parse and admin-app errors
//!
//! # Example
//!
//! ```
//! use nitrokey_device::prelude::*;
//!
//! let (model, kind) = Model::from_vid_pid(0x20a0, 0x42e8).unwrap_or((Model::Nk3, DeviceKind::Device));
//! assert_eq!(model, Model::Nk3);
//! assert_eq!(kind, DeviceKind::Bootloader(Variant::Nrf52));
//! assert_eq!(model.bootloader_name(Variant::Nrf52), "Nitrokey 3 Bootloader (NRF52)");
//! ```

#![deny(unsafe_op_in_unsafe_fn, clippy::unwrap_used)]
#![warn(missing_docs, rust_2018_idioms)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod admin;
pub mod connection;
pub mod device;
pub mod error;
pub mod model;
pub mod prelude;

pub use admin::{AdminApp, AdminCommand, AdminVariant, BootMode, InitStatus, Status};
pub use connection::{App, Connection, check_response_len};
pub use device::{Bootloader, DeviceHandle, TrussedDevice, Uuid};
pub use error::{AdminError, ModelError};
pub use model::{DeviceKind, Model, VID_NITROKEY, Variant};
