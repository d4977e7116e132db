//! Fuzzes the Nordic DFU package parser.
//!
//! Runs with the production key sets so signed inputs reach the ECDSA path.
//! Must never panic.
//!
//! Run with:
//!   cargo +nightly fuzz run fuzz_nrf52_package
#![no_main]
use libfuzzer_sys::fuzz_target;
use nitrokey_device::{Model, Variant};
use nitrokey_firmware_update::parse_firmware_image;

fuzz_target!(|data: &[u8]| {
    let _ = parse_firmware_image(Variant::Nrf52, data, Model::Nk3);
});
