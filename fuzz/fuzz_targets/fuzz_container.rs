//! Fuzzes firmware container parsing.
//!
//! Arbitrary bytes are parsed as a container for both models.
//! Must never panic.
//!
//! Run with:
//!   cargo +nightly fuzz run fuzz_container
#![no_main]
use libfuzzer_sys::fuzz_target;
use nitrokey_device::Model;
use nitrokey_firmware_update::FirmwareContainer;

fuzz_target!(|data: &[u8]| {
    for model in [Model::Nk3, Model::Nkpk] {
        let _ = FirmwareContainer::from_bytes(data, model);
    }
});
