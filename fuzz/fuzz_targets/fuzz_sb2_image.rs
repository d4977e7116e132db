//! Fuzzes the SB2.1 image parser.
//!
//! Covers the header, the certificate block and the signature checks.
//! Must never panic.
//!
//! Run with:
//!   cargo +nightly fuzz run fuzz_sb2_image
#![no_main]
use libfuzzer_sys::fuzz_target;
use nitrokey_firmware_update::image::lpc55;

fuzz_target!(|data: &[u8]| {
    let _ = lpc55::parse(data, None);
});
