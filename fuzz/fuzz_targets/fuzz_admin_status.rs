//! Fuzzes decoding of the admin app status reply.
//!
//! Must never panic.
//!
//! Run with:
//!   cargo +nightly fuzz run fuzz_admin_status
#![no_main]
use libfuzzer_sys::fuzz_target;
use nitrokey_device::Status;

fuzz_target!(|data: &[u8]| {
    if let Ok(status) = Status::from_reply(data) {
        if let Some(init) = status.init_status {
            let _ = init.to_string();
        }
    }
});
