//! Fuzzes version parsing and comparison.
//!
//! Must never panic, and a parsed version must survive its display form.
//!
//! Run with:
//!   cargo +nightly fuzz run fuzz_version
#![no_main]
use libfuzzer_sys::fuzz_target;
use nitrokey_version::Version;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let parsed = text.parse::<Version>();
    let prefixed = Version::from_v_str(text);

    if let Ok(version) = &parsed {
        let shown = version.to_string();
        assert_eq!(Version::from_v_str(&shown).as_ref(), Ok(version));
    }
    if let (Ok(a), Ok(b)) = (&parsed, &prefixed) {
        let _ = a.partial_cmp(b);
        let _ = a.core() == b.core();
    }

    if let Some(bytes) = data.get(..4) {
        let packed = u32::from_be_bytes(bytes.try_into().unwrap());
        let _ = Version::from_packed(packed).to_string();
    }
});
