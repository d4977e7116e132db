//! Unwrap helpers with good error messages.
//!
//! Test code in this workspace never calls `unwrap()` or `expect()`. These
//! helpers panic with the offending value and, through `#[track_caller]`,
//! report the line of the failing test instead of a line in this file.
//!
//! - `must` / `must_with` for a `Result` that has to be `Ok`
//! - `must_some` for an `Option` that has to be `Some`
//! - `must_parse` for fixture strings such as versions and tags
//! - `must_err` when the test inspects the failure itself

use std::fmt::Debug;
use std::str::FromStr;

/// Return the `Ok` value or panic with the error.
///
/// ```rust
/// use nitrokey_test_helpers::must;
///
/// let retries: Result<usize, String> = Ok(3);
/// assert_eq!(must(retries), 3);
/// ```
///
/// # Panics
///
/// Panics if the result is `Err`.
#[track_caller]
pub fn must<T, E: Debug>(result: Result<T, E>) -> T {
    result.unwrap_or_else(|e| panic!("must: unexpected Err: {e:?}"))
}

/// Like [`must`], with a description of what was attempted.
///
/// # Panics
///
/// Panics if the result is `Err`.
#[track_caller]
pub fn must_with<T, E: Debug>(result: Result<T, E>, context: &str) -> T {
    result.unwrap_or_else(|e| panic!("must_with: {context}: {e:?}"))
}

/// Return the `Some` value or panic with `msg`.
///
/// ```rust
/// use nitrokey_test_helpers::must_some;
///
/// let assets = ["firmware-nk3-v1.8.2.zip"];
/// assert_eq!(must_some(assets.first(), "asset"), &"firmware-nk3-v1.8.2.zip");
/// ```
///
/// # Panics
///
/// Panics if the option is `None`.
#[track_caller]
pub fn must_some<T>(option: Option<T>, msg: &str) -> T {
    option.unwrap_or_else(|| panic!("must_some: {msg}"))
}

/// Parse a fixture string.
///
/// ```rust
/// use nitrokey_test_helpers::must_parse;
///
/// let blocks: u16 = must_parse("20");
/// assert_eq!(blocks, 20);
/// ```
///
/// # Panics
///
/// Panics if `s` does not parse.
#[track_caller]
pub fn must_parse<T: FromStr>(s: &str) -> T
where
    T::Err: Debug,
{
    s.parse()
        .unwrap_or_else(|e| panic!("must_parse: failed to parse {s:?}: {e:?}"))
}

/// Return the error of a `Result` that has to fail.
///
/// ```rust
/// use nitrokey_test_helpers::must_err;
///
/// let result: Result<(), &str> = Err("checksum mismatch");
/// assert_eq!(must_err(result), "checksum mismatch");
/// ```
///
/// # Panics
///
/// Panics if the result is `Ok`.
#[track_caller]
pub fn must_err<T: Debug, E>(result: Result<T, E>) -> E {
    match result {
        Ok(v) => panic!("must_err: unexpected Ok: {v:?}"),
        Err(e) => e,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn returns_values() {
        assert_eq!(must(Ok::<_, ()>(60)), 60);
        assert_eq!(must_with(Ok::<_, ()>(500), "retries"), 500);
        assert_eq!(must_some(Some("lpc55"), "variant"), "lpc55");
        assert_eq!(must_parse::<u32>("0x42".trim_start_matches("0x")), 42);
        assert_eq!(must_err(Err::<(), _>("unsigned")), "unsigned");
    }

    #[test]
    #[should_panic(expected = "must: unexpected Err: \"no bootloader\"")]
    fn must_reports_error() {
        must(Err::<(), _>("no bootloader"));
    }

    #[test]
    #[should_panic(expected = "must_with: open container: \"truncated\"")]
    fn must_with_reports_context() {
        must_with(Err::<(), _>("truncated"), "open container");
    }

    #[test]
    #[should_panic(expected = "must_some: image for nrf52")]
    fn must_some_reports_message() {
        must_some(None::<u8>, "image for nrf52");
    }

    #[test]
    #[should_panic(expected = "must_parse: failed to parse \"v1\"")]
    fn must_parse_reports_input() {
        let _: u32 = must_parse("v1");
    }

    #[test]
    #[should_panic(expected = "must_err: unexpected Ok: 3")]
    fn must_err_reports_value() {
        must_err(Ok::<_, ()>(3));
    }
}
