//! Convenience re-exports for common error types.
//!
//! ```
//! use nitrokey_errors::prelude::*;
//!
//! fn probe() -> DeviceResult<()> {
//!     Err(DeviceError::not_found("Nitrokey 3"))
//! }
//!
//! assert!(probe().is_err());
//! ```

pub use crate::{
    DeviceResult,
    common::{ErrorCategory, ErrorSeverity},
    ctap::CtapCode,
    device::DeviceError,
};
