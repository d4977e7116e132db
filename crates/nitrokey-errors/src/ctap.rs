//! CTAP status codes.
//!
//! The Trussed firmware answers vendor commands with a CTAP status byte. Only
//! a handful of codes carry meaning for the admin protocol, but the full byte
//! is preserved so unknown codes survive into error messages.

use core::fmt;

/// A CTAP status code returned by the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CtapCode(pub u8);

impl CtapCode {
    /// The command is not supported by the firmware.
    pub const INVALID_COMMAND: CtapCode = CtapCode(0x01);
    /// Invalid parameter in the request.
    pub const INVALID_PARAMETER: CtapCode = CtapCode(0x02);
    /// Invalid message length; returned when a touch confirmation times out.
    pub const INVALID_LENGTH: CtapCode = CtapCode(0x03);
    /// Invalid message sequencing.
    pub const INVALID_SEQ: CtapCode = CtapCode(0x04);
    /// The transaction timed out.
    pub const TIMEOUT: CtapCode = CtapCode(0x05);
    /// The channel is busy.
    pub const CHANNEL_BUSY: CtapCode = CtapCode(0x06);
    /// Operation denied by the user.
    pub const OPERATION_DENIED: CtapCode = CtapCode(0x27);
    /// The user did not confirm in time.
    pub const USER_ACTION_TIMEOUT: CtapCode = CtapCode(0x2F);
    /// Unspecified error.
    pub const OTHER: CtapCode = CtapCode(0x7F);

    /// Symbolic name of the code, if known.
    pub fn name(self) -> Option<&'static str> {
        Some(match self {
            CtapCode::INVALID_COMMAND => "INVALID_COMMAND",
            CtapCode::INVALID_PARAMETER => "INVALID_PARAMETER",
            CtapCode::INVALID_LENGTH => "INVALID_LENGTH",
            CtapCode::INVALID_SEQ => "INVALID_SEQ",
            CtapCode::TIMEOUT => "TIMEOUT",
            CtapCode::CHANNEL_BUSY => "CHANNEL_BUSY",
            CtapCode::OPERATION_DENIED => "OPERATION_DENIED",
            CtapCode::USER_ACTION_TIMEOUT => "USER_ACTION_TIMEOUT",
            CtapCode::OTHER => "OTHER",
            _ => return None,
        })
    }
}

impl From<u8> for CtapCode {
    fn from(code: u8) -> Self {
        CtapCode(code)
    }
}

impl fmt::Display for CtapCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{name} ({:#04x})", self.0),
            None => write!(f, "{:#04x}", self.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_code_display() {
        assert_eq!(CtapCode::INVALID_LENGTH.to_string(), "INVALID_LENGTH (0x03)");
    }

    #[test]
    fn test_unknown_code_display() {
        assert_eq!(CtapCode(0xF2).to_string(), "0xf2");
        assert_eq!(CtapCode(0xF2).name(), None);
    }
}
