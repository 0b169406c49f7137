//! Response APDUs and status words.

use bytes::{BufMut, Bytes, BytesMut};
use std::fmt;

use scql_common::error::{ScqlError, ScqlResult};

/// An ISO7816 status word (`SW1 SW2`).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct StatusWord(u16);

impl StatusWord {
    /// Normal processing.
    pub const SUCCESS: Self = Self(0x9000);
    /// End of table reached.
    pub const END_OF_TABLE: Self = Self(0x6282);
    /// Wrong length.
    pub const WRONG_LENGTH: Self = Self(0x6700);
    /// Data invalid.
    pub const DATA_INVALID: Self = Self(0x6984);
    /// Conditions of use not satisfied.
    pub const CONDITIONS_NOT_SATISFIED: Self = Self(0x6985);
    /// Command not allowed.
    pub const COMMAND_NOT_ALLOWED: Self = Self(0x6986);
    /// Incorrect parameters in the data field.
    pub const WRONG_DATA: Self = Self(0x6A80);
    /// Function not supported.
    pub const FUNC_NOT_SUPPORTED: Self = Self(0x6A81);
    /// Not enough memory space.
    pub const FILE_FULL: Self = Self(0x6A84);
    /// Referenced data not found.
    pub const REFERENCED_OBJECT_NOT_FOUND: Self = Self(0x6A88);
    /// Object already exists.
    pub const OBJECT_EXISTS: Self = Self(0x6A89);
    /// Instruction not supported.
    pub const INS_NOT_SUPPORTED: Self = Self(0x6D00);
    /// Class not supported.
    pub const CLA_NOT_SUPPORTED: Self = Self(0x6E00);
    /// No precise diagnosis.
    pub const UNKNOWN: Self = Self(0x6F00);

    /// Creates a status word from its numeric value.
    #[inline]
    #[must_use]
    pub const fn new(value: u16) -> Self {
        Self(value)
    }

    /// Returns the numeric value.
    #[inline]
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self.0
    }

    /// Returns `SW1`.
    #[inline]
    #[must_use]
    pub const fn sw1(self) -> u8 {
        (self.0 >> 8) as u8
    }

    /// Returns `SW2`.
    #[inline]
    #[must_use]
    pub const fn sw2(self) -> u8 {
        self.0 as u8
    }

    /// Returns true for `9000`.
    #[inline]
    #[must_use]
    pub const fn is_success(self) -> bool {
        self.0 == Self::SUCCESS.0
    }

    /// Returns a short description.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self.0 {
            0x9000 => "success",
            0x6282 => "end of table",
            0x6700 => "wrong length",
            0x6984 => "data invalid",
            0x6985 => "conditions of use not satisfied",
            0x6986 => "command not allowed",
            0x6A80 => "wrong data",
            0x6A81 => "function not supported",
            0x6A84 => "not enough memory space",
            0x6A88 => "referenced data not found",
            0x6A89 => "object already exists",
            0x6D00 => "instruction not supported",
            0x6E00 => "class not supported",
            _ => "unknown status",
        }
    }
}

impl From<&ScqlError> for StatusWord {
    fn from(err: &ScqlError) -> Self {
        Self(err.status_word())
    }
}

impl fmt::Debug for StatusWord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StatusWord({:04X})", self.0)
    }
}

impl fmt::Display for StatusWord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04X}", self.0)
    }
}

/// A response APDU: optional data followed by a status word.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseApdu {
    /// Response data.
    pub data: Bytes,
    /// Status word.
    pub status: StatusWord,
}

impl ResponseApdu {
    /// A `9000` response without data.
    #[must_use]
    pub fn success() -> Self {
        Self::with_data(Bytes::new())
    }

    /// A `9000` response carrying `data`.
    #[must_use]
    pub fn with_data(data: impl Into<Bytes>) -> Self {
        Self {
            data: data.into(),
            status: StatusWord::SUCCESS,
        }
    }

    /// A data-less response with the given status.
    #[must_use]
    pub fn status(status: StatusWord) -> Self {
        Self {
            data: Bytes::new(),
            status,
        }
    }

    /// The response for a failed command.
    #[must_use]
    pub fn from_error(err: &ScqlError) -> Self {
        Self::status(StatusWord::from(err))
    }

    /// Returns true if the status is `9000`.
    #[inline]
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Encodes the response as `data || SW1 SW2`.
    #[must_use]
    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.data.len() + 2);
        buf.put_slice(&self.data);
        buf.put_u16(self.status.as_u16());
        buf.freeze()
    }

    /// Parses `data || SW1 SW2`.
    pub fn parse(bytes: &[u8]) -> ScqlResult<Self> {
        if bytes.len() < 2 {
            return Err(ScqlError::WrongLength {
                expected: 2,
                actual: bytes.len(),
            });
        }
        let (data, sw) = bytes.split_at(bytes.len() - 2);
        Ok(Self {
            data: Bytes::copy_from_slice(data),
            status: StatusWord::new(u16::from_be_bytes([sw[0], sw[1]])),
        })
    }
}

impl fmt::Display for ResponseApdu {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.data.is_empty() {
            write!(f, "{}", self.status)
        } else {
            write!(f, "{} {}", hex::encode_upper(&self.data), self.status)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_word_parts() {
        let sw = StatusWord::REFERENCED_OBJECT_NOT_FOUND;
        assert_eq!(sw.sw1(), 0x6A);
        assert_eq!(sw.sw2(), 0x88);
        assert_eq!(sw.to_string(), "6A88");
        assert!(!sw.is_success());
        assert!(StatusWord::SUCCESS.is_success());
    }

    #[test]
    fn test_error_response() {
        let response = ResponseApdu::from_error(&ScqlError::EndOfTable);
        assert_eq!(response.status, StatusWord::END_OF_TABLE);
        assert_eq!(&response.to_bytes()[..], &[0x62, 0x82]);
    }

    #[test]
    fn test_data_response() {
        let response = ResponseApdu::with_data(vec![0x01, 0x01, b'x']);
        assert_eq!(&response.to_bytes()[..], &[0x01, 0x01, b'x', 0x90, 0x00]);
        assert_eq!(ResponseApdu::parse(&response.to_bytes()).unwrap(), response);
        assert_eq!(response.to_string(), "010178 9000");
        assert!(ResponseApdu::parse(&[0x90]).is_err());
    }
}
