//! Command APDUs.
//!
//! A command APDU is a four byte header `CLA INS P1 P2`, an optional data
//! field announced by `Lc`, and an optional expected response length `Le`.
//! Both short (one byte) and extended (three byte) length encodings are
//! accepted:
//!
//! ```text
//! case 1    CLA INS P1 P2
//! case 2S   CLA INS P1 P2 Le
//! case 3S   CLA INS P1 P2 Lc data
//! case 4S   CLA INS P1 P2 Lc data Le
//! case 2E   CLA INS P1 P2 00 Le1 Le2
//! case 3E   CLA INS P1 P2 00 Lc1 Lc2 data
//! case 4E   CLA INS P1 P2 00 Lc1 Lc2 data Le1 Le2
//! ```

use bytes::{BufMut, Bytes, BytesMut};
use std::fmt;

use scql_common::error::{ScqlError, ScqlResult};

/// Header length of every command APDU.
pub const HEADER_LEN: usize = 4;

/// Largest data field a short APDU can carry.
pub const MAX_SHORT_LC: usize = 255;

/// A parsed command APDU.
#[derive(Clone, PartialEq, Eq)]
pub struct CommandApdu {
    /// Class byte.
    pub cla: u8,
    /// Instruction byte.
    pub ins: u8,
    /// First parameter.
    pub p1: u8,
    /// Second parameter.
    pub p2: u8,
    /// Data field.
    pub data: Bytes,
    /// Expected response length, if present.
    pub le: Option<usize>,
}

impl CommandApdu {
    /// Creates a command without `Le`.
    pub fn new(cla: u8, ins: u8, p1: u8, p2: u8, data: impl Into<Bytes>) -> Self {
        Self {
            cla,
            ins,
            p1,
            p2,
            data: data.into(),
            le: None,
        }
    }

    /// Sets the expected response length.
    #[must_use]
    pub fn with_le(mut self, le: usize) -> Self {
        self.le = Some(le);
        self
    }

    /// Returns true if the class byte is interindustry (bit 8 clear).
    #[inline]
    #[must_use]
    pub fn is_interindustry(&self) -> bool {
        self.cla & 0x80 == 0
    }

    /// Parses a command APDU.
    ///
    /// # Example
    ///
    /// ```rust
    /// use scql_apdu::CommandApdu;
    ///
    /// let apdu = CommandApdu::parse(&[0x00, 0x10, 0x00, 0x88]).unwrap();
    /// assert_eq!(apdu.p2, 0x88);
    /// assert!(apdu.data.is_empty());
    /// ```
    pub fn parse(bytes: &[u8]) -> ScqlResult<Self> {
        if bytes.len() < HEADER_LEN {
            return Err(ScqlError::WrongLength {
                expected: HEADER_LEN,
                actual: bytes.len(),
            });
        }

        let (header, body) = bytes.split_at(HEADER_LEN);
        let mut apdu = Self::new(header[0], header[1], header[2], header[3], Bytes::new());

        match body.len() {
            0 => {}
            1 => apdu.le = Some(short_le(body[0])),
            _ if body[0] != 0 => {
                let lc = usize::from(body[0]);
                let data = &body[1..];
                if data.len() == lc {
                    apdu.data = Bytes::copy_from_slice(data);
                } else if data.len() == lc + 1 {
                    apdu.data = Bytes::copy_from_slice(&data[..lc]);
                    apdu.le = Some(short_le(data[lc]));
                } else {
                    return Err(ScqlError::WrongLength {
                        expected: lc,
                        actual: data.len(),
                    });
                }
            }
            2 => {
                return Err(ScqlError::WrongLength {
                    expected: 3,
                    actual: body.len(),
                })
            }
            3 => apdu.le = Some(extended_le(body[1], body[2])),
            _ => {
                let lc = usize::from(u16::from_be_bytes([body[1], body[2]]));
                let data = &body[3..];
                if lc == 0 {
                    return Err(ScqlError::WrongLength {
                        expected: 0,
                        actual: data.len(),
                    });
                }
                if data.len() == lc {
                    apdu.data = Bytes::copy_from_slice(data);
                } else if data.len() == lc + 2 {
                    apdu.data = Bytes::copy_from_slice(&data[..lc]);
                    apdu.le = Some(extended_le(data[lc], data[lc + 1]));
                } else {
                    return Err(ScqlError::WrongLength {
                        expected: lc,
                        actual: data.len(),
                    });
                }
            }
        }

        Ok(apdu)
    }

    /// Parses a command APDU from hex text, ignoring whitespace.
    pub fn parse_hex(text: &str) -> ScqlResult<Self> {
        let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
        let bytes = hex::decode(&compact)
            .map_err(|e| ScqlError::wrong_data(format!("invalid hex APDU: {e}")))?;
        Self::parse(&bytes)
    }

    /// Encodes the command, choosing short or extended lengths as needed.
    #[must_use]
    pub fn to_bytes(&self) -> Bytes {
        let extended = self.data.len() > MAX_SHORT_LC || self.le.is_some_and(|le| le > 256);
        let mut buf = BytesMut::with_capacity(HEADER_LEN + 3 + self.data.len() + 2);
        buf.put_slice(&[self.cla, self.ins, self.p1, self.p2]);

        if extended {
            buf.put_u8(0);
            if !self.data.is_empty() {
                buf.put_u16(self.data.len() as u16);
                buf.put_slice(&self.data);
            }
            if let Some(le) = self.le {
                buf.put_u16(if le >= 65536 { 0 } else { le as u16 });
            }
        } else {
            if !self.data.is_empty() {
                buf.put_u8(self.data.len() as u8);
                buf.put_slice(&self.data);
            }
            if let Some(le) = self.le {
                buf.put_u8(if le >= 256 { 0 } else { le as u8 });
            }
        }

        buf.freeze()
    }
}

fn short_le(byte: u8) -> usize {
    if byte == 0 {
        256
    } else {
        usize::from(byte)
    }
}

fn extended_le(high: u8, low: u8) -> usize {
    match u16::from_be_bytes([high, low]) {
        0 => 65536,
        le => usize::from(le),
    }
}

impl fmt::Debug for CommandApdu {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandApdu")
            .field("cla", &format_args!("{:#04x}", self.cla))
            .field("ins", &format_args!("{:#04x}", self.ins))
            .field("p1", &format_args!("{:#04x}", self.p1))
            .field("p2", &format_args!("{:#04x}", self.p2))
            .field("data", &hex::encode(&self.data))
            .field("le", &self.le)
            .finish()
    }
}

impl fmt::Display for CommandApdu {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode_upper(self.to_bytes()))
    }
}
