//! Object and column names.
//!
//! SCQL names are opaque byte strings: the card never interprets them as
//! text. They are compared byte for byte and travel as `(length, bytes)`.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Deref;

/// A table, view or column name.
///
/// # Example
///
/// ```rust
/// use scql_common::types::ObjectName;
///
/// let name = ObjectName::from("users");
/// assert_eq!(name.len(), 5);
/// assert_eq!(name.as_bytes(), b"users");
/// ```
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectName(Bytes);

impl ObjectName {
    /// Creates a name from a byte slice.
    #[inline]
    #[must_use]
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self(Bytes::copy_from_slice(bytes))
    }

    /// Creates a name from a `Bytes` instance.
    #[inline]
    #[must_use]
    pub const fn from_raw(bytes: Bytes) -> Self {
        Self(bytes)
    }

    /// Returns the length of the name in bytes.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the name is empty.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the name as a byte slice.
    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Returns a reference to the underlying `Bytes`.
    #[inline]
    #[must_use]
    pub fn as_raw(&self) -> &Bytes {
        &self.0
    }
}

impl Deref for ObjectName {
    type Target = [u8];

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<[u8]> for ObjectName {
    #[inline]
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl PartialEq<[u8]> for ObjectName {
    fn eq(&self, other: &[u8]) -> bool {
        self.0.as_ref() == other
    }
}

impl PartialEq<&str> for ObjectName {
    fn eq(&self, other: &&str) -> bool {
        self.0.as_ref() == other.as_bytes()
    }
}

impl From<&str> for ObjectName {
    fn from(s: &str) -> Self {
        Self::from_bytes(s.as_bytes())
    }
}

impl From<&[u8]> for ObjectName {
    fn from(bytes: &[u8]) -> Self {
        Self::from_bytes(bytes)
    }
}

impl From<Vec<u8>> for ObjectName {
    fn from(bytes: Vec<u8>) -> Self {
        Self(Bytes::from(bytes))
    }
}

impl From<Bytes> for ObjectName {
    fn from(bytes: Bytes) -> Self {
        Self(bytes)
    }
}

impl fmt::Debug for ObjectName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match std::str::from_utf8(&self.0) {
            Ok(s) if s.chars().all(|c| !c.is_control()) => write!(f, "ObjectName({s:?})"),
            _ => write!(f, "ObjectName(0x{})", hex::encode(&self.0)),
        }
    }
}

impl fmt::Display for ObjectName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match std::str::from_utf8(&self.0) {
            Ok(s) if s.chars().all(|c| !c.is_control()) => write!(f, "'{s}'"),
            _ => write!(f, "0x{}", hex::encode(&self.0)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_equality_is_bytewise() {
        let a = ObjectName::from("abc");
        let b = ObjectName::from(b"abc".as_slice());
        let c = ObjectName::from("abd");

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a == "abc");
        assert!(a == *b"abc".as_slice());
    }

    #[test]
    fn test_name_display() {
        assert_eq!(ObjectName::from("T").to_string(), "'T'");
        assert_eq!(ObjectName::from(vec![0x00, 0xff]).to_string(), "0x00ff");
        assert_eq!(format!("{:?}", ObjectName::from("V")), "ObjectName(\"V\")");
    }
}
