// ABOUTME: Bounded C-octet string types for the bind PDU fields
// ABOUTME: Stores content inline with the SMPP maximum length enforced at construction

use std::fmt;
use std::str;
use std::str::FromStr;
use thiserror::Error;

/// A null-terminated string with at most `N - 1` bytes of content.
///
/// `N` is the SMPP field size including the terminating NUL, so
/// `FixedString<16>` holds a 15 byte system_id.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct FixedString<const N: usize> {
    data: [u8; N],
}

impl<const N: usize> FixedString<N> {
    /// Maximum content length, excluding the NUL terminator
    pub const MAX_LEN: usize = N - 1;

    /// Creates a new FixedString from a byte slice, padding with nulls
    pub fn new(s: &[u8]) -> Result<Self, FixedStringError> {
        if s.len() >= N {
            return Err(FixedStringError::TooLong {
                max_len: N - 1,
                actual_len: s.len(),
            });
        }
        if s.contains(&0) {
            return Err(FixedStringError::EmbeddedNul);
        }

        let mut data = [0u8; N];
        data[..s.len()].copy_from_slice(s);
        Ok(Self { data })
    }

    /// Returns the string content as a byte slice, excluding null padding
    pub fn as_str_bytes(&self) -> &[u8] {
        let len = self.data.iter().position(|&b| b == 0).unwrap_or(N);
        &self.data[..len]
    }

    /// Returns the string content as a str, excluding null padding
    pub fn as_str(&self) -> Result<&str, str::Utf8Error> {
        str::from_utf8(self.as_str_bytes())
    }

    pub fn len(&self) -> usize {
        self.as_str_bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bytes this field occupies on the wire, terminator included
    pub fn wire_len(&self) -> usize {
        self.len() + 1
    }
}

impl<const N: usize> fmt::Display for FixedString<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_str() {
            Ok(s) => write!(f, "{s}"),
            Err(_) => write!(f, "<invalid UTF-8>"),
        }
    }
}

impl<const N: usize> fmt::Debug for FixedString<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_str() {
            Ok(s) => write!(f, "FixedString<{N}>(\"{s}\")"),
            Err(_) => write!(f, "FixedString<{}>({:?})", N, self.as_str_bytes()),
        }
    }
}

impl<const N: usize> Default for FixedString<N> {
    fn default() -> Self {
        Self { data: [0u8; N] }
    }
}

impl<const N: usize> TryFrom<&str> for FixedString<N> {
    type Error = FixedStringError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl<const N: usize> TryFrom<String> for FixedString<N> {
    type Error = FixedStringError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl<const N: usize> FromStr for FixedString<N> {
    type Err = FixedStringError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.as_bytes())
    }
}

impl<const N: usize> AsRef<[u8]> for FixedString<N> {
    fn as_ref(&self) -> &[u8] {
        self.as_str_bytes()
    }
}

impl<const N: usize> PartialEq<str> for FixedString<N> {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == Ok(other)
    }
}

impl<const N: usize> PartialEq<&str> for FixedString<N> {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == Ok(*other)
    }
}

/// Errors that can occur when creating FixedString instances
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FixedStringError {
    #[error("String too long: {actual_len} bytes (max {max_len})")]
    TooLong { max_len: usize, actual_len: usize },

    #[error("String contains an embedded NUL byte")]
    EmbeddedNul,
}

pub type SystemId = FixedString<16>; // 15 chars + null terminator
pub type Password = FixedString<9>; // 8 chars + null terminator
pub type SystemType = FixedString<13>; // 12 chars + null terminator
pub type AddressRange = FixedString<41>; // 40 chars + null terminator
