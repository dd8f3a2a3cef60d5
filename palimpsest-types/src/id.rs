//! 256-bit entity and command identifiers.

use std::fmt;
use std::str::FromStr;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::codec::{Decode, DecodeError, Encode, Reader, Writer};

/// Random 256-bit identifier. Primary key of every entity and command.
///
/// Ids are allocated without coordination, so two sessions (or two
/// machines) can create entities concurrently; the id space is large
/// enough that collisions are not a practical concern. Ids are compared
/// and ordered bytewise.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WideId([u8; 32]);

impl WideId {
    /// Encoded width in bytes.
    pub const LEN: usize = 32;

    pub const NIL: WideId = WideId([0; 32]);

    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn is_nil(&self) -> bool {
        self.0 == [0; 32]
    }

    /// First eight hex digits, for log lines and listings.
    pub fn short(&self) -> String {
        self.0[..4].iter().map(|b| format!("{:02x}", b)).collect()
    }
}

impl fmt::Display for WideId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in &self.0 {
            write!(f, "{:02x}", b)?;
        }
        Ok(())
    }
}

impl fmt::Debug for WideId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WideId({})", self.short())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("expected 64 hex digits")]
pub struct ParseWideIdError;

impl FromStr for WideId {
    type Err = ParseWideIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.as_bytes();
        if s.len() != 64 {
            return Err(ParseWideIdError);
        }
        let mut bytes = [0u8; 32];
        for (i, pair) in s.chunks(2).enumerate() {
            let hi = hex_digit(pair[0]).ok_or(ParseWideIdError)?;
            let lo = hex_digit(pair[1]).ok_or(ParseWideIdError)?;
            bytes[i] = (hi << 4) | lo;
        }
        Ok(Self(bytes))
    }
}

fn hex_digit(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

impl Serialize for WideId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for WideId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

impl Encode for WideId {
    fn encode(&self, w: &mut Writer) {
        w.id(self);
    }

    fn encoded_len(&self) -> usize {
        Self::LEN
    }
}

impl Decode for WideId {
    fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        r.id()
    }
}
