use crate::error::Error;
use serde::{
    Deserialize,
    Deserializer,
    Serialize,
    Serializer,
};
use std::{
    fmt,
    str::FromStr,
};

pub const ADDRESS_LENGTH: usize = 32;

/// 32-byte Sui account or object address.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SuiAddress([u8; ADDRESS_LENGTH]);

impl SuiAddress {
    /// The shared `Clock` object every time-aware entry point takes.
    pub const CLOCK: SuiAddress = SuiAddress::from_low_byte(0x6);

    pub const fn new(bytes: [u8; ADDRESS_LENGTH]) -> Self {
        Self(bytes)
    }

    const fn from_low_byte(byte: u8) -> Self {
        let mut bytes = [0u8; ADDRESS_LENGTH];
        bytes[ADDRESS_LENGTH - 1] = byte;
        Self(bytes)
    }

    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        let bytes: [u8; ADDRESS_LENGTH] = bytes.try_into().ok()?;
        Some(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; ADDRESS_LENGTH] {
        &self.0
    }
}

impl FromStr for SuiAddress {
    type Err = Error;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let trimmed = raw.trim();
        let digits = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);
        if digits.is_empty() || digits.len() > ADDRESS_LENGTH * 2 {
            return Err(Error::InvalidAddress(raw.to_string()));
        }
        // short forms such as `0x6` are left-padded
        let padded = format!("{digits:0>64}");
        let bytes =
            hex::decode(padded).map_err(|_| Error::InvalidAddress(raw.to_string()))?;
        Self::from_slice(&bytes).ok_or_else(|| Error::InvalidAddress(raw.to_string()))
    }
}

impl fmt::Display for SuiAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl Serialize for SuiAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for SuiAddress {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
