//! Hex string serialisation of byte blobs.

use serde::{de::Error, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::{Debug, Display, Formatter};

/// Byte blob written as a `0x` prefixed hex string.
#[derive(Default, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct HexBytes(pub Vec<u8>);

impl HexBytes {
    /// get hex representation of the bytes
    pub fn hex(&self) -> String {
        hex::encode(&self.0)
    }
}

impl Debug for HexBytes {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{}", self.hex())
    }
}

impl Display for HexBytes {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{}", self.hex())
    }
}

impl AsRef<[u8]> for HexBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for HexBytes {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl TryFrom<&str> for HexBytes {
    type Error = hex::FromHexError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let value = value.strip_prefix("0x").unwrap_or(value);
        Ok(Self(hex::decode(value)?))
    }
}

impl Serialize for HexBytes {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for HexBytes {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::try_from(s.as_str()).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_string() {
        let bytes = HexBytes(vec![0xf8, 0x51, 0x00]);
        let json = serde_json::to_string(&bytes).unwrap();
        assert_eq!(json, "\"0xf85100\"");
        assert_eq!(serde_json::from_str::<HexBytes>(&json).unwrap(), bytes);
        assert_eq!(HexBytes::try_from("f851").unwrap().0, vec![0xf8, 0x51]);
    }

    #[test]
    fn rejects_bad_hex() {
        assert!(HexBytes::try_from("0xf85").is_err());
        assert!(serde_json::from_str::<HexBytes>("\"0xzz\"").is_err());
    }
}
