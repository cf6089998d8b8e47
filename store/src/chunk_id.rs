use std::fmt;
use std::str::FromStr;

use anyhow::{bail, Error};
use serde::{de::Error as _, Deserialize, Deserializer, Serialize, Serializer};

/// Opaque, fixed-width content hash identifying a chunk.
///
/// Total-ordered so it can be used as a `BTreeMap`/`BTreeSet` key, and round-trips
/// through the lowercase hex string used in chunk file names and index files.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ChunkId([u8; 32]);

impl ChunkId {
    pub fn from_digest(digest: [u8; 32]) -> Self {
        ChunkId(digest)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for ChunkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for ChunkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ChunkId({})", self.to_hex())
    }
}

impl FromStr for ChunkId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        if s.len() != 64 {
            bail!("invalid chunk id '{s}': expected 64 hex characters, got {}", s.len());
        }
        let mut digest = [0u8; 32];
        hex::decode_to_slice(s, &mut digest)
            .map_err(|err| anyhow::format_err!("invalid chunk id '{s}': {err}"))?;
        Ok(ChunkId(digest))
    }
}

impl Serialize for ChunkId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ChunkId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn hex_roundtrip() {
        let digest = [7u8; 32];
        let id = ChunkId::from_digest(digest);
        let text = id.to_hex();
        let back: ChunkId = text.parse().unwrap();
        assert_eq!(id, back);
    }

    #[test]
    fn rejects_wrong_length() {
        assert!("abcd".parse::<ChunkId>().is_err());
    }

    #[test]
    fn orders_by_bytes() {
        let a = ChunkId::from_digest([0u8; 32]);
        let mut high = [0u8; 32];
        high[0] = 1;
        let b = ChunkId::from_digest(high);
        assert!(a < b);
    }
}
