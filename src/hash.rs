//! Digest type and the sorted-pair hashing rule shared with the ledger contract.

use crate::error::Error;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use sha3::digest::consts::U32;
use sha3::Digest;
use std::{fmt, ops::Deref, str::FromStr};

/// 32 byte output of the tree's hash function.
///
/// Ordering is byte-wise, which is the same as comparing the two values as
/// big-endian 256 bit integers (the contract's `bytes32 < bytes32`).
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MerkleHash(pub [u8; 32]);

/// Hash function used to build and verify a tree.
///
/// Implemented for every 32 byte RustCrypto hasher, so `Keccak256` (what the
/// ledger runs), `Sha3_256` and `Blake2s256` can all be plugged in.
pub trait DigestProvider {
    /// Hash an arbitrary byte string
    fn hash(data: &[u8]) -> MerkleHash;

    /// Combine two child digests into their parent.
    ///
    /// The smaller digest is always hashed first, so
    /// `hash_pair(a, b) == hash_pair(b, a)` and proofs need no direction bits.
    fn hash_pair(a: &MerkleHash, b: &MerkleHash) -> MerkleHash;
}

impl<D> DigestProvider for D
where
    D: Digest<OutputSize = U32>,
{
    fn hash(data: &[u8]) -> MerkleHash {
        let mut result = [0u8; 32];
        result.copy_from_slice(D::digest(data).as_slice());
        MerkleHash(result)
    }

    fn hash_pair(a: &MerkleHash, b: &MerkleHash) -> MerkleHash {
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        let mut hasher = D::new();
        let mut result = [0u8; 32];

        hasher.update(low.0);
        hasher.update(high.0);
        result.copy_from_slice(hasher.finalize().as_slice());
        MerkleHash(result)
    }
}

impl MerkleHash {
    /// Build a digest from a slice, which must be exactly 32 bytes long
    pub fn from_slice(bytes: &[u8]) -> Result<Self, Error> {
        let array: [u8; 32] = bytes.try_into().map_err(|_| {
            Error::MalformedDigest(format!("expected 32 bytes, got {}", bytes.len()))
        })?;
        Ok(Self(array))
    }

    /// `0x` prefixed lowercase hex, the form the ledger accepts
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

#[cfg(test)]
impl MerkleHash {
    /// Copy of this digest with a single bit flipped
    pub(crate) fn flip_bit(&self, bit: usize) -> Self {
        let mut bytes = self.0;
        bytes[(bit / 8) % 32] ^= 1 << (bit % 8);
        Self(bytes)
    }
}

impl Deref for MerkleHash {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<[u8]> for MerkleHash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; 32]> for MerkleHash {
    fn from(value: [u8; 32]) -> Self {
        Self(value)
    }
}

impl PartialEq<[u8; 32]> for MerkleHash {
    fn eq(&self, other: &[u8; 32]) -> bool {
        &self.0 == other
    }
}

impl fmt::Display for MerkleHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::LowerHex for MerkleHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if f.alternate() {
            f.write_str("0x")?;
        }
        f.write_str(&hex::encode(self.0))
    }
}

impl FromStr for MerkleHash {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .unwrap_or(s);
        if digits.len() != 64 {
            return Err(Error::MalformedDigest(format!(
                "expected 64 hex characters, got {}",
                digits.len()
            )));
        }
        let bytes = hex::decode(digits).map_err(|e| Error::MalformedDigest(e.to_string()))?;
        Self::from_slice(&bytes)
    }
}

impl Serialize for MerkleHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for MerkleHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(de::Error::custom)
    }
}
