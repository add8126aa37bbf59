//! Canonical record encoding and leaf hashing

use crate::{
    error::Error,
    hash::{DigestProvider, MerkleHash},
};
use serde::Serialize;
use serde_json::{Map, Value};

/// A record that can be turned into a stable byte string before hashing.
///
/// The same logical record must always produce the same bytes. For the
/// serde-backed implementations that means field order follows the struct
/// declaration and no whitespace is emitted.
pub trait Canonical {
    fn canonical_bytes(&self) -> Result<Vec<u8>, Error>;
}

/// Compact JSON encoding of any serializable value
pub fn json_canonical_bytes<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, Error> {
    serde_json::to_vec(value).map_err(|e| Error::Encoding(e.to_string()))
}

impl Canonical for str {
    fn canonical_bytes(&self) -> Result<Vec<u8>, Error> {
        json_canonical_bytes(self)
    }
}

impl Canonical for String {
    fn canonical_bytes(&self) -> Result<Vec<u8>, Error> {
        json_canonical_bytes(self)
    }
}

/// Copy of `value` with the keys of every object, nested ones included, in
/// sorted order. Arrays keep their order.
///
/// `serde_json/preserve_order` may be switched on anywhere in the build, so
/// the map type's own ordering is never relied upon.
pub fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|(a, _), (b, _)| a.cmp(b));
            let mut sorted = Map::new();
            for (key, nested) in entries {
                sorted.insert(key.clone(), canonicalize(nested));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        _ => value.clone(),
    }
}

impl Canonical for Value {
    fn canonical_bytes(&self) -> Result<Vec<u8>, Error> {
        json_canonical_bytes(&canonicalize(self))
    }
}

impl<T: Canonical + ?Sized> Canonical for &T {
    fn canonical_bytes(&self) -> Result<Vec<u8>, Error> {
        (**self).canonical_bytes()
    }
}

/// Hash the canonical encoding of a record into a leaf digest
pub fn leaf_digest<HF: DigestProvider, R: Canonical + ?Sized>(
    record: &R,
) -> Result<MerkleHash, Error> {
    Ok(HF::hash(&record.canonical_bytes()?))
}

/// Leaf digests for a record set, in the order given
pub fn leaf_digests<HF: DigestProvider, R: Canonical>(
    records: &[R],
) -> Result<Vec<MerkleHash>, Error> {
    records.iter().map(leaf_digest::<HF, R>).collect()
}
