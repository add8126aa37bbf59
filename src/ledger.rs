//! Ledger collaborator: where roots are published and proofs are checked remotely.
//!
//! Transport, signing and confirmation live behind the [`Ledger`] trait.
//! [`InMemoryLedger`] is a reference implementation that behaves like the
//! registry contract: one root per collection, proofs folded with sorted-pair
//! Keccak-256.

use crate::{
    error::Error,
    hash::{DigestProvider, MerkleHash},
};
use log::{debug, info};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};
use std::{
    collections::HashMap,
    fmt,
    sync::atomic::{AtomicU64, Ordering},
};

/// 32 byte identifier of a committed collection (a project).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CollectionId(pub MerkleHash);

impl CollectionId {
    /// Keccak-256 of the UTF-8 name, the same id `ethers.id(name)` yields
    pub fn from_name(name: &str) -> Self {
        Self(Keccak256::hash(name.as_bytes()))
    }
}

impl fmt::Display for CollectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Receipt of a confirmed root publication
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxReceipt {
    pub tx_hash: MerkleHash,
    pub collection: CollectionId,
    pub root: MerkleHash,
}

pub trait Ledger: Send + Sync {
    /// Store `root` as the commitment of `collection`, replacing any earlier root
    fn publish_root(&self, collection: &CollectionId, root: MerkleHash)
        -> Result<TxReceipt, Error>;

    /// Ask the ledger to check `leaf` against its stored root using `proof`.
    ///
    /// Digests cross this boundary as `0x` hex strings.
    fn remote_verify(
        &self,
        collection: &CollectionId,
        proof: &[String],
        leaf: &str,
    ) -> Result<bool, Error>;

    /// Root currently stored for `collection`
    fn root_of(&self, collection: &CollectionId) -> Result<Option<MerkleHash>, Error>;
}

/// Connection settings for a ledger backend
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct LedgerConfig {
    /// JSON-RPC endpoint for network-backed [`Ledger`] implementations.
    /// [`InMemoryLedger`] only validates it.
    #[serde(default = "LedgerConfig::default_rpc_url")]
    pub rpc_url: String,
    /// `0x` followed by 40 hex characters
    pub contract_address: String,
    /// Verify locally against the stored root before calling the ledger
    #[serde(default = "LedgerConfig::default_local_precheck")]
    pub local_precheck: bool,
}

impl LedgerConfig {
    pub fn new(contract_address: impl Into<String>) -> Self {
        Self {
            rpc_url: Self::default_rpc_url(),
            contract_address: contract_address.into(),
            local_precheck: Self::default_local_precheck(),
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self, Error> {
        let config: Self = serde_json::from_str(json).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), Error> {
        let valid_scheme = ["http://", "https://", "ws://", "wss://"]
            .iter()
            .any(|scheme| self.rpc_url.starts_with(scheme));
        if !valid_scheme {
            return Err(Error::Config(format!(
                "unsupported rpc url: {}",
                self.rpc_url
            )));
        }
        let address = self
            .contract_address
            .strip_prefix("0x")
            .ok_or_else(|| Error::Config("contract address must start with 0x".to_string()))?;
        if address.len() != 40 || hex::decode(address).is_err() {
            return Err(Error::Config(format!(
                "contract address must be 20 hex encoded bytes: {}",
                self.contract_address
            )));
        }
        Ok(())
    }

    fn default_rpc_url() -> String {
        "http://127.0.0.1:8545".to_string()
    }

    fn default_local_precheck() -> bool {
        true
    }
}

/// Process-local ledger with the registry contract's semantics
pub struct InMemoryLedger {
    contract_address: String,
    roots: RwLock<HashMap<CollectionId, MerkleHash>>,
    nonce: AtomicU64,
}

impl InMemoryLedger {
    pub fn new(config: &LedgerConfig) -> Result<Self, Error> {
        config.validate()?;
        Ok(Self {
            contract_address: config.contract_address.to_lowercase(),
            roots: RwLock::new(HashMap::new()),
            nonce: AtomicU64::new(0),
        })
    }

    pub fn num_collections(&self) -> usize {
        self.roots.read().len()
    }
}

impl Ledger for InMemoryLedger {
    fn publish_root(
        &self,
        collection: &CollectionId,
        root: MerkleHash,
    ) -> Result<TxReceipt, Error> {
        let nonce = self.nonce.fetch_add(1, Ordering::SeqCst);
        let mut hasher = Keccak256::new();
        hasher.update(self.contract_address.as_bytes());
        hasher.update(collection.0 .0);
        hasher.update(root.0);
        hasher.update(nonce.to_be_bytes());
        let tx_hash = MerkleHash::from_slice(hasher.finalize().as_slice())?;

        self.roots.write().insert(*collection, root);
        info!("stored root {} for collection {} in tx {}", root, collection, tx_hash);
        Ok(TxReceipt {
            tx_hash,
            collection: *collection,
            root,
        })
    }

    fn remote_verify(
        &self,
        collection: &CollectionId,
        proof: &[String],
        leaf: &str,
    ) -> Result<bool, Error> {
        let leaf = decode_bytes32(leaf)?;
        let proof = proof
            .iter()
            .map(|sibling| decode_bytes32(sibling))
            .collect::<Result<Vec<_>, Error>>()?;
        let root = self
            .roots
            .read()
            .get(collection)
            .copied()
            .ok_or_else(|| Error::UnknownCollection(collection.to_string()))?;

        let computed = proof.iter().fold(leaf, |node, sibling| hash_sorted(&node, sibling));
        let valid = computed == root.0;
        debug!("ledger check for collection {}: {}", collection, valid);
        Ok(valid)
    }

    fn root_of(&self, collection: &CollectionId) -> Result<Option<MerkleHash>, Error> {
        Ok(self.roots.read().get(collection).copied())
    }
}

fn decode_bytes32(text: &str) -> Result<[u8; 32], Error> {
    let digits = text
        .strip_prefix("0x")
        .ok_or_else(|| Error::MalformedDigest(format!("missing 0x prefix: {text}")))?;
    let mut out = [0u8; 32];
    hex::decode_to_slice(digits, &mut out).map_err(|e| Error::MalformedDigest(e.to_string()))?;
    Ok(out)
}

// Contract side pair hash: keccak256(a < b ? a ++ b : b ++ a)
fn hash_sorted(a: &[u8; 32], b: &[u8; 32]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    if a < b {
        hasher.update(a);
        hasher.update(b);
    } else {
        hasher.update(b);
        hasher.update(a);
    }
    let mut out = [0u8; 32];
    out.copy_from_slice(hasher.finalize().as_slice());
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{proof, MerkleTree};

    const ADDRESS: &str = "0x5FbDB2315678afecb367f032d93F642f64180aa3";

    fn ledger() -> InMemoryLedger {
        InMemoryLedger::new(&LedgerConfig::new(ADDRESS)).unwrap()
    }

    #[test]
    fn test_collection_id_is_keccak_of_name() {
        let id = CollectionId::from_name("");
        assert_eq!(
            id.to_string(),
            "0xc5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
        assert_ne!(CollectionId::from_name("p1"), CollectionId::from_name("p2"));
    }

    #[test]
    fn test_config_defaults_and_validation() {
        let config =
            LedgerConfig::from_json_str(&format!(r#"{{"contract_address": "{ADDRESS}"}}"#))
                .unwrap();
        assert_eq!(config.rpc_url, "http://127.0.0.1:8545");
        assert!(config.local_precheck);

        let remote = LedgerConfig::from_json_str(&format!(
            r#"{{"rpc_url": "wss://node.example:8546", "contract_address": "{ADDRESS}", "local_precheck": false}}"#
        ))
        .unwrap();
        assert_eq!(remote.rpc_url, "wss://node.example:8546");
        assert!(!remote.local_precheck);

        assert!(matches!(
            LedgerConfig::from_json_str(r#"{"rpc_url": "http://node"}"#),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            LedgerConfig::new("0x1234").validate(),
            Err(Error::Config(_))
        ));
        let mut bad_url = LedgerConfig::new(ADDRESS);
        bad_url.rpc_url = "ftp://node".to_string();
        assert!(matches!(bad_url.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_publish_replaces_root() {
        let ledger = ledger();
        let collection = CollectionId::from_name("project");
        assert_eq!(ledger.root_of(&collection).unwrap(), None);

        let first = ledger.publish_root(&collection, MerkleHash([1; 32])).unwrap();
        let second = ledger.publish_root(&collection, MerkleHash([2; 32])).unwrap();
        assert_ne!(first.tx_hash, second.tx_hash);
        assert_eq!(ledger.root_of(&collection).unwrap(), Some(MerkleHash([2; 32])));
        assert_eq!(ledger.num_collections(), 1);
    }

    #[test]
    fn test_contract_check_agrees_with_local_verifier() {
        let ledger = ledger();
        let collection = CollectionId::from_name("project");
        let names: Vec<String> = (0..7).map(|i| format!("task-{i}")).collect();
        let tree = MerkleTree::<Keccak256>::from_records(&names).unwrap();
        ledger.publish_root(&collection, *tree.root()).unwrap();

        for (i, leaf) in tree.leaves().iter().enumerate() {
            let p = proof(&tree, i).unwrap().to_hex_vec();
            assert!(ledger.remote_verify(&collection, &p, &leaf.to_hex()).unwrap());
            assert!(!ledger
                .remote_verify(&collection, &p, &leaf.flip_bit(200).to_hex())
                .unwrap());
        }
    }

    #[test]
    fn test_remote_verify_errors() {
        let ledger = ledger();
        let collection = CollectionId::from_name("missing");
        let leaf = MerkleHash([3; 32]).to_hex();
        assert!(matches!(
            ledger.remote_verify(&collection, &[], &leaf),
            Err(Error::UnknownCollection(_))
        ));
        assert!(matches!(
            ledger.remote_verify(&collection, &["0x12".to_string()], &leaf),
            Err(Error::MalformedDigest(_))
        ));
        assert!(matches!(
            ledger.remote_verify(&collection, &[], &leaf[2..]),
            Err(Error::MalformedDigest(_))
        ));
    }
}
