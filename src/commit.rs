//! Commit a project's tasks to a ledger and later prove membership of one task.

use crate::{
    error::Error,
    hash::MerkleHash,
    leaf::{leaf_digest, Canonical},
    ledger::{CollectionId, Ledger, LedgerConfig, TxReceipt},
    tree::{proof, verify, MerkleTree},
};
use log::{debug, info, warn};
use sha3::Keccak256;

/// A root published for one collection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commitment {
    pub collection: CollectionId,
    pub root: MerkleHash,
    pub receipt: TxReceipt,
}

/// Builds trees over record sets and talks to the ledger on their behalf.
///
/// Trees are rebuilt from the caller's records on every call; only roots
/// ever leave this type.
pub struct Committer<L: Ledger> {
    config: LedgerConfig,
    ledger: L,
}

impl<L: Ledger> Committer<L> {
    pub fn new(config: LedgerConfig, ledger: L) -> Result<Self, Error> {
        config.validate()?;
        debug!(
            "committer for contract {} via {}",
            config.contract_address, config.rpc_url
        );
        Ok(Self { config, ledger })
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    /// Root of `records` in the order given, without publishing it
    pub fn compute_root<R: Canonical>(&self, records: &[R]) -> Result<MerkleHash, Error> {
        Ok(*MerkleTree::<Keccak256>::from_records(records)?.root())
    }

    /// Build the tree over `records` and publish its root for `project`
    pub fn commit_tasks<R: Canonical>(
        &self,
        project: &str,
        records: &[R],
    ) -> Result<Commitment, Error> {
        let collection = CollectionId::from_name(project);
        let root = self.compute_root(records)?;
        let receipt = self.ledger.publish_root(&collection, root)?;
        info!(
            "committed {} records of project {:?} with root {}",
            records.len(),
            project,
            root
        );
        Ok(Commitment {
            collection,
            root,
            receipt,
        })
    }

    /// Check that `record` is part of the set committed for `project`.
    ///
    /// `records` must be the same ordered set that was committed. A record
    /// that is not in it, or a set that no longer matches the stored root,
    /// yields `Ok(false)`.
    pub fn verify_task<R: Canonical>(
        &self,
        project: &str,
        record: &R,
        records: &[R],
    ) -> Result<bool, Error> {
        let collection = CollectionId::from_name(project);
        let tree = MerkleTree::<Keccak256>::from_records(records)?;
        let leaf = leaf_digest::<Keccak256, R>(record)?;
        let leaf_index = match tree.position(&leaf) {
            Ok(index) => index,
            Err(Error::LeafNotFound(_)) => {
                warn!("record {} is not among the {} supplied records", leaf, records.len());
                return Ok(false);
            }
            Err(e) => return Err(e),
        };
        let leaf_proof = proof(&tree, leaf_index)?;

        if self.config.local_precheck {
            let stored = self
                .ledger
                .root_of(&collection)?
                .ok_or_else(|| Error::UnknownCollection(collection.to_string()))?;
            if !verify(&leaf, &leaf_proof, &stored) {
                warn!(
                    "supplied records of project {:?} do not match stored root {}",
                    project, stored
                );
                return Ok(false);
            }
        }

        let valid = self
            .ledger
            .remote_verify(&collection, &leaf_proof.to_hex_vec(), &leaf.to_hex())?;
        info!("record {} of project {:?} verified: {}", leaf, project, valid);
        Ok(valid)
    }
}
