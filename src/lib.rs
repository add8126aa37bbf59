//! Merkle commitments over project tasks
//!
//! Records are canonically encoded and hashed into leaves, leaves are folded
//! into a binary tree with a sorted-pair hash, and the resulting root is what
//! gets published to a ledger. Inclusion proofs are plain sibling lists that
//! any verifier using the same pair rule can replay.

mod commit;
mod error;
mod hash;
mod leaf;
mod ledger;
mod task;
mod tree;

pub use crate::{
    commit::{Commitment, Committer},
    error::Error,
    hash::{DigestProvider, MerkleHash},
    leaf::{canonicalize, json_canonical_bytes, leaf_digest, leaf_digests, Canonical},
    ledger::{CollectionId, InMemoryLedger, Ledger, LedgerConfig, TxReceipt},
    task::{Task, TaskStatus},
    tree::{
        get_parent_index, get_sibling_index, proof, verify, verify_hex, MerkleProof, MerkleTree,
    },
};
pub use sha3::Keccak256;

/// Tree over Keccak-256, the hash the ledger contract verifies with
pub type TaskTree = MerkleTree<Keccak256>;

/// Proof produced by a [`TaskTree`]
pub type TaskProof = MerkleProof<Keccak256>;
