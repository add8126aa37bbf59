//! Merkle Commitment Errors

use displaydoc::Display;

#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum Error {
    /// Record could not be canonically encoded: {0}
    Encoding(String),
    /// Requested index: {0} exceeds number of nodes or leaves: {1}
    ExceededMaxIndex(usize, usize),
    /// Cannot build a merkle tree without leaves
    EmptyLeaves,
    /// Malformed digest: {0}
    MalformedDigest(String),
    /// Leaf {0} is not a member of the tree
    LeafNotFound(String),
    /// No root has been published for collection {0}
    UnknownCollection(String),
    /// Invalid ledger configuration: {0}
    Config(String),
    /// Ledger call failed: {0}
    Ledger(String),
}

impl std::error::Error for Error {}
