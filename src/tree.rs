//! Merkle Tree and Merkle Proof types.
//!
//! Level 0 holds the leaf digests in the order the caller supplied them. Each
//! level above pairs consecutive nodes with [`DigestProvider::hash_pair`]; an
//! unpaired last node is carried up unchanged rather than duplicated. The
//! ledger contract folds proofs with the same rule, so both sides agree on
//! the root for the same leaf sequence.

use crate::{
    error::Error,
    hash::{DigestProvider, MerkleHash},
    leaf::{leaf_digests, Canonical},
};
use log::debug;
use std::{fmt, marker::PhantomData};

/// Merkle Proof for an individual leaf
pub struct MerkleProof<HF: DigestProvider> {
    _hasher: PhantomData<HF>,
    /// Sibling digests from the leaf level up to just below the root
    pub(crate) siblings: Vec<MerkleHash>,
}

impl<HF: DigestProvider> MerkleProof<HF> {
    pub fn new(siblings: Vec<MerkleHash>) -> Self {
        Self {
            _hasher: PhantomData,
            siblings,
        }
    }

    /// Parse a proof received as `0x` hex strings
    pub fn from_hex_slice<S: AsRef<str>>(siblings: &[S]) -> Result<Self, Error> {
        let siblings = siblings
            .iter()
            .map(|s| s.as_ref().parse())
            .collect::<Result<Vec<MerkleHash>, Error>>()?;
        Ok(Self::new(siblings))
    }

    /// Hex form handed to the ledger's verifier
    pub fn to_hex_vec(&self) -> Vec<String> {
        self.siblings.iter().map(MerkleHash::to_hex).collect()
    }

    pub fn siblings(&self) -> &[MerkleHash] {
        &self.siblings
    }

    pub fn len(&self) -> usize {
        self.siblings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.siblings.is_empty()
    }

    /// Compute the implied Merkle Root Hash by folding the siblings into the leaf
    pub fn compute_implied_root(&self, leaf: &MerkleHash) -> MerkleHash {
        self.siblings
            .iter()
            .fold(*leaf, |current, sibling| HF::hash_pair(&current, sibling))
    }
}

impl<HF: DigestProvider> Clone for MerkleProof<HF> {
    fn clone(&self) -> Self {
        Self::new(self.siblings.clone())
    }
}

impl<HF: DigestProvider> PartialEq for MerkleProof<HF> {
    fn eq(&self, other: &Self) -> bool {
        self.siblings == other.siblings
    }
}

impl<HF: DigestProvider> Eq for MerkleProof<HF> {}

impl<HF: DigestProvider> fmt::Debug for MerkleProof<HF> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MerkleProof")
            .field("siblings", &self.siblings)
            .finish()
    }
}

/// Merkle Tree data structure
pub struct MerkleTree<HF: DigestProvider> {
    _hasher: PhantomData<HF>,
    /// `levels[0]` are the leaves, the last level holds only the root
    pub(crate) levels: Vec<Vec<MerkleHash>>,
}

impl<HF: DigestProvider> MerkleTree<HF> {
    /// Build a tree over leaf digests, keeping every intermediate level
    pub fn build(leaves: Vec<MerkleHash>) -> Result<Self, Error> {
        if leaves.is_empty() {
            return Err(Error::EmptyLeaves);
        }
        let num_leaves = leaves.len();
        let mut levels = vec![leaves];
        while let Some(level) = levels.last().filter(|level| level.len() > 1) {
            let parents = parent_level::<HF>(level);
            levels.push(parents);
        }
        debug!(
            "built merkle tree over {} leaves with {} levels",
            num_leaves,
            levels.len()
        );
        Ok(Self {
            _hasher: PhantomData,
            levels,
        })
    }

    /// Encode and hash each record, then build the tree in record order
    pub fn from_records<R: Canonical>(records: &[R]) -> Result<Self, Error> {
        Self::build(leaf_digests::<HF, R>(records)?)
    }

    /// Get the merkle root of the tree
    pub fn root(&self) -> &MerkleHash {
        &self.levels[self.levels.len() - 1][0]
    }

    pub fn leaves(&self) -> &[MerkleHash] {
        &self.levels[0]
    }

    /// Get the number of leaves in the tree
    pub fn num_leaves(&self) -> usize {
        self.levels[0].len()
    }

    /// Number of hashing levels above the leaves
    pub fn depth(&self) -> usize {
        self.levels.len() - 1
    }

    pub fn levels(&self) -> &[Vec<MerkleHash>] {
        &self.levels
    }

    /// Index of the first leaf equal to `leaf`
    pub fn position(&self, leaf: &MerkleHash) -> Result<usize, Error> {
        self.leaves()
            .iter()
            .position(|candidate| candidate == leaf)
            .ok_or_else(|| Error::LeafNotFound(leaf.to_hex()))
    }

    /// Proof for a leaf looked up by its digest
    pub fn prove_leaf(&self, leaf: &MerkleHash) -> Result<MerkleProof<HF>, Error> {
        proof(self, self.position(leaf)?)
    }

    /// Ensure the leaf is a member of the tree
    fn leaf_exists(&self, leaf_index: usize) -> Result<(), Error> {
        if leaf_index >= self.num_leaves() {
            return Err(Error::ExceededMaxIndex(leaf_index, self.num_leaves()));
        }
        Ok(())
    }
}

impl<HF: DigestProvider> Clone for MerkleTree<HF> {
    fn clone(&self) -> Self {
        Self {
            _hasher: PhantomData,
            levels: self.levels.clone(),
        }
    }
}

impl<HF: DigestProvider> fmt::Debug for MerkleTree<HF> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MerkleTree")
            .field("levels", &self.levels)
            .finish()
    }
}

/// Hash consecutive pairs, carrying an odd trailing node up as is
fn parent_level<HF: DigestProvider>(children: &[MerkleHash]) -> Vec<MerkleHash> {
    children
        .chunks(2)
        .map(|pair| match pair {
            [left, right] => HF::hash_pair(left, right),
            [carried] => *carried,
            _ => unreachable!("chunks(2) yields one or two nodes"),
        })
        .collect()
}

/// Calculate a Merkle Proof from a tree and leaf index
pub fn proof<HF: DigestProvider>(
    tree: &MerkleTree<HF>,
    leaf_index: usize,
) -> Result<MerkleProof<HF>, Error> {
    tree.leaf_exists(leaf_index)?;
    let mut siblings = Vec::with_capacity(tree.depth());
    let mut working_index = leaf_index;
    for level in &tree.levels[..tree.depth()] {
        if let Some(sibling) = level.get(get_sibling_index(working_index)) {
            siblings.push(*sibling);
        }
        working_index = get_parent_index(working_index);
    }
    debug!(
        "proof for leaf {} of {} has {} siblings",
        leaf_index,
        tree.num_leaves(),
        siblings.len()
    );
    Ok(MerkleProof::new(siblings))
}

/// Check that `leaf` and `proof` fold up to `root`
pub fn verify<HF: DigestProvider>(
    leaf: &MerkleHash,
    proof: &MerkleProof<HF>,
    root: &MerkleHash,
) -> bool {
    &proof.compute_implied_root(leaf) == root
}

/// [`verify`] over `0x` hex inputs; malformed digests are errors, a wrong root is `false`
pub fn verify_hex<HF: DigestProvider, S: AsRef<str>>(
    leaf: &str,
    proof: &[S],
    root: &str,
) -> Result<bool, Error> {
    let leaf: MerkleHash = leaf.parse()?;
    let root: MerkleHash = root.parse()?;
    Ok(verify(&leaf, &MerkleProof::<HF>::from_hex_slice(proof)?, &root))
}

/// Index of a node's sibling within its level
pub fn get_sibling_index(node_index: usize) -> usize {
    node_index ^ 1
}

/// Index of a node's parent within the level above
pub fn get_parent_index(node_index: usize) -> usize {
    node_index >> 1
}
