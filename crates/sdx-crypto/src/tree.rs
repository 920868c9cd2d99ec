//! # Selective-Disclosure Hash Tree
//!
//! An ordered sequence of salted leaves plus a root. Producers append
//! facts, finalize, and hand out copies with chosen leaves redacted.
//! Verifiers check the copy without ever seeing the redacted values.
//!
//! ## Structure
//!
//! - Leaf 0 is the **header leaf**. Its revealed data is the canonical JSON
//!   `{"alg": .., "exchange": .., "leaves": n}` and its content type is
//!   [`HEADER_CONTENT_TYPE`]. It can never be redacted.
//! - A finalized tree always has at least two leaves: the header plus one
//!   or more data leaves.
//! - The header pins the algorithm and the leaf count into the hash chain:
//!   dropping a leaf or swapping the algorithm invalidates the root.
//!
//! ## Root Computation
//!
//! Adjacent hashes are paired left to right and each pair is replaced by
//! `H(left ++ right)`. At a level with an odd number of nodes, the last
//! node is carried to the next level unchanged. This repeats until one hash
//! remains. The carry rule is part of the wire format.
//!
//! ## Wire Form
//!
//! ```json
//! { "header": {"typ": "application/merkle-exchange-3.0+json"},
//!   "leaves": [ {"data": "0x..", "salt": "0x..", "hash": "0x..", "contentType": ".."} ],
//!   "root": "0x.." }
//! ```

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use sdx_core::{CanonicalBytes, HashAlgorithm, HashValue};

use crate::error::TreeError;
use crate::leaf::{random_salt, HashLeaf};

/// Media type carried in the tree's `header.typ` field.
pub const TREE_TYPE: &str = "application/merkle-exchange-3.0+json";

/// Content type of the header leaf.
pub const HEADER_CONTENT_TYPE: &str = "application/merkle-exchange-header-3.0+json; charset=utf-8";

// ---------------------------------------------------------------------------
// Root computation
// ---------------------------------------------------------------------------

/// Compute the root over `hashes` in order.
///
/// Returns `None` for an empty slice. A single hash is its own root; the
/// tree itself never finalizes with fewer than two leaves.
pub fn compute_root(algorithm: HashAlgorithm, hashes: &[HashValue]) -> Option<HashValue> {
    let mut level: Vec<HashValue> = hashes.to_vec();
    while level.len() > 1 {
        let mut next = Vec::with_capacity((level.len() + 1) / 2);
        for pair in level.chunks(2) {
            match pair {
                [left, right] => next.push(algorithm.hash(&[left.as_bytes(), right.as_bytes()])),
                [lone] => next.push(*lone),
                _ => {}
            }
        }
        level = next;
    }
    level.first().copied()
}

// ---------------------------------------------------------------------------
// Header leaf content
// ---------------------------------------------------------------------------

/// Decoded content of the header leaf.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeHeader {
    /// Hash algorithm used for every leaf and node.
    pub alg: HashAlgorithm,
    /// Total number of leaves, header included.
    pub leaves: usize,
    /// Application-defined exchange type (e.g. `"passport"`).
    pub exchange: String,
}

impl TreeHeader {
    fn to_leaf(&self) -> Result<HashLeaf, TreeError> {
        let data = CanonicalBytes::new(self)?.into_bytes();
        Ok(HashLeaf::revealed(self.alg, data, random_salt(), HEADER_CONTENT_TYPE))
    }

    fn from_leaf(leaf: &HashLeaf) -> Result<Self, TreeError> {
        if leaf.content_type() != HEADER_CONTENT_TYPE {
            return Err(TreeError::InvalidHeader(format!(
                "unexpected content type {:?}",
                leaf.content_type()
            )));
        }
        if !leaf.is_revealed() {
            return Err(TreeError::InvalidHeader("header leaf is redacted".to_string()));
        }
        leaf.decode_json::<TreeHeader>()
            .map_err(|e| TreeError::InvalidHeader(format!("undecodable header content: {e}")))
    }
}

// ---------------------------------------------------------------------------
// HashTree
// ---------------------------------------------------------------------------

/// A selective-disclosure hash tree.
///
/// Producer side: [`HashTree::new`], [`add_leaf`](HashTree::add_leaf),
/// [`finalize`](HashTree::finalize), then [`redact`](HashTree::redact) to
/// derive disclosure copies. Verifier side: deserialize and call
/// [`verify`](HashTree::verify).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashTree {
    algorithm: HashAlgorithm,
    exchange_type: String,
    /// Once `has_header` is set, `leaves[0]` is the header leaf.
    leaves: Vec<HashLeaf>,
    has_header: bool,
    root: Option<HashValue>,
}

impl HashTree {
    /// Create an empty tree for the given algorithm and exchange type.
    pub fn new(algorithm: HashAlgorithm, exchange_type: impl Into<String>) -> Self {
        Self {
            algorithm,
            exchange_type: exchange_type.into(),
            leaves: Vec::new(),
            has_header: false,
            root: None,
        }
    }

    /// Append a revealed leaf holding the canonical JSON of `content`.
    ///
    /// Draws a fresh salt. Invalidates any previously computed root.
    /// Returns the position of the leaf among the data leaves (the header,
    /// once present, shifts every position by one).
    pub fn add_leaf<T: Serialize>(&mut self, content: &T, content_type: &str) -> Result<usize, TreeError> {
        let data = CanonicalBytes::new(content)?.into_bytes();
        Ok(self.add_bytes_leaf(data, content_type))
    }

    /// Append a revealed leaf holding pre-encoded bytes.
    pub fn add_bytes_leaf(&mut self, data: Vec<u8>, content_type: &str) -> usize {
        self.push(HashLeaf::revealed(self.algorithm, data, random_salt(), content_type))
    }

    /// Append a redacted leaf with only its hash.
    pub fn add_redacted_leaf(&mut self, hash: HashValue, content_type: &str) -> usize {
        self.push(HashLeaf::redacted(hash, content_type))
    }

    fn push(&mut self, leaf: HashLeaf) -> usize {
        self.leaves.push(leaf);
        self.root = None;
        self.data_leaf_count() - 1
    }

    fn data_leaf_count(&self) -> usize {
        if self.has_header {
            self.leaves.len() - 1
        } else {
            self.leaves.len()
        }
    }

    /// Synthesize the header leaf and compute the root.
    ///
    /// Calling this again on an unmodified leaf set keeps the existing
    /// header leaf and yields the same root. If leaves were appended since,
    /// a new header leaf with the new count replaces the old one.
    ///
    /// # Errors
    ///
    /// `EmptyTree` if there is no data leaf.
    pub fn finalize(&mut self) -> Result<&HashValue, TreeError> {
        let data_leaves = self.data_leaf_count();
        if data_leaves == 0 {
            return Err(TreeError::EmptyTree);
        }
        let expected = TreeHeader {
            alg: self.algorithm,
            leaves: data_leaves + 1,
            exchange: self.exchange_type.clone(),
        };

        let reusable = self.has_header
            && TreeHeader::from_leaf(&self.leaves[0]).map_or(false, |h| h == expected);
        if !reusable {
            if self.has_header {
                self.leaves.remove(0);
            }
            self.leaves.insert(0, expected.to_leaf()?);
            self.has_header = true;
        }

        let root = compute_root(self.algorithm, &self.leaf_hashes()).ok_or(TreeError::EmptyTree)?;
        Ok(&*self.root.insert(root))
    }

    /// The algorithm declared by this tree.
    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    /// The exchange type declared by this tree.
    pub fn exchange_type(&self) -> &str {
        &self.exchange_type
    }

    /// The stored root, if the tree has been finalized.
    pub fn root(&self) -> Option<&HashValue> {
        self.root.as_ref()
    }

    /// All leaves, header first once finalized.
    pub fn leaves(&self) -> &[HashLeaf] {
        &self.leaves
    }

    /// The leaf at `index`.
    pub fn leaf(&self, index: usize) -> Option<&HashLeaf> {
        self.leaves.get(index)
    }

    /// Indices and leaves that still carry their data, header excluded.
    pub fn revealed_leaves(&self) -> impl Iterator<Item = (usize, &HashLeaf)> {
        let skip = usize::from(self.has_header);
        self.leaves
            .iter()
            .enumerate()
            .skip(skip)
            .filter(|(_, leaf)| leaf.is_revealed())
    }

    /// Decode the header leaf.
    pub fn header(&self) -> Result<TreeHeader, TreeError> {
        if !self.has_header {
            return Err(TreeError::NotFinalized);
        }
        TreeHeader::from_leaf(&self.leaves[0])
    }

    /// Returns `true` once a header leaf and root are present.
    pub fn is_finalized(&self) -> bool {
        self.has_header && self.root.is_some()
    }

    fn leaf_hashes(&self) -> Vec<HashValue> {
        self.leaves.iter().map(|l| *l.hash()).collect()
    }

    /// Root recomputed from the current leaf hashes.
    pub fn computed_root(&self) -> Option<HashValue> {
        compute_root(self.algorithm, &self.leaf_hashes())
    }

    // -----------------------------------------------------------------------
    // Verification
    // -----------------------------------------------------------------------

    /// Check every revealed leaf's hash against its data and salt.
    ///
    /// Redacted leaves are accepted at face value.
    ///
    /// # Errors
    ///
    /// `LeafHashMismatch` naming the first offending index; `MalformedLeaf`
    /// for a leaf with data but no salt (or the reverse).
    pub fn verify_leaf_hashes(&self) -> Result<(), TreeError> {
        for (index, leaf) in self.leaves.iter().enumerate() {
            leaf.check_shape(index)?;
            if let Some(recomputed) = leaf.recompute_hash(self.algorithm) {
                if recomputed != *leaf.hash() {
                    return Err(TreeError::LeafHashMismatch { index });
                }
            }
        }
        Ok(())
    }

    /// Recompute the root and compare it with the stored root.
    ///
    /// Never errors; a tree without a stored root or with fewer than two
    /// leaves is simply not valid.
    pub fn verify_root(&self) -> bool {
        if self.leaves.len() < 2 {
            return false;
        }
        match (&self.root, self.computed_root()) {
            (Some(stored), Some(computed)) => *stored == computed,
            _ => false,
        }
    }

    /// Check the header leaf against the tree it heads.
    ///
    /// # Errors
    ///
    /// `InvalidHeader` when the header is absent, redacted, undecodable, or
    /// declares a different algorithm, exchange type, or leaf count.
    pub fn verify_header(&self) -> Result<(), TreeError> {
        if self.leaves.len() < 2 {
            return Err(TreeError::InvalidHeader(format!(
                "tree must have at least 2 leaves, found {}",
                self.leaves.len()
            )));
        }
        let header = self.header()?;
        if header.alg != self.algorithm {
            return Err(TreeError::InvalidHeader(format!(
                "header declares {} but tree uses {}",
                header.alg, self.algorithm
            )));
        }
        if header.exchange != self.exchange_type {
            return Err(TreeError::InvalidHeader(format!(
                "header declares exchange {:?} but tree has {:?}",
                header.exchange, self.exchange_type
            )));
        }
        if header.leaves != self.leaves.len() {
            return Err(TreeError::InvalidHeader(format!(
                "header declares {} leaves but tree has {}",
                header.leaves,
                self.leaves.len()
            )));
        }
        Ok(())
    }

    /// Full integrity check: header, leaf hashes, then root.
    pub fn verify(&self) -> Result<(), TreeError> {
        self.verify_header()?;
        self.verify_leaf_hashes()?;
        if !self.verify_root() {
            return Err(TreeError::RootMismatch);
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Redaction
    // -----------------------------------------------------------------------

    /// Return a copy with `data` and `salt` removed at `indices`.
    ///
    /// The original tree is untouched and the root is unchanged.
    ///
    /// # Errors
    ///
    /// `HeaderLeafProtected` if `indices` contains 0; `LeafIndexOutOfRange`
    /// for indices past the end; `NotFinalized` before `finalize()`.
    pub fn redact(&self, indices: &[usize]) -> Result<HashTree, TreeError> {
        if !self.is_finalized() {
            return Err(TreeError::NotFinalized);
        }
        let len = self.leaves.len();
        for &index in indices {
            if index == 0 {
                return Err(TreeError::HeaderLeafProtected);
            }
            if index >= len {
                return Err(TreeError::LeafIndexOutOfRange { index, len });
            }
        }
        let mut copy = self.clone();
        for &index in indices {
            copy.leaves[index] = copy.leaves[index].to_redacted();
        }
        Ok(copy)
    }

    /// Return a copy revealing only the header and the leaves at `indices`.
    pub fn reveal_only(&self, indices: &[usize]) -> Result<HashTree, TreeError> {
        let len = self.leaves.len();
        if let Some(&index) = indices.iter().find(|&&i| i >= len) {
            return Err(TreeError::LeafIndexOutOfRange { index, len });
        }
        let hidden: Vec<usize> = (1..len).filter(|i| !indices.contains(i)).collect();
        self.redact(&hidden)
    }
}

// ---------------------------------------------------------------------------
// Serde
// ---------------------------------------------------------------------------

#[derive(Serialize, Deserialize)]
struct TreeTypeHeader {
    typ: String,
}

#[derive(Serialize)]
struct TreeWireRef<'a> {
    header: TreeTypeHeader,
    leaves: &'a [HashLeaf],
    root: &'a HashValue,
}

#[derive(Deserialize)]
struct TreeWire {
    header: TreeTypeHeader,
    leaves: Vec<HashLeaf>,
    root: HashValue,
}

impl Serialize for HashTree {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let root = match (&self.root, self.has_header) {
            (Some(root), true) => root,
            _ => {
                return Err(serde::ser::Error::custom(
                    "hash tree must be finalized before serialization",
                ))
            }
        };
        TreeWireRef {
            header: TreeTypeHeader {
                typ: TREE_TYPE.to_string(),
            },
            leaves: &self.leaves,
            root,
        }
        .serialize(serializer)
    }
}

impl TryFrom<TreeWire> for HashTree {
    type Error = TreeError;

    fn try_from(wire: TreeWire) -> Result<Self, Self::Error> {
        if wire.header.typ != TREE_TYPE {
            return Err(TreeError::InvalidHeader(format!(
                "unsupported tree type {:?}",
                wire.header.typ
            )));
        }
        if wire.leaves.len() < 2 {
            return Err(TreeError::InvalidHeader(format!(
                "tree must have at least 2 leaves, found {}",
                wire.leaves.len()
            )));
        }
        for (index, leaf) in wire.leaves.iter().enumerate() {
            leaf.check_shape(index)?;
        }
        let header = TreeHeader::from_leaf(&wire.leaves[0])?;
        Ok(Self {
            algorithm: header.alg,
            exchange_type: header.exchange,
            leaves: wire.leaves,
            has_header: true,
            root: Some(wire.root),
        })
    }
}

impl<'de> Deserialize<'de> for HashTree {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let wire = TreeWire::deserialize(deserializer)?;
        HashTree::try_from(wire).map_err(serde::de::Error::custom)
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use crate::leaf::JSON_CONTENT_TYPE;
    use proptest::prelude::*;

    fn build(values: &[String]) -> HashTree {
        let mut tree = HashTree::new(HashAlgorithm::Sha256, "prop");
        for v in values {
            tree.add_leaf(v, JSON_CONTENT_TYPE).unwrap();
        }
        tree.finalize().unwrap();
        tree
    }

    proptest! {
        #[test]
        fn finalized_tree_verifies(values in prop::collection::vec("[a-z0-9]{0,12}", 1..12)) {
            let tree = build(&values);
            prop_assert!(tree.verify_root());
            prop_assert!(tree.verify().is_ok());
        }

        #[test]
        fn redaction_preserves_root(
            values in prop::collection::vec("[a-z0-9]{0,12}", 1..12),
            mask in prop::collection::vec(any::<bool>(), 12),
        ) {
            let tree = build(&values);
            let indices: Vec<usize> = (1..tree.leaves().len()).filter(|i| mask[*i - 1]).collect();
            let red = tree.redact(&indices).unwrap();
            prop_assert_eq!(red.root(), tree.root());
            prop_assert!(red.verify_root());
            prop_assert!(red.verify().is_ok());
        }

        #[test]
        fn any_bit_flip_is_detected(
            values in prop::collection::vec("[a-z0-9]{1,12}", 1..8),
            leaf_pick in any::<prop::sample::Index>(),
            field in 0u8..3,
            bit in 0u8..8,
        ) {
            let mut tree = build(&values);
            let index = leaf_pick.index(tree.leaves.len());
            let leaf = &mut tree.leaves[index];
            match field {
                0 => if let Some(d) = leaf.data.as_mut() { d[0] ^= 1 << bit },
                1 => if let Some(s) = leaf.salt.as_mut() { s[0] ^= 1 << bit },
                _ => leaf.hash.0[0] ^= 1 << bit,
            }
            prop_assert!(tree.verify_leaf_hashes().is_err() || !tree.verify_root());
        }
    }
}
