use sha2::{Digest, Sha256};

use common_types::error::CodecError;
use common_types::DigestBytes;

/// A Merkle tree over 32-byte digests.
#[derive(Debug)]
pub struct MerkleTree {
    // levels[0] is the leaf level; the last level holds only the root.
    levels: Vec<Vec<DigestBytes>>,
}

fn hash_pair(left: &DigestBytes, right: &DigestBytes) -> DigestBytes {
    let mut hasher = Sha256::new();
    hasher.update(left);
    hasher.update(right);
    hasher.finalize().into()
}

impl MerkleTree {
    /// Constructs a Merkle tree from a slice of leaf hashes.
    pub fn new(leaves: &[DigestBytes]) -> Self {
        if leaves.is_empty() {
            return MerkleTree { levels: vec![vec![[0; 32]]] };
        }

        let mut levels = vec![leaves.to_vec()];
        while levels.last().expect("at least the leaf level").len() > 1 {
            let current = levels.last().expect("non-empty");
            let mut next = Vec::with_capacity(current.len().div_ceil(2));
            for chunk in current.chunks(2) {
                let left = chunk[0];
                // An odd node at the end is paired with itself.
                let right = if chunk.len() > 1 { chunk[1] } else { left };
                next.push(hash_pair(&left, &right));
            }
            levels.push(next);
        }

        MerkleTree { levels }
    }

    /// Returns the root hash of the Merkle tree.
    pub fn root(&self) -> DigestBytes {
        self.levels
            .last()
            .and_then(|level| level.first())
            .copied()
            .unwrap_or([0; 32])
    }

    /// Builds the inclusion proof for the leaf at `index`.
    pub fn proof(&self, index: usize) -> Option<MerkleProof> {
        if index >= self.levels[0].len() {
            return None;
        }
        let mut steps = Vec::with_capacity(self.levels.len());
        let mut position = index;
        for level in &self.levels[..self.levels.len() - 1] {
            let sibling_index = position ^ 1;
            let (sibling, side) = if sibling_index < level.len() {
                let side = if sibling_index < position {
                    ProofSide::Left
                } else {
                    ProofSide::Right
                };
                (level[sibling_index], side)
            } else {
                // The duplicated odd node pairs with itself on the right.
                (level[position], ProofSide::Right)
            };
            steps.push((sibling, side));
            position /= 2;
        }
        Some(MerkleProof { steps })
    }
}

/// Which side of the running hash a proof sibling sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProofSide {
    Left,
    Right,
}

/// An inclusion proof: one sibling digest per level, leaf level first.
///
/// Serialized form: all 32-byte siblings concatenated, followed by one byte
/// per level giving the sibling's side (`0` = left, any other value = right).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MerkleProof {
    pub steps: Vec<(DigestBytes, ProofSide)>,
}

impl MerkleProof {
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.steps.len() * 33);
        for (sibling, _) in &self.steps {
            buf.extend_from_slice(sibling);
        }
        for (_, side) in &self.steps {
            buf.push(match side {
                ProofSide::Left => 0,
                ProofSide::Right => 1,
            });
        }
        buf
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<MerkleProof, CodecError> {
        if bytes.len() % 33 != 0 {
            return Err(CodecError::MalformedProof);
        }
        let count = bytes.len() / 33;
        let steps = (0..count)
            .map(|i| {
                let sibling: DigestBytes = bytes[i * 32..(i + 1) * 32]
                    .try_into()
                    .expect("32-byte slice");
                let side = if bytes[count * 32 + i] == 0 {
                    ProofSide::Left
                } else {
                    ProofSide::Right
                };
                (sibling, side)
            })
            .collect();
        Ok(MerkleProof { steps })
    }

    /// Recomputes the root from `leaf` and checks it against `root`.
    pub fn verify(&self, root: &DigestBytes, leaf: &DigestBytes) -> bool {
        let mut acc = *leaf;
        for (sibling, side) in &self.steps {
            acc = match side {
                ProofSide::Left => hash_pair(sibling, &acc),
                ProofSide::Right => hash_pair(&acc, sibling),
            };
        }
        acc == *root
    }
}
