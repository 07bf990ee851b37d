// Copyright 2024. The Jarrah Project
//
// Redistribution and use in source and binary forms, with or without modification, are permitted provided that the
// following conditions are met:
//
// 1. Redistributions of source code must retain the above copyright notice, this list of conditions and the following
// disclaimer.
//
// 2. Redistributions in binary form must reproduce the above copyright notice, this list of conditions and the
// following disclaimer in the documentation and/or other materials provided with the distribution.
//
// 3. Neither the name of the copyright holder nor the names of its contributors may be used to endorse or promote
// products derived from this software without specific prior written permission.
//
// THIS SOFTWARE IS PROVIDED BY THE COPYRIGHT HOLDERS AND CONTRIBUTORS "AS IS" AND ANY EXPRESS OR IMPLIED WARRANTIES,
// INCLUDING, BUT NOT LIMITED TO, THE IMPLIED WARRANTIES OF MERCHANTABILITY AND FITNESS FOR A PARTICULAR PURPOSE ARE
// DISCLAIMED. IN NO EVENT SHALL THE COPYRIGHT HOLDER OR CONTRIBUTORS BE LIABLE FOR ANY DIRECT, INDIRECT, INCIDENTAL,
// SPECIAL, EXEMPLARY, OR CONSEQUENTIAL DAMAGES (INCLUDING, BUT NOT LIMITED TO, PROCUREMENT OF SUBSTITUTE GOODS OR
// SERVICES; LOSS OF USE, DATA, OR PROFITS; OR BUSINESS INTERRUPTION) HOWEVER CAUSED AND ON ANY THEORY OF LIABILITY,
// WHETHER IN CONTRACT, STRICT LIABILITY, OR TORT (INCLUDING NEGLIGENCE OR OTHERWISE) ARISING IN ANY WAY OUT OF THE
// USE OF THIS SOFTWARE, EVEN IF ADVISED OF THE POSSIBILITY OF SUCH DAMAGE.

use jarrah_common_types::types::FixedHash;
use sha2::{Digest, Sha256};

/// Computes the merkle root of an ordered sequence of byte strings.
///
/// Leaves are hashed with SHA-256, then layers are folded by hashing the concatenation of each
/// pair. A layer of odd length duplicates its last element. The empty sequence has the all-zero
/// root, which is how a block with no transactions commits to its (empty) body.
pub fn merkle_root<T: AsRef<[u8]>>(leaves: &[T]) -> FixedHash {
    if leaves.is_empty() {
        return FixedHash::zero();
    }

    let mut layer: Vec<[u8; 32]> = leaves.iter().map(|leaf| sha256(leaf.as_ref())).collect();
    while layer.len() > 1 {
        if layer.len() % 2 == 1 {
            layer.push(*layer.last().expect("layer is non-empty"));
        }
        layer = layer
            .chunks(2)
            .map(|pair| {
                let mut hasher = Sha256::new();
                hasher.update(pair[0]);
                hasher.update(pair[1]);
                hasher.finalize().into()
            })
            .collect();
    }

    FixedHash::from(layer[0])
}

fn sha256(bytes: &[u8]) -> [u8; 32] {
    Sha256::digest(bytes).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hash_pair(a: &[u8; 32], b: &[u8; 32]) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(a);
        hasher.update(b);
        hasher.finalize().into()
    }

    #[test]
    fn empty_sequence_is_zero_root() {
        let leaves: Vec<Vec<u8>> = vec![];
        assert_eq!(merkle_root(&leaves), FixedHash::zero());
    }

    #[test]
    fn single_leaf_is_its_hash() {
        let root = merkle_root(&[b"transaction".to_vec()]);
        assert_eq!(root, FixedHash::from(sha256(b"transaction")));
    }

    #[test]
    fn two_leaves_fold_once() {
        let a = sha256(b"a");
        let b = sha256(b"b");
        let expected = FixedHash::from(hash_pair(&a, &b));
        assert_eq!(merkle_root(&[b"a".to_vec(), b"b".to_vec()]), expected);
    }

    #[test]
    fn odd_layer_duplicates_last_element() {
        let a = sha256(b"a");
        let b = sha256(b"b");
        let c = sha256(b"c");
        let left = hash_pair(&a, &b);
        let right = hash_pair(&c, &c);
        let expected = FixedHash::from(hash_pair(&left, &right));
        assert_eq!(merkle_root(&[b"a".to_vec(), b"b".to_vec(), b"c".to_vec()]), expected);
    }

    #[test]
    fn root_is_order_sensitive() {
        let ab = merkle_root(&[b"a".to_vec(), b"b".to_vec()]);
        let ba = merkle_root(&[b"b".to_vec(), b"a".to_vec()]);
        assert_ne!(ab, ba);
    }
}
