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

use jarrah_common_types::types::{BlockHash, FixedHash};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::blocks::raw_block::header_envelope;

/// The header of a block as advertised between peers: everything needed to judge a chain's weight
/// and proof of work, without the transaction bodies.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct BlockHeader {
    pub parent_hash: BlockHash,
    /// Milliseconds since the Unix epoch at which the block was built.
    pub timestamp: u64,
    pub num_transactions: u64,
    pub transactions_merkle_root: FixedHash,
    /// Hash of the 32-byte big-endian nonce integer found by the miner.
    pub nonce: FixedHash,
    pub graffiti: FixedHash,
}

impl BlockHeader {
    /// The block id. Double SHA-256 over the canonical header envelope; graffiti is not part of
    /// the preimage.
    pub fn hash(&self) -> BlockHash {
        let envelope = header_envelope(
            &self.parent_hash,
            self.timestamp,
            self.num_transactions,
            &self.transactions_merkle_root,
            &self.nonce,
        );
        let first = Sha256::digest(&envelope);
        let second: [u8; 32] = Sha256::digest(first).into();
        BlockHash::from(second)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn graffiti_does_not_change_identity() {
        let header = BlockHeader {
            parent_hash: BlockHash::from([1u8; 32]),
            timestamp: 42,
            num_transactions: 0,
            transactions_merkle_root: FixedHash::zero(),
            nonce: FixedHash::from([2u8; 32]),
            graffiti: FixedHash::zero(),
        };
        let mut tagged = header.clone();
        tagged.graffiti = FixedHash::from([0xaa; 32]);
        assert_eq!(header.hash(), tagged.hash());
    }

    #[test]
    fn nonce_changes_identity() {
        let header = BlockHeader {
            parent_hash: BlockHash::from([1u8; 32]),
            timestamp: 42,
            num_transactions: 0,
            transactions_merkle_root: FixedHash::zero(),
            nonce: FixedHash::from([2u8; 32]),
            graffiti: FixedHash::zero(),
        };
        let mut other = header.clone();
        other.nonce = FixedHash::from([3u8; 32]);
        assert_ne!(header.hash(), other.hash());
    }
}
