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

use std::fmt::{Display, Formatter};

use jarrah_common_types::types::{BlockHash, FixedHash};
use primitive_types::U256;

use crate::{
    blocks::{BlockHeader, RawBlock},
    transactions::RawTransaction,
};

/// A block as stored in the DAG: the network form plus the metadata derived at acceptance time.
/// Stored blocks are never mutated or deleted.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Block {
    pub parent_hash: BlockHash,
    pub timestamp: u64,
    pub num_transactions: u64,
    pub transactions_merkle_root: FixedHash,
    pub nonce: FixedHash,
    pub graffiti: FixedHash,
    pub transactions: Vec<RawTransaction>,

    /// Distance from genesis along the parent chain.
    pub height: u64,
    /// The difficulty epoch this block was validated under.
    pub epoch_id: String,
    /// This block's own contribution, `2^256 / (hash + 1)`.
    pub work: U256,
    /// Work summed from genesis to this block; the chain selection metric.
    pub accumulated_work: U256,
    pub size_bytes: u64,
    pub hash: BlockHash,
}

impl Block {
    pub fn header(&self) -> BlockHeader {
        BlockHeader {
            parent_hash: self.parent_hash,
            timestamp: self.timestamp,
            num_transactions: self.num_transactions,
            transactions_merkle_root: self.transactions_merkle_root,
            nonce: self.nonce,
            graffiti: self.graffiti,
        }
    }

    /// Strips the derived metadata back off, e.g. for re-gossip.
    pub fn to_raw(&self) -> RawBlock {
        RawBlock {
            parent_hash: self.parent_hash,
            timestamp: self.timestamp,
            num_transactions: self.num_transactions,
            transactions_merkle_root: self.transactions_merkle_root,
            nonce: self.nonce,
            graffiti: self.graffiti,
            transactions: self.transactions.clone(),
        }
    }

    pub fn is_genesis(&self) -> bool {
        self.height == 0
    }
}

impl Display for Block {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Block #{} {} (parent {}, {} txs, acc_work {})",
            self.height, self.hash, self.parent_hash, self.num_transactions, self.accumulated_work
        )
    }
}
