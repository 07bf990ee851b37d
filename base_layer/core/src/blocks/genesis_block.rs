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

use jarrah_common_types::types::BlockHash;
use primitive_types::U256;

use crate::{
    blocks::{Block, RawBlock},
    consensus::ConsensusConstants,
    proof_of_work::Epoch,
};

/// The network form of the genesis block: all-zero parent, timestamp zero, no transactions, zero
/// nonce. Its stored identity is the *configured* genesis hash, not the hash of these fields, so
/// that a network can pin any identity it likes.
pub fn get_genesis_raw_block(_constants: &ConsensusConstants) -> RawBlock {
    RawBlock::new(BlockHash::zero(), 0, Vec::new())
}

/// The stored form of the genesis block. Accumulated work starts at the sentinel value 1; every
/// descendant adds its own work on top.
pub fn get_genesis_block(constants: &ConsensusConstants) -> Block {
    let raw = get_genesis_raw_block(constants);
    let epoch = Epoch::genesis(constants);
    let size_bytes = raw.size_bytes();
    Block {
        parent_hash: raw.parent_hash,
        timestamp: raw.timestamp,
        num_transactions: raw.num_transactions,
        transactions_merkle_root: raw.transactions_merkle_root,
        nonce: raw.nonce,
        graffiti: raw.graffiti,
        transactions: raw.transactions,
        height: 0,
        epoch_id: epoch.id(),
        work: U256::one(),
        accumulated_work: U256::one(),
        size_bytes,
        hash: constants.genesis_block_hash(),
    }
}
