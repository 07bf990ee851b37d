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

use crate::consensus::ConsensusConstants;

/// A contiguous run of blocks sharing one difficulty target. A boundary block (height divisible
/// by the epoch length) begins a new epoch pinned to itself; every other block inherits its
/// parent's epoch.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Epoch {
    pub number: u64,
    /// The boundary block that opened this epoch.
    pub start_block_hash: BlockHash,
    /// Timestamp of the boundary block, in milliseconds.
    pub start_time: u64,
    pub start_height: u64,
    /// The difficulty target every block in this epoch must satisfy.
    pub difficulty: U256,
}

impl Epoch {
    /// The epoch's globally unique id. Height plus hash pins a single point in any valid chain,
    /// so two epochs on competing forks can never collide.
    pub fn id(&self) -> String {
        epoch_id(&self.start_block_hash, self.start_height)
    }

    /// Epoch zero, opened by the genesis block.
    pub fn genesis(constants: &ConsensusConstants) -> Self {
        Self {
            number: 0,
            start_block_hash: constants.genesis_block_hash(),
            start_time: 0,
            start_height: 0,
            difficulty: constants.genesis_difficulty(),
        }
    }
}

pub fn epoch_id(start_block_hash: &BlockHash, start_height: u64) -> String {
    format!("{}_{}", start_height, start_block_hash.to_hex())
}
