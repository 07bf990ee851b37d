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

use crate::{
    base_node::sync::SyncError,
    blocks::{Block, BlockHeader},
    consensus::ConsensusManager,
    proof_of_work::{next_difficulty, verify_pow, Epoch},
};

/// Validates a stream of headers downloaded during sync, in chain order, without bodies.
///
/// Starting from a locally known block and its epoch, each header must link to the previous one
/// and satisfy the proof of work of the epoch it falls in. Epoch state is simulated forward
/// through the retarget rule as boundary headers pass, so a whole remote chain segment can be
/// judged before a single body is fetched. Timestamps are only constrained as far as the retarget
/// formula needs them (the epoch-duration clamp absorbs non-monotone values).
pub struct HeaderSyncValidator {
    consensus: ConsensusManager,
    prev_hash: BlockHash,
    prev_height: u64,
    epoch: Epoch,
}

impl HeaderSyncValidator {
    /// `start_block` is the common ancestor the headers extend; `epoch` is its epoch.
    pub fn new(start_block: &Block, epoch: Epoch, consensus: ConsensusManager) -> Self {
        Self {
            consensus,
            prev_hash: start_block.hash,
            prev_height: start_block.height,
            epoch,
        }
    }

    /// Validates the next header in the chain. Returns its hash on success and advances the
    /// simulated chain state.
    pub fn validate(&mut self, header: &BlockHeader) -> Result<BlockHash, SyncError> {
        let height = self.prev_height + 1;
        if header.parent_hash != self.prev_hash {
            return Err(SyncError::InvalidHeaderChaining {
                height,
                expected_parent: self.prev_hash,
            });
        }

        let hash = header.hash();
        let constants = self.consensus.consensus_constants();
        if height % constants.epoch_length_blocks() == 0 {
            let difficulty = next_difficulty(&self.epoch, header.timestamp, constants);
            self.epoch = Epoch {
                number: height / constants.epoch_length_blocks(),
                start_block_hash: hash,
                start_time: header.timestamp,
                start_height: height,
                difficulty,
            };
        }

        if !verify_pow(&hash, &self.epoch.difficulty) {
            return Err(SyncError::HeaderPowFailed { hash });
        }

        self.prev_hash = hash;
        self.prev_height = height;
        Ok(hash)
    }

    /// Height of the last accepted header.
    pub fn height(&self) -> u64 {
        self.prev_height
    }
}
