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

/// The set of consensus values every peer on a network must agree on. A node whose constants
/// differ from its peers will never converge on the same chain.
#[derive(Debug, Clone)]
pub struct ConsensusConstants {
    /// The number of blocks in a difficulty epoch.
    epoch_length_blocks: u64,
    /// Target milliseconds per block; an epoch of N blocks targets N times this value.
    target_epoch_length_millis: u64,
    /// The difficulty target of the genesis epoch.
    genesis_difficulty: U256,
    /// The hash under which the genesis block is stored.
    genesis_block_hash: BlockHash,
    /// Maximum encoded block size accepted by validation.
    max_block_size_bytes: u64,
    /// How far ahead of the local clock a block timestamp may be, in milliseconds.
    future_time_limit_millis: u64,
}

/// Two hours, the conventional tolerance for clock drift between miners.
const FUTURE_TIME_LIMIT_MILLIS: u64 = 2 * 60 * 60 * 1000;

impl ConsensusConstants {
    /// Constants for a local, single-machine network. The genesis difficulty is low enough that
    /// blocks can be mined in a test without noticeable delay.
    pub fn localnet() -> Self {
        Self {
            epoch_length_blocks: 10,
            target_epoch_length_millis: 1_000,
            genesis_difficulty: U256::MAX >> 4,
            genesis_block_hash: BlockHash::zero(),
            max_block_size_bytes: 1_000_000,
            future_time_limit_millis: FUTURE_TIME_LIMIT_MILLIS,
        }
    }

    /// The number of blocks in a difficulty epoch.
    pub fn epoch_length_blocks(&self) -> u64 {
        self.epoch_length_blocks
    }

    /// Target milliseconds per block; an epoch of N blocks targets N times this value.
    pub fn target_epoch_length_millis(&self) -> u64 {
        self.target_epoch_length_millis
    }

    /// The difficulty target of the genesis epoch.
    pub fn genesis_difficulty(&self) -> U256 {
        self.genesis_difficulty
    }

    /// The hash under which the genesis block is stored.
    pub fn genesis_block_hash(&self) -> BlockHash {
        self.genesis_block_hash
    }

    /// Maximum encoded block size accepted by validation.
    pub fn max_block_size_bytes(&self) -> u64 {
        self.max_block_size_bytes
    }

    /// The latest acceptable block timestamp given the local clock, in milliseconds.
    pub fn future_time_limit(&self, now_millis: u64) -> u64 {
        now_millis.saturating_add(self.future_time_limit_millis)
    }
}

/// Builder used by tests and local deployments to adjust individual constants.
#[derive(Debug, Clone)]
pub struct ConsensusConstantsBuilder {
    constants: ConsensusConstants,
}

impl ConsensusConstantsBuilder {
    pub fn new() -> Self {
        Self {
            constants: ConsensusConstants::localnet(),
        }
    }

    pub fn with_epoch_length(mut self, epoch_length_blocks: u64) -> Self {
        self.constants.epoch_length_blocks = epoch_length_blocks;
        self
    }

    pub fn with_target_epoch_length_millis(mut self, millis: u64) -> Self {
        self.constants.target_epoch_length_millis = millis;
        self
    }

    pub fn with_genesis_difficulty(mut self, difficulty: U256) -> Self {
        self.constants.genesis_difficulty = difficulty;
        self
    }

    pub fn with_genesis_block_hash(mut self, hash: BlockHash) -> Self {
        self.constants.genesis_block_hash = hash;
        self
    }

    pub fn with_max_block_size_bytes(mut self, max: u64) -> Self {
        self.constants.max_block_size_bytes = max;
        self
    }

    pub fn build(self) -> ConsensusConstants {
        self.constants
    }
}

impl Default for ConsensusConstantsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_overrides_selected_values() {
        let constants = ConsensusConstantsBuilder::new()
            .with_epoch_length(2)
            .with_target_epoch_length_millis(2000)
            .build();
        assert_eq!(constants.epoch_length_blocks(), 2);
        assert_eq!(constants.target_epoch_length_millis(), 2000);
        assert_eq!(constants.genesis_difficulty(), U256::MAX >> 4);
        // untouched values come from the localnet preset
        assert_eq!(constants.max_block_size_bytes(), 1_000_000);
    }

    #[test]
    fn future_time_limit_saturates() {
        let constants = ConsensusConstants::localnet();
        assert_eq!(constants.future_time_limit(u64::MAX), u64::MAX);
        assert_eq!(constants.future_time_limit(0), FUTURE_TIME_LIMIT_MILLIS);
    }
}
