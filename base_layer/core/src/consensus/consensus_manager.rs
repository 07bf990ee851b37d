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

use std::sync::Arc;

use crate::{
    blocks::{genesis_block, Block},
    consensus::ConsensusConstants,
};

/// Container for the consensus rules. Cheap to clone; handed to the store, the validators and the
/// sync engine so they all agree on the same constants.
#[derive(Debug, Clone)]
pub struct ConsensusManager {
    inner: Arc<ConsensusConstants>,
}

impl ConsensusManager {
    pub fn new(constants: ConsensusConstants) -> Self {
        Self {
            inner: Arc::new(constants),
        }
    }

    pub fn consensus_constants(&self) -> &ConsensusConstants {
        &self.inner
    }

    /// The stored form of the genesis block for these constants.
    pub fn get_genesis_block(&self) -> Block {
        genesis_block::get_genesis_block(&self.inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn genesis_block_matches_constants() {
        let rules = ConsensusManager::new(ConsensusConstants::localnet());
        let genesis = rules.get_genesis_block();
        assert_eq!(genesis.hash, rules.consensus_constants().genesis_block_hash());
        assert_eq!(genesis.height, 0);
    }
}
