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

use log::*;

use crate::{
    blocks::{Block, RawBlock},
    chain_storage::{BlockDag, ChainStorageError},
    common::{current_time_millis, hash_to_u256, merkle::merkle_root},
    consensus::ConsensusManager,
    proof_of_work::{calculate_work, next_difficulty, verify_pow, Epoch},
    state_machine::StateMachine,
    transactions::signature::verify_signature,
    validation::ValidationError,
};

const LOG_TARGET: &str = "c::val::block_validator";

/// The output of a successful validation run: the stored form of the block and the epoch it was
/// judged under. `opens_epoch` marks a boundary block, whose epoch row must be inserted in the
/// same transaction as the block itself.
#[derive(Debug, Clone)]
pub struct CandidateBlock {
    pub block: Block,
    pub epoch: Epoch,
    pub opens_epoch: bool,
}

/// Runs the full block-acceptance pipeline. Checks run in a fixed order and the first failure
/// aborts with no state change; the store commits the returned candidate atomically afterwards.
pub struct BlockValidator {
    consensus: ConsensusManager,
    state_machine: Arc<dyn StateMachine>,
}

impl BlockValidator {
    pub fn new(consensus: ConsensusManager, state_machine: Arc<dyn StateMachine>) -> Self {
        Self {
            consensus,
            state_machine,
        }
    }

    pub fn validate(&self, dag: &BlockDag, raw: &RawBlock) -> Result<CandidateBlock, ChainStorageError> {
        let constants = self.consensus.consensus_constants();
        let hash = raw.hash();

        // 1. The parent must already be in the store; orphans are never retained.
        let parent = dag
            .get_block_by_hash(&raw.parent_hash)?
            .ok_or(ValidationError::UnknownParent(raw.parent_hash))?;

        // 2. Reject timestamps from the far future. Past timestamps are allowed; the retarget
        // duration clamp absorbs them.
        let limit = constants.future_time_limit(current_time_millis());
        if raw.timestamp > limit {
            return Err(ValidationError::FutureTimestamp {
                timestamp: raw.timestamp,
                limit,
            }
            .into());
        }

        // 3. The declared count must match the body.
        if raw.num_transactions != raw.transactions.len() as u64 {
            return Err(ValidationError::TransactionCountMismatch {
                expected: raw.num_transactions,
                actual: raw.transactions.len() as u64,
            }
            .into());
        }

        // 4. Each transaction must carry a valid signature over its envelope and pass the state
        // machine.
        for (index, tx) in raw.transactions.iter().enumerate() {
            verify_signature(&tx.from_pubkey, &tx.sig, &tx.envelope()).map_err(|e| {
                ValidationError::InvalidTransaction {
                    index,
                    source: e.into(),
                }
            })?;
            self.state_machine
                .verify_tx(tx)
                .map_err(|e| ValidationError::InvalidTransaction {
                    index,
                    source: e.into(),
                })?;
        }

        // 5. The header must commit to exactly these transactions.
        let envelopes: Vec<Vec<u8>> = raw.transactions.iter().map(|tx| tx.envelope()).collect();
        let computed_root = merkle_root(&envelopes);
        if computed_root != raw.transactions_merkle_root {
            return Err(ValidationError::MerkleRootMismatch {
                claimed: raw.transactions_merkle_root,
                computed: computed_root,
            }
            .into());
        }

        // 6. Determine the epoch this block belongs to. A boundary block retargets and opens a
        // new epoch pinned to itself; anything else inherits the parent's.
        let height = parent.height + 1;
        let parent_epoch = dag
            .get_epoch_for_block_hash(&raw.parent_hash)?
            .ok_or_else(|| ChainStorageError::CorruptedDatabase(format!("No epoch for block {}", raw.parent_hash)))?;
        let (epoch, opens_epoch) = if height % constants.epoch_length_blocks() == 0 {
            let difficulty = next_difficulty(&parent_epoch, raw.timestamp, constants);
            debug!(
                target: LOG_TARGET,
                "Retargeting at height {}: difficulty {} -> {}", height, parent_epoch.difficulty, difficulty
            );
            let epoch = Epoch {
                number: height / constants.epoch_length_blocks(),
                start_block_hash: hash,
                start_time: raw.timestamp,
                start_height: height,
                difficulty,
            };
            (epoch, true)
        } else {
            (parent_epoch, false)
        };

        // 7. The proof of work is judged against the epoch the block belongs to; for a boundary
        // block that is the epoch it just opened.
        if !verify_pow(&hash, &epoch.difficulty) {
            return Err(ValidationError::InvalidProofOfWork { hash }.into());
        }

        // 8. Size limit.
        let size_bytes = raw.size_bytes();
        if size_bytes > constants.max_block_size_bytes() {
            return Err(ValidationError::BlockTooLarge {
                size: size_bytes,
                max: constants.max_block_size_bytes(),
            }
            .into());
        }

        let work = calculate_work(&hash_to_u256(&hash));
        let block = Block {
            parent_hash: raw.parent_hash,
            timestamp: raw.timestamp,
            num_transactions: raw.num_transactions,
            transactions_merkle_root: raw.transactions_merkle_root,
            nonce: raw.nonce,
            graffiti: raw.graffiti,
            transactions: raw.transactions.clone(),
            height,
            epoch_id: epoch.id(),
            work,
            accumulated_work: parent.accumulated_work.saturating_add(work),
            size_bytes,
            hash,
        };

        Ok(CandidateBlock {
            block,
            epoch,
            opens_epoch,
        })
    }
}
