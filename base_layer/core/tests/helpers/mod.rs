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

#![allow(dead_code)]

use std::sync::Arc;

use jarrah_core::{
    blocks::{Block, RawBlock},
    chain_storage::BlockDag,
    consensus::{ConsensusConstants, ConsensusManager},
    proof_of_work::{next_difficulty, solve_pow},
    state_machine::{NullStateMachine, StateMachine},
    transactions::RawTransaction,
};
use k256::ecdsa::{signature::Signer, Signature, SigningKey};
use primitive_types::U256;
use rand::rngs::OsRng;
use tempfile::TempDir;

/// Opens a fresh DAG in a temp directory. The directory guard must be kept alive for the duration
/// of the test.
pub fn create_test_dag(constants: ConsensusConstants) -> (Arc<BlockDag>, TempDir) {
    create_test_dag_with_state_machine(constants, Arc::new(NullStateMachine))
}

pub fn create_test_dag_with_state_machine(
    constants: ConsensusConstants,
    state_machine: Arc<dyn StateMachine>,
) -> (Arc<BlockDag>, TempDir) {
    let tmp = TempDir::new().unwrap();
    let db_path = tmp.path().join("dag.sqlite3");
    let consensus = ConsensusManager::new(constants);
    let dag = BlockDag::new(db_path.to_str().unwrap(), consensus, state_machine).unwrap();
    (Arc::new(dag), tmp)
}

/// The difficulty target the DAG will judge a child of `parent` against, including a boundary
/// retarget when the child opens a new epoch.
pub fn required_difficulty(dag: &BlockDag, parent: &Block, timestamp: u64) -> U256 {
    let constants = dag.consensus().consensus_constants().clone();
    let epoch = dag.get_epoch_for_block_hash(&parent.hash).unwrap().unwrap();
    let height = parent.height + 1;
    if height % constants.epoch_length_blocks() == 0 {
        next_difficulty(&epoch, timestamp, &constants)
    } else {
        epoch.difficulty
    }
}

/// Mines a child of `parent` against the difficulty the store will demand of it.
pub fn mine_block_on(dag: &BlockDag, parent: &Block, transactions: Vec<RawTransaction>, timestamp: u64) -> RawBlock {
    let target = required_difficulty(dag, parent, timestamp);
    mine_block_with_target(parent, transactions, timestamp, &target)
}

/// Mines a child of `parent` against an explicit target. A stricter target than required still
/// validates and contributes proportionally more work.
pub fn mine_block_with_target(
    parent: &Block,
    transactions: Vec<RawTransaction>,
    timestamp: u64,
    target: &U256,
) -> RawBlock {
    let mut block = RawBlock::new(parent.hash, timestamp, transactions);
    let nonce = solve_pow(&block, U256::zero(), target, 100_000_000).unwrap();
    block.set_nonce(nonce);
    block
}

/// Mines and ingests `count` empty blocks on top of `parent`, with timestamps one target
/// interval apart, returning the stored blocks oldest first.
pub fn mine_chain(dag: &BlockDag, parent: &Block, count: u64) -> Vec<Block> {
    let interval = dag.consensus().consensus_constants().target_epoch_length_millis();
    let mut blocks = Vec::with_capacity(count as usize);
    let mut parent = parent.clone();
    for _ in 0..count {
        let timestamp = parent.timestamp + interval;
        let raw = mine_block_on(dag, &parent, vec![], timestamp);
        dag.ingest_block(&raw).unwrap();
        let stored = dag.get_block_by_hash(&raw.hash()).unwrap().unwrap();
        blocks.push(stored.clone());
        parent = stored;
    }
    blocks
}

/// A throwaway secp256k1 keypair for signing test transactions.
pub struct TestWallet {
    signing_key: SigningKey,
    pub pubkey: [u8; 65],
}

impl TestWallet {
    pub fn random() -> Self {
        let signing_key = SigningKey::random(&mut OsRng);
        let point = signing_key.verifying_key().to_encoded_point(false);
        let mut pubkey = [0u8; 65];
        pubkey.copy_from_slice(point.as_bytes());
        Self { signing_key, pubkey }
    }

    pub fn transfer(&self, to: [u8; 65], amount: u64, fee: u64, nonce: u64) -> RawTransaction {
        let mut tx = RawTransaction {
            version: 1,
            sig: [0u8; 64],
            from_pubkey: self.pubkey,
            to_pubkey: to,
            amount,
            fee,
            nonce,
        };
        let signature: Signature = self.signing_key.sign(&tx.envelope());
        tx.sig.copy_from_slice(&signature.to_bytes());
        tx
    }
}
