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

mod helpers;

use std::sync::Arc;

use helpers::{create_test_dag, create_test_dag_with_state_machine, mine_block_on, required_difficulty, TestWallet};
use jarrah_core::{
    blocks::{Block, RawBlock},
    chain_storage::ChainStorageError,
    consensus::{ConsensusConstants, ConsensusConstantsBuilder},
    proof_of_work::solve_pow,
    state_machine::{StateMachine, StateMachineError},
    transactions::RawTransaction,
    validation::ValidationError,
};
use jarrah_common_types::types::FixedHash;
use primitive_types::U256;

fn mine_corrupted<F: FnOnce(&mut RawBlock)>(
    dag: &jarrah_core::chain_storage::BlockDag,
    parent: &Block,
    transactions: Vec<RawTransaction>,
    timestamp: u64,
    corrupt: F,
) -> RawBlock {
    let mut block = RawBlock::new(parent.hash, timestamp, transactions);
    corrupt(&mut block);
    let target = required_difficulty(dag, parent, timestamp);
    let nonce = solve_pow(&block, U256::zero(), &target, 100_000_000).unwrap();
    block.set_nonce(nonce);
    block
}

#[test]
fn rejects_transaction_count_mismatch() {
    let (dag, _tmp) = create_test_dag(ConsensusConstants::localnet());
    let genesis = dag.tip().unwrap();

    let raw = mine_corrupted(&dag, &genesis, vec![], 1000, |b| b.num_transactions = 1);
    let err = dag.ingest_block(&raw).unwrap_err();
    assert!(matches!(
        err,
        ChainStorageError::ValidationError(ValidationError::TransactionCountMismatch { expected: 1, actual: 0 })
    ));
    assert_eq!(dag.block_count().unwrap(), 1);
}

#[test]
fn rejects_wrong_merkle_root() {
    let (dag, _tmp) = create_test_dag(ConsensusConstants::localnet());
    let genesis = dag.tip().unwrap();
    let wallet = TestWallet::random();
    let txs = vec![wallet.transfer([2u8; 65], 100, 1, 0)];

    let raw = mine_corrupted(&dag, &genesis, txs, 1000, |b| {
        b.transactions_merkle_root = FixedHash::from([0xaa; 32]);
    });
    let err = dag.ingest_block(&raw).unwrap_err();
    assert!(matches!(
        err,
        ChainStorageError::ValidationError(ValidationError::MerkleRootMismatch { .. })
    ));
}

#[test]
fn rejects_invalid_transaction_signature() {
    let (dag, _tmp) = create_test_dag(ConsensusConstants::localnet());
    let genesis = dag.tip().unwrap();
    let wallet = TestWallet::random();
    let mut tx = wallet.transfer([2u8; 65], 100, 1, 0);
    tx.amount += 1; // signature no longer covers the envelope

    let raw = mine_block_on(&dag, &genesis, vec![tx], 1000);
    let err = dag.ingest_block(&raw).unwrap_err();
    assert!(matches!(
        err,
        ChainStorageError::ValidationError(ValidationError::InvalidTransaction { index: 0, .. })
    ));
}

struct RejectingStateMachine;

impl StateMachine for RejectingStateMachine {
    fn verify_tx(&self, _tx: &RawTransaction) -> Result<(), StateMachineError> {
        Err(StateMachineError::TransactionRejected("insufficient balance".to_string()))
    }

    fn apply_block(&self, _block: &Block) -> Result<(), StateMachineError> {
        Ok(())
    }

    fn revert_block(&self, _block: &Block) -> Result<(), StateMachineError> {
        Ok(())
    }
}

#[test]
fn state_machine_rejection_fails_the_block() {
    let (dag, _tmp) =
        create_test_dag_with_state_machine(ConsensusConstants::localnet(), Arc::new(RejectingStateMachine));
    let genesis = dag.tip().unwrap();
    let wallet = TestWallet::random();

    let raw = mine_block_on(&dag, &genesis, vec![wallet.transfer([2u8; 65], 100, 1, 0)], 1000);
    let err = dag.ingest_block(&raw).unwrap_err();
    assert!(matches!(
        err,
        ChainStorageError::ValidationError(ValidationError::InvalidTransaction { index: 0, .. })
    ));

    // blocks without transactions sail through the same state machine
    let raw = mine_block_on(&dag, &genesis, vec![], 1000);
    dag.ingest_block(&raw).unwrap();
}

#[test]
fn rejects_oversize_block() {
    let constants = ConsensusConstantsBuilder::new().with_max_block_size_bytes(200).build();
    let (dag, _tmp) = create_test_dag(constants);
    let genesis = dag.tip().unwrap();
    let wallet = TestWallet::random();

    // 112-byte header + one 219-byte transaction clears the 200-byte cap
    let raw = mine_block_on(&dag, &genesis, vec![wallet.transfer([2u8; 65], 100, 1, 0)], 1000);
    let err = dag.ingest_block(&raw).unwrap_err();
    assert!(matches!(
        err,
        ChainStorageError::ValidationError(ValidationError::BlockTooLarge { size: 331, max: 200 })
    ));
}

#[test]
fn rejects_far_future_timestamp() {
    let (dag, _tmp) = create_test_dag(ConsensusConstants::localnet());
    let genesis = dag.tip().unwrap();

    let three_hours_ahead = jarrah_core::common::current_time_millis() + 3 * 60 * 60 * 1000;
    let raw = mine_block_on(&dag, &genesis, vec![], three_hours_ahead);
    let err = dag.ingest_block(&raw).unwrap_err();
    assert!(matches!(
        err,
        ChainStorageError::ValidationError(ValidationError::FutureTimestamp { .. })
    ));

    // past timestamps are fine, the retarget clamp absorbs them
    let raw = mine_block_on(&dag, &genesis, vec![], 0);
    dag.ingest_block(&raw).unwrap();
}
