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

use helpers::{create_test_dag, mine_block_on, mine_chain, TestWallet};
use jarrah_core::{
    blocks::RawBlock,
    chain_storage::ChainStorageError,
    common::hash_to_u256,
    consensus::{ConsensusConstants, ConsensusConstantsBuilder},
    proof_of_work::{calculate_work, verify_pow},
    validation::ValidationError,
};
use jarrah_common_types::types::{BlockHash, FixedHash};
use primitive_types::U256;

#[test]
fn fresh_store_initialises_genesis() {
    let (dag, _tmp) = create_test_dag(ConsensusConstants::localnet());

    let tip = dag.get_current_tip().unwrap();
    assert_eq!(tip.height, 0);
    assert_eq!(tip.hash, dag.consensus().consensus_constants().genesis_block_hash());
    assert_eq!(tip.accumulated_work, U256::one());
    assert_eq!(dag.block_count().unwrap(), 1);

    let epoch = dag.get_epoch_for_block_hash(&tip.hash).unwrap().unwrap();
    assert_eq!(epoch.id(), format!("0_{}", "0".repeat(64)));
    assert_eq!(epoch.number, 0);
    assert_eq!(
        epoch.difficulty,
        dag.consensus().consensus_constants().genesis_difficulty()
    );
}

#[test]
fn reopening_does_not_reinitialise() {
    let (dag, tmp) = create_test_dag(ConsensusConstants::localnet());
    mine_chain(&dag, &dag.tip().unwrap(), 2);
    drop(dag);

    let db_path = tmp.path().join("dag.sqlite3");
    let consensus = jarrah_core::consensus::ConsensusManager::new(ConsensusConstants::localnet());
    let dag = jarrah_core::chain_storage::BlockDag::new(
        db_path.to_str().unwrap(),
        consensus,
        std::sync::Arc::new(jarrah_core::state_machine::NullStateMachine),
    )
    .unwrap();
    assert_eq!(dag.block_count().unwrap(), 3);
    assert_eq!(dag.tip().unwrap().height, 2);
}

#[test]
fn accepts_a_valid_child_and_fires_tip_event() {
    let (dag, _tmp) = create_test_dag(ConsensusConstants::localnet());
    let genesis = dag.tip().unwrap();
    let mut tip_events = dag.tip_events();

    let raw = mine_block_on(&dag, &genesis, vec![], 1000);
    dag.ingest_block(&raw).unwrap();

    let tip = dag.get_current_tip().unwrap();
    assert_eq!(tip.height, 1);
    assert_eq!(tip.hash, raw.hash());
    let expected_work = calculate_work(&hash_to_u256(&raw.hash()));
    assert_eq!(tip.accumulated_work, U256::one() + expected_work);

    let event = tip_events.try_recv().unwrap();
    assert_eq!(event.new_tip.hash, raw.hash());
    assert_eq!(event.prev_tip.hash, genesis.hash);
    assert!(tip_events.try_recv().is_err(), "exactly one tip event expected");
}

#[test]
fn rejects_tampered_proof_of_work() {
    let (dag, _tmp) = create_test_dag(ConsensusConstants::localnet());
    let genesis = dag.tip().unwrap();

    let mut raw = mine_block_on(&dag, &genesis, vec![], 1000);
    let mut nonce = *raw.nonce;
    nonce[0] ^= 0xff;
    raw.nonce = FixedHash::from(nonce);

    let err = dag.ingest_block(&raw).unwrap_err();
    assert!(matches!(
        err,
        ChainStorageError::ValidationError(ValidationError::InvalidProofOfWork { .. })
    ));
    assert!(!dag.has_block(&raw.hash()).unwrap());
    assert_eq!(dag.block_count().unwrap(), 1);
    assert_eq!(dag.tip().unwrap().hash, genesis.hash);
}

#[test]
fn rejects_unknown_parent_without_state_change() {
    let (dag, _tmp) = create_test_dag(ConsensusConstants::localnet());
    let genesis = dag.tip().unwrap();

    let raw = RawBlock::new(BlockHash::from([0x42; 32]), 1000, vec![]);
    let err = dag.ingest_block(&raw).unwrap_err();
    assert!(matches!(
        err,
        ChainStorageError::ValidationError(ValidationError::UnknownParent(parent)) if parent == BlockHash::from([0x42; 32])
    ));
    assert_eq!(dag.block_count().unwrap(), 1);
    assert_eq!(dag.tip().unwrap().hash, genesis.hash);
}

#[test]
fn rejects_duplicate_block() {
    let (dag, _tmp) = create_test_dag(ConsensusConstants::localnet());
    let genesis = dag.tip().unwrap();

    let raw = mine_block_on(&dag, &genesis, vec![], 1000);
    dag.ingest_block(&raw).unwrap();
    let err = dag.ingest_block(&raw).unwrap_err();
    assert!(matches!(err, ChainStorageError::BlockAlreadyExists(hash) if hash == raw.hash()));
    assert_eq!(dag.block_count().unwrap(), 2);
}

#[test]
fn boundary_block_opens_epoch_with_retargeted_difficulty() {
    let constants = ConsensusConstantsBuilder::new()
        .with_epoch_length(2)
        .with_target_epoch_length_millis(2000)
        .build();
    let genesis_difficulty = constants.genesis_difficulty();
    let (dag, _tmp) = create_test_dag(constants);
    let genesis = dag.tip().unwrap();

    // Height 1 stays in the genesis epoch.
    let b1 = mine_block_on(&dag, &genesis, vec![], 2000);
    dag.ingest_block(&b1).unwrap();
    let b1 = dag.get_block_by_hash(&b1.hash()).unwrap().unwrap();
    assert_eq!(
        dag.get_epoch_for_block_hash(&b1.hash).unwrap().unwrap().id(),
        genesis.epoch_id
    );

    // Height 2 is a boundary. The epoch ran exactly on target (4000ms observed vs 2000ms x 2
    // blocks), so the difficulty is unchanged.
    let b2 = mine_block_on(&dag, &b1, vec![], 4000);
    dag.ingest_block(&b2).unwrap();
    let b2 = dag.get_block_by_hash(&b2.hash()).unwrap().unwrap();
    let epoch2 = dag.get_epoch_for_block_hash(&b2.hash).unwrap().unwrap();
    assert_eq!(epoch2.start_block_hash, b2.hash);
    assert_eq!(epoch2.start_height, 2);
    assert_eq!(epoch2.number, 1);
    assert_eq!(epoch2.difficulty, genesis_difficulty);
    assert_eq!(b2.epoch_id, format!("2_{}", b2.hash.to_hex()));

    // The next epoch finishes in half the target time, so its successor is twice as hard.
    let b3 = mine_block_on(&dag, &b2, vec![], 5000);
    dag.ingest_block(&b3).unwrap();
    let b3 = dag.get_block_by_hash(&b3.hash()).unwrap().unwrap();
    let b4 = mine_block_on(&dag, &b3, vec![], 6000);
    dag.ingest_block(&b4).unwrap();

    let epoch4 = dag.get_epoch_for_block_hash(&b4.hash()).unwrap().unwrap();
    assert_eq!(epoch4.difficulty, genesis_difficulty / 2);
    assert_eq!(epoch4.start_height, 4);
    assert_eq!(epoch4.number, 2);
}

#[test]
fn lighter_sibling_does_not_displace_first_seen_tip() {
    let (dag, _tmp) = create_test_dag(ConsensusConstants::localnet());
    let genesis = dag.tip().unwrap();

    let first = mine_block_on(&dag, &genesis, vec![], 1000);
    dag.ingest_block(&first).unwrap();
    let first_tip = dag.get_current_tip().unwrap();

    // A sibling with less accumulated work never displaces the tip; mine siblings until one has
    // strictly less work than the incumbent to make the assertion meaningful.
    let mut sibling = mine_block_on(&dag, &genesis, vec![], 2000);
    while calculate_work(&hash_to_u256(&sibling.hash())) >= first_tip.work {
        sibling = mine_block_on(&dag, &genesis, vec![], sibling.timestamp + 1000);
    }
    dag.ingest_block(&sibling).unwrap();

    assert_eq!(dag.get_current_tip().unwrap().hash, first_tip.hash);
    assert_eq!(dag.tip().unwrap().hash, first_tip.hash);
}

#[test]
fn raw_block_data_round_trips_via_store() {
    let (dag, _tmp) = create_test_dag(ConsensusConstants::localnet());
    let genesis = dag.tip().unwrap();
    let wallet = TestWallet::random();
    let txs = vec![wallet.transfer([9u8; 65], 500, 2, 0), wallet.transfer([9u8; 65], 300, 1, 1)];

    let raw = mine_block_on(&dag, &genesis, txs, 1000);
    dag.ingest_block(&raw).unwrap();

    let data = dag.get_raw_block_data_by_hash(&raw.hash()).unwrap().unwrap();
    let decoded = RawBlock::from_wire_bytes(&data).unwrap();
    assert_eq!(decoded.hash(), raw.hash());
    assert_eq!(decoded.transactions, raw.transactions);
    assert!(dag.get_raw_block_data_by_hash(&BlockHash::from([7u8; 32])).unwrap().is_none());

    let stored_txs = dag.get_block_transactions(&raw.hash()).unwrap().unwrap();
    assert_eq!(stored_txs.len(), 2);
    assert_eq!(stored_txs[0].tx_index, 0);
    assert_eq!(stored_txs[0].hash, raw.transactions[0].hash());
    assert_eq!(stored_txs[1].block_hash, raw.hash());
}

// The standing invariants over a store that crossed several epoch boundaries: heights chain,
// accumulated work sums, merkle roots match, and every block satisfies its epoch's target.
#[test]
fn chain_invariants_hold_across_epochs() {
    let (dag, _tmp) = create_test_dag(ConsensusConstants::localnet());
    let genesis = dag.tip().unwrap();
    let blocks = mine_chain(&dag, &genesis, 25);
    assert_eq!(blocks.last().unwrap().height, 25);

    let hashes = dag.get_canonical_chain_hashes().unwrap();
    assert_eq!(hashes.len(), 26);
    assert_eq!(hashes[0], genesis.hash);

    let mut parent = genesis;
    for hash in &hashes[1..] {
        let block = dag.get_block_by_hash(hash).unwrap().unwrap();
        let epoch = dag.get_epoch_for_block_hash(hash).unwrap().unwrap();

        assert_eq!(block.height, parent.height + 1);
        assert_eq!(block.parent_hash, parent.hash);
        assert!(verify_pow(&block.hash, &epoch.difficulty));
        assert_eq!(
            block.accumulated_work,
            parent.accumulated_work + calculate_work(&hash_to_u256(&block.hash))
        );

        let envelopes: Vec<Vec<u8>> = block.transactions.iter().map(|tx| tx.envelope()).collect();
        assert_eq!(
            jarrah_core::common::merkle::merkle_root(&envelopes),
            block.transactions_merkle_root
        );

        // epoch membership: boundary blocks pin themselves, the rest inherit
        if block.height % 10 == 0 {
            assert_eq!(epoch.start_block_hash, block.hash);
            assert_eq!(epoch.start_height, block.height);
        } else {
            assert_eq!(block.epoch_id, parent.epoch_id);
        }

        parent = block;
    }

    // the tip is the argmax over accumulated work
    let tip = dag.get_current_tip().unwrap();
    assert_eq!(tip.hash, *hashes.last().unwrap());
}

#[test]
fn find_common_ancestor_walks_forks() {
    let (dag, _tmp) = create_test_dag(ConsensusConstants::localnet());
    let genesis = dag.tip().unwrap();
    let main = mine_chain(&dag, &genesis, 4);

    // fork off height 2
    let fork_base = &main[1];
    let fork = mine_block_on(&dag, fork_base, vec![], fork_base.timestamp + 500);
    dag.ingest_block(&fork).unwrap();

    let ancestor = dag.find_common_ancestor(&main[3].hash, &fork.hash()).unwrap();
    assert_eq!(ancestor, fork_base.hash);
    let ancestor = dag.find_common_ancestor(&fork.hash(), &genesis.hash).unwrap();
    assert_eq!(ancestor, genesis.hash);
}

#[test]
fn get_headers_after_serves_canonical_slices() {
    let (dag, _tmp) = create_test_dag(ConsensusConstants::localnet());
    let genesis = dag.tip().unwrap();
    let blocks = mine_chain(&dag, &genesis, 5);

    let headers = dag.get_headers_after(&genesis.hash, 3).unwrap();
    assert_eq!(headers.len(), 3);
    assert_eq!(headers[0].hash(), blocks[0].hash);
    assert_eq!(headers[2].hash(), blocks[2].hash);

    // from the tip there is nothing further
    assert!(dag.get_headers_after(&blocks[4].hash, 10).unwrap().is_empty());
    // unknown hashes get nothing rather than an error
    assert!(dag
        .get_headers_after(&BlockHash::from([0x99; 32]), 10)
        .unwrap()
        .is_empty());
}
