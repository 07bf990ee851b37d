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

//! The unconfirmed transaction set. Deliberately just a set: prioritisation, fee markets and
//! replacement policies are not this node's business.

use std::{collections::HashMap, sync::Arc};

use jarrah_common_types::types::TxHash;
use log::*;
use thiserror::Error;

use crate::{
    blocks::Block,
    state_machine::StateMachine,
    transactions::{signature::verify_signature, RawTransaction, TransactionError},
};

const LOG_TARGET: &str = "c::mp::mempool";

/// How deep an orphaned block may be, measured from the new tip, for its transactions to be
/// returned to the pool after a reorg. Roughly one day of blocks.
pub const MEMPOOL_REORG_DEPTH_WINDOW: u64 = 144;

const DEFAULT_STORAGE_CAPACITY: usize = 10_000;

#[derive(Debug, Error)]
pub enum MempoolError {
    #[error("Transaction failed validation: {0}")]
    Transaction(#[from] TransactionError),
}

/// What happened to a submitted transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxInsertOutcome {
    Inserted,
    AlreadyKnown,
    PoolFull,
}

#[derive(Debug, Clone, Copy)]
pub struct MempoolConfig {
    /// Maximum number of transactions held; inserts beyond this are refused.
    pub storage_capacity: usize,
}

impl Default for MempoolConfig {
    fn default() -> Self {
        Self {
            storage_capacity: DEFAULT_STORAGE_CAPACITY,
        }
    }
}

/// The set of unconfirmed transactions, keyed by transaction hash. The owner wraps this in a
/// lock; all methods are plain synchronous mutations.
pub struct Mempool {
    config: MempoolConfig,
    txs: HashMap<TxHash, RawTransaction>,
    state_machine: Arc<dyn StateMachine>,
}

impl Mempool {
    pub fn new(config: MempoolConfig, state_machine: Arc<dyn StateMachine>) -> Self {
        Self {
            config,
            txs: HashMap::new(),
            state_machine,
        }
    }

    /// Validates and admits a transaction. Signature and state-machine failures are errors (the
    /// sender handed us garbage); duplicates and a full pool are ordinary outcomes.
    pub fn insert(&mut self, tx: RawTransaction) -> Result<TxInsertOutcome, MempoolError> {
        let hash = tx.hash();
        if self.txs.contains_key(&hash) {
            return Ok(TxInsertOutcome::AlreadyKnown);
        }
        if self.txs.len() >= self.config.storage_capacity {
            return Ok(TxInsertOutcome::PoolFull);
        }

        verify_signature(&tx.from_pubkey, &tx.sig, &tx.envelope()).map_err(TransactionError::from)?;
        self.state_machine.verify_tx(&tx).map_err(TransactionError::from)?;

        debug!(target: LOG_TARGET, "Inserting tx {} into mempool", hash);
        self.txs.insert(hash, tx);
        Ok(TxInsertOutcome::Inserted)
    }

    pub fn contains(&self, hash: &TxHash) -> bool {
        self.txs.contains_key(hash)
    }

    pub fn len(&self) -> usize {
        self.txs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.txs.is_empty()
    }

    /// A copy of the current pool contents, e.g. for building a block template.
    pub fn snapshot(&self) -> Vec<RawTransaction> {
        self.txs.values().cloned().collect()
    }

    /// Drops every transaction that was sequenced in `block`.
    pub fn remove_published(&mut self, block: &Block) {
        for tx in &block.transactions {
            self.txs.remove(&tx.hash());
        }
    }

    /// Reconciles the pool across a tip change. Transactions from orphaned blocks within the
    /// depth window are returned to the pool, everything sequenced on the new branch is removed,
    /// and the survivors are re-checked against the state machine.
    pub fn process_reorg(&mut self, applied: &[Block], reverted: &[Block], new_tip_height: u64) {
        for block in reverted {
            if new_tip_height.saturating_sub(block.height) > MEMPOOL_REORG_DEPTH_WINDOW {
                continue;
            }
            for tx in &block.transactions {
                match self.insert(tx.clone()) {
                    Ok(TxInsertOutcome::Inserted) => {},
                    Ok(_) => {},
                    Err(e) => debug!(
                        target: LOG_TARGET,
                        "Orphaned tx {} not reinserted: {}",
                        tx.hash(),
                        e
                    ),
                }
            }
        }
        for block in applied {
            self.remove_published(block);
        }
        self.revalidate();
        debug!(
            target: LOG_TARGET,
            "Mempool reconciled after reorg, {} txs pending",
            self.txs.len()
        );
    }

    /// Drops pool entries the state machine no longer accepts.
    pub fn revalidate(&mut self) {
        let state_machine = self.state_machine.clone();
        self.txs.retain(|hash, tx| match state_machine.verify_tx(tx) {
            Ok(()) => true,
            Err(e) => {
                debug!(target: LOG_TARGET, "Dropping tx {} on revalidation: {}", hash, e);
                false
            },
        });
    }
}

#[cfg(test)]
mod tests {
    use k256::ecdsa::{signature::Signer, Signature, SigningKey};
    use rand::rngs::OsRng;

    use super::*;
    use crate::state_machine::{NullStateMachine, StateMachineError};

    fn signed_tx(amount: u64) -> RawTransaction {
        let sk = SigningKey::random(&mut OsRng);
        let point = sk.verifying_key().to_encoded_point(false);
        let mut from_pubkey = [0u8; 65];
        from_pubkey.copy_from_slice(point.as_bytes());
        let mut tx = RawTransaction {
            version: 1,
            sig: [0u8; 64],
            from_pubkey,
            to_pubkey: [3u8; 65],
            amount,
            fee: 1,
            nonce: 0,
        };
        let signature: Signature = sk.sign(&tx.envelope());
        tx.sig.copy_from_slice(&signature.to_bytes());
        tx
    }

    fn test_pool() -> Mempool {
        Mempool::new(MempoolConfig::default(), Arc::new(NullStateMachine))
    }

    #[test]
    fn insert_deduplicates() {
        let mut pool = test_pool();
        let tx = signed_tx(100);
        assert_eq!(pool.insert(tx.clone()).unwrap(), TxInsertOutcome::Inserted);
        assert_eq!(pool.insert(tx.clone()).unwrap(), TxInsertOutcome::AlreadyKnown);
        assert_eq!(pool.len(), 1);
        assert!(pool.contains(&tx.hash()));
    }

    #[test]
    fn insert_rejects_bad_signature() {
        let mut pool = test_pool();
        let mut tx = signed_tx(100);
        tx.sig[0] ^= 0xff;
        assert!(pool.insert(tx).is_err());
        assert!(pool.is_empty());
    }

    #[test]
    fn capacity_is_enforced() {
        let mut pool = Mempool::new(MempoolConfig { storage_capacity: 1 }, Arc::new(NullStateMachine));
        assert_eq!(pool.insert(signed_tx(1)).unwrap(), TxInsertOutcome::Inserted);
        assert_eq!(pool.insert(signed_tx(2)).unwrap(), TxInsertOutcome::PoolFull);
    }

    struct RejectEverything;

    impl StateMachine for RejectEverything {
        fn verify_tx(&self, _tx: &RawTransaction) -> Result<(), StateMachineError> {
            Err(StateMachineError::TransactionRejected("no".to_string()))
        }

        fn apply_block(&self, _block: &Block) -> Result<(), StateMachineError> {
            Ok(())
        }

        fn revert_block(&self, _block: &Block) -> Result<(), StateMachineError> {
            Ok(())
        }
    }

    #[test]
    fn state_machine_gates_insert() {
        let mut pool = Mempool::new(MempoolConfig::default(), Arc::new(RejectEverything));
        assert!(pool.insert(signed_tx(5)).is_err());
    }
}
