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

use diesel::prelude::*;
use jarrah_common_types::types::{BlockHash, FixedHash};
use primitive_types::U256;

use crate::{
    blocks::{Block, BlockHeader},
    chain_storage::{
        error::ChainStorageError,
        schema::{blocks, epochs, transactions},
    },
    common::{hash_to_u256, u256_from_bytes, u256_to_bytes},
    consensus::ConsensusConstants,
    proof_of_work::{calculate_work, Epoch},
    transactions::{RawTransaction, Transaction},
};

fn stored_hash(bytes: &[u8], what: &str) -> Result<FixedHash, ChainStorageError> {
    FixedHash::try_from(bytes).map_err(|_| ChainStorageError::CorruptedDatabase(format!("Bad {} length", what)))
}

fn stored_array<const N: usize>(bytes: &[u8], what: &str) -> Result<[u8; N], ChainStorageError> {
    bytes
        .try_into()
        .map_err(|_| ChainStorageError::CorruptedDatabase(format!("Bad {} length", what)))
}

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = blocks)]
pub struct BlockSql {
    pub id: i32,
    pub hash: Vec<u8>,
    pub parent_hash: Vec<u8>,
    pub difficulty: Vec<u8>,
    pub timestamp: i64,
    pub num_transactions: i64,
    pub transactions_merkle_root: Vec<u8>,
    pub nonce: Vec<u8>,
    pub graffiti: Vec<u8>,
    pub height: i64,
    pub epoch: String,
    pub size_bytes: i64,
    pub acc_work: Vec<u8>,
}

impl BlockSql {
    /// Rehydrates the stored block. Per-block work is derived from the hash rather than stored;
    /// accumulated work is authoritative from the row.
    pub fn into_block(self, transactions: Vec<RawTransaction>) -> Result<Block, ChainStorageError> {
        let hash = stored_hash(&self.hash, "block hash")?;
        Ok(Block {
            parent_hash: stored_hash(&self.parent_hash, "parent hash")?,
            timestamp: self.timestamp as u64,
            num_transactions: self.num_transactions as u64,
            transactions_merkle_root: stored_hash(&self.transactions_merkle_root, "merkle root")?,
            nonce: stored_hash(&self.nonce, "nonce")?,
            graffiti: stored_hash(&self.graffiti, "graffiti")?,
            transactions,
            height: self.height as u64,
            epoch_id: self.epoch,
            work: calculate_work(&hash_to_u256(&hash)),
            accumulated_work: u256_from_bytes(&self.acc_work),
            size_bytes: self.size_bytes as u64,
            hash,
        })
    }

    /// A header view straight off the row, without touching the transactions table.
    pub fn to_header(&self) -> Result<BlockHeader, ChainStorageError> {
        Ok(BlockHeader {
            parent_hash: stored_hash(&self.parent_hash, "parent hash")?,
            timestamp: self.timestamp as u64,
            num_transactions: self.num_transactions as u64,
            transactions_merkle_root: stored_hash(&self.transactions_merkle_root, "merkle root")?,
            nonce: stored_hash(&self.nonce, "nonce")?,
            graffiti: stored_hash(&self.graffiti, "graffiti")?,
        })
    }

    pub fn block_hash(&self) -> Result<BlockHash, ChainStorageError> {
        stored_hash(&self.hash, "block hash")
    }

    pub fn parent_block_hash(&self) -> Result<BlockHash, ChainStorageError> {
        stored_hash(&self.parent_hash, "parent hash")
    }

    pub fn accumulated_work(&self) -> U256 {
        u256_from_bytes(&self.acc_work)
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = blocks)]
pub struct NewBlockSql {
    pub hash: Vec<u8>,
    pub parent_hash: Vec<u8>,
    pub difficulty: Vec<u8>,
    pub timestamp: i64,
    pub num_transactions: i64,
    pub transactions_merkle_root: Vec<u8>,
    pub nonce: Vec<u8>,
    pub graffiti: Vec<u8>,
    pub height: i64,
    pub epoch: String,
    pub size_bytes: i64,
    pub acc_work: Vec<u8>,
}

impl NewBlockSql {
    pub fn from_block(block: &Block, difficulty: &U256) -> Self {
        Self {
            hash: block.hash.to_vec(),
            parent_hash: block.parent_hash.to_vec(),
            difficulty: u256_to_bytes(difficulty).to_vec(),
            timestamp: block.timestamp as i64,
            num_transactions: block.num_transactions as i64,
            transactions_merkle_root: block.transactions_merkle_root.to_vec(),
            nonce: block.nonce.to_vec(),
            graffiti: block.graffiti.to_vec(),
            height: block.height as i64,
            epoch: block.epoch_id.clone(),
            size_bytes: block.size_bytes as i64,
            acc_work: u256_to_bytes(&block.accumulated_work).to_vec(),
        }
    }
}

#[derive(Debug, Clone, Queryable, Insertable)]
#[diesel(table_name = epochs)]
pub struct EpochSql {
    pub id: String,
    pub start_block_hash: Vec<u8>,
    pub start_time: i64,
    pub start_height: i64,
    pub difficulty: Vec<u8>,
}

impl EpochSql {
    pub fn from_epoch(epoch: &Epoch) -> Self {
        Self {
            id: epoch.id(),
            start_block_hash: epoch.start_block_hash.to_vec(),
            start_time: epoch.start_time as i64,
            start_height: epoch.start_height as i64,
            difficulty: u256_to_bytes(&epoch.difficulty).to_vec(),
        }
    }

    /// The epoch number is not stored; it falls out of the start height and the configured epoch
    /// length.
    pub fn into_epoch(self, constants: &ConsensusConstants) -> Result<Epoch, ChainStorageError> {
        let start_height = self.start_height as u64;
        Ok(Epoch {
            number: start_height / constants.epoch_length_blocks().max(1),
            start_block_hash: stored_hash(&self.start_block_hash, "epoch start hash")?,
            start_time: self.start_time as u64,
            start_height,
            difficulty: u256_from_bytes(&self.difficulty),
        })
    }
}

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = transactions)]
pub struct TransactionSql {
    pub id: i32,
    pub hash: Vec<u8>,
    pub block_hash: Vec<u8>,
    pub tx_index: i64,
    pub version: i16,
    pub sig: Vec<u8>,
    pub from_pubkey: Vec<u8>,
    pub to_pubkey: Vec<u8>,
    pub amount: i64,
    pub fee: i64,
    pub nonce: i64,
}

impl TransactionSql {
    pub fn into_raw(self) -> Result<RawTransaction, ChainStorageError> {
        Ok(RawTransaction {
            version: self.version as u8,
            sig: stored_array(&self.sig, "signature")?,
            from_pubkey: stored_array(&self.from_pubkey, "from pubkey")?,
            to_pubkey: stored_array(&self.to_pubkey, "to pubkey")?,
            amount: self.amount as u64,
            fee: self.fee as u64,
            nonce: self.nonce as u64,
        })
    }

    pub fn into_transaction(self) -> Result<Transaction, ChainStorageError> {
        let block_hash = stored_hash(&self.block_hash, "tx block hash")?;
        let tx_index = self.tx_index as u64;
        let raw = self.into_raw()?;
        Ok(Transaction::from_raw(&raw, block_hash, tx_index))
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = transactions)]
pub struct NewTransactionSql {
    pub hash: Vec<u8>,
    pub block_hash: Vec<u8>,
    pub tx_index: i64,
    pub version: i16,
    pub sig: Vec<u8>,
    pub from_pubkey: Vec<u8>,
    pub to_pubkey: Vec<u8>,
    pub amount: i64,
    pub fee: i64,
    pub nonce: i64,
}

impl NewTransactionSql {
    pub fn from_raw(tx: &RawTransaction, block_hash: &BlockHash, tx_index: u64) -> Self {
        Self {
            hash: tx.hash().to_vec(),
            block_hash: block_hash.to_vec(),
            tx_index: tx_index as i64,
            version: tx.version as i16,
            sig: tx.sig.to_vec(),
            from_pubkey: tx.from_pubkey.to_vec(),
            to_pubkey: tx.to_pubkey.to_vec(),
            amount: tx.amount as i64,
            fee: tx.fee as i64,
            nonce: tx.nonce as i64,
        }
    }
}
