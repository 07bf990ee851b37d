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

use jarrah_common_types::types::BlockHash;
use log::*;
use tokio::sync::RwLock;

use crate::{
    base_node::comms_interface::{CommsInterfaceError, MAX_BLOCKS_PER_REQUEST, MAX_HEADERS_PER_REQUEST},
    blocks::{BlockHeader, RawBlock},
    chain_storage::{AsyncBlockDag, ChainStorageError},
    mempool::{Mempool, TxInsertOutcome},
    transactions::RawTransaction,
    validation::ValidationError,
};

const LOG_TARGET: &str = "c::bn::inbound_handlers";

/// What became of a block handed to the node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NewBlockOutcome {
    Added,
    AlreadyKnown,
    /// The parent is unknown; the block was dropped and the caller should consider a chain sync.
    OrphanBlock,
}

/// Services requests arriving from the network against the local store and mempool.
#[derive(Clone)]
pub struct InboundNodeCommsHandlers {
    db: AsyncBlockDag,
    mempool: Arc<RwLock<Mempool>>,
}

impl InboundNodeCommsHandlers {
    pub fn new(db: AsyncBlockDag, mempool: Arc<RwLock<Mempool>>) -> Self {
        Self { db, mempool }
    }

    /// Ingests a block received from gossip or sync. An unknown parent is not an error here:
    /// the block is dropped and reported as an orphan so the caller can trigger a sync.
    pub async fn handle_new_block(&self, raw: RawBlock) -> Result<NewBlockOutcome, CommsInterfaceError> {
        let hash = raw.hash();
        if self.db.has_block(hash).await? {
            return Ok(NewBlockOutcome::AlreadyKnown);
        }
        match self.db.ingest_block(raw).await {
            Ok(()) => {
                debug!(target: LOG_TARGET, "Accepted new block {}", hash);
                Ok(NewBlockOutcome::Added)
            },
            Err(ChainStorageError::BlockAlreadyExists(_)) => Ok(NewBlockOutcome::AlreadyKnown),
            Err(ChainStorageError::ValidationError(ValidationError::UnknownParent(parent))) => {
                debug!(
                    target: LOG_TARGET,
                    "Block {} has unknown parent {}, dropping", hash, parent
                );
                Ok(NewBlockOutcome::OrphanBlock)
            },
            Err(e) => Err(e.into()),
        }
    }

    /// Admits a gossiped transaction to the mempool.
    pub async fn handle_new_transaction(&self, tx: RawTransaction) -> Result<TxInsertOutcome, CommsInterfaceError> {
        let outcome = self.mempool.write().await.insert(tx)?;
        Ok(outcome)
    }

    /// The header of our current tip.
    pub async fn handle_get_tip(&self) -> Result<BlockHeader, CommsInterfaceError> {
        Ok(self.db.tip()?.header())
    }

    pub async fn handle_has_block(&self, hash: BlockHash) -> Result<bool, CommsInterfaceError> {
        Ok(self.db.has_block(hash).await?)
    }

    /// Serves raw block bodies. At most [`MAX_BLOCKS_PER_REQUEST`] hashes per request; unknown
    /// hashes are silently skipped.
    pub async fn handle_get_blocks(&self, hashes: Vec<BlockHash>) -> Result<Vec<Vec<u8>>, CommsInterfaceError> {
        if hashes.len() > MAX_BLOCKS_PER_REQUEST {
            return Err(CommsInterfaceError::TooManyHashesRequested {
                requested: hashes.len(),
                max: MAX_BLOCKS_PER_REQUEST,
            });
        }
        let mut datas = Vec::with_capacity(hashes.len());
        for hash in hashes {
            match self.db.get_raw_block_data_by_hash(hash).await? {
                Some(data) => datas.push(data),
                None => trace!(target: LOG_TARGET, "Skipping unknown block {} in get_blocks", hash),
            }
        }
        Ok(datas)
    }

    /// Serves canonical-chain headers after `from`, for header sync.
    pub async fn handle_get_headers(
        &self,
        from: BlockHash,
        limit: u64,
    ) -> Result<Vec<BlockHeader>, CommsInterfaceError> {
        let limit = (limit as usize).min(MAX_HEADERS_PER_REQUEST);
        Ok(self.db.get_headers_after(from, limit).await?)
    }
}
