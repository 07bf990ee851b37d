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
use tokio::{sync::broadcast, task};

use crate::{
    blocks::{Block, BlockHeader, RawBlock},
    chain_storage::{block_dag::TipChanged, BlockDag, ChainStorageError},
    consensus::ConsensusManager,
    proof_of_work::Epoch,
};

/// Async facade over [`BlockDag`]. Database work is blocking (diesel), so every call hops onto
/// the blocking thread pool; the node's async tasks never stall the runtime on SQLite I/O.
#[derive(Clone)]
pub struct AsyncBlockDag {
    db: Arc<BlockDag>,
}

impl AsyncBlockDag {
    pub fn new(db: Arc<BlockDag>) -> Self {
        Self { db }
    }

    pub fn inner(&self) -> &Arc<BlockDag> {
        &self.db
    }

    pub fn consensus(&self) -> ConsensusManager {
        self.db.consensus().clone()
    }

    pub fn tip_events(&self) -> broadcast::Receiver<TipChanged> {
        self.db.tip_events()
    }

    /// Cached tip; does not touch the database.
    pub fn tip(&self) -> Result<Block, ChainStorageError> {
        self.db.tip()
    }

    pub async fn ingest_block(&self, raw: RawBlock) -> Result<(), ChainStorageError> {
        self.spawn(move |db| db.ingest_block(&raw)).await
    }

    pub async fn get_block_by_hash(&self, hash: BlockHash) -> Result<Option<Block>, ChainStorageError> {
        self.spawn(move |db| db.get_block_by_hash(&hash)).await
    }

    pub async fn has_block(&self, hash: BlockHash) -> Result<bool, ChainStorageError> {
        self.spawn(move |db| db.has_block(&hash)).await
    }

    pub async fn get_current_tip(&self) -> Result<Block, ChainStorageError> {
        self.spawn(move |db| db.get_current_tip()).await
    }

    pub async fn get_epoch_for_block_hash(&self, hash: BlockHash) -> Result<Option<Epoch>, ChainStorageError> {
        self.spawn(move |db| db.get_epoch_for_block_hash(&hash)).await
    }

    pub async fn get_raw_block_data_by_hash(&self, hash: BlockHash) -> Result<Option<Vec<u8>>, ChainStorageError> {
        self.spawn(move |db| db.get_raw_block_data_by_hash(&hash)).await
    }

    pub async fn get_canonical_chain_hashes(&self) -> Result<Vec<BlockHash>, ChainStorageError> {
        self.spawn(move |db| db.get_canonical_chain_hashes()).await
    }

    pub async fn get_headers_after(&self, from: BlockHash, limit: usize) -> Result<Vec<BlockHeader>, ChainStorageError> {
        self.spawn(move |db| db.get_headers_after(&from, limit)).await
    }

    pub async fn find_common_ancestor(&self, a: BlockHash, b: BlockHash) -> Result<BlockHash, ChainStorageError> {
        self.spawn(move |db| db.find_common_ancestor(&a, &b)).await
    }

    pub async fn get_blocks_between(
        &self,
        ancestor: BlockHash,
        descendant: BlockHash,
    ) -> Result<Vec<Block>, ChainStorageError> {
        self.spawn(move |db| db.get_blocks_between(&ancestor, &descendant)).await
    }

    async fn spawn<F, R>(&self, f: F) -> Result<R, ChainStorageError>
    where
        F: FnOnce(&BlockDag) -> Result<R, ChainStorageError> + Send + 'static,
        R: Send + 'static,
    {
        let db = self.db.clone();
        task::spawn_blocking(move || f(&db))
            .await
            .map_err(|e| ChainStorageError::BlockingTaskSpawnError(e.to_string()))?
    }
}
