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

use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use diesel::{prelude::*, result::DatabaseErrorKind, sql_query, SqliteConnection};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use jarrah_common_types::types::BlockHash;
use log::*;
use tokio::sync::broadcast;

use crate::{
    blocks::{Block, BlockHeader, RawBlock},
    chain_storage::{
        error::ChainStorageError,
        models::{BlockSql, EpochSql, NewBlockSql, NewTransactionSql, TransactionSql},
        schema::{blocks, epochs, transactions},
    },
    consensus::ConsensusManager,
    proof_of_work::Epoch,
    state_machine::StateMachine,
    transactions::{RawTransaction, Transaction},
    validation::BlockValidator,
};

const LOG_TARGET: &str = "c::cs::block_dag";

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("./migrations");

/// How many tip changes can queue up before slow subscribers start missing events.
const TIP_EVENT_CHANNEL_SIZE: usize = 32;

/// Fired after a committed block strictly increased the best accumulated work.
#[derive(Debug, Clone)]
pub struct TipChanged {
    pub new_tip: Block,
    pub prev_tip: Block,
}

/// The persistent block DAG, backed by SQLite.
///
/// All writes go through [`ingest_block`](BlockDag::ingest_block), which validates and then
/// commits under a single database transaction; concurrent ingestions serialize on the connection
/// mutex. Reads see whatever was last committed. The cached tip is refreshed in the post-commit
/// step of an ingestion, before the tip event fires, and is read-only everywhere else.
pub struct BlockDag {
    connection: Arc<Mutex<SqliteConnection>>,
    consensus: ConsensusManager,
    validator: BlockValidator,
    tip: RwLock<Block>,
    tip_events: broadcast::Sender<TipChanged>,
}

impl BlockDag {
    /// Opens (creating if necessary) the DAG at `db_path`. Runs migrations and seeds the genesis
    /// epoch and block atomically on first open; reopening an initialised store is a no-op. A
    /// failure here is fatal to the node, there is nothing useful to do without a store.
    pub fn new(
        db_path: &str,
        consensus: ConsensusManager,
        state_machine: Arc<dyn StateMachine>,
    ) -> Result<Self, ChainStorageError> {
        let mut connection = SqliteConnection::establish(db_path)?;
        connection
            .run_pending_migrations(MIGRATIONS)
            .map_err(|e| ChainStorageError::MigrationError(e.to_string()))?;
        sql_query("PRAGMA foreign_keys = ON").execute(&mut connection)?;

        Self::initialize_genesis(&mut connection, &consensus)?;

        let tip = Self::query_tip_row(&mut connection)?
            .ok_or_else(|| ChainStorageError::CorruptedDatabase("No blocks after initialisation".to_string()))?;
        let tip = Self::hydrate(&mut connection, tip)?;
        debug!(target: LOG_TARGET, "Block DAG open, tip is {}", tip);

        let (tip_events, _) = broadcast::channel(TIP_EVENT_CHANNEL_SIZE);
        let validator = BlockValidator::new(consensus.clone(), state_machine);
        Ok(Self {
            connection: Arc::new(Mutex::new(connection)),
            consensus,
            validator,
            tip: RwLock::new(tip),
            tip_events,
        })
    }

    fn initialize_genesis(conn: &mut SqliteConnection, consensus: &ConsensusManager) -> Result<(), ChainStorageError> {
        let genesis = consensus.get_genesis_block();
        if Self::fetch_block_row(conn, &genesis.hash)?.is_some() {
            return Ok(());
        }

        info!(
            target: LOG_TARGET,
            "Initialising block DAG with genesis block {}", genesis.hash
        );
        let epoch = Epoch::genesis(consensus.consensus_constants());
        let difficulty = epoch.difficulty;
        conn.transaction::<_, diesel::result::Error, _>(|conn| {
            diesel::insert_into(epochs::table)
                .values(EpochSql::from_epoch(&epoch))
                .execute(conn)?;
            diesel::insert_into(blocks::table)
                .values(NewBlockSql::from_block(&genesis, &difficulty))
                .execute(conn)?;
            Ok(())
        })?;
        Ok(())
    }

    /// Validates `raw` through the full acceptance pipeline and, on success, commits the block,
    /// its transactions and any newly opened epoch in one database transaction. Fires the tip
    /// event when the block strictly outweighs the cached tip. Not cancellable once the commit
    /// has begun.
    pub fn ingest_block(&self, raw: &RawBlock) -> Result<(), ChainStorageError> {
        let hash = raw.hash();
        if self.has_block(&hash)? {
            return Err(ChainStorageError::BlockAlreadyExists(hash));
        }

        let candidate = self.validator.validate(self, raw)?;
        let block = candidate.block;
        let difficulty = candidate.epoch.difficulty;

        {
            let mut conn = self.lock_connection()?;
            conn.transaction::<_, diesel::result::Error, _>(|conn| {
                if candidate.opens_epoch {
                    diesel::insert_into(epochs::table)
                        .values(EpochSql::from_epoch(&candidate.epoch))
                        .execute(conn)?;
                }
                diesel::insert_into(blocks::table)
                    .values(NewBlockSql::from_block(&block, &difficulty))
                    .execute(conn)?;
                for (tx_index, tx) in block.transactions.iter().enumerate() {
                    diesel::insert_into(transactions::table)
                        .values(NewTransactionSql::from_raw(tx, &block.hash, tx_index as u64))
                        .execute(conn)?;
                }
                Ok(())
            })
            .map_err(|err| match err {
                diesel::result::Error::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                    ChainStorageError::BlockAlreadyExists(hash)
                },
                err => err.into(),
            })?;
        }

        debug!(
            target: LOG_TARGET,
            "Stored block {} at height {} (acc_work {})", block.hash, block.height, block.accumulated_work
        );
        self.update_tip_cache(block)
    }

    fn update_tip_cache(&self, block: Block) -> Result<(), ChainStorageError> {
        let prev_tip = self.tip()?;
        if block.accumulated_work > prev_tip.accumulated_work {
            {
                let mut tip = self
                    .tip
                    .write()
                    .map_err(|_| ChainStorageError::AccessError("Tip cache lock poisoned".to_string()))?;
                *tip = block.clone();
            }
            info!(
                target: LOG_TARGET,
                "New tip {} at height {} (prev {})", block.hash, block.height, prev_tip.hash
            );
            let _ = self.tip_events.send(TipChanged {
                new_tip: block,
                prev_tip,
            });
        }
        Ok(())
    }

    /// The cached tip. May lag the committed state by at most one in-flight ingestion.
    pub fn tip(&self) -> Result<Block, ChainStorageError> {
        self.tip
            .read()
            .map(|tip| tip.clone())
            .map_err(|_| ChainStorageError::AccessError("Tip cache lock poisoned".to_string()))
    }

    /// Subscribes to tip changes.
    pub fn tip_events(&self) -> broadcast::Receiver<TipChanged> {
        self.tip_events.subscribe()
    }

    /// The block of maximum accumulated work, queried from the committed state. Ties resolve to
    /// the first-seen block via the insertion rowid.
    pub fn get_current_tip(&self) -> Result<Block, ChainStorageError> {
        let mut conn = self.lock_connection()?;
        let row = Self::query_tip_row(&mut conn)?
            .ok_or_else(|| ChainStorageError::CorruptedDatabase("No blocks in store".to_string()))?;
        Self::hydrate(&mut conn, row)
    }

    pub fn get_block_by_hash(&self, hash: &BlockHash) -> Result<Option<Block>, ChainStorageError> {
        let mut conn = self.lock_connection()?;
        match Self::fetch_block_row(&mut conn, hash)? {
            Some(row) => Ok(Some(Self::hydrate(&mut conn, row)?)),
            None => Ok(None),
        }
    }

    pub fn has_block(&self, hash: &BlockHash) -> Result<bool, ChainStorageError> {
        let mut conn = self.lock_connection()?;
        Ok(Self::fetch_block_row(&mut conn, hash)?.is_some())
    }

    /// The stored transactions of a block, in sequence order. `None` when the block is unknown.
    pub fn get_block_transactions(&self, hash: &BlockHash) -> Result<Option<Vec<Transaction>>, ChainStorageError> {
        let mut conn = self.lock_connection()?;
        if Self::fetch_block_row(&mut conn, hash)?.is_none() {
            return Ok(None);
        }
        let rows = Self::fetch_transaction_rows(&mut conn, hash)?;
        let txs = rows
            .into_iter()
            .map(TransactionSql::into_transaction)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Some(txs))
    }

    /// The epoch a block belongs to, via the blocks → epochs join.
    pub fn get_epoch_for_block_hash(&self, hash: &BlockHash) -> Result<Option<Epoch>, ChainStorageError> {
        let mut conn = self.lock_connection()?;
        let row: Option<EpochSql> = blocks::table
            .inner_join(epochs::table)
            .filter(blocks::hash.eq(hash.as_slice()))
            .select(epochs::all_columns)
            .first::<EpochSql>(&mut *conn)
            .optional()?;
        row.map(|r| r.into_epoch(self.consensus.consensus_constants()))
            .transpose()
    }

    /// The wire-encoded block, re-serialized from the stored form. `None` when unknown.
    pub fn get_raw_block_data_by_hash(&self, hash: &BlockHash) -> Result<Option<Vec<u8>>, ChainStorageError> {
        Ok(self.get_block_by_hash(hash)?.map(|b| b.to_raw().to_wire_bytes()))
    }

    /// Every hash on the canonical chain, genesis first, tip last. The interactive ancestor
    /// search runs its binary probes over this.
    pub fn get_canonical_chain_hashes(&self) -> Result<Vec<BlockHash>, ChainStorageError> {
        let mut conn = self.lock_connection()?;
        let mut row = Self::query_tip_row(&mut conn)?
            .ok_or_else(|| ChainStorageError::CorruptedDatabase("No blocks in store".to_string()))?;
        let mut hashes = Vec::with_capacity(row.height as usize + 1);
        loop {
            hashes.push(row.block_hash()?);
            if row.height == 0 {
                break;
            }
            let parent = row.parent_block_hash()?;
            row = Self::fetch_block_row(&mut conn, &parent)?.ok_or_else(|| {
                ChainStorageError::CorruptedDatabase(format!("Missing parent {} on canonical chain", parent))
            })?;
        }
        hashes.reverse();
        Ok(hashes)
    }

    /// Headers on the canonical chain strictly after `from`, oldest first, at most `limit`.
    /// Returns an empty list when `from` is unknown or not on the canonical chain; peers asking
    /// from a stale fork simply get nothing.
    pub fn get_headers_after(&self, from: &BlockHash, limit: usize) -> Result<Vec<BlockHeader>, ChainStorageError> {
        let mut conn = self.lock_connection()?;
        let from_row = match Self::fetch_block_row(&mut conn, from)? {
            Some(row) => row,
            None => return Ok(Vec::new()),
        };
        let mut current = Self::query_tip_row(&mut conn)?
            .ok_or_else(|| ChainStorageError::CorruptedDatabase("No blocks in store".to_string()))?;

        let mut rows: Vec<BlockSql> = Vec::new();
        loop {
            if current.height <= from_row.height {
                // walked past `from` without linking to it: not on the canonical chain
                return Ok(Vec::new());
            }
            let links_to_from = current.parent_hash == from_row.hash;
            let parent = current.parent_block_hash()?;
            rows.push(current);
            if links_to_from {
                break;
            }
            current = Self::fetch_block_row(&mut conn, &parent)?.ok_or_else(|| {
                ChainStorageError::CorruptedDatabase(format!("Missing parent {} on canonical chain", parent))
            })?;
        }
        rows.reverse();
        rows.truncate(limit);
        rows.iter().map(BlockSql::to_header).collect()
    }

    /// Walks both chains backwards until they meet. Always terminates: every stored block roots
    /// at genesis.
    pub fn find_common_ancestor(&self, a: &BlockHash, b: &BlockHash) -> Result<BlockHash, ChainStorageError> {
        let mut conn = self.lock_connection()?;
        let mut a_row = Self::fetch_block_row(&mut conn, a)?.ok_or(ChainStorageError::BlockNotFound(*a))?;
        let mut b_row = Self::fetch_block_row(&mut conn, b)?.ok_or(ChainStorageError::BlockNotFound(*b))?;

        while a_row.hash != b_row.hash {
            if a_row.height >= b_row.height {
                let parent = a_row.parent_block_hash()?;
                a_row = Self::fetch_block_row(&mut conn, &parent)?
                    .ok_or_else(|| ChainStorageError::CorruptedDatabase(format!("Missing parent {}", parent)))?;
            } else {
                let parent = b_row.parent_block_hash()?;
                b_row = Self::fetch_block_row(&mut conn, &parent)?
                    .ok_or_else(|| ChainStorageError::CorruptedDatabase(format!("Missing parent {}", parent)))?;
            }
        }
        a_row.block_hash()
    }

    /// The blocks strictly between `ancestor` (exclusive) and `descendant` (inclusive), oldest
    /// first. Errors when `ancestor` is not actually on `descendant`'s parent chain.
    pub fn get_blocks_between(
        &self,
        ancestor: &BlockHash,
        descendant: &BlockHash,
    ) -> Result<Vec<Block>, ChainStorageError> {
        let mut conn = self.lock_connection()?;
        let ancestor_row =
            Self::fetch_block_row(&mut conn, ancestor)?.ok_or(ChainStorageError::BlockNotFound(*ancestor))?;
        let mut current =
            Self::fetch_block_row(&mut conn, descendant)?.ok_or(ChainStorageError::BlockNotFound(*descendant))?;

        let mut out = Vec::new();
        while current.hash != ancestor_row.hash {
            if current.height <= ancestor_row.height {
                return Err(ChainStorageError::InvalidQuery(format!(
                    "{} is not an ancestor of {}",
                    ancestor, descendant
                )));
            }
            let parent = current.parent_block_hash()?;
            out.push(Self::hydrate(&mut conn, current)?);
            current = Self::fetch_block_row(&mut conn, &parent)?
                .ok_or_else(|| ChainStorageError::CorruptedDatabase(format!("Missing parent {}", parent)))?;
        }
        out.reverse();
        Ok(out)
    }

    /// Total number of stored blocks, genesis included.
    pub fn block_count(&self) -> Result<u64, ChainStorageError> {
        let mut conn = self.lock_connection()?;
        let count: i64 = blocks::table.count().get_result(&mut *conn)?;
        Ok(count as u64)
    }

    pub fn consensus(&self) -> &ConsensusManager {
        &self.consensus
    }

    fn lock_connection(&self) -> Result<MutexGuard<'_, SqliteConnection>, ChainStorageError> {
        self.connection
            .lock()
            .map_err(|_| ChainStorageError::AccessError("Connection mutex poisoned".to_string()))
    }

    fn fetch_block_row(conn: &mut SqliteConnection, hash: &BlockHash) -> Result<Option<BlockSql>, ChainStorageError> {
        Ok(blocks::table
            .filter(blocks::hash.eq(hash.as_slice()))
            .first::<BlockSql>(conn)
            .optional()?)
    }

    fn query_tip_row(conn: &mut SqliteConnection) -> Result<Option<BlockSql>, ChainStorageError> {
        Ok(blocks::table
            .order((blocks::acc_work.desc(), blocks::id.asc()))
            .first::<BlockSql>(conn)
            .optional()?)
    }

    fn fetch_transaction_rows(
        conn: &mut SqliteConnection,
        block_hash: &BlockHash,
    ) -> Result<Vec<TransactionSql>, ChainStorageError> {
        Ok(transactions::table
            .filter(transactions::block_hash.eq(block_hash.as_slice()))
            .order(transactions::tx_index.asc())
            .load::<TransactionSql>(conn)?)
    }

    fn hydrate(conn: &mut SqliteConnection, row: BlockSql) -> Result<Block, ChainStorageError> {
        let block_hash = row.block_hash()?;
        let txs: Vec<RawTransaction> = Self::fetch_transaction_rows(conn, &block_hash)?
            .into_iter()
            .map(TransactionSql::into_raw)
            .collect::<Result<Vec<_>, _>>()?;
        row.into_block(txs)
    }
}
