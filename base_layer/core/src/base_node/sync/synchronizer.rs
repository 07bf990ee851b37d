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

use std::{collections::HashMap, time::Duration};

use futures::future::try_join_all;
use jarrah_common_types::types::BlockHash;
use log::*;
use tokio::{
    sync::mpsc,
    time::sleep,
};

use crate::{
    base_node::{
        comms_interface::{OutboundNodeCommsInterface, PeerId},
        sync::{HeaderSyncValidator, SyncError},
    },
    blocks::{BlockHeader, RawBlock},
    chain_storage::{AsyncBlockDag, ChainStorageError},
    common::hash_to_u256,
    consensus::ConsensusManager,
    proof_of_work::calculate_work,
};

const LOG_TARGET: &str = "c::bn::sync";

/// Hard deadline for the best-tip poll; replies arriving later are discarded.
const TIP_POLL_TIMEOUT: Duration = Duration::from_secs(5);

/// Headers fetched per request during phase C.
pub const HEADER_BATCH_SIZE: usize = 10;

/// Block bodies fetched per request during phase D.
pub const BLOCK_BATCH_SIZE: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The heaviest remote tip is already in the local store.
    UpToDate,
    Synced {
        new_tip: BlockHash,
        blocks_added: u64,
    },
}

/// Pulls a remote chain into the local store in four phases: poll every peer for its tip, find
/// the common ancestor with an interactive binary search, download and validate headers, then
/// download bodies and feed them through the regular ingestion pipeline in chain order.
///
/// The synchronizer is run as its own task; a superseding sync aborts it at the next await point
/// and in-flight replies are dropped on the floor.
pub struct ChainSynchronizer {
    db: AsyncBlockDag,
    outbound: OutboundNodeCommsInterface,
    consensus: ConsensusManager,
    sync_peers: Vec<PeerId>,
}

impl ChainSynchronizer {
    pub fn new(
        db: AsyncBlockDag,
        outbound: OutboundNodeCommsInterface,
        consensus: ConsensusManager,
        sync_peers: Vec<PeerId>,
    ) -> Self {
        Self {
            db,
            outbound,
            consensus,
            sync_peers,
        }
    }

    pub async fn run(mut self) -> Result<SyncOutcome, SyncError> {
        if self.sync_peers.is_empty() {
            return Err(SyncError::NoSyncPeers);
        }

        // Phase A: who has the heaviest tip?
        let (best_peer, best_tip) = self.get_best_tip_from_peers().await?;
        let best_hash = best_tip.hash();
        if self.db.has_block(best_hash).await? {
            debug!(target: LOG_TARGET, "Best remote tip {} already known", best_hash);
            return Ok(SyncOutcome::UpToDate);
        }
        info!(
            target: LOG_TARGET,
            "Syncing towards tip {} via peer `{}`", best_hash, best_peer
        );

        // Phase B: where do our chains part ways?
        let ancestor = self.find_common_ancestor(&best_peer).await?;
        debug!(target: LOG_TARGET, "Common ancestor with `{}` is {}", best_peer, ancestor);

        // Phase C: headers first, so bad chains are rejected before any body is moved.
        let headers = self.download_and_validate_headers(ancestor, best_hash).await?;
        info!(target: LOG_TARGET, "Validated {} headers", headers.len());

        // Phase D: bodies, then ingestion in chain order.
        let blocks_added = self.download_and_ingest_bodies(&headers).await?;
        info!(target: LOG_TARGET, "Sync complete, {} blocks added", blocks_added);

        Ok(SyncOutcome::Synced {
            new_tip: best_hash,
            blocks_added,
        })
    }

    /// Fans `get_tip` out to every peer in parallel and keeps the reply of maximal
    /// `work(hash)`. The hash-derived work is a proxy score (difficulty is not in the wire
    /// header) and an adversarial peer can inflate it; the header chain is fully validated
    /// against real targets in phase C before anything is stored.
    async fn get_best_tip_from_peers(&mut self) -> Result<(PeerId, BlockHeader), SyncError> {
        let (reply_tx, mut reply_rx) = mpsc::channel(self.sync_peers.len());
        for peer in &self.sync_peers {
            let outbound = self.outbound.clone();
            let peer = peer.clone();
            let reply_tx = reply_tx.clone();
            tokio::spawn(async move {
                match outbound.get_tip(&peer).await {
                    Ok(header) => {
                        let _ = reply_tx.send((peer, header)).await;
                    },
                    Err(e) => warn!(target: LOG_TARGET, "Tip poll to `{}` failed: {}", peer, e),
                }
            });
        }
        drop(reply_tx);

        let mut tips: Vec<(PeerId, BlockHeader)> = Vec::new();
        let deadline = sleep(TIP_POLL_TIMEOUT);
        tokio::pin!(deadline);
        loop {
            tokio::select! {
                _ = &mut deadline => {
                    debug!(target: LOG_TARGET, "Tip poll deadline reached with {} replies", tips.len());
                    break;
                },
                reply = reply_rx.recv() => match reply {
                    Some(tip) => tips.push(tip),
                    None => break,
                },
            }
        }

        if tips.is_empty() {
            return Err(SyncError::NoTipsReceived);
        }

        // Peers that answered are the download pool for phases C and D.
        self.sync_peers = tips.iter().map(|(peer, _)| peer.clone()).collect();

        let best = tips
            .into_iter()
            .max_by_key(|(_, header)| calculate_work(&hash_to_u256(&header.hash())))
            .expect("tips is non-empty");
        Ok(best)
    }

    /// Interactive binary search over the local canonical chain: probe `has_block` at the
    /// midpoint, move the floor on SEEN and the ceiling otherwise. One hash per round trip,
    /// ⌈log₂ N⌉ round trips.
    async fn find_common_ancestor(&self, peer: &PeerId) -> Result<BlockHash, SyncError> {
        let local_chain = self.db.get_canonical_chain_hashes().await?;
        let mut floor = 0usize;
        let mut ceil = local_chain.len();

        while floor + 1 < ceil {
            let mid = (floor + ceil) / 2;
            let seen = self
                .outbound
                .has_block(peer, local_chain[mid])
                .await
                .map_err(|source| SyncError::RequestFailed {
                    peer: peer.clone(),
                    source,
                })?;
            trace!(
                target: LOG_TARGET,
                "Ancestor probe idx={} hash={} seen={}",
                mid,
                local_chain[mid],
                seen
            );
            if seen {
                floor = mid;
            } else {
                ceil = mid;
            }
        }

        Ok(local_chain[floor])
    }

    /// Walks forward from the ancestor in batches of [`HEADER_BATCH_SIZE`], validating each
    /// header as it arrives, until the target tip hash is reached. Batches rotate round-robin
    /// over the responsive peers; each batch must start where the previous one ended, so batches
    /// are sequential while bodies (phase D) parallelise freely.
    async fn download_and_validate_headers(
        &self,
        ancestor: BlockHash,
        target: BlockHash,
    ) -> Result<Vec<BlockHeader>, SyncError> {
        let ancestor_block = self
            .db
            .get_block_by_hash(ancestor)
            .await?
            .ok_or(ChainStorageError::BlockNotFound(ancestor))?;
        let ancestor_epoch = self
            .db
            .get_epoch_for_block_hash(ancestor)
            .await?
            .ok_or_else(|| ChainStorageError::CorruptedDatabase(format!("No epoch for ancestor {}", ancestor)))?;
        let mut validator = HeaderSyncValidator::new(&ancestor_block, ancestor_epoch, self.consensus.clone());

        let mut headers = Vec::new();
        let mut from = ancestor;
        let mut peer_index = 0usize;
        loop {
            let peer = &self.sync_peers[peer_index % self.sync_peers.len()];
            peer_index += 1;

            let batch = self
                .outbound
                .get_headers(peer, from, HEADER_BATCH_SIZE as u64)
                .await
                .map_err(|source| SyncError::RequestFailed {
                    peer: peer.clone(),
                    source,
                })?;
            if batch.is_empty() {
                return Err(SyncError::EmptyHeaderBatch(peer.clone()));
            }

            let mut reached_target = false;
            for header in batch {
                let hash = validator.validate(&header)?;
                from = hash;
                headers.push(header);
                if hash == target {
                    reached_target = true;
                    break;
                }
            }
            if reached_target {
                return Ok(headers);
            }
        }
    }

    /// Fetches bodies for the validated headers in parallel batches spread over the responsive
    /// peers, then ingests them oldest-first so every block finds its parent already committed.
    async fn download_and_ingest_bodies(&self, headers: &[BlockHeader]) -> Result<u64, SyncError> {
        let wanted: Vec<BlockHash> = headers.iter().map(BlockHeader::hash).collect();

        let fetches = wanted.chunks(BLOCK_BATCH_SIZE).enumerate().map(|(i, chunk)| {
            let peer = self.sync_peers[i % self.sync_peers.len()].clone();
            let outbound = self.outbound.clone();
            let chunk = chunk.to_vec();
            async move {
                let datas = outbound
                    .get_blocks(&peer, chunk)
                    .await
                    .map_err(|source| SyncError::RequestFailed { peer, source })?;
                let mut decoded = Vec::with_capacity(datas.len());
                for data in datas {
                    let raw = RawBlock::from_wire_bytes(&data)?;
                    decoded.push((raw.hash(), raw));
                }
                Ok::<_, SyncError>(decoded)
            }
        });
        let mut bodies: HashMap<BlockHash, RawBlock> = HashMap::new();
        for batch in try_join_all(fetches).await? {
            bodies.extend(batch);
        }

        let mut blocks_added = 0u64;
        for hash in &wanted {
            let raw = bodies.remove(hash).ok_or(SyncError::MissingBlockBody(*hash))?;
            match self.db.ingest_block(raw).await {
                Ok(()) => blocks_added += 1,
                Err(ChainStorageError::BlockAlreadyExists(_)) => {
                    trace!(target: LOG_TARGET, "Block {} arrived by gossip during sync", hash);
                },
                Err(e) => return Err(e.into()),
            }
        }
        Ok(blocks_added)
    }
}
