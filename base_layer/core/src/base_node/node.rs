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

use chrono::Utc;
use log::*;
use tokio::{
    sync::{broadcast, mpsc, watch, RwLock},
    task::JoinHandle,
};

use crate::{
    base_node::{
        comms_interface::{
            HeartbeatMessage,
            InboundNodeCommsHandlers,
            NewBlockOutcome,
            OutboundNodeCommsInterface,
            PeerId,
            WireMessage,
        },
        sync::{ChainSynchronizer, SyncError, SyncOutcome},
    },
    blocks::{Block, RawBlock},
    chain_storage::{AsyncBlockDag, ChainStorageError, TipChanged},
    consensus::ConsensusManager,
    mempool::{Mempool, TxInsertOutcome},
    state_machine::StateMachine,
};

const LOG_TARGET: &str = "c::bn::node";

/// Node identity and bootstrap settings. Unlike the consensus constants these are free to differ
/// between peers.
#[derive(Debug, Clone)]
pub struct BaseNodeConfig {
    pub client_version: String,
    pub wire_protocol_version: u32,
    /// The address peers can reach this node on; advertised in heartbeats.
    pub client_address: PeerId,
    pub bootstrap_peers: Vec<PeerId>,
}

impl Default for BaseNodeConfig {
    fn default() -> Self {
        Self {
            client_version: format!("jarrah/{}", env!("CARGO_PKG_VERSION")),
            wire_protocol_version: 1,
            client_address: String::new(),
            bootstrap_peers: Vec::new(),
        }
    }
}

/// The orchestrator. Owns the wiring between the transport channels, the miner, the store and
/// the sync engine:
///
/// - inbound gossip goes through the inbound handlers into the store and mempool; a block with an
///   unknown parent or a heartbeat advertising an unknown tip schedules a chain sync,
/// - miner solutions are ingested and then gossiped,
/// - tip changes drive the state machine across the fork point, reconcile the mempool and push a
///   fresh template to the miner watch channel.
pub struct BaseNode {
    config: BaseNodeConfig,
    db: AsyncBlockDag,
    mempool: Arc<RwLock<Mempool>>,
    state_machine: Arc<dyn StateMachine>,
    inbound: InboundNodeCommsHandlers,
    outbound: OutboundNodeCommsInterface,
    consensus: ConsensusManager,
    peers: Vec<PeerId>,
    tip_template: watch::Sender<Block>,
    sync_task: Option<JoinHandle<()>>,
}

impl BaseNode {
    pub fn new(
        config: BaseNodeConfig,
        db: AsyncBlockDag,
        mempool: Arc<RwLock<Mempool>>,
        state_machine: Arc<dyn StateMachine>,
        outbound: OutboundNodeCommsInterface,
    ) -> Result<Self, ChainStorageError> {
        let inbound = InboundNodeCommsHandlers::new(db.clone(), mempool.clone());
        let consensus = db.consensus();
        let peers = config.bootstrap_peers.clone();
        let (tip_template, _) = watch::channel(db.tip()?);
        Ok(Self {
            config,
            db,
            mempool,
            state_machine,
            inbound,
            outbound,
            consensus,
            peers,
            tip_template,
            sync_task: None,
        })
    }

    /// Handlers a transport can use to service request/reply messages (`get_tip`, `get_blocks`,
    /// `has_block`, `get_headers`) without going through the node loop.
    pub fn inbound_handlers(&self) -> InboundNodeCommsHandlers {
        self.inbound.clone()
    }

    /// Miners watch this for the tip to build their next template on.
    pub fn tip_template_watcher(&self) -> watch::Receiver<Block> {
        self.tip_template.subscribe()
    }

    /// Runs the node until `shutdown` flips. `inbound_messages` carries push-style gossip from
    /// the transport; `block_solutions` carries sealed blocks from the miner.
    pub async fn run(
        mut self,
        mut inbound_messages: mpsc::Receiver<(PeerId, WireMessage)>,
        mut block_solutions: mpsc::Receiver<RawBlock>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        let mut tip_events = self.db.tip_events();
        let (sync_results_tx, mut sync_results) = mpsc::channel::<Result<SyncOutcome, SyncError>>(1);

        info!(
            target: LOG_TARGET,
            "Node starting with {} bootstrap peers", self.peers.len()
        );
        self.start_sync(&sync_results_tx);

        loop {
            tokio::select! {
                _ = shutdown.changed() => break,
                Some((peer, message)) = inbound_messages.recv() => {
                    self.handle_message(peer, message, &sync_results_tx).await;
                },
                Some(raw) = block_solutions.recv() => {
                    self.handle_block_solution(raw).await;
                },
                event = tip_events.recv() => match event {
                    Ok(event) => self.handle_tip_changed(event).await,
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(target: LOG_TARGET, "Dropped {} tip events, resyncing state from store", n);
                    },
                    Err(broadcast::error::RecvError::Closed) => break,
                },
                Some(result) = sync_results.recv() => {
                    self.handle_sync_result(result).await;
                },
            }
        }

        if let Some(task) = self.sync_task.take() {
            task.abort();
        }
        info!(target: LOG_TARGET, "Node shut down");
    }

    async fn handle_message(
        &mut self,
        peer: PeerId,
        message: WireMessage,
        sync_results: &mpsc::Sender<Result<SyncOutcome, SyncError>>,
    ) {
        match message {
            WireMessage::NewBlock { raw_block } => {
                let hash = raw_block.hash();
                match self.inbound.handle_new_block(raw_block.clone()).await {
                    Ok(NewBlockOutcome::Added) => {
                        let _ = self.outbound.broadcast_block(raw_block, Some(peer)).await;
                    },
                    Ok(NewBlockOutcome::AlreadyKnown) => {},
                    Ok(NewBlockOutcome::OrphanBlock) => {
                        debug!(
                            target: LOG_TARGET,
                            "Gossiped block {} has an unknown parent, scheduling sync", hash
                        );
                        self.add_peer(peer);
                        self.start_sync(sync_results);
                    },
                    Err(e) => warn!(target: LOG_TARGET, "Failed to ingest gossiped block {}: {}", hash, e),
                }
            },
            WireMessage::NewTransaction { raw_transaction } => {
                match self.inbound.handle_new_transaction(raw_transaction.clone()).await {
                    Ok(TxInsertOutcome::Inserted) => {
                        let _ = self.outbound.broadcast_transaction(raw_transaction, Some(peer)).await;
                    },
                    Ok(_) => {},
                    Err(e) => debug!(target: LOG_TARGET, "Rejected gossiped transaction: {}", e),
                }
            },
            WireMessage::Heartbeat(heartbeat) => {
                self.add_peer(peer);
                if !heartbeat.client_address.is_empty() {
                    self.add_peer(heartbeat.client_address.clone());
                }
                let local_height = self.db.tip().map(|t| t.height).unwrap_or(0);
                let behind = heartbeat.tip_height > local_height;
                match self.db.has_block(heartbeat.tip_hash).await {
                    Ok(false) if behind => {
                        debug!(
                            target: LOG_TARGET,
                            "Heartbeat advertises unknown tip {} at height {}, scheduling sync",
                            heartbeat.tip_hash,
                            heartbeat.tip_height
                        );
                        self.start_sync(sync_results);
                    },
                    Ok(_) => {},
                    Err(e) => warn!(target: LOG_TARGET, "Heartbeat tip lookup failed: {}", e),
                }
            },
            WireMessage::GossipPeers { peers } => {
                for peer in peers {
                    self.add_peer(peer);
                }
            },
            // Request/reply messages are serviced by the transport against the inbound handlers;
            // seeing one here means a peer is confused.
            other => trace!(target: LOG_TARGET, "Ignoring request-style message on gossip path: {:?}", other),
        }
    }

    async fn handle_block_solution(&mut self, raw: RawBlock) {
        let hash = raw.hash();
        info!(target: LOG_TARGET, "Miner found block {}", hash);
        match self.inbound.handle_new_block(raw.clone()).await {
            Ok(NewBlockOutcome::Added) => {
                let _ = self.outbound.broadcast_block(raw, None).await;
            },
            Ok(outcome) => debug!(target: LOG_TARGET, "Mined block {} not added: {:?}", hash, outcome),
            Err(e) => warn!(target: LOG_TARGET, "Failed to ingest mined block {}: {}", hash, e),
        }
    }

    /// Walks the application state machine across a tip change. For a plain chain extension the
    /// fork point is the previous tip and nothing is reverted.
    async fn handle_tip_changed(&mut self, event: TipChanged) {
        let TipChanged { new_tip, prev_tip } = event;
        if let Err(e) = self.apply_reorg(&new_tip, &prev_tip).await {
            error!(
                target: LOG_TARGET,
                "Failed to recompute state for tip {}: {}", new_tip.hash, e
            );
        }
        let _ = self.tip_template.send(new_tip);
    }

    async fn apply_reorg(&mut self, new_tip: &Block, prev_tip: &Block) -> Result<(), ChainStorageError> {
        let ancestor = self.db.find_common_ancestor(new_tip.hash, prev_tip.hash).await?;
        let reverted = if ancestor == prev_tip.hash {
            Vec::new()
        } else {
            self.db.get_blocks_between(ancestor, prev_tip.hash).await?
        };
        let applied = self.db.get_blocks_between(ancestor, new_tip.hash).await?;

        if !reverted.is_empty() {
            info!(
                target: LOG_TARGET,
                "Reorg: reverting {} blocks and applying {} (fork point {})",
                reverted.len(),
                applied.len(),
                ancestor
            );
        }

        // Newest first back to the fork point, then forward along the new branch.
        for block in reverted.iter().rev() {
            if let Err(e) = self.state_machine.revert_block(block) {
                error!(target: LOG_TARGET, "State machine failed to revert {}: {}", block.hash, e);
            }
        }
        for block in &applied {
            if let Err(e) = self.state_machine.apply_block(block) {
                error!(target: LOG_TARGET, "State machine failed to apply {}: {}", block.hash, e);
            }
        }

        self.mempool
            .write()
            .await
            .process_reorg(&applied, &reverted, new_tip.height);
        Ok(())
    }

    /// Spawns a chain sync, aborting any sync already in flight (phases C/D drop their
    /// outstanding fetches at the next await point).
    fn start_sync(&mut self, results: &mpsc::Sender<Result<SyncOutcome, SyncError>>) {
        if let Some(task) = self.sync_task.take() {
            if !task.is_finished() {
                debug!(target: LOG_TARGET, "Superseding active sync");
                task.abort();
            }
        }
        if self.peers.is_empty() {
            debug!(target: LOG_TARGET, "No peers to sync from");
            return;
        }

        let synchronizer = ChainSynchronizer::new(
            self.db.clone(),
            self.outbound.clone(),
            self.consensus.clone(),
            self.peers.clone(),
        );
        let results = results.clone();
        self.sync_task = Some(tokio::spawn(async move {
            let outcome = synchronizer.run().await;
            let _ = results.send(outcome).await;
        }));
    }

    async fn handle_sync_result(&mut self, result: Result<SyncOutcome, SyncError>) {
        match result {
            Ok(SyncOutcome::UpToDate) => debug!(target: LOG_TARGET, "Sync: already up to date"),
            Ok(SyncOutcome::Synced { new_tip, blocks_added }) => {
                info!(
                    target: LOG_TARGET,
                    "Sync finished at tip {} ({} blocks added)", new_tip, blocks_added
                );
                // Tip events already walked the state machine; what remains is dropping pool
                // entries the new chain state no longer accepts.
                self.mempool.write().await.revalidate();
                let _ = self.outbound.broadcast(self.heartbeat(), None).await;
            },
            Err(e) => warn!(target: LOG_TARGET, "Sync failed: {}", e),
        }
    }

    fn heartbeat(&self) -> WireMessage {
        let tip = self.db.tip().ok();
        WireMessage::Heartbeat(HeartbeatMessage {
            tip_hash: tip.as_ref().map(|t| t.hash).unwrap_or_default(),
            tip_height: tip.map(|t| t.height).unwrap_or(0),
            client_version: self.config.client_version.clone(),
            wire_protocol_version: self.config.wire_protocol_version,
            client_address: self.config.client_address.clone(),
            time: Utc::now(),
        })
    }

    fn add_peer(&mut self, peer: PeerId) {
        if peer.is_empty() || peer == self.config.client_address || self.peers.contains(&peer) {
            return;
        }
        debug!(target: LOG_TARGET, "Adding peer `{}`", peer);
        self.peers.push(peer);
    }
}
