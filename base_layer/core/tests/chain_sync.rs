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

use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use helpers::{create_test_dag, mine_block_on, mine_chain, TestWallet};
use jarrah_core::{
    base_node::{
        comms_interface::{
            InboundNodeCommsHandlers,
            OutboundNodeCommsInterface,
            OutboundRequest,
            OutboundResponse,
            WireMessage,
        },
        sync::{ChainSynchronizer, SyncOutcome},
        BaseNode,
        BaseNodeConfig,
    },
    blocks::RawBlock,
    chain_storage::{AsyncBlockDag, BlockDag},
    consensus::ConsensusConstants,
    mempool::{Mempool, MempoolConfig},
    state_machine::NullStateMachine,
};
use tokio::{
    sync::{mpsc, watch, RwLock},
    time::sleep,
};

fn handlers_for(dag: &Arc<BlockDag>) -> InboundNodeCommsHandlers {
    let mempool = Arc::new(RwLock::new(Mempool::new(
        MempoolConfig::default(),
        Arc::new(NullStateMachine),
    )));
    InboundNodeCommsHandlers::new(AsyncBlockDag::new(dag.clone()), mempool)
}

/// Wires an outbound interface straight into another node's inbound handlers, standing in for a
/// real transport. Counts `has_block` probes so tests can bound the ancestor search.
fn spawn_loopback_transport(remote: InboundNodeCommsHandlers) -> (OutboundNodeCommsInterface, Arc<AtomicUsize>) {
    let (outbound, mut requests) = OutboundNodeCommsInterface::channel(32);
    let probes = Arc::new(AtomicUsize::new(0));
    let probe_counter = probes.clone();
    tokio::spawn(async move {
        while let Some(request) = requests.recv().await {
            let reply = match request.request {
                OutboundRequest::GetTip { .. } => remote.handle_get_tip().await.map(OutboundResponse::Tip),
                OutboundRequest::HasBlock { block_hash, .. } => {
                    probe_counter.fetch_add(1, Ordering::SeqCst);
                    remote.handle_has_block(block_hash).await.map(OutboundResponse::HasBlock)
                },
                OutboundRequest::GetBlocks { block_hashes, .. } => {
                    remote.handle_get_blocks(block_hashes).await.map(OutboundResponse::Blocks)
                },
                OutboundRequest::GetHeaders { from_hash, limit, .. } => {
                    remote.handle_get_headers(from_hash, limit).await.map(OutboundResponse::Headers)
                },
                OutboundRequest::Broadcast { .. } => Ok(OutboundResponse::Ok),
            };
            let _ = request.reply.send(reply);
        }
    });
    (outbound, probes)
}

async fn wait_until<F: Fn() -> bool>(what: &str, condition: F) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        sleep(Duration::from_millis(25)).await;
    }
    panic!("Timed out waiting for: {}", what);
}

#[tokio::test]
async fn syncs_a_fresh_node_from_a_remote_peer() {
    let (remote_dag, _t1) = create_test_dag(ConsensusConstants::localnet());
    let remote_blocks = mine_chain(&remote_dag, &remote_dag.tip().unwrap(), 12);
    let remote_tip = remote_blocks.last().unwrap().clone();

    let (local_dag, _t2) = create_test_dag(ConsensusConstants::localnet());
    let (outbound, _probes) = spawn_loopback_transport(handlers_for(&remote_dag));

    let local = AsyncBlockDag::new(local_dag.clone());
    let synchronizer = ChainSynchronizer::new(
        local.clone(),
        outbound.clone(),
        local.consensus(),
        vec!["remote".to_string()],
    );
    let outcome = synchronizer.run().await.unwrap();
    assert_eq!(
        outcome,
        SyncOutcome::Synced {
            new_tip: remote_tip.hash,
            blocks_added: 12
        }
    );

    assert_eq!(local_dag.tip().unwrap().hash, remote_tip.hash);
    assert_eq!(local_dag.block_count().unwrap(), 13);

    // a second sync finds nothing to do
    let synchronizer = ChainSynchronizer::new(local.clone(), outbound, local.consensus(), vec!["remote".to_string()]);
    assert_eq!(synchronizer.run().await.unwrap(), SyncOutcome::UpToDate);
}

#[tokio::test]
async fn ancestor_search_is_logarithmic_and_forks_merge() {
    let (remote_dag, _t1) = create_test_dag(ConsensusConstants::localnet());
    let remote_blocks = mine_chain(&remote_dag, &remote_dag.tip().unwrap(), 20);
    let remote_tip = remote_blocks.last().unwrap().clone();

    // the local node shares the first 8 blocks, then wandered off on its own fork of 2
    let (local_dag, _t2) = create_test_dag(ConsensusConstants::localnet());
    for block in &remote_blocks[..8] {
        let data = remote_dag.get_raw_block_data_by_hash(&block.hash).unwrap().unwrap();
        local_dag.ingest_block(&RawBlock::from_wire_bytes(&data).unwrap()).unwrap();
    }
    let shared = local_dag.tip().unwrap();
    assert_eq!(shared.height, 8);
    let fork_a = mine_block_on(&local_dag, &shared, vec![], shared.timestamp + 250);
    local_dag.ingest_block(&fork_a).unwrap();
    let fork_a = local_dag.get_block_by_hash(&fork_a.hash()).unwrap().unwrap();
    let fork_b = mine_block_on(&local_dag, &fork_a, vec![], fork_a.timestamp + 250);
    local_dag.ingest_block(&fork_b).unwrap();

    let (outbound, probes) = spawn_loopback_transport(handlers_for(&remote_dag));
    let local = AsyncBlockDag::new(local_dag.clone());
    let synchronizer = ChainSynchronizer::new(
        local.clone(),
        outbound,
        local.consensus(),
        vec!["remote".to_string()],
    );
    let outcome = synchronizer.run().await.unwrap();
    assert_eq!(
        outcome,
        SyncOutcome::Synced {
            new_tip: remote_tip.hash,
            blocks_added: 12
        }
    );

    // local chain had 11 entries (genesis + 8 shared + 2 forked): at most ceil(log2(11)) probes
    assert!(
        probes.load(Ordering::SeqCst) <= 4,
        "ancestor search used {} probes",
        probes.load(Ordering::SeqCst)
    );

    // the losing fork is retained alongside the synced chain
    assert!(local_dag.has_block(&fork_b.hash()).unwrap());
    assert_eq!(local_dag.tip().unwrap().hash, remote_tip.hash);
    assert_eq!(local_dag.block_count().unwrap(), 1 + 8 + 2 + 12);
}

#[tokio::test]
async fn node_follows_gossip_mining_and_transactions() {
    let (remote_dag, _t1) = create_test_dag(ConsensusConstants::localnet());
    mine_chain(&remote_dag, &remote_dag.tip().unwrap(), 5);

    let (local_dag, _t2) = create_test_dag(ConsensusConstants::localnet());
    let state_machine = Arc::new(NullStateMachine);
    let mempool = Arc::new(RwLock::new(Mempool::new(MempoolConfig::default(), state_machine.clone())));
    let (outbound, _probes) = spawn_loopback_transport(handlers_for(&remote_dag));

    let (inbound_tx, inbound_rx) = mpsc::channel(16);
    let (solutions_tx, solutions_rx) = mpsc::channel(16);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let node = BaseNode::new(
        BaseNodeConfig {
            client_address: "local".to_string(),
            bootstrap_peers: vec!["remote".to_string()],
            ..Default::default()
        },
        AsyncBlockDag::new(local_dag.clone()),
        mempool.clone(),
        state_machine,
        outbound,
    )
    .unwrap();
    let node_task = tokio::spawn(node.run(inbound_rx, solutions_rx, shutdown_rx));

    // the node's startup sync pulls the remote chain
    {
        let local_dag = local_dag.clone();
        wait_until("startup sync to reach height 5", move || {
            local_dag.tip().unwrap().height == 5
        })
        .await;
    }

    // a block arriving by gossip extends the tip
    let tip = local_dag.tip().unwrap();
    let gossiped = mine_block_on(&local_dag, &tip, vec![], tip.timestamp + 1000);
    inbound_tx
        .send(("remote".to_string(), WireMessage::NewBlock { raw_block: gossiped.clone() }))
        .await
        .unwrap();
    {
        let local_dag = local_dag.clone();
        let hash = gossiped.hash();
        wait_until("gossiped block to become the tip", move || {
            local_dag.tip().unwrap().hash == hash
        })
        .await;
    }

    // a gossiped transaction lands in the mempool...
    let wallet = TestWallet::random();
    let tx = wallet.transfer([8u8; 65], 250, 1, 0);
    inbound_tx
        .send((
            "remote".to_string(),
            WireMessage::NewTransaction {
                raw_transaction: tx.clone(),
            },
        ))
        .await
        .unwrap();
    {
        let mempool = mempool.clone();
        let hash = tx.hash();
        wait_until("transaction to reach the mempool", move || {
            mempool.try_read().map(|p| p.contains(&hash)).unwrap_or(false)
        })
        .await;
    }

    // ...and is cleared once a mined block sequences it
    let tip = local_dag.tip().unwrap();
    let solved = mine_block_on(&local_dag, &tip, vec![tx.clone()], tip.timestamp + 1000);
    solutions_tx.send(solved.clone()).await.unwrap();
    {
        let local_dag = local_dag.clone();
        let hash = solved.hash();
        wait_until("mined block to become the tip", move || {
            local_dag.tip().unwrap().hash == hash
        })
        .await;
    }
    {
        let mempool = mempool.clone();
        let hash = tx.hash();
        wait_until("mempool to drop the sequenced transaction", move || {
            mempool.try_read().map(|p| !p.contains(&hash)).unwrap_or(false)
        })
        .await;
    }

    shutdown_tx.send(true).unwrap();
    tokio::time::timeout(Duration::from_secs(5), node_task).await.unwrap().unwrap();
}
