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

use jarrah_common_types::types::BlockHash;
use tokio::sync::{mpsc, oneshot};

use crate::{
    base_node::comms_interface::{CommsInterfaceError, PeerId, WireMessage},
    blocks::{BlockHeader, RawBlock},
    transactions::RawTransaction,
};

/// A request the node wants the transport to carry to a peer (or everyone).
#[derive(Debug, Clone)]
pub enum OutboundRequest {
    GetTip {
        peer: PeerId,
    },
    HasBlock {
        peer: PeerId,
        block_hash: BlockHash,
    },
    GetBlocks {
        peer: PeerId,
        block_hashes: Vec<BlockHash>,
    },
    GetHeaders {
        peer: PeerId,
        from_hash: BlockHash,
        limit: u64,
    },
    /// Fire-and-forget gossip, optionally excluding the peer the payload came from.
    Broadcast {
        message: WireMessage,
        exclude: Option<PeerId>,
    },
}

#[derive(Debug, Clone)]
pub enum OutboundResponse {
    Tip(BlockHeader),
    HasBlock(bool),
    Blocks(Vec<Vec<u8>>),
    Headers(Vec<BlockHeader>),
    Ok,
}

/// One outbound request together with its reply slot.
#[derive(Debug)]
pub struct OutboundMessageRequest {
    pub request: OutboundRequest,
    pub reply: oneshot::Sender<Result<OutboundResponse, CommsInterfaceError>>,
}

/// The node's typed handle for talking to peers. Requests flow over a bounded channel to the
/// transport, replies come back per-request over a oneshot. Cancelling a caller simply drops the
/// oneshot; the transport's late reply goes nowhere.
#[derive(Clone)]
pub struct OutboundNodeCommsInterface {
    sender: mpsc::Sender<OutboundMessageRequest>,
}

impl OutboundNodeCommsInterface {
    pub fn new(sender: mpsc::Sender<OutboundMessageRequest>) -> Self {
        Self { sender }
    }

    /// A channel pair for wiring a transport: the interface for the node side, the receiver for
    /// the transport side.
    pub fn channel(buffer: usize) -> (Self, mpsc::Receiver<OutboundMessageRequest>) {
        let (sender, receiver) = mpsc::channel(buffer);
        (Self::new(sender), receiver)
    }

    async fn request(&self, request: OutboundRequest) -> Result<OutboundResponse, CommsInterfaceError> {
        let (reply, reply_rx) = oneshot::channel();
        self.sender
            .send(OutboundMessageRequest { request, reply })
            .await
            .map_err(|_| CommsInterfaceError::RequestChannelClosed)?;
        reply_rx.await.map_err(|_| CommsInterfaceError::ReplyChannelClosed)?
    }

    pub async fn get_tip(&self, peer: &PeerId) -> Result<BlockHeader, CommsInterfaceError> {
        match self.request(OutboundRequest::GetTip { peer: peer.clone() }).await? {
            OutboundResponse::Tip(header) => Ok(header),
            _ => Err(CommsInterfaceError::UnexpectedResponse),
        }
    }

    pub async fn has_block(&self, peer: &PeerId, block_hash: BlockHash) -> Result<bool, CommsInterfaceError> {
        let request = OutboundRequest::HasBlock {
            peer: peer.clone(),
            block_hash,
        };
        match self.request(request).await? {
            OutboundResponse::HasBlock(has) => Ok(has),
            _ => Err(CommsInterfaceError::UnexpectedResponse),
        }
    }

    pub async fn get_blocks(
        &self,
        peer: &PeerId,
        block_hashes: Vec<BlockHash>,
    ) -> Result<Vec<Vec<u8>>, CommsInterfaceError> {
        let request = OutboundRequest::GetBlocks {
            peer: peer.clone(),
            block_hashes,
        };
        match self.request(request).await? {
            OutboundResponse::Blocks(datas) => Ok(datas),
            _ => Err(CommsInterfaceError::UnexpectedResponse),
        }
    }

    pub async fn get_headers(
        &self,
        peer: &PeerId,
        from_hash: BlockHash,
        limit: u64,
    ) -> Result<Vec<BlockHeader>, CommsInterfaceError> {
        let request = OutboundRequest::GetHeaders {
            peer: peer.clone(),
            from_hash,
            limit,
        };
        match self.request(request).await? {
            OutboundResponse::Headers(headers) => Ok(headers),
            _ => Err(CommsInterfaceError::UnexpectedResponse),
        }
    }

    pub async fn broadcast(
        &self,
        message: WireMessage,
        exclude: Option<PeerId>,
    ) -> Result<(), CommsInterfaceError> {
        match self.request(OutboundRequest::Broadcast { message, exclude }).await? {
            OutboundResponse::Ok => Ok(()),
            _ => Err(CommsInterfaceError::UnexpectedResponse),
        }
    }

    pub async fn broadcast_block(&self, raw_block: RawBlock, exclude: Option<PeerId>) -> Result<(), CommsInterfaceError> {
        self.broadcast(WireMessage::NewBlock { raw_block }, exclude).await
    }

    pub async fn broadcast_transaction(
        &self,
        raw_transaction: RawTransaction,
        exclude: Option<PeerId>,
    ) -> Result<(), CommsInterfaceError> {
        self.broadcast(WireMessage::NewTransaction { raw_transaction }, exclude).await
    }
}
