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
use thiserror::Error;

use crate::{
    base_node::comms_interface::{CommsInterfaceError, PeerId},
    blocks::BlockDecodeError,
    chain_storage::ChainStorageError,
};

/// Sync failures are logged and the sync rescheduled; none of them are fatal to the node.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("No peers available to sync from")]
    NoSyncPeers,
    #[error("No peer answered the tip poll before the deadline")]
    NoTipsReceived,
    #[error("Request to peer `{peer}` failed: {source}")]
    RequestFailed {
        peer: PeerId,
        #[source]
        source: CommsInterfaceError,
    },
    #[error("Peer `{0}` served an empty header batch mid-chain")]
    EmptyHeaderBatch(PeerId),
    #[error("Header at height {height} does not chain to {expected_parent}")]
    InvalidHeaderChaining { height: u64, expected_parent: BlockHash },
    #[error("Header {hash} fails proof of work for its epoch")]
    HeaderPowFailed { hash: BlockHash },
    #[error("No peer served a body for block {0}")]
    MissingBlockBody(BlockHash),
    #[error("Failed to decode a block body: {0}")]
    BlockDecode(#[from] BlockDecodeError),
    #[error("Chain storage error during sync: {0}")]
    ChainStorage(#[from] ChainStorageError),
}
