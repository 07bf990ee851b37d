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

//! The JSON wire messages. Every message is an object with a `type` discriminator; hashes and
//! binary payloads are lowercase hex strings. Framing is the transport's choice, the messages
//! themselves are self-describing.

use chrono::{DateTime, Utc};
use jarrah_common_types::types::BlockHash;
use serde::{Deserialize, Serialize};

use crate::{
    base_node::comms_interface::PeerId,
    blocks::{BlockHeader, RawBlock},
    transactions::RawTransaction,
};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeartbeatMessage {
    pub tip_hash: BlockHash,
    pub tip_height: u64,
    pub client_version: String,
    pub wire_protocol_version: u32,
    pub client_address: PeerId,
    pub time: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WireMessage {
    Heartbeat(HeartbeatMessage),
    GetTip,
    GetTipReply {
        tip: BlockHeader,
    },
    NewBlock {
        #[serde(rename = "rawBlock")]
        raw_block: RawBlock,
    },
    NewTransaction {
        #[serde(rename = "rawTransaction")]
        raw_transaction: RawTransaction,
    },
    GetBlocks {
        #[serde(rename = "blockHashes")]
        block_hashes: Vec<BlockHash>,
    },
    GetBlocksReply {
        #[serde(rename = "rawBlockDatas", with = "hex_blobs")]
        raw_block_datas: Vec<Vec<u8>>,
    },
    HasBlock {
        #[serde(rename = "blockHash")]
        block_hash: BlockHash,
    },
    HasBlockReply {
        has: bool,
    },
    GossipPeers {
        peers: Vec<PeerId>,
    },
    GetHeaders {
        #[serde(rename = "fromHash")]
        from_hash: BlockHash,
        limit: u64,
    },
    GetHeadersReply {
        headers: Vec<BlockHeader>,
    },
}

/// Binary blobs ride inside JSON as hex strings.
mod hex_blobs {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(blobs: &[Vec<u8>], s: S) -> Result<S::Ok, S::Error> {
        s.collect_seq(blobs.iter().map(hex::encode))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<Vec<u8>>, D::Error> {
        let strings = <Vec<String>>::deserialize(d)?;
        strings
            .into_iter()
            .map(|s| hex::decode(&s).map_err(serde::de::Error::custom))
            .collect()
    }
}
