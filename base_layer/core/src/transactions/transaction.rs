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

use jarrah_common_types::types::{BlockHash, TxHash};

use crate::transactions::RawTransaction;

/// A transaction as stored in the DAG: the raw fields plus where it was sequenced.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Transaction {
    pub version: u8,
    pub sig: [u8; 64],
    pub from_pubkey: [u8; 65],
    pub to_pubkey: [u8; 65],
    pub amount: u64,
    pub fee: u64,
    pub nonce: u64,

    pub hash: TxHash,
    pub block_hash: BlockHash,
    pub tx_index: u64,
}

impl Transaction {
    pub fn from_raw(raw: &RawTransaction, block_hash: BlockHash, tx_index: u64) -> Self {
        Self {
            version: raw.version,
            sig: raw.sig,
            from_pubkey: raw.from_pubkey,
            to_pubkey: raw.to_pubkey,
            amount: raw.amount,
            fee: raw.fee,
            nonce: raw.nonce,
            hash: raw.hash(),
            block_hash,
            tx_index,
        }
    }

    pub fn to_raw(&self) -> RawTransaction {
        RawTransaction {
            version: self.version,
            sig: self.sig,
            from_pubkey: self.from_pubkey,
            to_pubkey: self.to_pubkey,
            amount: self.amount,
            fee: self.fee,
            nonce: self.nonce,
        }
    }
}
