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

use jarrah_common_types::types::{BlockHash, FixedHash};
use primitive_types::U256;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::{
    blocks::BlockHeader,
    common::{merkle::merkle_root, u256_to_bytes},
    transactions::{RawTransaction, TxDecodeError, RAW_TX_SIZE},
};

/// Size of the canonical header envelope: parent hash, timestamp, transaction count, merkle root
/// and nonce, big-endian, in that order.
pub const HEADER_ENVELOPE_SIZE: usize = 32 + 8 + 8 + 32 + 32;

#[derive(Debug, Error)]
pub enum BlockDecodeError {
    #[error("Buffer too short for a block header: expected {HEADER_ENVELOPE_SIZE} bytes, got {0}")]
    TruncatedHeader(usize),
    #[error("Block body truncated: header declares {expected} transactions, body holds {actual} bytes")]
    TruncatedBody { expected: u64, actual: usize },
    #[error("Declared transaction count {0} overflows the address space")]
    TransactionCountTooLarge(u64),
    #[error("{0} trailing bytes after the last transaction")]
    TrailingBytes(usize),
    #[error("Transaction {index} failed to decode: {source}")]
    Transaction {
        index: usize,
        #[source]
        source: TxDecodeError,
    },
}

/// A block as transmitted on the network: the header fields and the transaction bodies, without
/// any derived metadata (height, epoch, work).
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct RawBlock {
    pub parent_hash: BlockHash,
    pub timestamp: u64,
    pub num_transactions: u64,
    pub transactions_merkle_root: FixedHash,
    pub nonce: FixedHash,
    pub graffiti: FixedHash,
    pub transactions: Vec<RawTransaction>,
}

impl RawBlock {
    /// Assembles a block body over `transactions`, committing to them in the header. The nonce is
    /// zero until the block is mined.
    pub fn new(parent_hash: BlockHash, timestamp: u64, transactions: Vec<RawTransaction>) -> Self {
        let envelopes: Vec<Vec<u8>> = transactions.iter().map(|tx| tx.envelope()).collect();
        Self {
            parent_hash,
            timestamp,
            num_transactions: transactions.len() as u64,
            transactions_merkle_root: merkle_root(&envelopes),
            nonce: FixedHash::zero(),
            graffiti: FixedHash::zero(),
            transactions,
        }
    }

    pub fn header(&self) -> BlockHeader {
        BlockHeader {
            parent_hash: self.parent_hash,
            timestamp: self.timestamp,
            num_transactions: self.num_transactions,
            transactions_merkle_root: self.transactions_merkle_root,
            nonce: self.nonce,
            graffiti: self.graffiti,
        }
    }

    /// The canonical hashing preimage. Exactly these five fields, exactly this order; graffiti
    /// and difficulty are never part of it.
    pub fn envelope(&self) -> Vec<u8> {
        header_envelope(
            &self.parent_hash,
            self.timestamp,
            self.num_transactions,
            &self.transactions_merkle_root,
            &self.nonce,
        )
    }

    /// The block id: double SHA-256 over the envelope.
    pub fn hash(&self) -> BlockHash {
        let first = Sha256::digest(self.envelope());
        let second: [u8; 32] = Sha256::digest(first).into();
        BlockHash::from(second)
    }

    /// Seals a mining attempt into the header. The stored nonce is the SHA-256 of the 32-byte
    /// big-endian nonce integer; verifiers only ever see the hashed form.
    pub fn set_nonce(&mut self, nonce: U256) {
        let digest: [u8; 32] = Sha256::digest(u256_to_bytes(&nonce)).into();
        self.nonce = FixedHash::from(digest);
    }

    /// Encoded size of this block; what the block size limit is measured against.
    pub fn size_bytes(&self) -> u64 {
        HEADER_ENVELOPE_SIZE as u64 + self.num_transactions.saturating_mul(RAW_TX_SIZE as u64)
    }

    /// The binary wire form: the header envelope followed by the fixed-width transactions. The
    /// count lives in the header, so the transaction list carries no length prefix. Graffiti does
    /// not travel in this form.
    pub fn to_wire_bytes(&self) -> Vec<u8> {
        let mut buf = self.envelope();
        buf.reserve(self.transactions.len() * RAW_TX_SIZE);
        for tx in &self.transactions {
            buf.extend_from_slice(&tx.to_bytes());
        }
        buf
    }

    pub fn from_wire_bytes(bytes: &[u8]) -> Result<Self, BlockDecodeError> {
        if bytes.len() < HEADER_ENVELOPE_SIZE {
            return Err(BlockDecodeError::TruncatedHeader(bytes.len()));
        }
        let parent_hash = BlockHash::try_from(&bytes[0..32]).expect("length checked");
        let timestamp = u64::from_be_bytes(bytes[32..40].try_into().expect("length checked"));
        let num_transactions = u64::from_be_bytes(bytes[40..48].try_into().expect("length checked"));
        let transactions_merkle_root = FixedHash::try_from(&bytes[48..80]).expect("length checked");
        let nonce = FixedHash::try_from(&bytes[80..112]).expect("length checked");

        let body = &bytes[HEADER_ENVELOPE_SIZE..];
        let body_len = num_transactions
            .checked_mul(RAW_TX_SIZE as u64)
            .and_then(|len| usize::try_from(len).ok())
            .ok_or(BlockDecodeError::TransactionCountTooLarge(num_transactions))?;
        if body.len() < body_len {
            return Err(BlockDecodeError::TruncatedBody {
                expected: num_transactions,
                actual: body.len(),
            });
        }
        if body.len() > body_len {
            return Err(BlockDecodeError::TrailingBytes(body.len() - body_len));
        }

        let mut transactions = Vec::with_capacity(num_transactions as usize);
        for (index, chunk) in body.chunks(RAW_TX_SIZE).enumerate() {
            let tx = RawTransaction::from_bytes(chunk).map_err(|source| BlockDecodeError::Transaction { index, source })?;
            transactions.push(tx);
        }

        Ok(Self {
            parent_hash,
            timestamp,
            num_transactions,
            transactions_merkle_root,
            nonce,
            graffiti: FixedHash::zero(),
            transactions,
        })
    }
}

/// Builds the canonical 112-byte header envelope shared by [`RawBlock`] and
/// [`BlockHeader`](crate::blocks::BlockHeader).
pub(crate) fn header_envelope(
    parent_hash: &BlockHash,
    timestamp: u64,
    num_transactions: u64,
    transactions_merkle_root: &FixedHash,
    nonce: &FixedHash,
) -> Vec<u8> {
    let mut buf = Vec::with_capacity(HEADER_ENVELOPE_SIZE);
    buf.extend_from_slice(parent_hash.as_slice());
    buf.extend_from_slice(&timestamp.to_be_bytes());
    buf.extend_from_slice(&num_transactions.to_be_bytes());
    buf.extend_from_slice(transactions_merkle_root.as_slice());
    buf.extend_from_slice(nonce.as_slice());
    buf
}
