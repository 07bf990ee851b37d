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

use std::convert::TryInto;

use jarrah_common_types::{serializers::hex as hex_serde, types::TxHash};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Serialized size of a transaction on the wire: version, signature, both keys and the three
/// u64 fields. All fixed width.
pub const RAW_TX_SIZE: usize = 1 + 64 + 65 + 65 + 8 + 8 + 8;

/// Size of the signing preimage, which excludes the signature itself.
pub const TX_ENVELOPE_SIZE: usize = RAW_TX_SIZE - 64;

#[derive(Debug, Error)]
pub enum TxDecodeError {
    #[error("Expected {expected} transaction bytes, got {actual}")]
    UnexpectedLength { expected: usize, actual: usize },
}

/// A transaction as transmitted on the network: a transfer of `amount` from one public key to
/// another, authorised by an ECDSA signature over the transaction envelope.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct RawTransaction {
    pub version: u8,
    #[serde(with = "hex_serde")]
    pub sig: [u8; 64],
    #[serde(rename = "from", with = "hex_serde")]
    pub from_pubkey: [u8; 65],
    #[serde(rename = "to", with = "hex_serde")]
    pub to_pubkey: [u8; 65],
    pub amount: u64,
    pub fee: u64,
    pub nonce: u64,
}

impl RawTransaction {
    /// The canonical signing preimage: every field except the signature, big-endian.
    pub fn envelope(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(TX_ENVELOPE_SIZE);
        buf.push(self.version);
        buf.extend_from_slice(&self.from_pubkey);
        buf.extend_from_slice(&self.to_pubkey);
        buf.extend_from_slice(&self.amount.to_be_bytes());
        buf.extend_from_slice(&self.fee.to_be_bytes());
        buf.extend_from_slice(&self.nonce.to_be_bytes());
        buf
    }

    /// The full wire form: the signature is spliced in after the version byte.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(RAW_TX_SIZE);
        buf.push(self.version);
        buf.extend_from_slice(&self.sig);
        buf.extend_from_slice(&self.from_pubkey);
        buf.extend_from_slice(&self.to_pubkey);
        buf.extend_from_slice(&self.amount.to_be_bytes());
        buf.extend_from_slice(&self.fee.to_be_bytes());
        buf.extend_from_slice(&self.nonce.to_be_bytes());
        buf
    }

    /// Strict decode of exactly [`RAW_TX_SIZE`] bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TxDecodeError> {
        if bytes.len() != RAW_TX_SIZE {
            return Err(TxDecodeError::UnexpectedLength {
                expected: RAW_TX_SIZE,
                actual: bytes.len(),
            });
        }
        let mut offset = 0usize;
        let version = bytes[0];
        offset += 1;
        let sig: [u8; 64] = bytes[offset..offset + 64].try_into().expect("length checked");
        offset += 64;
        let from_pubkey: [u8; 65] = bytes[offset..offset + 65].try_into().expect("length checked");
        offset += 65;
        let to_pubkey: [u8; 65] = bytes[offset..offset + 65].try_into().expect("length checked");
        offset += 65;
        let amount = u64::from_be_bytes(bytes[offset..offset + 8].try_into().expect("length checked"));
        offset += 8;
        let fee = u64::from_be_bytes(bytes[offset..offset + 8].try_into().expect("length checked"));
        offset += 8;
        let nonce = u64::from_be_bytes(bytes[offset..offset + 8].try_into().expect("length checked"));

        Ok(Self {
            version,
            sig,
            from_pubkey,
            to_pubkey,
            amount,
            fee,
            nonce,
        })
    }

    /// Transaction id: double SHA-256 over the full wire bytes.
    pub fn hash(&self) -> TxHash {
        let first = Sha256::digest(self.to_bytes());
        let second: [u8; 32] = Sha256::digest(first).into();
        TxHash::from(second)
    }

    pub fn size_bytes(&self) -> u64 {
        RAW_TX_SIZE as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_tx() -> RawTransaction {
        RawTransaction {
            version: 1,
            sig: [0x11; 64],
            from_pubkey: [0x22; 65],
            to_pubkey: [0x33; 65],
            amount: 1000,
            fee: 5,
            nonce: 42,
        }
    }

    #[test]
    fn envelope_excludes_signature() {
        let tx = sample_tx();
        let envelope = tx.envelope();
        assert_eq!(envelope.len(), TX_ENVELOPE_SIZE);
        assert_eq!(envelope[0], 1);
        // from_pubkey directly follows the version byte
        assert_eq!(&envelope[1..66], &[0x22; 65][..]);
        assert!(!envelope.windows(64).any(|w| w == [0x11; 64]));
    }

    #[test]
    fn wire_bytes_layout() {
        let tx = sample_tx();
        let bytes = tx.to_bytes();
        assert_eq!(bytes.len(), RAW_TX_SIZE);
        assert_eq!(bytes[0], 1);
        assert_eq!(&bytes[1..65], &[0x11; 64][..]);
        assert_eq!(&bytes[65..130], &[0x22; 65][..]);
        assert_eq!(&bytes[130..195], &[0x33; 65][..]);
        assert_eq!(&bytes[195..203], &1000u64.to_be_bytes());
        assert_eq!(&bytes[203..211], &5u64.to_be_bytes());
        assert_eq!(&bytes[211..219], &42u64.to_be_bytes());
    }

    #[test]
    fn decode_round_trip() {
        let tx = sample_tx();
        let decoded = RawTransaction::from_bytes(&tx.to_bytes()).unwrap();
        assert_eq!(decoded, tx);
        assert_eq!(decoded.hash(), tx.hash());
    }

    #[test]
    fn decode_rejects_wrong_length() {
        let tx = sample_tx();
        let mut bytes = tx.to_bytes();
        bytes.pop();
        assert!(matches!(
            RawTransaction::from_bytes(&bytes),
            Err(TxDecodeError::UnexpectedLength { expected: RAW_TX_SIZE, actual }) if actual == RAW_TX_SIZE - 1
        ));
    }

    #[test]
    fn hash_commits_to_signature() {
        let tx = sample_tx();
        let mut other = tx.clone();
        other.sig[0] ^= 0xff;
        assert_ne!(tx.hash(), other.hash());
    }

    #[test]
    fn json_uses_short_key_names() {
        let tx = sample_tx();
        let json = serde_json::to_string(&tx).unwrap();
        assert!(json.contains("\"from\""));
        assert!(json.contains("\"to\""));
        assert!(!json.contains("from_pubkey"));
        let back: RawTransaction = serde_json::from_str(&json).unwrap();
        assert_eq!(back, tx);
    }
}
