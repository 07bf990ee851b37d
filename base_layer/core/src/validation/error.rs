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
use thiserror::Error;

use crate::transactions::TransactionError;

/// Everything that can disqualify a block before it reaches the store. The first failing check
/// wins; no state changes on any of these.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// Not necessarily fatal for the block: the caller may trigger a chain sync and retry.
    #[error("Parent block {0} is not known")]
    UnknownParent(BlockHash),
    #[error("Block timestamp {timestamp} is more than the allowed clock drift past local time (limit {limit})")]
    FutureTimestamp { timestamp: u64, limit: u64 },
    #[error("Header declares {expected} transactions but the body holds {actual}")]
    TransactionCountMismatch { expected: u64, actual: u64 },
    #[error("Transaction {index} is invalid: {source}")]
    InvalidTransaction {
        index: usize,
        #[source]
        source: TransactionError,
    },
    #[error("Computed transactions merkle root {computed} does not match header root {claimed}")]
    MerkleRootMismatch { claimed: FixedHash, computed: FixedHash },
    #[error("Block hash {hash} does not satisfy the epoch difficulty target")]
    InvalidProofOfWork { hash: BlockHash },
    #[error("Block of {size} bytes exceeds the {max} byte limit")]
    BlockTooLarge { size: u64, max: u64 },
}
