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

use crate::validation::ValidationError;

#[derive(Debug, Error)]
pub enum ChainStorageError {
    /// A block failed the acceptance pipeline. The nested error says which check; nothing was
    /// written.
    #[error("Block validation failed: {0}")]
    ValidationError(#[from] ValidationError),
    #[error("Block {0} is already stored")]
    BlockAlreadyExists(BlockHash),
    #[error("Block {0} not found")]
    BlockNotFound(BlockHash),
    #[error("Invalid query: {0}")]
    InvalidQuery(String),
    /// Access to the underlying storage mechanism failed.
    #[error("Storage access failure: {0}")]
    AccessError(String),
    /// The database contradicts its own invariants; check the logs and the disk.
    #[error("The database appears corrupted: {0}")]
    CorruptedDatabase(String),
    #[error("Database migration failed: {0}")]
    MigrationError(String),
    #[error("Could not connect to database: {0}")]
    ConnectionError(#[from] diesel::ConnectionError),
    #[error("Database query failed: {0}")]
    DieselError(#[from] diesel::result::Error),
    #[error("Failed to spawn blocking database task: {0}")]
    BlockingTaskSpawnError(String),
}
