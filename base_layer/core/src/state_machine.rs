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

//! The seam between consensus and the application. The engine sequences transactions; what they
//! mean is entirely the state machine's business.

use thiserror::Error;

use crate::{blocks::Block, transactions::RawTransaction};

#[derive(Debug, Error)]
pub enum StateMachineError {
    #[error("Transaction rejected: {0}")]
    TransactionRejected(String),
    #[error("State transition failed: {0}")]
    TransitionFailed(String),
}

/// Application hooks invoked by the consensus engine. `verify_tx` gates transactions into blocks
/// and the mempool; `apply_block`/`revert_block` are driven by the orchestrator whenever the tip
/// moves, including the revert-then-reapply walk across a reorg's fork point.
pub trait StateMachine: Send + Sync {
    fn verify_tx(&self, tx: &RawTransaction) -> Result<(), StateMachineError>;

    fn apply_block(&self, block: &Block) -> Result<(), StateMachineError>;

    fn revert_block(&self, block: &Block) -> Result<(), StateMachineError>;
}

/// Accepts every transaction and ignores block application. Useful for tests and for nodes that
/// only relay.
#[derive(Debug, Default, Clone)]
pub struct NullStateMachine;

impl StateMachine for NullStateMachine {
    fn verify_tx(&self, _tx: &RawTransaction) -> Result<(), StateMachineError> {
        Ok(())
    }

    fn apply_block(&self, _block: &Block) -> Result<(), StateMachineError> {
        Ok(())
    }

    fn revert_block(&self, _block: &Block) -> Result<(), StateMachineError> {
        Ok(())
    }
}
