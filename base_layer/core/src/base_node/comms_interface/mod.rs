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

//! The node's two faces to the network: typed handlers for requests coming in, and a typed
//! request/reply channel for messages going out. The transport that actually ships bytes lives
//! outside this crate and simply drains/feeds these channels.

mod error;
mod inbound_handlers;
mod messages;
mod outbound_interface;

pub use error::CommsInterfaceError;
pub use inbound_handlers::{InboundNodeCommsHandlers, NewBlockOutcome};
pub use messages::{HeartbeatMessage, WireMessage};
pub use outbound_interface::{OutboundMessageRequest, OutboundNodeCommsInterface, OutboundRequest, OutboundResponse};

/// Opaque peer address. The transport decides what it means.
pub type PeerId = String;

/// Upper bound on hashes per `get_blocks` request; servers refuse anything larger.
pub const MAX_BLOCKS_PER_REQUEST: usize = 10;

/// Upper bound on headers served per `get_headers` request.
pub const MAX_HEADERS_PER_REQUEST: usize = 10;
