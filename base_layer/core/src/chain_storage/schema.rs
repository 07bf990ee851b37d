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

// Hashes, keys and 256-bit integers are BLOBs; big integers are fixed 32-byte big-endian so that
// SQLite's memcmp ordering on `acc_work` is numeric ordering. `id` columns are the insertion
// order used for first-seen tie-breaking.

diesel::table! {
    blocks (id) {
        id -> Integer,
        hash -> Binary,
        parent_hash -> Binary,
        difficulty -> Binary,
        timestamp -> BigInt,
        num_transactions -> BigInt,
        transactions_merkle_root -> Binary,
        nonce -> Binary,
        graffiti -> Binary,
        height -> BigInt,
        epoch -> Text,
        size_bytes -> BigInt,
        acc_work -> Binary,
    }
}

diesel::table! {
    epochs (id) {
        id -> Text,
        start_block_hash -> Binary,
        start_time -> BigInt,
        start_height -> BigInt,
        difficulty -> Binary,
    }
}

diesel::table! {
    transactions (id) {
        id -> Integer,
        hash -> Binary,
        block_hash -> Binary,
        tx_index -> BigInt,
        version -> SmallInt,
        sig -> Binary,
        from_pubkey -> Binary,
        to_pubkey -> Binary,
        amount -> BigInt,
        fee -> BigInt,
        nonce -> BigInt,
    }
}

diesel::joinable!(blocks -> epochs (epoch));

diesel::allow_tables_to_appear_in_same_query!(blocks, epochs, transactions);
