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

use primitive_types::{U256, U512};

use crate::{consensus::ConsensusConstants, proof_of_work::Epoch};

/// Computes the difficulty target for the epoch a boundary block opens.
///
/// The observed duration of the previous epoch is scaled against the configured target duration:
/// an epoch that took twice as long doubles the target (makes mining easier), one that finished
/// in half the time halves it. The duration is clamped to at least one millisecond so a
/// non-monotone boundary timestamp cannot zero the target, and the result is floored at 1. No
/// upper cap is applied.
pub fn next_difficulty(prev_epoch: &Epoch, boundary_timestamp: u64, constants: &ConsensusConstants) -> U256 {
    let actual_millis = boundary_timestamp.saturating_sub(prev_epoch.start_time).max(1);
    let target_millis = constants
        .target_epoch_length_millis()
        .saturating_mul(constants.epoch_length_blocks())
        .max(1);

    // The product can exceed 256 bits, so widen before multiplying.
    let scaled = widen(prev_epoch.difficulty) * U512::from(actual_millis) / U512::from(target_millis);
    narrow(scaled).max(U256::one())
}

fn widen(value: U256) -> U512 {
    let mut buf = [0u8; 64];
    value.to_big_endian(&mut buf[32..]);
    U512::from_big_endian(&buf)
}

fn narrow(value: U512) -> U256 {
    let mut buf = [0u8; 64];
    value.to_big_endian(&mut buf);
    if buf[..32].iter().any(|b| *b != 0) {
        return U256::MAX;
    }
    U256::from_big_endian(&buf[32..])
}

#[cfg(test)]
mod tests {
    use jarrah_common_types::types::BlockHash;

    use super::*;
    use crate::consensus::ConsensusConstantsBuilder;

    fn epoch_with(difficulty: U256, start_time: u64) -> Epoch {
        Epoch {
            number: 0,
            start_block_hash: BlockHash::zero(),
            start_time,
            start_height: 0,
            difficulty,
        }
    }

    fn constants(epoch_length: u64, target_millis: u64) -> ConsensusConstants {
        ConsensusConstantsBuilder::new()
            .with_epoch_length(epoch_length)
            .with_target_epoch_length_millis(target_millis)
            .build()
    }

    #[test]
    fn on_target_epoch_keeps_difficulty() {
        let constants = constants(2, 2000);
        let prev = epoch_with(U256::from(1_000_000u64), 0);
        assert_eq!(next_difficulty(&prev, 4000, &constants), U256::from(1_000_000u64));
    }

    #[test]
    fn fast_epoch_lowers_target() {
        let constants = constants(2, 2000);
        let prev = epoch_with(U256::from(1_000_000u64), 0);
        // Half the target duration halves the target, i.e. doubles the difficulty.
        assert_eq!(next_difficulty(&prev, 2000, &constants), U256::from(500_000u64));
    }

    #[test]
    fn slow_epoch_raises_target() {
        let constants = constants(2, 2000);
        let prev = epoch_with(U256::from(1_000_000u64), 0);
        assert_eq!(next_difficulty(&prev, 8000, &constants), U256::from(2_000_000u64));
    }

    #[test]
    fn zero_duration_clamps_to_one_millisecond() {
        let constants = constants(2, 2000);
        let prev = epoch_with(U256::from(4000u64), 1000);
        // boundary timestamp equal to (or before) the epoch start clamps to 1ms
        assert_eq!(next_difficulty(&prev, 1000, &constants), U256::one());
        assert_eq!(next_difficulty(&prev, 500, &constants), U256::one());
    }

    #[test]
    fn result_is_floored_at_one() {
        let constants = constants(2, 2000);
        let prev = epoch_with(U256::one(), 0);
        assert_eq!(next_difficulty(&prev, 1, &constants), U256::one());
    }

    #[test]
    fn large_difficulty_does_not_overflow() {
        let constants = constants(2, 2000);
        let prev = epoch_with(U256::MAX, 0);
        // 8000/4000 doubles a target already at the ceiling; the result saturates instead of
        // wrapping
        assert_eq!(next_difficulty(&prev, 8000, &constants), U256::MAX);
    }
}
