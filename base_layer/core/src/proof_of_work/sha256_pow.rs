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
use primitive_types::{U256, U512};

use crate::{blocks::RawBlock, common::hash_to_u256, proof_of_work::PowError};

/// A block hash satisfies a target iff, read as a big-endian unsigned integer, it is strictly
/// below the target.
pub fn verify_pow(hash: &BlockHash, target: &U256) -> bool {
    hash_to_u256(hash) < *target
}

/// The work represented by a 256-bit value: `2^256 / (x + 1)`. Applied to a block hash it gives
/// the block's chain-weight contribution; applied to a difficulty target it scores how hard that
/// target is to meet.
pub fn calculate_work(value: &U256) -> U256 {
    let numerator = U512::one() << 256;
    let work = numerator / (widen(value) + U512::one());
    // only the all-zero input can produce work that overflows 256 bits
    narrow_saturating(work)
}

/// Searches for a proof-of-work solution by incrementing a big-integer nonce from
/// `start_nonce + 1`. Each attempt seals `SHA-256(nonce)` into the header (the nonce-hashing step
/// is part of the protocol, not an optimisation) and tests the resulting block hash against the
/// target. Returns the winning nonce integer; the caller seals it with
/// [`RawBlock::set_nonce`] to produce the final block.
pub fn solve_pow(
    template: &RawBlock,
    start_nonce: U256,
    target: &U256,
    max_iterations: u64,
) -> Result<U256, PowError> {
    let mut block = template.clone();
    let mut nonce = start_nonce;

    for _ in 0..max_iterations {
        nonce = nonce.overflowing_add(U256::one()).0;
        block.set_nonce(nonce);
        if verify_pow(&block.hash(), target) {
            return Ok(nonce);
        }
    }

    Err(PowError::NoSolutionFound(max_iterations))
}

fn widen(value: &U256) -> U512 {
    let mut buf = [0u8; 64];
    value.to_big_endian(&mut buf[32..]);
    U512::from_big_endian(&buf)
}

fn narrow_saturating(value: U512) -> U256 {
    let mut buf = [0u8; 64];
    value.to_big_endian(&mut buf);
    if buf[..32].iter().any(|b| *b != 0) {
        return U256::MAX;
    }
    U256::from_big_endian(&buf[32..])
}

#[cfg(test)]
mod tests {
    use jarrah_common_types::types::FixedHash;

    use super::*;

    #[test]
    fn verify_pow_is_strict_inequality() {
        let target = U256::from(1000u64);
        let mut hash_bytes = [0u8; 32];
        hash_bytes[24..].copy_from_slice(&999u64.to_be_bytes());
        assert!(verify_pow(&BlockHash::from(hash_bytes), &target));
        hash_bytes[24..].copy_from_slice(&1000u64.to_be_bytes());
        assert!(!verify_pow(&BlockHash::from(hash_bytes), &target));
    }

    #[test]
    fn work_of_max_value_is_one() {
        assert_eq!(calculate_work(&U256::MAX), U256::one());
    }

    #[test]
    fn work_halves_as_target_doubles() {
        // 2^255 - 1 covers half the hash space: two expected attempts
        let half = (U256::one() << 255) - U256::one();
        assert_eq!(calculate_work(&half), U256::from(2u64));
        // 2^252 - 1 (the 0x0fff... target) needs sixteen
        let sixteenth = (U256::one() << 252) - U256::one();
        assert_eq!(calculate_work(&sixteenth), U256::from(16u64));
    }

    #[test]
    fn work_of_zero_saturates() {
        assert_eq!(calculate_work(&U256::zero()), U256::MAX);
    }

    #[test]
    fn solver_finds_and_seals_a_valid_nonce() {
        let template = RawBlock::new(FixedHash::from([9u8; 32]), 0, vec![]);
        let target = U256::MAX >> 4;
        let nonce = solve_pow(&template, U256::zero(), &target, 1_000_000).unwrap();

        let mut sealed = template.clone();
        sealed.set_nonce(nonce);
        assert!(verify_pow(&sealed.hash(), &target));
    }

    #[test]
    fn solver_gives_up_after_max_iterations() {
        let template = RawBlock::new(FixedHash::zero(), 0, vec![]);
        // an unsatisfiable target: no hash is strictly below zero
        let err = solve_pow(&template, U256::zero(), &U256::zero(), 10).unwrap_err();
        assert_eq!(err, PowError::NoSolutionFound(10));
    }

    #[test]
    fn solver_resumes_past_start_nonce() {
        let template = RawBlock::new(FixedHash::from([3u8; 32]), 0, vec![]);
        let target = U256::MAX >> 2;
        let first = solve_pow(&template, U256::zero(), &target, 1_000_000).unwrap();
        let second = solve_pow(&template, first, &target, 1_000_000).unwrap();
        assert!(second > first);
    }
}
