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

//! Signature verification for transactions. Signing is the wallet's job and happens outside this
//! crate; the consensus engine only ever checks signatures it received.

use k256::ecdsa::{signature::Verifier, Signature, VerifyingKey};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("Public key is not a valid SEC1-encoded point")]
    InvalidPublicKey,
    #[error("Signature bytes are not a valid ECDSA signature")]
    InvalidSignatureEncoding,
    #[error("Signature does not verify against the public key")]
    VerificationFailed,
}

/// Verifies an ECDSA (secp256k1) signature over `message` against a 65-byte uncompressed SEC1
/// public key. The message is the transaction envelope.
pub fn verify_signature(from_pubkey: &[u8; 65], sig: &[u8; 64], message: &[u8]) -> Result<(), SignatureError> {
    let key = VerifyingKey::from_sec1_bytes(from_pubkey).map_err(|_| SignatureError::InvalidPublicKey)?;
    let signature = Signature::from_slice(sig).map_err(|_| SignatureError::InvalidSignatureEncoding)?;
    key.verify(message, &signature)
        .map_err(|_| SignatureError::VerificationFailed)
}

#[cfg(test)]
mod tests {
    use k256::ecdsa::{signature::Signer, SigningKey};
    use rand::rngs::OsRng;

    use super::*;

    fn keypair() -> (SigningKey, [u8; 65]) {
        let sk = SigningKey::random(&mut OsRng);
        let point = sk.verifying_key().to_encoded_point(false);
        let mut pubkey = [0u8; 65];
        pubkey.copy_from_slice(point.as_bytes());
        (sk, pubkey)
    }

    fn sign(sk: &SigningKey, message: &[u8]) -> [u8; 64] {
        let signature: Signature = sk.sign(message);
        let mut sig = [0u8; 64];
        sig.copy_from_slice(&signature.to_bytes());
        sig
    }

    #[test]
    fn valid_signature_verifies() {
        let (sk, pubkey) = keypair();
        let sig = sign(&sk, b"envelope bytes");
        verify_signature(&pubkey, &sig, b"envelope bytes").unwrap();
    }

    #[test]
    fn tampered_message_fails() {
        let (sk, pubkey) = keypair();
        let sig = sign(&sk, b"envelope bytes");
        assert_eq!(
            verify_signature(&pubkey, &sig, b"other bytes"),
            Err(SignatureError::VerificationFailed)
        );
    }

    #[test]
    fn wrong_key_fails() {
        let (sk, _) = keypair();
        let (_, other_pubkey) = keypair();
        let sig = sign(&sk, b"envelope bytes");
        assert_eq!(
            verify_signature(&other_pubkey, &sig, b"envelope bytes"),
            Err(SignatureError::VerificationFailed)
        );
    }

    #[test]
    fn garbage_key_is_rejected() {
        let sig = [0u8; 64];
        assert_eq!(
            verify_signature(&[0u8; 65], &sig, b"message"),
            Err(SignatureError::InvalidPublicKey)
        );
    }
}
