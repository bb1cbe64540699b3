//! Cryptographic collaborators for the intersection-sum protocol
//!
//! This module implements:
//! - The `Group` capability (prime-order group with hash-to-group) and its
//!   Ristretto255 adapter, used for commutative blinding
//! - The `HomomorphicCipher` capability and its Paillier adapter, used to
//!   carry values through the matching step
//! - Uniform CSPRNG shuffling for round messages
//!
//! Protocol code only ever talks to the traits; swapping a backend does not
//! touch `crate::protocol`.

pub mod group;
pub mod paillier;
pub mod ristretto;
pub mod shuffle;

use thiserror::Error;

pub use group::{BlindingKey, Group, GroupParameters};
pub use paillier::{
    HomomorphicCipher, Paillier, PaillierCiphertext, PaillierPublicKey, PaillierSecretKey,
};
pub use ristretto::RistrettoGroup;
pub use shuffle::secure_shuffle;

/// Failures reported by the group or cipher backends
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    #[error("Randomness source failed: {0}")]
    Randomness(String),

    #[error("Key generation failed: {0}")]
    KeyGeneration(String),

    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Invalid ciphertext: {0}")]
    InvalidCiphertext(String),

    #[error("Decrypted plaintext does not fit in {bits} bits")]
    PlaintextOverflow { bits: u32 },
}
