//! Logical protocol messages
//!
//! Message contents are plain values; encoding them for a wire is left to the
//! transport. Every message after setup carries the `RunId` chosen by party A
//! so that data from one run cannot be replayed into another.
//!
//! | Round | Direction | Message |
//! |-------|-----------|---------|
//! | setup | B → A | [`PublicKeyMessage`] |
//! | 1 | A → B | [`Round1Message`] |
//! | 2 | B → A | [`Round2Message`] |
//! | 3 | A → B | [`Round3Message`] |

use std::fmt;
use uuid::Uuid;

use crate::crypto::{Group, HomomorphicCipher};

/// Identifies one protocol run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RunId(Uuid);

impl RunId {
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Setup: B's homomorphic public key
#[derive(Debug, Clone)]
pub struct PublicKeyMessage<C: HomomorphicCipher> {
    pub public_key: C::PublicKey,
}

/// Round 1: `H(v) * k1` for every v in A's set, shuffled
#[derive(Debug, Clone)]
pub struct Round1Message<G: Group> {
    pub run_id: RunId,
    pub blinded: Vec<G::Element>,
}

/// Round 2: A's elements with `k2` applied, plus B's `(H(w) * k2, Enc(t))`
/// pairs. Both lists are shuffled independently; each pair stays intact.
#[derive(Debug, Clone)]
pub struct Round2Message<G: Group, C: HomomorphicCipher> {
    pub run_id: RunId,
    pub double_blinded: Vec<G::Element>,
    pub pairs: Vec<(G::Element, C::Ciphertext)>,
}

/// Round 3: the re-randomized encrypted intersection sum
#[derive(Debug, Clone)]
pub struct Round3Message<C: HomomorphicCipher> {
    pub run_id: RunId,
    pub encrypted_sum: C::Ciphertext,
}
