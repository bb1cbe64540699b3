//! Private Intersection-Sum protocol
//!
//! Party A holds a set of identifiers. Party B holds identifier → value
//! pairs. After three rounds B learns the sum of values whose identifiers are
//! in A's set; A learns nothing about values.
//!
//! # Protocol Overview
//!
//! 0. **Setup**: B sends its homomorphic public key to A
//! 1. **Round 1**: A sends `H(v) * k1` for its identifiers, shuffled
//! 2. **Round 2**: B applies `k2` to A's elements (shuffled), and sends
//!    `(H(w) * k2, Enc(t))` for its own pairs (shuffled as tuples)
//! 3. **Round 3**: A applies `k1` to B's elements, sums the ciphertexts whose
//!    element appears among the doubly-blinded set, re-randomizes, sends one
//!    ciphertext
//! 4. **Output**: B decrypts the sum
//!
//! # Security Properties
//!
//! - **Semi-honest only**: no defenses against a deviating party
//! - **Fresh keys**: blinding keys live for one run and are zeroized on drop
//! - **Size leakage**: `|V|` and `|WT|` are visible from message lengths
//!   unless `ProtocolConfig::pad_to` is set
//! - **Cardinality**: A necessarily sees how many of B's elements matched
//!   while computing round 3; it is never logged or returned

pub mod channel;
pub mod coordinator;
pub mod error;
pub mod identifier;
pub mod messages;
pub mod party_a;
pub mod party_b;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::crypto::paillier::DEFAULT_MODULUS_BITS;
use crate::crypto::{group::DEFAULT_HASH_DOMAIN, GroupParameters, Paillier, RistrettoGroup};

pub use channel::run_over_channels;
pub use coordinator::{Coordinator, ProtocolState};
pub use error::ProtocolError;
pub use identifier::Identifier;
pub use messages::{PublicKeyMessage, Round1Message, Round2Message, Round3Message, RunId};
pub use party_a::PartyA;
pub use party_b::PartyB;

/// Protocol tuning shared by both parties
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtocolConfig {
    /// Paillier modulus size in bits
    pub modulus_bits: usize,

    /// Run per-element transforms of rounds 1 and 2 on the rayon pool
    pub parallel: bool,

    /// Pad round-1 and round-2 lists with dummies up to this length (0 = off)
    pub pad_to: usize,

    /// Hash-to-group domain separator; both parties must agree
    pub hash_domain: String,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            modulus_bits: DEFAULT_MODULUS_BITS,
            parallel: true,
            pad_to: 0,
            hash_domain: DEFAULT_HASH_DOMAIN.to_string(),
        }
    }
}

impl ProtocolConfig {
    pub fn validate(&self) -> Result<(), ProtocolError> {
        self.group_parameters()?;
        self.cipher()?;
        Ok(())
    }

    pub fn group_parameters(&self) -> Result<GroupParameters, ProtocolError> {
        GroupParameters::new(&self.hash_domain)
            .map_err(|e| ProtocolError::InvalidInput(e.to_string()))
    }

    pub fn cipher(&self) -> Result<Paillier, ProtocolError> {
        Paillier::new(self.modulus_bits).map_err(|e| ProtocolError::InvalidInput(e.to_string()))
    }

    /// Number of dummies needed to bring `actual` entries up to `pad_to`
    pub(crate) fn padding_for(&self, actual: usize) -> usize {
        self.pad_to.saturating_sub(actual)
    }
}

/// Apply `f` to every item, on the rayon pool when `parallel` is set.
///
/// Output order matches input order; callers shuffle afterwards.
pub(crate) fn transform<T, U, F>(items: &[T], parallel: bool, f: F) -> Result<Vec<U>, ProtocolError>
where
    T: Sync,
    U: Send,
    F: Fn(&T) -> Result<U, ProtocolError> + Sync + Send,
{
    if parallel {
        items.par_iter().map(f).collect()
    } else {
        items.iter().map(f).collect()
    }
}

/// Run one complete protocol in-process with the Ristretto255 + Paillier
/// backends and return B's output.
pub fn intersection_sum<I, A, P, B>(
    identifiers: I,
    values: P,
    config: &ProtocolConfig,
) -> Result<u128, ProtocolError>
where
    I: IntoIterator<Item = A>,
    A: Into<Identifier>,
    P: IntoIterator<Item = (B, u64)>,
    B: Into<Identifier>,
{
    config.validate()?;
    let group = RistrettoGroup::new(config.group_parameters()?);
    let cipher = config.cipher()?;

    let party_a = PartyA::new(identifiers, group.clone(), cipher, config)?;
    let party_b = PartyB::new(values, group, cipher, config)?;

    Coordinator::new(party_a, party_b).run()
}
