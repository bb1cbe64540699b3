//! Prime-order group capability used for commutative blinding
//!
//! # Blinding
//!
//! Each party holds a secret scalar `k`. An identifier `x` is blinded as
//! `H(x) * k`, where `H` is the protocol-wide hash-to-group map. Because
//! scalar multiplication commutes,
//!
//! ```text
//! (H(x) * k1) * k2 == (H(x) * k2) * k1
//! ```
//!
//! so two parties can compare doubly-blinded elements without either one
//! learning the other's identifiers.

use rand::{CryptoRng, RngCore};
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::CryptoError;

/// Default hash-to-group domain separator
pub const DEFAULT_HASH_DOMAIN: &str = "psi-sum/v1/ristretto255";

/// Immutable group parameters shared by both parties of one run.
///
/// Both parties must be constructed from equal parameters, otherwise their
/// hash-to-group maps disagree and no element ever matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupParameters {
    hash_domain: Arc<[u8]>,
}

impl GroupParameters {
    pub fn new(hash_domain: impl AsRef<[u8]>) -> Result<Self, CryptoError> {
        let hash_domain = hash_domain.as_ref();
        if hash_domain.is_empty() {
            return Err(CryptoError::InvalidParameters(
                "hash domain must not be empty".to_string(),
            ));
        }

        Ok(Self {
            hash_domain: Arc::from(hash_domain),
        })
    }

    /// Domain separator prepended to every hash-to-group input
    pub fn hash_domain(&self) -> &[u8] {
        &self.hash_domain
    }
}

impl Default for GroupParameters {
    fn default() -> Self {
        Self {
            hash_domain: Arc::from(DEFAULT_HASH_DOMAIN.as_bytes()),
        }
    }
}

/// A prime-order group with a hash-to-group map.
///
/// Implementations must guarantee:
/// - `random_scalar` samples uniformly from `[1, order - 1]`
/// - `scalar_mul` is a group homomorphism in the scalar, so blinding commutes
/// - `encode` is canonical: equal elements always encode to equal bytes
pub trait Group: Clone + Send + Sync + 'static {
    type Scalar: Clone + Send + Sync + Zeroize;
    type Element: Clone + Eq + Debug + Send + Sync;
    type Encoding: Clone + Eq + Hash + AsRef<[u8]> + Send + Sync;

    fn generator(&self) -> Self::Element;

    fn scalar_mul(&self, element: &Self::Element, scalar: &Self::Scalar) -> Self::Element;

    fn hash_to_group(&self, bytes: &[u8]) -> Result<Self::Element, CryptoError>;

    /// Canonical encoding, used as the key for membership tests
    fn encode(&self, element: &Self::Element) -> Self::Encoding;

    /// Fails with `CryptoError::Randomness` when `rng` cannot produce bytes
    fn random_scalar<R: RngCore + CryptoRng>(
        &self,
        rng: &mut R,
    ) -> Result<Self::Scalar, CryptoError>;

    /// Uniformly random element with unknown discrete log (padding dummies)
    fn random_element<R: RngCore + CryptoRng>(
        &self,
        rng: &mut R,
    ) -> Result<Self::Element, CryptoError>;
}

/// Per-run secret blinding scalar.
///
/// Never leaves the party that generated it and is zeroized on drop.
/// Deliberately not `Clone`: one key, one run.
pub struct BlindingKey<G: Group> {
    scalar: G::Scalar,
}

impl<G: Group> BlindingKey<G> {
    /// Sample a fresh key from `[1, order - 1]`
    pub fn generate<R: RngCore + CryptoRng>(
        group: &G,
        rng: &mut R,
    ) -> Result<Self, CryptoError> {
        Ok(Self {
            scalar: group.random_scalar(rng)?,
        })
    }

    /// Apply this key to an element: `element * k`
    pub fn blind(&self, group: &G, element: &G::Element) -> G::Element {
        group.scalar_mul(element, &self.scalar)
    }

    /// Hash an identifier into the group and blind it: `H(bytes) * k`
    pub fn hash_and_blind(&self, group: &G, bytes: &[u8]) -> Result<G::Element, CryptoError> {
        let hashed = group.hash_to_group(bytes)?;
        Ok(self.blind(group, &hashed))
    }
}

impl<G: Group> Drop for BlindingKey<G> {
    fn drop(&mut self) {
        self.scalar.zeroize();
    }
}

impl<G: Group> ZeroizeOnDrop for BlindingKey<G> {}

impl<G: Group> Debug for BlindingKey<G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("BlindingKey(<redacted>)")
    }
}
