//! Uniform shuffling of round messages
//!
//! `rand`'s `SliceRandom::shuffle` is a Fisher-Yates shuffle with unbiased
//! index sampling, so the permutation is uniform as long as the generator is.
//! The `CryptoRng` bound keeps non-cryptographic generators out.

use rand::seq::SliceRandom;
use rand::{CryptoRng, RngCore};

/// Shuffle in place with a uniformly random permutation
pub fn secure_shuffle<T, R: RngCore + CryptoRng>(items: &mut [T], rng: &mut R) {
    items.shuffle(rng);
}
