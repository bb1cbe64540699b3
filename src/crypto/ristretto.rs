//! Ristretto255 adapter for the `Group` capability
//!
//! Hash-to-group uses `RistrettoPoint::from_hash` over SHA-512 of
//! `domain || len(domain) || identifier`, which yields a uniformly
//! distributed point with unknown discrete log. (Scalar-multiplying the
//! generator by a hash of the identifier would expose that discrete log and
//! make every blinded element trivially invertible.)

use curve25519_dalek::constants::RISTRETTO_BASEPOINT_POINT;
use curve25519_dalek::ristretto::RistrettoPoint;
use curve25519_dalek::scalar::Scalar;
use rand::{CryptoRng, RngCore};
use sha2::{Digest, Sha512};
use zeroize::Zeroizing;

use super::group::{Group, GroupParameters};
use super::CryptoError;

/// Canonical compressed encoding of a Ristretto point
pub type RistrettoEncoding = [u8; 32];

#[derive(Debug, Clone, Default)]
pub struct RistrettoGroup {
    params: GroupParameters,
}

impl RistrettoGroup {
    pub fn new(params: GroupParameters) -> Self {
        Self { params }
    }
}

impl Group for RistrettoGroup {
    type Scalar = Scalar;
    type Element = RistrettoPoint;
    type Encoding = RistrettoEncoding;

    fn generator(&self) -> RistrettoPoint {
        RISTRETTO_BASEPOINT_POINT
    }

    fn scalar_mul(&self, element: &RistrettoPoint, scalar: &Scalar) -> RistrettoPoint {
        element * scalar
    }

    fn hash_to_group(&self, bytes: &[u8]) -> Result<RistrettoPoint, CryptoError> {
        let domain = self.params.hash_domain();
        let hasher = Sha512::new()
            .chain_update(domain)
            .chain_update((domain.len() as u64).to_be_bytes())
            .chain_update(bytes);

        Ok(RistrettoPoint::from_hash(hasher))
    }

    fn encode(&self, element: &RistrettoPoint) -> RistrettoEncoding {
        element.compress().to_bytes()
    }

    fn random_scalar<R: RngCore + CryptoRng>(
        &self,
        rng: &mut R,
    ) -> Result<Scalar, CryptoError> {
        let mut wide = Zeroizing::new([0u8; 64]);
        // Rejection keeps the distribution uniform over [1, order - 1]
        loop {
            fill_wide(rng, &mut wide)?;
            let scalar = Scalar::from_bytes_mod_order_wide(&wide);
            if scalar != Scalar::ZERO {
                return Ok(scalar);
            }
        }
    }

    fn random_element<R: RngCore + CryptoRng>(
        &self,
        rng: &mut R,
    ) -> Result<RistrettoPoint, CryptoError> {
        let mut wide = [0u8; 64];
        fill_wide(rng, &mut wide)?;
        Ok(RistrettoPoint::from_uniform_bytes(&wide))
    }
}

fn fill_wide<R: RngCore + CryptoRng>(
    rng: &mut R,
    wide: &mut [u8; 64],
) -> Result<(), CryptoError> {
    rng.try_fill_bytes(wide)
        .map_err(|e| CryptoError::Randomness(e.to_string()))
}
