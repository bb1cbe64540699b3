//! Additively homomorphic encryption capability and its Paillier adapter
//!
//! # Scheme
//!
//! Key generation picks two distinct primes `p`, `q` of `modulus_bits / 2`
//! bits, `n = p * q`, generator `g = n + 1`, `phi = (p - 1)(q - 1)` and
//! `mu = phi^-1 mod n`.
//!
//! - `Enc(m) = (1 + m * n) * r^n mod n^2` for uniform `r` in `[1, n)`
//! - `Enc(a) * Enc(b) mod n^2 = Enc(a + b)`
//! - `Dec(c) = L(c^phi mod n^2) * mu mod n` where `L(u) = (u - 1) / n`
//!
//! `mu` is computed as `phi^(phi - 1) mod n` (Euler's theorem, since
//! `gcd(phi, n) = 1` for equal-length primes) and verified before use.

use num_bigint_dig::{BigUint, RandPrime};
use rand::rngs::StdRng;
use rand::{CryptoRng, RngCore, SeedableRng};
use std::fmt::Debug;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use super::CryptoError;

/// Smallest accepted modulus (tests only; production uses the default)
pub const MIN_MODULUS_BITS: usize = 256;

/// Default Paillier modulus size
pub const DEFAULT_MODULUS_BITS: usize = 2048;

/// Bytes of a big integer shown in `Debug` output
const DEBUG_PREFIX_BYTES: usize = 8;

/// Additively homomorphic public-key encryption under a single key.
///
/// Plaintexts are non-negative integers. `rerandomize` defaults to adding a
/// fresh encryption of zero, which yields a ciphertext distributed exactly
/// like a fresh encryption of the same plaintext.
pub trait HomomorphicCipher: Clone + Send + Sync + 'static {
    type PublicKey: Clone + Debug + Send + Sync;
    type SecretKey: ZeroizeOnDrop + Send + Sync;
    type Ciphertext: Clone + Debug + PartialEq + Send + Sync;

    fn keygen<R: RngCore + CryptoRng>(
        &self,
        rng: &mut R,
    ) -> Result<(Self::PublicKey, Self::SecretKey), CryptoError>;

    fn encrypt<R: RngCore + CryptoRng>(
        &self,
        public_key: &Self::PublicKey,
        value: u64,
        rng: &mut R,
    ) -> Result<Self::Ciphertext, CryptoError>;

    fn add(
        &self,
        public_key: &Self::PublicKey,
        lhs: &Self::Ciphertext,
        rhs: &Self::Ciphertext,
    ) -> Result<Self::Ciphertext, CryptoError>;

    fn decrypt(
        &self,
        secret_key: &Self::SecretKey,
        ciphertext: &Self::Ciphertext,
    ) -> Result<u128, CryptoError>;

    fn rerandomize<R: RngCore + CryptoRng>(
        &self,
        public_key: &Self::PublicKey,
        ciphertext: &Self::Ciphertext,
        rng: &mut R,
    ) -> Result<Self::Ciphertext, CryptoError> {
        let zero = self.encrypt(public_key, 0, rng)?;
        self.add(public_key, ciphertext, &zero)
    }
}

/// Paillier backend configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paillier {
    modulus_bits: usize,
}

impl Paillier {
    pub fn new(modulus_bits: usize) -> Result<Self, CryptoError> {
        if modulus_bits < MIN_MODULUS_BITS || modulus_bits % 2 != 0 {
            return Err(CryptoError::InvalidParameters(format!(
                "Paillier modulus must be an even number of bits >= {}, got {}",
                MIN_MODULUS_BITS, modulus_bits
            )));
        }

        Ok(Self { modulus_bits })
    }

    pub fn modulus_bits(&self) -> usize {
        self.modulus_bits
    }
}

impl Default for Paillier {
    fn default() -> Self {
        Self {
            modulus_bits: DEFAULT_MODULUS_BITS,
        }
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct PaillierPublicKey {
    n: BigUint,
    n_squared: BigUint,
}

impl PaillierPublicKey {
    pub fn modulus_bits(&self) -> usize {
        self.n.bits()
    }

    fn check(&self, ciphertext: &PaillierCiphertext) -> Result<(), CryptoError> {
        if ciphertext.0 == BigUint::from(0u32) || ciphertext.0 >= self.n_squared {
            return Err(CryptoError::InvalidCiphertext(
                "ciphertext outside (0, n^2)".to_string(),
            ));
        }
        Ok(())
    }
}

impl Debug for PaillierPublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaillierPublicKey")
            .field("bits", &self.n.bits())
            .field("n", &debug_prefix(&self.n))
            .finish()
    }
}

/// Paillier secret key, zeroized on drop
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct PaillierSecretKey {
    n: BigUint,
    n_squared: BigUint,
    phi: BigUint,
    mu: BigUint,
}

impl Debug for PaillierSecretKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("PaillierSecretKey(<redacted>)")
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct PaillierCiphertext(BigUint);

impl PaillierCiphertext {
    pub fn from_bytes_be(bytes: &[u8]) -> Self {
        Self(BigUint::from_bytes_be(bytes))
    }
}

impl Debug for PaillierCiphertext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PaillierCiphertext({})", debug_prefix(&self.0))
    }
}

fn debug_prefix(value: &BigUint) -> String {
    let bytes = value.to_bytes_be();
    let shown = bytes.len().min(DEBUG_PREFIX_BYTES);
    format!("{}..", hex::encode(&bytes[..shown]))
}

fn randomness_error(e: rand::Error) -> CryptoError {
    CryptoError::Randomness(e.to_string())
}

/// Uniform randomizer in `[1, n)`, rejection-sampled from `n.bits()` random bits
fn sample_unit<R: RngCore + CryptoRng>(
    n: &BigUint,
    rng: &mut R,
) -> Result<BigUint, CryptoError> {
    let bits = n.bits();
    let mut buf = Zeroizing::new(vec![0u8; (bits + 7) / 8]);
    let top_mask = 0xffu8 >> (buf.len() * 8 - bits);
    let zero = BigUint::from(0u32);

    loop {
        rng.try_fill_bytes(&mut buf).map_err(randomness_error)?;
        buf[0] &= top_mask;
        let r = BigUint::from_bytes_be(&buf);
        if r != zero && &r < n {
            return Ok(r);
        }
    }
}

impl HomomorphicCipher for Paillier {
    type PublicKey = PaillierPublicKey;
    type SecretKey = PaillierSecretKey;
    type Ciphertext = PaillierCiphertext;

    fn keygen<R: RngCore + CryptoRng>(
        &self,
        rng: &mut R,
    ) -> Result<(PaillierPublicKey, PaillierSecretKey), CryptoError> {
        let one = BigUint::from(1u32);
        let prime_bits = self.modulus_bits / 2;
        let mut rng = StdRng::from_rng(rng).map_err(randomness_error)?;

        // Each attempt succeeds with overwhelming probability
        for _ in 0..16 {
            let p: BigUint = rng.gen_prime(prime_bits);
            let q: BigUint = rng.gen_prime(prime_bits);
            if p == q {
                continue;
            }

            let n = &p * &q;
            if n.bits() != self.modulus_bits {
                continue;
            }

            let phi = (&p - &one) * (&q - &one);
            let mu = phi.modpow(&(&phi - &one), &n);
            if (&phi * &mu) % &n != one {
                continue;
            }

            let n_squared = &n * &n;
            let public_key = PaillierPublicKey {
                n: n.clone(),
                n_squared: n_squared.clone(),
            };
            let secret_key = PaillierSecretKey {
                n,
                n_squared,
                phi,
                mu,
            };
            return Ok((public_key, secret_key));
        }

        Err(CryptoError::KeyGeneration(
            "no valid prime pair found".to_string(),
        ))
    }

    fn encrypt<R: RngCore + CryptoRng>(
        &self,
        public_key: &PaillierPublicKey,
        value: u64,
        rng: &mut R,
    ) -> Result<PaillierCiphertext, CryptoError> {
        let n = &public_key.n;
        let n_squared = &public_key.n_squared;

        // g^m = (n + 1)^m = 1 + m * n (mod n^2)
        let g_m = (BigUint::from(1u32) + BigUint::from(value) * n) % n_squared;
        let r = sample_unit(n, rng)?;
        let r_n = r.modpow(n, n_squared);

        Ok(PaillierCiphertext((g_m * r_n) % n_squared))
    }

    fn add(
        &self,
        public_key: &PaillierPublicKey,
        lhs: &PaillierCiphertext,
        rhs: &PaillierCiphertext,
    ) -> Result<PaillierCiphertext, CryptoError> {
        public_key.check(lhs)?;
        public_key.check(rhs)?;

        Ok(PaillierCiphertext((&lhs.0 * &rhs.0) % &public_key.n_squared))
    }

    fn decrypt(
        &self,
        secret_key: &PaillierSecretKey,
        ciphertext: &PaillierCiphertext,
    ) -> Result<u128, CryptoError> {
        let zero = BigUint::from(0u32);
        if ciphertext.0 == zero || ciphertext.0 >= secret_key.n_squared {
            return Err(CryptoError::InvalidCiphertext(
                "ciphertext outside (0, n^2)".to_string(),
            ));
        }

        let u = ciphertext.0.modpow(&secret_key.phi, &secret_key.n_squared);
        if (&u % &secret_key.n) != BigUint::from(1u32) {
            return Err(CryptoError::InvalidCiphertext(
                "ciphertext is not an encryption under this key".to_string(),
            ));
        }

        let l = (u - BigUint::from(1u32)) / &secret_key.n;
        let plaintext = (l * &secret_key.mu) % &secret_key.n;

        let bytes = plaintext.to_bytes_be();
        if bytes.len() > 16 {
            return Err(CryptoError::PlaintextOverflow { bits: 128 });
        }
        let mut buf = [0u8; 16];
        buf[16 - bytes.len()..].copy_from_slice(&bytes);

        Ok(u128::from_be_bytes(buf))
    }
}
