//! Party B: holds identifier → value pairs, drives round 2 and the output

use rand::rngs::OsRng;
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, info};

use super::messages::{PublicKeyMessage, Round1Message, Round2Message, Round3Message, RunId};
use super::{transform, Identifier, ProtocolConfig, ProtocolError};
use crate::crypto::{secure_shuffle, BlindingKey, Group, HomomorphicCipher};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    AwaitingRound1,
    Round2Sent,
    Done,
    Aborted,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::AwaitingRound1 => "awaiting round 1",
            Phase::Round2Sent => "round 2 sent",
            Phase::Done => "done",
            Phase::Aborted => "aborted",
        };
        f.write_str(name)
    }
}

/// Value-holding party.
///
/// Owns the blinding key `k2` and the homomorphic keypair. Both are sampled
/// at construction and zeroized when the party is dropped.
pub struct PartyB<G: Group, C: HomomorphicCipher> {
    group: G,
    cipher: C,
    config: ProtocolConfig,
    values: Vec<(Identifier, u64)>,
    key: BlindingKey<G>,
    public_key: C::PublicKey,
    secret_key: C::SecretKey,
    /// Adopted from the round-1 message
    run_id: Option<RunId>,
    phase: Phase,
}

impl<G: Group, C: HomomorphicCipher> PartyB<G, C> {
    /// Store the mapping, sample `k2` and generate a fresh keypair.
    ///
    /// If an identifier appears more than once, the last value wins. Fails
    /// with `InvalidInput` when the mapping is empty.
    pub fn new<P, K>(
        values: P,
        group: G,
        cipher: C,
        config: &ProtocolConfig,
    ) -> Result<Self, ProtocolError>
    where
        P: IntoIterator<Item = (K, u64)>,
        K: Into<Identifier>,
    {
        let mapping: HashMap<Identifier, u64> = values
            .into_iter()
            .map(|(id, value)| (id.into(), value))
            .collect();
        if mapping.is_empty() {
            return Err(ProtocolError::InvalidInput(
                "party B value mapping is empty".to_string(),
            ));
        }

        let key = BlindingKey::generate(&group, &mut OsRng)?;
        let (public_key, secret_key) = cipher.keygen(&mut OsRng)?;

        Ok(Self {
            group,
            cipher,
            config: config.clone(),
            values: mapping.into_iter().collect(),
            key,
            public_key,
            secret_key,
            run_id: None,
            phase: Phase::AwaitingRound1,
        })
    }

    /// Number of distinct identifiers held
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn public_key(&self) -> &C::PublicKey {
        &self.public_key
    }

    /// Setup message for A
    pub fn public_key_message(&self) -> PublicKeyMessage<C> {
        PublicKeyMessage {
            public_key: self.public_key.clone(),
        }
    }

    pub fn run_id(&self) -> Option<RunId> {
        self.run_id
    }

    /// Round 2: apply `k2` to A's elements, and blind + encrypt own pairs.
    ///
    /// Both output lists are shuffled; each `(element, ciphertext)` pair is
    /// shuffled as one unit.
    pub fn round2(
        &mut self,
        message: Round1Message<G>,
    ) -> Result<Round2Message<G, C>, ProtocolError> {
        if self.phase != Phase::AwaitingRound1 {
            return Err(ProtocolError::sequence(format!(
                "round 2 requested in phase {}",
                self.phase
            )));
        }

        let result = self.compute_round2(message);
        self.phase = if result.is_ok() {
            Phase::Round2Sent
        } else {
            Phase::Aborted
        };
        result
    }

    fn compute_round2(
        &mut self,
        message: Round1Message<G>,
    ) -> Result<Round2Message<G, C>, ProtocolError> {
        if message.blinded.is_empty() {
            return Err(ProtocolError::sequence("round 1 message is empty"));
        }
        let run_id = message.run_id;
        self.run_id = Some(run_id);

        let group = &self.group;
        let cipher = &self.cipher;
        let key = &self.key;
        let public_key = &self.public_key;
        let parallel = self.config.parallel;

        let mut double_blinded =
            transform(&message.blinded, parallel, |element| Ok(key.blind(group, element)))?;
        secure_shuffle(&mut double_blinded, &mut OsRng);

        let mut pairs = transform(&self.values, parallel, |(id, value)| {
            let blinded = key.hash_and_blind(group, id.as_bytes())?;
            let ciphertext = cipher.encrypt(public_key, *value, &mut OsRng)?;
            Ok((blinded, ciphertext))
        })?;

        // Dummies carry Enc(0) under a random element, so a match adds nothing
        for _ in 0..self.config.padding_for(pairs.len()) {
            let element = group.random_element(&mut OsRng)?;
            let ciphertext = cipher.encrypt(public_key, 0, &mut OsRng)?;
            pairs.push((element, ciphertext));
        }
        secure_shuffle(&mut pairs, &mut OsRng);

        debug!(
            run_id = %run_id,
            round = 2,
            double_blinded = double_blinded.len(),
            pairs = pairs.len(),
            "round 2 prepared"
        );

        Ok(Round2Message {
            run_id,
            double_blinded,
            pairs,
        })
    }

    /// Output: decrypt the intersection sum
    pub fn finalize(&mut self, message: Round3Message<C>) -> Result<u128, ProtocolError> {
        if self.phase != Phase::Round2Sent {
            return Err(ProtocolError::sequence(format!(
                "finalize requested in phase {}",
                self.phase
            )));
        }

        let result = self.decrypt_sum(message);
        self.phase = if result.is_ok() {
            Phase::Done
        } else {
            Phase::Aborted
        };
        result
    }

    fn decrypt_sum(&self, message: Round3Message<C>) -> Result<u128, ProtocolError> {
        if Some(message.run_id) != self.run_id {
            return Err(ProtocolError::sequence(format!(
                "round 3 message belongs to run {}",
                message.run_id
            )));
        }

        let sum = self.cipher.decrypt(&self.secret_key, &message.encrypted_sum)?;
        info!(run_id = %message.run_id, "intersection sum decrypted");
        Ok(sum)
    }
}

impl<G: Group, C: HomomorphicCipher> fmt::Debug for PartyB<G, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PartyB")
            .field("run_id", &self.run_id)
            .field("values", &self.values.len())
            .field("phase", &self.phase)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{Paillier, RistrettoGroup};

    fn test_config() -> ProtocolConfig {
        ProtocolConfig {
            modulus_bits: 512,
            parallel: false,
            ..Default::default()
        }
    }

    fn party(values: &[(&str, u64)]) -> PartyB<RistrettoGroup, Paillier> {
        let config = test_config();
        PartyB::new(
            values.iter().copied(),
            RistrettoGroup::default(),
            config.cipher().unwrap(),
            &config,
        )
        .unwrap()
    }

    fn round1(
        group: &RistrettoGroup,
        ids: &[&str],
    ) -> (BlindingKey<RistrettoGroup>, Round1Message<RistrettoGroup>) {
        let k1 = BlindingKey::generate(group, &mut OsRng).unwrap();
        let blinded = ids
            .iter()
            .map(|id| k1.hash_and_blind(group, id.as_bytes()).unwrap())
            .collect();
        (
            k1,
            Round1Message {
                run_id: RunId::random(),
                blinded,
            },
        )
    }

    #[test]
    fn test_empty_mapping_rejected() {
        let config = test_config();
        let result = PartyB::new(
            Vec::<(&str, u64)>::new(),
            RistrettoGroup::default(),
            config.cipher().unwrap(),
            &config,
        );
        assert!(matches!(result, Err(ProtocolError::InvalidInput(_))));
    }

    #[test]
    fn test_duplicate_identifier_last_value_wins() {
        let mut b = party(&[("apple", 1), ("apple", 100)]);
        assert_eq!(b.len(), 1);

        let group = RistrettoGroup::default();
        let (_, r1) = round1(&group, &["pear"]);
        let r2 = b.round2(r1).unwrap();

        let cipher = test_config().cipher().unwrap();
        let value = cipher.decrypt(&b.secret_key, &r2.pairs[0].1).unwrap();
        assert_eq!(value, 100);
    }

    #[test]
    fn test_round2_shapes_and_run_id() {
        let group = RistrettoGroup::default();
        let mut b = party(&[("apple", 100), ("cherry", 300), ("fig", 500)]);
        let (_, r1) = round1(&group, &["apple", "banana"]);
        let run_id = r1.run_id;

        let r2 = b.round2(r1).unwrap();

        assert_eq!(r2.run_id, run_id);
        assert_eq!(b.run_id(), Some(run_id));
        assert_eq!(r2.double_blinded.len(), 2);
        assert_eq!(r2.pairs.len(), 3);
    }

    #[test]
    fn test_round2_pairs_stay_associated() {
        let group = RistrettoGroup::default();
        let cipher = test_config().cipher().unwrap();
        let mut b = party(&[("apple", 100), ("cherry", 300), ("fig", 500), ("grape", 250)]);
        let (k1, r1) = round1(&group, &["apple", "cherry", "fig", "grape"]);

        let r2 = b.round2(r1).unwrap();

        // Every doubly-blinded element needs its own value next to it
        let entries = [("apple", 100), ("cherry", 300), ("fig", 500), ("grape", 250)];
        let expected: HashMap<_, u128> = entries
            .into_iter()
            .map(|(id, v)| {
                let h = group.hash_to_group(id.as_bytes()).unwrap();
                (group.encode(&b.key.blind(&group, &k1.blind(&group, &h))), v)
            })
            .collect();

        for (element, ciphertext) in &r2.pairs {
            let completed = group.encode(&k1.blind(&group, element));
            let value = cipher.decrypt(&b.secret_key, ciphertext).unwrap();
            assert_eq!(expected.get(&completed), Some(&value));
        }
    }

    #[test]
    fn test_round2_output_order_is_uniform() {
        const TRIALS: usize = 1500;
        let group = RistrettoGroup::default();
        let mut b = party(&[("apple", 1), ("banana", 2), ("cherry", 3)]);
        let (_, r1) = round1(&group, &["x", "y", "z"]);

        let first = group.encode(&b.key.blind(&group, &r1.blinded[0]));
        let apple = group.encode(&b.key.hash_and_blind(&group, b"apple").unwrap());

        let mut first_at = [0usize; 3];
        let mut apple_at = [0usize; 3];
        for _ in 0..TRIALS {
            let r2 = b.compute_round2(r1.clone()).unwrap();
            let i = r2
                .double_blinded
                .iter()
                .position(|e| group.encode(e) == first)
                .unwrap();
            let j = r2
                .pairs
                .iter()
                .position(|(e, _)| group.encode(e) == apple)
                .unwrap();
            first_at[i] += 1;
            apple_at[j] += 1;
        }

        let expected = TRIALS / 3;
        for count in first_at.iter().chain(apple_at.iter()) {
            assert!(
                count.abs_diff(expected) < expected * 15 / 100,
                "position counts {:?} / {:?} not uniform",
                first_at,
                apple_at
            );
        }
    }

    #[test]
    fn test_round2_padding() {
        let config = ProtocolConfig {
            pad_to: 8,
            ..test_config()
        };
        let group = RistrettoGroup::default();
        let cipher = config.cipher().unwrap();
        let mut b = PartyB::new([("apple", 100u64)], group.clone(), cipher, &config).unwrap();
        let (_, r1) = round1(&group, &["apple"]);

        let r2 = b.round2(r1).unwrap();
        assert_eq!(r2.pairs.len(), 8);

        let total: u128 = r2
            .pairs
            .iter()
            .map(|(_, ct)| cipher.decrypt(&b.secret_key, ct).unwrap())
            .sum();
        assert_eq!(total, 100);
    }

    #[test]
    fn test_empty_round1_rejected() {
        let mut b = party(&[("apple", 1)]);
        let msg = Round1Message {
            run_id: RunId::random(),
            blinded: vec![],
        };
        assert!(matches!(
            b.round2(msg),
            Err(ProtocolError::ProtocolSequence(_))
        ));
    }

    #[test]
    fn test_round2_twice_rejected() {
        let group = RistrettoGroup::default();
        let mut b = party(&[("apple", 1)]);
        let (_, first) = round1(&group, &["apple"]);
        let (_, second) = round1(&group, &["apple"]);

        b.round2(first).unwrap();
        assert!(matches!(
            b.round2(second),
            Err(ProtocolError::ProtocolSequence(_))
        ));
    }

    #[test]
    fn test_finalize_before_round2_rejected() {
        let cipher = test_config().cipher().unwrap();
        let mut b = party(&[("apple", 1)]);
        let ct = cipher.encrypt(b.public_key(), 5, &mut OsRng).unwrap();

        let result = b.finalize(Round3Message {
            run_id: RunId::random(),
            encrypted_sum: ct,
        });
        assert!(matches!(result, Err(ProtocolError::ProtocolSequence(_))));
    }

    #[test]
    fn test_finalize_foreign_run_rejected() {
        let group = RistrettoGroup::default();
        let cipher = test_config().cipher().unwrap();
        let mut b = party(&[("apple", 1)]);
        let (_, r1) = round1(&group, &["apple"]);
        b.round2(r1).unwrap();

        let ct = cipher.encrypt(b.public_key(), 5, &mut OsRng).unwrap();
        let result = b.finalize(Round3Message {
            run_id: RunId::random(),
            encrypted_sum: ct,
        });
        assert!(matches!(result, Err(ProtocolError::ProtocolSequence(_))));

        // Aborted runs stay aborted
        let ct = cipher.encrypt(b.public_key(), 5, &mut OsRng).unwrap();
        let retry = b.finalize(Round3Message {
            run_id: b.run_id().unwrap(),
            encrypted_sum: ct,
        });
        assert!(matches!(retry, Err(ProtocolError::ProtocolSequence(_))));
    }

    #[test]
    fn test_finalize_decrypts() {
        let group = RistrettoGroup::default();
        let cipher = test_config().cipher().unwrap();
        let mut b = party(&[("apple", 1)]);
        let (_, r1) = round1(&group, &["apple"]);
        let run_id = r1.run_id;
        b.round2(r1).unwrap();

        let ct = cipher.encrypt(b.public_key(), 42, &mut OsRng).unwrap();
        let sum = b
            .finalize(Round3Message {
                run_id,
                encrypted_sum: ct,
            })
            .unwrap();
        assert_eq!(sum, 42);
    }
}
