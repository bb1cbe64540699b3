//! Party A: holds the identifier set, drives rounds 1 and 3

use rand::rngs::OsRng;
use std::collections::HashSet;
use std::fmt;
use tracing::debug;

use super::messages::{PublicKeyMessage, Round1Message, Round2Message, Round3Message, RunId};
use super::{transform, Identifier, ProtocolConfig, ProtocolError};
use crate::crypto::{secure_shuffle, BlindingKey, Group, HomomorphicCipher};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Setup,
    Round1Sent,
    Done,
    Aborted,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Setup => "setup",
            Phase::Round1Sent => "round 1 sent",
            Phase::Done => "done",
            Phase::Aborted => "aborted",
        };
        f.write_str(name)
    }
}

/// Identifier-holding party.
///
/// The blinding key `k1` is sampled at construction and dropped (zeroized)
/// with the party; a new run needs a new `PartyA`.
pub struct PartyA<G: Group, C: HomomorphicCipher> {
    group: G,
    cipher: C,
    config: ProtocolConfig,
    run_id: RunId,
    identifiers: Vec<Identifier>,
    key: BlindingKey<G>,
    public_key: Option<C::PublicKey>,
    /// Length of the round-1 list, padding included
    sent: usize,
    phase: Phase,
}

impl<G: Group, C: HomomorphicCipher> PartyA<G, C> {
    /// Store the identifier set and sample `k1`.
    ///
    /// Duplicate identifiers collapse to one. Fails with `InvalidInput` when
    /// the set is empty.
    pub fn new<I, K>(
        identifiers: I,
        group: G,
        cipher: C,
        config: &ProtocolConfig,
    ) -> Result<Self, ProtocolError>
    where
        I: IntoIterator<Item = K>,
        K: Into<Identifier>,
    {
        let unique: HashSet<Identifier> = identifiers.into_iter().map(Into::into).collect();
        if unique.is_empty() {
            return Err(ProtocolError::InvalidInput(
                "party A identifier set is empty".to_string(),
            ));
        }

        let key = BlindingKey::generate(&group, &mut OsRng)?;

        Ok(Self {
            group,
            cipher,
            config: config.clone(),
            run_id: RunId::random(),
            identifiers: unique.into_iter().collect(),
            key,
            public_key: None,
            sent: 0,
            phase: Phase::Setup,
        })
    }

    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    /// Number of distinct identifiers held
    pub fn len(&self) -> usize {
        self.identifiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.identifiers.is_empty()
    }

    /// Store B's public key. May arrive before or after round 1, but must
    /// arrive before round 3, and only once.
    pub fn receive_public_key(
        &mut self,
        message: PublicKeyMessage<C>,
    ) -> Result<(), ProtocolError> {
        if matches!(self.phase, Phase::Done | Phase::Aborted) {
            return Err(ProtocolError::sequence(format!(
                "public key received after run {}",
                self.phase
            )));
        }
        if self.public_key.is_some() {
            self.phase = Phase::Aborted;
            return Err(ProtocolError::sequence("public key received twice"));
        }

        self.public_key = Some(message.public_key);
        Ok(())
    }

    /// Round 1: `H(v) * k1` for every identifier, shuffled
    pub fn round1(&mut self) -> Result<Round1Message<G>, ProtocolError> {
        if self.phase != Phase::Setup {
            return Err(ProtocolError::sequence(format!(
                "round 1 requested in phase {}",
                self.phase
            )));
        }

        let result = self.compute_round1();
        self.phase = if result.is_ok() {
            Phase::Round1Sent
        } else {
            Phase::Aborted
        };
        result
    }

    fn compute_round1(&mut self) -> Result<Round1Message<G>, ProtocolError> {
        let group = &self.group;
        let key = &self.key;

        let mut blinded = transform(&self.identifiers, self.config.parallel, |id| {
            Ok(key.hash_and_blind(group, id.as_bytes())?)
        })?;

        let padding = self.config.padding_for(blinded.len());
        for _ in 0..padding {
            blinded.push(group.random_element(&mut OsRng)?);
        }
        secure_shuffle(&mut blinded, &mut OsRng);

        self.sent = blinded.len();
        debug!(run_id = %self.run_id, round = 1, elements = blinded.len(), "round 1 prepared");

        Ok(Round1Message {
            run_id: self.run_id,
            blinded,
        })
    }

    /// Round 3: match B's pairs against the doubly-blinded set, sum the
    /// matching ciphertexts homomorphically and re-randomize.
    ///
    /// An empty intersection yields a fresh encryption of 0.
    pub fn round3(
        &mut self,
        message: Round2Message<G, C>,
    ) -> Result<Round3Message<C>, ProtocolError> {
        if self.phase != Phase::Round1Sent {
            return Err(ProtocolError::sequence(format!(
                "round 3 requested in phase {}",
                self.phase
            )));
        }

        let result = self.compute_round3(message);
        self.phase = if result.is_ok() {
            Phase::Done
        } else {
            Phase::Aborted
        };
        result
    }

    fn compute_round3(
        &mut self,
        message: Round2Message<G, C>,
    ) -> Result<Round3Message<C>, ProtocolError> {
        let public_key = self
            .public_key
            .as_ref()
            .ok_or_else(|| ProtocolError::sequence("round 3 requires B's public key"))?;

        if message.run_id != self.run_id {
            return Err(ProtocolError::sequence(format!(
                "round 2 message belongs to run {}, expected {}",
                message.run_id, self.run_id
            )));
        }
        if message.double_blinded.len() != self.sent {
            return Err(ProtocolError::sequence(format!(
                "round 2 carries {} doubly-blinded elements, round 1 sent {}",
                message.double_blinded.len(),
                self.sent
            )));
        }

        let group = &self.group;
        let key = &self.key;

        let doubly_blinded: HashSet<G::Encoding> = message
            .double_blinded
            .iter()
            .map(|element| group.encode(element))
            .collect();

        let matched = transform(&message.pairs, self.config.parallel, |(element, _)| {
            let completed = key.blind(group, element);
            Ok(doubly_blinded.contains(&group.encode(&completed)))
        })?;

        let mut total = self.cipher.encrypt(public_key, 0, &mut OsRng)?;
        for ((_, ciphertext), is_match) in message.pairs.iter().zip(matched) {
            if is_match {
                total = self.cipher.add(public_key, &total, ciphertext)?;
            }
        }
        let encrypted_sum = self.cipher.rerandomize(public_key, &total, &mut OsRng)?;

        debug!(
            run_id = %self.run_id,
            round = 3,
            pairs = message.pairs.len(),
            "round 3 prepared"
        );

        Ok(Round3Message {
            run_id: self.run_id,
            encrypted_sum,
        })
    }
}

impl<G: Group, C: HomomorphicCipher> fmt::Debug for PartyA<G, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PartyA")
            .field("run_id", &self.run_id)
            .field("identifiers", &self.identifiers.len())
            .field("phase", &self.phase)
            .finish()
    }
}
