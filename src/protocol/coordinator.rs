//! In-process driver that delivers messages between the two parties in order

use std::fmt;
use tracing::{debug, info, warn};

use super::messages::{Round1Message, Round2Message, Round3Message};
use super::{PartyA, PartyB, ProtocolError};
use crate::crypto::{Group, HomomorphicCipher};

/// Observable position of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolState {
    Setup,
    Round1Sent,
    Round2Sent,
    Round3Sent,
    Done,
    Aborted,
}

impl fmt::Display for ProtocolState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProtocolState::Setup => "setup",
            ProtocolState::Round1Sent => "round 1 sent",
            ProtocolState::Round2Sent => "round 2 sent",
            ProtocolState::Round3Sent => "round 3 sent",
            ProtocolState::Done => "done",
            ProtocolState::Aborted => "aborted",
        };
        f.write_str(name)
    }
}

enum InFlight<G: Group, C: HomomorphicCipher> {
    Round1(Round1Message<G>),
    Round2(Round2Message<G, C>),
    Round3(Round3Message<C>),
}

/// Sequential runner for one protocol instance.
///
/// Each [`step`](Coordinator::step) produces exactly one round's message and
/// hands it to its recipient on the next step. Any failure moves the run to
/// `Aborted`; a finished or aborted coordinator cannot be stepped again.
pub struct Coordinator<G: Group, C: HomomorphicCipher> {
    party_a: PartyA<G, C>,
    party_b: PartyB<G, C>,
    state: ProtocolState,
    in_flight: Option<InFlight<G, C>>,
    output: Option<u128>,
}

impl<G: Group, C: HomomorphicCipher> Coordinator<G, C> {
    pub fn new(party_a: PartyA<G, C>, party_b: PartyB<G, C>) -> Self {
        Self {
            party_a,
            party_b,
            state: ProtocolState::Setup,
            in_flight: None,
            output: None,
        }
    }

    pub fn state(&self) -> ProtocolState {
        self.state
    }

    /// B's result, once the run is `Done`
    pub fn output(&self) -> Option<u128> {
        self.output
    }

    /// Advance one round
    pub fn step(&mut self) -> Result<ProtocolState, ProtocolError> {
        if matches!(self.state, ProtocolState::Done | ProtocolState::Aborted) {
            return Err(ProtocolError::sequence(format!(
                "coordinator stepped after run {}",
                self.state
            )));
        }

        match self.advance() {
            Ok(next) => {
                debug!(run_id = %self.party_a.run_id(), from = %self.state, to = %next, "step");
                self.state = next;
                Ok(next)
            }
            Err(e) => {
                warn!(run_id = %self.party_a.run_id(), state = %self.state, error = %e, "run aborted");
                self.state = ProtocolState::Aborted;
                self.in_flight = None;
                Err(e)
            }
        }
    }

    fn advance(&mut self) -> Result<ProtocolState, ProtocolError> {
        match (self.state, self.in_flight.take()) {
            (ProtocolState::Setup, None) => {
                self.party_a
                    .receive_public_key(self.party_b.public_key_message())?;
                let round1 = self.party_a.round1()?;
                self.in_flight = Some(InFlight::Round1(round1));
                Ok(ProtocolState::Round1Sent)
            }
            (ProtocolState::Round1Sent, Some(InFlight::Round1(message))) => {
                let round2 = self.party_b.round2(message)?;
                self.in_flight = Some(InFlight::Round2(round2));
                Ok(ProtocolState::Round2Sent)
            }
            (ProtocolState::Round2Sent, Some(InFlight::Round2(message))) => {
                let round3 = self.party_a.round3(message)?;
                self.in_flight = Some(InFlight::Round3(round3));
                Ok(ProtocolState::Round3Sent)
            }
            (ProtocolState::Round3Sent, Some(InFlight::Round3(message))) => {
                let sum = self.party_b.finalize(message)?;
                self.output = Some(sum);
                Ok(ProtocolState::Done)
            }
            (state, _) => Err(ProtocolError::sequence(format!(
                "no message in flight for state {}",
                state
            ))),
        }
    }

    /// Step until done and return B's output.
    pub fn run(mut self) -> Result<u128, ProtocolError> {
        let run_id = self.party_a.run_id();
        info!(run_id = %run_id, "protocol run started");

        while self.state != ProtocolState::Done {
            self.step()?;
        }

        info!(run_id = %run_id, "protocol run finished");
        self.output
            .ok_or_else(|| ProtocolError::sequence("run finished without output"))
    }
}

impl<G: Group, C: HomomorphicCipher> fmt::Debug for Coordinator<G, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Coordinator")
            .field("party_a", &self.party_a)
            .field("party_b", &self.party_b)
            .field("state", &self.state)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{Paillier, RistrettoGroup};
    use crate::protocol::ProtocolConfig;

    fn test_config() -> ProtocolConfig {
        ProtocolConfig {
            modulus_bits: 512,
            parallel: false,
            ..Default::default()
        }
    }

    fn coordinator(ids: &[&str], values: &[(&str, u64)]) -> Coordinator<RistrettoGroup, Paillier> {
        let config = test_config();
        let group = RistrettoGroup::default();
        let cipher = config.cipher().unwrap();
        let a = PartyA::new(ids.iter().copied(), group.clone(), cipher, &config).unwrap();
        let b = PartyB::new(values.iter().copied(), group, cipher, &config).unwrap();
        Coordinator::new(a, b)
    }

    #[test]
    fn test_partial_overlap_sums_matches() {
        let c = coordinator(
            &["apple", "banana", "cherry"],
            &[("apple", 100), ("cherry", 300), ("date", 50)],
        );
        assert_eq!(c.run().unwrap(), 400);
    }

    #[test]
    fn test_disjoint_sets_sum_to_zero() {
        let c = coordinator(&["x"], &[("y", 5)]);
        assert_eq!(c.run().unwrap(), 0);
    }

    #[test]
    fn test_full_overlap_sums_everything() {
        let c = coordinator(&["a", "b", "c"], &[("a", 1), ("b", 2), ("c", 3)]);
        assert_eq!(c.run().unwrap(), 6);
    }

    #[test]
    fn test_zero_values_count_as_zero() {
        let c = coordinator(&["a", "b"], &[("a", 0), ("b", 0), ("z", 9)]);
        assert_eq!(c.run().unwrap(), 0);
    }

    #[test]
    fn test_sum_exceeding_u64() {
        let c = coordinator(&["a", "b"], &[("a", u64::MAX), ("b", u64::MAX)]);
        assert_eq!(c.run().unwrap(), 2 * u64::MAX as u128);
    }

    #[test]
    fn test_state_transitions() {
        let mut c = coordinator(&["apple"], &[("apple", 7)]);
        assert_eq!(c.state(), ProtocolState::Setup);
        assert_eq!(c.output(), None);

        assert_eq!(c.step().unwrap(), ProtocolState::Round1Sent);
        assert_eq!(c.step().unwrap(), ProtocolState::Round2Sent);
        assert_eq!(c.step().unwrap(), ProtocolState::Round3Sent);
        assert_eq!(c.output(), None);
        assert_eq!(c.step().unwrap(), ProtocolState::Done);
        assert_eq!(c.output(), Some(7));
    }

    #[test]
    fn test_step_after_done_rejected() {
        let mut c = coordinator(&["apple"], &[("apple", 7)]);
        while c.state() != ProtocolState::Done {
            c.step().unwrap();
        }
        assert!(matches!(c.step(), Err(ProtocolError::ProtocolSequence(_))));
        assert_eq!(c.state(), ProtocolState::Done);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let config = ProtocolConfig {
            parallel: true,
            ..test_config()
        };
        let ids: Vec<String> = (0..64).map(|i| format!("id-{}", i)).collect();
        let values: Vec<(String, u64)> = (32..96).map(|i| (format!("id-{}", i), i as u64)).collect();
        let expected: u128 = (32..64).sum();

        let group = RistrettoGroup::default();
        let cipher = config.cipher().unwrap();
        let a = PartyA::new(ids, group.clone(), cipher, &config).unwrap();
        let b = PartyB::new(values, group, cipher, &config).unwrap();

        assert_eq!(Coordinator::new(a, b).run().unwrap(), expected);
    }

    #[test]
    fn test_mismatched_domains_never_match() {
        // Parties hashing under different domains never match
        let config = test_config();
        let cipher = config.cipher().unwrap();
        let group_a = RistrettoGroup::default();
        let a = PartyA::new(["apple"], group_a, cipher, &config).unwrap();

        let other = ProtocolConfig {
            hash_domain: "other-domain".to_string(),
            ..test_config()
        };
        let group_b = RistrettoGroup::new(other.group_parameters().unwrap());
        let b = PartyB::new([("apple", 10u64)], group_b, cipher, &config).unwrap();

        assert_eq!(Coordinator::new(a, b).run().unwrap(), 0);
    }
}
