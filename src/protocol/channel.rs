//! Asynchronous runner: each party on its own task, messages over channels
//!
//! The parties exchange the same logical messages as the in-process
//! [`Coordinator`](super::Coordinator), but over bounded `tokio::sync::mpsc`
//! channels. The CPU-heavy work of each round runs on the blocking pool so
//! the async workers stay free. A channel closing before the expected message
//! arrives is reported as `MessageLost`.

use tokio::sync::mpsc;
use tracing::{debug, info};

use super::messages::{PublicKeyMessage, Round1Message, Round2Message, Round3Message};
use super::{PartyA, PartyB, ProtocolError};
use crate::crypto::{Group, HomomorphicCipher};

/// Messages addressed to party A
enum ToA<G: Group, C: HomomorphicCipher> {
    PublicKey(PublicKeyMessage<C>),
    Round2(Round2Message<G, C>),
}

/// Messages addressed to party B
enum ToB<G: Group, C: HomomorphicCipher> {
    Round1(Round1Message<G>),
    Round3(Round3Message<C>),
}

/// Run one protocol instance with each party on a separate task and return
/// B's output.
///
/// When both sides fail, the root cause is reported rather than the
/// `MessageLost` seen by the peer whose channel went away.
pub async fn run_over_channels<G, C>(
    party_a: PartyA<G, C>,
    party_b: PartyB<G, C>,
) -> Result<u128, ProtocolError>
where
    G: Group,
    C: HomomorphicCipher,
{
    let run_id = party_a.run_id();
    info!(run_id = %run_id, "protocol run started over channels");

    let (to_a_tx, to_a_rx) = mpsc::channel(1);
    let (to_b_tx, to_b_rx) = mpsc::channel(1);

    let task_a = tokio::spawn(drive_a(party_a, to_b_tx, to_a_rx));
    let task_b = tokio::spawn(drive_b(party_b, to_a_tx, to_b_rx));

    let a_result = task_a.await.unwrap_or_else(|e| Err(task_failed("A", e)));
    let b_result = task_b.await.unwrap_or_else(|e| Err(task_failed("B", e)));

    let result = settle(a_result, b_result);
    if result.is_ok() {
        info!(run_id = %run_id, "protocol run finished");
    }
    result
}

fn settle(
    a_result: Result<(), ProtocolError>,
    b_result: Result<u128, ProtocolError>,
) -> Result<u128, ProtocolError> {
    match (a_result, b_result) {
        (Ok(()), result) => result,
        (Err(ProtocolError::MessageLost(_)), Err(e)) => Err(e),
        (Err(e), _) => Err(e),
    }
}

fn task_failed(party: &str, error: tokio::task::JoinError) -> ProtocolError {
    ProtocolError::MessageLost(format!("party {} task ended abnormally: {}", party, error))
}

fn lost(what: &str) -> ProtocolError {
    ProtocolError::MessageLost(format!("channel closed before {}", what))
}

/// Move `party` onto the blocking pool, run `f`, and hand the party back.
async fn offload<P, R, F>(party: P, f: F) -> Result<(P, R), ProtocolError>
where
    P: Send + 'static,
    R: Send + 'static,
    F: FnOnce(&mut P) -> Result<R, ProtocolError> + Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let mut party = party;
        let output = f(&mut party)?;
        Ok((party, output))
    })
    .await
    .map_err(|e| ProtocolError::MessageLost(format!("round worker ended abnormally: {}", e)))?
}

async fn drive_a<G, C>(
    party: PartyA<G, C>,
    tx: mpsc::Sender<ToB<G, C>>,
    mut rx: mpsc::Receiver<ToA<G, C>>,
) -> Result<(), ProtocolError>
where
    G: Group,
    C: HomomorphicCipher,
{
    // Round 1 does not need B's key, so it goes out immediately
    let (mut party, round1) = offload(party, |a| a.round1()).await?;
    tx.send(ToB::Round1(round1))
        .await
        .map_err(|_| lost("round 1 delivery"))?;
    debug!(run_id = %party.run_id(), round = 1, "sent");

    loop {
        match rx.recv().await {
            Some(ToA::PublicKey(message)) => party.receive_public_key(message)?,
            Some(ToA::Round2(message)) => {
                let run_id = party.run_id();
                let (_, round3) = offload(party, move |a| a.round3(message)).await?;
                tx.send(ToB::Round3(round3))
                    .await
                    .map_err(|_| lost("round 3 delivery"))?;
                debug!(run_id = %run_id, round = 3, "sent");
                return Ok(());
            }
            None => return Err(lost("round 2")),
        }
    }
}

async fn drive_b<G, C>(
    party: PartyB<G, C>,
    tx: mpsc::Sender<ToA<G, C>>,
    mut rx: mpsc::Receiver<ToB<G, C>>,
) -> Result<u128, ProtocolError>
where
    G: Group,
    C: HomomorphicCipher,
{
    tx.send(ToA::PublicKey(party.public_key_message()))
        .await
        .map_err(|_| lost("public key delivery"))?;

    let round1 = match rx.recv().await {
        Some(ToB::Round1(message)) => message,
        Some(ToB::Round3(_)) => {
            return Err(ProtocolError::sequence("round 3 arrived before round 1"))
        }
        None => return Err(lost("round 1")),
    };

    let (party, round2) = offload(party, move |b| b.round2(round1)).await?;
    tx.send(ToA::Round2(round2))
        .await
        .map_err(|_| lost("round 2 delivery"))?;
    debug!(round = 2, "sent");

    let round3 = match rx.recv().await {
        Some(ToB::Round3(message)) => message,
        Some(ToB::Round1(_)) => return Err(ProtocolError::sequence("round 1 arrived twice")),
        None => return Err(lost("round 3")),
    };

    let (_, sum) = offload(party, move |b| b.finalize(round3)).await?;
    Ok(sum)
}
