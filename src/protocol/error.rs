use thiserror::Error;

use crate::crypto::CryptoError;

/// Intersection-sum protocol errors
///
/// Every variant aborts the current run. An empty intersection is not an
/// error: it decrypts to 0.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Empty identifier set, empty value mapping, or rejected configuration
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Round invoked out of order, twice, or with a message from another run
    #[error("Protocol sequence violation: {0}")]
    ProtocolSequence(String),

    /// Group or cipher backend failure
    #[error("Group operation failed: {0}")]
    GroupOperation(#[from] CryptoError),

    /// A hand-off channel closed before the round's message arrived
    #[error("Message lost: {0}")]
    MessageLost(String),
}

impl ProtocolError {
    pub(crate) fn sequence(msg: impl Into<String>) -> Self {
        Self::ProtocolSequence(msg.into())
    }
}
