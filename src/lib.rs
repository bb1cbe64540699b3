//! psi-sum - Private Intersection-Sum between two parties
//!
//! Party A holds a set of identifiers, party B holds identifier → value
//! pairs. Three rounds of commutative blinding over Ristretto255 and
//! additively homomorphic Paillier encryption let B learn the sum of its
//! values whose identifiers A also holds, and nothing else.
//!
//! ```no_run
//! use psi_sum::protocol::{intersection_sum, ProtocolConfig};
//!
//! let sum = intersection_sum(
//!     ["apple", "banana", "cherry"],
//!     [("apple", 100), ("cherry", 300), ("date", 50)],
//!     &ProtocolConfig::default(),
//! )?;
//! assert_eq!(sum, 400);
//! # Ok::<(), psi_sum::protocol::ProtocolError>(())
//! ```
//!
//! Key principles:
//! - Semi-honest parties only
//! - Fresh blinding and encryption keys for every run, zeroized on drop
//! - Cleartext identifiers and values never leave their owner
//! - Transport is not part of the crate; messages are plain values

pub mod crypto;
pub mod protocol;
