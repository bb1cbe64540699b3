use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Opaque identifier, compared by raw bytes.
///
/// Cleartext identifiers never leave the party that owns them; the bytes are
/// zeroized on drop and `Debug` does not print them.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Zeroize, ZeroizeOnDrop)]
pub struct Identifier(Vec<u8>);

impl Identifier {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Identifier(<{} bytes>)", self.0.len())
    }
}

impl From<&str> for Identifier {
    fn from(value: &str) -> Self {
        Self(value.as_bytes().to_vec())
    }
}

impl From<String> for Identifier {
    fn from(value: String) -> Self {
        Self(value.into_bytes())
    }
}

impl From<&[u8]> for Identifier {
    fn from(value: &[u8]) -> Self {
        Self(value.to_vec())
    }
}

impl From<Vec<u8>> for Identifier {
    fn from(value: Vec<u8>) -> Self {
        Self(value)
    }
}
