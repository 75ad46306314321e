use core::fmt;

use alloy_primitives::B256;
use serde::Serialize;

/// Hash of a transaction submitted through a transport.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct TxHash(pub B256);

impl TxHash {
    pub fn bytes(self) -> [u8; 32] {
        self.0.into()
    }
}

impl From<B256> for TxHash {
    fn from(value: B256) -> Self {
        Self(value)
    }
}

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
