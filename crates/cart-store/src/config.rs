use alloy_primitives::Address;
use serde::{Deserialize, Serialize};

use crate::model::Amount;

/// Values used when a grant is added without an explicit token or amount.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartDefaults {
    /// Token preselected for new entries; normally the settlement token.
    pub token: Address,
    pub amount: Amount,
}

impl CartDefaults {
    pub fn new(token: Address, amount: Amount) -> Self {
        Self { token, amount }
    }
}
