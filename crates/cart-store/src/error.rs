use alloy_primitives::Address;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CartError {
    #[error("token {0} is not supported")]
    UnsupportedToken(Address),
    #[error("grant {0:?} is not known to the grant catalog")]
    UnknownGrant(String),
    #[error("grant {0:?} is not in the cart")]
    GrantNotInCart(String),
    #[error("grant {0:?} appears more than once")]
    DuplicateGrant(String),
    #[error("grant id must not be empty")]
    EmptyGrantId,
    #[error("invalid contribution amount {amount:?}: {reason}")]
    InvalidAmount { amount: String, reason: String },
    #[error("persist cart: {0}")]
    Persistence(#[source] anyhow::Error),
}

impl CartError {
    /// True for errors caused by caller input, which a user can correct and retry.
    pub fn is_input(&self) -> bool {
        !matches!(self, CartError::Persistence(_))
    }

    pub(crate) fn invalid_amount(amount: &str, reason: impl Into<String>) -> Self {
        CartError::InvalidAmount {
            amount: amount.to_string(),
            reason: reason.into(),
        }
    }
}
