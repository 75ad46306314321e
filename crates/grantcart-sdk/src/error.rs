//! Error codes shared across the grantcart SDK.

use core::fmt;

use cart_store::CartError;

/// Result type alias that carries [`ErrorCode`] failures.
pub type Result<T> = std::result::Result<T, ErrorCode>;

/// Broad class of a failure, used by callers to decide whether a retry helps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The user supplied something unusable; fix the input and retry.
    Input,
    /// Plan construction hit an internal inconsistency; retrying is pointless.
    Planning,
    /// RPC, signing or on-chain execution failed; the cart is untouched.
    Chain,
    /// The cart could not be written.
    Persistence,
    /// Static configuration is unusable.
    Config,
}

/// Unified error taxonomy for the SDK.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum ErrorCode {
    /// Token has no catalog entry.
    InputUnsupportedToken = 1001,
    /// Token has no configured swap route to the settlement token.
    InputUnsupportedRoute = 1002,
    /// Grant id does not resolve in the grant catalog.
    InputUnknownGrant = 1003,
    /// Grant id is not present in the cart.
    InputGrantNotInCart = 1004,
    /// Amount is malformed, zero, or too precise for the token.
    InputInvalidAmount = 1005,
    /// Grant id is empty, duplicated, or not representable on-chain.
    InputInvalidGrantId = 1006,
    /// Nothing to check out.
    PlanningEmptyCart = 2001,
    /// A donation has no swap for its token; aggregation defect.
    PlanningUnmatchedSwap = 2002,
    /// More than one swap would be funded with the native asset.
    PlanningMultipleNativeSwaps = 2003,
    /// No funding round is currently active.
    PlanningNoActiveRound = 2004,
    /// Fixed-point arithmetic overflowed.
    PlanningAmountOverflow = 2005,
    /// The cart changed after the plan was built.
    PlanningCartChanged = 2006,
    /// RPC transport or signing failure.
    ChainTransport = 3001,
    /// A view call returned data that does not decode.
    ChainInvalidResponse = 3002,
    /// An approval transaction was mined but reverted.
    ChainApprovalReverted = 3003,
    /// The donation transaction was mined but reverted.
    ChainDonationReverted = 3004,
    /// No receipt was observed within the polling window.
    ChainReceiptTimeout = 3005,
    /// Writing the cart to persistence failed.
    PersistenceWrite = 4001,
    /// Configuration is malformed or inconsistent.
    ConfigInvalid = 5001,
}

impl ErrorCode {
    /// Numeric representation associated with the error.
    pub fn code(self) -> u16 {
        self as u16
    }

    pub fn category(self) -> ErrorCategory {
        match self.code() / 1000 {
            1 => ErrorCategory::Input,
            2 => ErrorCategory::Planning,
            3 => ErrorCategory::Chain,
            4 => ErrorCategory::Persistence,
            _ => ErrorCategory::Config,
        }
    }

    /// Whether repeating the same operation (after fixing input, where
    /// applicable) can succeed.
    pub fn is_retryable(self) -> bool {
        match self.category() {
            ErrorCategory::Input | ErrorCategory::Chain | ErrorCategory::Persistence => true,
            ErrorCategory::Planning => self == ErrorCode::PlanningCartChanged,
            ErrorCategory::Config => false,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?} ({})", self.code())
    }
}

impl std::error::Error for ErrorCode {}

impl From<&CartError> for ErrorCode {
    fn from(value: &CartError) -> Self {
        match value {
            CartError::UnsupportedToken(_) => ErrorCode::InputUnsupportedToken,
            CartError::UnknownGrant(_) => ErrorCode::InputUnknownGrant,
            CartError::GrantNotInCart(_) => ErrorCode::InputGrantNotInCart,
            CartError::DuplicateGrant(_) | CartError::EmptyGrantId => {
                ErrorCode::InputInvalidGrantId
            }
            CartError::InvalidAmount { .. } => ErrorCode::InputInvalidAmount,
            CartError::Persistence(_) => ErrorCode::PersistenceWrite,
        }
    }
}

impl From<CartError> for ErrorCode {
    fn from(value: CartError) -> Self {
        log::debug!("cart error: {value}");
        ErrorCode::from(&value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categories_follow_code_ranges() {
        assert_eq!(ErrorCode::InputUnsupportedToken.category(), ErrorCategory::Input);
        assert_eq!(ErrorCode::PlanningUnmatchedSwap.category(), ErrorCategory::Planning);
        assert_eq!(ErrorCode::ChainDonationReverted.category(), ErrorCategory::Chain);
        assert_eq!(ErrorCode::PersistenceWrite.category(), ErrorCategory::Persistence);
        assert_eq!(ErrorCode::ConfigInvalid.category(), ErrorCategory::Config);
    }

    #[test]
    fn internal_defects_are_not_retryable() {
        assert!(!ErrorCode::PlanningUnmatchedSwap.is_retryable());
        assert!(!ErrorCode::PlanningMultipleNativeSwaps.is_retryable());
        assert!(ErrorCode::PlanningCartChanged.is_retryable());
        assert!(ErrorCode::ChainApprovalReverted.is_retryable());
    }

    #[test]
    fn cart_errors_map_to_input_codes() {
        let err = CartError::UnsupportedToken(alloy_primitives::Address::ZERO);
        assert_eq!(ErrorCode::from(err), ErrorCode::InputUnsupportedToken);
        let err = CartError::Persistence(anyhow::anyhow!("disk full"));
        assert_eq!(ErrorCode::from(&err), ErrorCode::PersistenceWrite);
    }
}
