use alloy_primitives::{aliases::U96, Address, Bytes, U256};
use alloy_sol_types::{sol, SolCall};

use crate::{
    contracts::TxHash,
    error::{ErrorCode, Result},
    planner::{CheckoutPlan, DonationEntry, SwapSummary},
    transport::{EvmCall, EvmTransport},
};

sol! {
    #[allow(non_camel_case_types)]
    contract DonationManager {
        struct SwapSummary {
            uint256 amountIn;
            uint256 amountOutMin;
            bytes path;
        }

        struct Donation {
            uint96 grantId;
            address token;
            uint256 ratio;
            address[] rounds;
        }

        function donate(SwapSummary[] swaps, uint256 deadline, Donation[] donations) payable;
    }
}

impl From<&SwapSummary> for DonationManager::SwapSummary {
    fn from(value: &SwapSummary) -> Self {
        Self {
            amountIn: value.amount_in,
            amountOutMin: value.amount_out_min,
            path: value.path.clone(),
        }
    }
}

impl TryFrom<&DonationEntry> for DonationManager::Donation {
    type Error = ErrorCode;

    fn try_from(value: &DonationEntry) -> Result<Self> {
        let grant_id = value
            .grant_id
            .parse::<U96>()
            .map_err(|_| ErrorCode::InputInvalidGrantId)?;
        Ok(Self {
            grantId: grant_id,
            token: value.token,
            ratio: value.ratio,
            rounds: value.rounds.clone(),
        })
    }
}

/// Client bound to the donation manager that swaps and distributes in one call.
#[derive(Clone)]
pub struct DonationManagerClient<T> {
    manager: Address,
    transport: T,
}

impl<T> DonationManagerClient<T> {
    pub fn new(manager: Address, transport: T) -> Self {
        Self { manager, transport }
    }

    /// Encodes `donate(swaps, deadline, donations)` carrying `value` native units.
    /// Fails before anything is sent if a grant id does not fit the on-chain type.
    pub fn donate_call(
        &self,
        plan: &CheckoutPlan,
        value: U256,
        gas_limit: Option<u64>,
    ) -> Result<EvmCall> {
        let swaps = plan.swaps.iter().map(Into::into).collect();
        let donations = plan
            .donations
            .iter()
            .map(DonationManager::Donation::try_from)
            .collect::<Result<Vec<_>>>()?;
        let calldata = DonationManager::donateCall {
            swaps,
            deadline: U256::from(plan.deadline),
            donations,
        }
        .abi_encode();
        Ok(EvmCall::new(self.manager, Bytes::from(calldata), value).with_gas_limit(gas_limit))
    }
}

impl<T: EvmTransport> DonationManagerClient<T> {
    pub fn donate(&self, call: EvmCall) -> Result<TxHash> {
        self.transport.send(call).map(Into::into)
    }
}
