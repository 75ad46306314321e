//! Executes a [`CheckoutPlan`]: approvals first, one at a time and each
//! confirmed, then the single donation transaction. The cart is cleared only
//! after the donation receipt reports success.

use alloy_primitives::{Address, U256};
use cart_store::CartStateStore;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::{
    contracts::{DonationManagerClient, Erc20Client, TxHash},
    error::{ErrorCode, Result},
    planner::{CheckoutPlan, DonationPlanner},
    routes::NativeAssets,
    transport::{EvmTransport, EvmViewTransport},
};

/// Optional per-transaction gas limits; `None` lets the provider estimate.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GasLimits {
    #[serde(default)]
    pub approve: Option<u64>,
    #[serde(default)]
    pub donate: Option<u64>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutReceipt {
    /// Approval transactions, in the order they were confirmed.
    pub approvals: Vec<TxHash>,
    pub donation: TxHash,
    /// Native value attached to the donation.
    pub value: U256,
    /// False when the donation succeeded but the cart could not be written.
    pub cart_cleared: bool,
}

pub struct CheckoutClient<T> {
    manager: Address,
    native: NativeAssets,
    gas: GasLimits,
    transport: T,
}

impl<T> CheckoutClient<T> {
    pub fn new(manager: Address, native: NativeAssets, transport: T) -> Self {
        Self {
            manager,
            native,
            gas: GasLimits::default(),
            transport,
        }
    }

    pub fn with_gas_limits(mut self, gas: GasLimits) -> Self {
        self.gas = gas;
        self
    }
}

impl<T: EvmTransport + EvmViewTransport> CheckoutClient<T> {
    /// Plans from the current cart and executes it.
    pub fn checkout(
        &self,
        store: &CartStateStore,
        planner: &DonationPlanner,
        owner: Address,
    ) -> Result<CheckoutReceipt> {
        let snapshot = store.snapshot();
        let plan = planner.plan_snapshot(&snapshot)?;
        self.execute(store, &plan, owner)
    }

    /// Executes `plan` on behalf of `owner` and clears `store` on success.
    ///
    /// Everything that can be checked locally (native value, donation
    /// calldata) is checked before the first transaction is sent. A plan
    /// carrying a cart revision is rejected if the cart moved on before the
    /// donation is submitted. Any failure leaves the cart as it was.
    pub fn execute(
        &self,
        store: &CartStateStore,
        plan: &CheckoutPlan,
        owner: Address,
    ) -> Result<CheckoutReceipt> {
        let value = plan.native_value(&self.native)?;
        let manager = DonationManagerClient::new(self.manager, &self.transport);
        let donate_call = manager.donate_call(plan, value, self.gas.donate)?;

        let approvals = self.ensure_allowances(plan, owner)?;

        if let Some(expected) = plan.cart_revision {
            let current = store.snapshot().revision();
            if current != expected {
                warn!("checkout: cart moved from revision {expected} to {current}, aborting");
                return Err(ErrorCode::PlanningCartChanged);
            }
        }

        let donation = manager.donate(donate_call)?;
        info!("checkout: donation {donation} submitted with value {value}");
        let receipt = self.transport.wait_for_receipt(donation.0)?;
        if !receipt.success {
            warn!("checkout: donation {donation} reverted; cart kept");
            return Err(ErrorCode::ChainDonationReverted);
        }

        let cart_cleared = match store.clear() {
            Ok(_) => true,
            Err(err) => {
                warn!("checkout: donation {donation} confirmed but cart clear failed: {err}");
                false
            }
        };
        info!(
            "checkout: {} donation(s) confirmed in block {:?}",
            plan.donations.len(),
            receipt.block_number
        );
        Ok(CheckoutReceipt {
            approvals,
            donation,
            value,
            cart_cleared,
        })
    }

    /// Approves the manager for every ERC-20 swap input whose allowance is
    /// short. Each approval is confirmed before the next token is inspected.
    fn ensure_allowances(&self, plan: &CheckoutPlan, owner: Address) -> Result<Vec<TxHash>> {
        let mut approvals = Vec::new();
        for swap in &plan.swaps {
            if self.native.is_native_or_wrapped(swap.token_in) {
                continue;
            }
            let token = Erc20Client::new(swap.token_in, &self.transport);
            let allowance = token.allowance(owner, self.manager)?;
            if allowance >= swap.amount_in {
                debug!("checkout: allowance for {} already sufficient", swap.token_in);
                continue;
            }
            let hash = token.approve(self.manager, U256::MAX, self.gas.approve)?;
            info!("checkout: approval {hash} submitted for {}", swap.token_in);
            let receipt = self.transport.wait_for_receipt(hash.0)?;
            if !receipt.success {
                warn!("checkout: approval {hash} for {} reverted", swap.token_in);
                return Err(ErrorCode::ChainApprovalReverted);
            }
            approvals.push(hash);
        }
        Ok(approvals)
    }
}
