//! Turns a hydrated cart into a [`CheckoutPlan`]: one swap per distinct source
//! token, one proportional donation per cart entry, and a deadline.
//!
//! All arithmetic is on base units in `U256`.

use std::{
    collections::BTreeMap,
    sync::Arc,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use alloy_primitives::{Address, Bytes, U256};
use cart_store::{CartSnapshot, HydratedCartItem};
use log::{debug, warn};
use serde::Serialize;

use crate::{
    error::{ErrorCode, Result},
    rounds::{first_active_round, RoundRegistry},
    routes::{NativeAssets, RouteTable},
};

/// Fixed-point scale of donation ratios (1.0 = 10^18).
pub const WAD: U256 = U256::from_limbs([1_000_000_000_000_000_000, 0, 0, 0]);

/// How long a signed donation stays executable on-chain.
pub const DEADLINE_WINDOW: Duration = Duration::from_secs(20 * 60);

pub trait Clock: Send + Sync {
    /// Seconds since the unix epoch.
    fn now_unix(&self) -> u64;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_unix(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_secs())
            .unwrap_or_default()
    }
}

/// Clock pinned to one instant.
#[derive(Clone, Copy, Debug)]
pub struct FixedClock(pub u64);

impl Clock for FixedClock {
    fn now_unix(&self) -> u64 {
        self.0
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapSummary {
    /// First token of `path`; not part of the on-chain struct.
    pub token_in: Address,
    pub amount_in: U256,
    /// Always zero: no slippage floor is computed.
    pub amount_out_min: U256,
    pub path: Bytes,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DonationEntry {
    pub grant_id: String,
    /// Source token of the swap that funds this donation.
    pub token: Address,
    /// Share of the swap output, scaled by [`WAD`].
    pub ratio: U256,
    pub rounds: Vec<Address>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutPlan {
    pub swaps: Vec<SwapSummary>,
    pub donations: Vec<DonationEntry>,
    pub deadline: u64,
    /// Cart revision the plan was derived from, when built from a snapshot.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cart_revision: Option<u64>,
}

impl CheckoutPlan {
    pub fn swap_for(&self, token: Address) -> Option<&SwapSummary> {
        self.swaps.iter().find(|swap| swap.token_in == token)
    }

    /// Value attached to the donation transaction: the input of the single
    /// wrapped-native swap, if any.
    pub fn native_value(&self, native: &NativeAssets) -> Result<U256> {
        let mut funded = self
            .swaps
            .iter()
            .filter(|swap| swap.token_in == native.wrapped);
        let value = funded.next().map_or(U256::ZERO, |swap| swap.amount_in);
        if funded.next().is_some() {
            warn!("plan funds more than one swap with {}", native.wrapped);
            return Err(ErrorCode::PlanningMultipleNativeSwaps);
        }
        Ok(value)
    }
}

pub struct DonationPlanner {
    routes: RouteTable,
    native: NativeAssets,
    rounds: Arc<dyn RoundRegistry>,
    clock: Arc<dyn Clock>,
}

impl DonationPlanner {
    pub fn new(routes: RouteTable, native: NativeAssets, rounds: Arc<dyn RoundRegistry>) -> Self {
        Self {
            routes,
            native,
            rounds,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Total base units per swap source token.
    pub fn aggregate(&self, items: &[HydratedCartItem]) -> Result<BTreeMap<Address, U256>> {
        let mut totals = BTreeMap::new();
        for item in items {
            let token = self.native.swap_token(item.contribution_token_address);
            let total: &mut U256 = totals.entry(token).or_default();
            *total = total
                .checked_add(item.amount_base_units)
                .ok_or(ErrorCode::PlanningAmountOverflow)?;
        }
        Ok(totals)
    }

    pub fn plan_snapshot(&self, snapshot: &CartSnapshot) -> Result<CheckoutPlan> {
        let mut plan = self.build_plan(snapshot.hydrated())?;
        plan.cart_revision = Some(snapshot.revision());
        Ok(plan)
    }

    /// Builds the plan for `items`. Within each swap the donation ratios sum
    /// to exactly [`WAD`]: the last donation of a token takes the rounding dust.
    pub fn build_plan(&self, items: &[HydratedCartItem]) -> Result<CheckoutPlan> {
        if items.is_empty() {
            return Err(ErrorCode::PlanningEmptyCart);
        }
        let round = first_active_round(self.rounds.as_ref())?;

        let swaps = self
            .aggregate(items)?
            .into_iter()
            .map(|(token_in, amount_in)| -> Result<SwapSummary> {
                Ok(SwapSummary {
                    token_in,
                    amount_in,
                    amount_out_min: U256::ZERO,
                    path: self.routes.resolve(token_in)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let mut donations = Vec::with_capacity(items.len());
        // token -> (ratio assigned so far, index of its last donation)
        let mut shares: BTreeMap<Address, (U256, usize)> = BTreeMap::new();
        for item in items {
            let token = self.native.swap_token(item.contribution_token_address);
            let swap = swaps
                .iter()
                .find(|swap| swap.token_in == token)
                .ok_or(ErrorCode::PlanningUnmatchedSwap)?;
            let ratio = item
                .amount_base_units
                .checked_mul(WAD)
                .and_then(|scaled| scaled.checked_div(swap.amount_in))
                .ok_or(ErrorCode::PlanningAmountOverflow)?;

            let share = shares.entry(token).or_insert((U256::ZERO, donations.len()));
            share.0 += ratio;
            share.1 = donations.len();
            donations.push(DonationEntry {
                grant_id: item.grant_id.clone(),
                token,
                ratio,
                rounds: vec![round],
            });
        }

        for (token, (assigned, last)) in shares {
            let dust = WAD.saturating_sub(assigned);
            if !dust.is_zero() {
                debug!("planner: {dust} ratio dust for {token} goes to donation {last}");
                donations[last].ratio += dust;
            }
        }

        let deadline = self.clock.now_unix() + DEADLINE_WINDOW.as_secs();
        debug!(
            "planner: {} swap(s), {} donation(s), deadline {deadline}",
            swaps.len(),
            donations.len()
        );
        Ok(CheckoutPlan {
            swaps,
            donations,
            deadline,
            cart_revision: None,
        })
    }
}
