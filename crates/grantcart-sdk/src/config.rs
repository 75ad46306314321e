//! Static deployment configuration: addresses, catalogs, rounds and routes.

use std::sync::Arc;

use alloy_primitives::Address;
use cart_store::{
    Amount, CartDefaults, GrantMetadata, StaticGrantCatalog, StaticTokenCatalog, TokenMetadata,
};
use log::warn;
use serde::{Deserialize, Serialize};

use crate::{
    checkout::{CheckoutClient, GasLimits},
    error::{ErrorCode, Result},
    planner::DonationPlanner,
    rounds::StaticRoundRegistry,
    routes::{
        mainnet_routes, NativeAssets, RouteConfig, RouteTable, MAINNET_DAI, MAINNET_GTC,
        MAINNET_USDC, MAINNET_USDT, NATIVE_ASSET,
    },
};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrantcartConfig {
    pub donation_manager: Address,
    pub settlement_token: Address,
    pub native: NativeAssets,
    /// Token preselected for new cart entries; the settlement token when absent.
    #[serde(default)]
    pub default_token: Option<Address>,
    pub default_amount: Amount,
    pub tokens: Vec<TokenMetadata>,
    #[serde(default)]
    pub grants: Vec<GrantMetadata>,
    #[serde(default)]
    pub rounds: Vec<Address>,
    /// Start from the built-in mainnet route table (requires DAI settlement).
    #[serde(default)]
    pub include_mainnet_routes: bool,
    #[serde(default)]
    pub routes: Vec<RouteConfig>,
    #[serde(default)]
    pub gas: GasLimits,
}

impl GrantcartConfig {
    /// Ethereum mainnet tokens and routes, settling in DAI. Grants and rounds
    /// are deployment specific and start empty.
    pub fn mainnet_defaults(donation_manager: Address) -> Self {
        let token = |address, symbol: &str, decimals| TokenMetadata {
            address,
            symbol: symbol.to_string(),
            decimals,
        };
        Self {
            donation_manager,
            settlement_token: MAINNET_DAI,
            native: NativeAssets::mainnet(),
            default_token: None,
            default_amount: Amount::whole(5),
            tokens: vec![
                token(MAINNET_DAI, "DAI", 18),
                token(NATIVE_ASSET, "ETH", 18),
                token(MAINNET_USDC, "USDC", 6),
                token(MAINNET_USDT, "USDT", 6),
                token(MAINNET_GTC, "GTC", 18),
            ],
            grants: Vec::new(),
            rounds: Vec::new(),
            include_mainnet_routes: true,
            routes: Vec::new(),
            gas: GasLimits::default(),
        }
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(raw).map_err(|err| {
            warn!("config: {err}");
            ErrorCode::ConfigInvalid
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Every catalog token must have a route, and the default amount must be
    /// a usable contribution in the default token.
    pub fn validate(&self) -> Result<()> {
        let routes = self.route_table()?;
        let default_token = self.default_token();
        let Some(default_meta) = self.tokens.iter().find(|t| t.address == default_token) else {
            warn!("config: default token {default_token} is not in the token catalog");
            return Err(ErrorCode::ConfigInvalid);
        };
        match self.default_amount.to_base_units(default_meta.decimals) {
            Ok(units) if !units.is_zero() => {}
            Ok(_) => {
                warn!("config: default amount must be greater than zero");
                return Err(ErrorCode::ConfigInvalid);
            }
            Err(err) => {
                warn!("config: default amount unusable for {}: {err}", default_meta.symbol);
                return Err(ErrorCode::ConfigInvalid);
            }
        }
        for token in &self.tokens {
            if !routes.supports(self.native.swap_token(token.address)) {
                warn!("config: no route for {} ({})", token.symbol, token.address);
                return Err(ErrorCode::ConfigInvalid);
            }
        }
        Ok(())
    }

    pub fn default_token(&self) -> Address {
        self.default_token.unwrap_or(self.settlement_token)
    }

    pub fn cart_defaults(&self) -> CartDefaults {
        CartDefaults::new(self.default_token(), self.default_amount.clone())
    }

    pub fn token_catalog(&self) -> StaticTokenCatalog {
        StaticTokenCatalog::new(self.tokens.iter().cloned())
    }

    pub fn grant_catalog(&self) -> StaticGrantCatalog {
        StaticGrantCatalog::new(self.grants.iter().cloned())
    }

    pub fn round_registry(&self) -> StaticRoundRegistry {
        StaticRoundRegistry::new(self.rounds.iter().copied())
    }

    pub fn route_table(&self) -> Result<RouteTable> {
        let mut table = if self.include_mainnet_routes {
            if self.settlement_token != MAINNET_DAI {
                warn!("config: mainnet routes settle in DAI, not {}", self.settlement_token);
                return Err(ErrorCode::ConfigInvalid);
            }
            mainnet_routes()
        } else {
            RouteTable::new(self.settlement_token)
        };
        for route in &self.routes {
            table.insert_route(route.token_in, route.hops.clone())?;
        }
        Ok(table)
    }

    pub fn planner(&self) -> Result<DonationPlanner> {
        Ok(DonationPlanner::new(
            self.route_table()?,
            self.native,
            Arc::new(self.round_registry()),
        ))
    }

    pub fn checkout_client<T>(&self, transport: T) -> CheckoutClient<T> {
        CheckoutClient::new(self.donation_manager, self.native, transport)
            .with_gas_limits(self.gas)
    }
}
