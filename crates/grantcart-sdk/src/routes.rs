//! Fixed swap routes from contribution tokens to the settlement token.
//!
//! Paths use the Uniswap-v3 packed layout `token ‖ fee(u24) ‖ token ‖ …`.
//! The settlement token itself resolves to the identity path: its own 20
//! address bytes with no fee segment.

use std::collections::HashMap;

use alloy_primitives::{address, Address, Bytes};
use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::{ErrorCode, Result};

pub const MAINNET_DAI: Address = address!("6B175474E89094C44Da98b954EedeAC495271d0F");
pub const MAINNET_WETH: Address = address!("C02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2");
pub const MAINNET_USDC: Address = address!("A0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48");
pub const MAINNET_USDT: Address = address!("dAC17F958D2ee523a2206206994597C13D831ec7");
pub const MAINNET_GTC: Address = address!("De30da39c46104798bB5aA3fe8B9e0e1F348163F");
/// Placeholder address wallets use for the chain's native asset.
pub const NATIVE_ASSET: Address = address!("EeeeeEeeeEeEeeEeEeEeeEEEeeeeEeeeeeeeEEeE");

const MAX_FEE: u32 = (1 << 24) - 1;
const ADDRESS_LEN: usize = 20;

/// One pool hop: swap through the pool with `fee` (hundredths of a bip) into `token_out`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolHop {
    pub fee: u32,
    pub token_out: Address,
}

impl PoolHop {
    pub fn new(fee: u32, token_out: Address) -> Self {
        Self { fee, token_out }
    }
}

/// A route as it appears in configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteConfig {
    pub token_in: Address,
    pub hops: Vec<PoolHop>,
}

/// Native asset and its wrapped ERC-20 twin.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeAssets {
    pub native: Address,
    pub wrapped: Address,
}

impl NativeAssets {
    pub fn new(native: Address, wrapped: Address) -> Self {
        Self { native, wrapped }
    }

    pub fn mainnet() -> Self {
        Self::new(NATIVE_ASSET, MAINNET_WETH)
    }

    /// Token a contribution is swapped from: the native asset trades as its
    /// wrapped form, everything else as itself.
    pub fn swap_token(&self, token: Address) -> Address {
        if token == self.native {
            self.wrapped
        } else {
            token
        }
    }

    /// Tokens funded by transaction value rather than an ERC-20 allowance.
    pub fn is_native_or_wrapped(&self, token: Address) -> bool {
        token == self.native || token == self.wrapped
    }
}

/// Static mapping of source token to the packed path ending at the settlement token.
#[derive(Clone, Debug)]
pub struct RouteTable {
    settlement: Address,
    routes: HashMap<Address, Vec<PoolHop>>,
}

impl RouteTable {
    pub fn new(settlement: Address) -> Self {
        Self {
            settlement,
            routes: HashMap::new(),
        }
    }

    pub fn settlement(&self) -> Address {
        self.settlement
    }

    pub fn with_route(mut self, token_in: Address, hops: Vec<PoolHop>) -> Result<Self> {
        self.insert_route(token_in, hops)?;
        Ok(self)
    }

    /// Adds or replaces the route for `token_in`. The route must be non-empty,
    /// use fees that fit in 24 bits, and end at the settlement token.
    pub fn insert_route(&mut self, token_in: Address, hops: Vec<PoolHop>) -> Result<()> {
        if token_in == self.settlement {
            warn!("routes: settlement token {token_in} cannot carry a route");
            return Err(ErrorCode::ConfigInvalid);
        }
        match hops.last() {
            Some(last) if last.token_out == self.settlement => {}
            _ => {
                warn!("routes: route for {token_in} does not end at {}", self.settlement);
                return Err(ErrorCode::ConfigInvalid);
            }
        }
        if let Some(hop) = hops.iter().find(|hop| hop.fee > MAX_FEE) {
            warn!("routes: fee {} for {token_in} exceeds uint24", hop.fee);
            return Err(ErrorCode::ConfigInvalid);
        }
        self.routes.insert(token_in, hops);
        Ok(())
    }

    pub fn supports(&self, token: Address) -> bool {
        token == self.settlement || self.routes.contains_key(&token)
    }

    pub fn resolve(&self, token: Address) -> Result<Bytes> {
        if token == self.settlement {
            return Ok(Bytes::copy_from_slice(token.as_slice()));
        }
        let hops = self
            .routes
            .get(&token)
            .ok_or(ErrorCode::InputUnsupportedRoute)?;
        Ok(encode_path(token, hops))
    }
}

/// Built-in mainnet table settling in DAI.
pub fn mainnet_routes() -> RouteTable {
    let mut table = RouteTable::new(MAINNET_DAI);
    let fixed = [
        (MAINNET_USDC, vec![PoolHop::new(100, MAINNET_DAI)]),
        (
            MAINNET_USDT,
            vec![PoolHop::new(100, MAINNET_USDC), PoolHop::new(100, MAINNET_DAI)],
        ),
        (MAINNET_WETH, vec![PoolHop::new(3000, MAINNET_DAI)]),
        (
            MAINNET_GTC,
            vec![PoolHop::new(10000, MAINNET_WETH), PoolHop::new(3000, MAINNET_DAI)],
        ),
    ];
    for (token_in, hops) in fixed {
        table.routes.insert(token_in, hops);
    }
    table
}

/// Packs `token_in` followed by each hop's 3-byte fee and output token.
pub fn encode_path(token_in: Address, hops: &[PoolHop]) -> Bytes {
    let mut out = Vec::with_capacity(ADDRESS_LEN + hops.len() * (3 + ADDRESS_LEN));
    out.extend_from_slice(token_in.as_slice());
    for hop in hops {
        out.extend_from_slice(&hop.fee.to_be_bytes()[1..]);
        out.extend_from_slice(hop.token_out.as_slice());
    }
    Bytes::from(out)
}

/// First token of a packed path.
pub fn path_source(path: &[u8]) -> Option<Address> {
    path.get(..ADDRESS_LEN).map(Address::from_slice)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settlement_token_resolves_to_identity_path() {
        let table = mainnet_routes();
        let path = table.resolve(MAINNET_DAI).unwrap();
        assert_eq!(path.len(), 20);
        assert_eq!(path_source(&path), Some(MAINNET_DAI));
    }

    #[test]
    fn multi_hop_path_is_packed() {
        let path = mainnet_routes().resolve(MAINNET_USDT).unwrap();
        assert_eq!(path.len(), 20 + 2 * 23);
        assert_eq!(&path[..20], MAINNET_USDT.as_slice());
        assert_eq!(&path[20..23], &[0x00, 0x00, 0x64]);
        assert_eq!(&path[23..43], MAINNET_USDC.as_slice());
        assert_eq!(&path[43..46], &[0x00, 0x00, 0x64]);
        assert_eq!(&path[46..], MAINNET_DAI.as_slice());
    }

    #[test]
    fn gtc_routes_through_weth() {
        let path = mainnet_routes().resolve(MAINNET_GTC).unwrap();
        assert_eq!(&path[20..23], &[0x00, 0x27, 0x10]);
        assert_eq!(&path[23..43], MAINNET_WETH.as_slice());
        assert_eq!(&path[43..46], &[0x00, 0x0b, 0xb8]);
    }

    #[test]
    fn unknown_token_has_no_route() {
        let table = mainnet_routes();
        let err = table.resolve(Address::repeat_byte(0x77)).unwrap_err();
        assert_eq!(err, ErrorCode::InputUnsupportedRoute);
        assert!(!table.supports(Address::repeat_byte(0x77)));
    }

    #[test]
    fn routes_must_end_at_settlement() {
        let stray = Address::repeat_byte(0x01);
        let err = RouteTable::new(MAINNET_DAI)
            .with_route(stray, vec![PoolHop::new(500, MAINNET_WETH)])
            .unwrap_err();
        assert_eq!(err, ErrorCode::ConfigInvalid);

        let err = RouteTable::new(MAINNET_DAI)
            .with_route(stray, Vec::new())
            .unwrap_err();
        assert_eq!(err, ErrorCode::ConfigInvalid);

        let err = RouteTable::new(MAINNET_DAI)
            .with_route(stray, vec![PoolHop::new(1 << 24, MAINNET_DAI)])
            .unwrap_err();
        assert_eq!(err, ErrorCode::ConfigInvalid);
    }

    #[test]
    fn extra_route_extends_table() {
        let token = Address::repeat_byte(0x05);
        let table = mainnet_routes()
            .with_route(token, vec![PoolHop::new(500, MAINNET_DAI)])
            .unwrap();
        let path = table.resolve(token).unwrap();
        assert_eq!(path_source(&path), Some(token));
        assert_eq!(&path[20..23], &[0x00, 0x01, 0xf4]);
    }

    #[test]
    fn native_asset_swaps_as_wrapped() {
        let native = NativeAssets::mainnet();
        assert_eq!(native.swap_token(NATIVE_ASSET), MAINNET_WETH);
        assert_eq!(native.swap_token(MAINNET_USDC), MAINNET_USDC);
        assert!(native.is_native_or_wrapped(MAINNET_WETH));
        assert!(!native.is_native_or_wrapped(MAINNET_DAI));
    }
}
