use std::fmt;

use alloy_primitives::{
    utils::{format_units, parse_units, ParseUnits},
    Address, U256,
};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::CartError;

/// Human-readable contribution amount, held as an exact decimal string.
///
/// Persisted carts written by older clients store JSON numbers; both numbers
/// and strings are accepted on read, strings are always written.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Amount(String);

impl Amount {
    pub fn new(raw: impl AsRef<str>) -> Result<Self, CartError> {
        let trimmed = raw.as_ref().trim();
        let (whole, frac) = match trimmed.split_once('.') {
            Some((whole, frac)) => (whole, Some(frac)),
            None => (trimmed, None),
        };
        let digits_ok = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
        if whole.is_empty() && frac.map_or(true, str::is_empty) {
            return Err(CartError::invalid_amount(trimmed, "empty amount"));
        }
        if !digits_ok(whole) || !frac.map_or(true, digits_ok) {
            return Err(CartError::invalid_amount(
                trimmed,
                "expected an unsigned decimal number",
            ));
        }
        let canonical = match frac {
            Some(f) if !f.is_empty() => {
                let whole = if whole.is_empty() { "0" } else { whole };
                format!("{whole}.{f}")
            }
            _ => whole.to_string(),
        };
        Ok(Self(canonical))
    }

    /// Amount with no fractional part.
    pub fn whole(units: u64) -> Self {
        Self(units.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn fraction_digits(&self) -> usize {
        self.0.split_once('.').map_or(0, |(_, f)| f.len())
    }

    /// Converts to the token's smallest unit. Rejects amounts that carry more
    /// precision than the token can represent instead of truncating them.
    pub fn to_base_units(&self, decimals: u8) -> Result<U256, CartError> {
        if self.fraction_digits() > decimals as usize {
            return Err(CartError::invalid_amount(
                &self.0,
                format!("more than {decimals} fractional digits"),
            ));
        }
        match parse_units(&self.0, decimals) {
            Ok(ParseUnits::U256(value)) => Ok(value),
            Ok(ParseUnits::I256(_)) => Err(CartError::invalid_amount(&self.0, "negative amount")),
            Err(err) => Err(CartError::invalid_amount(&self.0, err.to_string())),
        }
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Amount {
    type Err = CartError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(serde_json::Number),
            Text(String),
        }

        let raw = match Raw::deserialize(deserializer)? {
            Raw::Number(n) => n.to_string(),
            Raw::Text(s) => s,
        };
        Amount::new(raw).map_err(serde::de::Error::custom)
    }
}

/// The only form of a cart entry that is ever persisted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MinimalCartItem {
    pub grant_id: String,
    pub contribution_token_address: Address,
    pub contribution_amount: Amount,
}

impl MinimalCartItem {
    pub fn new(grant_id: impl Into<String>, token: Address, amount: Amount) -> Self {
        Self {
            grant_id: grant_id.into(),
            contribution_token_address: token,
            contribution_amount: amount,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenMetadata {
    pub address: Address,
    pub symbol: String,
    pub decimals: u8,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrantMetadata {
    pub id: String,
    pub title: String,
    pub payout_address: Address,
}

/// Cart entry joined with catalog metadata. Rebuilt from its [`MinimalCartItem`]
/// on every synchronization; never persisted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HydratedCartItem {
    pub grant_id: String,
    pub contribution_token_address: Address,
    pub contribution_amount: Amount,
    /// `contribution_amount` scaled by the token's decimals.
    pub amount_base_units: U256,
    pub grant: GrantMetadata,
    pub token: TokenMetadata,
}

impl HydratedCartItem {
    pub fn minimal(&self) -> MinimalCartItem {
        MinimalCartItem {
            grant_id: self.grant_id.clone(),
            contribution_token_address: self.contribution_token_address,
            contribution_amount: self.contribution_amount.clone(),
        }
    }
}

impl From<&HydratedCartItem> for MinimalCartItem {
    fn from(value: &HydratedCartItem) -> Self {
        value.minimal()
    }
}

/// Per-token total of the cart, for display.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TokenTotal {
    pub token: TokenMetadata,
    pub total_base_units: U256,
}

impl TokenTotal {
    pub fn formatted(&self) -> String {
        format_units(self.total_base_units, self.token.decimals)
            .unwrap_or_else(|_| self.total_base_units.to_string())
    }
}
