//! Catalog boundaries. Token and grant metadata are owned by other services;
//! the cart only reads them during hydration.

use std::collections::HashMap;

use alloy_primitives::Address;

use crate::model::{GrantMetadata, TokenMetadata};

pub trait TokenCatalog: Send + Sync {
    fn token(&self, address: Address) -> Option<TokenMetadata>;
}

pub trait GrantCatalog: Send + Sync {
    fn grant(&self, id: &str) -> Option<GrantMetadata>;
}

/// Fixed token table, usually loaded from configuration.
#[derive(Clone, Debug, Default)]
pub struct StaticTokenCatalog {
    tokens: HashMap<Address, TokenMetadata>,
}

impl StaticTokenCatalog {
    pub fn new(tokens: impl IntoIterator<Item = TokenMetadata>) -> Self {
        Self {
            tokens: tokens.into_iter().map(|t| (t.address, t)).collect(),
        }
    }
}

impl TokenCatalog for StaticTokenCatalog {
    fn token(&self, address: Address) -> Option<TokenMetadata> {
        self.tokens.get(&address).cloned()
    }
}

#[derive(Clone, Debug, Default)]
pub struct StaticGrantCatalog {
    grants: HashMap<String, GrantMetadata>,
}

impl StaticGrantCatalog {
    pub fn new(grants: impl IntoIterator<Item = GrantMetadata>) -> Self {
        Self {
            grants: grants.into_iter().map(|g| (g.id.clone(), g)).collect(),
        }
    }
}

impl GrantCatalog for StaticGrantCatalog {
    fn grant(&self, id: &str) -> Option<GrantMetadata> {
        self.grants.get(id).cloned()
    }
}
