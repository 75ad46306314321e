//! The canonical cart. Every change goes through [`CartStateStore::apply`] (or
//! the thin wrappers around it) and ends in [`CartStateStore::set_canonical`],
//! which rebuilds the hydrated view and persists the minimal view before
//! publishing both as one [`CartSnapshot`].

use std::{
    collections::{BTreeMap, HashSet},
    sync::Arc,
};

use alloy_primitives::{Address, U256};
use log::{debug, info, warn};
use parking_lot::RwLock;

use crate::{
    catalog::{GrantCatalog, TokenCatalog},
    config::CartDefaults,
    error::CartError,
    model::{Amount, HydratedCartItem, MinimalCartItem, TokenTotal},
    storage::{CartPersistence, CART_KEY},
};

/// Immutable view of the cart at one revision.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CartSnapshot {
    revision: u64,
    items: Vec<MinimalCartItem>,
    hydrated: Vec<HydratedCartItem>,
}

impl CartSnapshot {
    fn from_hydrated(revision: u64, hydrated: Vec<HydratedCartItem>) -> Self {
        let items = hydrated.iter().map(HydratedCartItem::minimal).collect();
        Self {
            revision,
            items,
            hydrated,
        }
    }

    /// Incremented on every committed change; unchanged by no-op mutations.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn items(&self) -> &[MinimalCartItem] {
        &self.items
    }

    pub fn hydrated(&self) -> &[HydratedCartItem] {
        &self.hydrated
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn contains(&self, grant_id: &str) -> bool {
        self.items.iter().any(|item| item.grant_id == grant_id)
    }

    pub fn get(&self, grant_id: &str) -> Option<&HydratedCartItem> {
        self.hydrated.iter().find(|item| item.grant_id == grant_id)
    }

    /// Totals per contribution token, ordered by token address.
    pub fn summary(&self) -> Vec<TokenTotal> {
        let mut totals: BTreeMap<Address, TokenTotal> = BTreeMap::new();
        for item in &self.hydrated {
            let entry = totals
                .entry(item.contribution_token_address)
                .or_insert_with(|| TokenTotal {
                    token: item.token.clone(),
                    total_base_units: U256::ZERO,
                });
            entry.total_base_units = entry
                .total_base_units
                .saturating_add(item.amount_base_units);
        }
        totals.into_values().collect()
    }
}

/// A single change request against the cart.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CartMutation {
    Add(String),
    Remove(String),
    UpdateAmount { grant_id: String, amount: Amount },
    UpdateToken { grant_id: String, token: Address },
    Replace(Vec<MinimalCartItem>),
    Clear,
}

/// Owner of the cart for one session.
///
/// Single-writer: the write lock keeps each mutation atomic, but concurrent
/// sessions over the same persistence key are not coordinated.
pub struct CartStateStore {
    persistence: Arc<dyn CartPersistence>,
    tokens: Arc<dyn TokenCatalog>,
    grants: Arc<dyn GrantCatalog>,
    defaults: CartDefaults,
    state: RwLock<Arc<CartSnapshot>>,
}

impl CartStateStore {
    /// Creates an empty store. Call [`initialize`](Self::initialize) to load
    /// the persisted cart.
    pub fn new(
        persistence: Arc<dyn CartPersistence>,
        tokens: Arc<dyn TokenCatalog>,
        grants: Arc<dyn GrantCatalog>,
        defaults: CartDefaults,
    ) -> Self {
        Self {
            persistence,
            tokens,
            grants,
            defaults,
            state: RwLock::new(Arc::new(CartSnapshot::default())),
        }
    }

    /// Creates a store and loads the persisted cart.
    pub fn open(
        persistence: Arc<dyn CartPersistence>,
        tokens: Arc<dyn TokenCatalog>,
        grants: Arc<dyn GrantCatalog>,
        defaults: CartDefaults,
    ) -> Self {
        let store = Self::new(persistence, tokens, grants, defaults);
        store.initialize();
        store
    }

    pub fn snapshot(&self) -> Arc<CartSnapshot> {
        self.state.read().clone()
    }

    /// Loads the persisted cart. Missing, unparseable or non-array payloads
    /// reset the cart to empty; entries that no longer hydrate are dropped.
    /// The healed cart is written back. Never fails.
    pub fn initialize(&self) -> Arc<CartSnapshot> {
        let mut state = self.state.write();
        let raw = match self.persistence.get(CART_KEY) {
            Ok(raw) => raw,
            Err(err) => {
                warn!("cart: persisted cart unreadable, starting empty: {err:#}");
                None
            }
        };
        let items = raw.map(|blob| decode_persisted(&blob)).unwrap_or_default();

        let mut seen = HashSet::new();
        let mut hydrated = Vec::with_capacity(items.len());
        for item in items {
            if !seen.insert(item.grant_id.clone()) {
                warn!("cart: dropping duplicate persisted grant {:?}", item.grant_id);
                continue;
            }
            match self.hydrate(item) {
                Ok(item) => hydrated.push(item),
                Err(err) => warn!("cart: dropping persisted entry: {err}"),
            }
        }

        let next = Arc::new(CartSnapshot::from_hydrated(state.revision + 1, hydrated));
        if let Err(err) = self.persist(next.items()) {
            warn!("cart: could not write back healed cart: {err}");
        }
        info!("cart: initialized with {} item(s)", next.len());
        *state = next.clone();
        next
    }

    /// Replaces the cart with `items`. Every item is re-hydrated against the
    /// catalogs; any failure leaves the cart untouched. The new minimal cart
    /// is persisted before the snapshot is published.
    pub fn set_canonical<I>(&self, items: I) -> Result<Arc<CartSnapshot>, CartError>
    where
        I: IntoIterator<Item = MinimalCartItem>,
    {
        self.apply(CartMutation::Replace(items.into_iter().collect()))
    }

    /// The single mutation entry point.
    pub fn apply(&self, mutation: CartMutation) -> Result<Arc<CartSnapshot>, CartError> {
        let mut state = self.state.write();
        let current = state.clone();
        let mut items = current.items().to_vec();

        match mutation {
            CartMutation::Add(grant_id) => {
                let grant_id = normalize_grant_id(&grant_id)?;
                if current.contains(&grant_id) {
                    debug!("cart: {grant_id:?} already present");
                    return Ok(current);
                }
                items.push(MinimalCartItem::new(
                    grant_id,
                    self.defaults.token,
                    self.defaults.amount.clone(),
                ));
            }
            CartMutation::Remove(grant_id) => {
                let grant_id = normalize_grant_id(&grant_id)?;
                if !current.contains(&grant_id) {
                    return Ok(current);
                }
                items.retain(|item| item.grant_id != grant_id);
            }
            CartMutation::UpdateAmount { grant_id, amount } => {
                let item = find_mut(&mut items, &grant_id)?;
                if item.contribution_amount == amount {
                    return Ok(current);
                }
                item.contribution_amount = amount;
            }
            CartMutation::UpdateToken { grant_id, token } => {
                let item = find_mut(&mut items, &grant_id)?;
                if item.contribution_token_address == token {
                    return Ok(current);
                }
                item.contribution_token_address = token;
            }
            CartMutation::Replace(replacement) => items = replacement,
            CartMutation::Clear => items.clear(),
        }

        self.commit(&mut state, items)
    }

    pub fn add(&self, grant_id: impl Into<String>) -> Result<Arc<CartSnapshot>, CartError> {
        self.apply(CartMutation::Add(grant_id.into()))
    }

    pub fn remove(&self, grant_id: impl Into<String>) -> Result<Arc<CartSnapshot>, CartError> {
        self.apply(CartMutation::Remove(grant_id.into()))
    }

    pub fn update_amount(
        &self,
        grant_id: impl Into<String>,
        amount: Amount,
    ) -> Result<Arc<CartSnapshot>, CartError> {
        self.apply(CartMutation::UpdateAmount {
            grant_id: grant_id.into(),
            amount,
        })
    }

    pub fn update_token(
        &self,
        grant_id: impl Into<String>,
        token: Address,
    ) -> Result<Arc<CartSnapshot>, CartError> {
        self.apply(CartMutation::UpdateToken {
            grant_id: grant_id.into(),
            token,
        })
    }

    pub fn clear(&self) -> Result<Arc<CartSnapshot>, CartError> {
        self.apply(CartMutation::Clear)
    }

    pub fn is_in_cart(&self, grant_id: &str) -> bool {
        self.state.read().contains(grant_id.trim())
    }

    fn commit(
        &self,
        state: &mut Arc<CartSnapshot>,
        items: Vec<MinimalCartItem>,
    ) -> Result<Arc<CartSnapshot>, CartError> {
        let mut seen = HashSet::with_capacity(items.len());
        let mut hydrated = Vec::with_capacity(items.len());
        for mut item in items {
            item.grant_id = normalize_grant_id(&item.grant_id)?;
            if !seen.insert(item.grant_id.clone()) {
                return Err(CartError::DuplicateGrant(item.grant_id));
            }
            hydrated.push(self.hydrate(item)?);
        }

        let next = Arc::new(CartSnapshot::from_hydrated(state.revision + 1, hydrated));
        self.persist(next.items())?;
        debug!(
            "cart: revision {} committed with {} item(s)",
            next.revision,
            next.len()
        );
        *state = next.clone();
        Ok(next)
    }

    fn hydrate(&self, item: MinimalCartItem) -> Result<HydratedCartItem, CartError> {
        let grant = self
            .grants
            .grant(&item.grant_id)
            .ok_or_else(|| CartError::UnknownGrant(item.grant_id.clone()))?;
        let token = self
            .tokens
            .token(item.contribution_token_address)
            .ok_or(CartError::UnsupportedToken(item.contribution_token_address))?;
        let amount_base_units = item.contribution_amount.to_base_units(token.decimals)?;
        if amount_base_units.is_zero() {
            return Err(CartError::InvalidAmount {
                amount: item.contribution_amount.to_string(),
                reason: "amount must be greater than zero".into(),
            });
        }
        Ok(HydratedCartItem {
            grant_id: item.grant_id,
            contribution_token_address: item.contribution_token_address,
            contribution_amount: item.contribution_amount,
            amount_base_units,
            grant,
            token,
        })
    }

    fn persist(&self, items: &[MinimalCartItem]) -> Result<(), CartError> {
        let blob = serde_json::to_string(items)
            .map_err(|err| CartError::Persistence(anyhow::Error::new(err)))?;
        self.persistence
            .set(CART_KEY, &blob)
            .map_err(CartError::Persistence)
    }
}

fn normalize_grant_id(raw: &str) -> Result<String, CartError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(CartError::EmptyGrantId);
    }
    Ok(trimmed.to_string())
}

fn find_mut<'a>(
    items: &'a mut [MinimalCartItem],
    grant_id: &str,
) -> Result<&'a mut MinimalCartItem, CartError> {
    let grant_id = grant_id.trim();
    items
        .iter_mut()
        .find(|item| item.grant_id == grant_id)
        .ok_or_else(|| CartError::GrantNotInCart(grant_id.to_string()))
}

/// Parses the persisted blob, skipping entries that fail to decode.
fn decode_persisted(blob: &str) -> Vec<MinimalCartItem> {
    let value: serde_json::Value = match serde_json::from_str(blob) {
        Ok(value) => value,
        Err(err) => {
            warn!("cart: persisted cart is not valid JSON, resetting: {err}");
            return Vec::new();
        }
    };
    let serde_json::Value::Array(entries) = value else {
        warn!("cart: persisted cart is not an array, resetting");
        return Vec::new();
    };
    entries
        .into_iter()
        .filter_map(|entry| match serde_json::from_value(entry) {
            Ok(item) => Some(item),
            Err(err) => {
                warn!("cart: skipping malformed persisted entry: {err}");
                None
            }
        })
        .collect()
}
