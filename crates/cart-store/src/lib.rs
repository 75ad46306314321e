//! cart-store: canonical donation cart for a grants checkout session.
//!
//! Pieces:
//! - Model: minimal (persisted) and hydrated (catalog-joined) cart entries
//! - Catalogs: token and grant metadata lookups supplied by the caller
//! - Storage: opaque string persistence (in-memory or JSON file)
//! - CartStateStore: the single synchronization point for every mutation
//!
//! Amounts are exact decimals; nothing in this crate uses floating point.
pub mod cart;
pub mod catalog;
pub mod config;
pub mod error;
pub mod model;
pub mod storage;

pub use cart::{CartMutation, CartSnapshot, CartStateStore};
pub use catalog::{GrantCatalog, StaticGrantCatalog, StaticTokenCatalog, TokenCatalog};
pub use config::CartDefaults;
pub use error::CartError;
pub use model::{
    Amount, GrantMetadata, HydratedCartItem, MinimalCartItem, TokenMetadata, TokenTotal,
};
pub use storage::{CartPersistence, FileStore, InMemoryStore, CART_KEY};
