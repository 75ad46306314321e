use std::{
    fs,
    path::Path,
    sync::{Arc, Mutex},
};

use alloy_primitives::{keccak256, Address, Bytes, B256, U256};
use anyhow::{anyhow, Context, Result};
use cart_store::{CartPersistence, CartStateStore, FileStore, InMemoryStore};
use grantcart_sdk::{
    contracts::TxHash,
    transport::{EvmCall, EvmTransport, EvmViewTransport, TxReceipt},
    GrantcartConfig, Result as SdkResult,
};

/// Loaded configuration plus the cart it governs.
pub struct Session {
    pub config: GrantcartConfig,
    pub store: CartStateStore,
}

impl Session {
    pub fn open(config_path: &Path, store_path: &Path) -> Result<Self> {
        let config = load_config(config_path)?;
        let store = open_store(&config, Arc::new(FileStore::new(store_path)));
        Ok(Self { config, store })
    }

    /// Copy of the cart backed by memory, so a rehearsal never touches the file.
    pub fn scratch_store(&self) -> Result<CartStateStore> {
        let scratch = open_store(&self.config, Arc::new(InMemoryStore::new()));
        scratch.set_canonical(self.store.snapshot().items().iter().cloned())?;
        Ok(scratch)
    }
}

pub fn load_config(path: &Path) -> Result<GrantcartConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("read config {}", path.display()))?;
    GrantcartConfig::from_json(&raw).with_context(|| format!("parse config {}", path.display()))
}

fn open_store(config: &GrantcartConfig, persistence: Arc<dyn CartPersistence>) -> CartStateStore {
    CartStateStore::open(
        persistence,
        Arc::new(config.token_catalog()),
        Arc::new(config.grant_catalog()),
        config.cart_defaults(),
    )
}

/// Records every call instead of broadcasting it. Allowances read as zero and
/// every receipt succeeds, so a rehearsal shows the full approval sequence.
#[derive(Clone, Default)]
pub struct DryRunTransport {
    calls: Arc<Mutex<Vec<EvmCall>>>,
}

impl DryRunTransport {
    pub fn calls(&self) -> Vec<EvmCall> {
        self.calls.lock().map(|calls| calls.clone()).unwrap_or_default()
    }
}

impl EvmTransport for DryRunTransport {
    fn send(&self, call: EvmCall) -> SdkResult<B256> {
        let hash = keccak256(&call.data);
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
        Ok(hash)
    }

    fn wait_for_receipt(&self, tx_hash: B256) -> SdkResult<TxReceipt> {
        Ok(TxReceipt {
            tx_hash,
            success: true,
            block_number: None,
        })
    }
}

impl EvmViewTransport for DryRunTransport {
    fn call_view(&self, _call: EvmCall) -> SdkResult<Bytes> {
        Ok(Bytes::from(U256::ZERO.to_be_bytes::<32>().to_vec()))
    }
}

pub fn parse_address(value: &str) -> Result<Address> {
    value
        .trim()
        .parse::<Address>()
        .map_err(|e| anyhow!("decode address {value:?}: {e}"))
}

pub fn format_tx_hash(hash: TxHash) -> String {
    format!("0x{}", hex::encode(hash.bytes()))
}

pub fn format_hex(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}
