//! Transport abstractions for EVM RPC interactions.

#[cfg(not(target_arch = "wasm32"))]
use std::{sync::Arc, time::Duration};

#[cfg(not(target_arch = "wasm32"))]
use alloy_network::EthereumWallet;
use alloy_primitives::{Address, Bytes, B256, U256};
#[cfg(not(target_arch = "wasm32"))]
use alloy_provider::{Provider, ProviderBuilder};
#[cfg(not(target_arch = "wasm32"))]
use alloy_rpc_types::eth::transaction::{TransactionInput, TransactionRequest};
#[cfg(not(target_arch = "wasm32"))]
use alloy_signer::Signer;
#[cfg(not(target_arch = "wasm32"))]
use alloy_signer_local::PrivateKeySigner;
#[cfg(not(target_arch = "wasm32"))]
use log::{debug, warn};
#[cfg(not(target_arch = "wasm32"))]
use tokio::runtime::Runtime;

#[cfg(not(target_arch = "wasm32"))]
use crate::error::ErrorCode;
use crate::error::Result;

/// Encoded EVM call that can be dispatched via a transport.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EvmCall {
    pub to: Address,
    pub data: Bytes,
    pub value: U256,
    pub gas_limit: Option<u64>,
}

impl EvmCall {
    pub fn new(to: Address, data: impl Into<Bytes>, value: U256) -> Self {
        Self {
            to,
            data: data.into(),
            value,
            gas_limit: None,
        }
    }

    pub fn with_gas_limit(mut self, gas: Option<u64>) -> Self {
        self.gas_limit = gas;
        self
    }
}

/// Mined outcome of a submitted transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TxReceipt {
    pub tx_hash: B256,
    pub success: bool,
    pub block_number: Option<u64>,
}

/// Abstraction over sending signed EVM transactions and awaiting their receipts.
pub trait EvmTransport: Send + Sync {
    fn send(&self, call: EvmCall) -> Result<B256>;

    /// Blocks until `tx_hash` is mined.
    fn wait_for_receipt(&self, tx_hash: B256) -> Result<TxReceipt>;
}

/// Abstraction over read-only `eth_call` style interactions.
pub trait EvmViewTransport: Send + Sync {
    fn call_view(&self, call: EvmCall) -> Result<Bytes>;
}

/// Account that signs the transactions a transport sends.
pub trait EvmSigner {
    fn signer_address(&self) -> Address;
}

impl<T: EvmTransport + ?Sized> EvmTransport for &T {
    fn send(&self, call: EvmCall) -> Result<B256> {
        (**self).send(call)
    }

    fn wait_for_receipt(&self, tx_hash: B256) -> Result<TxReceipt> {
        (**self).wait_for_receipt(tx_hash)
    }
}

impl<T: EvmViewTransport + ?Sized> EvmViewTransport for &T {
    fn call_view(&self, call: EvmCall) -> Result<Bytes> {
        (**self).call_view(call)
    }
}

#[cfg(not(target_arch = "wasm32"))]
/// JSON-RPC transport backed by Alloy's provider stack and a local private key signer.
pub struct AlloyHttpTransport {
    rpc_url: reqwest::Url,
    wallet: PrivateKeySigner,
    runtime: Arc<Runtime>,
    receipt_poll: Duration,
    receipt_attempts: u32,
}

#[cfg(not(target_arch = "wasm32"))]
impl AlloyHttpTransport {
    /// Builds a new transport targeting `rpc_url` and signing with `private_key_hex`.
    pub fn new(rpc_url: &str, private_key_hex: &str) -> Result<Self> {
        let runtime = Runtime::new().map_err(|err| {
            warn!("transport init error (runtime): {err:?}");
            ErrorCode::ChainTransport
        })?;
        let url = reqwest::Url::parse(rpc_url).map_err(|err| {
            warn!("transport init error (url parse): {err:?}");
            ErrorCode::ConfigInvalid
        })?;

        let base_provider = ProviderBuilder::new().on_http(url.clone());
        let chain_id = runtime
            .block_on(base_provider.get_chain_id())
            .map_err(|err| {
                warn!("transport init error (chain_id): {err:?}");
                ErrorCode::ChainTransport
            })?;

        let mut wallet: PrivateKeySigner = private_key_hex
            .trim()
            .parse()
            .map_err(|_| ErrorCode::ConfigInvalid)?;
        wallet.set_chain_id(Some(chain_id));

        Ok(Self {
            rpc_url: url,
            wallet,
            runtime: Arc::new(runtime),
            receipt_poll: Duration::from_secs(2),
            receipt_attempts: 150,
        })
    }

    /// Overrides how often and how long receipts are polled for.
    pub fn with_receipt_polling(mut self, interval: Duration, attempts: u32) -> Self {
        self.receipt_poll = if interval.is_zero() {
            Duration::from_secs(1)
        } else {
            interval
        };
        self.receipt_attempts = attempts.max(1);
        self
    }

    fn build_transaction(&self, call: EvmCall) -> TransactionRequest {
        let mut tx = TransactionRequest::default()
            .from(self.wallet.address())
            .input(TransactionInput::from(call.data.clone()))
            .value(call.value);
        if let Some(gas) = call.gas_limit {
            tx = tx.gas_limit(gas);
        }
        tx.to = Some(alloy_primitives::TxKind::Call(call.to));
        tx
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl EvmTransport for AlloyHttpTransport {
    fn send(&self, call: EvmCall) -> Result<B256> {
        let tx = self.build_transaction(call);
        let rpc_url = self.rpc_url.clone();
        let wallet = self.wallet.clone();
        let fut = async move {
            let provider = ProviderBuilder::new()
                .with_recommended_fillers()
                .wallet(EthereumWallet::new(wallet))
                .on_http(rpc_url);
            provider.send_transaction(tx).await
        };
        let pending = self.runtime.block_on(fut).map_err(|err| {
            warn!("provider error (send): {err:?}");
            ErrorCode::ChainTransport
        })?;
        Ok(*pending.tx_hash())
    }

    fn wait_for_receipt(&self, tx_hash: B256) -> Result<TxReceipt> {
        let rpc_url = self.rpc_url.clone();
        let poll = self.receipt_poll;
        let attempts = self.receipt_attempts;
        let fut = async move {
            let provider = ProviderBuilder::new().on_http(rpc_url);
            for attempt in 1..=attempts {
                match provider.get_transaction_receipt(tx_hash).await {
                    Ok(Some(receipt)) => return Ok(Some(receipt)),
                    Ok(None) => {}
                    Err(err) => return Err(err),
                }
                debug!("receipt for {tx_hash} not yet available (attempt {attempt}/{attempts})");
                tokio::time::sleep(poll).await;
            }
            Ok(None)
        };
        match self.runtime.block_on(fut) {
            Ok(Some(receipt)) => Ok(TxReceipt {
                tx_hash,
                success: receipt.status(),
                block_number: receipt.block_number,
            }),
            Ok(None) => {
                warn!("no receipt for {tx_hash} after {attempts} polls");
                Err(ErrorCode::ChainReceiptTimeout)
            }
            Err(err) => {
                warn!("provider error (receipt): {err:?}");
                Err(ErrorCode::ChainTransport)
            }
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl EvmViewTransport for AlloyHttpTransport {
    fn call_view(&self, call: EvmCall) -> Result<Bytes> {
        let req = self.build_transaction(call);
        let rpc_url = self.rpc_url.clone();
        let fut = async move {
            let provider = ProviderBuilder::new().on_http(rpc_url);
            provider.call(&req).await
        };
        self.runtime.block_on(fut).map_err(|err| {
            warn!("provider error (call_view): {err:?}");
            ErrorCode::ChainTransport
        })
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl EvmSigner for AlloyHttpTransport {
    fn signer_address(&self) -> Address {
        self.wallet.address()
    }
}
