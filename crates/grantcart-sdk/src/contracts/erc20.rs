use alloy_primitives::{Address, Bytes, U256};
use alloy_sol_types::{sol, SolCall};

use crate::{
    contracts::TxHash,
    error::{ErrorCode, Result},
    transport::{EvmCall, EvmTransport, EvmViewTransport},
};

sol! {
    #[allow(non_camel_case_types)]
    contract Erc20 {
        function allowance(address owner, address spender) view returns (uint256);
        function approve(address spender, uint256 amount) returns (bool);
    }
}

/// Client bound to one ERC-20 token contract.
#[derive(Clone)]
pub struct Erc20Client<T> {
    token: Address,
    transport: T,
}

impl<T> Erc20Client<T> {
    pub fn new(token: Address, transport: T) -> Self {
        Self { token, transport }
    }
}

impl<T: EvmViewTransport> Erc20Client<T> {
    /// Amount `spender` may currently pull from `owner`.
    pub fn allowance(&self, owner: Address, spender: Address) -> Result<U256> {
        let calldata = Erc20::allowanceCall { owner, spender }.abi_encode();
        let call = EvmCall::new(self.token, Bytes::from(calldata), U256::ZERO);
        let raw = self.transport.call_view(call)?;
        let decoded = Erc20::allowanceCall::abi_decode_returns(&raw, true)
            .map_err(|_| ErrorCode::ChainInvalidResponse)?;
        Ok(decoded._0)
    }
}

impl<T: EvmTransport> Erc20Client<T> {
    /// Submits `approve(spender, amount)`; the caller decides whether to await it.
    pub fn approve(&self, spender: Address, amount: U256, gas_limit: Option<u64>) -> Result<TxHash> {
        let calldata = Erc20::approveCall { spender, amount }.abi_encode();
        let call = EvmCall::new(self.token, Bytes::from(calldata), U256::ZERO)
            .with_gas_limit(gas_limit);
        self.transport.send(call).map(Into::into)
    }
}
