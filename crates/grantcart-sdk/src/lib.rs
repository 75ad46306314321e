//! grantcart SDK: turns a donation cart into a single swap-and-donate
//! transaction and drives it through approvals to confirmation.

pub mod checkout;
pub mod config;
pub mod contracts;
pub mod error;
pub mod planner;
pub mod rounds;
pub mod routes;
pub mod transport;

pub use checkout::{CheckoutClient, CheckoutReceipt, GasLimits};
pub use config::GrantcartConfig;
pub use contracts::{DonationManagerClient, Erc20Client, TxHash};
pub use error::{ErrorCategory, ErrorCode, Result};
pub use planner::{
    CheckoutPlan, Clock, DonationEntry, DonationPlanner, FixedClock, SwapSummary, SystemClock,
    DEADLINE_WINDOW, WAD,
};
pub use rounds::{first_active_round, RoundRegistry, StaticRoundRegistry};
pub use routes::{
    encode_path, mainnet_routes, path_source, NativeAssets, PoolHop, RouteConfig, RouteTable,
};
#[cfg(not(target_arch = "wasm32"))]
pub use transport::AlloyHttpTransport;
pub use transport::{EvmCall, EvmSigner, EvmTransport, EvmViewTransport, TxReceipt};

#[cfg(test)]
mod tests {
    use std::{
        collections::{HashMap, VecDeque},
        sync::{Arc, Mutex},
    };

    use alloy_primitives::{address, Address, Bytes, B256, U256};
    use alloy_sol_types::{SolCall, SolValue};
    use cart_store::{
        Amount, CartDefaults, CartStateStore, GrantMetadata, InMemoryStore, MinimalCartItem,
        StaticGrantCatalog, StaticTokenCatalog, TokenMetadata,
    };

    use super::*;
    use crate::{
        contracts::{DonationManager, Erc20},
        routes::{MAINNET_DAI, MAINNET_USDC, MAINNET_WETH, NATIVE_ASSET},
    };

    const MANAGER: Address = address!("00000000000000000000000000000000000d0a7e");
    const OWNER: Address = address!("000000000000000000000000000000000000beef");
    const ROUND: Address = address!("1111111111111111111111111111111111111111");

    #[derive(Clone, Debug, PartialEq, Eq)]
    enum Event {
        View(Address),
        Send(Address),
        Wait(B256),
    }

    #[derive(Clone, Default)]
    struct MockTransport {
        events: Arc<Mutex<Vec<Event>>>,
        sent: Arc<Mutex<Vec<EvmCall>>>,
        allowances: Arc<Mutex<HashMap<Address, U256>>>,
        reverts: Arc<Mutex<VecDeque<bool>>>,
        nonce: Arc<Mutex<u8>>,
        fail_send: Arc<Mutex<Option<ErrorCode>>>,
        fail_wait: Arc<Mutex<Option<ErrorCode>>>,
        malformed_view: Arc<Mutex<bool>>,
    }

    impl MockTransport {
        fn set_allowance(&self, token: Address, amount: U256) {
            self.allowances.lock().unwrap().insert(token, amount);
        }

        /// Queues receipt outcomes; `true` makes the matching receipt revert.
        fn queue_receipts(&self, reverted: &[bool]) {
            self.reverts.lock().unwrap().extend(reverted.iter().copied());
        }

        fn fail_sends(&self, code: ErrorCode) {
            *self.fail_send.lock().unwrap() = Some(code);
        }

        fn fail_receipts(&self, code: ErrorCode) {
            *self.fail_wait.lock().unwrap() = Some(code);
        }

        fn return_malformed_views(&self) {
            *self.malformed_view.lock().unwrap() = true;
        }

        fn events(&self) -> Vec<Event> {
            self.events.lock().unwrap().clone()
        }

        fn sent(&self) -> Vec<EvmCall> {
            self.sent.lock().unwrap().clone()
        }
    }

    impl EvmTransport for MockTransport {
        fn send(&self, call: EvmCall) -> Result<B256> {
            if let Some(code) = *self.fail_send.lock().unwrap() {
                return Err(code);
            }
            let mut nonce = self.nonce.lock().unwrap();
            *nonce += 1;
            self.events.lock().unwrap().push(Event::Send(call.to));
            self.sent.lock().unwrap().push(call);
            Ok(B256::repeat_byte(*nonce))
        }

        fn wait_for_receipt(&self, tx_hash: B256) -> Result<TxReceipt> {
            self.events.lock().unwrap().push(Event::Wait(tx_hash));
            if let Some(code) = *self.fail_wait.lock().unwrap() {
                return Err(code);
            }
            let reverted = self.reverts.lock().unwrap().pop_front().unwrap_or(false);
            Ok(TxReceipt {
                tx_hash,
                success: !reverted,
                block_number: Some(1),
            })
        }
    }

    impl EvmViewTransport for MockTransport {
        fn call_view(&self, call: EvmCall) -> Result<Bytes> {
            self.events.lock().unwrap().push(Event::View(call.to));
            if *self.malformed_view.lock().unwrap() {
                return Ok(Bytes::from(vec![0x01, 0x02]));
            }
            let allowance = self
                .allowances
                .lock()
                .unwrap()
                .get(&call.to)
                .copied()
                .unwrap_or_default();
            Ok(Bytes::from(allowance.abi_encode()))
        }
    }

    fn token(address: Address, symbol: &str, decimals: u8) -> TokenMetadata {
        TokenMetadata {
            address,
            symbol: symbol.to_string(),
            decimals,
        }
    }

    fn store() -> CartStateStore {
        let tokens = StaticTokenCatalog::new([
            token(MAINNET_DAI, "DAI", 18),
            token(MAINNET_USDC, "USDC", 6),
            token(NATIVE_ASSET, "ETH", 18),
        ]);
        let grants = StaticGrantCatalog::new(["1", "2", "3", "abc"].map(|id| GrantMetadata {
            id: id.to_string(),
            title: format!("Grant {id}"),
            payout_address: Address::repeat_byte(0x99),
        }));
        CartStateStore::open(
            Arc::new(InMemoryStore::new()),
            Arc::new(tokens),
            Arc::new(grants),
            CartDefaults::new(MAINNET_DAI, Amount::whole(5)),
        )
    }

    fn fill(store: &CartStateStore, entries: &[(&str, Address, &str)]) {
        store
            .set_canonical(entries.iter().map(|(id, token, amount)| {
                MinimalCartItem::new(*id, *token, Amount::new(amount).unwrap())
            }))
            .unwrap();
    }

    fn planner() -> DonationPlanner {
        DonationPlanner::new(
            mainnet_routes(),
            NativeAssets::mainnet(),
            Arc::new(StaticRoundRegistry::new([ROUND])),
        )
        .with_clock(Arc::new(FixedClock(1_700_000_000)))
    }

    fn client(transport: &MockTransport) -> CheckoutClient<MockTransport> {
        CheckoutClient::new(MANAGER, NativeAssets::mainnet(), transport.clone())
    }

    fn decode_donate(call: &EvmCall) -> DonationManager::donateCall {
        DonationManager::donateCall::abi_decode(&call.data, true).unwrap()
    }

    #[test]
    fn worked_example_checks_out_and_clears_cart() {
        let store = store();
        fill(&store, &[("1", MAINNET_DAI, "10"), ("2", MAINNET_DAI, "5")]);
        let transport = MockTransport::default();

        let receipt = client(&transport)
            .checkout(&store, &planner(), OWNER)
            .unwrap();

        assert_eq!(receipt.approvals.len(), 1);
        assert_eq!(receipt.value, U256::ZERO);
        assert!(receipt.cart_cleared);
        assert!(store.snapshot().is_empty());

        let sent = transport.sent();
        assert_eq!(sent.len(), 2);
        let approve = Erc20::approveCall::abi_decode(&sent[0].data, true).unwrap();
        assert_eq!(approve.spender, MANAGER);
        assert_eq!(approve.amount, U256::MAX);

        let donate = decode_donate(&sent[1]);
        assert_eq!(donate.swaps.len(), 1);
        assert_eq!(donate.swaps[0].amountIn, U256::from(15u64) * WAD);
        assert_eq!(donate.swaps[0].path.as_ref(), MAINNET_DAI.as_slice());
        assert_eq!(donate.deadline, U256::from(1_700_001_200u64));
        let total = donate.donations.iter().fold(U256::ZERO, |acc, d| acc + d.ratio);
        assert_eq!(total, WAD);
        assert_eq!(donate.donations[0].rounds, vec![ROUND]);
    }

    #[test]
    fn approvals_are_confirmed_one_by_one_before_donation() {
        let store = store();
        fill(
            &store,
            &[
                ("1", MAINNET_DAI, "10"),
                ("2", MAINNET_USDC, "3.5"),
                ("3", NATIVE_ASSET, "0.25"),
            ],
        );
        let transport = MockTransport::default();

        let receipt = client(&transport)
            .checkout(&store, &planner(), OWNER)
            .unwrap();

        assert_eq!(
            transport.events(),
            vec![
                Event::View(MAINNET_DAI),
                Event::Send(MAINNET_DAI),
                Event::Wait(B256::repeat_byte(1)),
                Event::View(MAINNET_USDC),
                Event::Send(MAINNET_USDC),
                Event::Wait(B256::repeat_byte(2)),
                Event::Send(MANAGER),
                Event::Wait(B256::repeat_byte(3)),
            ]
        );
        assert_eq!(receipt.approvals.len(), 2);
        assert_eq!(receipt.value, WAD / U256::from(4));

        let donate_call = transport.sent().pop().unwrap();
        assert_eq!(donate_call.value, WAD / U256::from(4));
        let donate = decode_donate(&donate_call);
        assert_eq!(donate.swaps.len(), 3);
        assert_eq!(donate.donations[2].token, MAINNET_WETH);
    }

    #[test]
    fn sufficient_allowance_skips_approval() {
        let store = store();
        fill(&store, &[("1", MAINNET_USDC, "100")]);
        let transport = MockTransport::default();
        transport.set_allowance(MAINNET_USDC, U256::from(100_000_000u64));

        let receipt = client(&transport)
            .checkout(&store, &planner(), OWNER)
            .unwrap();

        assert!(receipt.approvals.is_empty());
        assert_eq!(
            transport.events(),
            vec![
                Event::View(MAINNET_USDC),
                Event::Send(MANAGER),
                Event::Wait(B256::repeat_byte(1)),
            ]
        );
    }

    #[test]
    fn reverted_approval_stops_before_donation() {
        let store = store();
        fill(&store, &[("1", MAINNET_DAI, "1"), ("2", MAINNET_USDC, "1")]);
        let transport = MockTransport::default();
        transport.queue_receipts(&[true]);

        let err = client(&transport)
            .checkout(&store, &planner(), OWNER)
            .unwrap_err();

        assert_eq!(err, ErrorCode::ChainApprovalReverted);
        assert_eq!(transport.sent().len(), 1);
        assert_eq!(store.snapshot().len(), 2);
    }

    #[test]
    fn reverted_donation_keeps_cart() {
        let store = store();
        fill(&store, &[("1", MAINNET_DAI, "1")]);
        let transport = MockTransport::default();
        transport.set_allowance(MAINNET_DAI, U256::MAX);
        transport.queue_receipts(&[true]);

        let err = client(&transport)
            .checkout(&store, &planner(), OWNER)
            .unwrap_err();

        assert_eq!(err, ErrorCode::ChainDonationReverted);
        assert!(err.is_retryable());
        assert!(store.is_in_cart("1"));
    }

    #[test]
    fn submission_failure_keeps_cart() {
        let store = store();
        fill(&store, &[("1", MAINNET_DAI, "1")]);
        let transport = MockTransport::default();
        transport.fail_sends(ErrorCode::ChainTransport);

        let err = client(&transport)
            .checkout(&store, &planner(), OWNER)
            .unwrap_err();

        assert_eq!(err, ErrorCode::ChainTransport);
        assert!(err.is_retryable());
        assert!(transport.sent().is_empty());
        assert_eq!(store.snapshot().len(), 1);
    }

    #[test]
    fn unconfirmed_approval_stops_before_donation() {
        let store = store();
        fill(&store, &[("1", MAINNET_DAI, "1")]);
        let transport = MockTransport::default();
        transport.fail_receipts(ErrorCode::ChainReceiptTimeout);

        let err = client(&transport)
            .checkout(&store, &planner(), OWNER)
            .unwrap_err();

        assert_eq!(err, ErrorCode::ChainReceiptTimeout);
        let sent = transport.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, MAINNET_DAI);
        assert!(store.is_in_cart("1"));
    }

    #[test]
    fn unconfirmed_donation_keeps_cart() {
        let store = store();
        fill(&store, &[("1", MAINNET_DAI, "1")]);
        let transport = MockTransport::default();
        transport.set_allowance(MAINNET_DAI, U256::MAX);
        transport.fail_receipts(ErrorCode::ChainReceiptTimeout);

        let err = client(&transport)
            .checkout(&store, &planner(), OWNER)
            .unwrap_err();

        assert_eq!(err, ErrorCode::ChainReceiptTimeout);
        assert!(store.is_in_cart("1"));
    }

    #[test]
    fn undecodable_allowance_fails_before_any_transaction() {
        let store = store();
        fill(&store, &[("1", MAINNET_USDC, "1")]);
        let transport = MockTransport::default();
        transport.return_malformed_views();

        let err = client(&transport)
            .checkout(&store, &planner(), OWNER)
            .unwrap_err();

        assert_eq!(err, ErrorCode::ChainInvalidResponse);
        assert_eq!(transport.events(), vec![Event::View(MAINNET_USDC)]);
        assert!(transport.sent().is_empty());
        assert_eq!(store.snapshot().len(), 1);
    }

    #[test]
    fn cart_mutation_after_planning_aborts_donation() {
        let store = store();
        fill(&store, &[("1", MAINNET_DAI, "1")]);
        let plan = planner().plan_snapshot(&store.snapshot()).unwrap();
        store.update_amount("1", Amount::whole(2)).unwrap();
        let transport = MockTransport::default();

        let err = client(&transport)
            .execute(&store, &plan, OWNER)
            .unwrap_err();

        assert_eq!(err, ErrorCode::PlanningCartChanged);
        assert!(transport.sent().iter().all(|call| call.to != MANAGER));
        assert_eq!(
            store.snapshot().get("1").unwrap().contribution_amount,
            Amount::whole(2)
        );
    }

    #[test]
    fn non_numeric_grant_id_fails_before_any_transaction() {
        let store = store();
        fill(&store, &[("abc", MAINNET_USDC, "1")]);
        let transport = MockTransport::default();

        let err = client(&transport)
            .checkout(&store, &planner(), OWNER)
            .unwrap_err();

        assert_eq!(err, ErrorCode::InputInvalidGrantId);
        assert!(transport.events().is_empty());
    }

    #[test]
    fn two_native_swaps_fail_before_any_transaction() {
        let store = store();
        let swap = SwapSummary {
            token_in: MAINNET_WETH,
            amount_in: WAD,
            amount_out_min: U256::ZERO,
            path: Bytes::new(),
        };
        let plan = CheckoutPlan {
            swaps: vec![swap.clone(), swap],
            donations: Vec::new(),
            deadline: 0,
            cart_revision: None,
        };
        let transport = MockTransport::default();

        let err = client(&transport)
            .execute(&store, &plan, OWNER)
            .unwrap_err();

        assert_eq!(err, ErrorCode::PlanningMultipleNativeSwaps);
        assert!(transport.events().is_empty());
    }

    #[test]
    fn empty_cart_has_nothing_to_check_out() {
        let store = store();
        let transport = MockTransport::default();
        let err = client(&transport)
            .checkout(&store, &planner(), OWNER)
            .unwrap_err();
        assert_eq!(err, ErrorCode::PlanningEmptyCart);
    }
}
