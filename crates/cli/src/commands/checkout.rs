use alloy_primitives::Address;
use anyhow::{Context, Result};
use clap::Args;
use grantcart_sdk::{AlloyHttpTransport, CheckoutReceipt, EvmSigner};
use log::info;

use super::common::{format_hex, format_tx_hash, parse_address, DryRunTransport, Session};

#[derive(Clone, Debug, Args)]
pub struct CheckoutArgs {
    /// EVM JSON-RPC endpoint (required unless --dry-run).
    #[arg(long)]
    pub rpc: Option<String>,
    /// Private key of the donor (required unless --dry-run).
    #[arg(long, value_name = "HEX64")]
    pub private_key: Option<String>,
    /// Donor address used for allowance reads during a dry run.
    #[arg(long, value_name = "HEX40")]
    pub from: Option<String>,
    /// Do not submit transactions, only print calldata/value. The cart is kept.
    #[arg(long, default_value_t = false)]
    pub dry_run: bool,
}

pub fn run(args: CheckoutArgs, session: &Session) -> Result<()> {
    let planner = session.config.planner()?;

    if args.dry_run {
        let owner = match &args.from {
            Some(from) => parse_address(from)?,
            None => Address::ZERO,
        };
        let transport = DryRunTransport::default();
        let client = session.config.checkout_client(transport.clone());
        let scratch = session.scratch_store()?;
        let receipt = client.checkout(&scratch, &planner, owner)?;
        for call in transport.calls() {
            println!(
                "dry-run call -> to: {}, gas_limit: {}, value: {}, data: {}",
                call.to,
                call.gas_limit.unwrap_or(0),
                call.value,
                format_hex(&call.data)
            );
        }
        print_receipt(&receipt);
        println!("dry run: cart left unchanged");
    } else {
        let rpc = args
            .rpc
            .as_ref()
            .context("--rpc is required unless --dry-run")?;
        let pk = args
            .private_key
            .as_ref()
            .context("--private-key is required unless --dry-run")?;
        let transport = AlloyHttpTransport::new(rpc, pk)?;
        let owner = transport.signer_address();
        info!("checking out as {owner}");
        let client = session.config.checkout_client(transport);
        let receipt = client.checkout(&session.store, &planner, owner)?;
        print_receipt(&receipt);
        if !receipt.cart_cleared {
            eprintln!("warning: donation confirmed but the cart file could not be cleared");
        }
    }

    Ok(())
}

fn print_receipt(receipt: &CheckoutReceipt) {
    for hash in &receipt.approvals {
        println!("approval tx hash: {}", format_tx_hash(*hash));
    }
    println!("donation tx hash: {}", format_tx_hash(receipt.donation));
    println!("donation value: {}", receipt.value);
}
