use anyhow::Result;
use cart_store::{Amount, CartSnapshot};
use clap::{Args, Subcommand};

use super::common::{parse_address, Session};

#[derive(Clone, Debug, Args)]
pub struct CartCli {
    #[command(subcommand)]
    pub command: CartCommand,
}

#[derive(Clone, Debug, Subcommand)]
pub enum CartCommand {
    /// Add a grant with the default token and amount.
    Add { grant_id: String },
    /// Remove a grant.
    Remove { grant_id: String },
    /// Set the contribution amount (human units, e.g. 12.5).
    Amount { grant_id: String, amount: String },
    /// Set the contribution token.
    Token {
        grant_id: String,
        #[arg(value_name = "HEX40")]
        token: String,
    },
    /// Show the cart and its per-token totals.
    List,
    /// Empty the cart.
    Clear,
}

pub fn run(args: CartCli, session: &Session) -> Result<()> {
    let store = &session.store;
    let snapshot = match args.command {
        CartCommand::Add { grant_id } => store.add(grant_id)?,
        CartCommand::Remove { grant_id } => store.remove(grant_id)?,
        CartCommand::Amount { grant_id, amount } => {
            store.update_amount(grant_id, Amount::new(amount)?)?
        }
        CartCommand::Token { grant_id, token } => {
            store.update_token(grant_id, parse_address(&token)?)?
        }
        CartCommand::List => store.snapshot(),
        CartCommand::Clear => store.clear()?,
    };
    print_cart(&snapshot);
    Ok(())
}

fn print_cart(snapshot: &CartSnapshot) {
    if snapshot.is_empty() {
        println!("cart is empty");
        return;
    }
    for item in snapshot.hydrated() {
        println!(
            "{}\t{}\t{} {}",
            item.grant_id, item.grant.title, item.contribution_amount, item.token.symbol
        );
    }
    for total in snapshot.summary() {
        println!("total: {} {}", total.formatted(), total.token.symbol);
    }
}
