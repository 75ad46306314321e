mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "grantcart", about = "Grant donation cart and checkout")]
struct Cli {
    /// Deployment configuration (JSON).
    #[arg(long, global = true, value_name = "PATH", default_value = "grantcart.json")]
    config: PathBuf,
    /// File holding the persisted cart.
    #[arg(long, global = true, value_name = "PATH", default_value = "grantcart-cart.json")]
    store: PathBuf,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Inspect or edit the cart.
    Cart(commands::cart::CartCli),
    /// Print the checkout plan for the current cart as JSON.
    Plan,
    /// Approve tokens and submit the donation for the current cart.
    Checkout(commands::checkout::CheckoutArgs),
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();
    let result = commands::common::Session::open(&cli.config, &cli.store).and_then(|session| {
        match cli.command {
            Commands::Cart(args) => commands::cart::run(args, &session),
            Commands::Plan => commands::plan::run(&session),
            Commands::Checkout(args) => commands::checkout::run(args, &session),
        }
    });
    if let Err(err) = result {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
