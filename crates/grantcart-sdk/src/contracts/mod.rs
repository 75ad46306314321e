pub mod common;
pub mod donation_manager;
pub mod erc20;

pub use common::TxHash;
pub use donation_manager::{DonationManager, DonationManagerClient};
pub use erc20::{Erc20, Erc20Client};
