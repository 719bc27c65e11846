pub use primitive_types::{
    H160 as Address,
    H256,
    U256,
};

pub mod abi;
pub mod admin;
pub mod animals;
pub mod audit;
pub mod bets;
pub mod chain;
pub mod client;
pub mod config;
pub mod contract;
pub mod directory;
pub mod i18n;
pub mod leaderboard;
pub mod notify;
pub mod refresh;
pub mod session;
pub mod signing;
pub mod snapshot;
pub mod subscription;
pub mod transfer;
pub mod ui;
pub mod units;
pub mod wallets;

pub mod test_helpers;
