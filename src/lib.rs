//! Custodial burn/mint bridge between Ethereum and Sui
//!
//! A request burns the bridged token on one ledger and mints the
//! equivalent amount on the other. [`coordinator::BridgeCoordinator`] ties
//! the two legs together; [`api`] exposes it over HTTP.

pub mod api;
pub mod config;
pub mod contracts;
pub mod coordinator;
pub mod db;
pub mod decimals;
pub mod error;
pub mod ledgers;
pub mod metrics;
pub mod object_locks;
pub mod retry;
pub mod sui_client;
pub mod types;
pub mod validation;
