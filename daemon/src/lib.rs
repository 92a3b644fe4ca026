// Sika ledger daemon library
// Exposes internal modules for integration tests

pub mod config;
pub mod core;
pub mod rpc;
