//! govbridge - system-contract bridge for a DPoS chain
//!
//! # Architecture
//!
//! The crate is organized into logical modules:
//!
//! ## Execution
//! - [`vmcaller`] - Synthetic message execution against a state snapshot
//! - [`types`] - Headers, chain config, proposal ids
//!
//! ## Contract Bindings
//! - [`abi`] - ABI type model, codec and JSON schemas
//! - [`systemcontract`] - Proposals, Validators, NodeVotes and SystemRewards
//!
//! ## Signing
//! - [`accounts`] - Accounts, wallets and the local key store (secp256k1)
//! - [`transaction`] - Legacy and dynamic-fee transactions
//! - [`nonce_lock`] - Per-address nonce lock
//!
//! ## RPC
//! - [`rpc`] - Governance transaction and query APIs
//! - [`server`] - JSON-RPC over HTTP
//!
//! ## Configuration & Utilities
//! - [`config`] - Configuration management
//! - [`error`] - Error types
//! - [`telemetry`] - Logging setup

#![forbid(unsafe_code)]

// ============================================================================
// Execution
// ============================================================================
pub mod types;
pub mod vmcaller;

// ============================================================================
// Contract Bindings
// ============================================================================
pub mod abi;
pub mod systemcontract;

// ============================================================================
// Signing
// ============================================================================
pub mod accounts;
pub mod nonce_lock;
pub mod transaction;

// ============================================================================
// RPC
// ============================================================================
pub mod rpc;
#[cfg(feature = "server")]
pub mod server;

// ============================================================================
// Configuration & Utilities
// ============================================================================
pub mod config;
pub mod error;
pub mod telemetry;

pub use error::{GovError, Result};
