//! Governance RPC layer
//!
//! * [`GovernanceTxApi`] turns each governance action into a signed
//!   transaction against one of the system contracts.
//! * [`GovernanceQueryApi`] runs the read-only binding calls against a
//!   snapshot chosen by block number or tag.
//!
//! Both sit on a [`Backend`] supplied by the node.

pub mod args;
pub mod query;
pub mod tx;

pub use args::{TransactionArgs, TxDefaults};
pub use query::GovernanceQueryApi;
pub use tx::GovernanceTxApi;

use crate::accounts::AccountManager;
use crate::error::Result;
use crate::nonce_lock::AddrLocker;
use crate::transaction::SignedTransaction;
use crate::types::{BlockNumberOrTag, ChainConfig, Header};
use crate::vmcaller::{ChainContext, ExecutionEngine, StateDb};
use alloy_primitives::{Address, B256, U256};
use std::sync::Arc;
use tracing::info;

/// Node services the governance API depends on.
///
/// Calls may block (pool submission, gas oracle); none of them is expected
/// to time out on its own.
pub trait Backend: Send + Sync {
    type State: StateDb + Send;
    type Engine: ExecutionEngine<Self::State> + Sync;

    fn account_manager(&self) -> &AccountManager;

    fn chain_config(&self) -> &ChainConfig;

    /// Head of the canonical chain.
    fn current_header(&self) -> Header;

    fn suggest_gas_price(&self) -> Result<U256>;

    /// Suggested priority fee, or `None` when the oracle has no data yet.
    fn suggest_gas_tip_cap(&self) -> Result<Option<U256>>;

    /// Next nonce for `address`, counting pooled transactions.
    fn pending_nonce_at(&self, address: Address) -> Result<u64>;

    /// Hands a signed transaction to the pool.
    fn send_transaction(&self, tx: SignedTransaction) -> Result<()>;

    /// An independent state snapshot and its header.
    fn state_and_header(&self, block: BlockNumberOrTag) -> Result<(Self::State, Header)>;

    fn engine(&self) -> &Self::Engine;

    fn chain(&self) -> &dyn ChainContext;
}

/// Submits `tx` to the pool and returns its hash. Acceptance by the pool is
/// all the hash means.
pub fn submit_transaction<B: Backend + ?Sized>(
    backend: &B,
    from: Address,
    tx: SignedTransaction,
) -> Result<B256> {
    let hash = tx.hash();
    let nonce = tx.tx.nonce();
    let recipient = tx.tx.to();
    backend.send_transaction(tx)?;
    info!(
        hash = %hash,
        from = %from,
        nonce,
        recipient = ?recipient,
        "Submitted transaction"
    );
    Ok(hash)
}

/// Both governance APIs over one backend, as served under `dpos_`.
pub struct GovernanceService<B> {
    pub tx: GovernanceTxApi<B>,
    pub query: GovernanceQueryApi<B>,
}

impl<B: Backend> GovernanceService<B> {
    pub fn new(backend: Arc<B>, nonce_lock: Arc<AddrLocker>, defaults: TxDefaults) -> Self {
        GovernanceService {
            tx: GovernanceTxApi::new(backend.clone(), nonce_lock, defaults),
            query: GovernanceQueryApi::new(backend),
        }
    }

    pub fn backend(&self) -> &Arc<B> {
        self.tx.backend()
    }
}
