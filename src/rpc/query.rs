use super::Backend;
use crate::error::Result;
use crate::systemcontract::{ProposalInfo, Proposals, Validators};
use crate::types::{BlockNumberOrTag, ProposalId};
use crate::vmcaller::ExecContext;
use alloy_primitives::{Address, U256};
use std::sync::Arc;
use tracing::debug;

/// Read-only governance queries. Each call gets its own snapshot from the
/// backend, so concurrent queries never share state.
pub struct GovernanceQueryApi<B> {
    backend: Arc<B>,
}

impl<B> Clone for GovernanceQueryApi<B> {
    fn clone(&self) -> Self {
        GovernanceQueryApi {
            backend: self.backend.clone(),
        }
    }
}

impl<B: Backend> GovernanceQueryApi<B> {
    pub fn new(backend: Arc<B>) -> Self {
        GovernanceQueryApi { backend }
    }

    fn with_snapshot<T>(
        &self,
        block: BlockNumberOrTag,
        f: impl FnOnce(&mut ExecContext<'_, B::Engine, B::State>) -> Result<T>,
    ) -> Result<T> {
        let (mut state, header) = self.backend.state_and_header(block)?;
        debug!(block = %block, number = header.number, "governance query snapshot");
        let mut ctx = ExecContext::new(
            self.backend.engine(),
            &mut state,
            &header,
            self.backend.chain(),
            self.backend.chain_config(),
        );
        f(&mut ctx)
    }

    pub fn address_proposal_sets(
        &self,
        addr: Address,
        page: U256,
        size: U256,
        block: BlockNumberOrTag,
    ) -> Result<Vec<ProposalId>> {
        self.with_snapshot(block, |ctx| {
            Proposals::new().address_proposal_sets(ctx, addr, page, size)
        })
    }

    pub fn all_proposal_sets(
        &self,
        page: U256,
        size: U256,
        block: BlockNumberOrTag,
    ) -> Result<Vec<ProposalId>> {
        self.with_snapshot(block, |ctx| Proposals::new().all_proposal_sets(ctx, page, size))
    }

    pub fn address_proposals(
        &self,
        addr: Address,
        page: U256,
        size: U256,
        block: BlockNumberOrTag,
    ) -> Result<Vec<ProposalInfo>> {
        self.with_snapshot(block, |ctx| {
            Proposals::new().address_proposals(ctx, addr, page, size)
        })
    }

    pub fn all_proposals(
        &self,
        page: U256,
        size: U256,
        block: BlockNumberOrTag,
    ) -> Result<Vec<ProposalInfo>> {
        self.with_snapshot(block, |ctx| Proposals::new().all_proposals(ctx, page, size))
    }

    pub fn address_proposal_count(&self, addr: Address, block: BlockNumberOrTag) -> Result<U256> {
        self.with_snapshot(block, |ctx| {
            Proposals::new().address_proposal_count(ctx, addr)
        })
    }

    pub fn proposal_count(&self, block: BlockNumberOrTag) -> Result<U256> {
        self.with_snapshot(block, |ctx| Proposals::new().proposal_count(ctx))
    }

    /// `None` when the contract has no record under `id`.
    pub fn proposal_infos(
        &self,
        id: &str,
        block: BlockNumberOrTag,
    ) -> Result<Option<ProposalInfo>> {
        let id = ProposalId::from_hex(id)?;
        self.with_snapshot(block, |ctx| Proposals::new().proposal_info(ctx, id))
    }

    pub fn top_validators(&self, block: BlockNumberOrTag) -> Result<Vec<Address>> {
        self.with_snapshot(block, |ctx| Validators::new().get_top_validators(ctx))
    }
}
