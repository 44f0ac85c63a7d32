/// Binding for the validator Proposals contract
use super::{
    expect_address, expect_proposal_id, expect_string, expect_u8, expect_uint, single, AbiShape,
    Detokenize, SystemContract,
};
use crate::abi::{AbiType, AbiValue};
use crate::error::Result;
use crate::types::ProposalId;
use crate::vmcaller::{ExecContext, ExecutionEngine, StateDb};
use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};

/// One proposal record as stored by the contract.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposalInfo {
    pub id: ProposalId,
    pub proposer: Address,
    pub p_type: u8,
    pub deposit: U256,
    pub rate: u8,
    pub name: String,
    pub details: String,
    pub init_block: U256,
    pub guarantee: Address,
    pub update_block: U256,
    pub status: u8,
}

impl ProposalInfo {
    /// Number of fields in the contract's record.
    pub const FIELD_COUNT: usize = 11;

    /// The contract returns a zeroed record for ids it never issued.
    pub fn exists(&self) -> bool {
        self.proposer != Address::ZERO
    }

    fn from_fields(fields: Vec<AbiValue>) -> std::result::Result<Self, String> {
        if fields.len() != Self::FIELD_COUNT {
            return Err(format!(
                "expected {} proposal fields, got {}",
                Self::FIELD_COUNT,
                fields.len()
            ));
        }
        let mut it = fields.into_iter();
        let mut next = || it.next().ok_or_else(|| "missing proposal field".to_string());
        Ok(ProposalInfo {
            id: expect_proposal_id(next()?)?,
            proposer: expect_address(next()?)?,
            p_type: expect_u8(next()?)?,
            deposit: expect_uint(next()?)?,
            rate: expect_u8(next()?)?,
            name: expect_string(next()?)?,
            details: expect_string(next()?)?,
            init_block: expect_uint(next()?)?,
            guarantee: expect_address(next()?)?,
            update_block: expect_uint(next()?)?,
            status: expect_u8(next()?)?,
        })
    }

    /// The record as ABI values, in contract field order.
    pub fn to_values(&self) -> Vec<AbiValue> {
        vec![
            AbiValue::FixedBytes(self.id.0.to_vec()),
            AbiValue::Address(self.proposer),
            AbiValue::from(self.p_type),
            AbiValue::Uint(self.deposit),
            AbiValue::from(self.rate),
            AbiValue::String(self.name.clone()),
            AbiValue::String(self.details.clone()),
            AbiValue::Uint(self.init_block),
            AbiValue::Address(self.guarantee),
            AbiValue::Uint(self.update_block),
            AbiValue::from(self.status),
        ]
    }
}

impl AbiShape for ProposalInfo {
    fn abi_shape() -> Vec<AbiType> {
        vec![
            AbiType::FixedBytes(4),
            AbiType::Address,
            AbiType::Uint(8),
            AbiType::Uint(256),
            AbiType::Uint(8),
            AbiType::String,
            AbiType::String,
            AbiType::Uint(256),
            AbiType::Address,
            AbiType::Uint(256),
            AbiType::Uint(8),
        ]
    }
}

/// `proposalInfos` returns the record as flat outputs.
impl Detokenize for ProposalInfo {
    fn from_values(values: Vec<AbiValue>) -> std::result::Result<Self, String> {
        ProposalInfo::from_fields(values)
    }
}

/// The list methods return a single `tuple[]`.
impl Detokenize for Vec<ProposalInfo> {
    fn from_values(values: Vec<AbiValue>) -> std::result::Result<Self, String> {
        match single(values)? {
            AbiValue::Array(items) => items
                .into_iter()
                .map(|item| match item {
                    AbiValue::Tuple(fields) => ProposalInfo::from_fields(fields),
                    other => Err(format!("expected proposal tuple, got {}", other.kind())),
                })
                .collect(),
            other => Err(format!("expected proposal array, got {}", other.kind())),
        }
    }
}

/// Proposals contract instance.
#[derive(Debug, Clone, Copy)]
pub struct Proposals {
    contract: SystemContract,
}

impl Default for Proposals {
    fn default() -> Self {
        Self::new()
    }
}

impl Proposals {
    pub fn new() -> Self {
        Proposals {
            contract: SystemContract::Proposals,
        }
    }

    pub fn address(&self) -> Address {
        self.contract.address()
    }

    /// Proposal ids created by `addr`, one page at a time.
    pub fn address_proposal_sets<E, S>(
        &self,
        ctx: &mut ExecContext<'_, E, S>,
        addr: Address,
        page: U256,
        size: U256,
    ) -> Result<Vec<ProposalId>>
    where
        S: StateDb,
        E: ExecutionEngine<S>,
    {
        self.contract.call(
            ctx,
            "addressProposalSets",
            &[addr.into(), page.into(), size.into()],
        )
    }

    pub fn all_proposal_sets<E, S>(
        &self,
        ctx: &mut ExecContext<'_, E, S>,
        page: U256,
        size: U256,
    ) -> Result<Vec<ProposalId>>
    where
        S: StateDb,
        E: ExecutionEngine<S>,
    {
        self.contract
            .call(ctx, "allProposalSets", &[page.into(), size.into()])
    }

    /// Full proposal records created by `addr`, one page at a time.
    pub fn address_proposals<E, S>(
        &self,
        ctx: &mut ExecContext<'_, E, S>,
        addr: Address,
        page: U256,
        size: U256,
    ) -> Result<Vec<ProposalInfo>>
    where
        S: StateDb,
        E: ExecutionEngine<S>,
    {
        self.contract.call(
            ctx,
            "addressProposals",
            &[addr.into(), page.into(), size.into()],
        )
    }

    pub fn all_proposals<E, S>(
        &self,
        ctx: &mut ExecContext<'_, E, S>,
        page: U256,
        size: U256,
    ) -> Result<Vec<ProposalInfo>>
    where
        S: StateDb,
        E: ExecutionEngine<S>,
    {
        self.contract
            .call(ctx, "allProposals", &[page.into(), size.into()])
    }

    pub fn address_proposal_count<E, S>(
        &self,
        ctx: &mut ExecContext<'_, E, S>,
        addr: Address,
    ) -> Result<U256>
    where
        S: StateDb,
        E: ExecutionEngine<S>,
    {
        self.contract
            .call(ctx, "addressProposalCount", &[addr.into()])
    }

    pub fn proposal_count<E, S>(&self, ctx: &mut ExecContext<'_, E, S>) -> Result<U256>
    where
        S: StateDb,
        E: ExecutionEngine<S>,
    {
        self.contract.call(ctx, "proposalCount", &[])
    }

    /// Looks up one proposal by its external hex id. Returns `None` when the
    /// contract answers with its zeroed default record.
    pub fn get_proposal<E, S>(
        &self,
        ctx: &mut ExecContext<'_, E, S>,
        id: &str,
    ) -> Result<Option<ProposalInfo>>
    where
        S: StateDb,
        E: ExecutionEngine<S>,
    {
        let id = ProposalId::from_hex(id)?;
        self.proposal_info(ctx, id)
    }

    pub fn proposal_info<E, S>(
        &self,
        ctx: &mut ExecContext<'_, E, S>,
        id: ProposalId,
    ) -> Result<Option<ProposalInfo>>
    where
        S: StateDb,
        E: ExecutionEngine<S>,
    {
        let info: ProposalInfo = self.contract.call(ctx, "proposalInfos", &[id_value(id)])?;
        Ok(Some(info).filter(ProposalInfo::exists))
    }

    pub fn init_proposal(&self, p_type: u8, rate: u8, name: &str, details: &str) -> Result<Vec<u8>> {
        self.contract.pack(
            "initProposal",
            &[p_type.into(), rate.into(), name.into(), details.into()],
        )
    }

    pub fn update_proposal(
        &self,
        id: ProposalId,
        rate: u8,
        deposit: U256,
        name: &str,
        details: &str,
    ) -> Result<Vec<u8>> {
        self.contract.pack(
            "updateProposal",
            &[
                id_value(id),
                rate.into(),
                deposit.into(),
                name.into(),
                details.into(),
            ],
        )
    }

    pub fn cancel_proposal(&self, id: ProposalId) -> Result<Vec<u8>> {
        self.contract.pack("cancelProposal", &[id_value(id)])
    }

    pub fn guarantee(&self, id: ProposalId) -> Result<Vec<u8>> {
        self.contract.pack("guarantee", &[id_value(id)])
    }
}

fn id_value(id: ProposalId) -> AbiValue {
    AbiValue::FixedBytes(id.0.to_vec())
}
