//! Bindings for the predeployed governance contracts.
//!
//! Each contract lives at a fixed address and is described by a JSON ABI
//! embedded from `abi/`. Reads are packed here, run through
//! [`crate::vmcaller`] from the block's coinbase and decoded into typed
//! results; writes only produce calldata for the RPC layer to sign.

pub mod node_votes;
pub mod proposals;
pub mod system_rewards;
pub mod validators;

pub use node_votes::NodeVotes;
pub use proposals::{ProposalInfo, Proposals};
pub use system_rewards::SystemRewards;
pub use validators::Validators;

use crate::abi::{AbiType, AbiValue, ContractAbi};
use crate::error::{GovError, Result};
use crate::types::ProposalId;
use crate::vmcaller::{ExecContext, ExecutionEngine, StateDb};
use alloy_primitives::{address, Address, U256};
use once_cell::sync::Lazy;
use std::fmt;
use tracing::error;

pub const VALIDATORS_CONTRACT_NAME: &str = "validators";
pub const PROPOSALS_CONTRACT_NAME: &str = "proposals";
pub const NODE_VOTES_CONTRACT_NAME: &str = "node_votes";
pub const SYSTEM_REWARDS_CONTRACT_NAME: &str = "system_rewards";

pub const VALIDATORS_CONTRACT_ADDR: Address = address!("000000000000000000000000000000000000f000");
pub const PROPOSALS_CONTRACT_ADDR: Address = address!("000000000000000000000000000000000000f001");
pub const NODE_VOTES_CONTRACT_ADDR: Address = address!("000000000000000000000000000000000000f002");
pub const SYSTEM_REWARDS_CONTRACT_ADDR: Address =
    address!("000000000000000000000000000000000000f003");

static VALIDATORS_ABI: Lazy<Result<ContractAbi>> = Lazy::new(|| {
    ContractAbi::from_json(
        VALIDATORS_CONTRACT_NAME,
        include_str!("../abi/validators.json"),
    )
});
static PROPOSALS_ABI: Lazy<Result<ContractAbi>> = Lazy::new(|| {
    ContractAbi::from_json(PROPOSALS_CONTRACT_NAME, include_str!("../abi/proposals.json"))
});
static NODE_VOTES_ABI: Lazy<Result<ContractAbi>> = Lazy::new(|| {
    ContractAbi::from_json(
        NODE_VOTES_CONTRACT_NAME,
        include_str!("../abi/node_votes.json"),
    )
});
static SYSTEM_REWARDS_ABI: Lazy<Result<ContractAbi>> = Lazy::new(|| {
    ContractAbi::from_json(
        SYSTEM_REWARDS_CONTRACT_NAME,
        include_str!("../abi/system_rewards.json"),
    )
});

/// The four governance contracts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SystemContract {
    Validators,
    Proposals,
    NodeVotes,
    SystemRewards,
}

impl SystemContract {
    pub const ALL: [SystemContract; 4] = [
        SystemContract::Validators,
        SystemContract::Proposals,
        SystemContract::NodeVotes,
        SystemContract::SystemRewards,
    ];

    pub fn address(&self) -> Address {
        match self {
            SystemContract::Validators => VALIDATORS_CONTRACT_ADDR,
            SystemContract::Proposals => PROPOSALS_CONTRACT_ADDR,
            SystemContract::NodeVotes => NODE_VOTES_CONTRACT_ADDR,
            SystemContract::SystemRewards => SYSTEM_REWARDS_CONTRACT_ADDR,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SystemContract::Validators => VALIDATORS_CONTRACT_NAME,
            SystemContract::Proposals => PROPOSALS_CONTRACT_NAME,
            SystemContract::NodeVotes => NODE_VOTES_CONTRACT_NAME,
            SystemContract::SystemRewards => SYSTEM_REWARDS_CONTRACT_NAME,
        }
    }

    pub fn from_name(name: &str) -> Option<SystemContract> {
        SystemContract::ALL.into_iter().find(|c| c.name() == name)
    }

    pub fn abi(&self) -> Result<&'static ContractAbi> {
        let abi = match self {
            SystemContract::Validators => &*VALIDATORS_ABI,
            SystemContract::Proposals => &*PROPOSALS_ABI,
            SystemContract::NodeVotes => &*NODE_VOTES_ABI,
            SystemContract::SystemRewards => &*SYSTEM_REWARDS_ABI,
        };
        abi.as_ref().map_err(Clone::clone)
    }

    /// Calldata for a state-changing method. Nothing is executed.
    pub fn pack(&self, method: &str, args: &[AbiValue]) -> Result<Vec<u8>> {
        self.abi()?.pack(method, args).map_err(|e| {
            error!(contract = self.name(), method, error = %e, "can't pack system contract method");
            e
        })
    }

    /// Packs `method`, runs it as a system call against `ctx` and decodes
    /// the result as `T`.
    pub fn call<T, E, S>(
        &self,
        ctx: &mut ExecContext<'_, E, S>,
        method: &str,
        args: &[AbiValue],
    ) -> Result<T>
    where
        T: Detokenize,
        S: StateDb,
        E: ExecutionEngine<S>,
    {
        let abi = self.abi()?;
        let data = self.pack(method, args)?;

        let result = ctx.system_call(self.address(), data).map_err(|e| {
            error!(contract = self.name(), method, error = %e, "system contract call failed");
            GovError::execution(method, e)
        })?;

        let values = abi.unpack(method, &result).map_err(|e| {
            error!(contract = self.name(), method, error = %e, "system contract unpack failed");
            e
        })?;
        T::from_values(values).map_err(|reason| {
            error!(contract = self.name(), method, %reason, "invalid system contract result format");
            GovError::unpack(method, reason)
        })
    }
}

impl fmt::Display for SystemContract {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Static mapping from a method's decoded output values to a typed result.
pub trait Detokenize: Sized {
    fn from_values(values: Vec<AbiValue>) -> std::result::Result<Self, String>;
}

/// Unwraps the single output of a method returning one value.
pub(crate) fn single(values: Vec<AbiValue>) -> std::result::Result<AbiValue, String> {
    let count = values.len();
    let mut iter = values.into_iter();
    match (iter.next(), count) {
        (Some(value), 1) => Ok(value),
        _ => Err(format!("expected a single return value, got {}", count)),
    }
}

pub(crate) fn expect_uint(value: AbiValue) -> std::result::Result<U256, String> {
    match value {
        AbiValue::Uint(v) => Ok(v),
        other => Err(format!("expected uint, got {}", other.kind())),
    }
}

pub(crate) fn expect_u8(value: AbiValue) -> std::result::Result<u8, String> {
    let v = expect_uint(value)?;
    if v.bit_len() > 8 {
        return Err(format!("value {} does not fit in uint8", v));
    }
    Ok(v.as_limbs()[0] as u8)
}

pub(crate) fn expect_address(value: AbiValue) -> std::result::Result<Address, String> {
    match value {
        AbiValue::Address(a) => Ok(a),
        other => Err(format!("expected address, got {}", other.kind())),
    }
}

pub(crate) fn expect_string(value: AbiValue) -> std::result::Result<String, String> {
    match value {
        AbiValue::String(s) => Ok(s),
        other => Err(format!("expected string, got {}", other.kind())),
    }
}

pub(crate) fn expect_proposal_id(value: AbiValue) -> std::result::Result<ProposalId, String> {
    match value {
        AbiValue::FixedBytes(bytes) => <[u8; 4]>::try_from(bytes.as_slice())
            .map(ProposalId)
            .map_err(|_| format!("expected bytes4, got {} bytes", bytes.len())),
        other => Err(format!("expected bytes4, got {}", other.kind())),
    }
}

pub(crate) fn expect_array(value: AbiValue) -> std::result::Result<Vec<AbiValue>, String> {
    match value {
        AbiValue::Array(items) => Ok(items),
        other => Err(format!("expected array, got {}", other.kind())),
    }
}

impl Detokenize for U256 {
    fn from_values(values: Vec<AbiValue>) -> std::result::Result<Self, String> {
        expect_uint(single(values)?)
    }
}

impl Detokenize for Vec<ProposalId> {
    fn from_values(values: Vec<AbiValue>) -> std::result::Result<Self, String> {
        expect_array(single(values)?)?
            .into_iter()
            .map(expect_proposal_id)
            .collect()
    }
}

impl Detokenize for Vec<Address> {
    fn from_values(values: Vec<AbiValue>) -> std::result::Result<Self, String> {
        expect_array(single(values)?)?
            .into_iter()
            .map(expect_address)
            .collect()
    }
}

/// Output types `T` is declared against; checked against the schema in tests.
pub trait AbiShape {
    fn abi_shape() -> Vec<AbiType>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_schemas_load() {
        for contract in SystemContract::ALL {
            let abi = contract.abi().unwrap();
            assert_eq!(abi.name(), contract.name());
            assert!(abi.functions().count() > 0);
        }
    }

    #[test]
    fn test_contract_lookup_by_name() {
        assert_eq!(
            SystemContract::from_name("node_votes"),
            Some(SystemContract::NodeVotes)
        );
        assert_eq!(SystemContract::from_name("staking"), None);
    }

    #[test]
    fn test_fixed_addresses_are_distinct() {
        let mut addrs: Vec<Address> = SystemContract::ALL.iter().map(|c| c.address()).collect();
        addrs.sort();
        addrs.dedup();
        assert_eq!(addrs.len(), 4);
    }

    #[test]
    fn test_scalar_shape_mismatch() {
        let err = U256::from_values(vec![AbiValue::String("10".into())]).unwrap_err();
        assert!(err.contains("expected uint"));
        assert!(U256::from_values(vec![]).is_err());
    }

    #[test]
    fn test_id_list_decoding() {
        let ids = Vec::<ProposalId>::from_values(vec![AbiValue::Array(vec![
            AbiValue::FixedBytes(vec![0, 0, 0, 1]),
            AbiValue::FixedBytes(vec![0, 0, 0, 2]),
        ])])
        .unwrap();
        assert_eq!(ids, vec![ProposalId([0, 0, 0, 1]), ProposalId([0, 0, 0, 2])]);
    }
}
