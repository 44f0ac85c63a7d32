use super::SystemContract;
use crate::error::Result;
use alloy_primitives::{Address, U256};

/// NodeVotes contract instance. Only produces calldata.
#[derive(Debug, Clone, Copy)]
pub struct NodeVotes {
    contract: SystemContract,
}

impl Default for NodeVotes {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeVotes {
    pub fn new() -> Self {
        NodeVotes {
            contract: SystemContract::NodeVotes,
        }
    }

    pub fn address(&self) -> Address {
        self.contract.address()
    }

    pub fn vote(&self, validator: Address) -> Result<Vec<u8>> {
        self.contract.pack("vote", &[validator.into()])
    }

    pub fn cancel_vote(&self, validator: Address, amount: U256) -> Result<Vec<u8>> {
        self.contract
            .pack("cancelVote", &[validator.into(), amount.into()])
    }

    pub fn redeem(&self, validator: Address) -> Result<Vec<u8>> {
        self.contract.pack("redeem", &[validator.into()])
    }

    pub fn earn(&self, validator: Address) -> Result<Vec<u8>> {
        self.contract.pack("earn", &[validator.into()])
    }
}
