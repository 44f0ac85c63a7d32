use super::SystemContract;
use crate::error::Result;
use alloy_primitives::Address;

/// SystemRewards contract instance.
#[derive(Debug, Clone, Copy)]
pub struct SystemRewards {
    contract: SystemContract,
}

impl Default for SystemRewards {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemRewards {
    pub fn new() -> Self {
        SystemRewards {
            contract: SystemContract::SystemRewards,
        }
    }

    pub fn address(&self) -> Address {
        self.contract.address()
    }

    pub fn earn_validator_reward(&self) -> Result<Vec<u8>> {
        self.contract.pack("earnValidatorReward", &[])
    }
}
