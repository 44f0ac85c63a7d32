use super::SystemContract;
use crate::error::Result;
use crate::vmcaller::{ExecContext, ExecutionEngine, StateDb};
use alloy_primitives::{Address, U256};

/// Validators contract instance.
#[derive(Debug, Clone, Copy)]
pub struct Validators {
    contract: SystemContract,
}

impl Default for Validators {
    fn default() -> Self {
        Self::new()
    }
}

impl Validators {
    pub fn new() -> Self {
        Validators {
            contract: SystemContract::Validators,
        }
    }

    pub fn address(&self) -> Address {
        self.contract.address()
    }

    /// Current top validator set, ordered as the contract ranks it.
    pub fn get_top_validators<E, S>(&self, ctx: &mut ExecContext<'_, E, S>) -> Result<Vec<Address>>
    where
        S: StateDb,
        E: ExecutionEngine<S>,
    {
        self.contract.call(ctx, "getTopValidators", &[])
    }

    pub fn update_validator_deposit(&self, deposit: U256) -> Result<Vec<u8>> {
        self.contract
            .pack("updateValidatorDeposit", &[deposit.into()])
    }

    pub fn update_validator_rate(&self, rate: u8) -> Result<Vec<u8>> {
        self.contract.pack("updateValidatorRate", &[rate.into()])
    }

    pub fn update_validator_name_details(&self, name: &str, details: &str) -> Result<Vec<u8>> {
        self.contract
            .pack("updateValidatorNameDetails", &[name.into(), details.into()])
    }

    pub fn unstake(&self) -> Result<Vec<u8>> {
        self.contract.pack("unstake", &[])
    }

    pub fn restore(&self) -> Result<Vec<u8>> {
        self.contract.pack("restore", &[])
    }

    pub fn redeem(&self) -> Result<Vec<u8>> {
        self.contract.pack("redeem", &[])
    }
}
