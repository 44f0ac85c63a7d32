use super::Backend;
use crate::error::{GovError, Result};
use crate::transaction::{DynamicFeeTx, LegacyTx, TypedTransaction};
use alloy_primitives::{Address, Bytes, U256, U64};
use serde::{Deserialize, Serialize};

/// Node-side fallbacks for fields the caller leaves out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxDefaults {
    pub default_gas: u64,
    pub gas_cap: u64,
    /// Priority fee used when the gas oracle has no suggestion.
    pub default_tip: U256,
}

impl Default for TxDefaults {
    fn default() -> Self {
        TxDefaults {
            default_gas: 3_000_000,
            gas_cap: 50_000_000,
            default_tip: U256::from(1_000_000_000u64),
        }
    }
}

/// Caller-supplied transaction fields. Quantities are hex encoded on the
/// wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionArgs {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas: Option<U64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas_price: Option<U256>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_fee_per_gas: Option<U256>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_priority_fee_per_gas: Option<U256>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<U256>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<U64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Bytes>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<Bytes>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<U64>,
}

impl TransactionArgs {
    /// `input` if set, else `data`.
    pub fn call_data(&self) -> Bytes {
        self.input
            .clone()
            .or_else(|| self.data.clone())
            .unwrap_or_default()
    }

    /// Fills every field the node can infer from chain and account state.
    pub fn set_defaults<B: Backend + ?Sized>(
        &mut self,
        backend: &B,
        defaults: &TxDefaults,
    ) -> Result<()> {
        let from = self
            .from
            .ok_or_else(|| GovError::InvalidArgs("missing sender".to_string()))?;

        if self.gas_price.is_some()
            && (self.max_fee_per_gas.is_some() || self.max_priority_fee_per_gas.is_some())
        {
            return Err(GovError::InvalidArgs(
                "both gasPrice and (maxFeePerGas or maxPriorityFeePerGas) specified".to_string(),
            ));
        }

        let head = backend.current_header();
        let config = backend.chain_config();
        let london = config.is_london(head.number);
        if self.gas_price.is_none() {
            match head.base_fee.filter(|_| london) {
                Some(base_fee) => {
                    if self.max_priority_fee_per_gas.is_none() {
                        let tip = backend
                            .suggest_gas_tip_cap()?
                            .unwrap_or(defaults.default_tip);
                        self.max_priority_fee_per_gas = Some(tip);
                    }
                    let tip = self.max_priority_fee_per_gas.unwrap_or_default();
                    if self.max_fee_per_gas.is_none() {
                        self.max_fee_per_gas =
                            Some(tip.saturating_add(base_fee.saturating_mul(U256::from(2u8))));
                    }
                    let fee_cap = self.max_fee_per_gas.unwrap_or_default();
                    if fee_cap < tip {
                        return Err(GovError::InvalidArgs(format!(
                            "maxFeePerGas ({}) < maxPriorityFeePerGas ({})",
                            fee_cap, tip
                        )));
                    }
                }
                None => {
                    if self.max_fee_per_gas.is_some() || self.max_priority_fee_per_gas.is_some() {
                        return Err(GovError::InvalidArgs(
                            "maxFeePerGas or maxPriorityFeePerGas specified but london is not active yet"
                                .to_string(),
                        ));
                    }
                    self.gas_price = Some(backend.suggest_gas_price()?);
                }
            }
        }

        if self.value.is_none() {
            self.value = Some(U256::ZERO);
        }
        if self.nonce.is_none() {
            self.nonce = Some(U64::from(backend.pending_nonce_at(from)?));
        }

        if let (Some(data), Some(input)) = (&self.data, &self.input) {
            if data != input {
                return Err(GovError::InvalidArgs(
                    "both \"data\" and \"input\" are set and not equal. Please use \"input\" to pass transaction call data"
                        .to_string(),
                ));
            }
        }
        if self.to.is_none() && self.call_data().is_empty() {
            return Err(GovError::InvalidArgs(
                "contract creation without any data provided".to_string(),
            ));
        }

        if self.gas.is_none() {
            self.gas = Some(U64::from(defaults.default_gas.min(defaults.gas_cap)));
        }

        let want = config.chain_id;
        match self.chain_id {
            Some(have) if have.to::<u64>() != want => {
                return Err(GovError::InvalidArgs(format!(
                    "chainId does not match node's (have={}, want={})",
                    have, want
                )));
            }
            Some(_) => {}
            None => self.chain_id = Some(U64::from(want)),
        }
        Ok(())
    }

    /// Builds the unsigned transaction. A fee cap selects the dynamic-fee
    /// envelope.
    pub fn to_transaction(&self) -> TypedTransaction {
        let nonce = self.nonce.map(|n| n.to::<u64>()).unwrap_or_default();
        let gas = self.gas.map(|g| g.to::<u64>()).unwrap_or_default();
        let value = self.value.unwrap_or_default();
        let data = self.call_data();

        match self.max_fee_per_gas {
            Some(max_fee_per_gas) => TypedTransaction::DynamicFee(DynamicFeeTx {
                nonce,
                max_priority_fee_per_gas: self.max_priority_fee_per_gas.unwrap_or_default(),
                max_fee_per_gas,
                gas,
                to: self.to,
                value,
                data,
            }),
            None => TypedTransaction::Legacy(LegacyTx {
                nonce,
                gas_price: self.gas_price.unwrap_or_default(),
                gas,
                to: self.to,
                value,
                data,
            }),
        }
    }
}
