use super::{submit_transaction, Backend, TransactionArgs, TxDefaults};
use crate::accounts::Account;
use crate::error::{GovError, Result};
use crate::nonce_lock::AddrLocker;
use crate::systemcontract::{
    NodeVotes, Proposals, SystemRewards, Validators, NODE_VOTES_CONTRACT_ADDR,
    PROPOSALS_CONTRACT_ADDR, SYSTEM_REWARDS_CONTRACT_ADDR, VALIDATORS_CONTRACT_ADDR,
};
use crate::types::ProposalId;
use alloy_primitives::{Address, B256, U256};
use std::sync::Arc;
use tracing::{info, warn};

/// Transaction-producing governance actions.
///
/// Every action resolves the signer, takes the signer's nonce lock, fills
/// defaults, packs the contract call, signs and submits. The lock is held
/// until the transaction is in the pool or the attempt failed.
pub struct GovernanceTxApi<B> {
    backend: Arc<B>,
    nonce_lock: Arc<AddrLocker>,
    defaults: TxDefaults,
}

impl<B> Clone for GovernanceTxApi<B> {
    fn clone(&self) -> Self {
        GovernanceTxApi {
            backend: self.backend.clone(),
            nonce_lock: self.nonce_lock.clone(),
            defaults: self.defaults.clone(),
        }
    }
}

impl<B: Backend> GovernanceTxApi<B> {
    pub fn new(backend: Arc<B>, nonce_lock: Arc<AddrLocker>, defaults: TxDefaults) -> Self {
        GovernanceTxApi {
            backend,
            nonce_lock,
            defaults,
        }
    }

    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    /// Explicit non-zero sender if the node knows it, else the default
    /// account.
    fn prepare_account(&self, args: &mut TransactionArgs) -> Result<Address> {
        let manager = self.backend.account_manager();
        if let Some(from) = args.from.filter(|from| *from != Address::ZERO) {
            manager.find(&Account::from(from))?;
            return Ok(from);
        }
        let account = manager.default_account().ok_or_else(|| {
            GovError::Account("need unlock or add wallet to send transaction".to_string())
        })?;
        args.from = Some(account.address);
        Ok(account.address)
    }

    async fn send_dpos_tx<F>(
        &self,
        to: Address,
        args: Option<TransactionArgs>,
        payload: F,
    ) -> Result<B256>
    where
        F: FnOnce(Address) -> Result<Vec<u8>> + Send,
    {
        let mut args = args.unwrap_or_default();
        args.to = Some(to);
        let from = self.prepare_account(&mut args)?;

        let _guard = self.nonce_lock.lock(from).await;

        args.data = Some(payload(from)?.into());
        args.input = None;
        args.set_defaults(self.backend.as_ref(), &self.defaults)?;
        let tx = args.to_transaction();

        let account = Account::from(from);
        let wallet = self.backend.account_manager().find(&account)?;
        let chain_id = self.backend.chain_config().chain_id;
        let signed = wallet.sign_tx(&account, &tx, chain_id).map_err(|e| {
            warn!(
                from = %from,
                to = ?args.to,
                value = ?args.value,
                error = %e,
                "Failed transaction send attempt"
            );
            e
        })?;

        submit_transaction(self.backend.as_ref(), from, signed)
    }

    pub async fn init_proposal(
        &self,
        p_type: u8,
        rate: u8,
        name: String,
        details: String,
        args: Option<TransactionArgs>,
    ) -> Result<B256> {
        self.send_dpos_tx(PROPOSALS_CONTRACT_ADDR, args, move |_| {
            info!(p_type, rate, %name, %details, "initProposal");
            Proposals::new().init_proposal(p_type, rate, &name, &details)
        })
        .await
    }

    pub async fn update_proposal(
        &self,
        id: String,
        rate: u8,
        deposit: U256,
        name: String,
        details: String,
        args: Option<TransactionArgs>,
    ) -> Result<B256> {
        self.send_dpos_tx(PROPOSALS_CONTRACT_ADDR, args, move |_| {
            info!(%id, rate, %deposit, %name, %details, "updateProposal");
            let id = ProposalId::from_hex(&id)?;
            Proposals::new().update_proposal(id, rate, deposit, &name, &details)
        })
        .await
    }

    pub async fn cancel_proposal(&self, id: String, args: Option<TransactionArgs>) -> Result<B256> {
        self.send_dpos_tx(PROPOSALS_CONTRACT_ADDR, args, move |_| {
            info!(%id, "cancelProposal");
            Proposals::new().cancel_proposal(ProposalId::from_hex(&id)?)
        })
        .await
    }

    pub async fn guarantee(&self, id: String, args: Option<TransactionArgs>) -> Result<B256> {
        self.send_dpos_tx(PROPOSALS_CONTRACT_ADDR, args, move |_| {
            info!(%id, "guarantee proposal");
            Proposals::new().guarantee(ProposalId::from_hex(&id)?)
        })
        .await
    }

    pub async fn update_validator_deposit(
        &self,
        deposit: U256,
        args: Option<TransactionArgs>,
    ) -> Result<B256> {
        self.send_dpos_tx(VALIDATORS_CONTRACT_ADDR, args, move |from| {
            info!(from = %from, %deposit, "updateValidatorDeposit");
            Validators::new().update_validator_deposit(deposit)
        })
        .await
    }

    pub async fn update_validator_rate(
        &self,
        rate: u8,
        args: Option<TransactionArgs>,
    ) -> Result<B256> {
        self.send_dpos_tx(VALIDATORS_CONTRACT_ADDR, args, move |from| {
            info!(from = %from, rate, "updateValidatorRate");
            Validators::new().update_validator_rate(rate)
        })
        .await
    }

    pub async fn update_validator_name_details(
        &self,
        name: String,
        details: String,
        args: Option<TransactionArgs>,
    ) -> Result<B256> {
        self.send_dpos_tx(VALIDATORS_CONTRACT_ADDR, args, move |from| {
            info!(from = %from, %name, %details, "updateValidatorNameDetails");
            Validators::new().update_validator_name_details(&name, &details)
        })
        .await
    }

    pub async fn unstake(&self, args: Option<TransactionArgs>) -> Result<B256> {
        self.send_dpos_tx(VALIDATORS_CONTRACT_ADDR, args, |from| {
            info!(from = %from, "validator unstake");
            Validators::new().unstake()
        })
        .await
    }

    pub async fn restore(&self, args: Option<TransactionArgs>) -> Result<B256> {
        self.send_dpos_tx(VALIDATORS_CONTRACT_ADDR, args, |from| {
            info!(from = %from, "validator restore");
            Validators::new().restore()
        })
        .await
    }

    pub async fn validator_redeem(&self, args: Option<TransactionArgs>) -> Result<B256> {
        self.send_dpos_tx(VALIDATORS_CONTRACT_ADDR, args, |from| {
            info!(from = %from, "validator redeem");
            Validators::new().redeem()
        })
        .await
    }

    pub async fn earn_validator_reward(&self, args: Option<TransactionArgs>) -> Result<B256> {
        self.send_dpos_tx(SYSTEM_REWARDS_CONTRACT_ADDR, args, |from| {
            info!(from = %from, "earnValidatorReward");
            SystemRewards::new().earn_validator_reward()
        })
        .await
    }

    pub async fn vote(&self, validator: Address, args: Option<TransactionArgs>) -> Result<B256> {
        self.send_dpos_tx(NODE_VOTES_CONTRACT_ADDR, args, move |from| {
            info!(voter = %from, validator = %validator, "vote");
            NodeVotes::new().vote(validator)
        })
        .await
    }

    pub async fn cancel_vote(
        &self,
        validator: Address,
        amount: U256,
        args: Option<TransactionArgs>,
    ) -> Result<B256> {
        self.send_dpos_tx(NODE_VOTES_CONTRACT_ADDR, args, move |from| {
            info!(voter = %from, validator = %validator, %amount, "cancelVote");
            NodeVotes::new().cancel_vote(validator, amount)
        })
        .await
    }

    pub async fn voter_redeem(
        &self,
        validator: Address,
        args: Option<TransactionArgs>,
    ) -> Result<B256> {
        self.send_dpos_tx(NODE_VOTES_CONTRACT_ADDR, args, move |from| {
            info!(voter = %from, validator = %validator, "voter redeem");
            NodeVotes::new().redeem(validator)
        })
        .await
    }

    pub async fn earn_vote_reward(
        &self,
        validator: Address,
        args: Option<TransactionArgs>,
    ) -> Result<B256> {
        self.send_dpos_tx(NODE_VOTES_CONTRACT_ADDR, args, move |from| {
            info!(from = %from, validator = %validator, "earn vote reward");
            NodeVotes::new().earn(validator)
        })
        .await
    }
}
