//! Shared fixtures: an in-memory EVM that emulates the Proposals and
//! Validators contracts from decoded calldata, and a node backend around it.

#![allow(dead_code)]

use alloy_primitives::{Address, Bytes, B256, U256};
use govbridge::abi::{encode_params, AbiType, AbiValue};
use govbridge::accounts::{recover_address, AccountManager, LocalWallet, Wallet};
use govbridge::error::{GovError, Result};
use govbridge::nonce_lock::AddrLocker;
use govbridge::rpc::{Backend, GovernanceService, TxDefaults};
use govbridge::systemcontract::{
    ProposalInfo, SystemContract, PROPOSALS_CONTRACT_ADDR, VALIDATORS_CONTRACT_ADDR,
};
use govbridge::transaction::SignedTransaction;
use govbridge::types::{BlockNumberOrTag, ChainConfig, Header, ProposalId};
use govbridge::vmcaller::{
    BlockContext, CallFrame, ChainContext, ExecutionEngine, Message, StateDb, TxContext, VmError,
};
use parking_lot::Mutex;
use std::sync::Arc;

pub const CHAIN_ID: u64 = 1337;

pub const STATUS_ACTIVE: u8 = 0;
pub const STATUS_GUARANTEED: u8 = 1;
pub const STATUS_CANCELLED: u8 = 2;

/// Contract storage as seen by the scripted engine.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryState {
    pub proposals: Vec<ProposalInfo>,
    pub top_validators: Vec<Address>,
    pub finalised: usize,
}

impl StateDb for MemoryState {
    fn finalise(&mut self, delete_empty_objects: bool) {
        assert!(delete_empty_objects);
        self.finalised += 1;
    }
}

impl MemoryState {
    pub fn with_proposals(proposals: Vec<ProposalInfo>) -> Self {
        MemoryState {
            proposals,
            ..Default::default()
        }
    }
}

pub fn proposal(index: u32, proposer: Address) -> ProposalInfo {
    ProposalInfo {
        id: ProposalId(index.to_be_bytes()),
        proposer,
        p_type: 1,
        deposit: U256::from(1_000u32) * U256::from(index),
        rate: 10,
        name: format!("validator-{}", index),
        details: "details".to_string(),
        init_block: U256::from(index),
        guarantee: Address::ZERO,
        update_block: U256::from(index),
        status: STATUS_ACTIVE,
    }
}

/// Emulates the contracts' observable behaviour; not their bookkeeping.
#[derive(Debug, Default)]
pub struct ScriptedEvm {
    calls: Mutex<usize>,
}

impl ScriptedEvm {
    pub fn calls(&self) -> usize {
        *self.calls.lock()
    }
}

fn revert(reason: &str) -> VmError {
    let mut data = vec![0x08, 0xc3, 0x79, 0xa0];
    data.extend(
        encode_params(&[AbiType::String], &[AbiValue::String(reason.to_string())])
            .unwrap_or_default(),
    );
    VmError::Revert(Bytes::from(data))
}

fn uint(value: &AbiValue) -> U256 {
    match value {
        AbiValue::Uint(v) => *v,
        _ => U256::ZERO,
    }
}

fn small(value: &AbiValue) -> u8 {
    uint(value).as_limbs()[0] as u8
}

fn text(value: &AbiValue) -> String {
    match value {
        AbiValue::String(s) => s.clone(),
        _ => String::new(),
    }
}

fn addr(value: &AbiValue) -> Address {
    match value {
        AbiValue::Address(a) => *a,
        _ => Address::ZERO,
    }
}

fn id(value: &AbiValue) -> ProposalId {
    match value {
        AbiValue::FixedBytes(b) if b.len() == 4 => ProposalId([b[0], b[1], b[2], b[3]]),
        _ => ProposalId::default(),
    }
}

/// 0-based page of `items`; out-of-range pages are empty.
fn page<T: Clone>(items: &[T], page: U256, size: U256) -> Vec<T> {
    if page.bit_len() > 32 || size.bit_len() > 32 {
        return Vec::new();
    }
    let page = page.as_limbs()[0] as usize;
    let size = size.as_limbs()[0] as usize;
    items
        .iter()
        .skip(page.saturating_mul(size))
        .take(size)
        .cloned()
        .collect()
}

fn records(proposals: Vec<ProposalInfo>) -> AbiValue {
    AbiValue::Array(
        proposals
            .iter()
            .map(|p| AbiValue::Tuple(p.to_values()))
            .collect(),
    )
}

fn ids(proposals: Vec<ProposalInfo>) -> AbiValue {
    AbiValue::Array(
        proposals
            .iter()
            .map(|p| AbiValue::FixedBytes(p.id.0.to_vec()))
            .collect(),
    )
}

impl ScriptedEvm {
    fn proposals_call(
        &self,
        block: &BlockContext<'_>,
        state: &mut MemoryState,
        frame: CallFrame<'_>,
    ) -> std::result::Result<Vec<u8>, VmError> {
        let abi = SystemContract::Proposals
            .abi()
            .map_err(|e| VmError::Failure(e.to_string()))?;
        let function = abi
            .function_by_selector(frame.input)
            .ok_or_else(|| VmError::Revert(Bytes::new()))?;
        let args = abi
            .unpack_input(&function.name, frame.input)
            .map_err(|_| revert("malformed calldata"))?;
        let now = U256::from(block.number);

        let out = match function.name.as_str() {
            "initProposal" => {
                let index = state.proposals.len() as u32 + 1;
                state.proposals.push(ProposalInfo {
                    id: ProposalId(index.to_be_bytes()),
                    proposer: frame.caller,
                    p_type: small(&args[0]),
                    deposit: frame.value,
                    rate: small(&args[1]),
                    name: text(&args[2]),
                    details: text(&args[3]),
                    init_block: now,
                    guarantee: Address::ZERO,
                    update_block: now,
                    status: STATUS_ACTIVE,
                });
                vec![]
            }
            "updateProposal" | "cancelProposal" | "guarantee" => {
                let target = id(&args[0]);
                let record = state
                    .proposals
                    .iter_mut()
                    .find(|p| p.id == target)
                    .ok_or_else(|| revert("Proposal not exist"))?;
                match function.name.as_str() {
                    "updateProposal" => {
                        if record.proposer != frame.caller {
                            return Err(revert("Not proposer"));
                        }
                        record.rate = small(&args[1]);
                        record.deposit = uint(&args[2]);
                        record.name = text(&args[3]);
                        record.details = text(&args[4]);
                    }
                    "cancelProposal" => {
                        if record.proposer != frame.caller {
                            return Err(revert("Not proposer"));
                        }
                        record.status = STATUS_CANCELLED;
                    }
                    _ => {
                        record.guarantee = frame.caller;
                        record.status = STATUS_GUARANTEED;
                    }
                }
                record.update_block = now;
                vec![]
            }
            "addressProposalSets" => {
                let owner = addr(&args[0]);
                let mine: Vec<_> = state
                    .proposals
                    .iter()
                    .filter(|p| p.proposer == owner)
                    .cloned()
                    .collect();
                vec![ids(page(&mine, uint(&args[1]), uint(&args[2])))]
            }
            "allProposalSets" => vec![ids(page(&state.proposals, uint(&args[0]), uint(&args[1])))],
            "addressProposals" => {
                let owner = addr(&args[0]);
                let mine: Vec<_> = state
                    .proposals
                    .iter()
                    .filter(|p| p.proposer == owner)
                    .cloned()
                    .collect();
                vec![records(page(&mine, uint(&args[1]), uint(&args[2])))]
            }
            "allProposals" => vec![records(page(
                &state.proposals,
                uint(&args[0]),
                uint(&args[1]),
            ))],
            "addressProposalCount" => {
                let owner = addr(&args[0]);
                let count = state.proposals.iter().filter(|p| p.proposer == owner).count();
                vec![AbiValue::Uint(U256::from(count))]
            }
            "proposalCount" => vec![AbiValue::Uint(U256::from(state.proposals.len()))],
            "proposalInfos" => {
                let target = id(&args[0]);
                state
                    .proposals
                    .iter()
                    .find(|p| p.id == target)
                    .cloned()
                    .unwrap_or_default()
                    .to_values()
            }
            _ => return Err(VmError::Revert(Bytes::new())),
        };

        abi.pack_output(&function.name, &out)
            .map_err(|e| VmError::Failure(e.to_string()))
    }

    fn validators_call(
        &self,
        state: &mut MemoryState,
        frame: CallFrame<'_>,
    ) -> std::result::Result<Vec<u8>, VmError> {
        let abi = SystemContract::Validators
            .abi()
            .map_err(|e| VmError::Failure(e.to_string()))?;
        match abi.function_by_selector(frame.input) {
            Some(f) if f.name == "getTopValidators" => abi
                .pack_output(
                    "getTopValidators",
                    &[AbiValue::Array(
                        state
                            .top_validators
                            .iter()
                            .map(|a| AbiValue::Address(*a))
                            .collect(),
                    )],
                )
                .map_err(|e| VmError::Failure(e.to_string())),
            Some(_) => Ok(Vec::new()),
            None => Err(VmError::Revert(Bytes::new())),
        }
    }
}

impl ExecutionEngine<MemoryState> for ScriptedEvm {
    fn call(
        &self,
        block: &BlockContext<'_>,
        _tx: &TxContext,
        state: &mut MemoryState,
        _config: &ChainConfig,
        frame: CallFrame<'_>,
    ) -> std::result::Result<Vec<u8>, VmError> {
        *self.calls.lock() += 1;
        // a call is atomic: work on a copy and commit on success
        let mut scratch = state.clone();
        let result = if frame.to == PROPOSALS_CONTRACT_ADDR {
            self.proposals_call(block, &mut scratch, frame)
        } else if frame.to == VALIDATORS_CONTRACT_ADDR {
            self.validators_call(&mut scratch, frame)
        } else {
            Ok(Vec::new())
        };
        if result.is_ok() {
            *state = scratch;
        }
        result
    }
}

pub struct NoAncestors;

impl ChainContext for NoAncestors {
    fn header(&self, _hash: B256, _number: u64) -> Option<Header> {
        None
    }
}

pub fn head() -> Header {
    Header {
        coinbase: Address::repeat_byte(0xc0),
        number: 100,
        gas_limit: 30_000_000,
        base_fee: Some(U256::from(7u8)),
        ..Default::default()
    }
}

/// A node that mines every submitted transaction immediately.
pub struct MockBackend {
    pub accounts: AccountManager,
    pub config: ChainConfig,
    pub head: Header,
    pub state: Mutex<MemoryState>,
    pub pool: Mutex<Vec<(Address, SignedTransaction)>>,
    pub engine: ScriptedEvm,
    pub chain: NoAncestors,
    pub reject_submissions: bool,
}

impl MockBackend {
    pub fn new(wallets: Vec<Arc<dyn Wallet>>) -> Self {
        MockBackend {
            accounts: AccountManager::new(wallets),
            config: ChainConfig::new(CHAIN_ID).with_london(0),
            head: head(),
            state: Mutex::new(MemoryState::default()),
            pool: Mutex::new(Vec::new()),
            engine: ScriptedEvm::default(),
            chain: NoAncestors,
            reject_submissions: false,
        }
    }

    /// Backend with one wallet holding one fresh account.
    pub fn with_account() -> (Self, Arc<LocalWallet>, Address) {
        let wallet = Arc::new(LocalWallet::new());
        let account = wallet.new_account();
        let backend = MockBackend::new(vec![wallet.clone() as Arc<dyn Wallet>]);
        (backend, wallet, account.address)
    }

    pub fn pooled(&self) -> Vec<(Address, SignedTransaction)> {
        self.pool.lock().clone()
    }
}

impl Backend for MockBackend {
    type State = MemoryState;
    type Engine = ScriptedEvm;

    fn account_manager(&self) -> &AccountManager {
        &self.accounts
    }

    fn chain_config(&self) -> &ChainConfig {
        &self.config
    }

    fn current_header(&self) -> Header {
        self.head.clone()
    }

    fn suggest_gas_price(&self) -> Result<U256> {
        Ok(U256::from(1_000_000_000u64))
    }

    fn suggest_gas_tip_cap(&self) -> Result<Option<U256>> {
        Ok(Some(U256::from(2u8)))
    }

    fn pending_nonce_at(&self, address: Address) -> Result<u64> {
        Ok(self
            .pool
            .lock()
            .iter()
            .filter(|(from, _)| *from == address)
            .count() as u64)
    }

    fn send_transaction(&self, tx: SignedTransaction) -> Result<()> {
        if self.reject_submissions {
            return Err(GovError::Submission("txpool is full".to_string()));
        }
        let from = recover_address(tx.signature_hash(), &tx.signature)?;
        let to = tx
            .tx
            .to()
            .ok_or_else(|| GovError::Submission("contract creation not supported".to_string()))?;
        let msg = Message::legacy(
            from,
            Some(to),
            tx.tx.nonce(),
            tx.tx.value(),
            tx.tx.gas(),
            U256::ZERO,
            tx.tx.data().to_vec(),
            true,
        );
        {
            let mut state = self.state.lock();
            // reverted transactions are still included
            let _ = govbridge::vmcaller::execute_msg(
                &self.engine,
                &msg,
                &mut *state,
                &self.head,
                &self.chain,
                &self.config,
            );
        }
        self.pool.lock().push((from, tx));
        Ok(())
    }

    fn state_and_header(&self, _block: BlockNumberOrTag) -> Result<(MemoryState, Header)> {
        Ok((self.state.lock().clone(), self.head.clone()))
    }

    fn engine(&self) -> &ScriptedEvm {
        &self.engine
    }

    fn chain(&self) -> &dyn ChainContext {
        &self.chain
    }
}

pub fn service(backend: MockBackend) -> (Arc<MockBackend>, Arc<GovernanceService<MockBackend>>) {
    let backend = Arc::new(backend);
    let service = GovernanceService::new(
        backend.clone(),
        Arc::new(AddrLocker::new()),
        TxDefaults::default(),
    );
    (backend, Arc::new(service))
}
