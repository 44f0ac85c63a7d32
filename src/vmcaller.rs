//! Synthetic message execution against a caller-owned state snapshot.
//!
//! Consensus code and read-only RPC queries use this to run calls into the
//! system contracts without a signed transaction: no nonce check, no gas
//! fee, no balance requirement on the sender. The EVM itself is supplied by
//! the embedding client through [`ExecutionEngine`].
//!
//! The executor is not synchronised. Two calls against the same snapshot
//! must be serialised by the caller; calls against independent snapshots
//! are independent.

use crate::types::{ChainConfig, Header};
use alloy_primitives::{Address, Bytes, B256, U256};
use std::fmt;

/// Number of ancestors reachable through the BLOCKHASH opcode.
const BLOCKHASH_WINDOW: u64 = 256;

/// Selector of Solidity's `Error(string)` revert payload.
const REVERT_ERROR_SELECTOR: [u8; 4] = [0x08, 0xc3, 0x79, 0xa0];

/// Mutable state the engine executes against.
pub trait StateDb {
    /// Applies pending account changes. With `delete_empty_objects` set,
    /// accounts emptied during the call are removed.
    fn finalise(&mut self, delete_empty_objects: bool);
}

/// Read access to the canonical chain, needed for BLOCKHASH.
pub trait ChainContext {
    fn header(&self, hash: B256, number: u64) -> Option<Header>;
}

/// Block-level environment of a call.
pub struct BlockContext<'a> {
    pub coinbase: Address,
    pub number: u64,
    pub timestamp: u64,
    pub gas_limit: u64,
    pub difficulty: U256,
    pub base_fee: Option<U256>,
    pub random: B256,
    parent_hash: B256,
    chain: &'a dyn ChainContext,
}

impl<'a> BlockContext<'a> {
    pub fn from_header(header: &Header, chain: &'a dyn ChainContext) -> Self {
        BlockContext {
            coinbase: header.coinbase,
            number: header.number,
            timestamp: header.timestamp,
            gas_limit: header.gas_limit,
            difficulty: header.difficulty,
            base_fee: header.base_fee,
            random: header.mix_digest,
            parent_hash: header.parent_hash,
            chain,
        }
    }

    /// Hash of ancestor `number`, or zero outside the 256-block window.
    pub fn block_hash(&self, number: u64) -> B256 {
        if number >= self.number || self.number - number > BLOCKHASH_WINDOW {
            return B256::ZERO;
        }
        let mut hash = self.parent_hash;
        let mut current = self.number - 1;
        loop {
            if current == number {
                return hash;
            }
            match self.chain.header(hash, current) {
                Some(header) => {
                    hash = header.parent_hash;
                    current -= 1;
                }
                None => return B256::ZERO,
            }
        }
    }
}

impl fmt::Debug for BlockContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("BlockContext")
            .field("coinbase", &self.coinbase)
            .field("number", &self.number)
            .field("timestamp", &self.timestamp)
            .field("gas_limit", &self.gas_limit)
            .finish()
    }
}

/// Transaction-level environment of a call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxContext {
    pub origin: Address,
    pub gas_price: U256,
}

impl TxContext {
    pub fn from_message(msg: &Message) -> Self {
        TxContext {
            origin: msg.from,
            gas_price: msg.gas_price,
        }
    }
}

/// A call request that bypasses transaction validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub from: Address,
    pub to: Option<Address>,
    pub nonce: u64,
    pub value: U256,
    pub gas_limit: u64,
    pub gas_price: U256,
    pub gas_fee_cap: U256,
    pub gas_tip_cap: U256,
    pub data: Bytes,
    pub check_nonce: bool,
}

impl Message {
    /// Builds a message whose fee fields all equal `gas_price`.
    #[allow(clippy::too_many_arguments)]
    pub fn legacy(
        from: Address,
        to: Option<Address>,
        nonce: u64,
        value: U256,
        gas_limit: u64,
        gas_price: U256,
        data: Vec<u8>,
        check_nonce: bool,
    ) -> Self {
        Message {
            from,
            to,
            nonce,
            value,
            gas_limit,
            gas_price,
            gas_fee_cap: gas_price,
            gas_tip_cap: gas_price,
            data: data.into(),
            check_nonce,
        }
    }

    /// Consensus/system call: zero value, zero price, unbounded gas, no
    /// nonce check.
    pub fn system_call(from: Address, to: Address, data: Vec<u8>) -> Self {
        Message::legacy(from, Some(to), 0, U256::ZERO, u64::MAX, U256::ZERO, data, false)
    }
}

/// One direct call as handed to the engine.
#[derive(Debug, Clone, Copy)]
pub struct CallFrame<'a> {
    pub caller: Address,
    pub to: Address,
    pub input: &'a [u8],
    pub gas: u64,
    pub value: U256,
}

/// Failure reported by the execution engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VmError {
    /// The callee executed REVERT with this payload.
    Revert(Bytes),
    /// Any other engine failure (out of gas, invalid opcode, ...).
    Failure(String),
}

impl VmError {
    /// Decoded `Error(string)` reason of a revert, if there is one.
    pub fn revert_reason(&self) -> Option<String> {
        let VmError::Revert(data) = self else {
            return None;
        };
        let payload = data.strip_prefix(&REVERT_ERROR_SELECTOR)?;
        let values =
            crate::abi::decode_params(&[crate::abi::AbiType::String], payload).ok()?;
        match values.into_iter().next() {
            Some(crate::abi::AbiValue::String(reason)) => Some(reason),
            _ => None,
        }
    }
}

impl fmt::Display for VmError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            VmError::Revert(data) => match self.revert_reason() {
                Some(reason) => write!(f, "execution reverted: {}", reason),
                None if data.is_empty() => f.write_str("execution reverted"),
                None => write!(f, "execution reverted: {}", data),
            },
            VmError::Failure(msg) => f.write_str(msg),
        }
    }
}

impl std::error::Error for VmError {}

/// The EVM, supplied by the embedding client. A call is atomic: on error the
/// engine has already reverted the callee's state changes.
pub trait ExecutionEngine<S: StateDb> {
    fn call(
        &self,
        block: &BlockContext<'_>,
        tx: &TxContext,
        state: &mut S,
        config: &ChainConfig,
        frame: CallFrame<'_>,
    ) -> Result<Vec<u8>, VmError>;
}

/// Executes `msg` as a direct call and finalises `state` afterwards,
/// whether or not the call succeeded.
pub fn execute_msg<S, E>(
    engine: &E,
    msg: &Message,
    state: &mut S,
    header: &Header,
    chain: &dyn ChainContext,
    config: &ChainConfig,
) -> Result<Vec<u8>, VmError>
where
    S: StateDb,
    E: ExecutionEngine<S>,
{
    let to = msg
        .to
        .ok_or_else(|| VmError::Failure("system message without a target".to_string()))?;
    let block = BlockContext::from_header(header, chain);
    let tx = TxContext::from_message(msg);
    let frame = CallFrame {
        caller: msg.from,
        to,
        input: msg.data.as_ref(),
        gas: msg.gas_limit,
        value: msg.value,
    };

    let result = engine.call(&block, &tx, state, config, frame);
    state.finalise(true);
    result
}

/// Everything a read-only binding call needs, bundled per request.
pub struct ExecContext<'a, E, S> {
    pub engine: &'a E,
    pub state: &'a mut S,
    pub header: &'a Header,
    pub chain: &'a dyn ChainContext,
    pub config: &'a ChainConfig,
}

impl<'a, E, S> ExecContext<'a, E, S>
where
    S: StateDb,
    E: ExecutionEngine<S>,
{
    pub fn new(
        engine: &'a E,
        state: &'a mut S,
        header: &'a Header,
        chain: &'a dyn ChainContext,
        config: &'a ChainConfig,
    ) -> Self {
        ExecContext {
            engine,
            state,
            header,
            chain,
            config,
        }
    }

    /// Runs `data` against `to` as a system call from the block's coinbase.
    pub fn system_call(&mut self, to: Address, data: Vec<u8>) -> Result<Vec<u8>, VmError> {
        let msg = Message::system_call(self.header.coinbase, to, data);
        self.execute(&msg)
    }

    pub fn execute(&mut self, msg: &Message) -> Result<Vec<u8>, VmError> {
        execute_msg(self.engine, msg, self.state, self.header, self.chain, self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;
    use std::collections::HashMap;

    #[derive(Default)]
    struct CountingState {
        finalised: usize,
        calls: u64,
    }

    impl StateDb for CountingState {
        fn finalise(&mut self, delete_empty_objects: bool) {
            assert!(delete_empty_objects);
            self.finalised += 1;
        }
    }

    /// Returns caller ++ origin ++ input; reverts on empty input.
    struct EchoEngine;

    impl ExecutionEngine<CountingState> for EchoEngine {
        fn call(
            &self,
            block: &BlockContext<'_>,
            tx: &TxContext,
            state: &mut CountingState,
            _config: &ChainConfig,
            frame: CallFrame<'_>,
        ) -> Result<Vec<u8>, VmError> {
            assert_eq!(frame.gas, u64::MAX);
            assert_eq!(frame.value, U256::ZERO);
            assert_eq!(tx.gas_price, U256::ZERO);
            assert_eq!(block.number, 100);
            if frame.input.is_empty() {
                return Err(VmError::Revert(Bytes::new()));
            }
            state.calls += 1;
            let mut out = frame.caller.to_vec();
            out.extend_from_slice(tx.origin.as_slice());
            out.extend_from_slice(frame.input);
            Ok(out)
        }
    }

    #[derive(Default)]
    struct MapChain {
        headers: HashMap<(B256, u64), Header>,
    }

    impl ChainContext for MapChain {
        fn header(&self, hash: B256, number: u64) -> Option<Header> {
            self.headers.get(&(hash, number)).cloned()
        }
    }

    fn header() -> Header {
        Header {
            coinbase: address!("00000000000000000000000000000000000000c0"),
            number: 100,
            parent_hash: B256::repeat_byte(99),
            ..Default::default()
        }
    }

    #[test]
    fn test_system_call_uses_coinbase_and_finalises() {
        let header = header();
        let chain = MapChain::default();
        let config = ChainConfig::new(1);
        let mut state = CountingState::default();
        let target = address!("000000000000000000000000000000000000f001");

        let mut ctx = ExecContext::new(&EchoEngine, &mut state, &header, &chain, &config);
        let out = ctx.system_call(target, vec![1, 2, 3]).unwrap();

        assert_eq!(&out[..20], header.coinbase.as_slice());
        assert_eq!(&out[20..40], header.coinbase.as_slice());
        assert_eq!(&out[40..], &[1, 2, 3]);
        assert_eq!(state.finalised, 1);
    }

    #[test]
    fn test_failed_call_still_finalises() {
        let header = header();
        let chain = MapChain::default();
        let config = ChainConfig::new(1);
        let mut state = CountingState::default();
        let msg = Message::system_call(header.coinbase, Address::ZERO, Vec::new());

        let err = execute_msg(&EchoEngine, &msg, &mut state, &header, &chain, &config).unwrap_err();
        assert_eq!(err, VmError::Revert(Bytes::new()));
        assert_eq!(err.to_string(), "execution reverted");
        assert_eq!(state.finalised, 1);
        assert_eq!(state.calls, 0);
    }

    #[test]
    fn test_message_without_target_is_rejected() {
        let header = header();
        let chain = MapChain::default();
        let config = ChainConfig::new(1);
        let mut state = CountingState::default();
        let mut msg = Message::system_call(header.coinbase, Address::ZERO, vec![1]);
        msg.to = None;

        let err = execute_msg(&EchoEngine, &msg, &mut state, &header, &chain, &config).unwrap_err();
        assert!(matches!(err, VmError::Failure(_)));
    }

    #[test]
    fn test_identical_inputs_are_deterministic() {
        let header = header();
        let chain = MapChain::default();
        let config = ChainConfig::new(1);
        let msg = Message::system_call(header.coinbase, Address::ZERO, vec![7; 40]);

        let mut a = CountingState::default();
        let mut b = CountingState::default();
        let out_a = execute_msg(&EchoEngine, &msg, &mut a, &header, &chain, &config);
        let out_b = execute_msg(&EchoEngine, &msg, &mut b, &header, &chain, &config);
        assert_eq!(out_a, out_b);
    }

    #[test]
    fn test_revert_reason_decoding() {
        let mut payload = REVERT_ERROR_SELECTOR.to_vec();
        payload.extend(
            crate::abi::encode_params(
                &[crate::abi::AbiType::String],
                &[crate::abi::AbiValue::from("Proposal not exist")],
            )
            .unwrap(),
        );
        let err = VmError::Revert(payload.into());
        assert_eq!(err.revert_reason().as_deref(), Some("Proposal not exist"));
        assert_eq!(err.to_string(), "execution reverted: Proposal not exist");
    }

    #[test]
    fn test_block_hash_walks_ancestors() {
        let mut chain = MapChain::default();
        let h99 = B256::repeat_byte(99);
        let h98 = B256::repeat_byte(98);
        chain.headers.insert(
            (h99, 99),
            Header {
                number: 99,
                parent_hash: h98,
                ..Default::default()
            },
        );
        let header = header();
        let block = BlockContext::from_header(&header, &chain);

        assert_eq!(block.block_hash(99), h99);
        assert_eq!(block.block_hash(98), h98);
        assert_eq!(block.block_hash(97), B256::ZERO);
        assert_eq!(block.block_hash(100), B256::ZERO);
    }
}
