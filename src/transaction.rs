//! Transactions assembled by the governance façade
//!
//! Two envelopes are supported: legacy transactions signed with EIP-155
//! replay protection and EIP-1559 dynamic-fee transactions (type 2). Both
//! are RLP encoded with `alloy-rlp`; the transaction hash is keccak256 of
//! the network encoding.

use alloy_primitives::{keccak256, Address, Bytes, B256, U256};
use alloy_rlp::{Encodable, Header as RlpHeader, EMPTY_LIST_CODE, EMPTY_STRING_CODE};
use serde::{Deserialize, Serialize};

/// EIP-2718 type byte of a dynamic-fee transaction.
pub const DYNAMIC_FEE_TX_TYPE: u8 = 0x02;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyTx {
    pub nonce: u64,
    pub gas_price: U256,
    pub gas: u64,
    pub to: Option<Address>,
    pub value: U256,
    pub data: Bytes,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DynamicFeeTx {
    pub nonce: u64,
    pub max_priority_fee_per_gas: U256,
    pub max_fee_per_gas: U256,
    pub gas: u64,
    pub to: Option<Address>,
    pub value: U256,
    pub data: Bytes,
}

/// An unsigned transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum TypedTransaction {
    Legacy(LegacyTx),
    DynamicFee(DynamicFeeTx),
}

impl TypedTransaction {
    pub fn nonce(&self) -> u64 {
        match self {
            TypedTransaction::Legacy(tx) => tx.nonce,
            TypedTransaction::DynamicFee(tx) => tx.nonce,
        }
    }

    pub fn to(&self) -> Option<Address> {
        match self {
            TypedTransaction::Legacy(tx) => tx.to,
            TypedTransaction::DynamicFee(tx) => tx.to,
        }
    }

    pub fn gas(&self) -> u64 {
        match self {
            TypedTransaction::Legacy(tx) => tx.gas,
            TypedTransaction::DynamicFee(tx) => tx.gas,
        }
    }

    pub fn value(&self) -> U256 {
        match self {
            TypedTransaction::Legacy(tx) => tx.value,
            TypedTransaction::DynamicFee(tx) => tx.value,
        }
    }

    pub fn data(&self) -> &Bytes {
        match self {
            TypedTransaction::Legacy(tx) => &tx.data,
            TypedTransaction::DynamicFee(tx) => &tx.data,
        }
    }

    /// Hash the sender signs over.
    pub fn signature_hash(&self, chain_id: u64) -> B256 {
        match self {
            TypedTransaction::Legacy(tx) => {
                let mut payload = Vec::new();
                encode_legacy_fields(tx, &mut payload);
                chain_id.encode(&mut payload);
                0u8.encode(&mut payload);
                0u8.encode(&mut payload);
                keccak256(wrap_list(payload))
            }
            TypedTransaction::DynamicFee(tx) => {
                let mut payload = Vec::new();
                encode_dynamic_fee_fields(tx, chain_id, &mut payload);
                let mut out = vec![DYNAMIC_FEE_TX_TYPE];
                out.extend(wrap_list(payload));
                keccak256(out)
            }
        }
    }
}

/// Secp256k1 signature with the recovery bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxSignature {
    pub r: U256,
    pub s: U256,
    pub y_parity: bool,
}

impl TxSignature {
    /// `r || s || v` with `v` in {0, 1}.
    pub fn from_bytes(bytes: &[u8; 65]) -> Self {
        TxSignature {
            r: U256::from_be_slice(&bytes[..32]),
            s: U256::from_be_slice(&bytes[32..64]),
            y_parity: bytes[64] != 0,
        }
    }

    pub fn to_bytes(&self) -> [u8; 65] {
        let mut out = [0u8; 65];
        out[..32].copy_from_slice(&self.r.to_be_bytes::<32>());
        out[32..64].copy_from_slice(&self.s.to_be_bytes::<32>());
        out[64] = self.y_parity as u8;
        out
    }

    /// EIP-155 `v` for a legacy transaction. Exceeds 64 bits for chain ids
    /// above `(u64::MAX - 36) / 2`.
    pub fn legacy_v(&self, chain_id: u64) -> U256 {
        U256::from(chain_id) * U256::from(2u8) + U256::from(35u8 + self.y_parity as u8)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    pub tx: TypedTransaction,
    pub signature: TxSignature,
    pub chain_id: u64,
}

impl SignedTransaction {
    pub fn new(tx: TypedTransaction, signature: TxSignature, chain_id: u64) -> Self {
        SignedTransaction {
            tx,
            signature,
            chain_id,
        }
    }

    /// Network encoding: a bare RLP list for legacy transactions, type byte
    /// followed by the RLP list otherwise.
    pub fn encoded(&self) -> Vec<u8> {
        let sig = &self.signature;
        match &self.tx {
            TypedTransaction::Legacy(tx) => {
                let mut payload = Vec::new();
                encode_legacy_fields(tx, &mut payload);
                sig.legacy_v(self.chain_id).encode(&mut payload);
                sig.r.encode(&mut payload);
                sig.s.encode(&mut payload);
                wrap_list(payload)
            }
            TypedTransaction::DynamicFee(tx) => {
                let mut payload = Vec::new();
                encode_dynamic_fee_fields(tx, self.chain_id, &mut payload);
                sig.y_parity.encode(&mut payload);
                sig.r.encode(&mut payload);
                sig.s.encode(&mut payload);
                let mut out = vec![DYNAMIC_FEE_TX_TYPE];
                out.extend(wrap_list(payload));
                out
            }
        }
    }

    pub fn hash(&self) -> B256 {
        keccak256(self.encoded())
    }

    pub fn signature_hash(&self) -> B256 {
        self.tx.signature_hash(self.chain_id)
    }
}

fn encode_to(to: &Option<Address>, out: &mut Vec<u8>) {
    match to {
        Some(addr) => addr.encode(out),
        None => out.push(EMPTY_STRING_CODE),
    }
}

fn encode_legacy_fields(tx: &LegacyTx, out: &mut Vec<u8>) {
    tx.nonce.encode(out);
    tx.gas_price.encode(out);
    tx.gas.encode(out);
    encode_to(&tx.to, out);
    tx.value.encode(out);
    tx.data.encode(out);
}

fn encode_dynamic_fee_fields(tx: &DynamicFeeTx, chain_id: u64, out: &mut Vec<u8>) {
    chain_id.encode(out);
    tx.nonce.encode(out);
    tx.max_priority_fee_per_gas.encode(out);
    tx.max_fee_per_gas.encode(out);
    tx.gas.encode(out);
    encode_to(&tx.to, out);
    tx.value.encode(out);
    tx.data.encode(out);
    // empty access list
    out.push(EMPTY_LIST_CODE);
}

fn wrap_list(payload: Vec<u8>) -> Vec<u8> {
    let mut out = Vec::with_capacity(payload.len() + 9);
    RlpHeader {
        list: true,
        payload_length: payload.len(),
    }
    .encode(&mut out);
    out.extend(payload);
    out
}
