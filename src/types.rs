//! Chain-level value types shared by the executor, the bindings and the RPC layer

use crate::error::{GovError, Result};
use alloy_primitives::{Address, B256, U256};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Length of the canonical proposal identifier.
pub const PROPOSAL_ID_LEN: usize = 4;

/// Opaque 4-byte identifier the Proposals contract assigns at creation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProposalId(pub [u8; PROPOSAL_ID_LEN]);

impl ProposalId {
    /// Decodes the external `0x`-hex form. At least four bytes must decode;
    /// only the first four are kept.
    pub fn from_hex(input: &str) -> Result<Self> {
        let bytes = decode_prefixed_hex(input).map_err(GovError::Identifier)?;
        if bytes.len() < PROPOSAL_ID_LEN {
            return Err(GovError::Identifier(format!(
                "{} decodes to {} bytes, need at least {}",
                input,
                bytes.len(),
                PROPOSAL_ID_LEN
            )));
        }
        let mut id = [0u8; PROPOSAL_ID_LEN];
        id.copy_from_slice(&bytes[..PROPOSAL_ID_LEN]);
        Ok(ProposalId(id))
    }

    pub fn as_bytes(&self) -> &[u8; PROPOSAL_ID_LEN] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl fmt::Display for ProposalId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for ProposalId {
    type Err = GovError;

    fn from_str(s: &str) -> Result<Self> {
        ProposalId::from_hex(s)
    }
}

impl From<[u8; PROPOSAL_ID_LEN]> for ProposalId {
    fn from(bytes: [u8; PROPOSAL_ID_LEN]) -> Self {
        ProposalId(bytes)
    }
}

impl Serialize for ProposalId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ProposalId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        ProposalId::from_hex(&s).map_err(de::Error::custom)
    }
}

/// Decodes a `0x`-prefixed hex string. The prefix is mandatory and an odd
/// number of digits is rejected.
pub fn decode_prefixed_hex(input: &str) -> std::result::Result<Vec<u8>, String> {
    if input.is_empty() {
        return Err("empty hex string".to_string());
    }
    let digits = input
        .strip_prefix("0x")
        .or_else(|| input.strip_prefix("0X"))
        .ok_or_else(|| format!("hex string {} without 0x prefix", input))?;
    if digits.len() % 2 != 0 {
        return Err(format!("hex string {} has odd length", input));
    }
    hex::decode(digits).map_err(|e| format!("invalid hex string {}: {}", input, e))
}

/// The parts of a block header the executor and the defaults logic read.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Header {
    pub parent_hash: B256,
    pub coinbase: Address,
    pub number: u64,
    pub gas_limit: u64,
    pub timestamp: u64,
    pub difficulty: U256,
    pub mix_digest: B256,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_fee: Option<U256>,
}

/// Fork schedule and chain identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainConfig {
    pub chain_id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub london_block: Option<u64>,
}

impl ChainConfig {
    pub fn new(chain_id: u64) -> Self {
        Self {
            chain_id,
            london_block: None,
        }
    }

    pub fn with_london(mut self, block: u64) -> Self {
        self.london_block = Some(block);
        self
    }

    pub fn is_london(&self, number: u64) -> bool {
        matches!(self.london_block, Some(fork) if number >= fork)
    }
}

/// Which snapshot a read query runs against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlockNumberOrTag {
    #[default]
    Latest,
    Pending,
    Earliest,
    Number(u64),
}

impl fmt::Display for BlockNumberOrTag {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            BlockNumberOrTag::Latest => f.write_str("latest"),
            BlockNumberOrTag::Pending => f.write_str("pending"),
            BlockNumberOrTag::Earliest => f.write_str("earliest"),
            BlockNumberOrTag::Number(n) => write!(f, "0x{:x}", n),
        }
    }
}

impl FromStr for BlockNumberOrTag {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, String> {
        match s {
            "latest" => Ok(BlockNumberOrTag::Latest),
            "pending" => Ok(BlockNumberOrTag::Pending),
            "earliest" => Ok(BlockNumberOrTag::Earliest),
            other => {
                let digits = other
                    .strip_prefix("0x")
                    .ok_or_else(|| format!("invalid block number {}", other))?;
                u64::from_str_radix(digits, 16)
                    .map(BlockNumberOrTag::Number)
                    .map_err(|e| format!("invalid block number {}: {}", other, e))
            }
        }
    }
}

impl Serialize for BlockNumberOrTag {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for BlockNumberOrTag {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_proposal_id_keeps_first_four_bytes() {
        let id = ProposalId::from_hex("0xdeadbeefcafe").unwrap();
        assert_eq!(id.0, [0xde, 0xad, 0xbe, 0xef]);
        assert_eq!(id.to_hex(), "0xdeadbeef");
    }

    #[test]
    fn test_proposal_id_exact_length() {
        let id = ProposalId::from_hex("0x00000001").unwrap();
        assert_eq!(id.0, [0, 0, 0, 1]);
    }

    #[test]
    fn test_proposal_id_too_short() {
        for input in ["0x", "0x0001", "0x000001"] {
            let err = ProposalId::from_hex(input).unwrap_err();
            assert!(matches!(err, GovError::Identifier(_)), "{}", input);
        }
    }

    #[test]
    fn test_proposal_id_malformed_hex() {
        assert!(matches!(
            ProposalId::from_hex("00000001"),
            Err(GovError::Identifier(_))
        ));
        assert!(matches!(
            ProposalId::from_hex("0x0000000"),
            Err(GovError::Identifier(_))
        ));
        assert!(matches!(
            ProposalId::from_hex("0xzz000001"),
            Err(GovError::Identifier(_))
        ));
        assert!(matches!(ProposalId::from_hex(""), Err(GovError::Identifier(_))));
    }

    #[test]
    fn test_proposal_id_serde() {
        let id = ProposalId([1, 2, 3, 4]);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"0x01020304\"");
        let back: ProposalId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
        assert!(serde_json::from_str::<ProposalId>("\"0x0102\"").is_err());
    }

    #[test]
    fn test_block_tag_parsing() {
        assert_eq!("latest".parse(), Ok(BlockNumberOrTag::Latest));
        assert_eq!("pending".parse(), Ok(BlockNumberOrTag::Pending));
        assert_eq!("0x1f".parse(), Ok(BlockNumberOrTag::Number(31)));
        assert!("31".parse::<BlockNumberOrTag>().is_err());
        assert_eq!(BlockNumberOrTag::Number(31).to_string(), "0x1f");
    }

    #[test]
    fn test_london_activation() {
        let config = ChainConfig::new(7).with_london(10);
        assert!(!config.is_london(9));
        assert!(config.is_london(10));
        assert!(!ChainConfig::new(7).is_london(u64::MAX));
    }
}
