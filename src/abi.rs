//! Solidity ABI support: type model, head/tail codec and JSON schema loading

pub mod codec;
pub mod schema;
pub mod types;

pub use codec::{decode_params, encode_params};
pub use schema::{function_selector, ContractAbi, Function, Param, SELECTOR_LEN};
pub use types::{AbiType, AbiValue};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_nested_types() {
        let ty = AbiType::parse("uint256[2][]", &[]).unwrap();
        assert_eq!(
            ty,
            AbiType::Array(Box::new(AbiType::FixedArray(
                Box::new(AbiType::Uint(256)),
                2
            )))
        );
        assert_eq!(ty.canonical(), "uint256[2][]");
        assert!(ty.is_dynamic());
    }

    #[test]
    fn test_parse_rejects_bad_widths() {
        assert!(AbiType::parse("uint7", &[]).is_err());
        assert!(AbiType::parse("uint264", &[]).is_err());
        assert!(AbiType::parse("bytes33", &[]).is_err());
        assert!(AbiType::parse("bytes0", &[]).is_err());
        assert!(AbiType::parse("tuple", &[]).is_err());
    }

    #[test]
    fn test_static_head_sizes() {
        let tuple = AbiType::Tuple(vec![AbiType::Address, AbiType::FixedBytes(4)]);
        assert_eq!(tuple.head_size(), 64);
        assert_eq!(AbiType::FixedArray(Box::new(tuple), 3).head_size(), 192);
        assert_eq!(AbiType::String.head_size(), 32);
    }

    #[test]
    fn test_parse_cli_arguments() {
        let v = AbiValue::parse_arg(&AbiType::Uint(8), "10").unwrap();
        assert_eq!(v, AbiValue::from(10u8));
        let v = AbiValue::parse_arg(&AbiType::Uint(256), "0xff").unwrap();
        assert_eq!(v, AbiValue::Uint(alloy_primitives::U256::from(255u32)));
        assert!(AbiValue::parse_arg(&AbiType::Uint(8), "300").is_err());
        let v = AbiValue::parse_arg(&AbiType::FixedBytes(4), "0x00000001").unwrap();
        assert_eq!(v, AbiValue::FixedBytes(vec![0, 0, 0, 1]));
        let v = AbiValue::parse_arg(
            &AbiType::Array(Box::new(AbiType::Uint(8))),
            "[1, \"2\"]",
        )
        .unwrap();
        assert_eq!(v, AbiValue::Array(vec![AbiValue::from(1u8), AbiValue::from(2u8)]));
    }
}
