/// Standard Solidity head/tail ABI encoding and decoding
use super::types::{AbiType, AbiValue};
use alloy_primitives::{Address, I256, U256};

const WORD: usize = 32;

/// Encodes `values` as the tuple `types` (function arguments or return data).
pub fn encode_params(types: &[AbiType], values: &[AbiValue]) -> Result<Vec<u8>, String> {
    if types.len() != values.len() {
        return Err(format!(
            "expected {} values, got {}",
            types.len(),
            values.len()
        ));
    }

    let head_len: usize = types.iter().map(AbiType::head_size).sum();
    let mut head = Vec::with_capacity(head_len);
    let mut tail = Vec::new();

    for (ty, value) in types.iter().zip(values) {
        value.type_check(ty)?;
        let encoded = encode_single(ty, value)?;
        if ty.is_dynamic() {
            head.extend_from_slice(&usize_word(head_len + tail.len()));
            tail.extend_from_slice(&encoded);
        } else {
            head.extend_from_slice(&encoded);
        }
    }

    head.extend_from_slice(&tail);
    Ok(head)
}

fn encode_single(ty: &AbiType, value: &AbiValue) -> Result<Vec<u8>, String> {
    let encoded = match (ty, value) {
        (AbiType::Address, AbiValue::Address(addr)) => {
            let mut word = [0u8; WORD];
            word[12..].copy_from_slice(addr.as_slice());
            word.to_vec()
        }
        (AbiType::Bool, AbiValue::Bool(b)) => usize_word(*b as usize).to_vec(),
        (AbiType::Uint(_), AbiValue::Uint(v)) => v.to_be_bytes::<WORD>().to_vec(),
        (AbiType::Int(_), AbiValue::Int(v)) => v.into_raw().to_be_bytes::<WORD>().to_vec(),
        (AbiType::FixedBytes(_), AbiValue::FixedBytes(bytes)) => {
            let mut word = [0u8; WORD];
            word[..bytes.len()].copy_from_slice(bytes);
            word.to_vec()
        }
        (AbiType::Bytes, AbiValue::Bytes(bytes)) => encode_packed_bytes(bytes),
        (AbiType::String, AbiValue::String(s)) => encode_packed_bytes(s.as_bytes()),
        (AbiType::Array(inner), AbiValue::Array(items)) => {
            let types = vec![(**inner).clone(); items.len()];
            let mut out = usize_word(items.len()).to_vec();
            out.extend(encode_params(&types, items)?);
            out
        }
        (AbiType::FixedArray(inner, len), AbiValue::FixedArray(items)) => {
            let types = vec![(**inner).clone(); *len];
            encode_params(&types, items)?
        }
        (AbiType::Tuple(types), AbiValue::Tuple(items)) => encode_params(types, items)?,
        (ty, value) => return Err(format!("cannot encode {} as {}", value.kind(), ty)),
    };
    Ok(encoded)
}

fn encode_packed_bytes(bytes: &[u8]) -> Vec<u8> {
    let padded = bytes.len().div_ceil(WORD) * WORD;
    let mut out = Vec::with_capacity(WORD + padded);
    out.extend_from_slice(&usize_word(bytes.len()));
    out.extend_from_slice(bytes);
    out.resize(WORD + padded, 0);
    out
}

fn usize_word(n: usize) -> [u8; WORD] {
    U256::from(n).to_be_bytes::<WORD>()
}

/// Decodes `data` as the tuple `types`.
pub fn decode_params(types: &[AbiType], data: &[u8]) -> Result<Vec<AbiValue>, String> {
    let mut values = Vec::with_capacity(types.len());
    let mut cursor = 0;
    for ty in types {
        let value = if ty.is_dynamic() {
            let offset = read_offset(data, cursor)?;
            decode_single(ty, data, offset)?
        } else {
            decode_single(ty, data, cursor)?
        };
        cursor += ty.head_size();
        values.push(value);
    }
    Ok(values)
}

fn decode_single(ty: &AbiType, data: &[u8], at: usize) -> Result<AbiValue, String> {
    let value = match ty {
        AbiType::Address => {
            let word = read_word(data, at)?;
            AbiValue::Address(Address::from_slice(&word[12..]))
        }
        AbiType::Bool => match read_uint(data, at)? {
            v if v == U256::ZERO => AbiValue::Bool(false),
            v if v == U256::from(1u8) => AbiValue::Bool(true),
            v => return Err(format!("invalid bool word {}", v)),
        },
        AbiType::Uint(bits) => {
            let v = read_uint(data, at)?;
            if v.bit_len() > *bits {
                return Err(format!("value {} overflows uint{}", v, bits));
            }
            AbiValue::Uint(v)
        }
        AbiType::Int(_) => AbiValue::Int(I256::from_raw(read_uint(data, at)?)),
        AbiType::FixedBytes(len) => {
            let word = read_word(data, at)?;
            AbiValue::FixedBytes(word[..*len].to_vec())
        }
        AbiType::Bytes => AbiValue::Bytes(read_packed_bytes(data, at)?.to_vec()),
        AbiType::String => {
            let raw = read_packed_bytes(data, at)?;
            AbiValue::String(
                String::from_utf8(raw.to_vec()).map_err(|e| format!("invalid utf-8: {}", e))?,
            )
        }
        AbiType::Array(inner) => {
            let len = read_offset(data, at)?;
            let frame = &data[at + WORD..];
            // every element needs at least one head word
            if len > frame.len() / WORD {
                return Err(format!("array length {} exceeds return data", len));
            }
            let types = vec![(**inner).clone(); len];
            AbiValue::Array(decode_params(&types, frame)?)
        }
        AbiType::FixedArray(inner, len) => {
            let types = vec![(**inner).clone(); *len];
            AbiValue::FixedArray(decode_params(&types, slice_from(data, at)?)?)
        }
        AbiType::Tuple(types) => AbiValue::Tuple(decode_params(types, slice_from(data, at)?)?),
    };
    Ok(value)
}

fn slice_from(data: &[u8], at: usize) -> Result<&[u8], String> {
    data.get(at..)
        .ok_or_else(|| format!("offset {} beyond return data of {} bytes", at, data.len()))
}

fn read_word(data: &[u8], at: usize) -> Result<&[u8], String> {
    at.checked_add(WORD)
        .and_then(|end| data.get(at..end))
        .ok_or_else(|| {
            format!(
                "return data too short: need word at {}, have {} bytes",
                at,
                data.len()
            )
        })
}

fn read_uint(data: &[u8], at: usize) -> Result<U256, String> {
    Ok(U256::from_be_slice(read_word(data, at)?))
}

/// Reads a word that must be a usable offset or length into `data`.
fn read_offset(data: &[u8], at: usize) -> Result<usize, String> {
    let v = read_uint(data, at)?;
    if v.bit_len() > 64 {
        return Err(format!("offset {} does not fit in memory", v));
    }
    let n = v.as_limbs()[0] as usize;
    if n > data.len() {
        return Err(format!(
            "offset {} beyond return data of {} bytes",
            n,
            data.len()
        ));
    }
    Ok(n)
}

fn read_packed_bytes(data: &[u8], at: usize) -> Result<&[u8], String> {
    let len = read_offset(data, at)?;
    let start = at + WORD;
    data.get(start..start + len)
        .ok_or_else(|| format!("byte string of {} bytes exceeds return data", len))
}
