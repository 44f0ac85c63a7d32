/// ABI type model and the dynamic value representation used by the codec
use alloy_primitives::{Address, I256, U256};
use serde_json::Value;
use std::fmt;

/// One Solidity ABI type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbiType {
    Address,
    Bool,
    Uint(usize),
    Int(usize),
    FixedBytes(usize),
    Bytes,
    String,
    Array(Box<AbiType>),
    FixedArray(Box<AbiType>, usize),
    Tuple(Vec<AbiType>),
}

impl AbiType {
    /// Parses a JSON-ABI `type` string. `components` are only consulted for
    /// `tuple` (and arrays of tuples).
    pub fn parse(ty: &str, components: &[AbiType]) -> Result<AbiType, String> {
        if let Some(stripped) = ty.strip_suffix(']') {
            let open = stripped
                .rfind('[')
                .ok_or_else(|| format!("unbalanced array type {}", ty))?;
            let inner = AbiType::parse(&stripped[..open], components)?;
            let dim = &stripped[open + 1..];
            if dim.is_empty() {
                return Ok(AbiType::Array(Box::new(inner)));
            }
            let len = dim
                .parse::<usize>()
                .map_err(|_| format!("invalid array length in {}", ty))?;
            return Ok(AbiType::FixedArray(Box::new(inner), len));
        }

        match ty {
            "address" => Ok(AbiType::Address),
            "bool" => Ok(AbiType::Bool),
            "string" => Ok(AbiType::String),
            "bytes" => Ok(AbiType::Bytes),
            "uint" => Ok(AbiType::Uint(256)),
            "int" => Ok(AbiType::Int(256)),
            "tuple" => {
                if components.is_empty() {
                    return Err("tuple without components".to_string());
                }
                Ok(AbiType::Tuple(components.to_vec()))
            }
            _ => {
                if let Some(bits) = ty.strip_prefix("uint") {
                    return parse_int_width(ty, bits).map(AbiType::Uint);
                }
                if let Some(bits) = ty.strip_prefix("int") {
                    return parse_int_width(ty, bits).map(AbiType::Int);
                }
                if let Some(len) = ty.strip_prefix("bytes") {
                    let len = len
                        .parse::<usize>()
                        .map_err(|_| format!("unsupported abi type {}", ty))?;
                    if len == 0 || len > 32 {
                        return Err(format!("invalid fixed bytes length in {}", ty));
                    }
                    return Ok(AbiType::FixedBytes(len));
                }
                Err(format!("unsupported abi type {}", ty))
            }
        }
    }

    /// Canonical form used in function signatures.
    pub fn canonical(&self) -> String {
        match self {
            AbiType::Address => "address".to_string(),
            AbiType::Bool => "bool".to_string(),
            AbiType::Uint(bits) => format!("uint{}", bits),
            AbiType::Int(bits) => format!("int{}", bits),
            AbiType::FixedBytes(len) => format!("bytes{}", len),
            AbiType::Bytes => "bytes".to_string(),
            AbiType::String => "string".to_string(),
            AbiType::Array(inner) => format!("{}[]", inner.canonical()),
            AbiType::FixedArray(inner, len) => format!("{}[{}]", inner.canonical(), len),
            AbiType::Tuple(items) => {
                let inner: Vec<String> = items.iter().map(AbiType::canonical).collect();
                format!("({})", inner.join(","))
            }
        }
    }

    pub fn is_dynamic(&self) -> bool {
        match self {
            AbiType::Bytes | AbiType::String | AbiType::Array(_) => true,
            AbiType::FixedArray(inner, _) => inner.is_dynamic(),
            AbiType::Tuple(items) => items.iter().any(AbiType::is_dynamic),
            _ => false,
        }
    }

    /// Bytes this type occupies in the head of an enclosing tuple.
    pub fn head_size(&self) -> usize {
        if self.is_dynamic() {
            return 32;
        }
        match self {
            AbiType::FixedArray(inner, len) => inner.head_size() * len,
            AbiType::Tuple(items) => items.iter().map(AbiType::head_size).sum(),
            _ => 32,
        }
    }
}

impl fmt::Display for AbiType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.canonical())
    }
}

fn parse_int_width(ty: &str, bits: &str) -> Result<usize, String> {
    let bits = bits
        .parse::<usize>()
        .map_err(|_| format!("unsupported abi type {}", ty))?;
    if bits == 0 || bits > 256 || bits % 8 != 0 {
        return Err(format!("invalid integer width in {}", ty));
    }
    Ok(bits)
}

/// A decoded (or to-be-encoded) ABI value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbiValue {
    Address(Address),
    Bool(bool),
    Uint(U256),
    Int(I256),
    FixedBytes(Vec<u8>),
    Bytes(Vec<u8>),
    String(String),
    Array(Vec<AbiValue>),
    FixedArray(Vec<AbiValue>),
    Tuple(Vec<AbiValue>),
}

impl AbiValue {
    /// Checks that this value can be encoded as `ty`.
    pub fn type_check(&self, ty: &AbiType) -> Result<(), String> {
        match (self, ty) {
            (AbiValue::Address(_), AbiType::Address) => Ok(()),
            (AbiValue::Bool(_), AbiType::Bool) => Ok(()),
            (AbiValue::Uint(v), AbiType::Uint(bits)) => {
                if v.bit_len() > *bits {
                    return Err(format!("value {} overflows uint{}", v, bits));
                }
                Ok(())
            }
            (AbiValue::Int(v), AbiType::Int(bits)) => {
                if *bits < 256 {
                    let limit = U256::from(1u8) << (*bits - 1);
                    let raw = v.into_raw();
                    let magnitude = if v.is_negative() { !raw } else { raw };
                    if magnitude >= limit {
                        return Err(format!("value {} overflows int{}", v, bits));
                    }
                }
                Ok(())
            }
            (AbiValue::FixedBytes(b), AbiType::FixedBytes(len)) => {
                if b.len() != *len {
                    return Err(format!("expected bytes{}, got {} bytes", len, b.len()));
                }
                Ok(())
            }
            (AbiValue::Bytes(_), AbiType::Bytes) => Ok(()),
            (AbiValue::String(_), AbiType::String) => Ok(()),
            (AbiValue::Array(items), AbiType::Array(inner)) => {
                items.iter().try_for_each(|item| item.type_check(inner))
            }
            (AbiValue::FixedArray(items), AbiType::FixedArray(inner, len)) => {
                if items.len() != *len {
                    return Err(format!("expected {} elements, got {}", len, items.len()));
                }
                items.iter().try_for_each(|item| item.type_check(inner))
            }
            (AbiValue::Tuple(items), AbiType::Tuple(types)) => {
                if items.len() != types.len() {
                    return Err(format!(
                        "expected tuple of {} fields, got {}",
                        types.len(),
                        items.len()
                    ));
                }
                items
                    .iter()
                    .zip(types)
                    .try_for_each(|(item, ty)| item.type_check(ty))
            }
            (value, ty) => Err(format!("cannot use {} as {}", value.kind(), ty)),
        }
    }

    /// Short name of the value's variant for error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            AbiValue::Address(_) => "address",
            AbiValue::Bool(_) => "bool",
            AbiValue::Uint(_) => "uint",
            AbiValue::Int(_) => "int",
            AbiValue::FixedBytes(_) => "fixed bytes",
            AbiValue::Bytes(_) => "bytes",
            AbiValue::String(_) => "string",
            AbiValue::Array(_) => "array",
            AbiValue::FixedArray(_) => "fixed array",
            AbiValue::Tuple(_) => "tuple",
        }
    }

    /// Parses a command-line argument for `ty`. Scalars are given verbatim,
    /// arrays and tuples as JSON.
    pub fn parse_arg(ty: &AbiType, arg: &str) -> Result<AbiValue, String> {
        match ty {
            AbiType::Array(_) | AbiType::FixedArray(..) | AbiType::Tuple(_) => {
                let json: Value = serde_json::from_str(arg)
                    .map_err(|e| format!("argument {} is not valid JSON: {}", arg, e))?;
                AbiValue::from_json(ty, &json)
            }
            _ => AbiValue::from_json(ty, &Value::String(arg.to_string())),
        }
    }

    /// Builds a value of type `ty` from its JSON form. Integers may be JSON
    /// numbers, decimal strings or `0x` hex strings.
    pub fn from_json(ty: &AbiType, json: &Value) -> Result<AbiValue, String> {
        let value = match ty {
            AbiType::Address => {
                let s = json_str(json)?;
                AbiValue::Address(
                    s.parse::<Address>()
                        .map_err(|e| format!("invalid address {}: {}", s, e))?,
                )
            }
            AbiType::Bool => match json {
                Value::Bool(b) => AbiValue::Bool(*b),
                Value::String(s) if s == "true" => AbiValue::Bool(true),
                Value::String(s) if s == "false" => AbiValue::Bool(false),
                other => return Err(format!("invalid bool {}", other)),
            },
            AbiType::Uint(_) => AbiValue::Uint(json_uint(json)?),
            AbiType::Int(_) => {
                let s = match json {
                    Value::Number(n) => n.to_string(),
                    Value::String(s) => s.clone(),
                    other => return Err(format!("invalid integer {}", other)),
                };
                AbiValue::Int(
                    s.parse::<I256>()
                        .map_err(|e| format!("invalid integer {}: {}", s, e))?,
                )
            }
            AbiType::FixedBytes(_) => AbiValue::FixedBytes(json_hex(json)?),
            AbiType::Bytes => AbiValue::Bytes(json_hex(json)?),
            AbiType::String => AbiValue::String(json_str(json)?.to_string()),
            AbiType::Array(inner) => AbiValue::Array(
                json_array(json)?
                    .iter()
                    .map(|item| AbiValue::from_json(inner, item))
                    .collect::<Result<_, _>>()?,
            ),
            AbiType::FixedArray(inner, _) => AbiValue::FixedArray(
                json_array(json)?
                    .iter()
                    .map(|item| AbiValue::from_json(inner, item))
                    .collect::<Result<_, _>>()?,
            ),
            AbiType::Tuple(types) => {
                let items = json_array(json)?;
                if items.len() != types.len() {
                    return Err(format!(
                        "expected tuple of {} fields, got {}",
                        types.len(),
                        items.len()
                    ));
                }
                AbiValue::Tuple(
                    types
                        .iter()
                        .zip(items)
                        .map(|(ty, item)| AbiValue::from_json(ty, item))
                        .collect::<Result<_, _>>()?,
                )
            }
        };
        value.type_check(ty)?;
        Ok(value)
    }

    /// JSON rendering: integers as decimal strings, byte strings as `0x` hex.
    pub fn to_json(&self) -> Value {
        match self {
            AbiValue::Address(a) => Value::String(a.to_checksum(None)),
            AbiValue::Bool(b) => Value::Bool(*b),
            AbiValue::Uint(v) => Value::String(v.to_string()),
            AbiValue::Int(v) => Value::String(v.to_string()),
            AbiValue::FixedBytes(b) | AbiValue::Bytes(b) => {
                Value::String(format!("0x{}", hex::encode(b)))
            }
            AbiValue::String(s) => Value::String(s.clone()),
            AbiValue::Array(items) | AbiValue::FixedArray(items) | AbiValue::Tuple(items) => {
                Value::Array(items.iter().map(AbiValue::to_json).collect())
            }
        }
    }
}

impl From<Address> for AbiValue {
    fn from(addr: Address) -> Self {
        AbiValue::Address(addr)
    }
}

impl From<U256> for AbiValue {
    fn from(v: U256) -> Self {
        AbiValue::Uint(v)
    }
}

impl From<u8> for AbiValue {
    fn from(v: u8) -> Self {
        AbiValue::Uint(U256::from(v))
    }
}

impl From<&str> for AbiValue {
    fn from(s: &str) -> Self {
        AbiValue::String(s.to_string())
    }
}

impl From<String> for AbiValue {
    fn from(s: String) -> Self {
        AbiValue::String(s)
    }
}

fn json_str(json: &Value) -> Result<&str, String> {
    json.as_str()
        .ok_or_else(|| format!("expected a string, got {}", json))
}

fn json_array(json: &Value) -> Result<&Vec<Value>, String> {
    json.as_array()
        .ok_or_else(|| format!("expected an array, got {}", json))
}

fn json_hex(json: &Value) -> Result<Vec<u8>, String> {
    crate::types::decode_prefixed_hex(json_str(json)?)
}

fn json_uint(json: &Value) -> Result<U256, String> {
    match json {
        Value::Number(n) => n
            .as_u64()
            .map(U256::from)
            .ok_or_else(|| format!("invalid unsigned integer {}", n)),
        Value::String(s) => {
            let parsed = match s.strip_prefix("0x") {
                Some(digits) => U256::from_str_radix(digits, 16),
                None => U256::from_str_radix(s, 10),
            };
            parsed.map_err(|e| format!("invalid unsigned integer {}: {}", s, e))
        }
        other => Err(format!("invalid unsigned integer {}", other)),
    }
}
