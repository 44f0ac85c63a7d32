/// Contract ABI loaded from a Solidity JSON ABI document
use super::codec::{decode_params, encode_params};
use super::types::{AbiType, AbiValue};
use crate::error::{GovError, Result};
use alloy_primitives::keccak256;
use serde::Deserialize;
use std::collections::BTreeMap;

/// Length of a function selector.
pub const SELECTOR_LEN: usize = 4;

#[derive(Debug, Clone, Deserialize)]
struct RawParam {
    #[serde(default)]
    name: String,
    #[serde(rename = "type")]
    ty: String,
    #[serde(default)]
    components: Vec<RawParam>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawItem {
    #[serde(rename = "type", default = "default_item_type")]
    kind: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    inputs: Vec<RawParam>,
    #[serde(default)]
    outputs: Vec<RawParam>,
    #[serde(default)]
    state_mutability: Option<String>,
}

fn default_item_type() -> String {
    "function".to_string()
}

/// A named, typed function parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub name: String,
    pub ty: AbiType,
    /// Field names of a tuple (or tuple array) parameter, in order.
    pub component_names: Vec<String>,
}

impl Param {
    fn from_raw(raw: &RawParam) -> std::result::Result<Self, String> {
        let components = raw
            .components
            .iter()
            .map(Param::from_raw)
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let component_types: Vec<AbiType> = components.iter().map(|c| c.ty.clone()).collect();
        Ok(Param {
            name: raw.name.clone(),
            ty: AbiType::parse(&raw.ty, &component_types)?,
            component_names: components.into_iter().map(|c| c.name).collect(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Function {
    pub name: String,
    pub inputs: Vec<Param>,
    pub outputs: Vec<Param>,
    pub state_mutability: String,
    pub selector: [u8; SELECTOR_LEN],
}

impl Function {
    /// `name(type1,type2,...)` as hashed into the selector.
    pub fn signature(&self) -> String {
        let types: Vec<String> = self.inputs.iter().map(|p| p.ty.canonical()).collect();
        format!("{}({})", self.name, types.join(","))
    }

    pub fn input_types(&self) -> Vec<AbiType> {
        self.inputs.iter().map(|p| p.ty.clone()).collect()
    }

    pub fn output_types(&self) -> Vec<AbiType> {
        self.outputs.iter().map(|p| p.ty.clone()).collect()
    }

    pub fn is_view(&self) -> bool {
        matches!(self.state_mutability.as_str(), "view" | "pure")
    }
}

/// First four bytes of the keccak256 hash of a function signature.
pub fn function_selector(signature: &str) -> [u8; SELECTOR_LEN] {
    let hash = keccak256(signature.as_bytes());
    let mut selector = [0u8; SELECTOR_LEN];
    selector.copy_from_slice(&hash[..SELECTOR_LEN]);
    selector
}

/// The function table of one contract, keyed by method name.
#[derive(Debug, Clone)]
pub struct ContractAbi {
    name: String,
    functions: BTreeMap<String, Function>,
}

impl ContractAbi {
    /// Parses a JSON ABI document. Only `function` entries are kept;
    /// overloaded names are rejected since lookups are by name.
    pub fn from_json(name: &str, json: &str) -> Result<Self> {
        let items: Vec<RawItem> = serde_json::from_str(json)
            .map_err(|e| GovError::Schema(format!("{}: {}", name, e)))?;

        let mut functions = BTreeMap::new();
        for item in items.iter().filter(|item| item.kind == "function") {
            let parse = |params: &[RawParam]| {
                params
                    .iter()
                    .map(Param::from_raw)
                    .collect::<std::result::Result<Vec<_>, _>>()
                    .map_err(|e| GovError::Schema(format!("{}.{}: {}", name, item.name, e)))
            };
            let mut function = Function {
                name: item.name.clone(),
                inputs: parse(&item.inputs)?,
                outputs: parse(&item.outputs)?,
                state_mutability: item
                    .state_mutability
                    .clone()
                    .unwrap_or_else(|| "nonpayable".to_string()),
                selector: [0u8; SELECTOR_LEN],
            };
            function.selector = function_selector(&function.signature());
            if functions.insert(item.name.clone(), function).is_some() {
                return Err(GovError::Schema(format!(
                    "{}: overloaded method {} is not supported",
                    name, item.name
                )));
            }
        }

        Ok(ContractAbi {
            name: name.to_string(),
            functions,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn function(&self, method: &str) -> Option<&Function> {
        self.functions.get(method)
    }

    pub fn functions(&self) -> impl Iterator<Item = &Function> {
        self.functions.values()
    }

    /// Finds the function a calldata blob is addressed to.
    pub fn function_by_selector(&self, calldata: &[u8]) -> Option<&Function> {
        let selector = calldata.get(..SELECTOR_LEN)?;
        self.functions.values().find(|f| f.selector == selector)
    }

    /// Selector followed by the ABI-encoded arguments.
    pub fn pack(&self, method: &str, args: &[AbiValue]) -> Result<Vec<u8>> {
        let function = self
            .function(method)
            .ok_or_else(|| GovError::pack(method, format!("method not found in {}", self.name)))?;
        if args.len() != function.inputs.len() {
            return Err(GovError::pack(
                method,
                format!(
                    "argument count mismatch: got {} for {}",
                    args.len(),
                    function.inputs.len()
                ),
            ));
        }
        for (param, arg) in function.inputs.iter().zip(args) {
            arg.type_check(&param.ty)
                .map_err(|e| GovError::pack(method, format!("argument {}: {}", param.name, e)))?;
        }

        let encoded = encode_params(&function.input_types(), args)
            .map_err(|e| GovError::pack(method, e))?;
        let mut data = Vec::with_capacity(SELECTOR_LEN + encoded.len());
        data.extend_from_slice(&function.selector);
        data.extend(encoded);
        Ok(data)
    }

    /// Decodes the return data of `method` according to its declared outputs.
    pub fn unpack(&self, method: &str, data: &[u8]) -> Result<Vec<AbiValue>> {
        let function = self
            .function(method)
            .ok_or_else(|| GovError::unpack(method, format!("method not found in {}", self.name)))?;
        if data.is_empty() && !function.outputs.is_empty() {
            return Err(GovError::unpack(
                method,
                "attempting to unmarshal an empty string while arguments are expected",
            ));
        }
        decode_params(&function.output_types(), data).map_err(|e| GovError::unpack(method, e))
    }

    /// Decodes calldata addressed to `method` back into its arguments.
    pub fn unpack_input(&self, method: &str, calldata: &[u8]) -> Result<Vec<AbiValue>> {
        let function = self
            .function(method)
            .ok_or_else(|| GovError::unpack(method, format!("method not found in {}", self.name)))?;
        match calldata.get(..SELECTOR_LEN) {
            Some(selector) if selector == function.selector => {}
            _ => return Err(GovError::unpack(method, "selector mismatch")),
        }
        decode_params(&function.input_types(), &calldata[SELECTOR_LEN..])
            .map_err(|e| GovError::unpack(method, e))
    }

    /// Encodes return values for `method`. Used to script contract responses.
    pub fn pack_output(&self, method: &str, values: &[AbiValue]) -> Result<Vec<u8>> {
        let function = self
            .function(method)
            .ok_or_else(|| GovError::pack(method, format!("method not found in {}", self.name)))?;
        encode_params(&function.output_types(), values).map_err(|e| GovError::pack(method, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::U256;

    const SAMPLE: &str = r#"[
        {"type":"function","name":"transfer","stateMutability":"nonpayable",
         "inputs":[{"name":"to","type":"address"},{"name":"amount","type":"uint256"}],
         "outputs":[{"name":"","type":"bool"}]},
        {"type":"function","name":"balanceOf","stateMutability":"view",
         "inputs":[{"name":"owner","type":"address"}],
         "outputs":[{"name":"","type":"uint256"}]},
        {"type":"event","name":"Transfer","inputs":[]}
    ]"#;

    #[test]
    fn test_well_known_selectors() {
        let abi = ContractAbi::from_json("erc20", SAMPLE).unwrap();
        assert_eq!(abi.function("transfer").unwrap().selector, [0xa9, 0x05, 0x9c, 0xbb]);
        assert_eq!(abi.function("balanceOf").unwrap().selector, [0x70, 0xa0, 0x82, 0x31]);
        assert!(abi.function("Transfer").is_none());
        assert!(abi.function("balanceOf").unwrap().is_view());
    }

    #[test]
    fn test_pack_arity_and_type_errors() {
        let abi = ContractAbi::from_json("erc20", SAMPLE).unwrap();

        let err = abi.pack("transfer", &[AbiValue::Uint(U256::ZERO)]).unwrap_err();
        assert!(matches!(err, GovError::Pack { ref method, .. } if method == "transfer"));

        let err = abi
            .pack("balanceOf", &[AbiValue::String("nope".into())])
            .unwrap_err();
        assert!(err.to_string().contains("cannot use string as address"));

        let err = abi.pack("mint", &[]).unwrap_err();
        assert!(err.to_string().contains("method not found"));
    }

    #[test]
    fn test_unpack_wrong_shape() {
        let abi = ContractAbi::from_json("erc20", SAMPLE).unwrap();
        let err = abi.unpack("balanceOf", &[]).unwrap_err();
        assert!(matches!(err, GovError::Unpack { .. }));
        let err = abi.unpack("balanceOf", &[1u8; 8]).unwrap_err();
        assert!(matches!(err, GovError::Unpack { .. }));
    }

    #[test]
    fn test_overloads_rejected() {
        let json = r#"[
            {"type":"function","name":"f","inputs":[],"outputs":[]},
            {"type":"function","name":"f","inputs":[{"name":"a","type":"uint8"}],"outputs":[]}
        ]"#;
        assert!(matches!(
            ContractAbi::from_json("overloads", json),
            Err(GovError::Schema(_))
        ));
    }

    #[test]
    fn test_unsupported_type_rejected() {
        let json = r#"[{"type":"function","name":"f","inputs":[{"name":"a","type":"fixed128x18"}],"outputs":[]}]"#;
        assert!(matches!(
            ContractAbi::from_json("fixed", json),
            Err(GovError::Schema(_))
        ));
    }

    #[test]
    fn test_tuple_component_names() {
        let json = r#"[{"type":"function","name":"all","inputs":[],
            "outputs":[{"name":"","type":"tuple[]","components":[
                {"name":"id","type":"bytes4"},{"name":"owner","type":"address"}]}]}]"#;
        let abi = ContractAbi::from_json("tuples", json).unwrap();
        let output = &abi.function("all").unwrap().outputs[0];
        assert_eq!(output.component_names, vec!["id", "owner"]);
        assert_eq!(output.ty.canonical(), "(bytes4,address)[]");
    }
}
