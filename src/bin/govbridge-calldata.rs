#![forbid(unsafe_code)]
//! Offline calldata tool for the governance system contracts

use clap::{Parser, Subcommand};
use govbridge::abi::AbiValue;
use govbridge::systemcontract::SystemContract;
use govbridge::types::{decode_prefixed_hex, ProposalId};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Lists a contract's methods with their selectors
    Selectors {
        /// validators, proposals, node_votes or system_rewards
        contract: String,
    },
    /// Encodes a method call
    Encode {
        contract: String,
        method: String,
        /// Arguments in declaration order; arrays and tuples as JSON
        args: Vec<String>,
    },
    /// Decodes calldata back into method and arguments
    Decode {
        contract: String,
        /// 0x-prefixed calldata
        calldata: String,
    },
    /// Prints the canonical 4-byte form of a proposal id
    DecodeId { id: String },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    govbridge::telemetry::init_tracing("warn");

    match &cli.command {
        Commands::Selectors { contract } => selectors(contract)?,
        Commands::Encode {
            contract,
            method,
            args,
        } => encode(contract, method, args)?,
        Commands::Decode { contract, calldata } => decode(contract, calldata)?,
        Commands::DecodeId { id } => {
            let id = ProposalId::from_hex(id)?;
            println!("{}", id);
        }
    }

    Ok(())
}

fn lookup(name: &str) -> Result<SystemContract, Box<dyn std::error::Error>> {
    SystemContract::from_name(name).ok_or_else(|| {
        let known: Vec<&str> = SystemContract::ALL.iter().map(|c| c.name()).collect();
        format!("unknown contract {} (known: {})", name, known.join(", ")).into()
    })
}

fn selectors(contract: &str) -> Result<(), Box<dyn std::error::Error>> {
    let contract = lookup(contract)?;
    println!("{} @ {}", contract, contract.address());
    for function in contract.abi()?.functions() {
        println!(
            "0x{}  {}{}",
            hex::encode(function.selector),
            function.signature(),
            if function.is_view() { "  [view]" } else { "" }
        );
    }
    Ok(())
}

fn encode(contract: &str, method: &str, args: &[String]) -> Result<(), Box<dyn std::error::Error>> {
    let contract = lookup(contract)?;
    let abi = contract.abi()?;
    let function = abi
        .function(method)
        .ok_or_else(|| format!("{} has no method {}", contract, method))?;
    if args.len() != function.inputs.len() {
        return Err(format!(
            "{} takes {} arguments, got {}",
            function.signature(),
            function.inputs.len(),
            args.len()
        )
        .into());
    }
    let values = function
        .inputs
        .iter()
        .zip(args)
        .map(|(param, arg)| {
            AbiValue::parse_arg(&param.ty, arg)
                .map_err(|e| format!("argument {}: {}", param.name, e))
        })
        .collect::<Result<Vec<_>, _>>()?;
    let data = contract.pack(method, &values)?;
    println!("0x{}", hex::encode(data));
    Ok(())
}

fn decode(contract: &str, calldata: &str) -> Result<(), Box<dyn std::error::Error>> {
    let contract = lookup(contract)?;
    let abi = contract.abi()?;
    let data = decode_prefixed_hex(calldata)?;
    let function = abi
        .function_by_selector(&data)
        .ok_or_else(|| format!("no {} method matches this selector", contract))?;
    let values = abi.unpack_input(&function.name, &data)?;
    let args: Vec<serde_json::Value> = function
        .inputs
        .iter()
        .zip(&values)
        .map(|(param, value)| serde_json::json!({ "name": param.name, "value": value.to_json() }))
        .collect();
    println!(
        "{}",
        serde_json::to_string_pretty(&serde_json::json!({
            "method": function.signature(),
            "args": args,
        }))?
    );
    Ok(())
}
