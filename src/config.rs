//! Configuration management for govbridge

use crate::error::{GovError, Result};
use crate::rpc::TxDefaults;
use alloy_primitives::U256;
use serde::Deserialize;
use std::fs;
use std::io::ErrorKind;
use std::net::{IpAddr, SocketAddr};
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub rpc: RpcConfig,
    #[serde(default)]
    pub transactions: TransactionsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RpcConfig {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: IpAddr,
    #[serde(default = "default_rpc_port")]
    pub port: u16,
    /// Origins browsers may call from. Empty disables cross-origin access.
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            port: default_rpc_port(),
            cors_origins: Vec::new(),
        }
    }
}

impl RpcConfig {
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.listen_addr, self.port)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TransactionsConfig {
    #[serde(default = "default_gas")]
    pub default_gas: u64,
    #[serde(default = "default_gas_cap")]
    pub gas_cap: u64,
    /// Priority fee in wei when the gas oracle has no suggestion.
    #[serde(default = "default_tip")]
    pub default_tip: u64,
}

impl Default for TransactionsConfig {
    fn default() -> Self {
        Self {
            default_gas: default_gas(),
            gas_cap: default_gas_cap(),
            default_tip: default_tip(),
        }
    }
}

impl TransactionsConfig {
    pub fn tx_defaults(&self) -> TxDefaults {
        TxDefaults {
            default_gas: self.default_gas,
            gas_cap: self.gas_cap,
            default_tip: U256::from(self.default_tip),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// `tracing-subscriber` filter directive.
    #[serde(default = "default_filter")]
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_filter(),
        }
    }
}

fn default_listen_addr() -> IpAddr {
    IpAddr::from([127, 0, 0, 1])
}

fn default_rpc_port() -> u16 {
    8645
}

fn default_gas() -> u64 {
    3_000_000
}

fn default_gas_cap() -> u64 {
    50_000_000
}

fn default_tip() -> u64 {
    1_000_000_000
}

fn default_filter() -> String {
    "info".to_string()
}

impl Config {
    /// Loads `path`, falling back to defaults when the file does not exist.
    pub fn load(path: impl AsRef<Path>) -> Result<Config> {
        let config = match fs::read_to_string(path.as_ref()) {
            Ok(raw) => Config::from_toml(&raw)?,
            Err(e) if e.kind() == ErrorKind::NotFound => Config::default(),
            Err(e) => return Err(e.into()),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(raw: &str) -> Result<Config> {
        Ok(toml::from_str(raw)?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.rpc.port == 0 {
            return Err(GovError::Config("rpc.port must be non-zero".to_string()));
        }
        if self.transactions.default_gas > self.transactions.gas_cap {
            return Err(GovError::Config(format!(
                "transactions.default_gas ({}) exceeds transactions.gas_cap ({})",
                self.transactions.default_gas, self.transactions.gas_cap
            )));
        }
        if self.logging.filter.trim().is_empty() {
            return Err(GovError::Config("logging.filter must be set".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.rpc.socket_addr().to_string(), "127.0.0.1:8645");
        assert_eq!(config.transactions.default_gas, 3_000_000);
        assert_eq!(config.logging.filter, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let config = Config::from_toml("[rpc]\nport = 9000\n").unwrap();
        assert_eq!(config.rpc.port, 9000);
        assert_eq!(config.transactions, TransactionsConfig::default());
    }

    #[test]
    fn test_validation_failures() {
        let config = Config::from_toml("[rpc]\nport = 0\n").unwrap();
        assert!(matches!(config.validate(), Err(GovError::Config(_))));

        let config =
            Config::from_toml("[transactions]\ndefault_gas = 10\ngas_cap = 5\n").unwrap();
        assert!(config.validate().unwrap_err().to_string().contains("gas_cap"));
    }

    #[test]
    fn test_malformed_toml() {
        assert!(matches!(
            Config::from_toml("[rpc\nport = 1"),
            Err(GovError::Config(_))
        ));
    }
}
