use eyre::{eyre, Result, WrapErr};
use std::env;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use crate::decimals;

/// Main configuration for the bridge service
#[derive(Debug, Clone)]
pub struct Config {
    pub network: SuiNetwork,
    pub database: DatabaseConfig,
    pub eth: EthConfig,
    pub sui: SuiConfig,
    pub server: ServerConfig,
}

/// Database configuration
#[derive(Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

/// Custom Debug that redacts the database URL (may contain credentials).
impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("url", &"<redacted>")
            .finish()
    }
}

/// Ethereum configuration
#[derive(Clone)]
pub struct EthConfig {
    pub rpc_url: String,
    pub private_key: String,
    /// Bridged token contract exposing `mint`/`burn`
    pub contract_address: String,
    pub confirmation_timeout_secs: u64,
    pub decimals: u8,
}

/// Custom Debug that redacts private_key to prevent accidental log leakage.
impl fmt::Debug for EthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EthConfig")
            .field("rpc_url", &self.rpc_url)
            .field("private_key", &"<redacted>")
            .field("contract_address", &self.contract_address)
            .field("confirmation_timeout_secs", &self.confirmation_timeout_secs)
            .field("decimals", &self.decimals)
            .finish()
    }
}

impl EthConfig {
    pub fn confirmation_timeout(&self) -> Duration {
        Duration::from_secs(self.confirmation_timeout_secs)
    }
}

/// Sui configuration
#[derive(Clone)]
pub struct SuiConfig {
    pub rpc_url: String,
    /// Hex-encoded ed25519 secret key
    pub private_key_hex: String,
    pub package_id: String,
    pub module_name: String,
    pub treasury_cap_id: String,
    pub minter_cap_id: String,
    /// Full coin type of the bridged token
    pub coin_type: String,
    pub gas_budget: u64,
    pub decimals: u8,
}

/// Custom Debug that redacts private_key_hex to prevent accidental log leakage.
impl fmt::Debug for SuiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SuiConfig")
            .field("rpc_url", &self.rpc_url)
            .field("private_key_hex", &"<redacted>")
            .field("package_id", &self.package_id)
            .field("module_name", &self.module_name)
            .field("treasury_cap_id", &self.treasury_cap_id)
            .field("minter_cap_id", &self.minter_cap_id)
            .field("coin_type", &self.coin_type)
            .field("gas_budget", &self.gas_budget)
            .field("decimals", &self.decimals)
            .finish()
    }
}

impl SuiConfig {
    /// Authority objects every mint and burn references
    pub fn authority_object_ids(&self) -> Vec<String> {
        vec![self.treasury_cap_id.clone(), self.minter_cap_id.clone()]
    }
}

/// HTTP server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
}

/// Sui network selector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuiNetwork {
    Mainnet,
    Testnet,
    Devnet,
    Localnet,
}

impl SuiNetwork {
    /// Public fullnode URL for the network
    pub fn fullnode_url(&self) -> &'static str {
        match self {
            SuiNetwork::Mainnet => "https://fullnode.mainnet.sui.io:443",
            SuiNetwork::Testnet => "https://fullnode.testnet.sui.io:443",
            SuiNetwork::Devnet => "https://fullnode.devnet.sui.io:443",
            SuiNetwork::Localnet => "http://127.0.0.1:9000",
        }
    }
}

impl FromStr for SuiNetwork {
    type Err = eyre::Report;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mainnet" => Ok(SuiNetwork::Mainnet),
            "testnet" => Ok(SuiNetwork::Testnet),
            "devnet" => Ok(SuiNetwork::Devnet),
            "localnet" => Ok(SuiNetwork::Localnet),
            other => Err(eyre!(
                "NETWORK must be one of mainnet, testnet, devnet, localnet (got {})",
                other
            )),
        }
    }
}

/// Default functions
fn default_confirmation_timeout() -> u64 {
    60
}

fn default_gas_budget() -> u64 {
    20_000_000
}

fn default_port() -> u16 {
    5000
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

/// Variables that must be present for the service to start
const REQUIRED_ENV_VARS: &[&str] = &[
    "NETWORK",
    "DATABASE_URL",
    "ETH_RPC_URL",
    "ETH_PRIVATE_KEY",
    "ETH_CONTRACT_ADDRESS",
    "SUI_PRIVATE_KEY_HEX",
    "SUI_CONTRACT_PACKAGE_ID",
    "SUI_MODULE_NAME",
    "SUI_TREASURY_CAP_ID",
    "SUI_MINTER_CAP_ID",
];

impl Config {
    /// Load configuration from environment variables
    /// Loads .env file if present, then reads from environment
    pub fn load() -> Result<Self> {
        Self::load_from_file(".env")
    }

    /// Load from a specific .env file path
    pub fn load_from_file(path: &str) -> Result<Self> {
        if Path::new(path).exists() {
            dotenvy::from_filename(path)
                .wrap_err_with(|| format!("Failed to load .env file from {}", path))?;
        }
        Self::load_from_env()
    }

    /// Load configuration from environment variables
    pub fn load_from_env() -> Result<Self> {
        let missing: Vec<&str> = REQUIRED_ENV_VARS
            .iter()
            .copied()
            .filter(|name| env::var(name).map(|v| v.trim().is_empty()).unwrap_or(true))
            .collect();
        if !missing.is_empty() {
            return Err(eyre!(
                "Missing required environment variables: {}",
                missing.join(", ")
            ));
        }

        let network: SuiNetwork = required("NETWORK")?.parse()?;

        let database = DatabaseConfig {
            url: required("DATABASE_URL")?,
        };

        let eth = EthConfig {
            rpc_url: required("ETH_RPC_URL")?,
            private_key: required("ETH_PRIVATE_KEY")?,
            contract_address: required("ETH_CONTRACT_ADDRESS")?,
            confirmation_timeout_secs: optional_parse("ETH_CONFIRMATION_TIMEOUT_SECS")?
                .unwrap_or(default_confirmation_timeout()),
            decimals: optional_parse("ETH_DECIMALS")?.unwrap_or(decimals::ETH_DECIMALS),
        };

        let package_id = required("SUI_CONTRACT_PACKAGE_ID")?;
        let sui = SuiConfig {
            rpc_url: env::var("SUI_RPC_URL")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| network.fullnode_url().to_string()),
            private_key_hex: required("SUI_PRIVATE_KEY_HEX")?,
            module_name: required("SUI_MODULE_NAME")?,
            treasury_cap_id: required("SUI_TREASURY_CAP_ID")?,
            minter_cap_id: required("SUI_MINTER_CAP_ID")?,
            coin_type: env::var("SUI_COIN_TYPE")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| format!("{}::token::TOKEN", package_id)),
            gas_budget: optional_parse("SUI_GAS_BUDGET")?.unwrap_or(default_gas_budget()),
            decimals: optional_parse("SUI_DECIMALS")?.unwrap_or(decimals::SUI_DECIMALS),
            package_id,
        };

        let server = ServerConfig {
            bind_address: env::var("BIND_ADDRESS").unwrap_or_else(|_| default_bind_address()),
            port: optional_parse("PORT")?.unwrap_or(default_port()),
        };

        let config = Config {
            network,
            database,
            eth,
            sui,
            server,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()> {
        if self.database.url.is_empty() {
            return Err(eyre!("database.url cannot be empty"));
        }

        if self.eth.rpc_url.is_empty() {
            return Err(eyre!("eth.rpc_url cannot be empty"));
        }

        if self.eth.contract_address.len() != 42 || !self.eth.contract_address.starts_with("0x")
        {
            return Err(eyre!(
                "eth.contract_address must be a valid hex address (42 chars with 0x prefix)"
            ));
        }

        let eth_key = self.eth.private_key.trim_start_matches("0x");
        if eth_key.len() != 64 || hex::decode(eth_key).is_err() {
            return Err(eyre!("eth.private_key must be 64 hex chars (optionally 0x-prefixed)"));
        }

        if self.eth.confirmation_timeout_secs == 0 {
            return Err(eyre!("eth.confirmation_timeout_secs must be greater than 0"));
        }

        let sui_key = self.sui.private_key_hex.trim_start_matches("0x");
        if !(sui_key.len() == 64 || sui_key.len() == 128) || hex::decode(sui_key).is_err() {
            return Err(eyre!(
                "sui.private_key_hex must be a 32-byte (or 64-byte keypair) hex string"
            ));
        }

        for (name, id) in [
            ("sui.package_id", &self.sui.package_id),
            ("sui.treasury_cap_id", &self.sui.treasury_cap_id),
            ("sui.minter_cap_id", &self.sui.minter_cap_id),
        ] {
            if !id.starts_with("0x") {
                return Err(eyre!("{} must be a 0x-prefixed object id", name));
            }
        }

        if self.sui.treasury_cap_id == self.sui.minter_cap_id {
            return Err(eyre!("sui.treasury_cap_id and sui.minter_cap_id must differ"));
        }

        if self.sui.module_name.is_empty() {
            return Err(eyre!("sui.module_name cannot be empty"));
        }

        if self.eth.decimals > decimals::MAX_DECIMALS {
            return Err(eyre!(
                "eth.decimals ({}) cannot exceed {}",
                self.eth.decimals,
                decimals::MAX_DECIMALS
            ));
        }

        if self.sui.decimals > self.eth.decimals {
            return Err(eyre!(
                "sui.decimals ({}) cannot exceed eth.decimals ({})",
                self.sui.decimals,
                self.eth.decimals
            ));
        }

        Ok(())
    }
}

fn required(name: &str) -> Result<String> {
    env::var(name).map_err(|_| eyre!("{} environment variable is required", name))
}

fn optional_parse<T>(name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(v) if !v.trim().is_empty() => v
            .trim()
            .parse()
            .map(Some)
            .wrap_err_with(|| format!("{} has an invalid value", name)),
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: &[(&str, &str)] = &[
        ("NETWORK", "testnet"),
        ("DATABASE_URL", "postgres://localhost/bridge"),
        ("ETH_RPC_URL", "http://localhost:8545"),
        (
            "ETH_PRIVATE_KEY",
            "0x0000000000000000000000000000000000000000000000000000000000000001",
        ),
        (
            "ETH_CONTRACT_ADDRESS",
            "0x0000000000000000000000000000000000000001",
        ),
        (
            "SUI_PRIVATE_KEY_HEX",
            "0101010101010101010101010101010101010101010101010101010101010101",
        ),
        ("SUI_CONTRACT_PACKAGE_ID", "0xaa"),
        ("SUI_MODULE_NAME", "bridge"),
        ("SUI_TREASURY_CAP_ID", "0xbb"),
        ("SUI_MINTER_CAP_ID", "0xcc"),
    ];

    const OPTIONAL: &[&str] = &[
        "SUI_RPC_URL",
        "SUI_COIN_TYPE",
        "SUI_GAS_BUDGET",
        "ETH_CONFIRMATION_TIMEOUT_SECS",
        "ETH_DECIMALS",
        "SUI_DECIMALS",
        "PORT",
        "BIND_ADDRESS",
    ];

    fn set_all() {
        for (k, v) in VARS {
            env::set_var(k, v);
        }
        for k in OPTIONAL {
            env::remove_var(k);
        }
    }

    #[test]
    fn test_defaults() {
        assert_eq!(default_confirmation_timeout(), 60);
        assert_eq!(default_gas_budget(), 20_000_000);
        assert_eq!(default_port(), 5000);
    }

    #[test]
    #[serial]
    fn test_load_from_env() {
        set_all();
        let config = Config::load_from_env().unwrap();
        assert_eq!(config.network, SuiNetwork::Testnet);
        assert_eq!(config.sui.rpc_url, "https://fullnode.testnet.sui.io:443");
        assert_eq!(config.sui.coin_type, "0xaa::token::TOKEN");
        assert_eq!(config.eth.confirmation_timeout_secs, 60);
        assert_eq!(config.eth.decimals, 18);
        assert_eq!(config.sui.decimals, 9);
        assert_eq!(config.server.port, 5000);
        assert_eq!(
            config.sui.authority_object_ids(),
            vec!["0xbb".to_string(), "0xcc".to_string()]
        );
    }

    #[test]
    #[serial]
    fn test_missing_vars_listed_together() {
        set_all();
        env::remove_var("SUI_MINTER_CAP_ID");
        env::remove_var("ETH_RPC_URL");
        let err = Config::load_from_env().unwrap_err().to_string();
        assert!(err.contains("ETH_RPC_URL"), "{}", err);
        assert!(err.contains("SUI_MINTER_CAP_ID"), "{}", err);
    }

    #[test]
    #[serial]
    fn test_invalid_network() {
        set_all();
        env::set_var("NETWORK", "moonnet");
        assert!(Config::load_from_env().is_err());
    }

    #[test]
    #[serial]
    fn test_invalid_contract_address() {
        set_all();
        env::set_var("ETH_CONTRACT_ADDRESS", "invalid");
        assert!(Config::load_from_env().is_err());
    }

    #[test]
    #[serial]
    fn test_decimals_bounded() {
        set_all();
        env::set_var("ETH_DECIMALS", "78");
        let err = Config::load_from_env().unwrap_err().to_string();
        assert!(err.contains("eth.decimals"), "{}", err);

        env::set_var("ETH_DECIMALS", "77");
        assert!(Config::load_from_env().is_ok());
        env::remove_var("ETH_DECIMALS");
    }

    #[test]
    #[serial]
    fn test_explicit_overrides() {
        set_all();
        env::set_var("SUI_RPC_URL", "http://127.0.0.1:9000");
        env::set_var("ETH_CONFIRMATION_TIMEOUT_SECS", "5");
        env::set_var("PORT", "8080");
        let config = Config::load_from_env().unwrap();
        assert_eq!(config.sui.rpc_url, "http://127.0.0.1:9000");
        assert_eq!(config.eth.confirmation_timeout(), Duration::from_secs(5));
        assert_eq!(config.server.port, 8080);
        for k in OPTIONAL {
            env::remove_var(k);
        }
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let eth = EthConfig {
            rpc_url: "http://localhost:8545".to_string(),
            private_key: "0xsecretsecret".to_string(),
            contract_address: "0x0000000000000000000000000000000000000001".to_string(),
            confirmation_timeout_secs: 60,
            decimals: 18,
        };
        let out = format!("{:?}", eth);
        assert!(!out.contains("secretsecret"));
        assert!(out.contains("<redacted>"));
    }

    #[test]
    fn test_network_urls() {
        assert_eq!(
            "mainnet".parse::<SuiNetwork>().unwrap().fullnode_url(),
            "https://fullnode.mainnet.sui.io:443"
        );
        assert_eq!(
            "Localnet".parse::<SuiNetwork>().unwrap(),
            SuiNetwork::Localnet
        );
    }
}
