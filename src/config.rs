//! Relay configuration with validation and defaults
//!
//! Loaded from an optional TOML file, then overridden from the environment.
//! Signing key, RPC endpoint and contract address have no usable default:
//! the relay refuses to start without them. The key is parsed exactly once,
//! when the loader moves it out of the configuration into `Credentials`.

use crate::errors::ConfigurationError;
use crate::submission::{address::Address, queue::NETWORK_STEPS, signer::CustodialKey};
use serde::{Deserialize, Serialize};
use std::{env, fmt, path::Path, time::Duration};
use zeroize::Zeroizing;

pub const ENV_PRIVATE_KEY: &str = "SERVER_PRIVATE_KEY";
pub const ENV_RPC_URL: &str = "MONAD_RPC_URL";
pub const ENV_CONTRACT: &str = "MONAD_GAMES_ID_CONTRACT";
pub const ENV_CHAIN_ID: &str = "MONAD_CHAIN_ID";
pub const ENV_HOST: &str = "RELAY_HOST";
pub const ENV_PORT: &str = "RELAY_PORT";
pub const ENV_SUBMIT_TIMEOUT_MS: &str = "RELAY_SUBMIT_TIMEOUT_MS";

/// Complete relay configuration
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    pub server: ServerConfig,
    pub chain: ChainConfig,
    pub signer: SignerConfig,
    pub submission: SubmissionConfig,
}

/// HTTP listener settings
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub allowed_origins: Vec<String>,
    pub request_timeout_secs: u64,
}

impl ServerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            allowed_origins: vec!["*".to_string()],
            request_timeout_secs: 75,
        }
    }
}

/// Target network and registry contract
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainConfig {
    pub chain_id: u64,
    pub name: String,
    pub currency_symbol: String,
    pub rpc_url: Option<String>,
    pub explorer_url: Option<String>,
    pub contract_address: Option<String>,
}

impl ChainConfig {
    /// Monad testnet profile. The contract address is deliberately left unset.
    pub fn monad_testnet() -> Self {
        Self {
            chain_id: 10143,
            name: "Monad Testnet".to_string(),
            currency_symbol: "MON".to_string(),
            rpc_url: Some("https://testnet-rpc.monad.xyz".to_string()),
            explorer_url: Some("https://testnet.monadexplorer.com".to_string()),
            contract_address: None,
        }
    }

    /// Explorer link for a transaction hash, when an explorer is configured.
    pub fn explorer_tx_url(&self, hash: &str) -> Option<String> {
        self.explorer_url
            .as_ref()
            .map(|base| format!("{}/tx/{}", base.trim_end_matches('/'), hash))
    }
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self::monad_testnet()
    }
}

/// Custodial key material. Prefer the environment over the config file.
#[derive(Default, Deserialize)]
#[serde(default)]
pub struct SignerConfig {
    pub private_key: Option<Zeroizing<String>>,
}

impl fmt::Debug for SignerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignerConfig")
            .field("private_key", &self.private_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl Serialize for SignerConfig {
    // key material never round-trips
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;
        let mut state = serializer.serialize_struct("SignerConfig", 0)?;
        state.skip_field("private_key")?;
        state.end()
    }
}

/// Submission queue and fee settings
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SubmissionConfig {
    /// Bound on each network step of a submission.
    pub timeout_ms: u64,
    pub queue_capacity: usize,
    /// Applied to `eth_estimateGas`; 120 means +20%.
    pub gas_limit_headroom_percent: u64,
    /// Skip estimation and use this limit.
    pub gas_limit: Option<u64>,
}

impl Default for SubmissionConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 15_000,
            queue_capacity: 1_024,
            gas_limit_headroom_percent: 120,
            gas_limit: None,
        }
    }
}

impl SubmissionConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Parsed, validated material the submission service needs
#[derive(Debug)]
pub struct Credentials {
    pub key: CustodialKey,
    pub rpc_url: String,
    pub contract: Address,
}

impl RelayConfig {
    /// Move the key out of the configuration and parse it with the endpoint
    /// and contract. The raw key is gone afterwards, whatever the outcome.
    pub fn take_credentials(&mut self) -> Result<Credentials, ConfigurationError> {
        let raw_key = self
            .signer
            .private_key
            .take()
            .filter(|k| !k.trim().is_empty())
            .ok_or(ConfigurationError::MissingRequired(ENV_PRIVATE_KEY))?;
        let key = CustodialKey::from_hex(&raw_key).map_err(|e| ConfigurationError::InvalidValue {
            field: ENV_PRIVATE_KEY,
            reason: e.to_string(),
        })?;

        Ok(Credentials {
            key,
            rpc_url: self.rpc_url()?.to_string(),
            contract: self.contract()?,
        })
    }

    fn rpc_url(&self) -> Result<&str, ConfigurationError> {
        let rpc_url = self
            .chain
            .rpc_url
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .ok_or(ConfigurationError::MissingRequired(ENV_RPC_URL))?;
        if !(rpc_url.starts_with("http://") || rpc_url.starts_with("https://")) {
            return Err(ConfigurationError::InvalidValue {
                field: ENV_RPC_URL,
                reason: format!("expected an http(s) url, got '{}'", rpc_url),
            });
        }
        Ok(rpc_url)
    }

    fn contract(&self) -> Result<Address, ConfigurationError> {
        self.chain
            .contract_address
            .as_deref()
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .ok_or(ConfigurationError::MissingRequired(ENV_CONTRACT))?
            .parse::<Address>()
            .map_err(|e| ConfigurationError::InvalidValue {
                field: ENV_CONTRACT,
                reason: e.to_string(),
            })
    }

    /// Validate configuration for logical consistency. The key is checked
    /// for presence only; `take_credentials` parses it.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        self.validate_settings()?;
        let has_key = self
            .signer
            .private_key
            .as_ref()
            .is_some_and(|k| !k.trim().is_empty());
        if !has_key {
            return Err(ConfigurationError::MissingRequired(ENV_PRIVATE_KEY));
        }
        self.rpc_url()?;
        self.contract()?;
        Ok(())
    }

    /// Numeric limits and their relations, independent of credentials.
    pub fn validate_settings(&self) -> Result<(), ConfigurationError> {
        if self.submission.timeout_ms == 0 {
            return Err(ConfigurationError::InvalidValue {
                field: "submission.timeout_ms",
                reason: "must be > 0".to_string(),
            });
        }
        if self.submission.queue_capacity == 0 {
            return Err(ConfigurationError::InvalidValue {
                field: "submission.queue_capacity",
                reason: "must be > 0".to_string(),
            });
        }
        if self.submission.gas_limit_headroom_percent < 100 {
            return Err(ConfigurationError::InvalidValue {
                field: "submission.gas_limit_headroom_percent",
                reason: "must be >= 100".to_string(),
            });
        }
        if self.submission.gas_limit == Some(0) {
            return Err(ConfigurationError::InvalidValue {
                field: "submission.gas_limit",
                reason: "must be > 0 when set".to_string(),
            });
        }
        // a request must outlive every network step of its own job
        let job_budget_ms = self.submission.timeout_ms.saturating_mul(NETWORK_STEPS);
        if self.server.request_timeout_secs.saturating_mul(1_000) <= job_budget_ms {
            return Err(ConfigurationError::InvalidValue {
                field: "server.request_timeout_secs",
                reason: format!(
                    "must exceed {} x submission.timeout_ms ({}ms)",
                    NETWORK_STEPS, job_budget_ms
                ),
            });
        }
        Ok(())
    }
}

/// Validated configuration with the key already moved into `credentials`
#[derive(Debug)]
pub struct LoadedConfig {
    pub config: RelayConfig,
    pub credentials: Credentials,
}

/// Configuration loader with environment variable support
#[derive(Debug, Default)]
pub struct ConfigLoader {
    config_path: Option<String>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self { config_path: None }
    }

    pub fn with_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_path = Some(path.as_ref().to_string_lossy().to_string());
        self
    }

    /// Load from file (if any), apply process environment, validate and
    /// take the credentials.
    pub fn load(&self) -> Result<LoadedConfig, ConfigurationError> {
        self.load_with(|name| env::var(name).ok())
    }

    fn load_with<F>(&self, lookup: F) -> Result<LoadedConfig, ConfigurationError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match self.config_path {
            Some(ref path) => Self::load_from_file(path)?,
            None => RelayConfig::default(),
        };
        apply_overrides(&mut config, lookup)?;
        config.validate()?;
        let credentials = config.take_credentials()?;
        Ok(LoadedConfig { config, credentials })
    }

    fn load_from_file(path: &str) -> Result<RelayConfig, ConfigurationError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigurationError::LoadFailed(format!("failed to read {}: {}", path, e)))?;
        toml::from_str(&content)
            .map_err(|e| ConfigurationError::LoadFailed(format!("failed to parse {}: {}", path, e)))
    }
}

/// Apply overrides from a variable lookup (the process environment in production).
pub fn apply_overrides<F>(config: &mut RelayConfig, lookup: F) -> Result<(), ConfigurationError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(key) = lookup(ENV_PRIVATE_KEY) {
        config.signer.private_key = Some(Zeroizing::new(key));
    }
    if let Some(url) = lookup(ENV_RPC_URL) {
        config.chain.rpc_url = Some(url);
    }
    if let Some(contract) = lookup(ENV_CONTRACT) {
        config.chain.contract_address = Some(contract);
    }
    if let Some(chain_id) = lookup(ENV_CHAIN_ID) {
        config.chain.chain_id = parse_number(ENV_CHAIN_ID, &chain_id)?;
    }
    if let Some(host) = lookup(ENV_HOST) {
        config.server.host = host;
    }
    if let Some(port) = lookup(ENV_PORT) {
        config.server.port = parse_number(ENV_PORT, &port)?;
    }
    if let Some(timeout) = lookup(ENV_SUBMIT_TIMEOUT_MS) {
        config.submission.timeout_ms = parse_number(ENV_SUBMIT_TIMEOUT_MS, &timeout)?;
    }
    Ok(())
}

fn parse_number<T: std::str::FromStr>(field: &'static str, value: &str) -> Result<T, ConfigurationError>
where
    T::Err: fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e: T::Err| ConfigurationError::InvalidValue {
            field,
            reason: format!("'{}': {}", value, e),
        })
}
