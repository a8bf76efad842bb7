use crate::chain::DEFAULT_GAS_LIMIT;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;
use url::Url;

pub const DEFAULT_NETWORK: &str = "sepolia";
pub const DEFAULT_ACCOUNT_COUNT: u32 = 1;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing environment variable {0}")]
    Missing(&'static str),
    #[error("invalid {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
    #[error("unreadable .env file: {0}")]
    EnvFile(#[source] dotenvy::Error),
}

/// Everything the Deployer needs to reach a network and sign for it.
#[derive(Clone)]
pub struct DeployerConfig {
    pub endpoint: Url,
    pub mnemonic: String,
    pub gas_limit: u64,
    pub account_count: u32,
    /// Directory holding `Lottery.abi.json` and `Lottery.bin`; the embedded artifact otherwise.
    pub artifact_dir: Option<PathBuf>,
}

impl fmt::Debug for DeployerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeployerConfig")
            .field("endpoint", &self.endpoint.host_str())
            .field("mnemonic", &"<redacted>")
            .field("gas_limit", &self.gas_limit)
            .field("account_count", &self.account_count)
            .field("artifact_dir", &self.artifact_dir)
            .finish()
    }
}

impl DeployerConfig {
    /// Reads the process environment, after loading `.env` if one exists.
    pub fn from_env() -> Result<Self, ConfigError> {
        env_file(dotenvy::dotenv())?;
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let mnemonic = var("MNEMONIC").ok_or(ConfigError::Missing("MNEMONIC"))?;

        let endpoint = match var("RPC_URL") {
            Some(url) => url,
            None => {
                let key = var("INFURA_API_KEY").ok_or(ConfigError::Missing("INFURA_API_KEY"))?;
                let network = var("INFURA_NETWORK").unwrap_or_else(|| DEFAULT_NETWORK.to_string());
                format!("https://{network}.infura.io/v3/{key}")
            }
        };
        let endpoint = Url::parse(endpoint.trim()).map_err(|err| ConfigError::Invalid {
            name: "endpoint",
            reason: err.to_string(),
        })?;

        let gas_limit = match var("GAS_LIMIT") {
            Some(value) => parse("GAS_LIMIT", &value)?,
            None => DEFAULT_GAS_LIMIT,
        };
        let account_count = match var("ACCOUNT_COUNT") {
            Some(value) => parse("ACCOUNT_COUNT", &value)?,
            None => DEFAULT_ACCOUNT_COUNT,
        };
        if account_count == 0 {
            return Err(ConfigError::Invalid {
                name: "ACCOUNT_COUNT",
                reason: "must be at least 1".to_string(),
            });
        }

        Ok(Self {
            endpoint,
            mnemonic: mnemonic.trim().to_string(),
            gas_limit,
            account_count,
            artifact_dir: var("ARTIFACT_DIR").map(PathBuf::from),
        })
    }
}

/// A missing `.env` is fine; one that exists but cannot be read or parsed is not.
fn env_file<T>(loaded: Result<T, dotenvy::Error>) -> Result<(), ConfigError> {
    match loaded {
        Ok(_) => Ok(()),
        Err(dotenvy::Error::Io(err)) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(ConfigError::EnvFile(err)),
    }
}

fn parse<V>(name: &'static str, value: &str) -> Result<V, ConfigError>
where
    V: std::str::FromStr,
    V::Err: fmt::Display,
{
    value
        .trim()
        .replace('_', "")
        .parse()
        .map_err(|err: V::Err| ConfigError::Invalid {
            name,
            reason: err.to_string(),
        })
}
