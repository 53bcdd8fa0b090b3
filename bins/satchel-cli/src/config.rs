//! CLI configuration loaded from environment variables.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use bitcoin::Network;
use satchel_wallet::config::DEFAULT_API_BASE;
use satchel_wallet::{CipherFormatKind, FeeBoundPolicy, WalletConfig};

/// File name of the preferences document inside the data directory.
pub const PREFERENCES_FILE: &str = "preferences.json";

#[derive(Clone, Debug)]
pub struct Config {
    /// Directory holding the preferences file.
    pub data_dir: PathBuf,
    /// Settings passed to the wallet.
    pub wallet: WalletConfig,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let network = match var("SATCHEL_NETWORK") {
            Some(s) => parse_network(&s)?,
            None => Network::Bitcoin,
        };

        let data_dir = match var("SATCHEL_DATA_DIR") {
            Some(dir) => PathBuf::from(dir),
            None => dirs::data_dir()
                .context("Could not determine data directory; set SATCHEL_DATA_DIR")?
                .join("satchel")
                .join(network_dir(network)),
        };

        let api_base = var("SATCHEL_API_BASE").unwrap_or_else(|| DEFAULT_API_BASE.to_string());

        let cipher_format = match var("SATCHEL_CIPHER_FORMAT") {
            Some(s) => s
                .parse::<CipherFormatKind>()
                .map_err(anyhow::Error::msg)
                .context("SATCHEL_CIPHER_FORMAT must be 'compact' or 'json'")?,
            None => CipherFormatKind::default(),
        };

        let fee_policy = match var("SATCHEL_FEE_POLICY") {
            Some(s) => s
                .parse::<FeeBoundPolicy>()
                .map_err(anyhow::Error::msg)
                .context("SATCHEL_FEE_POLICY must be 'enforce' or 'advisory'")?,
            None => FeeBoundPolicy::default(),
        };

        Ok(Config {
            data_dir,
            wallet: WalletConfig {
                network,
                api_base,
                cipher_format,
                fee_policy,
                ..WalletConfig::default()
            },
        })
    }

    pub fn preferences_path(&self) -> PathBuf {
        self.data_dir.join(PREFERENCES_FILE)
    }
}

/// Parse a network name.
pub fn parse_network(s: &str) -> Result<Network> {
    match s.to_lowercase().as_str() {
        "mainnet" | "main" | "bitcoin" => Ok(Network::Bitcoin),
        "testnet" | "test" | "test3" => Ok(Network::Testnet),
        _ => bail!("Invalid network (must be 'mainnet' or 'testnet')"),
    }
}

fn network_dir(network: Network) -> &'static str {
    match network {
        Network::Bitcoin => "mainnet",
        _ => "testnet",
    }
}
