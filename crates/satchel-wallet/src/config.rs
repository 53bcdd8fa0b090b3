//! Wallet configuration.
//!
//! [`WalletConfig`] carries everything chosen once at construction: the
//! Bitcoin network, the block-explorer endpoint, how ciphertext is rendered,
//! and how the fee ceiling is applied.

use std::time::Duration;

use bitcoin::Network;
use satchel_core::constants::DEFAULT_CONFIRMATIONS;
use serde::{Deserialize, Serialize};

use crate::cipher::CipherFormatKind;

/// Default block-explorer API root.
pub const DEFAULT_API_BASE: &str = "https://api.blockcypher.com/v1/btc";

/// What to do when an assembled transaction would pay more than
/// [`MAX_EFFECTIVE_FEE`](satchel_core::constants::MAX_EFFECTIVE_FEE).
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum FeeBoundPolicy {
    /// Reject the send with `MalformedTransaction`.
    #[default]
    Enforce,
    /// Log a warning and broadcast anyway.
    Advisory,
}

impl std::str::FromStr for FeeBoundPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "enforce" => Ok(Self::Enforce),
            "advisory" => Ok(Self::Advisory),
            other => Err(format!("unknown fee policy: {other}")),
        }
    }
}

/// Configuration for a wallet instance.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct WalletConfig {
    /// Network keys and addresses belong to.
    pub network: Network,
    /// Block-explorer API root, without the chain suffix.
    pub api_base: String,
    /// Ciphertext rendering for the stored private key.
    pub cipher_format: CipherFormatKind,
    /// Fee ceiling handling.
    pub fee_policy: FeeBoundPolicy,
    /// Confirmation depth passed to balance refreshes.
    pub confirmations: u32,
    /// Per-request HTTP timeout.
    #[serde(with = "duration_secs")]
    pub http_timeout: Duration,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            network: Network::Bitcoin,
            api_base: DEFAULT_API_BASE.to_string(),
            cipher_format: CipherFormatKind::default(),
            fee_policy: FeeBoundPolicy::default(),
            confirmations: DEFAULT_CONFIRMATIONS,
            http_timeout: Duration::from_secs(30),
        }
    }
}

impl WalletConfig {
    /// Chain segment of the explorer URL for the configured network.
    ///
    /// BlockCypher serves Bitcoin mainnet and testnet3 only, so every
    /// non-mainnet network (testnet4, signet, regtest) maps to `test3`.
    pub fn chain_name(&self) -> &'static str {
        match self.network {
            Network::Bitcoin => "main",
            _ => "test3",
        }
    }

    /// Full API root for the configured network, e.g.
    /// `https://api.blockcypher.com/v1/btc/main`.
    pub fn api_url(&self) -> String {
        format!("{}/{}", self.api_base.trim_end_matches('/'), self.chain_name())
    }
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_secs(u64::deserialize(d)?))
    }
}
