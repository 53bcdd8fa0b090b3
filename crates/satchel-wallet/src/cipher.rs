//! Storable string formats for encrypted private keys.
//!
//! [`encryption`](crate::encryption) produces raw `salt || nonce || ct` bytes.
//! A [`CipherFormat`] turns them into the string kept in the preferences
//! store and back. The format is picked once, when the vault is built, from
//! [`CipherFormatKind`].

use std::fmt;
use std::str::FromStr;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::encryption::{self, NONCE_LEN, SALT_LEN};
use crate::error::WalletError;

/// Selects a [`CipherFormat`] implementation.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum CipherFormatKind {
    /// One base64 string of the whole envelope.
    #[default]
    Compact,
    /// A JSON object with hex `ct`, `iv` and `s` fields.
    Json,
}

impl CipherFormatKind {
    /// Build the format strategy for this kind.
    pub fn build(self) -> Box<dyn CipherFormat> {
        match self {
            Self::Compact => Box::new(CompactFormat),
            Self::Json => Box::new(JsonFormat),
        }
    }
}

impl FromStr for CipherFormatKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown cipher format: {other}")),
        }
    }
}

impl fmt::Display for CipherFormatKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Compact => f.write_str("compact"),
            Self::Json => f.write_str("json"),
        }
    }
}

/// Rendering of an encrypted envelope as a storable string.
pub trait CipherFormat: Send + Sync + fmt::Debug {
    fn kind(&self) -> CipherFormatKind;

    /// Render `salt || nonce || ct` bytes as a string.
    fn encode(&self, envelope: &[u8]) -> Result<String, WalletError>;

    /// Parse a stored string back into `salt || nonce || ct` bytes.
    fn decode(&self, stored: &str) -> Result<Vec<u8>, WalletError>;

    /// Encrypt `plaintext` under `password` and render it.
    fn seal(&self, plaintext: &str, password: &str) -> Result<String, WalletError> {
        let envelope = encryption::encrypt(plaintext.as_bytes(), password.as_bytes())?;
        self.encode(&envelope)
    }

    /// Parse and decrypt a stored string.
    fn open(&self, stored: &str, password: &str) -> Result<Zeroizing<String>, WalletError> {
        let envelope = self.decode(stored)?;
        let plaintext = encryption::decrypt(&envelope, password.as_bytes())?;
        let text = std::str::from_utf8(&plaintext)
            .map_err(|_| WalletError::Decryption("plaintext is not UTF-8".into()))?;
        Ok(Zeroizing::new(text.to_owned()))
    }
}

/// Base64 of the raw envelope.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompactFormat;

impl CipherFormat for CompactFormat {
    fn kind(&self) -> CipherFormatKind {
        CipherFormatKind::Compact
    }

    fn encode(&self, envelope: &[u8]) -> Result<String, WalletError> {
        Ok(BASE64.encode(envelope))
    }

    fn decode(&self, stored: &str) -> Result<Vec<u8>, WalletError> {
        BASE64
            .decode(stored.trim())
            .map_err(|e| WalletError::Decryption(format!("invalid base64: {e}")))
    }
}

/// JSON object with hex fields.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonFormat;

#[derive(Serialize, Deserialize)]
struct JsonEnvelope {
    ct: String,
    iv: String,
    s: String,
}

impl CipherFormat for JsonFormat {
    fn kind(&self) -> CipherFormatKind {
        CipherFormatKind::Json
    }

    fn encode(&self, envelope: &[u8]) -> Result<String, WalletError> {
        if envelope.len() < SALT_LEN + NONCE_LEN {
            return Err(WalletError::Encryption("envelope too short".into()));
        }
        let json = JsonEnvelope {
            s: hex::encode(&envelope[..SALT_LEN]),
            iv: hex::encode(&envelope[SALT_LEN..SALT_LEN + NONCE_LEN]),
            ct: hex::encode(&envelope[SALT_LEN + NONCE_LEN..]),
        };
        serde_json::to_string(&json).map_err(|e| WalletError::Encryption(e.to_string()))
    }

    fn decode(&self, stored: &str) -> Result<Vec<u8>, WalletError> {
        let json: JsonEnvelope = serde_json::from_str(stored)
            .map_err(|e| WalletError::Decryption(format!("invalid envelope: {e}")))?;
        let field = |name: &str, value: &str, len: Option<usize>| -> Result<Vec<u8>, WalletError> {
            let bytes = hex::decode(value)
                .map_err(|e| WalletError::Decryption(format!("invalid {name}: {e}")))?;
            match len {
                Some(expected) if bytes.len() != expected => Err(WalletError::Decryption(
                    format!("invalid {name} length: {}", bytes.len()),
                )),
                _ => Ok(bytes),
            }
        };

        let mut envelope = field("s", &json.s, Some(SALT_LEN))?;
        envelope.extend(field("iv", &json.iv, Some(NONCE_LEN))?);
        envelope.extend(field("ct", &json.ct, None)?);
        Ok(envelope)
    }
}
