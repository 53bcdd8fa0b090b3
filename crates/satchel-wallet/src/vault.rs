//! Password-gated storage of the wallet's private key.
//!
//! The [`KeyVault`] owns the address and the key material and is the only
//! component that writes them to the preferences store. Passwords are used
//! to derive encryption keys and are never stored.

use std::fmt;
use std::sync::Arc;

use bitcoin::{Network, NetworkKind};
use satchel_core::traits::Preferences;
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use crate::cipher::{CipherFormat, CipherFormatKind};
use crate::error::WalletError;
use crate::keys::KeyPair;

/// The private key as held in memory and in the preferences store.
pub enum KeyMaterial {
    /// No key generated or imported yet.
    Unset,
    /// WIF string, stored as-is.
    Plaintext(Zeroizing<String>),
    /// Ciphertext string in the vault's [`CipherFormat`].
    Encrypted(String),
}

impl KeyMaterial {
    pub fn is_encrypted(&self) -> bool {
        matches!(self, Self::Encrypted(_))
    }

    /// The string form written to the preferences store.
    fn stored(&self) -> &str {
        match self {
            Self::Unset => "",
            Self::Plaintext(wif) => wif.as_str(),
            Self::Encrypted(ciphertext) => ciphertext,
        }
    }
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unset => f.write_str("Unset"),
            Self::Plaintext(_) => f.write_str("Plaintext([REDACTED])"),
            Self::Encrypted(_) => f.write_str("Encrypted(..)"),
        }
    }
}

/// Owner of the wallet address and private key.
pub struct KeyVault {
    prefs: Arc<dyn Preferences>,
    cipher: Box<dyn CipherFormat>,
    network: Network,
    address: Option<String>,
    material: KeyMaterial,
}

impl KeyVault {
    /// Create an empty vault. Call [`restore`](Self::restore) to load a
    /// previously saved wallet.
    pub fn new(prefs: Arc<dyn Preferences>, cipher: CipherFormatKind, network: Network) -> Self {
        Self {
            prefs,
            cipher: cipher.build(),
            network,
            address: None,
            material: KeyMaterial::Unset,
        }
    }

    pub fn address(&self) -> Option<&str> {
        self.address.as_deref()
    }

    pub fn is_encrypted(&self) -> bool {
        self.material.is_encrypted()
    }

    pub fn network(&self) -> Network {
        self.network
    }

    /// Load address, key material and the encrypted flag from preferences.
    ///
    /// The key and the flag are written separately by
    /// [`update_password`](Self::update_password), so an interrupted update
    /// can leave them disagreeing. The stored key is checked against the
    /// flag and the key's actual form wins.
    pub async fn restore(&mut self) -> Result<(), WalletError> {
        let address = self.prefs.address().await?;
        if address.is_empty() {
            return Err(WalletError::NoAddress);
        }
        let stored = Zeroizing::new(self.prefs.private_key().await?);
        if stored.is_empty() {
            return Err(WalletError::InvalidKey("no private key stored".into()));
        }
        let flagged = self.prefs.is_encrypted().await?;
        let is_wif = KeyPair::from_wif(&stored).is_ok();

        if flagged == is_wif {
            warn!(
                %address,
                flagged_encrypted = flagged,
                "stored key disagrees with encrypted flag, using key form"
            );
        }
        self.material = if is_wif {
            KeyMaterial::Plaintext(stored)
        } else {
            KeyMaterial::Encrypted(stored.to_string())
        };

        debug!(%address, encrypted = self.is_encrypted(), "restored wallet");
        self.address = Some(address);
        Ok(())
    }

    /// Create a fresh keypair and persist it unencrypted. Returns the new
    /// address.
    pub async fn generate(&mut self) -> Result<String, WalletError> {
        let keypair = KeyPair::generate(self.network);
        let address = self.store_plaintext(&keypair).await?;
        info!(%address, "generated new wallet address");
        Ok(address)
    }

    /// Replace the wallet key with `wif`.
    ///
    /// When the current key is encrypted, `password` must decrypt it before
    /// anything is replaced. The imported key is stored unencrypted.
    pub async fn import(&mut self, password: &str, wif: &str) -> Result<String, WalletError> {
        if !self.validate_password(password) {
            return Err(WalletError::IncorrectPassword);
        }
        let keypair = KeyPair::from_wif(wif)?;
        if keypair.network_kind() != NetworkKind::from(self.network) {
            return Err(WalletError::InvalidKey(format!(
                "key is not for network {}",
                self.network
            )));
        }
        let address = self.store_plaintext(&keypair).await?;
        info!(%address, "imported wallet key");
        Ok(address)
    }

    async fn store_plaintext(&mut self, keypair: &KeyPair) -> Result<String, WalletError> {
        let address = keypair.address().to_string();
        let wif = keypair.to_wif();

        self.prefs.set_private_key(&wif).await?;
        self.prefs.set_is_encrypted(false).await?;
        self.prefs.set_address(&address).await?;

        self.material = KeyMaterial::Plaintext(wif);
        self.address = Some(address.clone());
        Ok(address)
    }

    /// Whether `password` unlocks the key. Always true for an unencrypted
    /// wallet.
    pub fn validate_password(&self, password: &str) -> bool {
        match &self.material {
            KeyMaterial::Encrypted(_) => self.decrypt(password).is_some(),
            _ => true,
        }
    }

    /// The plaintext WIF key, or `None` if `password` does not decrypt it or
    /// no key exists. Unencrypted keys are returned regardless of password.
    pub fn decrypt(&self, password: &str) -> Option<Zeroizing<String>> {
        match &self.material {
            KeyMaterial::Unset => None,
            KeyMaterial::Plaintext(wif) => Some(wif.clone()),
            KeyMaterial::Encrypted(ciphertext) => match self.cipher.open(ciphertext, password) {
                Ok(plaintext) if !plaintext.is_empty() => Some(plaintext),
                Ok(_) => None,
                Err(e) => {
                    debug!(error = %e, "private key decryption failed");
                    None
                }
            },
        }
    }

    /// Decrypt and parse the signing key.
    pub fn keypair(&self, password: &str) -> Result<KeyPair, WalletError> {
        let wif = self.decrypt(password).ok_or(WalletError::IncorrectPassword)?;
        KeyPair::from_wif(&wif)
    }

    /// Re-protect the key under `new_password`, or store it in the clear if
    /// `new_password` is empty.
    ///
    /// Both the key and the encrypted flag are written before this returns.
    /// If the flag write fails, the key write is rolled back and the error
    /// is returned; in-memory state changes only after both writes succeed.
    pub async fn update_password(
        &mut self,
        old_password: &str,
        new_password: &str,
    ) -> Result<(), WalletError> {
        if matches!(self.material, KeyMaterial::Unset) {
            return Err(WalletError::NoAddress);
        }
        let plaintext = self
            .decrypt(old_password)
            .ok_or(WalletError::IncorrectPassword)?;

        let material = if new_password.is_empty() {
            KeyMaterial::Plaintext(plaintext)
        } else {
            KeyMaterial::Encrypted(self.cipher.seal(&plaintext, new_password)?)
        };
        let encrypted = material.is_encrypted();

        self.prefs.set_private_key(material.stored()).await?;
        if let Err(e) = self.prefs.set_is_encrypted(encrypted).await {
            warn!(error = %e, "encrypted flag write failed, rolling back key");
            if let Err(rollback) = self.prefs.set_private_key(self.material.stored()).await {
                warn!(error = %rollback, "key rollback failed, restore will reconcile");
            }
            return Err(e.into());
        }

        self.material = material;
        info!(encrypted, "wallet password updated");
        Ok(())
    }
}

impl fmt::Debug for KeyVault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyVault")
            .field("network", &self.network)
            .field("address", &self.address)
            .field("material", &self.material)
            .field("cipher", &self.cipher.kind())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preferences::{MemoryPreferences, StoredPreferences};
    use async_trait::async_trait;
    use satchel_core::error::PreferencesError;
    use std::sync::atomic::{AtomicBool, Ordering};

    const WIF_ONE: &str = "KwDiBf89QgGbjEhKnhXJuH7LrciVrZi3qYjgd9M7rFU73sVHnoWn";
    const ADDR_ONE: &str = "1BgGZ9tcN4rm9KBzDn7KprQz87SZ26SAMH";

    fn vault_with(prefs: Arc<MemoryPreferences>) -> KeyVault {
        KeyVault::new(prefs, CipherFormatKind::Compact, Network::Bitcoin)
    }

    /// Memory store whose flag writes fail while `fail_flag` is set.
    #[derive(Default)]
    struct FlakyPreferences {
        inner: MemoryPreferences,
        fail_flag: AtomicBool,
    }

    #[async_trait]
    impl Preferences for FlakyPreferences {
        async fn address(&self) -> Result<String, PreferencesError> {
            self.inner.address().await
        }
        async fn set_address(&self, address: &str) -> Result<(), PreferencesError> {
            self.inner.set_address(address).await
        }
        async fn private_key(&self) -> Result<String, PreferencesError> {
            self.inner.private_key().await
        }
        async fn set_private_key(&self, key: &str) -> Result<(), PreferencesError> {
            self.inner.set_private_key(key).await
        }
        async fn is_encrypted(&self) -> Result<bool, PreferencesError> {
            self.inner.is_encrypted().await
        }
        async fn set_is_encrypted(&self, encrypted: bool) -> Result<(), PreferencesError> {
            if self.fail_flag.load(Ordering::SeqCst) {
                return Err(PreferencesError::Io("quota exceeded".into()));
            }
            self.inner.set_is_encrypted(encrypted).await
        }
        async fn last_balance(&self) -> Result<u64, PreferencesError> {
            self.inner.last_balance().await
        }
        async fn set_last_balance(&self, balance: u64) -> Result<(), PreferencesError> {
            self.inner.set_last_balance(balance).await
        }
    }

    #[tokio::test]
    async fn generate_persists_plaintext() {
        let prefs = Arc::new(MemoryPreferences::new());
        let mut vault = vault_with(prefs.clone());

        let address = vault.generate().await.unwrap();
        let snap = prefs.snapshot();
        assert_eq!(snap.address, address);
        assert!(!snap.is_encrypted);
        assert_eq!(
            KeyPair::from_wif(&snap.private_key).unwrap().address().to_string(),
            address
        );
        assert_eq!(vault.address(), Some(address.as_str()));
    }

    #[tokio::test]
    async fn unencrypted_accepts_any_password() {
        let mut vault = vault_with(Arc::new(MemoryPreferences::new()));
        vault.import("", WIF_ONE).await.unwrap();
        assert!(vault.validate_password(""));
        assert!(vault.validate_password("anything"));
        assert_eq!(vault.decrypt("whatever").unwrap().as_str(), WIF_ONE);
    }

    #[tokio::test]
    async fn import_sets_address() {
        let prefs = Arc::new(MemoryPreferences::new());
        let mut vault = vault_with(prefs.clone());
        assert_eq!(vault.import("", WIF_ONE).await.unwrap(), ADDR_ONE);
        assert_eq!(prefs.snapshot().address, ADDR_ONE);
    }

    #[tokio::test]
    async fn import_invalid_key() {
        let mut vault = vault_with(Arc::new(MemoryPreferences::new()));
        let err = vault.import("", "5notakey").await.unwrap_err();
        assert!(matches!(err, WalletError::InvalidKey(_)));
        assert!(vault.address().is_none());
    }

    #[tokio::test]
    async fn import_wrong_network_key() {
        let mut vault = KeyVault::new(
            Arc::new(MemoryPreferences::new()),
            CipherFormatKind::Compact,
            Network::Testnet,
        );
        let err = vault.import("", WIF_ONE).await.unwrap_err();
        assert!(matches!(err, WalletError::InvalidKey(_)));
    }

    #[tokio::test]
    async fn import_over_encrypted_wallet_needs_password() {
        let prefs = Arc::new(MemoryPreferences::new());
        let mut vault = vault_with(prefs.clone());
        let original = vault.generate().await.unwrap();
        vault.update_password("", "s3cret").await.unwrap();

        let err = vault.import("wrong", WIF_ONE).await.unwrap_err();
        assert_eq!(err, WalletError::IncorrectPassword);
        assert_eq!(prefs.snapshot().address, original);

        vault.import("s3cret", WIF_ONE).await.unwrap();
        assert!(!vault.is_encrypted());
        assert!(!prefs.snapshot().is_encrypted);
        assert_eq!(prefs.snapshot().private_key, WIF_ONE);
    }

    #[tokio::test]
    async fn password_roundtrip() {
        let prefs = Arc::new(MemoryPreferences::new());
        let mut vault = vault_with(prefs.clone());
        vault.import("", WIF_ONE).await.unwrap();

        vault.update_password("", "first").await.unwrap();
        assert!(vault.is_encrypted());
        assert!(vault.validate_password("first"));
        assert!(!vault.validate_password("second"));

        vault.update_password("first", "second").await.unwrap();
        assert!(vault.validate_password("second"));
        assert!(!vault.validate_password("first"));
        assert_eq!(vault.decrypt("second").unwrap().as_str(), WIF_ONE);
        assert!(vault.decrypt("first").is_none());

        let snap = prefs.snapshot();
        assert!(snap.is_encrypted);
        assert!(!snap.private_key.contains(WIF_ONE));
    }

    #[tokio::test]
    async fn empty_new_password_decrypts_to_plaintext() {
        let prefs = Arc::new(MemoryPreferences::new());
        let mut vault = vault_with(prefs.clone());
        vault.import("", WIF_ONE).await.unwrap();
        vault.update_password("", "pw").await.unwrap();

        vault.update_password("pw", "").await.unwrap();
        assert!(!vault.is_encrypted());
        assert_eq!(prefs.snapshot().private_key, WIF_ONE);
        assert!(!prefs.snapshot().is_encrypted);
    }

    #[tokio::test]
    async fn update_password_wrong_old() {
        let mut vault = vault_with(Arc::new(MemoryPreferences::new()));
        vault.import("", WIF_ONE).await.unwrap();
        vault.update_password("", "pw").await.unwrap();

        let err = vault.update_password("nope", "other").await.unwrap_err();
        assert_eq!(err, WalletError::IncorrectPassword);
        assert!(vault.validate_password("pw"));
    }

    #[tokio::test]
    async fn update_password_without_key() {
        let mut vault = vault_with(Arc::new(MemoryPreferences::new()));
        let err = vault.update_password("", "pw").await.unwrap_err();
        assert_eq!(err, WalletError::NoAddress);
    }

    #[tokio::test]
    async fn keypair_requires_password() {
        let mut vault = vault_with(Arc::new(MemoryPreferences::new()));
        vault.import("", WIF_ONE).await.unwrap();
        vault.update_password("", "pw").await.unwrap();

        assert_eq!(vault.keypair("bad").unwrap_err(), WalletError::IncorrectPassword);
        assert_eq!(vault.keypair("pw").unwrap().address().to_string(), ADDR_ONE);
    }

    #[tokio::test]
    async fn restore_without_address() {
        let mut vault = vault_with(Arc::new(MemoryPreferences::new()));
        assert_eq!(vault.restore().await.unwrap_err(), WalletError::NoAddress);
    }

    #[tokio::test]
    async fn restore_encrypted_wallet() {
        let prefs = Arc::new(MemoryPreferences::new());
        let mut vault = vault_with(prefs.clone());
        vault.import("", WIF_ONE).await.unwrap();
        vault.update_password("", "pw").await.unwrap();

        let mut reopened = vault_with(prefs);
        reopened.restore().await.unwrap();
        assert_eq!(reopened.address(), Some(ADDR_ONE));
        assert!(reopened.is_encrypted());
        assert!(reopened.validate_password("pw"));
        assert!(!reopened.validate_password("other"));
    }

    #[tokio::test]
    async fn restore_reconciles_unflagged_ciphertext() {
        let ciphertext = CipherFormatKind::Compact.build().seal(WIF_ONE, "pw").unwrap();
        let prefs = Arc::new(MemoryPreferences::with_fields(StoredPreferences {
            address: ADDR_ONE.into(),
            private_key: ciphertext,
            is_encrypted: false,
            last_balance: 0,
        }));
        let mut vault = vault_with(prefs);
        vault.restore().await.unwrap();
        assert!(vault.is_encrypted());
        assert!(vault.validate_password("pw"));
    }

    #[tokio::test]
    async fn restore_reconciles_flagged_plaintext() {
        let prefs = Arc::new(MemoryPreferences::with_fields(StoredPreferences {
            address: ADDR_ONE.into(),
            private_key: WIF_ONE.into(),
            is_encrypted: true,
            last_balance: 0,
        }));
        let mut vault = vault_with(prefs);
        vault.restore().await.unwrap();
        assert!(!vault.is_encrypted());
    }

    fn encrypted_prefs(private_key: String) -> Arc<MemoryPreferences> {
        Arc::new(MemoryPreferences::with_fields(StoredPreferences {
            address: ADDR_ONE.into(),
            private_key,
            is_encrypted: true,
            last_balance: 0,
        }))
    }

    #[tokio::test]
    async fn garbage_ciphertext_never_decrypts() {
        let mut vault = vault_with(encrypted_prefs("not-a-sealed-key".into()));
        vault.restore().await.unwrap();
        assert!(vault.is_encrypted());
        assert!(vault.decrypt("").is_none());
        assert!(vault.decrypt("pw").is_none());
        assert!(!vault.validate_password("pw"));
        assert_eq!(vault.keypair("pw").unwrap_err(), WalletError::IncorrectPassword);
    }

    #[tokio::test]
    async fn empty_sealed_plaintext_is_not_a_key() {
        let ciphertext = CipherFormatKind::Compact.build().seal("", "pw").unwrap();
        let mut vault = vault_with(encrypted_prefs(ciphertext));
        vault.restore().await.unwrap();
        assert!(vault.decrypt("pw").is_none());
        assert!(!vault.validate_password("pw"));
    }

    #[tokio::test]
    async fn failed_flag_write_rolls_back_key() {
        let prefs = Arc::new(FlakyPreferences::default());
        let mut vault = KeyVault::new(prefs.clone(), CipherFormatKind::Compact, Network::Bitcoin);
        vault.import("", WIF_ONE).await.unwrap();

        prefs.fail_flag.store(true, Ordering::SeqCst);
        let err = vault.update_password("", "pw").await.unwrap_err();
        assert!(matches!(err, WalletError::Preferences(_)));

        let snap = prefs.inner.snapshot();
        assert_eq!(snap.private_key, WIF_ONE);
        assert!(!snap.is_encrypted);
        assert!(!vault.is_encrypted());
    }

    #[tokio::test]
    async fn json_cipher_format_roundtrip() {
        let prefs = Arc::new(MemoryPreferences::new());
        let mut vault = KeyVault::new(prefs.clone(), CipherFormatKind::Json, Network::Bitcoin);
        vault.import("", WIF_ONE).await.unwrap();
        vault.update_password("", "pw").await.unwrap();

        let stored: serde_json::Value =
            serde_json::from_str(&prefs.snapshot().private_key).unwrap();
        assert!(stored.get("ct").is_some());
        assert_eq!(vault.decrypt("pw").unwrap().as_str(), WIF_ONE);
    }

    #[test]
    fn debug_hides_key() {
        let material = KeyMaterial::Plaintext(Zeroizing::new(WIF_ONE.into()));
        assert_eq!(format!("{material:?}"), "Plaintext([REDACTED])");
    }
}
