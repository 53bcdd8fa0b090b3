//! The wallet keypair: secp256k1 key, WIF serialization, P2PKH address
//! derivation and legacy input signing.

use std::fmt;
use std::str::FromStr;

use bitcoin::hashes::Hash;
use bitcoin::script::{Builder, PushBytesBuf};
use bitcoin::secp256k1::{All, Message, Secp256k1};
use bitcoin::sighash::{EcdsaSighashType, SighashCache};
use bitcoin::{Address, Network, NetworkKind, PrivateKey, PublicKey, ScriptBuf, Transaction};
use zeroize::Zeroizing;

use crate::error::WalletError;

/// A secp256k1 keypair controlling the wallet's single P2PKH address.
pub struct KeyPair {
    secp: Secp256k1<All>,
    secret: PrivateKey,
    public: PublicKey,
}

impl KeyPair {
    /// Generate a random compressed keypair from the OS RNG.
    pub fn generate(network: Network) -> Self {
        let secp = Secp256k1::new();
        let (secret_key, _) = secp.generate_keypair(&mut bitcoin::secp256k1::rand::thread_rng());
        Self::from_private_key(secp, PrivateKey::new(secret_key, network))
    }

    /// Parse a wallet-import-format private key.
    pub fn from_wif(wif: &str) -> Result<Self, WalletError> {
        let secret =
            PrivateKey::from_wif(wif.trim()).map_err(|e| WalletError::InvalidKey(e.to_string()))?;
        Ok(Self::from_private_key(Secp256k1::new(), secret))
    }

    fn from_private_key(secp: Secp256k1<All>, secret: PrivateKey) -> Self {
        let public = secret.public_key(&secp);
        Self {
            secp,
            secret,
            public,
        }
    }

    /// The private key in wallet import format. Zeroized on drop.
    pub fn to_wif(&self) -> Zeroizing<String> {
        Zeroizing::new(self.secret.to_wif())
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public
    }

    /// Mainnet or test-network key.
    pub fn network_kind(&self) -> NetworkKind {
        self.secret.network
    }

    /// P2PKH address of the public key.
    pub fn address(&self) -> Address {
        Address::p2pkh(self.public.pubkey_hash(), self.secret.network)
    }

    /// Locking script paying to this key's address.
    pub fn script_pubkey(&self) -> ScriptBuf {
        ScriptBuf::new_p2pkh(&self.public.pubkey_hash())
    }

    /// Sign input `index` of `tx`, assuming it spends a P2PKH output locked
    /// to this key. Writes `<sig> <pubkey>` into the input's script_sig.
    pub fn sign_input(&self, tx: &mut Transaction, index: usize) -> Result<(), WalletError> {
        let script_pubkey = self.script_pubkey();
        let sighash = {
            let cache = SighashCache::new(&*tx);
            cache
                .legacy_signature_hash(index, &script_pubkey, EcdsaSighashType::All.to_u32())
                .map_err(|e| WalletError::Signing(e.to_string()))?
        };

        let message = Message::from_digest(sighash.to_byte_array());
        let signature = bitcoin::ecdsa::Signature {
            signature: self.secp.sign_ecdsa(&message, &self.secret.inner),
            sighash_type: EcdsaSighashType::All,
        };
        let push = PushBytesBuf::try_from(signature.to_vec())
            .map_err(|e| WalletError::Signing(e.to_string()))?;

        tx.input[index].script_sig = Builder::new()
            .push_slice(push)
            .push_key(&self.public)
            .into_script();
        Ok(())
    }

    /// Check that input `index` carries a valid signature by this key.
    pub fn verify_input(&self, tx: &Transaction, index: usize) -> bool {
        let Some(input) = tx.input.get(index) else {
            return false;
        };
        let Some(Ok(first)) = input.script_sig.instructions().next() else {
            return false;
        };
        let Some(pushed) = first.push_bytes() else {
            return false;
        };
        let Ok(signature) = bitcoin::ecdsa::Signature::from_slice(pushed.as_bytes()) else {
            return false;
        };

        let cache = SighashCache::new(tx);
        let Ok(sighash) = cache.legacy_signature_hash(
            index,
            &self.script_pubkey(),
            signature.sighash_type.to_u32(),
        ) else {
            return false;
        };
        let message = Message::from_digest(sighash.to_byte_array());
        self.secp
            .verify_ecdsa(&message, &signature.signature, &self.public.inner)
            .is_ok()
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("public", &self.public)
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

/// Parse a destination address and require it to belong to `network`.
pub fn parse_address(address: &str, network: Network) -> Result<Address, WalletError> {
    Address::from_str(address.trim())
        .map_err(|e| WalletError::InvalidAddress(format!("{address}: {e}")))?
        .require_network(network)
        .map_err(|e| WalletError::InvalidAddress(format!("{address}: {e}")))
}
