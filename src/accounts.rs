//! Account references, wallets and the in-process key store

use crate::error::{GovError, Result};
use crate::transaction::{SignedTransaction, TxSignature, TypedTransaction};
use alloy_primitives::{keccak256, Address, B256};
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use rand::rngs::OsRng;
use secp256k1::{
    constants::SECRET_KEY_SIZE,
    ecdsa::{RecoverableSignature, RecoveryId},
    All, Message, PublicKey, Secp256k1, SecretKey,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// Shared signing/verification context.
static SECP256K1_CONTEXT: Lazy<Secp256k1<All>> = Lazy::new(Secp256k1::new);

/// A signer, identified by address. Wallet capabilities are looked up per
/// call through the [`AccountManager`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Account {
    pub address: Address,
}

impl From<Address> for Account {
    fn from(address: Address) -> Self {
        Account { address }
    }
}

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.address)
    }
}

/// Something that holds keys and can sign with them.
pub trait Wallet: Send + Sync {
    /// Human readable location, used in logs.
    fn url(&self) -> String;

    fn accounts(&self) -> Vec<Account>;

    fn contains(&self, account: &Account) -> bool {
        self.accounts().contains(account)
    }

    /// Signs `tx` for `chain_id`. May block (hardware wallets).
    fn sign_tx(
        &self,
        account: &Account,
        tx: &TypedTransaction,
        chain_id: u64,
    ) -> Result<SignedTransaction>;
}

/// Ordered set of wallets the node knows about.
#[derive(Clone, Default)]
pub struct AccountManager {
    wallets: Vec<Arc<dyn Wallet>>,
}

impl AccountManager {
    pub fn new(wallets: Vec<Arc<dyn Wallet>>) -> Self {
        AccountManager { wallets }
    }

    pub fn wallets(&self) -> &[Arc<dyn Wallet>] {
        &self.wallets
    }

    /// The wallet holding `account`.
    pub fn find(&self, account: &Account) -> Result<Arc<dyn Wallet>> {
        self.wallets
            .iter()
            .find(|w| w.contains(account))
            .cloned()
            .ok_or_else(|| GovError::Account(format!("unknown account {}", account.address)))
    }

    /// First account of the first wallet that has any.
    pub fn default_account(&self) -> Option<Account> {
        self.wallets
            .iter()
            .find_map(|w| w.accounts().into_iter().next())
    }
}

impl fmt::Debug for AccountManager {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let urls: Vec<String> = self.wallets.iter().map(|w| w.url()).collect();
        f.debug_struct("AccountManager").field("wallets", &urls).finish()
    }
}

/// Ethereum address of a secp256k1 public key.
pub fn public_key_to_address(public_key: &PublicKey) -> Address {
    let uncompressed = public_key.serialize_uncompressed();
    Address::from_slice(&keccak256(&uncompressed[1..])[12..])
}

/// Recovers the signer of `hash`.
pub fn recover_address(hash: B256, signature: &TxSignature) -> Result<Address> {
    let bytes = signature.to_bytes();
    let recovery_id = RecoveryId::from_i32(bytes[64] as i32)
        .map_err(|e| GovError::Signing(format!("invalid recovery id: {}", e)))?;
    let sig = RecoverableSignature::from_compact(&bytes[..64], recovery_id)
        .map_err(|e| GovError::Signing(format!("invalid signature: {}", e)))?;
    let message = Message::from_digest(hash.0);
    let public_key = SECP256K1_CONTEXT
        .recover_ecdsa(&message, &sig)
        .map_err(|e| GovError::Signing(format!("recovery failed: {}", e)))?;
    Ok(public_key_to_address(&public_key))
}

#[derive(Debug, Clone)]
pub struct KeyPair {
    pub secret_key: SecretKey,
    pub public_key: PublicKey,
}

impl KeyPair {
    pub fn generate() -> Self {
        Self::from_secret_key(SecretKey::new(&mut OsRng))
    }

    pub fn from_secret_key(secret_key: SecretKey) -> Self {
        let public_key = PublicKey::from_secret_key(&SECP256K1_CONTEXT, &secret_key);
        KeyPair {
            secret_key,
            public_key,
        }
    }

    pub fn from_secret_bytes(bytes: &[u8]) -> Result<Self> {
        let secret_key = SecretKey::from_slice(bytes).map_err(|e| {
            if bytes.len() != SECRET_KEY_SIZE {
                GovError::Account(format!(
                    "secret key must be {} bytes, got {}",
                    SECRET_KEY_SIZE,
                    bytes.len()
                ))
            } else {
                GovError::Account(format!("invalid secret key: {}", e))
            }
        })?;
        Ok(Self::from_secret_key(secret_key))
    }

    pub fn address(&self) -> Address {
        public_key_to_address(&self.public_key)
    }

    /// Recoverable signature over a 32-byte digest.
    pub fn sign_hash(&self, hash: B256) -> TxSignature {
        let message = Message::from_digest(hash.0);
        let sig = SECP256K1_CONTEXT.sign_ecdsa_recoverable(&message, &self.secret_key);
        let (recovery_id, compact) = sig.serialize_compact();
        let mut bytes = [0u8; 65];
        bytes[..64].copy_from_slice(&compact);
        bytes[64] = recovery_id.to_i32() as u8;
        TxSignature::from_bytes(&bytes)
    }
}

/// Keys held in process memory. Accounts start unlocked; a locked account
/// refuses to sign until unlocked again.
#[derive(Default)]
pub struct LocalWallet {
    keys: RwLock<Vec<KeyPair>>,
    locked: RwLock<HashSet<Address>>,
}

impl LocalWallet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_keys(keys: Vec<KeyPair>) -> Self {
        LocalWallet {
            keys: RwLock::new(keys),
            locked: RwLock::new(HashSet::new()),
        }
    }

    pub fn import(&self, key: KeyPair) -> Account {
        let account = Account::from(key.address());
        let mut keys = self.keys.write();
        if !keys.iter().any(|k| k.address() == account.address) {
            keys.push(key);
        }
        account
    }

    pub fn new_account(&self) -> Account {
        self.import(KeyPair::generate())
    }

    pub fn lock(&self, account: &Account) {
        self.locked.write().insert(account.address);
    }

    pub fn unlock(&self, account: &Account) {
        self.locked.write().remove(&account.address);
    }
}

impl Wallet for LocalWallet {
    fn url(&self) -> String {
        "local://memory".to_string()
    }

    fn accounts(&self) -> Vec<Account> {
        self.keys
            .read()
            .iter()
            .map(|k| Account::from(k.address()))
            .collect()
    }

    fn sign_tx(
        &self,
        account: &Account,
        tx: &TypedTransaction,
        chain_id: u64,
    ) -> Result<SignedTransaction> {
        if self.locked.read().contains(&account.address) {
            return Err(GovError::Account(format!(
                "authentication needed: account {} is locked",
                account.address
            )));
        }
        let keys = self.keys.read();
        let key = keys
            .iter()
            .find(|k| k.address() == account.address)
            .ok_or_else(|| GovError::Account(format!("unknown account {}", account.address)))?;
        let signature = key.sign_hash(tx.signature_hash(chain_id));
        Ok(SignedTransaction::new(tx.clone(), signature, chain_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::LegacyTx;
    use alloy_primitives::{address, U256};

    fn eip155_key() -> KeyPair {
        KeyPair::from_secret_bytes(&[0x46; 32]).unwrap()
    }

    #[test]
    fn test_known_address_derivation() {
        assert_eq!(
            eip155_key().address(),
            address!("9d8a62f656a8d1615c1294fd71e9cfb3e4855a4f")
        );
    }

    #[test]
    fn test_sign_and_recover() {
        let key = KeyPair::generate();
        let hash = keccak256(b"govbridge");
        let sig = key.sign_hash(hash);
        assert_eq!(recover_address(hash, &sig).unwrap(), key.address());
        assert_ne!(
            recover_address(keccak256(b"other"), &sig).unwrap(),
            key.address()
        );
    }

    #[test]
    fn test_wallet_signs_legacy_tx() {
        let wallet = LocalWallet::new();
        let account = wallet.import(eip155_key());
        let tx = TypedTransaction::Legacy(LegacyTx {
            nonce: 9,
            gas_price: U256::from(20_000_000_000u64),
            gas: 21_000,
            to: Some(address!("3535353535353535353535353535353535353535")),
            value: U256::from(1_000_000_000_000_000_000u64),
            data: Default::default(),
        });

        let signed = wallet.sign_tx(&account, &tx, 1).unwrap();
        assert_eq!(
            recover_address(signed.signature_hash(), &signed.signature).unwrap(),
            account.address
        );
        assert_eq!(signed.encoded()[0], 0xf8);

        let signed = wallet.sign_tx(&account, &tx, u64::MAX).unwrap();
        assert_eq!(
            recover_address(signed.signature_hash(), &signed.signature).unwrap(),
            account.address
        );
        assert!(!signed.hash().is_zero());
    }

    #[test]
    fn test_locked_account_refuses() {
        let wallet = LocalWallet::new();
        let account = wallet.new_account();
        let tx = TypedTransaction::Legacy(LegacyTx::default());

        wallet.lock(&account);
        let err = wallet.sign_tx(&account, &tx, 1).unwrap_err();
        assert!(matches!(err, GovError::Account(_)));

        wallet.unlock(&account);
        assert!(wallet.sign_tx(&account, &tx, 1).is_ok());
    }

    #[test]
    fn test_manager_lookup() {
        let empty: Arc<dyn Wallet> = Arc::new(LocalWallet::new());
        let wallet = Arc::new(LocalWallet::new());
        let account = wallet.new_account();
        let manager = AccountManager::new(vec![empty, wallet]);

        assert_eq!(manager.default_account(), Some(account));
        assert!(manager.find(&account).is_ok());
        let stranger = Account::from(Address::repeat_byte(1));
        assert!(matches!(manager.find(&stranger), Err(GovError::Account(_))));
        assert_eq!(AccountManager::default().default_account(), None);
    }

    #[test]
    fn test_from_secret_bytes_invalid_length() {
        let err = KeyPair::from_secret_bytes(&[0u8; SECRET_KEY_SIZE - 1]).unwrap_err();
        assert!(err.to_string().contains("secret key must be"));
    }
}
