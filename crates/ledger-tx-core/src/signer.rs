//! Signing capability.
//!
//! The codec never touches key material directly. It hands the signing
//! digest to a [`Signer`] and merges whatever [`SignatureMap`] comes back.
//! [`AccountKeys`] is the bundled ed25519 implementation.

use async_trait::async_trait;
use ed25519_dalek::{Signature as DalekSignature, Signer as _, SigningKey, Verifier, VerifyingKey};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::{CodecError, Result};
use crate::signature::{Signature, SignatureMap};

/// Something that can sign a transaction digest on behalf of an account.
///
/// Implementations may be remote (a wallet, an HSM) and therefore async.
/// Concurrent calls carry no ordering guarantee.
#[async_trait]
pub trait Signer: Send + Sync {
    /// Number of signatures [`Signer::sign`] produces. Used to size the
    /// signature bound before signing.
    fn signature_count(&self) -> usize;

    /// Sign a 32-byte transaction digest.
    async fn sign(&self, digest: &[u8]) -> Result<SignatureMap>;
}

/// Ed25519 keys of one account, by credential index then key index.
#[derive(Clone, Default)]
pub struct AccountKeys {
    keys: BTreeMap<u8, BTreeMap<u8, SigningKey>>,
}

impl AccountKeys {
    pub fn new() -> Self {
        Self::default()
    }

    /// A single key at credential 0, key 0, derived from a 32-byte seed.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        let mut keys = Self::new();
        keys.insert(0, 0, SigningKey::from_bytes(seed));
        keys
    }

    /// A single freshly generated key at credential 0, key 0.
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let mut keys = Self::new();
        keys.insert(0, 0, SigningKey::generate(&mut rng));
        keys
    }

    /// Add or replace a key.
    pub fn insert(&mut self, credential: u8, key: u8, signing_key: SigningKey) {
        self.keys
            .entry(credential)
            .or_default()
            .insert(key, signing_key);
    }

    pub fn with_key(mut self, credential: u8, key: u8, seed: &[u8; 32]) -> Self {
        self.insert(credential, key, SigningKey::from_bytes(seed));
        self
    }

    /// Public key bytes by `(credential, key)`.
    pub fn public_keys(&self) -> BTreeMap<(u8, u8), [u8; 32]> {
        self.keys
            .iter()
            .flat_map(|(cred, keys)| {
                keys.iter()
                    .map(move |(key, sk)| ((*cred, *key), sk.verifying_key().to_bytes()))
            })
            .collect()
    }

    /// Sign synchronously with every key.
    pub fn sign_digest(&self, digest: &[u8]) -> SignatureMap {
        self.keys
            .iter()
            .flat_map(|(cred, keys)| {
                keys.iter()
                    .map(move |(key, sk)| (*cred, *key, Signature::from(sk.sign(digest).to_bytes())))
            })
            .collect()
    }

    /// Check that every signature in `signatures` verifies against the
    /// matching key.
    pub fn verify(&self, digest: &[u8], signatures: &SignatureMap) -> Result<()> {
        for (cred, key, sig) in signatures.iter() {
            let signing_key = self
                .keys
                .get(&cred)
                .and_then(|keys| keys.get(&key))
                .ok_or_else(|| CodecError::Signer(format!("no key at ({cred}, {key})")))?;
            verify_ed25519(&signing_key.verifying_key().to_bytes(), digest, sig.as_bytes())?;
        }
        Ok(())
    }
}

/// Verify a raw ed25519 signature.
pub fn verify_ed25519(public_key: &[u8; 32], message: &[u8], signature: &[u8]) -> Result<()> {
    let verifying_key = VerifyingKey::from_bytes(public_key)
        .map_err(|_| CodecError::Signer("invalid public key".into()))?;
    let signature = DalekSignature::from_slice(signature)
        .map_err(|_| CodecError::Signer("signature must be 64 bytes".into()))?;
    verifying_key
        .verify(message, &signature)
        .map_err(|_| CodecError::Signer("signature verification failed".into()))
}

#[async_trait]
impl Signer for AccountKeys {
    fn signature_count(&self) -> usize {
        self.keys.values().map(BTreeMap::len).sum()
    }

    async fn sign(&self, digest: &[u8]) -> Result<SignatureMap> {
        if self.keys.is_empty() {
            return Err(CodecError::Signer("no signing keys".into()));
        }
        Ok(self.sign_digest(digest))
    }
}

impl fmt::Debug for AccountKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slots: Vec<_> = self.public_keys().into_keys().collect();
        write!(f, "AccountKeys({:?})", slots)
    }
}
