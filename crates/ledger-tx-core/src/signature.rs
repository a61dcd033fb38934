//! Credential signature maps.
//!
//! An account signs with one or more credentials, each holding one or more
//! keys. A [`SignatureMap`] records signatures by `(credential, key)` index.
//! Maps are values: merging builds a new map and never touches its inputs.
//!
//! Wire form (indices ascending):
//!
//! ```text
//! count(u8) || { cred(u8) || key_count(u8) || { key(u8) || len(u16) || sig } }
//! ```

use bytes::BufMut;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::{CodecError, Result, SignatureRole};
use crate::types::hex_bytes;
use crate::wire::{put_u16_prefixed, Cursor};

/// Raw signature bytes produced by a credential key.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Signature(#[serde(with = "hex_bytes")] pub Vec<u8>);

impl Signature {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hex = self.to_hex();
        write!(f, "Signature({}...)", &hex[..hex.len().min(16)])
    }
}

impl From<Vec<u8>> for Signature {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl From<[u8; 64]> for Signature {
    fn from(bytes: [u8; 64]) -> Self {
        Self(bytes.to_vec())
    }
}

/// Signatures of one credential, by key index.
pub type CredentialSignatures = BTreeMap<u8, Signature>;

/// Signatures of one account, by credential index then key index.
///
/// JSON form: `{"<cred>": {"<key>": "<hex>"}}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SignatureMap(BTreeMap<u8, CredentialSignatures>);

// Keys are read as strings so the map also deserializes when buffered inside
// a tagged enum, where integer keys are not coerced.
impl<'de> Deserialize<'de> for SignatureMap {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        fn index<E: serde::de::Error>(s: &str) -> std::result::Result<u8, E> {
            s.parse()
                .map_err(|_| E::custom(format!("invalid signature index {s:?}")))
        }

        let raw = BTreeMap::<String, BTreeMap<String, Signature>>::deserialize(deserializer)?;
        let mut map = BTreeMap::new();
        for (cred, keys) in raw {
            let keys = keys
                .into_iter()
                .map(|(key, sig)| Ok((index(&key)?, sig)))
                .collect::<std::result::Result<CredentialSignatures, D::Error>>()?;
            map.insert(index(&cred)?, keys);
        }
        Ok(Self(map))
    }
}

impl SignatureMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// A map holding a single signature.
    pub fn single(credential: u8, key: u8, signature: impl Into<Signature>) -> Self {
        let mut map = Self::new();
        map.0
            .entry(credential)
            .or_default()
            .insert(key, signature.into());
        map
    }

    /// Insert a signature, failing if the slot is taken.
    pub fn insert(&mut self, credential: u8, key: u8, signature: impl Into<Signature>) -> Result<()> {
        let keys = self.0.entry(credential).or_default();
        if keys.contains_key(&key) {
            return Err(CodecError::DuplicateSignature { credential, key });
        }
        keys.insert(key, signature.into());
        Ok(())
    }

    pub fn get(&self, credential: u8, key: u8) -> Option<&Signature> {
        self.0.get(&credential)?.get(&key)
    }

    /// Total number of `(credential, key)` signatures.
    pub fn count(&self) -> usize {
        self.0.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// Iterate `(credential, key, signature)` in index order.
    pub fn iter(&self) -> impl Iterator<Item = (u8, u8, &Signature)> + '_ {
        self.0
            .iter()
            .flat_map(|(cred, keys)| keys.iter().map(move |(key, sig)| (*cred, *key, sig)))
    }

    /// Union of two maps. Any slot present in both is a [`CodecError::DuplicateSignature`],
    /// even when the signatures are equal.
    pub fn merge(&self, other: &SignatureMap) -> Result<SignatureMap> {
        let mut merged = self.clone();
        for (cred, key, sig) in other.iter() {
            merged.insert(cred, key, sig.clone())?;
        }
        Ok(merged)
    }

    /// Check the signature count against the declared bound for `role`.
    pub fn validate_count(&self, role: SignatureRole, allowed: usize) -> Result<()> {
        let count = self.count();
        if count > allowed {
            return Err(CodecError::SignatureBoundExceeded {
                role,
                count,
                allowed,
            });
        }
        Ok(())
    }

    pub fn encode_to(&self, buf: &mut Vec<u8>) -> Result<()> {
        let creds = u8::try_from(self.0.len())
            .map_err(|_| CodecError::InvalidSignatureMap("more than 255 credentials".into()))?;
        if creds == 0 {
            return Err(CodecError::InvalidSignatureMap("no signatures".into()));
        }
        buf.put_u8(creds);
        for (cred, keys) in &self.0 {
            let count = u8::try_from(keys.len()).map_err(|_| {
                CodecError::InvalidSignatureMap(format!("credential {cred}: more than 255 keys"))
            })?;
            if count == 0 {
                return Err(CodecError::InvalidSignatureMap(format!(
                    "credential {cred} has no signatures"
                )));
            }
            buf.put_u8(*cred);
            buf.put_u8(count);
            for (key, sig) in keys {
                buf.put_u8(*key);
                put_u16_prefixed(buf, &sig.0)?;
            }
        }
        Ok(())
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.encode_to(&mut buf)?;
        Ok(buf)
    }

    pub fn decode(cursor: &mut Cursor<'_>) -> Result<Self> {
        let creds = cursor.read_u8()?;
        if creds == 0 {
            return Err(CodecError::InvalidSignatureMap("zero credentials".into()));
        }
        let mut map = BTreeMap::new();
        let mut last_cred = None;
        for _ in 0..creds {
            let cred = cursor.read_u8()?;
            if last_cred.is_some_and(|last| cred <= last) {
                return Err(CodecError::InvalidSignatureMap(format!(
                    "credential index {cred} out of order"
                )));
            }
            last_cred = Some(cred);

            let count = cursor.read_u8()?;
            if count == 0 {
                return Err(CodecError::InvalidSignatureMap(format!(
                    "credential {cred} has zero keys"
                )));
            }
            let mut keys = BTreeMap::new();
            let mut last_key = None;
            for _ in 0..count {
                let key = cursor.read_u8()?;
                if last_key.is_some_and(|last| key <= last) {
                    return Err(CodecError::InvalidSignatureMap(format!(
                        "credential {cred}: key index {key} out of order"
                    )));
                }
                last_key = Some(key);
                keys.insert(key, Signature(cursor.read_u16_prefixed()?.to_vec()));
            }
            map.insert(cred, keys);
        }
        Ok(Self(map))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut cursor = Cursor::new(bytes);
        let map = Self::decode(&mut cursor)?;
        cursor.finish()?;
        Ok(map)
    }
}

impl FromIterator<(u8, u8, Signature)> for SignatureMap {
    /// Later entries for the same slot replace earlier ones.
    fn from_iter<I: IntoIterator<Item = (u8, u8, Signature)>>(iter: I) -> Self {
        let mut map = BTreeMap::<u8, CredentialSignatures>::new();
        for (cred, key, sig) in iter {
            map.entry(cred).or_default().insert(key, sig);
        }
        Self(map)
    }
}

/// Signatures of a V1 transaction: the sender's and an optional sponsor's.
///
/// Wire form: `sender_map || 0x00` or `sender_map || 0x01 || sponsor_map`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SponsoredSignatures {
    pub sender: SignatureMap,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sponsor: Option<SignatureMap>,
}

impl SponsoredSignatures {
    pub fn encode_to(&self, buf: &mut Vec<u8>) -> Result<()> {
        self.sender.encode_to(buf)?;
        match &self.sponsor {
            Some(sponsor) => {
                buf.put_u8(1);
                sponsor.encode_to(buf)
            }
            None => {
                buf.put_u8(0);
                Ok(())
            }
        }
    }

    pub fn decode(cursor: &mut Cursor<'_>) -> Result<Self> {
        let sender = SignatureMap::decode(cursor)?;
        let sponsor = match cursor.read_u8()? {
            0 => None,
            1 => Some(SignatureMap::decode(cursor)?),
            flag => {
                return Err(CodecError::InvalidSignatureMap(format!(
                    "invalid sponsor flag {flag}"
                )))
            }
        };
        Ok(Self { sender, sponsor })
    }
}
