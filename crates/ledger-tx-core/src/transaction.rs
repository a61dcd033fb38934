//! Signable transactions.
//!
//! A [`Signable`] is a header and payload waiting for signatures. It is
//! immutable: every signature operation returns a new value, so partial
//! signatures collected by different parties can be merged in any order.
//!
//! The version is fixed at construction. A header with a sponsor always
//! yields [`Signable::V1`]; without one it yields [`Signable::V0`] unless
//! [`Signable::new_v1`] is used.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::energy::EnergyParams;
use crate::error::{CodecError, Result, SignatureRole};
use crate::finalized::{Finalized, FinalizedV0, FinalizedV1, PreFinalized};
use crate::header::{header_v1_size, HeaderV0, HeaderV1, HEADER_V0_SIZE};
use crate::payload::Payload;
use crate::signature::{SignatureMap, SponsoredSignatures};
use crate::signer::Signer;
use crate::types::{u64_string, AccountAddress};

/// Distinct (credential, key) pairs a signature map can hold.
pub const MAX_SIGNATURE_BOUND: usize = 256 * 256;

fn one() -> usize {
    1
}

/// Account that pays fees on the sender's behalf.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SponsorDetails {
    pub account: AccountAddress,
    /// Upper bound on sponsor signatures.
    #[serde(default = "one")]
    pub num_signatures: usize,
}

/// Transaction metadata known before signing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignableHeader {
    pub sender: AccountAddress,
    #[serde(with = "u64_string")]
    pub nonce: u64,
    /// Unix seconds.
    #[serde(with = "u64_string")]
    pub expiry: u64,
    /// Kind-specific energy, excluding size and signature costs.
    #[serde(with = "u64_string")]
    pub execution_energy: u64,
    /// Upper bound on sender signatures.
    #[serde(default = "one")]
    pub num_signatures: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sponsor: Option<SponsorDetails>,
}

impl SignableHeader {
    fn validate(&self) -> Result<()> {
        if self.num_signatures == 0 {
            return Err(CodecError::InvalidSignatureMap(
                "sender signature bound must be at least 1".into(),
            ));
        }
        if self.sponsor.as_ref().is_some_and(|s| s.num_signatures == 0) {
            return Err(CodecError::InvalidSignatureMap(
                "sponsor signature bound must be at least 1".into(),
            ));
        }
        if self.num_signatures > MAX_SIGNATURE_BOUND || self.sponsor_bound() > MAX_SIGNATURE_BOUND
        {
            return Err(CodecError::InvalidSignatureMap(format!(
                "signature bound exceeds {MAX_SIGNATURE_BOUND}"
            )));
        }
        Ok(())
    }

    fn sponsor_bound(&self) -> usize {
        self.sponsor.as_ref().map_or(0, |s| s.num_signatures)
    }
}

/// Header, payload and signatures collected so far.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignableTx<S> {
    header: SignableHeader,
    payload: Payload,
    /// Energy written into the signed header, derived from the signature bounds.
    #[serde(with = "u64_string")]
    energy: u64,
    #[serde(default)]
    signatures: S,
}

/// A transaction in the signing stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "version")]
pub enum Signable {
    #[serde(rename = "0")]
    V0(SignableTx<SignatureMap>),
    #[serde(rename = "1")]
    V1(SignableTx<SponsoredSignatures>),
}

fn header_size(version: u8, has_sponsor: bool) -> usize {
    match version {
        0 => HEADER_V0_SIZE,
        _ => header_v1_size(has_sponsor),
    }
}

fn bound_energy(
    version: u8,
    header: &SignableHeader,
    payload: &Payload,
    params: &EnergyParams,
) -> Result<u64> {
    Ok(params.total(
        header.num_signatures.saturating_add(header.sponsor_bound()),
        header_size(version, header.sponsor.is_some()),
        payload.size_of()?,
        header.execution_energy,
    ))
}

impl Signable {
    /// Create a signable, choosing V1 iff the header names a sponsor.
    pub fn new(header: SignableHeader, payload: Payload, params: &EnergyParams) -> Result<Self> {
        if header.sponsor.is_some() {
            return Self::new_v1(header, payload, params);
        }
        header.validate()?;
        let energy = bound_energy(0, &header, &payload, params)?;
        Ok(Signable::V0(SignableTx {
            header,
            payload,
            energy,
            signatures: SignatureMap::new(),
        }))
    }

    /// Create a V1 signable, with or without a sponsor.
    pub fn new_v1(header: SignableHeader, payload: Payload, params: &EnergyParams) -> Result<Self> {
        header.validate()?;
        let energy = bound_energy(1, &header, &payload, params)?;
        Ok(Signable::V1(SignableTx {
            header,
            payload,
            energy,
            signatures: SponsoredSignatures::default(),
        }))
    }

    pub fn version(&self) -> u8 {
        match self {
            Signable::V0(_) => 0,
            Signable::V1(_) => 1,
        }
    }

    pub fn header(&self) -> &SignableHeader {
        match self {
            Signable::V0(tx) => &tx.header,
            Signable::V1(tx) => &tx.header,
        }
    }

    pub fn payload(&self) -> &Payload {
        match self {
            Signable::V0(tx) => &tx.payload,
            Signable::V1(tx) => &tx.payload,
        }
    }

    /// Energy computed from the declared signature bounds.
    pub fn estimated_energy(&self) -> u64 {
        match self {
            Signable::V0(tx) => tx.energy,
            Signable::V1(tx) => tx.energy,
        }
    }

    /// Check the stored energy against `params`.
    ///
    /// A signable read from JSON carries whatever energy the file says;
    /// this recomputes it before the value is signed.
    pub fn verify_energy(&self, params: &EnergyParams) -> Result<()> {
        let expected = bound_energy(self.version(), self.header(), self.payload(), params)?;
        let declared = self.estimated_energy();
        if declared != expected {
            return Err(CodecError::EnergyMismatch { declared, expected });
        }
        Ok(())
    }

    pub fn sender_signatures(&self) -> &SignatureMap {
        match self {
            Signable::V0(tx) => &tx.signatures,
            Signable::V1(tx) => &tx.signatures.sender,
        }
    }

    pub fn sponsor_signatures(&self) -> Option<&SignatureMap> {
        match self {
            Signable::V0(_) => None,
            Signable::V1(tx) => tx.signatures.sponsor.as_ref(),
        }
    }

    fn wire_header(&self, energy: u64) -> Result<Vec<u8>> {
        let h = self.header();
        let payload_size = self.payload().size_of()?;
        let bytes = match self {
            Signable::V0(_) => HeaderV0 {
                sender: h.sender,
                nonce: h.nonce,
                energy,
                payload_size,
                expiry: h.expiry,
            }
            .to_bytes(),
            Signable::V1(_) => HeaderV1 {
                sender: h.sender,
                nonce: h.nonce,
                energy,
                payload_size,
                expiry: h.expiry,
                sponsor: h.sponsor.as_ref().map(|s| s.account),
            }
            .to_bytes(),
        };
        Ok(bytes)
    }

    /// SHA-256 over the encoded header and payload. Signatures are never
    /// part of the digest, so every party signs the same bytes.
    pub fn signing_digest(&self) -> Result<[u8; 32]> {
        let mut buf = self.wire_header(self.estimated_energy())?;
        self.payload().encode_to(&mut buf)?;
        Ok(Sha256::digest(&buf).into())
    }

    /// Merge sender signatures into a new signable.
    pub fn add_signature(&self, signatures: &SignatureMap) -> Result<Signable> {
        let merged = self.sender_signatures().merge(signatures)?;
        merged.validate_count(SignatureRole::Sender, self.header().num_signatures)?;
        let mut next = self.clone();
        match &mut next {
            Signable::V0(tx) => tx.signatures = merged,
            Signable::V1(tx) => tx.signatures.sender = merged,
        }
        Ok(next)
    }

    /// Merge sponsor signatures into a new signable.
    pub fn add_sponsor_signature(&self, signatures: &SignatureMap) -> Result<Signable> {
        let tx = match self {
            Signable::V0(_) => return Err(CodecError::VersionMismatch(0, 1)),
            Signable::V1(tx) => tx,
        };
        let bound = match &tx.header.sponsor {
            Some(sponsor) => sponsor.num_signatures,
            None => {
                return Err(CodecError::InvalidSignatureMap(
                    "transaction has no sponsor".into(),
                ))
            }
        };
        let merged = match &tx.signatures.sponsor {
            Some(existing) => existing.merge(signatures)?,
            None => signatures.clone(),
        };
        merged.validate_count(SignatureRole::Sponsor, bound)?;
        let mut next = tx.clone();
        next.signatures.sponsor = Some(merged);
        Ok(Signable::V1(next))
    }

    /// Combine signatures collected independently on the same transaction.
    pub fn merge_signatures(a: &Signable, b: &Signable) -> Result<Signable> {
        if a.version() != b.version() {
            return Err(CodecError::VersionMismatch(a.version(), b.version()));
        }
        if a.header() != b.header()
            || a.payload() != b.payload()
            || a.estimated_energy() != b.estimated_energy()
        {
            return Err(CodecError::InvalidSignatureMap(
                "cannot merge signatures of different transactions".into(),
            ));
        }
        let mut merged = a.add_signature(b.sender_signatures())?;
        if let Some(sponsor) = b.sponsor_signatures() {
            merged = merged.add_sponsor_signature(sponsor)?;
        }
        Ok(merged)
    }

    /// Sign as the sender.
    pub async fn sign(&self, signer: &dyn Signer) -> Result<Signable> {
        let digest = self.signing_digest()?;
        let signatures = signer.sign(&digest).await?;
        self.add_signature(&signatures)
    }

    /// Sign as the sponsor. Uses the same digest as [`Signable::sign`].
    pub async fn sponsor(&self, signer: &dyn Signer) -> Result<Signable> {
        let digest = self.signing_digest()?;
        let signatures = signer.sign(&digest).await?;
        self.add_sponsor_signature(&signatures)
    }

    /// Lock the header energy to the signatures actually present.
    pub fn pre_finalize(&self, params: &EnergyParams) -> Result<PreFinalized> {
        let h = self.header();
        let signature_count = self.sender_signatures().count()
            + self.sponsor_signatures().map_or(0, SignatureMap::count);
        let payload_size = self.payload().size_of()?;
        let energy = params.total(
            signature_count,
            header_size(self.version(), h.sponsor.is_some()),
            payload_size,
            h.execution_energy,
        );
        let finalized = match self {
            Signable::V0(tx) => Finalized::V0(FinalizedV0 {
                header: HeaderV0 {
                    sender: h.sender,
                    nonce: h.nonce,
                    energy,
                    payload_size,
                    expiry: h.expiry,
                },
                payload: tx.payload.clone(),
                signatures: tx.signatures.clone(),
            }),
            Signable::V1(tx) => Finalized::V1(FinalizedV1 {
                header: HeaderV1 {
                    sender: h.sender,
                    nonce: h.nonce,
                    energy,
                    payload_size,
                    expiry: h.expiry,
                    sponsor: h.sponsor.as_ref().map(|s| s.account),
                },
                payload: tx.payload.clone(),
                signatures: tx.signatures.clone(),
            }),
        };
        Ok(PreFinalized::new(finalized))
    }

    /// Pre-finalize and check that the required signatures are present.
    pub fn finalize(&self, params: &EnergyParams) -> Result<Finalized> {
        self.pre_finalize(params)?.finalize()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse and check bounds, signatures and energy floor.
    ///
    /// The exact energy depends on the caller's [`EnergyParams`]; use
    /// [`Signable::verify_energy`] to check it.
    pub fn from_json(json: &str) -> Result<Self> {
        let signable: Signable = serde_json::from_str(json)?;
        signable.header().validate()?;
        let energy = signable.estimated_energy();
        if energy == 0 || energy < signable.header().execution_energy {
            return Err(CodecError::EnergyMismatch {
                declared: energy,
                expected: signable.header().execution_energy.max(1),
            });
        }
        if let Signable::V0(tx) = &signable {
            if tx.header.sponsor.is_some() {
                return Err(CodecError::VersionMismatch(0, 1));
            }
        }
        signable
            .sender_signatures()
            .validate_count(SignatureRole::Sender, signable.header().num_signatures)?;
        if let Some(sponsor) = signable.sponsor_signatures() {
            if signable.header().sponsor.is_none() {
                return Err(CodecError::InvalidSignatureMap(
                    "transaction has no sponsor".into(),
                ));
            }
            sponsor.validate_count(SignatureRole::Sponsor, signable.header().sponsor_bound())?;
        }
        Ok(signable)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Builder
// ─────────────────────────────────────────────────────────────────────────────

/// Builder for [`Signable`].
///
/// Execution energy defaults to the payload's kind-specific cost. Contract
/// payloads have no such cost and must set it explicitly.
#[derive(Debug, Clone)]
pub struct TransactionBuilder {
    payload: Payload,
    sender: Option<AccountAddress>,
    nonce: Option<u64>,
    expiry: Option<u64>,
    execution_energy: Option<u64>,
    num_signatures: usize,
    sponsor: Option<SponsorDetails>,
}

impl TransactionBuilder {
    pub fn new(payload: impl Into<Payload>) -> Self {
        Self {
            payload: payload.into(),
            sender: None,
            nonce: None,
            expiry: None,
            execution_energy: None,
            num_signatures: 1,
            sponsor: None,
        }
    }

    pub fn sender(mut self, sender: AccountAddress) -> Self {
        self.sender = Some(sender);
        self
    }

    pub fn nonce(mut self, nonce: u64) -> Self {
        self.nonce = Some(nonce);
        self
    }

    /// Expiry in unix seconds.
    pub fn expiry(mut self, expiry: u64) -> Self {
        self.expiry = Some(expiry);
        self
    }

    pub fn execution_energy(mut self, energy: u64) -> Self {
        self.execution_energy = Some(energy);
        self
    }

    /// Allow up to `n` sender signatures.
    pub fn multi_sig(mut self, n: usize) -> Self {
        self.num_signatures = n;
        self
    }

    /// Have `account` pay fees, signing with up to `num_signatures` keys.
    pub fn sponsor(mut self, account: AccountAddress, num_signatures: usize) -> Self {
        self.sponsor = Some(SponsorDetails {
            account,
            num_signatures,
        });
        self
    }

    pub fn build(self, params: &EnergyParams) -> Result<Signable> {
        let sender = self.sender.ok_or(CodecError::Incomplete("sender"))?;
        let nonce = self.nonce.ok_or(CodecError::Incomplete("nonce"))?;
        let expiry = self.expiry.ok_or(CodecError::Incomplete("expiry"))?;
        let execution_energy = match self.execution_energy {
            Some(energy) => energy,
            None if self.payload.kind().needs_execution_energy() => {
                return Err(CodecError::Incomplete("execution energy"))
            }
            None => self.payload.specific_cost(params)?.unwrap_or_default(),
        };
        let header = SignableHeader {
            sender,
            nonce,
            expiry,
            execution_energy,
            num_signatures: self.num_signatures,
            sponsor: self.sponsor,
        };
        Signable::new(header, self.payload, params)
    }
}
