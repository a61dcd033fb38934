//! Test fixtures and helpers.
//!
//! Sample accounts, a signer that returns canned signatures, and an
//! account fixture that builds signed transactions in one call.

use async_trait::async_trait;

use ledger_tx_core::payload::Transfer;
use ledger_tx_core::{
    AccountAddress, AccountKeys, EnergyParams, Finalized, Result, Signable, Signature,
    SignatureMap, Signer, TransactionBuilder,
};

/// Base58 sender of the reference vectors.
pub const SENDER: &str = "3VwCfvVskERFAJ3GeJy2mNFrzfChqUymSJJCvoLAP9rtAwMGYt";
/// Base58 recipient (and sponsor) of the reference vectors.
pub const RECIPIENT: &str = "4ZJBYQbVp3zVZyjCXfZAAYBVkJMyVj8UKUNj9ox5YqTCBdBq2M";
/// Expiry of the reference vectors, 2023-11-14T22:13:20Z.
pub const EXPIRY: u64 = 1_700_000_000;
/// Expiry used by [`TestFixture`], 2100-01-01T00:00:00Z.
pub const FAR_EXPIRY: u64 = 4_102_444_800;
/// Amount of the reference transfer, in micro-units.
pub const AMOUNT: u64 = 1_000_000;

/// Sender signature of the reference vectors.
pub const SENDER_SIGNATURE: &str = "893f2e4a230bcbeee24675454c4ca95a2f55fd33f328958b626c6fa368341e07902c9ffe7864c3bee23b2b2300ed0922eb814ea41fdee25035be8cddc5c3980f";
/// Sponsor signature of the reference vectors.
pub const SPONSOR_SIGNATURE: &str = "620d859224c40160c2bb03dbe84e9f57b8ed17f1a5df28b4e21f10658992531ef27655e6b74b8e47923e1ccb0413d563205e8b6c0cd22b3adce5dc7dc1daf603";

fn decode_address(s: &str) -> AccountAddress {
    match AccountAddress::from_base58(s) {
        Ok(addr) => addr,
        Err(e) => panic!("invalid fixture address {s}: {e}"),
    }
}

fn decode_signature(s: &str) -> Signature {
    match hex::decode(s) {
        Ok(bytes) => Signature(bytes),
        Err(e) => panic!("invalid fixture signature: {e}"),
    }
}

pub fn sender() -> AccountAddress {
    decode_address(SENDER)
}

pub fn recipient() -> AccountAddress {
    decode_address(RECIPIENT)
}

/// The reference transfer payload.
pub fn transfer() -> Transfer {
    Transfer {
        to: recipient(),
        amount: AMOUNT,
    }
}

/// Builder for the reference transfer at nonce 1.
pub fn transfer_builder() -> TransactionBuilder {
    TransactionBuilder::new(transfer())
        .sender(sender())
        .nonce(1)
        .expiry(EXPIRY)
}

/// A signer that returns the same signatures for every digest.
#[derive(Debug, Clone)]
pub struct FixedSigner {
    signatures: SignatureMap,
}

impl FixedSigner {
    pub fn new(signatures: SignatureMap) -> Self {
        Self { signatures }
    }

    /// Signs as the reference sender at credential 0, key 0.
    pub fn sender() -> Self {
        Self::new(SignatureMap::single(0, 0, decode_signature(SENDER_SIGNATURE)))
    }

    /// Signs as the reference sponsor at credential 0, key 0.
    pub fn sponsor() -> Self {
        Self::new(SignatureMap::single(0, 0, decode_signature(SPONSOR_SIGNATURE)))
    }
}

#[async_trait]
impl Signer for FixedSigner {
    fn signature_count(&self) -> usize {
        self.signatures.count()
    }

    async fn sign(&self, _digest: &[u8]) -> Result<SignatureMap> {
        Ok(self.signatures.clone())
    }
}

/// An account with real keys, for end-to-end tests.
pub struct TestFixture {
    pub keys: AccountKeys,
    pub address: AccountAddress,
}

impl TestFixture {
    /// Create a fixture with a random key and address.
    pub fn new() -> Self {
        Self::with_seed(rand::random())
    }

    /// Create a fixture whose key and address derive from `seed`.
    pub fn with_seed(seed: [u8; 32]) -> Self {
        let keys = AccountKeys::from_seed(&seed);
        let address = AccountAddress::from_bytes(ledger_tx_core::TransactionHash::hash(&seed).0);
        Self { keys, address }
    }

    /// An unsigned transfer from this account.
    pub fn transfer(&self, nonce: u64, to: AccountAddress, amount: u64) -> Result<Signable> {
        TransactionBuilder::new(Transfer { to, amount })
            .sender(self.address)
            .nonce(nonce)
            .expiry(FAR_EXPIRY)
            .multi_sig(self.keys.signature_count())
            .build(&EnergyParams::default())
    }

    /// A signed, finalized transfer from this account.
    pub async fn signed_transfer(
        &self,
        nonce: u64,
        to: AccountAddress,
        amount: u64,
    ) -> Result<Finalized> {
        self.transfer(nonce, to, amount)?
            .sign(&self.keys)
            .await?
            .finalize(&EnergyParams::default())
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Create fixtures with distinct deterministic keys.
pub fn multi_party_fixtures(count: usize) -> Vec<TestFixture> {
    (0..count)
        .map(|i| {
            let mut seed = [0u8; 32];
            seed[0] = i as u8;
            TestFixture::with_seed(seed)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_addresses() {
        assert_eq!(
            sender().to_hex(),
            "49176df18432686c93c61ca89dafbe1cb383bfe6eb3a301ef8907f852643d98d"
        );
        assert_eq!(recipient().to_base58(), RECIPIENT);
    }

    #[tokio::test]
    async fn test_fixed_signer_end_to_end() {
        let params = EnergyParams::default();
        let tx = transfer_builder()
            .build(&params)
            .unwrap()
            .sign(&FixedSigner::sender())
            .await
            .unwrap()
            .finalize(&params)
            .unwrap();
        assert_eq!(
            tx.hash().unwrap().to_hex(),
            "1977ec066e033034b5c5deda1dcde338b34ee828b8be98850a9d4226206649eb"
        );

        let decoded = Finalized::from_block_item(&tx.to_block_item().unwrap()).unwrap();
        assert_eq!(decoded.payload(), &ledger_tx_core::Payload::from(transfer()));
        let payload_size = transfer_payload_size();
        assert_eq!(
            decoded.energy(),
            params.per_signature
                + params.per_byte * (ledger_tx_core::HEADER_V0_SIZE as u64 + payload_size)
                + params.simple_transfer
        );
        assert_eq!(decoded.energy(), 501);
    }

    fn transfer_payload_size() -> u64 {
        u64::from(ledger_tx_core::Payload::from(transfer()).size_of().unwrap())
    }

    #[tokio::test]
    async fn test_fixture_signatures_verify() {
        let fixture = TestFixture::with_seed([3; 32]);
        let signable = fixture.transfer(1, recipient(), 5).unwrap();
        let signed = signable.sign(&fixture.keys).await.unwrap();
        fixture
            .keys
            .verify(&signable.signing_digest().unwrap(), signed.sender_signatures())
            .unwrap();
    }

    #[test]
    fn test_multi_party() {
        let parties = multi_party_fixtures(3);
        assert_ne!(parties[0].address, parties[1].address);
        assert_ne!(parties[1].address, parties[2].address);
        assert_ne!(parties[0].address, parties[2].address);
    }
}
