//! End-to-end submission against the in-memory node.
//!
//! Each test builds real ed25519-signed transactions, sends them through a
//! `Submitter`, and checks what the node accepted.

use std::sync::Once;

use ledger_tx::core::payload::{RegisterData, TokenUpdate};
use ledger_tx::core::token::{CborAccountAddress, TokenAmount, TokenId, TokenOperation};
use ledger_tx::core::SignatureMap;
use ledger_tx::{
    EnergyParams, MemoryNode, NetworkClient, Payload, SubmitConfig, SubmitError, Submitter,
    TransactionBuilder,
};
use ledger_tx_testkit::fixtures::{multi_party_fixtures, TestFixture};

static TRACING: Once = Once::new();

fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_test_writer()
            .with_max_level(tracing::Level::DEBUG)
            .try_init();
    });
}

fn submitter() -> Submitter<MemoryNode> {
    init_tracing();
    Submitter::new(
        MemoryNode::new(),
        SubmitConfig {
            retry_backoff_ms: 1,
            ..SubmitConfig::default()
        },
    )
}

#[tokio::test]
async fn test_sequential_transfers_advance_nonce() {
    let submitter = submitter();
    let parties = multi_party_fixtures(2);
    let (alice, bob) = (&parties[0], &parties[1]);

    for amount in 1..=3u64 {
        submitter
            .transfer(alice.address, &alice.keys, bob.address, amount)
            .await
            .unwrap();
    }

    let node = submitter.client();
    assert_eq!(node.accepted_count().await, 3);
    assert_eq!(node.next_account_nonce(&alice.address).await.unwrap(), 4);
    assert_eq!(node.next_account_nonce(&bob.address).await.unwrap(), 1);
}

#[tokio::test]
async fn test_accepted_transaction_verifies() {
    let submitter = submitter();
    let alice = TestFixture::with_seed([0x11; 32]);
    let bob = TestFixture::with_seed([0x22; 32]);

    let hash = submitter
        .transfer(alice.address, &alice.keys, bob.address, 1_000)
        .await
        .unwrap();
    let tx = submitter.client().accepted(&hash).await.unwrap();

    // Re-derive the digest the sender signed from the accepted header.
    let signable = TransactionBuilder::new(tx.payload().clone())
        .sender(*tx.sender())
        .nonce(tx.nonce())
        .expiry(tx.expiry())
        .build(&EnergyParams::default())
        .unwrap();
    assert_eq!(signable.estimated_energy(), tx.energy());
    alice
        .keys
        .verify(&signable.signing_digest().unwrap(), tx.sender_signatures())
        .unwrap();
}

#[tokio::test]
async fn test_submit_token_update() {
    let submitter = submitter();
    let issuer = TestFixture::with_seed([0x33; 32]);
    let holder = TestFixture::with_seed([0x44; 32]);

    let update = TokenUpdate::new(
        TokenId::new("DKK").unwrap(),
        &[
            TokenOperation::Mint {
                amount: TokenAmount::from_parts(500, 2),
            },
            TokenOperation::Transfer {
                amount: TokenAmount::from_parts(250, 2),
                recipient: CborAccountAddress::new(holder.address),
                memo: None,
            },
        ],
    )
    .unwrap();

    let hash = submitter
        .submit(issuer.address, &issuer.keys, TransactionBuilder::new(update))
        .await
        .unwrap();
    let tx = submitter.client().accepted(&hash).await.unwrap();
    match tx.payload() {
        Payload::TokenUpdate(body) => assert_eq!(body.operations().unwrap().len(), 2),
        other => panic!("unexpected payload {other:?}"),
    }
}

#[tokio::test]
async fn test_sponsored_submission() {
    let submitter = submitter();
    let params = submitter.config().energy.clone();
    let user = TestFixture::with_seed([0x55; 32]);
    let sponsor = TestFixture::with_seed([0x66; 32]);

    let signable = TransactionBuilder::new(RegisterData::new(b"hello".to_vec()).unwrap())
        .sender(user.address)
        .nonce(1)
        .expiry(u64::MAX)
        .sponsor(sponsor.address, 1)
        .build(&params)
        .unwrap();

    // Sender and sponsor sign independently; the partial results are merged.
    let by_user = signable.sign(&user.keys).await.unwrap();
    let by_sponsor = signable.sponsor(&sponsor.keys).await.unwrap();
    let merged = ledger_tx::Signable::merge_signatures(&by_sponsor, &by_user).unwrap();
    let tx = merged.finalize(&params).unwrap();

    let hash = submitter.submit_finalized(&tx).await.unwrap();
    let accepted = submitter.client().accepted(&hash).await.unwrap();
    assert_eq!(accepted.sponsor(), Some(&sponsor.address));
    assert_eq!(accepted.block_item_kind().to_u8(), 3);
}

#[tokio::test]
async fn test_retry_then_success() {
    let submitter = submitter();
    submitter.client().inject_failures(2).await;
    let parties = multi_party_fixtures(2);

    let hash = submitter
        .transfer(parties[0].address, &parties[0].keys, parties[1].address, 9)
        .await
        .unwrap();
    assert!(submitter.client().accepted(&hash).await.is_some());
}

#[tokio::test]
async fn test_unsigned_transaction_never_sent() {
    let submitter = submitter();
    let params = EnergyParams::default();
    let parties = multi_party_fixtures(1);

    let signable = TransactionBuilder::new(RegisterData::new(vec![1]).unwrap())
        .sender(parties[0].address)
        .nonce(1)
        .expiry(u64::MAX)
        .build(&params)
        .unwrap()
        .add_signature(&SignatureMap::new())
        .unwrap();
    let err = signable.finalize(&params).unwrap_err();
    assert!(matches!(
        SubmitError::from(err),
        SubmitError::Codec(ledger_tx::core::CodecError::MissingSignature(_))
    ));
    assert_eq!(submitter.client().accepted_count().await, 0);
}

#[tokio::test]
async fn test_presigned_batch_in_order() {
    let submitter = submitter();
    let parties = multi_party_fixtures(2);
    let (alice, bob) = (&parties[0], &parties[1]);

    let mut hashes = Vec::new();
    for nonce in 1..=2 {
        let tx = alice.signed_transfer(nonce, bob.address, 10 * nonce).await.unwrap();
        hashes.push(submitter.submit_finalized(&tx).await.unwrap());
    }
    assert_ne!(hashes[0], hashes[1]);

    // Out of order: nonce 4 while the node expects 3.
    let skipped = alice.signed_transfer(4, bob.address, 1).await.unwrap();
    assert!(matches!(
        submitter.submit_finalized(&skipped).await,
        Err(SubmitError::Rejected(_))
    ));
}
