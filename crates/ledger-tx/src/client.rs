//! Node client abstraction and the submitter built on it.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use ledger_tx_core::payload::Transfer;
use ledger_tx_core::{
    AccountAddress, EnergyParams, Finalized, Signer, TransactionBuilder, TransactionHash,
};

use crate::error::{Result, SubmitError};

/// Permanent refusal by a node.
///
/// Clients wrap this in their `anyhow::Error` so the submitter can tell it
/// apart from transient transport failures.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct Rejected(pub String);

/// Connection to a node.
#[async_trait]
pub trait NetworkClient: Send + Sync {
    /// Next nonce the node expects from `account`.
    async fn next_account_nonce(&self, account: &AccountAddress) -> anyhow::Result<u64>;

    /// Send an encoded block item, returning the hash the node assigned.
    async fn send_block_item(&self, item: &[u8]) -> anyhow::Result<TransactionHash>;
}

/// Configuration for the [`Submitter`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SubmitConfig {
    /// Seconds from now until a submitted transaction expires.
    pub expiry_window_secs: u64,
    /// Send attempts before giving up.
    pub max_attempts: u32,
    /// Base delay between attempts, multiplied by the attempt number.
    pub retry_backoff_ms: u64,
    pub energy: EnergyParams,
}

impl Default for SubmitConfig {
    fn default() -> Self {
        Self {
            expiry_window_secs: 3600,
            max_attempts: 3,
            retry_backoff_ms: 250,
            energy: EnergyParams::default(),
        }
    }
}

/// Builds, signs, and sends transactions through a [`NetworkClient`].
pub struct Submitter<C: NetworkClient> {
    client: C,
    config: SubmitConfig,
}

impl<C: NetworkClient> Submitter<C> {
    pub fn new(client: C, config: SubmitConfig) -> Self {
        Self { client, config }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn config(&self) -> &SubmitConfig {
        &self.config
    }

    /// Fill in sender, nonce, expiry, and signature bound, then sign with
    /// `signer` and send.
    ///
    /// Sponsored transactions need a second signature; sign those manually
    /// and use [`Submitter::submit_finalized`].
    pub async fn submit(
        &self,
        sender: AccountAddress,
        signer: &dyn Signer,
        builder: TransactionBuilder,
    ) -> Result<TransactionHash> {
        let nonce = self
            .client
            .next_account_nonce(&sender)
            .await
            .map_err(SubmitError::Network)?;
        let expiry = unix_now()?.saturating_add(self.config.expiry_window_secs);

        let signable = builder
            .sender(sender)
            .nonce(nonce)
            .expiry(expiry)
            .multi_sig(signer.signature_count().max(1))
            .build(&self.config.energy)?;
        let finalized = signable.sign(signer).await?.finalize(&self.config.energy)?;

        self.submit_finalized(&finalized).await
    }

    /// Send a simple transfer of `amount` micro-units from `sender` to `to`.
    pub async fn transfer(
        &self,
        sender: AccountAddress,
        signer: &dyn Signer,
        to: AccountAddress,
        amount: u64,
    ) -> Result<TransactionHash> {
        let builder = TransactionBuilder::new(Transfer { to, amount });
        self.submit(sender, signer, builder).await
    }

    /// Send a finalized transaction, retrying transient failures.
    pub async fn submit_finalized(&self, tx: &Finalized) -> Result<TransactionHash> {
        let item = tx.to_block_item()?;
        let hash = tx.hash()?;
        let max_attempts = self.config.max_attempts.max(1);

        let mut attempt = 1;
        loop {
            tracing::debug!(%hash, attempt, bytes = item.len(), "sending block item");
            match self.client.send_block_item(&item).await {
                Ok(accepted) => {
                    tracing::info!(hash = %accepted, sender = %tx.sender(), nonce = tx.nonce(), "transaction accepted");
                    return Ok(accepted);
                }
                Err(err) if err.downcast_ref::<Rejected>().is_some() => {
                    return Err(SubmitError::Rejected(err.to_string()));
                }
                Err(err) if attempt >= max_attempts => {
                    return Err(SubmitError::Exhausted {
                        attempts: attempt,
                        last: err,
                    });
                }
                Err(err) => {
                    tracing::warn!(%hash, attempt, error = %err, "send failed, retrying");
                    let delay = self.config.retry_backoff_ms.saturating_mul(u64::from(attempt));
                    tokio::time::sleep(Duration::from_millis(delay)).await;
                    attempt += 1;
                }
            }
        }
    }
}

fn unix_now() -> Result<u64> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .map_err(|_| SubmitError::Clock)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryNode;
    use ledger_tx_core::AccountKeys;

    fn fast_config() -> SubmitConfig {
        SubmitConfig {
            retry_backoff_ms: 1,
            ..SubmitConfig::default()
        }
    }

    fn addr(byte: u8) -> AccountAddress {
        AccountAddress::from_bytes([byte; 32])
    }

    #[test]
    fn test_config_defaults() {
        let config = SubmitConfig::default();
        assert_eq!(config.expiry_window_secs, 3600);
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.retry_backoff_ms, 250);
    }

    #[test]
    fn test_config_partial_json() {
        let config: SubmitConfig = serde_json::from_str(r#"{"maxAttempts":5}"#).unwrap();
        assert_eq!(config.max_attempts, 5);
        assert_eq!(config.expiry_window_secs, 3600);
        assert_eq!(config.energy, EnergyParams::default());
    }

    #[tokio::test]
    async fn test_transfer_accepted() {
        let keys = AccountKeys::from_seed(&[1u8; 32]);
        let submitter = Submitter::new(MemoryNode::new(), fast_config());

        let hash = submitter.transfer(addr(1), &keys, addr(2), 42).await.unwrap();
        let tx = submitter.client().accepted(&hash).await.unwrap();
        assert_eq!(tx.nonce(), 1);
        assert_eq!(submitter.client().next_account_nonce(&addr(1)).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_retries_transient_failures() {
        let keys = AccountKeys::from_seed(&[1u8; 32]);
        let node = MemoryNode::new();
        node.inject_failures(2).await;
        let submitter = Submitter::new(node, fast_config());

        let hash = submitter.transfer(addr(1), &keys, addr(2), 42).await.unwrap();
        assert!(submitter.client().accepted(&hash).await.is_some());
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let keys = AccountKeys::from_seed(&[1u8; 32]);
        let node = MemoryNode::new();
        node.inject_failures(3).await;
        let submitter = Submitter::new(node, fast_config());

        let result = submitter.transfer(addr(1), &keys, addr(2), 42).await;
        assert!(matches!(result, Err(SubmitError::Exhausted { attempts: 3, .. })));
        assert_eq!(submitter.client().accepted_count().await, 0);
    }

    #[tokio::test]
    async fn test_rejection_not_retried() {
        let keys = AccountKeys::from_seed(&[1u8; 32]);
        let submitter = Submitter::new(MemoryNode::new(), fast_config());
        submitter.transfer(addr(1), &keys, addr(2), 1).await.unwrap();

        // Replaying nonce 1 after it was consumed.
        let signable = TransactionBuilder::new(Transfer { to: addr(2), amount: 2 })
            .sender(addr(1))
            .nonce(1)
            .expiry(u64::MAX)
            .build(&EnergyParams::default())
            .unwrap();
        let tx = signable
            .sign(&keys)
            .await
            .unwrap()
            .finalize(&EnergyParams::default())
            .unwrap();
        let result = submitter.submit_finalized(&tx).await;
        assert!(matches!(result, Err(SubmitError::Rejected(_))));
    }
}
