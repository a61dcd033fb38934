//! In-memory node.
//!
//! Decodes every block item it receives and enforces nonce order per
//! sender. Accepted transactions are kept by hash. Resending an accepted
//! transaction returns its hash again.

use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use tokio::sync::RwLock;

use ledger_tx_core::{AccountAddress, Finalized, TransactionHash};

use crate::client::{NetworkClient, Rejected};

/// In-memory [`NetworkClient`] for tests.
pub struct MemoryNode {
    inner: RwLock<NodeState>,
}

#[derive(Default)]
struct NodeState {
    /// Next expected nonce per account. Absent means 1.
    nonces: HashMap<AccountAddress, u64>,
    accepted: HashMap<TransactionHash, Finalized>,
    /// Number of upcoming sends that fail transiently.
    pending_failures: u32,
}

impl MemoryNode {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(NodeState::default()),
        }
    }

    /// Make the next `n` sends fail with a transient error.
    pub async fn inject_failures(&self, n: u32) {
        self.inner.write().await.pending_failures = n;
    }

    pub async fn set_nonce(&self, account: AccountAddress, nonce: u64) {
        self.inner.write().await.nonces.insert(account, nonce);
    }

    pub async fn accepted(&self, hash: &TransactionHash) -> Option<Finalized> {
        self.inner.read().await.accepted.get(hash).cloned()
    }

    pub async fn accepted_count(&self) -> usize {
        self.inner.read().await.accepted.len()
    }
}

impl Default for MemoryNode {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NetworkClient for MemoryNode {
    async fn next_account_nonce(&self, account: &AccountAddress) -> anyhow::Result<u64> {
        Ok(self
            .inner
            .read()
            .await
            .nonces
            .get(account)
            .copied()
            .unwrap_or(1))
    }

    async fn send_block_item(&self, item: &[u8]) -> anyhow::Result<TransactionHash> {
        let mut inner = self.inner.write().await;

        if inner.pending_failures > 0 {
            inner.pending_failures -= 1;
            anyhow::bail!("node unavailable");
        }

        let tx = Finalized::from_block_item(item)
            .map_err(|e| Rejected(format!("malformed block item: {e}")))?;
        let hash = tx.hash().map_err(|e| Rejected(e.to_string()))?;
        if inner.accepted.contains_key(&hash) {
            return Ok(hash);
        }

        let now = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs();
        if tx.expiry() < now {
            return Err(Rejected(format!("expired at {}", tx.expiry())).into());
        }

        let expected = inner.nonces.get(tx.sender()).copied().unwrap_or(1);
        if tx.nonce() != expected {
            return Err(Rejected(format!(
                "nonce {} for {}, expected {expected}",
                tx.nonce(),
                tx.sender()
            ))
            .into());
        }

        inner.nonces.insert(*tx.sender(), expected + 1);
        inner.accepted.insert(hash, tx);
        Ok(hash)
    }
}
