use std::path::PathBuf;

use async_trait::async_trait;
use relay_types::{Quote, QuoteId};
use thiserror::Error;
use tracing::warn;

use crate::{memory::InMemoryQuoteStore, QuoteStore};

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("failed to read quote store file {path}: {source}")]
    Read { path: PathBuf, source: std::io::Error },
    #[error("failed to write quote store file {path}: {source}")]
    Write { path: PathBuf, source: std::io::Error },
    #[error("failed to parse quote store file {path}: {source}")]
    Parse { path: PathBuf, source: serde_json::Error },
}

/// File-backed quote store, for the `STORE_URL` config path when operators
/// want quotes to survive a restart without standing up a full KV service.
/// Every mutation snapshots the whole table to disk; this is deliberately
/// simple — quote tables are small (TTL-bounded, single digits of KB) so a
/// full rewrite per mutation is cheap relative to the 30-120s TTL window.
pub struct FileQuoteStore {
    inner: InMemoryQuoteStore,
    path: PathBuf,
}

impl FileQuoteStore {
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, PersistError> {
        let path = path.into();
        let inner = InMemoryQuoteStore::new();

        match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let quotes: Vec<Quote> = serde_json::from_slice(&bytes)
                    .map_err(|source| PersistError::Parse { path: path.clone(), source })?;
                for quote in quotes {
                    inner.put(quote).await;
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(source) => return Err(PersistError::Read { path, source }),
        }

        Ok(Self { inner, path })
    }

    async fn flush(&self) {
        let quotes = self.inner.all();
        if let Ok(bytes) = serde_json::to_vec(&quotes) {
            if let Err(e) = tokio::fs::write(&self.path, bytes).await {
                warn!(path = %self.path.display(), error = %e, "failed to flush quote store to disk");
            }
        }
    }
}

#[async_trait]
impl QuoteStore for FileQuoteStore {
    async fn put(&self, quote: Quote) {
        self.inner.put(quote).await;
        self.flush().await;
    }

    async fn get(&self, id: QuoteId) -> Option<Quote> {
        self.inner.get(id).await
    }

    async fn consume(&self, id: QuoteId) -> Option<Quote> {
        let result = self.inner.consume(id).await;
        if result.is_some() {
            self.flush().await;
        }
        result
    }

    async fn delete(&self, id: QuoteId) {
        self.inner.delete(id).await;
        self.flush().await;
    }

    async fn sweep(&self) {
        self.inner.sweep().await;
        self.flush().await;
    }

    async fn len(&self) -> usize {
        self.inner.len().await
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use chrono::Utc;
    use relay_types::HolderTier;
    use solana_sdk::pubkey::Pubkey;

    use super::*;

    fn sample_quote() -> Quote {
        let now = Utc::now();
        Quote {
            id: QuoteId::new(),
            user_key: Pubkey::from_str("11111111111111111111111111111111").unwrap(),
            payment_mint: Pubkey::from_str("So11111111111111111111111111111111111111112").unwrap(),
            fee_payer_key: Pubkey::from_str("11111111111111111111111111111111").unwrap(),
            fee_amount_native: 100_000,
            fee_amount_payment_token: 1_000,
            created_at: now,
            expires_at: now + chrono::Duration::seconds(60),
            holder_tier: HolderTier::none(),
            compute_unit_estimate: 200_000,
            consumed: false,
        }
    }

    #[tokio::test]
    async fn survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quotes.json");

        let quote = sample_quote();
        let id = quote.id;
        {
            let store = FileQuoteStore::open(&path).await.unwrap();
            store.put(quote).await;
        }

        let reopened = FileQuoteStore::open(&path).await.unwrap();
        assert!(reopened.get(id).await.is_some());
    }
}
