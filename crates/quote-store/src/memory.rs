use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use relay_types::{Quote, QuoteId};
use tracing::instrument;

use crate::QuoteStore;

/// Single-process quote store. The `Mutex` makes `consume` linearizable for
/// free: both the read and the removal happen while holding the lock, so
/// two racing submits for the same `quote_id` can never both see `Some`.
#[derive(Default)]
pub struct InMemoryQuoteStore {
    quotes: Mutex<HashMap<QuoteId, Quote>>,
}

impl InMemoryQuoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn sweep_locked(quotes: &mut HashMap<QuoteId, Quote>) {
        let now = Utc::now();
        let before = quotes.len();
        quotes.retain(|_, q| !q.is_expired_at(now));
        let removed = before - quotes.len();
        if removed > 0 {
            metrics::counter!("relayer.quote_store.swept", removed as u64);
        }
    }
}

#[async_trait]
impl QuoteStore for InMemoryQuoteStore {
    #[instrument(skip(self, quote), fields(quote_id = %quote.id))]
    async fn put(&self, quote: Quote) {
        let mut quotes = self.quotes.lock();
        quotes.insert(quote.id, quote);
        metrics::gauge!("relayer.quote_store.size", quotes.len() as f64);
    }

    async fn get(&self, id: QuoteId) -> Option<Quote> {
        let mut quotes = self.quotes.lock();
        Self::sweep_locked(&mut quotes);
        let quote = quotes.get(&id).cloned()?;
        if quote.is_expired_at(Utc::now()) {
            quotes.remove(&id);
            return None;
        }
        Some(quote)
    }

    async fn consume(&self, id: QuoteId) -> Option<Quote> {
        let mut quotes = self.quotes.lock();
        Self::sweep_locked(&mut quotes);
        let quote = quotes.remove(&id)?;
        if quote.is_expired_at(Utc::now()) {
            return None;
        }
        Some(quote)
    }

    async fn delete(&self, id: QuoteId) {
        let mut quotes = self.quotes.lock();
        quotes.remove(&id);
    }

    async fn sweep(&self) {
        let mut quotes = self.quotes.lock();
        Self::sweep_locked(&mut quotes);
    }

    async fn len(&self) -> usize {
        self.quotes.lock().len()
    }
}

impl InMemoryQuoteStore {
    /// Snapshot of all live quotes, used by `FileQuoteStore` to persist the
    /// table; not part of the `QuoteStore` trait since only a file-backed
    /// implementation needs a full dump.
    pub fn all(&self) -> Vec<Quote> {
        self.quotes.lock().values().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use relay_types::HolderTier;
    use solana_sdk::pubkey::Pubkey;

    use super::*;

    fn sample_quote(ttl_secs: i64) -> Quote {
        let now = Utc::now();
        Quote {
            id: QuoteId::new(),
            user_key: Pubkey::from_str("11111111111111111111111111111111").unwrap(),
            payment_mint: Pubkey::from_str("So11111111111111111111111111111111111111112").unwrap(),
            fee_payer_key: Pubkey::from_str("11111111111111111111111111111111").unwrap(),
            fee_amount_native: 100_000,
            fee_amount_payment_token: 1_000,
            created_at: now,
            expires_at: now + chrono::Duration::seconds(ttl_secs),
            holder_tier: HolderTier::none(),
            compute_unit_estimate: 200_000,
            consumed: false,
        }
    }

    #[tokio::test]
    async fn consume_is_at_most_once() {
        let store = InMemoryQuoteStore::new();
        let quote = sample_quote(60);
        let id = quote.id;
        store.put(quote).await;

        let first = store.consume(id).await;
        let second = store.consume(id).await;

        assert!(first.is_some());
        assert!(second.is_none());
    }

    #[tokio::test]
    async fn expired_quote_is_absent_on_read() {
        let store = InMemoryQuoteStore::new();
        let mut quote = sample_quote(60);
        quote.expires_at = Utc::now() - chrono::Duration::milliseconds(1);
        let id = quote.id;
        store.put(quote).await;

        assert!(store.get(id).await.is_none());
    }

    #[tokio::test]
    async fn concurrent_consume_has_single_winner() {
        use std::sync::Arc;

        let store = Arc::new(InMemoryQuoteStore::new());
        let quote = sample_quote(60);
        let id = quote.id;
        store.put(quote).await;

        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = store.clone();
            handles.push(tokio::spawn(async move { store.consume(id).await }));
        }

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap().is_some() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }
}
