use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use crate::domain::TransactionResult;

pub const DEFAULT_SESSION_TTL_SECS: u64 = 1800;

/// What the thank-you page needs to know about the last payment of an order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionEntry {
    pub result: Option<TransactionResult>,
    pub paid: bool,
    pub notices: Vec<String>,
}

#[derive(Debug)]
struct Slot {
    entry: SessionEntry,
    stored_at: Instant,
}

/// Short-lived, clear-on-read store keyed by order key. Display data only;
/// nothing here is consulted when deciding an order's outcome.
#[derive(Clone)]
pub struct SessionCache {
    slots: Arc<RwLock<HashMap<String, Slot>>>,
    ttl: Duration,
}

impl SessionCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            slots: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }

    pub async fn store_result(&self, order_key: &str, result: TransactionResult, paid: bool) {
        let mut slots = self.slots.write().await;
        let slot = self.fresh_slot(&mut slots, order_key);
        slot.entry.result = Some(result);
        slot.entry.paid = paid;
    }

    pub async fn push_notice(&self, order_key: &str, notice: impl Into<String>) {
        let mut slots = self.slots.write().await;
        let slot = self.fresh_slot(&mut slots, order_key);
        slot.entry.notices.push(notice.into());
    }

    /// Removes and returns the entry. Expired entries are dropped and yield `None`.
    pub async fn take(&self, order_key: &str) -> Option<SessionEntry> {
        let slot = self.slots.write().await.remove(order_key)?;
        if slot.stored_at.elapsed() >= self.ttl {
            return None;
        }
        Some(slot.entry)
    }

    pub async fn purge_expired(&self) -> usize {
        let mut slots = self.slots.write().await;
        let before = slots.len();
        let ttl = self.ttl;
        slots.retain(|_, slot| slot.stored_at.elapsed() < ttl);
        let purged = before - slots.len();
        if purged > 0 {
            tracing::debug!(purged, "Purged expired session entries");
        }
        purged
    }

    /// Periodically drops expired entries so abandoned checkouts don't accumulate.
    pub fn start(&self) {
        let cache = self.clone();
        let interval = self.ttl.max(Duration::from_secs(60));
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                cache.purge_expired().await;
            }
        });
    }

    fn fresh_slot<'a>(&self, slots: &'a mut HashMap<String, Slot>, order_key: &str) -> &'a mut Slot {
        let ttl = self.ttl;
        let slot = slots.entry(order_key.to_string()).or_insert_with(|| Slot {
            entry: SessionEntry::default(),
            stored_at: Instant::now(),
        });
        if slot.stored_at.elapsed() >= ttl {
            slot.entry = SessionEntry::default();
        }
        slot.stored_at = Instant::now();
        slot
    }
}

impl Default for SessionCache {
    fn default() -> Self {
        Self::new(Duration::from_secs(DEFAULT_SESSION_TTL_SECS))
    }
}
