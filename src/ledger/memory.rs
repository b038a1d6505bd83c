// src/ledger/memory.rs
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::{bail, Result};

use super::{KeyScheme, Ledger, LedgerKey};

/// In-process ledger. The "backing store" is a shared set, so two instances
/// built from the same [`MemoryLedger::store`] behave like two runs of the
/// process against one file.
#[derive(Debug, Clone, Default)]
pub struct MemoryLedger {
    scheme: KeyScheme,
    entries: BTreeSet<String>,
    store: Arc<Mutex<BTreeSet<String>>>,
    fail_persist: bool,
}

impl MemoryLedger {
    pub fn new(scheme: KeyScheme) -> Self {
        Self {
            scheme,
            ..Self::default()
        }
    }

    /// Another ledger reading and writing the same store.
    pub fn reopen(&self) -> Self {
        Self {
            scheme: self.scheme,
            entries: BTreeSet::new(),
            store: Arc::clone(&self.store),
            fail_persist: false,
        }
    }

    /// Make every subsequent persist fail (simulates a read-only disk).
    pub fn failing_persist(mut self) -> Self {
        self.fail_persist = true;
        self
    }

    pub fn stored_keys(&self) -> BTreeSet<String> {
        self.store
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait::async_trait]
impl Ledger for MemoryLedger {
    async fn load(&mut self) {
        let stored = self.stored_keys();
        self.entries.extend(stored);
    }

    fn has_fired(&self, key: &LedgerKey) -> bool {
        self.entries.contains(&key.render(self.scheme))
    }

    async fn mark_fired(&mut self, key: &LedgerKey) -> Result<()> {
        self.entries.insert(key.render(self.scheme));
        self.persist().await
    }

    async fn persist(&self) -> Result<()> {
        if self.fail_persist {
            bail!("memory ledger persist disabled");
        }
        let mut store = self.store.lock().unwrap_or_else(PoisonError::into_inner);
        *store = self.entries.clone();
        Ok(())
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventId;

    #[tokio::test]
    async fn mark_twice_is_same_as_once() {
        let key = LedgerKey::new(&EventId::new("leetcode", "biweekly-1"), "15min");
        let mut once = MemoryLedger::new(KeyScheme::Qualified);
        once.mark_fired(&key).await.unwrap();

        let mut twice = MemoryLedger::new(KeyScheme::Qualified);
        twice.mark_fired(&key).await.unwrap();
        twice.mark_fired(&key).await.unwrap();

        assert!(twice.has_fired(&key));
        assert_eq!(once.stored_keys(), twice.stored_keys());
    }

    #[tokio::test]
    async fn reopen_sees_persisted_state() {
        let key = LedgerKey::new(&EventId::new("codeforces", "7"), "12h");
        let mut a = MemoryLedger::new(KeyScheme::Qualified);
        a.mark_fired(&key).await.unwrap();

        let mut b = a.reopen();
        assert!(!b.has_fired(&key));
        b.load().await;
        assert!(b.has_fired(&key));
    }

    #[tokio::test]
    async fn failing_persist_still_records_in_memory() {
        let key = LedgerKey::new(&EventId::new("codeforces", "7"), "12h");
        let mut l = MemoryLedger::new(KeyScheme::Qualified).failing_persist();
        assert!(l.mark_fired(&key).await.is_err());
        assert!(l.has_fired(&key));
        assert!(l.stored_keys().is_empty());

        l.load().await;
        assert!(l.has_fired(&key));
    }
}
