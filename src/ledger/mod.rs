// src/ledger/mod.rs
//! Record of which (contest, offset) reminders have already been delivered.
//!
//! Backends keep the whole mapping in memory; `load` merges the backing
//! store into it and `mark_fired` writes it back before returning. Entries are
//! never removed, so a key recorded in memory survives a failed write and any
//! later reload within the same process.

pub mod file;
pub mod memory;

use std::collections::BTreeSet;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::event::EventId;

pub use file::JsonFileLedger;
pub use memory::MemoryLedger;

/// How a [`LedgerKey`] is rendered into the persisted string key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyScheme {
    /// `"{source}:{id}_{offset}"`. Safe when several sources share one store.
    #[default]
    Qualified,
    /// `"{id}_{offset}"`, the layout of older cache files. Ids of different
    /// sources can collide.
    Bare,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerKey {
    pub event: EventId,
    pub offset: String,
}

impl LedgerKey {
    pub fn new(event: &EventId, offset: &str) -> Self {
        Self {
            event: event.clone(),
            offset: offset.to_string(),
        }
    }

    pub fn render(&self, scheme: KeyScheme) -> String {
        match scheme {
            KeyScheme::Qualified => format!("{}_{}", self.event, self.offset),
            KeyScheme::Bare => format!("{}_{}", self.event.native, self.offset),
        }
    }
}

#[async_trait::async_trait]
pub trait Ledger: Send + Sync {
    /// Merge the backing store's content into the in-memory state.
    /// A missing, empty or unreadable store contributes nothing.
    async fn load(&mut self);

    fn has_fired(&self, key: &LedgerKey) -> bool;

    /// Record `key` and persist. Recording an already present key is a no-op
    /// apart from the write.
    async fn mark_fired(&mut self, key: &LedgerKey) -> Result<()>;

    async fn persist(&self) -> Result<()>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Parse the persisted JSON object. Any value counts as "sent"; only the key
/// matters.
pub fn decode_entries(raw: &str) -> Result<BTreeSet<String>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(BTreeSet::new());
    }
    let map: serde_json::Map<String, serde_json::Value> =
        serde_json::from_str(trimmed).context("parse ledger json")?;
    Ok(map.into_iter().map(|(k, _)| k).collect())
}

/// Serialize as a pretty JSON object `key -> true`, keys sorted.
pub fn encode_entries(entries: &BTreeSet<String>) -> Result<Vec<u8>> {
    let map: serde_json::Map<String, serde_json::Value> = entries
        .iter()
        .map(|k| (k.clone(), serde_json::Value::Bool(true)))
        .collect();
    serde_json::to_vec_pretty(&map).context("encode ledger json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_rendering_per_scheme() {
        let key = LedgerKey::new(&EventId::new("codeforces", "2045"), "12h");
        assert_eq!(key.render(KeyScheme::Qualified), "codeforces:2045_12h");
        assert_eq!(key.render(KeyScheme::Bare), "2045_12h");
    }

    #[test]
    fn bare_keys_collide_across_sources_qualified_do_not() {
        let a = LedgerKey::new(&EventId::new("codeforces", "400"), "12h");
        let b = LedgerKey::new(&EventId::new("leetcode", "400"), "12h");
        assert_eq!(a.render(KeyScheme::Bare), b.render(KeyScheme::Bare));
        assert_ne!(a.render(KeyScheme::Qualified), b.render(KeyScheme::Qualified));
    }

    #[test]
    fn encode_decode_keeps_every_key() {
        let set: BTreeSet<String> = ["b_12h", "a_15min"].iter().map(|s| s.to_string()).collect();
        let bytes = encode_entries(&set).unwrap();
        let back = decode_entries(std::str::from_utf8(&bytes).unwrap()).unwrap();
        assert_eq!(back, set);
    }

    #[test]
    fn decode_accepts_indented_bare_keys() {
        let raw = "{\n    \"2045_12h\": true,\n    \"2045_15min\": true\n}";
        let set = decode_entries(raw).unwrap();
        assert!(set.contains("2045_12h"));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn decode_blank_is_empty_garbage_is_error() {
        assert!(decode_entries("  \n").unwrap().is_empty());
        assert!(decode_entries("{not json").is_err());
        assert!(decode_entries("[1,2]").is_err());
    }
}
