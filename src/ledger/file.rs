// src/ledger/file.rs
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tokio::fs;

use super::{decode_entries, encode_entries, KeyScheme, Ledger, LedgerKey};

pub const DEFAULT_LEDGER_PATH: &str = ".cache/notified_contests.json";

/// Ledger backed by a single JSON file.
///
/// Writes go to `<path>.tmp` and are renamed over the target, so a crash
/// mid-write leaves the previous content intact.
#[derive(Debug)]
pub struct JsonFileLedger {
    path: PathBuf,
    scheme: KeyScheme,
    entries: BTreeSet<String>,
}

impl JsonFileLedger {
    pub fn new(path: impl Into<PathBuf>, scheme: KeyScheme) -> Self {
        Self {
            path: path.into(),
            scheme,
            entries: BTreeSet::new(),
        }
    }

    /// Construct and immediately load.
    pub async fn open(path: impl Into<PathBuf>, scheme: KeyScheme) -> Self {
        let mut ledger = Self::new(path, scheme);
        ledger.load().await;
        ledger
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait::async_trait]
impl Ledger for JsonFileLedger {
    async fn load(&mut self) {
        let stored = match fs::read_to_string(&self.path).await {
            Ok(s) => match decode_entries(&s) {
                Ok(entries) => entries,
                Err(e) => {
                    tracing::warn!(
                        path = %self.path.display(),
                        "ledger unreadable, ignoring stored entries: {e:#}"
                    );
                    BTreeSet::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeSet::new(),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), "ledger read: {e:#}");
                BTreeSet::new()
            }
        };
        self.entries.extend(stored);
        tracing::debug!(entries = self.entries.len(), "ledger loaded");
    }

    fn has_fired(&self, key: &LedgerKey) -> bool {
        self.entries.contains(&key.render(self.scheme))
    }

    async fn mark_fired(&mut self, key: &LedgerKey) -> Result<()> {
        self.entries.insert(key.render(self.scheme));
        self.persist().await
    }

    async fn persist(&self) -> Result<()> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)
                .await
                .with_context(|| format!("create ledger dir {}", dir.display()))?;
        }
        let bytes = encode_entries(&self.entries)?;
        let tmp = self.tmp_path();
        fs::write(&tmp, &bytes)
            .await
            .with_context(|| format!("write {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .await
            .with_context(|| format!("replace {}", self.path.display()))?;
        Ok(())
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}
