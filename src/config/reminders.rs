// src/config/reminders.rs
use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::ledger::file::DEFAULT_LEDGER_PATH;
use crate::ledger::KeyScheme;
use crate::notify::{DisplayZone, ReminderMode};
use crate::window::{validate_offsets, Offset};

pub const ENV_CONFIG_PATH: &str = "REMINDER_CONFIG_PATH";
const ENV_LEDGER_PATH: &str = "LEDGER_PATH";
const ENV_POLL_INTERVAL: &str = "POLL_INTERVAL_SECS";

/// One day. Every default window is far narrower than this.
pub const MAX_POLL_INTERVAL_SECS: u64 = 86_400;

fn default_poll_interval() -> u64 {
    300
}
fn default_display_offset() -> i32 {
    330
}
fn default_display_label() -> String {
    "IST".to_string()
}
fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Codeforces,
    Leetcode,
}

impl SourceKind {
    /// Windows tuned to each site's usual polling cadence.
    pub fn default_offsets(self) -> Vec<OffsetConfig> {
        match self {
            SourceKind::Codeforces => vec![
                OffsetConfig::new("12h", 720, 30, 30),
                OffsetConfig::new("15min", 15, 15, 9),
            ],
            SourceKind::Leetcode => vec![
                OffsetConfig::new("12h", 720, 6, 6),
                OffsetConfig::new("15min", 15, 3, 3),
            ],
        }
    }

    pub fn default_mode(self) -> ReminderMode {
        match self {
            SourceKind::Codeforces => ReminderMode::Digest,
            SourceKind::Leetcode => ReminderMode::Single,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OffsetConfig {
    pub name: String,
    pub lead_minutes: i64,
    #[serde(default)]
    pub tolerance_before_minutes: i64,
    #[serde(default)]
    pub tolerance_after_minutes: i64,
}

impl OffsetConfig {
    pub fn new(name: &str, lead: i64, before: i64, after: i64) -> Self {
        Self {
            name: name.to_string(),
            lead_minutes: lead,
            tolerance_before_minutes: before,
            tolerance_after_minutes: after,
        }
    }

    pub fn to_offset(&self) -> Offset {
        Offset::minutes(
            self.name.trim(),
            self.lead_minutes,
            self.tolerance_before_minutes,
            self.tolerance_after_minutes,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceConfig {
    pub kind: SourceKind,
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Falls back to the kind's default when absent.
    #[serde(default)]
    pub mode: Option<ReminderMode>,
    /// Empty means "use the kind's defaults".
    #[serde(default)]
    pub offsets: Vec<OffsetConfig>,
}

impl SourceConfig {
    pub fn with_defaults(kind: SourceKind) -> Self {
        Self {
            kind,
            enabled: true,
            mode: None,
            offsets: Vec::new(),
        }
    }

    pub fn mode(&self) -> ReminderMode {
        self.mode.unwrap_or_else(|| self.kind.default_mode())
    }

    /// Offsets in configuration order.
    pub fn offsets(&self) -> Vec<Offset> {
        if self.offsets.is_empty() {
            self.kind
                .default_offsets()
                .iter()
                .map(OffsetConfig::to_offset)
                .collect()
        } else {
            self.offsets.iter().map(OffsetConfig::to_offset).collect()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderConfig {
    #[serde(default = "default_ledger_path")]
    pub ledger_path: PathBuf,
    #[serde(default)]
    pub key_scheme: KeyScheme,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    /// Minutes east of UTC for every displayed time.
    #[serde(default = "default_display_offset")]
    pub display_offset_minutes: i32,
    #[serde(default = "default_display_label")]
    pub display_label: String,
    /// e.g. "127.0.0.1:9187". Metrics are not exported when absent.
    #[serde(default)]
    pub metrics_addr: Option<String>,
    #[serde(default = "default_sources")]
    pub sources: Vec<SourceConfig>,
}

fn default_ledger_path() -> PathBuf {
    PathBuf::from(DEFAULT_LEDGER_PATH)
}

fn default_sources() -> Vec<SourceConfig> {
    vec![
        SourceConfig::with_defaults(SourceKind::Codeforces),
        SourceConfig::with_defaults(SourceKind::Leetcode),
    ]
}

impl Default for ReminderConfig {
    fn default() -> Self {
        Self {
            ledger_path: default_ledger_path(),
            key_scheme: KeyScheme::default(),
            poll_interval_secs: default_poll_interval(),
            display_offset_minutes: default_display_offset(),
            display_label: default_display_label(),
            metrics_addr: None,
            sources: default_sources(),
        }
    }
}

impl ReminderConfig {
    /// Load from an explicit path. TOML or JSON, chosen by extension.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading reminder config from {}", path.display()))?;
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let cfg: ReminderConfig = if ext == "json" {
            serde_json::from_str(&content).context("parse reminder config json")?
        } else {
            toml::from_str(&content).context("parse reminder config toml")?
        };
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load using env var + fallbacks, then apply env overrides:
    /// 1) $REMINDER_CONFIG_PATH
    /// 2) config/reminders.toml
    /// 3) config/reminders.json
    /// 4) built-in defaults
    pub fn load_default() -> Result<Self> {
        Self::load(None)
    }

    /// Like [`ReminderConfig::load_default`], but an explicit path (from the
    /// command line) wins over the search order.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut cfg = match explicit {
            Some(p) => Self::load_from(p)?,
            None => Self::locate()?,
        };
        cfg.apply_env_overrides()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn locate() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if pb.exists() {
                return Self::load_from(&pb);
            }
            bail!("{ENV_CONFIG_PATH} points to non-existent path {}", pb.display());
        }
        for candidate in ["config/reminders.toml", "config/reminders.json"] {
            let pb = PathBuf::from(candidate);
            if pb.exists() {
                return Self::load_from(&pb);
            }
        }
        Ok(Self::default())
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(p) = std::env::var(ENV_LEDGER_PATH) {
            if !p.trim().is_empty() {
                self.ledger_path = PathBuf::from(p.trim());
            }
        }
        if let Ok(v) = std::env::var(ENV_POLL_INTERVAL) {
            self.poll_interval_secs = v
                .trim()
                .parse()
                .map_err(|_| anyhow!("{ENV_POLL_INTERVAL} is not a number: {v:?}"))?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.poll_interval_secs == 0 {
            bail!("poll_interval_secs must be positive");
        }
        if self.poll_interval_secs > MAX_POLL_INTERVAL_SECS {
            bail!(
                "poll_interval_secs {} exceeds {MAX_POLL_INTERVAL_SECS}",
                self.poll_interval_secs
            );
        }
        self.display_zone()?;
        for (i, s) in self.sources.iter().enumerate() {
            if self.sources[..i].iter().any(|o| o.kind == s.kind) {
                bail!("source {:?} configured twice", s.kind);
            }
            validate_offsets(&s.offsets())
                .with_context(|| format!("offsets of source {:?}", s.kind))?;
        }
        Ok(())
    }

    pub fn display_zone(&self) -> Result<DisplayZone> {
        DisplayZone::from_minutes(self.display_offset_minutes, &self.display_label)
    }

    pub fn enabled_sources(&self) -> impl Iterator<Item = &SourceConfig> {
        self.sources.iter().filter(|s| s.enabled)
    }

    /// Offsets whose window is narrower than the poll interval; a poll may
    /// skip right over them.
    pub fn coverage_warnings(&self) -> Vec<String> {
        let interval = i64::try_from(self.poll_interval_secs)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .unwrap_or(chrono::Duration::MAX);
        let mut out = Vec::new();
        for s in self.enabled_sources() {
            for o in s.offsets() {
                let width = o.high() - o.low();
                if width < interval {
                    out.push(format!(
                        "{:?}/{}: window {} min is narrower than poll interval {} s",
                        s.kind,
                        o.name,
                        width.num_minutes(),
                        self.poll_interval_secs
                    ));
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let cfg = ReminderConfig::default();
        cfg.validate().unwrap();
        assert_eq!(cfg.enabled_sources().count(), 2);
        let cf = &cfg.sources[0];
        assert_eq!(cf.mode(), ReminderMode::Digest);
        assert_eq!(cf.offsets()[0].bounds_hours(), (11.5, 12.5));
        let lc = &cfg.sources[1];
        assert_eq!(lc.offsets()[1].bounds_hours(), (0.2, 0.3));
    }

    #[test]
    fn toml_partial_fills_defaults() {
        let raw = r#"
key_scheme = "bare"
poll_interval_secs = 120

[[sources]]
kind = "leetcode"
mode = "digest"
offsets = [
  { name = "1h", lead_minutes = 60, tolerance_before_minutes = 5, tolerance_after_minutes = 5 },
]
"#;
        let cfg: ReminderConfig = toml::from_str(raw).unwrap();
        cfg.validate().unwrap();
        assert_eq!(cfg.key_scheme, KeyScheme::Bare);
        assert_eq!(cfg.ledger_path, PathBuf::from(DEFAULT_LEDGER_PATH));
        assert_eq!(cfg.sources.len(), 1);
        assert_eq!(cfg.sources[0].mode(), ReminderMode::Digest);
        assert_eq!(cfg.sources[0].offsets()[0].name, "1h");
    }

    #[test]
    fn duplicate_sources_rejected() {
        let mut cfg = ReminderConfig::default();
        cfg.sources.push(SourceConfig::with_defaults(SourceKind::Codeforces));
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn coverage_warning_for_narrow_window() {
        let cfg = ReminderConfig {
            poll_interval_secs: 600,
            ..ReminderConfig::default()
        };
        let warnings = cfg.coverage_warnings();
        // leetcode 15min window is 6 minutes wide
        assert!(warnings.iter().any(|w| w.contains("Leetcode/15min")));
        assert!(!warnings.iter().any(|w| w.contains("Codeforces")));
    }

    #[test]
    fn huge_poll_interval_rejected_without_panic() {
        let cfg = ReminderConfig {
            poll_interval_secs: 100_000_000_000_000_000,
            ..ReminderConfig::default()
        };
        assert!(cfg.validate().is_err());
        assert_eq!(cfg.coverage_warnings().len(), 4);

        let day = ReminderConfig {
            poll_interval_secs: MAX_POLL_INTERVAL_SECS,
            ..ReminderConfig::default()
        };
        day.validate().unwrap();
    }
}
