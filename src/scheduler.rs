// src/scheduler.rs
use anyhow::Result;
use chrono::{DateTime, Utc};
use metrics::{counter, gauge};
use tokio::time::{self, MissedTickBehavior};

use crate::config::{ReminderConfig, SourceConfig, SourceKind};
use crate::cycle::{run_cycle, CycleContext, CycleReport};
use crate::ledger::Ledger;
use crate::notify::{Notifier, ReminderMode};
use crate::sources::{fetch_or_empty, CodeforcesSource, ContestSource, LeetCodeSource};
use crate::window::Offset;

/// A source together with the reminder rules that apply to it.
pub struct ConfiguredSource {
    pub source: Box<dyn ContestSource>,
    pub offsets: Vec<Offset>,
    pub mode: ReminderMode,
}

impl ConfiguredSource {
    pub fn new(source: Box<dyn ContestSource>, cfg: &SourceConfig) -> Self {
        Self {
            source,
            offsets: cfg.offsets(),
            mode: cfg.mode(),
        }
    }

    /// Build the live HTTP source for `cfg.kind`.
    pub fn live(cfg: &SourceConfig) -> Result<Self> {
        let source: Box<dyn ContestSource> = match cfg.kind {
            SourceKind::Codeforces => Box::new(CodeforcesSource::live()?),
            SourceKind::Leetcode => Box::new(LeetCodeSource::live()?),
        };
        Ok(Self::new(source, cfg))
    }
}

/// Live sources for every enabled entry in `cfg`.
pub fn live_sources(cfg: &ReminderConfig) -> Result<Vec<ConfiguredSource>> {
    cfg.enabled_sources().map(ConfiguredSource::live).collect()
}

/// One full poll pass: reload the ledger, then fetch and evaluate each source
/// in order. Never fails; fetch errors yield an empty list for that source.
pub async fn poll_all<L, N>(
    sources: &[ConfiguredSource],
    ledger: &mut L,
    notifier: &N,
    now: DateTime<Utc>,
) -> Vec<(&'static str, CycleReport)>
where
    L: Ledger + ?Sized,
    N: Notifier + ?Sized,
{
    crate::metrics::describe();
    ledger.load().await;

    let mut out = Vec::with_capacity(sources.len());
    for cs in sources {
        let events = fetch_or_empty(cs.source.as_ref()).await;
        if events.is_empty() {
            tracing::info!(source = cs.source.name(), "no upcoming contests");
        }
        let ctx = CycleContext {
            label: cs.source.label(),
            offsets: &cs.offsets,
            mode: cs.mode,
            now,
        };
        let report = run_cycle(ctx, &events, ledger, notifier).await;
        tracing::info!(
            target: "poll",
            source = cs.source.name(),
            contests = events.len(),
            fired = report.fired,
            already_fired = report.already_fired,
            failed = report.failed,
            "source polled"
        );
        out.push((cs.source.name(), report));
    }

    counter!("poll_cycles_total").increment(1);
    gauge!("poll_last_run_ts").set(now.timestamp() as f64);
    out
}

/// Poll every `interval_secs` until Ctrl-C. A pass always runs to completion
/// before the next tick is considered, so passes never overlap.
pub async fn run_forever<L, N>(
    sources: &[ConfiguredSource],
    ledger: &mut L,
    notifier: &N,
    interval_secs: u64,
) where
    L: Ledger + ?Sized,
    N: Notifier + ?Sized,
{
    let mut ticker = time::interval(time::Duration::from_secs(interval_secs));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let mut total = CycleReport::default();
                for (_, r) in poll_all(sources, ledger, notifier, Utc::now()).await {
                    total.merge(&r);
                }
                tracing::debug!(?total, "poll pass finished");
            }
            _ = &mut shutdown => {
                tracing::info!("shutdown requested");
                break;
            }
        }
    }
}
