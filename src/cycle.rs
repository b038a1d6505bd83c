// src/cycle.rs
//! One poll pass over a source's contests: window check, ledger check,
//! delivery, ledger update.

use chrono::{DateTime, Utc};
use metrics::counter;
use serde::Serialize;

use crate::event::Event;
use crate::ledger::{Ledger, LedgerKey};
use crate::notify::{Notifier, Reminder, ReminderMode};
use crate::window::{hours_until, is_in_window, Offset};

/// Per-cycle tally. Every (event, offset) pair lands in exactly one of
/// `fired`, `already_fired`, `outside_window`, `failed`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    pub evaluated: usize,
    pub fired: usize,
    pub already_fired: usize,
    pub outside_window: usize,
    pub failed: usize,
    /// Delivered, but the ledger write afterwards failed.
    pub persist_errors: usize,
}

impl CycleReport {
    pub fn merge(&mut self, other: &CycleReport) {
        self.evaluated += other.evaluated;
        self.fired += other.fired;
        self.already_fired += other.already_fired;
        self.outside_window += other.outside_window;
        self.failed += other.failed;
        self.persist_errors += other.persist_errors;
    }
}

/// Inputs that stay fixed for one source during a cycle.
#[derive(Debug, Clone, Copy)]
pub struct CycleContext<'a> {
    /// Display name of the source.
    pub label: &'a str,
    pub offsets: &'a [Offset],
    pub mode: ReminderMode,
    pub now: DateTime<Utc>,
}

/// Evaluate every event against every offset, in order, and deliver each
/// reminder that is due and not yet in the ledger.
///
/// A failed delivery leaves the ledger untouched so the next poll retries
/// while the window is still open.
pub async fn run_cycle<L, N>(
    ctx: CycleContext<'_>,
    events: &[Event],
    ledger: &mut L,
    notifier: &N,
) -> CycleReport
where
    L: Ledger + ?Sized,
    N: Notifier + ?Sized,
{
    let mut report = CycleReport::default();

    for event in events {
        let hours_left = hours_until(ctx.now, event.start);
        let mut due_any = false;

        for offset in ctx.offsets {
            report.evaluated += 1;

            if !is_in_window(ctx.now, event.start, offset) {
                report.outside_window += 1;
                continue;
            }
            due_any = true;

            let key = LedgerKey::new(&event.id, &offset.name);
            if ledger.has_fired(&key) {
                report.already_fired += 1;
                counter!("reminder_duplicates_skipped_total").increment(1);
                tracing::debug!(
                    event = %event.id,
                    offset = %offset.name,
                    "reminder already sent"
                );
                continue;
            }

            let reminder = Reminder {
                source: ctx.label,
                event,
                offset,
                mode: ctx.mode,
                upcoming: events,
                now: ctx.now,
            };

            if let Err(e) = notifier.deliver(&reminder).await {
                report.failed += 1;
                counter!("reminder_delivery_failures_total").increment(1);
                tracing::warn!(
                    event = %event.id,
                    offset = %offset.name,
                    notifier = notifier.name(),
                    "delivery failed, will retry next poll: {e:#}"
                );
                continue;
            }

            report.fired += 1;
            counter!("reminder_sent_total", "offset" => offset.name.clone()).increment(1);
            tracing::info!(
                event = %event.id,
                title = %event.title,
                offset = %offset.name,
                hours_left = %format!("{hours_left:.2}"),
                "reminder sent"
            );

            if let Err(e) = ledger.mark_fired(&key).await {
                report.persist_errors += 1;
                counter!("ledger_persist_errors_total").increment(1);
                tracing::error!(
                    event = %event.id,
                    offset = %offset.name,
                    "reminder sent but ledger not saved, may repeat after restart: {e:#}"
                );
            }
        }

        if !due_any {
            tracing::debug!(
                event = %event.id,
                title = %event.title,
                hours_left = %format!("{hours_left:.2}"),
                "no reminder due"
            );
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventId;
    use crate::ledger::{KeyScheme, MemoryLedger};
    use anyhow::{bail, Result};
    use chrono::{Duration, TimeZone};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Counting {
        sent: AtomicUsize,
        fail: bool,
    }

    #[async_trait::async_trait]
    impl Notifier for Counting {
        async fn deliver(&self, _r: &Reminder<'_>) -> Result<()> {
            if self.fail {
                bail!("smtp down");
            }
            self.sent.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
        fn name(&self) -> &'static str {
            "counting"
        }
    }

    fn offsets() -> Vec<Offset> {
        vec![
            Offset::minutes("12h", 720, 30, 30),
            Offset::minutes("15min", 15, 15, 9),
        ]
    }

    fn event(start: DateTime<Utc>) -> Event {
        Event {
            id: EventId::new("codeforces", "R1"),
            title: "Round 1".into(),
            link: String::new(),
            start,
            duration: Duration::hours(2),
        }
    }

    #[tokio::test]
    async fn each_pair_counted_once() {
        let t0 = Utc.with_ymd_and_hms(2025, 5, 1, 12, 0, 0).unwrap();
        let offs = offsets();
        let ctx = CycleContext {
            label: "Codeforces",
            offsets: &offs,
            mode: ReminderMode::Single,
            now: t0 - Duration::hours(12),
        };
        let evs = vec![event(t0)];
        let mut ledger = MemoryLedger::new(KeyScheme::Qualified);
        let n = Counting::default();

        let r = run_cycle(ctx, &evs, &mut ledger, &n).await;
        assert_eq!(r.evaluated, 2);
        assert_eq!(r.fired, 1);
        assert_eq!(r.outside_window, 1);
        assert_eq!(n.sent.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failure_does_not_mark() {
        let t0 = Utc.with_ymd_and_hms(2025, 5, 1, 12, 0, 0).unwrap();
        let offs = offsets();
        let ctx = CycleContext {
            label: "Codeforces",
            offsets: &offs,
            mode: ReminderMode::Single,
            now: t0 - Duration::minutes(20),
        };
        let evs = vec![event(t0)];
        let mut ledger = MemoryLedger::new(KeyScheme::Qualified);
        let down = Counting {
            fail: true,
            ..Counting::default()
        };

        let r = run_cycle(ctx, &evs, &mut ledger, &down).await;
        assert_eq!(r.failed, 1);
        assert!(ledger.is_empty());

        let up = Counting::default();
        let r2 = run_cycle(ctx, &evs, &mut ledger, &up).await;
        assert_eq!(r2.fired, 1);
        assert!(ledger.has_fired(&LedgerKey::new(&evs[0].id, "15min")));
    }

    #[tokio::test]
    async fn persist_error_counts_but_blocks_resend_in_memory() {
        let t0 = Utc.with_ymd_and_hms(2025, 5, 1, 12, 0, 0).unwrap();
        let offs = offsets();
        let ctx = CycleContext {
            label: "Codeforces",
            offsets: &offs,
            mode: ReminderMode::Single,
            now: t0 - Duration::hours(12),
        };
        let evs = vec![event(t0)];
        let mut ledger = MemoryLedger::new(KeyScheme::Qualified).failing_persist();
        let n = Counting::default();

        let r = run_cycle(ctx, &evs, &mut ledger, &n).await;
        assert_eq!((r.fired, r.persist_errors), (1, 1));
        let r2 = run_cycle(ctx, &evs, &mut ledger, &n).await;
        assert_eq!(r2.already_fired, 1);
        assert_eq!(n.sent.load(Ordering::SeqCst), 1);
    }
}
