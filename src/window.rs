//! # Reminder windows
//! An [`Offset`] is a named lead time before a contest starts, widened by a
//! tolerance band so that at least one poll lands inside it.
//!
//! The band is expressed as time-before-start: an offset with lead `L`,
//! `tolerance_before` `B` and `tolerance_after` `A` accepts any poll where the
//! start is between `L - A` and `L + B` away (both ends inclusive).

use anyhow::{bail, Result};
use chrono::{DateTime, Duration, Utc};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Offset {
    /// Label used in ledger keys and subjects, e.g. "12h" or "15min".
    pub name: String,
    pub lead: Duration,
    /// How much earlier than `lead` a poll may still fire.
    pub tolerance_before: Duration,
    /// How much later than `lead` a poll may still fire.
    pub tolerance_after: Duration,
}

impl Offset {
    pub fn minutes(name: &str, lead: i64, before: i64, after: i64) -> Self {
        Self {
            name: name.to_string(),
            lead: Duration::minutes(lead),
            tolerance_before: Duration::minutes(before),
            tolerance_after: Duration::minutes(after),
        }
    }

    /// Smallest accepted time-before-start.
    pub fn low(&self) -> Duration {
        self.lead - self.tolerance_after
    }

    /// Largest accepted time-before-start.
    pub fn high(&self) -> Duration {
        self.lead + self.tolerance_before
    }

    /// `(low, high)` in fractional hours, for logs and diagnostics.
    pub fn bounds_hours(&self) -> (f64, f64) {
        (as_hours(self.low()), as_hours(self.high()))
    }

    /// Human label of the lead time ("12 Hour", "15 Minute").
    pub fn lead_label(&self) -> String {
        let mins = self.lead.num_minutes();
        if mins % 60 == 0 {
            format!("{} Hour", mins / 60)
        } else {
            format!("{mins} Minute")
        }
    }

    fn overlaps(&self, other: &Offset) -> bool {
        self.low() <= other.high() && other.low() <= self.high()
    }
}

/// True iff `now` lies inside `offset`'s firing window for a contest starting
/// at `start`. Never true once the contest has started.
pub fn is_in_window(now: DateTime<Utc>, start: DateTime<Utc>, offset: &Offset) -> bool {
    let delta = start.signed_duration_since(now);
    if delta <= Duration::zero() {
        return false;
    }
    offset.low() <= delta && delta <= offset.high()
}

/// Fractional hours from `now` until `start` (negative once started).
pub fn hours_until(now: DateTime<Utc>, start: DateTime<Utc>) -> f64 {
    as_hours(start.signed_duration_since(now))
}

fn as_hours(d: Duration) -> f64 {
    d.num_milliseconds() as f64 / 3_600_000.0
}

/// Reject offset tables that could fire after start, fire twice for one poll,
/// or collide in the ledger.
pub fn validate_offsets(offsets: &[Offset]) -> Result<()> {
    for (i, o) in offsets.iter().enumerate() {
        if o.name.trim().is_empty() {
            bail!("offset #{i} has an empty name");
        }
        if o.lead <= Duration::zero() {
            bail!("offset {:?}: lead time must be positive", o.name);
        }
        if o.tolerance_before < Duration::zero() || o.tolerance_after < Duration::zero() {
            bail!("offset {:?}: tolerances must not be negative", o.name);
        }
        if o.low() <= Duration::zero() {
            bail!(
                "offset {:?}: tolerance_after reaches the contest start",
                o.name
            );
        }
        for other in &offsets[..i] {
            if other.name == o.name {
                bail!("duplicate offset name {:?}", o.name);
            }
            if other.overlaps(o) {
                bail!(
                    "offset windows {:?} and {:?} overlap",
                    other.name,
                    o.name
                );
            }
        }
    }
    Ok(())
}
