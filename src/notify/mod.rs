// src/notify/mod.rs
//! Delivery side: turns a fired reminder into an outbound message.

pub mod email;
pub mod format;
pub mod log;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::event::Event;
use crate::window::Offset;

pub use email::EmailNotifier;
pub use format::{DisplayZone, RenderedMessage};
pub use log::LogNotifier;

/// What one reminder email covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReminderMode {
    /// Just the contest that fired.
    #[default]
    Single,
    /// Every contest of the source starting today, or the next one if none.
    Digest,
}

/// Structured data handed to a [`Notifier`]; formatting is the notifier's job.
#[derive(Debug, Clone, Copy)]
pub struct Reminder<'a> {
    /// Display name of the source ("Codeforces").
    pub source: &'a str,
    pub event: &'a Event,
    pub offset: &'a Offset,
    pub mode: ReminderMode,
    /// Everything the source returned this cycle, ascending by start.
    pub upcoming: &'a [Event],
    pub now: DateTime<Utc>,
}

#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    /// Send one message for `reminder`. `Err` means nothing was delivered.
    async fn deliver(&self, reminder: &Reminder<'_>) -> Result<()>;
    fn name(&self) -> &'static str;
}
