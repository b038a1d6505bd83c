use anyhow::Result;

use super::format::{render, DisplayZone};
use super::{Notifier, Reminder};

/// Renders the message and logs it instead of sending (`--dry-run`).
#[derive(Debug, Clone, Default)]
pub struct LogNotifier {
    zone: DisplayZone,
}

impl LogNotifier {
    pub fn new(zone: DisplayZone) -> Self {
        Self { zone }
    }
}

#[async_trait::async_trait]
impl Notifier for LogNotifier {
    async fn deliver(&self, reminder: &Reminder<'_>) -> Result<()> {
        let msg = render(reminder, &self.zone);
        tracing::info!(
            event = %reminder.event.id,
            offset = %reminder.offset.name,
            subject = %msg.subject,
            "dry run, not sending:\n{}",
            msg.text
        );
        Ok(())
    }

    fn name(&self) -> &'static str {
        "log"
    }
}
