// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod config;
pub mod cycle;
pub mod event;
pub mod ledger;
pub mod metrics;
pub mod notify;
pub mod scheduler;
pub mod sources;
pub mod window;

// ---- Re-exports for stable public API ----
pub use crate::cycle::{run_cycle, CycleContext, CycleReport};
pub use crate::event::{Event, EventId};
pub use crate::ledger::{JsonFileLedger, KeyScheme, Ledger, LedgerKey, MemoryLedger};
pub use crate::notify::{Notifier, Reminder, ReminderMode};
pub use crate::window::{is_in_window, Offset};
