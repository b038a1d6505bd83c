// src/config/mod.rs
pub mod reminders;
pub mod smtp;

pub use reminders::{OffsetConfig, ReminderConfig, SourceConfig, SourceKind};
pub use smtp::SmtpConfig;
