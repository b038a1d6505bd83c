// src/config/smtp.rs
use anyhow::{anyhow, Result};

pub const DEFAULT_SMTP_HOST: &str = "smtp.gmail.com";

/// Mail credentials and the single recipient, read from the environment.
#[derive(Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub username: String,
    pub password: String,
    pub from: String,
    pub to: String,
}

impl std::fmt::Debug for SmtpConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpConfig")
            .field("host", &self.host)
            .field("username", &self.username)
            .field("password_len", &self.password.len())
            .field("from", &self.from)
            .field("to", &self.to)
            .finish()
    }
}

impl SmtpConfig {
    /// `EMAIL_ADDRESS` doubles as login and sender unless `SMTP_USER` is set.
    /// `SMTP_HOST` defaults to Gmail's implicit-TLS relay.
    pub fn from_env() -> Result<Self> {
        let from = required("EMAIL_ADDRESS")?;
        let password = required("APP_PASSWORD")?;
        let to = required("TO_EMAIL")?;
        let username = optional("SMTP_USER").unwrap_or_else(|| from.clone());
        let host = optional("SMTP_HOST").unwrap_or_else(|| DEFAULT_SMTP_HOST.to_string());
        Ok(Self {
            host,
            username,
            password,
            from,
            to,
        })
    }
}

fn optional(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn required(name: &str) -> Result<String> {
    optional(name).ok_or_else(|| anyhow!("missing required env var {name}"))
}
