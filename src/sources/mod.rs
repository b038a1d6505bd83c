// src/sources/mod.rs
pub mod codeforces;
pub mod leetcode;

use anyhow::Result;
use metrics::counter;
use once_cell::sync::OnceCell;

use crate::event::{sort_by_start, Event};

pub use codeforces::CodeforcesSource;
pub use leetcode::LeetCodeSource;

pub(crate) const USER_AGENT: &str = "contest-reminder/0.1";

#[async_trait::async_trait]
pub trait ContestSource: Send + Sync {
    /// Contests that have not started yet. Order is not guaranteed.
    async fn fetch_upcoming(&self) -> Result<Vec<Event>>;
    /// Stable lowercase name; prefixes event ids and ledger keys.
    fn name(&self) -> &'static str;
    /// Name shown in subjects and bodies.
    fn label(&self) -> &'static str;
}

/// Fetch from `source`, degrading any error to an empty list. Output is
/// sorted by start, ascending.
pub async fn fetch_or_empty(source: &dyn ContestSource) -> Vec<Event> {
    match source.fetch_upcoming().await {
        Ok(mut events) => {
            sort_by_start(&mut events);
            tracing::debug!(source = source.name(), count = events.len(), "fetched contests");
            events
        }
        Err(e) => {
            tracing::warn!(source = source.name(), "contest fetch failed: {e:#}");
            counter!("source_fetch_errors_total", "source" => source.name()).increment(1);
            Vec::new()
        }
    }
}

/// Decode HTML entities, collapse whitespace, trim.
pub fn normalize_title(s: &str) -> String {
    static RE_WS: OnceCell<regex::Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").expect("whitespace regex"));
    let decoded = html_escape::decode_html_entities(s);
    re_ws.replace_all(&decoded, " ").trim().to_string()
}

/// Build the shared HTTP client used by the live sources.
pub(crate) fn http_client() -> Result<reqwest::Client> {
    use anyhow::Context;
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .connect_timeout(std::time::Duration::from_secs(5))
        .timeout(std::time::Duration::from_secs(20))
        .build()
        .context("build http client")
}
