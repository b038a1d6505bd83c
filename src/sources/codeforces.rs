// src/sources/codeforces.rs
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;

use super::{http_client, normalize_title, ContestSource};
use crate::event::{Event, EventId};

pub const CONTEST_LIST_URL: &str = "https://codeforces.com/api/contest.list";

#[derive(Debug, Deserialize)]
struct ApiResponse {
    status: String,
    #[serde(default)]
    comment: Option<String>,
    #[serde(default)]
    result: Vec<ApiContest>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiContest {
    id: u64,
    name: String,
    phase: String,
    duration_seconds: i64,
    start_time_seconds: Option<i64>,
}

enum Mode {
    Fixture(String),
    Http {
        url: String,
        client: reqwest::Client,
    },
}

pub struct CodeforcesSource {
    mode: Mode,
}

impl CodeforcesSource {
    pub fn from_fixture(body: &str) -> Self {
        Self {
            mode: Mode::Fixture(body.to_string()),
        }
    }

    pub fn live() -> Result<Self> {
        Self::from_url(CONTEST_LIST_URL)
    }

    pub fn from_url(url: &str) -> Result<Self> {
        Ok(Self {
            mode: Mode::Http {
                url: url.to_string(),
                client: http_client()?,
            },
        })
    }

    /// Parse a `contest.list` body, keeping contests in phase `BEFORE`.
    pub fn parse(body: &str) -> Result<Vec<Event>> {
        let resp: ApiResponse = serde_json::from_str(body).context("parse codeforces json")?;
        if resp.status != "OK" {
            bail!(
                "codeforces api status {}: {}",
                resp.status,
                resp.comment.unwrap_or_default()
            );
        }

        let mut out = Vec::new();
        for c in resp.result {
            if c.phase != "BEFORE" {
                continue;
            }
            let Some(start) = c.start_time_seconds.and_then(|s| DateTime::<Utc>::from_timestamp(s, 0))
            else {
                tracing::debug!(id = c.id, "codeforces contest without start time");
                continue;
            };
            out.push(Event {
                id: EventId::new("codeforces", c.id.to_string()),
                title: normalize_title(&c.name),
                link: format!("https://codeforces.com/contests/{}", c.id),
                start,
                duration: Duration::seconds(c.duration_seconds.max(0)),
            });
        }
        Ok(out)
    }
}

#[async_trait]
impl ContestSource for CodeforcesSource {
    async fn fetch_upcoming(&self) -> Result<Vec<Event>> {
        match &self.mode {
            Mode::Fixture(s) => Self::parse(s),
            Mode::Http { url, client } => {
                let body = client
                    .get(url)
                    .send()
                    .await
                    .context("codeforces http get")?
                    .error_for_status()
                    .context("codeforces non-2xx")?
                    .text()
                    .await
                    .context("codeforces http .text()")?;
                Self::parse(&body)
            }
        }
    }

    fn name(&self) -> &'static str {
        "codeforces"
    }

    fn label(&self) -> &'static str {
        "Codeforces"
    }
}
