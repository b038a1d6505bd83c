// src/sources/leetcode.rs
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;

use super::{http_client, normalize_title, ContestSource};
use crate::event::{Event, EventId};

pub const GRAPHQL_URL: &str = "https://leetcode.com/graphql";

/// The GraphQL endpoint turns away requests without a browser user agent.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0";

const UPCOMING_QUERY: &str = r#"
query upcomingContests {
    upcomingContests {
        title
        titleSlug
        startTime
        duration
    }
}
"#;

#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    data: Option<Data>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Data {
    upcoming_contests: Option<Vec<ApiContest>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiContest {
    title: String,
    title_slug: String,
    start_time: i64,
    duration: i64,
}

enum Mode {
    Fixture(String),
    Http {
        url: String,
        client: reqwest::Client,
    },
}

pub struct LeetCodeSource {
    mode: Mode,
}

impl LeetCodeSource {
    pub fn from_fixture(body: &str) -> Self {
        Self {
            mode: Mode::Fixture(body.to_string()),
        }
    }

    pub fn live() -> Result<Self> {
        Self::from_url(GRAPHQL_URL)
    }

    pub fn from_url(url: &str) -> Result<Self> {
        Ok(Self {
            mode: Mode::Http {
                url: url.to_string(),
                client: http_client()?,
            },
        })
    }

    /// Parse an `upcomingContests` GraphQL body.
    pub fn parse(body: &str) -> Result<Vec<Event>> {
        let resp: GraphQlResponse = serde_json::from_str(body).context("parse leetcode json")?;
        let contests = resp
            .data
            .and_then(|d| d.upcoming_contests)
            .ok_or_else(|| anyhow!("leetcode response has no upcomingContests"))?;

        let mut out = Vec::with_capacity(contests.len());
        for c in contests {
            let Some(start) = DateTime::<Utc>::from_timestamp(c.start_time, 0) else {
                tracing::debug!(slug = %c.title_slug, "leetcode contest with invalid start");
                continue;
            };
            out.push(Event {
                link: format!("https://leetcode.com/contest/{}", c.title_slug),
                id: EventId::new("leetcode", c.title_slug),
                title: normalize_title(&c.title),
                start,
                duration: Duration::seconds(c.duration.max(0)),
            });
        }
        Ok(out)
    }
}

#[async_trait]
impl ContestSource for LeetCodeSource {
    async fn fetch_upcoming(&self) -> Result<Vec<Event>> {
        match &self.mode {
            Mode::Fixture(s) => Self::parse(s),
            Mode::Http { url, client } => {
                let query = serde_json::json!({
                    "operationName": "upcomingContests",
                    "query": UPCOMING_QUERY,
                    "variables": {},
                });
                let resp = client
                    .post(url)
                    .header(reqwest::header::REFERER, "https://leetcode.com")
                    .header(reqwest::header::USER_AGENT, BROWSER_USER_AGENT)
                    .json(&query)
                    .send()
                    .await
                    .context("leetcode graphql post")?;
                let status = resp.status();
                let body = resp.text().await.context("leetcode http .text()")?;
                if !status.is_success() {
                    return Err(anyhow!("leetcode graphql status {status}"));
                }
                Self::parse(&body)
            }
        }
    }

    fn name(&self) -> &'static str {
        "leetcode"
    }

    fn label(&self) -> &'static str {
        "LeetCode"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_data_is_an_error() {
        assert!(LeetCodeSource::parse(r#"{"errors":[{"message":"blocked"}]}"#).is_err());
        assert!(LeetCodeSource::parse(r#"{"data":{}}"#).is_err());
    }

    #[test]
    fn empty_list_is_ok() {
        let evs = LeetCodeSource::parse(r#"{"data":{"upcomingContests":[]}}"#).unwrap();
        assert!(evs.is_empty());
    }
}
