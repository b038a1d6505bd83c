// src/event.rs
use chrono::{DateTime, Duration, Utc};
use std::fmt;

/// Identifier of a contest, qualified by the source it came from.
///
/// Native ids are only unique per source (Codeforces uses numbers, LeetCode
/// uses slugs), so the source name always travels with them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventId {
    pub source: String,
    pub native: String,
}

impl EventId {
    pub fn new(source: impl Into<String>, native: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            native: native.into(),
        }
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.source, self.native)
    }
}

/// One upcoming contest as reported by a source. Fetched fresh every poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub id: EventId,
    pub title: String,
    pub link: String,
    pub start: DateTime<Utc>,
    pub duration: Duration,
}

impl Event {
    pub fn end(&self) -> DateTime<Utc> {
        self.start + self.duration
    }
}

/// Sort events by start instant, ascending. Ties keep their source order.
pub fn sort_by_start(events: &mut [Event]) {
    events.sort_by_key(|e| e.start);
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ev(native: &str, hour: u32) -> Event {
        Event {
            id: EventId::new("codeforces", native),
            title: format!("Round {native}"),
            link: String::new(),
            start: Utc.with_ymd_and_hms(2025, 3, 1, hour, 0, 0).unwrap(),
            duration: Duration::minutes(120),
        }
    }

    #[test]
    fn display_is_source_qualified() {
        let id = EventId::new("leetcode", "weekly-contest-400");
        assert_eq!(id.to_string(), "leetcode:weekly-contest-400");
    }

    #[test]
    fn sorts_ascending_and_stable() {
        let mut evs = vec![ev("3", 18), ev("1", 9), ev("2", 9)];
        sort_by_start(&mut evs);
        let ids: Vec<_> = evs.iter().map(|e| e.id.native.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "3"]);
        assert_eq!(evs[0].end(), evs[0].start + Duration::hours(2));
    }
}
