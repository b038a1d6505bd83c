// src/notify/format.rs
use anyhow::{anyhow, Result};
use chrono::{DateTime, Duration, FixedOffset, Offset as _, Utc};

use super::{Reminder, ReminderMode};
use crate::event::Event;

const IST_OFFSET_SECS: i32 = 330 * 60;

/// The single zone all times are shown in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayZone {
    pub offset: FixedOffset,
    pub label: String,
}

impl DisplayZone {
    pub fn from_minutes(minutes_east: i32, label: &str) -> Result<Self> {
        let offset = FixedOffset::east_opt(minutes_east * 60)
            .ok_or_else(|| anyhow!("display offset out of range: {minutes_east} min"))?;
        Ok(Self {
            offset,
            label: label.to_string(),
        })
    }

    pub fn localize(&self, t: DateTime<Utc>) -> DateTime<FixedOffset> {
        t.with_timezone(&self.offset)
    }
}

impl Default for DisplayZone {
    /// UTC+05:30, no DST.
    fn default() -> Self {
        Self {
            offset: FixedOffset::east_opt(IST_OFFSET_SECS).unwrap_or_else(|| Utc.fix()),
            label: "IST".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMessage {
    pub subject: String,
    pub text: String,
    pub html: String,
}

/// "Saturday, 06 September 2025 at 08:05 PM"
pub fn format_datetime(t: DateTime<Utc>, zone: &DisplayZone) -> String {
    zone.localize(t)
        .format("%A, %d %B %Y at %I:%M %p")
        .to_string()
}

/// "2h 15m"
pub fn format_duration(d: Duration) -> String {
    let mins = d.num_minutes().max(0);
    format!("{}h {}m", mins / 60, mins % 60)
}

/// Suggested alarm time, 15 minutes before start ("07:50 PM").
pub fn snooze_time(start: DateTime<Utc>, zone: &DisplayZone) -> String {
    zone.localize(start - Duration::minutes(15))
        .format("%I:%M %p")
        .to_string()
}

pub fn render(reminder: &Reminder<'_>, zone: &DisplayZone) -> RenderedMessage {
    match reminder.mode {
        ReminderMode::Single => render_single(reminder, zone),
        ReminderMode::Digest => render_digest(reminder, zone),
    }
}

fn render_single(r: &Reminder<'_>, zone: &DisplayZone) -> RenderedMessage {
    let ev = r.event;
    let subject = format!(
        "{} Contest Reminder: {} ({} Notice)",
        r.source,
        ev.title,
        r.offset.lead_label()
    );
    let text = format!(
        "{}\nStarts at: {} {}\nDuration: {}\nLink: {}\n",
        ev.title,
        format_datetime(ev.start, zone),
        zone.label,
        format_duration(ev.duration),
        ev.link
    );
    let html = format!(
        "<p><b>{}</b><br>Starts at: {} {}<br>Duration: {}<br>Link: {}</p>",
        html_escape::encode_text(&ev.title),
        format_datetime(ev.start, zone),
        html_escape::encode_text(&zone.label),
        format_duration(ev.duration),
        html_link(&ev.link)
    );
    RenderedMessage {
        subject,
        text,
        html,
    }
}

fn render_digest(r: &Reminder<'_>, zone: &DisplayZone) -> RenderedMessage {
    let upcoming = if r.upcoming.is_empty() {
        std::slice::from_ref(r.event)
    } else {
        r.upcoming
    };
    let today = zone.localize(r.now).date_naive();
    let (todays, later): (Vec<&Event>, Vec<&Event>) = upcoming
        .iter()
        .partition(|e| zone.localize(e.start).date_naive() == today);

    if !todays.is_empty() {
        let subject = format!("{} Contest(s) Today!", r.source);
        let text = format!(
            "Here are today's {} contests:\n\n{}",
            r.source,
            todays
                .iter()
                .map(|e| text_block(e, zone))
                .collect::<Vec<_>>()
                .join("\n")
        );
        let html = format!(
            "<p>Here are today's {} contests:</p>{}",
            html_escape::encode_text(r.source),
            todays.iter().map(|e| html_block(e, zone)).collect::<String>()
        );
        return RenderedMessage {
            subject,
            text,
            html,
        };
    }

    // `later` is never empty here: `upcoming` has at least one event.
    let next = later.first().copied().unwrap_or(r.event);
    RenderedMessage {
        subject: format!("Next {} Contest Info", r.source),
        text: format!(
            "No contests today. Here is the next one:\n\n{}",
            text_block(next, zone)
        ),
        html: format!(
            "<p>No contests today. Here is the next one:</p>{}",
            html_block(next, zone)
        ),
    }
}

fn text_block(e: &Event, zone: &DisplayZone) -> String {
    format!(
        "* {}\n  Time: {} {}\n  Duration: {}\n  Link: {}\n  Reminder: {} {}\n",
        e.title,
        format_datetime(e.start, zone),
        zone.label,
        format_duration(e.duration),
        e.link,
        snooze_time(e.start, zone),
        zone.label
    )
}

fn html_block(e: &Event, zone: &DisplayZone) -> String {
    let label = html_escape::encode_text(&zone.label);
    format!(
        "<p><b>{}</b><br>Time: {} {label}<br>Duration: {}<br>Link: {}<br>Reminder: {} {label}</p>",
        html_escape::encode_text(&e.title),
        format_datetime(e.start, zone),
        format_duration(e.duration),
        html_link(&e.link),
        snooze_time(e.start, zone),
    )
}

fn html_link(url: &str) -> String {
    format!(
        "<a href=\"{}\">{}</a>",
        html_escape::encode_double_quoted_attribute(url),
        html_escape::encode_text(url)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventId;
    use crate::window::Offset;
    use chrono::TimeZone;

    fn contest(id: &str, title: &str, start: DateTime<Utc>) -> Event {
        Event {
            id: EventId::new("codeforces", id),
            title: title.into(),
            link: format!("https://codeforces.com/contests/{id}"),
            start,
            duration: Duration::minutes(135),
        }
    }

    #[test]
    fn datetime_and_duration_in_display_zone() {
        let zone = DisplayZone::default();
        let t = Utc.with_ymd_and_hms(2025, 9, 6, 14, 35, 0).unwrap();
        assert_eq!(format_datetime(t, &zone), "Saturday, 06 September 2025 at 08:05 PM");
        assert_eq!(snooze_time(t, &zone), "07:50 PM");
        assert_eq!(format_duration(Duration::minutes(135)), "2h 15m");
        assert_eq!(format_duration(Duration::seconds(-5)), "0h 0m");
    }

    #[test]
    fn single_subject_names_the_lead_time() {
        let zone = DisplayZone::default();
        let start = Utc.with_ymd_and_hms(2025, 9, 7, 2, 30, 0).unwrap();
        let ev = contest("1", "Weekly <Contest> 465", start);
        let off = Offset::minutes("12h", 720, 6, 6);
        let r = Reminder {
            source: "LeetCode",
            event: &ev,
            offset: &off,
            mode: ReminderMode::Single,
            upcoming: std::slice::from_ref(&ev),
            now: start - Duration::hours(12),
        };
        let msg = render(&r, &zone);
        assert_eq!(
            msg.subject,
            "LeetCode Contest Reminder: Weekly <Contest> 465 (12 Hour Notice)"
        );
        assert!(msg.text.contains("Duration: 2h 15m"));
        assert!(msg.html.contains("Weekly &lt;Contest&gt; 465"));
    }

    #[test]
    fn digest_lists_todays_contests_only() {
        let zone = DisplayZone::default();
        // 10:00 IST on 6 Sep
        let now = Utc.with_ymd_and_hms(2025, 9, 6, 4, 30, 0).unwrap();
        let a = contest("10", "Div. 2 Round", now + Duration::hours(6));
        let b = contest("11", "Educational Round", now + Duration::hours(10));
        let c = contest("12", "Global Round", now + Duration::hours(30));
        let all = vec![a.clone(), b.clone(), c.clone()];
        let off = Offset::minutes("15min", 15, 15, 9);
        let r = Reminder {
            source: "Codeforces",
            event: &a,
            offset: &off,
            mode: ReminderMode::Digest,
            upcoming: &all,
            now,
        };
        let msg = render(&r, &zone);
        assert_eq!(msg.subject, "Codeforces Contest(s) Today!");
        assert!(msg.text.contains("Div. 2 Round"));
        assert!(msg.text.contains("Educational Round"));
        assert!(!msg.text.contains("Global Round"));
    }

    #[test]
    fn digest_falls_back_to_next_contest() {
        let zone = DisplayZone::default();
        // 23:00 IST on 6 Sep; contest at 08:00 IST on 7 Sep
        let now = Utc.with_ymd_and_hms(2025, 9, 6, 17, 30, 0).unwrap();
        let next = contest("20", "Morning Round", now + Duration::hours(9));
        let off = Offset::minutes("12h", 720, 30, 30);
        let r = Reminder {
            source: "Codeforces",
            event: &next,
            offset: &off,
            mode: ReminderMode::Digest,
            upcoming: &[],
            now,
        };
        let msg = render(&r, &zone);
        assert_eq!(msg.subject, "Next Codeforces Contest Info");
        assert!(msg.text.contains("Morning Round"));
        assert!(msg.html.contains("href=\"https://codeforces.com/contests/20\""));
    }
}
