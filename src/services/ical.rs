//! iCalendar (RFC 5545) feeds: export of booked/blocked nights and import of
//! channel-manager feeds.

use chrono::{DateTime, Duration, NaiveDate, Utc};

/// All-day event covering `[start, end)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarEvent {
    pub uid: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub summary: String,
}

const DATE_FORMAT: &str = "%Y%m%d";

pub fn render_calendar(calendar_name: &str, events: &[CalendarEvent], stamp: DateTime<Utc>) -> String {
    let dtstamp = stamp.format("%Y%m%dT%H%M%SZ").to_string();
    let mut lines = vec![
        "BEGIN:VCALENDAR".to_string(),
        "VERSION:2.0".to_string(),
        "PRODID:-//resort-be//Availability//EN".to_string(),
        "CALSCALE:GREGORIAN".to_string(),
        "METHOD:PUBLISH".to_string(),
        format!("X-WR-CALNAME:{}", escape_text(calendar_name)),
    ];

    for event in events {
        lines.push("BEGIN:VEVENT".to_string());
        lines.push(format!("UID:{}", escape_text(&event.uid)));
        lines.push(format!("DTSTAMP:{dtstamp}"));
        lines.push(format!("DTSTART;VALUE=DATE:{}", event.start.format(DATE_FORMAT)));
        lines.push(format!("DTEND;VALUE=DATE:{}", event.end.format(DATE_FORMAT)));
        lines.push(format!("SUMMARY:{}", escape_text(&event.summary)));
        lines.push("TRANSP:OPAQUE".to_string());
        lines.push("END:VEVENT".to_string());
    }
    lines.push("END:VCALENDAR".to_string());

    let mut out = String::new();
    for line in lines {
        out.push_str(&fold_line(&line));
        out.push_str("\r\n");
    }
    out
}

fn escape_text(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            ';' => out.push_str("\\;"),
            ',' => out.push_str("\\,"),
            '\n' => out.push_str("\\n"),
            '\r' => {}
            _ => out.push(c),
        }
    }
    out
}

fn unescape_text(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') | Some('N') => out.push('\n'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

/// Lines longer than 75 octets continue on the next line after a space.
fn fold_line(line: &str) -> String {
    const LIMIT: usize = 75;
    if line.len() <= LIMIT {
        return line.to_string();
    }

    let mut out = String::with_capacity(line.len() + line.len() / LIMIT * 3);
    let mut width = 0;
    for c in line.chars() {
        let len = c.len_utf8();
        // Continuation lines start with a space, which counts towards the limit
        if width + len > LIMIT {
            out.push_str("\r\n ");
            width = 1;
        }
        out.push(c);
        width += len;
    }
    out
}

fn unfold(input: &str) -> Vec<String> {
    let mut lines: Vec<String> = Vec::new();
    for raw in input.split('\n') {
        let raw = raw.strip_suffix('\r').unwrap_or(raw);
        if let Some(rest) = raw.strip_prefix(' ').or_else(|| raw.strip_prefix('\t')) {
            if let Some(last) = lines.last_mut() {
                last.push_str(rest);
                continue;
            }
        }
        lines.push(raw.to_string());
    }
    lines
}

/// `20250310`, `20250310T140000Z` or `20250310T140000`; only the date is kept.
fn parse_date(value: &str) -> Option<NaiveDate> {
    let date = value.get(..8)?;
    NaiveDate::parse_from_str(date, DATE_FORMAT).ok()
}

#[derive(Default)]
struct PendingEvent {
    uid: Option<String>,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    summary: String,
}

/// Parses the VEVENTs of a feed. Events without a usable start date are skipped,
/// a missing or non-advancing end is treated as a single night.
pub fn parse_calendar(input: &str) -> Vec<CalendarEvent> {
    let mut events = Vec::new();
    let mut current: Option<PendingEvent> = None;

    for line in unfold(input) {
        let Some((name_and_params, value)) = line.split_once(':') else {
            continue;
        };
        let name = name_and_params
            .split(';')
            .next()
            .unwrap_or_default()
            .to_ascii_uppercase();

        match name.as_str() {
            "BEGIN" if value.eq_ignore_ascii_case("VEVENT") => {
                current = Some(PendingEvent::default());
            }
            "END" if value.eq_ignore_ascii_case("VEVENT") => {
                let Some(pending) = current.take() else {
                    continue;
                };
                let Some(start) = pending.start else {
                    continue;
                };
                let end = pending.end.filter(|e| *e > start).unwrap_or(start + Duration::days(1));
                events.push(CalendarEvent {
                    uid: pending
                        .uid
                        .unwrap_or_else(|| format!("{}-{}", start.format(DATE_FORMAT), end.format(DATE_FORMAT))),
                    start,
                    end,
                    summary: pending.summary,
                });
            }
            _ => {
                let Some(event) = current.as_mut() else {
                    continue;
                };
                match name.as_str() {
                    "UID" => event.uid = Some(value.trim().to_string()),
                    "DTSTART" => event.start = parse_date(value.trim()),
                    "DTEND" => event.end = parse_date(value.trim()),
                    "SUMMARY" => event.summary = unescape_text(value),
                    _ => {}
                }
            }
        }
    }

    events
}
