use std::collections::{BTreeMap, BTreeSet};
use std::sync::OnceLock;

use chrono::{NaiveDate, NaiveDateTime};
use nom::{
    bytes::complete::take_while_m_n,
    character::complete::char,
    combinator::{map_opt, map_res},
    sequence::{delimited, tuple},
    IResult,
};
use regex::Regex;
use tracing::{debug, info, warn};

use crate::error::{LogError, Result};
use crate::models::*;

/// Gaps up to this many seconds between casts count as active time
pub const AFK_THRESHOLD_SECS: i64 = 120;

const EXPERIENCE_PHRASE: &str = "You gain party experience";
const CAST_PHRASES: [&str; 3] = ["You begin casting", "Your spell fizzles", "Beginning to memorize"];

const WEEKDAYS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];
const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Parse an EQ log held fully in memory and return the session report.
///
/// With `date_filter`, timestamped lines from other days are dropped before
/// classification; lines without a timestamp always pass through. With
/// `debug`, experience lines are kept in `Report::excluded_lines`.
pub fn parse(contents: &str, date_filter: Option<NaiveDate>, debug: bool) -> Report {
    let mut activity = ActivityTracker::new();
    let mut skills = SkillTracker::new();
    let mut experience_count: u64 = 0;
    let mut malformed_cast_lines = 0;
    let mut excluded_lines = Vec::new();
    let mut total_log_entries = 0;

    for (line_no, line) in contents.lines().enumerate() {
        total_log_entries += 1;

        let timestamp = extract_timestamp(line);
        if let (Some(date), Some(ts)) = (date_filter, timestamp) {
            if ts.date() != date {
                continue;
            }
        }

        let events = classify(line);

        if events.experience {
            experience_count += 1;
            if debug {
                excluded_lines.push(line.to_string());
            }
            continue;
        }

        if events.cast_attempt {
            match timestamp {
                Some(ts) => {
                    debug!("Matched cast at {}: {}", ts.to_log_format(), message_text(line));
                    activity.record_cast(ts);
                }
                None => {
                    malformed_cast_lines += 1;
                    warn!("Skipping cast line {} with malformed timestamp: {}", line_no + 1, line);
                }
            }
        }

        if let Some((skill, level)) = events.skill_up {
            debug!("Skill-up: {} -> {}", skill, level);
            skills.record(skill, level);
        }
    }

    info!(
        "Scanned {} lines: active={}s afk={}s exp={} skills={}",
        total_log_entries,
        activity.active_seconds,
        activity.afk_seconds,
        experience_count,
        skills.records.len()
    );

    Report {
        active_seconds: activity.active_seconds,
        afk_seconds: activity.afk_seconds,
        processing_secs: 0.0,
        first_cast_time: activity.first_cast_time.map(|t| t.0),
        last_cast_time: activity.last_cast_time.map(|t| t.0),
        skills: skills.records,
        experience_count,
        total_log_entries,
        malformed_cast_lines,
        selected_date: date_filter,
        excluded_lines,
    }
}

/// Distinct calendar dates present in the log, most recent first
pub fn extract_distinct_dates(contents: &str) -> Vec<NaiveDate> {
    let dates: BTreeSet<NaiveDate> = contents
        .lines()
        .filter_map(extract_timestamp)
        .map(|ts| ts.date())
        .collect();
    dates.into_iter().rev().collect()
}

/// Pick the date at a 1-based menu index
pub fn select_date(dates: &[NaiveDate], index: usize) -> Result<NaiveDate> {
    select(dates, index).copied()
}

/// Bounds-checked 1-based lookup shared by the log and date menus
pub fn select<T>(items: &[T], index: usize) -> Result<&T> {
    index
        .checked_sub(1)
        .and_then(|i| items.get(i))
        .ok_or(LogError::InvalidSelection { index, len: items.len() })
}

// ── Event classification ─────────────────────────────────────────────────────

/// Determine what a line contributes. Experience lines are not checked any
/// further; cast attempts and skill-ups are independent of each other.
pub fn classify(line: &str) -> LineEvents {
    if line.contains(EXPERIENCE_PHRASE) {
        return LineEvents {
            experience: true,
            ..LineEvents::default()
        };
    }

    LineEvents {
        experience: false,
        cast_attempt: CAST_PHRASES.iter().any(|p| line.contains(p)),
        skill_up: parse_skill_up(line),
    }
}

fn skill_up_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"You have become better at (.+?)! \((\d+)\)").expect("skill-up pattern is valid")
    })
}

/// "You have become better at <skill>! (<level>)"
fn parse_skill_up(line: &str) -> Option<(String, u32)> {
    let caps = skill_up_regex().captures(line)?;
    let level = caps[2].parse::<u32>().ok()?;
    Some((caps[1].to_string(), level))
}

/// Message text after the timestamp bracket
fn message_text(line: &str) -> &str {
    line.split_once(']').map(|(_, rest)| rest.trim()).unwrap_or(line)
}

// ── Timestamp extraction ─────────────────────────────────────────────────────

/// Parse the `[Www Mmm DD HH:MM:SS YYYY]` prefix; `None` if absent or invalid
pub fn extract_timestamp(line: &str) -> Option<Timestamp> {
    timestamp(line).ok().map(|(_, dt)| Timestamp(dt))
}

fn timestamp(input: &str) -> IResult<&str, NaiveDateTime> {
    map_opt(
        delimited(
            char('['),
            tuple((
                weekday,
                char(' '),
                month,
                char(' '),
                digits(2),
                char(' '),
                digits(2),
                char(':'),
                digits(2),
                char(':'),
                digits(2),
                char(' '),
                digits(4),
            )),
            char(']'),
        ),
        |(_, _, month, _, day, _, hour, _, min, _, sec, _, year)| {
            NaiveDate::from_ymd_opt(year as i32, month, day)?.and_hms_opt(hour, min, sec)
        },
    )(input)
}

fn alpha3(input: &str) -> IResult<&str, &str> {
    take_while_m_n(3, 3, |c: char| c.is_ascii_alphabetic())(input)
}

fn weekday(input: &str) -> IResult<&str, &str> {
    map_opt(alpha3, |s: &str| {
        WEEKDAYS.iter().any(|w| w.eq_ignore_ascii_case(s)).then_some(s)
    })(input)
}

fn month(input: &str) -> IResult<&str, u32> {
    map_opt(alpha3, |s: &str| {
        MONTHS
            .iter()
            .position(|m| m.eq_ignore_ascii_case(s))
            .map(|i| i as u32 + 1)
    })(input)
}

fn digits<'a>(n: usize) -> impl FnMut(&'a str) -> IResult<&'a str, u32> {
    move |input: &'a str| {
        map_res(take_while_m_n(n, n, |c: char| c.is_ascii_digit()), |s: &str| {
            s.parse::<u32>()
        })(input)
    }
}

// ── Trackers ─────────────────────────────────────────────────────────────────

/// Splits time between consecutive cast attempts into active and AFK
struct ActivityTracker {
    previous_cast: Option<Timestamp>,
    active_seconds: i64,
    afk_seconds: i64,
    first_cast_time: Option<Timestamp>,
    /// Most recently seen, not the maximum
    last_cast_time: Option<Timestamp>,
}

impl ActivityTracker {
    fn new() -> Self {
        ActivityTracker {
            previous_cast: None,
            active_seconds: 0,
            afk_seconds: 0,
            first_cast_time: None,
            last_cast_time: None,
        }
    }

    fn record_cast(&mut self, ts: Timestamp) {
        if self.first_cast_time.is_none() {
            self.first_cast_time = Some(ts);
        }
        self.last_cast_time = Some(ts);

        // Out-of-order lines give a negative gap, added unclamped
        if let Some(prev) = self.previous_cast {
            let gap = (ts.0 - prev.0).num_seconds();
            if gap <= AFK_THRESHOLD_SECS {
                self.active_seconds += gap;
                debug!("Gap {}s -> active", gap);
            } else {
                self.afk_seconds += gap;
                debug!("Gap {}s -> AFK", gap);
            }
        }

        self.previous_cast = Some(ts);
    }
}

struct SkillTracker {
    records: BTreeMap<String, SkillRecord>,
}

impl SkillTracker {
    fn new() -> Self {
        SkillTracker {
            records: BTreeMap::new(),
        }
    }

    /// First sighting fixes `start`; later ones only move `end`
    fn record(&mut self, skill: String, level: u32) {
        self.records
            .entry(skill)
            .and_modify(|r| r.end = level)
            .or_insert(SkillRecord {
                start: level,
                end: level,
            });
    }
}
