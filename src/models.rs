use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;

/// Leading `[Www Mmm DD HH:MM:SS YYYY]` prefix of a log line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timestamp(pub NaiveDateTime);

impl Timestamp {
    pub fn date(&self) -> NaiveDate {
        self.0.date()
    }

    /// Format back into the log grammar (weekday derived from the date)
    pub fn to_log_format(&self) -> String {
        self.0.format("[%a %b %d %H:%M:%S %Y]").to_string()
    }
}

/// What a single line contributes to the pass
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LineEvents {
    pub experience: bool,
    pub cast_attempt: bool,
    pub skill_up: Option<(String, u32)>,
}

/// First and latest observed level for one skill
#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
pub struct SkillRecord {
    pub start: u32,
    pub end: u32,
}

impl SkillRecord {
    /// Not validated: a later lower level yields a negative delta
    pub fn delta(&self) -> i64 {
        self.end as i64 - self.start as i64
    }
}

/// Result of one parsing pass over a log
#[derive(Debug, Serialize, Clone, Default, PartialEq)]
pub struct Report {
    pub active_seconds: i64,
    pub afk_seconds: i64,
    /// Wall-clock time of the pass, filled in by the caller
    pub processing_secs: f64,
    pub first_cast_time: Option<NaiveDateTime>,
    pub last_cast_time: Option<NaiveDateTime>,
    pub skills: BTreeMap<String, SkillRecord>,
    pub experience_count: u64,
    pub total_log_entries: usize,
    /// Cast lines skipped because their timestamp prefix did not parse
    pub malformed_cast_lines: usize,
    pub selected_date: Option<NaiveDate>,
    /// Raw experience lines, only collected in debug mode
    #[serde(skip)]
    pub excluded_lines: Vec<String>,
}

/// File listing info
#[derive(Debug, Serialize, Clone)]
pub struct LogFileInfo {
    pub filename: String,
    pub path: PathBuf,
    pub size_bytes: u64,
    pub size_display: String,
    pub modified: chrono::DateTime<chrono::Local>,
}
