//! Calendar buckets for the admin screening-trend chart.
//!
//! The chart covers one school term: August of a given year through January
//! of the next.

use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Utc};
use serde::Serialize;

use crate::types::Timestamp;

const TERM_START_MONTH: u32 = 8;
const TERM_MONTHS: u32 = 6;

/// One calendar month, `[start, end)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthBucket {
    pub label: &'static str,
    pub start: Timestamp,
    pub end: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthCount {
    pub month: &'static str,
    pub screenings: i64,
}

fn month_name(month: u32) -> &'static str {
    match month {
        1 => "January",
        2 => "February",
        3 => "March",
        4 => "April",
        5 => "May",
        6 => "June",
        7 => "July",
        8 => "August",
        9 => "September",
        10 => "October",
        11 => "November",
        _ => "December",
    }
}

fn first_of(year: i32, month: u32) -> Timestamp {
    let date = NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(NaiveDate::MIN);
    Utc.from_utc_datetime(&date.and_time(chrono::NaiveTime::MIN))
}

fn next_month(year: i32, month: u32) -> (i32, u32) {
    if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    }
}

/// August..January buckets for the term starting in `year`.
pub fn term_buckets(year: i32) -> Vec<MonthBucket> {
    let mut buckets = Vec::with_capacity(TERM_MONTHS as usize);
    let (mut y, mut m) = (year, TERM_START_MONTH);
    for _ in 0..TERM_MONTHS {
        let (ny, nm) = next_month(y, m);
        buckets.push(MonthBucket {
            label: month_name(m),
            start: first_of(y, m),
            end: first_of(ny, nm),
        });
        (y, m) = (ny, nm);
    }
    buckets
}

/// Count timestamps into the term buckets; months without data report zero.
pub fn count_by_month(buckets: &[MonthBucket], created: &[DateTime<Utc>]) -> Vec<MonthCount> {
    buckets
        .iter()
        .map(|b| MonthCount {
            month: b.label,
            screenings: created
                .iter()
                .filter(|t| **t >= b.start && **t < b.end)
                .count() as i64,
        })
        .collect()
}

/// Start of the term window for the current calendar year.
pub fn current_term_year(now: Timestamp) -> i32 {
    now.year()
}
