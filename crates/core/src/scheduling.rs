//! Therapist availability windows, slot generation, and appointment time parsing.
//!
//! Times travel over the wire as `HH:MM` (24h) strings and dates as
//! `YYYY-MM-DD`. Slot arithmetic is done in minutes since midnight so a
//! window can never wrap past 24:00.

use std::sync::LazyLock;

use chrono::{NaiveDate, NaiveTime, Timelike};
use regex::Regex;
use serde::Serialize;

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Length of a therapy session in minutes, as shown on the dashboard.
pub const SESSION_DURATION_MINS: i32 = 45;

/// Flat billing amount per session.
pub const SESSION_BILLING_AMOUNT: i32 = 120;

/// Upper bound on slot interval and break lengths (one full day).
const MAX_WINDOW_MINS: i32 = 24 * 60;

static TIME_24H_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([01]\d|2[0-3]):([0-5]\d)$").expect("valid regex"));

static TIME_12H_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(0?[1-9]|1[0-2]):([0-5]\d)\s?(AM|PM)$").expect("valid regex")
});

static DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("valid regex"));

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// One bookable slot, `[start, end)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimeSlot {
    pub start: String,
    pub end: String,
}

/// A therapist's availability for one day.
#[derive(Debug, Clone, Copy)]
pub struct SlotWindow {
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub interval_minutes: i32,
    pub break_minutes: i32,
}

impl SlotWindow {
    /// Build a window from wire strings, validating every field.
    pub fn parse(
        start: &str,
        end: &str,
        interval_minutes: i32,
        break_minutes: i32,
    ) -> Result<Self, CoreError> {
        let window = Self {
            start: parse_hhmm(start)?,
            end: parse_hhmm(end)?,
            interval_minutes,
            break_minutes,
        };
        window.validate()?;
        Ok(window)
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if self.start >= self.end {
            return Err(CoreError::Validation(
                "Start time must be before end time".into(),
            ));
        }
        if self.interval_minutes <= 0 || self.interval_minutes > MAX_WINDOW_MINS {
            return Err(CoreError::Validation(
                "Interval must be a positive number of minutes".into(),
            ));
        }
        if self.break_minutes < 0 || self.break_minutes > MAX_WINDOW_MINS {
            return Err(CoreError::Validation(
                "Break time cannot be negative".into(),
            ));
        }
        Ok(())
    }

    /// Expand the window into consecutive slots.
    ///
    /// A slot is emitted while it ends at or before the window end; the next
    /// slot starts after the current one plus the break.
    pub fn generate(&self) -> Vec<TimeSlot> {
        let end = minutes_of(self.end);
        let mut cursor = minutes_of(self.start);
        let mut slots = Vec::new();

        if self.interval_minutes <= 0 || self.break_minutes < 0 {
            return slots;
        }

        while cursor + self.interval_minutes <= end {
            let slot_end = cursor + self.interval_minutes;
            slots.push(TimeSlot {
                start: format_minutes(cursor),
                end: format_minutes(slot_end),
            });
            cursor = slot_end + self.break_minutes;
        }
        slots
    }
}

// ---------------------------------------------------------------------------
// Slot helpers
// ---------------------------------------------------------------------------

/// Remove slots whose start time is already booked.
pub fn free_slots(slots: Vec<TimeSlot>, booked_times: &[String]) -> Vec<TimeSlot> {
    slots
        .into_iter()
        .filter(|slot| !booked_times.iter().any(|t| t == &slot.start))
        .collect()
}

/// Reject availability windows on dates before `today`.
pub fn validate_slot_date(date: NaiveDate, today: NaiveDate) -> Result<(), CoreError> {
    if date < today {
        return Err(CoreError::Validation(
            "Cannot create slots for past dates".into(),
        ));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Parse a strict `HH:MM` 24-hour time.
pub fn parse_hhmm(value: &str) -> Result<NaiveTime, CoreError> {
    let caps = TIME_24H_RE
        .captures(value.trim())
        .ok_or_else(|| CoreError::Validation(format!("Invalid time '{value}', expected HH:MM")))?;
    hm_to_time(&caps[1], &caps[2], value)
}

/// Parse a strict `YYYY-MM-DD` date.
pub fn parse_date(value: &str) -> Result<NaiveDate, CoreError> {
    let value = value.trim();
    if !DATE_RE.is_match(value) {
        return Err(CoreError::Validation(
            "Invalid date format. Use YYYY-MM-DD".into(),
        ));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| CoreError::Validation(format!("Invalid calendar date '{value}'")))
}

/// Accept `HH:MM` (24h) or `H:MM AM/PM` and normalise to `HH:MM` (24h).
pub fn normalize_appointment_time(value: &str) -> Result<String, CoreError> {
    let value = value.trim();
    if let Some(caps) = TIME_24H_RE.captures(value) {
        let time = hm_to_time(&caps[1], &caps[2], value)?;
        return Ok(format_time(time));
    }
    if let Some(caps) = TIME_12H_RE.captures(value) {
        let hour: u32 = caps[1].parse().unwrap_or(0);
        let minute: u32 = caps[2].parse().unwrap_or(0);
        let pm = caps[3].eq_ignore_ascii_case("PM");
        let hour24 = match (hour, pm) {
            (12, false) => 0,
            (12, true) => 12,
            (h, true) => h + 12,
            (h, false) => h,
        };
        let time = NaiveTime::from_hms_opt(hour24, minute, 0)
            .ok_or_else(|| CoreError::Validation(format!("Invalid time '{value}'")))?;
        return Ok(format_time(time));
    }
    Err(CoreError::Validation(
        "Invalid time format. Use HH:MM (24h) or HH:MM AM/PM".into(),
    ))
}

/// Format a time as `HH:MM`.
pub fn format_time(time: NaiveTime) -> String {
    format!("{:02}:{:02}", time.hour(), time.minute())
}

fn hm_to_time(hour: &str, minute: &str, original: &str) -> Result<NaiveTime, CoreError> {
    let h: u32 = hour
        .parse()
        .map_err(|_| CoreError::Validation(format!("Invalid time '{original}'")))?;
    let m: u32 = minute
        .parse()
        .map_err(|_| CoreError::Validation(format!("Invalid time '{original}'")))?;
    NaiveTime::from_hms_opt(h, m, 0)
        .ok_or_else(|| CoreError::Validation(format!("Invalid time '{original}'")))
}

fn minutes_of(time: NaiveTime) -> i32 {
    (time.hour() * 60 + time.minute()) as i32
}

fn format_minutes(total: i32) -> String {
    format!("{:02}:{:02}", total / 60, total % 60)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn window(start: &str, end: &str, interval: i32, brk: i32) -> SlotWindow {
        SlotWindow::parse(start, end, interval, brk).expect("valid window")
    }

    #[test]
    fn generates_back_to_back_slots() {
        let slots = window("09:00", "11:00", 30, 0).generate();
        let starts: Vec<_> = slots.iter().map(|s| s.start.as_str()).collect();
        assert_eq!(starts, ["09:00", "09:30", "10:00", "10:30"]);
        assert_eq!(slots.last().map(|s| s.end.as_str()), Some("11:00"));
    }

    #[test]
    fn break_is_inserted_between_slots() {
        let slots = window("09:00", "12:00", 45, 15).generate();
        assert_eq!(
            slots,
            vec![
                TimeSlot { start: "09:00".into(), end: "09:45".into() },
                TimeSlot { start: "10:00".into(), end: "10:45".into() },
                TimeSlot { start: "11:00".into(), end: "11:45".into() },
            ]
        );
    }

    #[test]
    fn partial_trailing_slot_is_dropped() {
        let slots = window("09:00", "10:40", 30, 5).generate();
        // 09:00-09:30, 09:35-10:05; 10:10-10:40 fits exactly.
        assert_eq!(slots.len(), 3);
        assert_eq!(slots[2].end, "10:40");

        let slots = window("09:00", "10:39", 30, 5).generate();
        assert_eq!(slots.len(), 2);
    }

    #[test]
    fn window_shorter_than_interval_is_empty() {
        assert!(window("09:00", "09:20", 30, 0).generate().is_empty());
    }

    #[test]
    fn late_window_does_not_wrap_midnight() {
        let slots = window("22:30", "23:59", 30, 0).generate();
        assert_eq!(slots.len(), 2);
        assert_eq!(slots[1].end, "23:30");
    }

    #[test]
    fn invalid_windows_are_rejected() {
        assert!(SlotWindow::parse("10:00", "09:00", 30, 0).is_err());
        assert!(SlotWindow::parse("09:00", "10:00", 0, 0).is_err());
        assert!(SlotWindow::parse("09:00", "10:00", 30, -5).is_err());
        assert!(SlotWindow::parse("9am", "10:00", 30, 0).is_err());
    }

    #[test]
    fn free_slots_excludes_booked_times() {
        let slots = window("09:00", "10:30", 30, 0).generate();
        let free = free_slots(slots, &["09:30".to_string()]);
        let starts: Vec<_> = free.iter().map(|s| s.start.as_str()).collect();
        assert_eq!(starts, ["09:00", "10:00"]);
    }

    #[test]
    fn normalizes_twelve_hour_times() {
        assert_eq!(normalize_appointment_time("9:05 AM").unwrap(), "09:05");
        assert_eq!(normalize_appointment_time("12:00 AM").unwrap(), "00:00");
        assert_eq!(normalize_appointment_time("12:30PM").unwrap(), "12:30");
        assert_eq!(normalize_appointment_time("07:15 pm").unwrap(), "19:15");
    }

    #[test]
    fn accepts_twenty_four_hour_times() {
        assert_eq!(normalize_appointment_time("00:00").unwrap(), "00:00");
        assert_eq!(normalize_appointment_time("23:59").unwrap(), "23:59");
    }

    #[test]
    fn rejects_bad_times() {
        assert!(normalize_appointment_time("24:00").is_err());
        assert!(normalize_appointment_time("13:00 PM").is_err());
        assert!(normalize_appointment_time("9:5").is_err());
        assert!(normalize_appointment_time("").is_err());
    }

    #[test]
    fn parses_dates_strictly() {
        assert_eq!(
            parse_date("2026-03-01").unwrap(),
            NaiveDate::from_ymd_opt(2026, 3, 1).unwrap()
        );
        assert!(parse_date("2026-3-1").is_err());
        assert!(parse_date("2026-02-30").is_err());
        assert!(parse_date("01/03/2026").is_err());
    }

    #[test]
    fn past_dates_are_rejected() {
        let today = NaiveDate::from_ymd_opt(2026, 5, 10).unwrap();
        assert!(validate_slot_date(today, today).is_ok());
        assert!(validate_slot_date(today.succ_opt().unwrap(), today).is_ok());
        assert!(validate_slot_date(today.pred_opt().unwrap(), today).is_err());
    }
}
