//! Therapist availability windows.

use chrono::{NaiveDate, NaiveTime};
use serde::Serialize;
use sqlx::FromRow;
use cortexa_core::scheduling::{SlotWindow, TimeSlot};
use cortexa_core::types::{DbId, Timestamp};

use super::hhmm;

/// A row from the `therapist_slots` table.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TherapistSlot {
    pub id: DbId,
    pub therapist_id: DbId,
    pub slot_date: NaiveDate,
    #[serde(with = "hhmm")]
    pub start_time: NaiveTime,
    #[serde(with = "hhmm")]
    pub end_time: NaiveTime,
    pub interval_minutes: i32,
    pub break_minutes: i32,
    pub mode: String,
    pub hospital_clinic_name: Option<String>,
    pub is_active: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl TherapistSlot {
    pub fn window(&self) -> SlotWindow {
        SlotWindow {
            start: self.start_time,
            end: self.end_time,
            interval_minutes: self.interval_minutes,
            break_minutes: self.break_minutes,
        }
    }

    /// Every bookable slot in this window.
    pub fn time_slots(&self) -> Vec<TimeSlot> {
        self.window().generate()
    }
}

/// DTO for creating an availability window.
#[derive(Debug, Clone)]
pub struct CreateSlot {
    pub therapist_id: DbId,
    pub slot_date: NaiveDate,
    pub window: SlotWindow,
    pub mode: String,
    pub hospital_clinic_name: Option<String>,
}
