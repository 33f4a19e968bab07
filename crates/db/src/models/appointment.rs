//! Appointment entity model and DTOs.

use chrono::{NaiveDate, NaiveTime};
use serde::Serialize;
use sqlx::FromRow;
use cortexa_core::types::{DbId, Timestamp};

use super::hhmm;

/// A row from the `appointments` table.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: DbId,
    pub parent_id: DbId,
    pub child_id: DbId,
    pub therapist_id: DbId,
    pub appointment_date: NaiveDate,
    #[serde(with = "hhmm")]
    pub appointment_time: NaiveTime,
    pub reason: Option<String>,
    pub notes: Option<String>,
    pub appointment_type: String,
    pub status: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Appointment joined with child, parent and therapist display fields.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentDetail {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub appointment: Appointment,
    pub child_name: Option<String>,
    pub parent_name: Option<String>,
    pub therapist_name: Option<String>,
}

/// DTO for booking an appointment.
#[derive(Debug, Clone)]
pub struct CreateAppointment {
    pub parent_id: DbId,
    pub child_id: DbId,
    pub therapist_id: DbId,
    pub appointment_date: NaiveDate,
    pub appointment_time: NaiveTime,
    pub reason: Option<String>,
}
