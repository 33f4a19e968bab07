//! Patient (child) entity model and DTOs.

use serde::Serialize;
use sqlx::FromRow;
use cortexa_core::types::{DbId, Timestamp};

/// A row from the `patients` table.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    pub id: DbId,
    pub patient_code: String,
    pub name: String,
    pub age: Option<i32>,
    pub gender: Option<String>,
    pub grade: Option<String>,
    pub medical_history: Option<String>,
    pub parent_id: Option<DbId>,
    pub therapist_user_id: Option<DbId>,
    pub teacher_id: Option<DbId>,
    pub screening_status: String,
    pub report_status: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Patient joined with the names of the adults attached to it.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientWithContacts {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub patient: Patient,
    pub parent_name: Option<String>,
    pub parent_email: Option<String>,
    pub therapist_name: Option<String>,
}

/// DTO for creating a new patient.
#[derive(Debug, Clone)]
pub struct CreatePatient {
    pub patient_code: String,
    pub name: String,
    pub age: Option<i32>,
    pub gender: Option<String>,
    pub grade: Option<String>,
    pub medical_history: Option<String>,
    pub parent_id: Option<DbId>,
    pub teacher_id: Option<DbId>,
}

/// DTO for updating a patient. All fields are optional.
#[derive(Debug, Clone, Default)]
pub struct UpdatePatient {
    pub name: Option<String>,
    pub age: Option<i32>,
    pub gender: Option<String>,
    pub grade: Option<String>,
    pub medical_history: Option<String>,
}
