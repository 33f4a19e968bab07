//! Screening submissions.

use serde::Serialize;
use sqlx::FromRow;
use cortexa_core::types::{DbId, Timestamp};

/// A row from the `screenings` table.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Screening {
    pub id: DbId,
    pub user_id: DbId,
    pub patient_id: Option<DbId>,
    pub child_name: Option<String>,
    pub screening_type: String,
    pub result: Option<String>,
    pub file_path: Option<String>,
    pub gaze_direction: Option<String>,
    pub attention_score: Option<f64>,
    pub head_pitch: Option<f64>,
    pub head_yaw: Option<f64>,
    pub notes: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for recording a screening.
#[derive(Debug, Clone, Default)]
pub struct CreateScreening {
    pub user_id: DbId,
    pub patient_id: Option<DbId>,
    pub child_name: Option<String>,
    pub screening_type: String,
    pub result: Option<String>,
    pub file_path: Option<String>,
    pub gaze_direction: Option<String>,
    pub attention_score: Option<f64>,
    pub head_pitch: Option<f64>,
    pub head_yaw: Option<f64>,
    pub notes: Option<String>,
}
