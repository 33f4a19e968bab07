//! Gaze-capture sessions and snapshots.

use serde::Serialize;
use sqlx::FromRow;
use cortexa_core::types::{DbId, Timestamp};

/// A row from the `gaze_sessions` table.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GazeSession {
    pub id: DbId,
    pub patient_id: Option<DbId>,
    pub therapist_id: Option<DbId>,
    pub is_guest: bool,
    pub guest_child_name: Option<String>,
    pub guest_parent_name: Option<String>,
    pub guest_email: Option<String>,
    pub status: String,
    pub start_time: Timestamp,
    pub end_time: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A row from the `gaze_snapshots` table.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GazeSnapshot {
    pub id: DbId,
    pub session_id: DbId,
    pub image_path: String,
    #[serde(rename = "timestamp")]
    pub captured_at: Timestamp,
    pub gaze_direction: Option<String>,
    pub attention_score: Option<f64>,
    pub head_pitch: Option<f64>,
    pub head_yaw: Option<f64>,
    pub notes: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Guest contact details captured when no account is involved.
#[derive(Debug, Clone, Default)]
pub struct GuestInfo {
    pub child_name: String,
    pub parent_name: String,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct CreateGazeSession {
    pub patient_id: Option<DbId>,
    pub therapist_id: Option<DbId>,
    /// `Some` marks the session as a guest session.
    pub guest: Option<GuestInfo>,
    pub status: String,
}

#[derive(Debug, Clone)]
pub struct CreateGazeSnapshot {
    pub image_path: String,
    pub captured_at: Timestamp,
    pub gaze_direction: Option<String>,
    pub attention_score: Option<f64>,
    pub head_pitch: Option<f64>,
    pub head_yaw: Option<f64>,
}
