//! Speech-therapy practice sessions.

use serde::Serialize;
use sqlx::FromRow;
use cortexa_core::types::{DbId, Timestamp};

/// A row from the `speech_therapy_sessions` table.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeechSession {
    pub id: DbId,
    pub child_id: DbId,
    pub session_date: Timestamp,
    pub audio_file_path: String,
    pub original_file_name: Option<String>,
    pub practice_prompt: Option<String>,
    pub sample_audio_path: Option<String>,
    pub rating: String,
    pub feedback: String,
    pub evaluated_by: Option<DbId>,
    pub evaluated_at: Option<Timestamp>,
    pub status: String,
    pub session_number: i32,
    pub duration_secs: Option<f64>,
    pub notes: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Pending session joined with the child's name, for evaluator queues.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingSpeechSession {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub session: SpeechSession,
    pub child_name: String,
}

#[derive(Debug, Clone)]
pub struct CreateSpeechSession {
    pub child_id: DbId,
    pub audio_file_path: String,
    pub original_file_name: Option<String>,
    pub practice_prompt: Option<String>,
    pub sample_audio_path: Option<String>,
    pub duration_secs: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct EvaluateSpeechSession {
    pub rating: String,
    pub feedback: Option<String>,
    pub notes: Option<String>,
    pub evaluated_by: DbId,
}
