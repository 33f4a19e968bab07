//! Behavioural-assessment game results.

use serde::Serialize;
use serde_json::Value;
use sqlx::types::Json;
use sqlx::FromRow;
use cortexa_core::behavioral::AssessmentRecord;
use cortexa_core::types::{DbId, Timestamp};

/// A row from the `behavioral_assessments` table.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BehavioralAssessment {
    pub id: DbId,
    pub student_id: DbId,
    pub teacher_id: DbId,
    pub assessment_type: String,
    pub score: f64,
    #[serde(rename = "sessionId")]
    pub session_ref: Option<String>,
    pub game: Option<String>,
    pub eye_contact_time: Option<f64>,
    pub object_focus_time: Option<f64>,
    pub eye_contact_ratio: Option<f64>,
    pub object_focus_ratio: Option<f64>,
    pub gaze_shift_count: Option<i32>,
    pub session_duration: Option<f64>,
    pub total_actions: Option<i32>,
    pub correct_imitations: Option<i32>,
    pub imitation_accuracy: Option<f64>,
    pub average_reaction_time: Option<f64>,
    pub mean_similarity_score: Option<f64>,
    pub metrics: Json<Value>,
    pub indicators: Json<Value>,
    pub raw_game_data: Option<Json<Value>>,
    pub completed_at: Timestamp,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl BehavioralAssessment {
    /// The fields the behavioural analysis reads.
    pub fn to_record(&self) -> AssessmentRecord {
        AssessmentRecord {
            assessment_type: self.assessment_type.clone(),
            score: self.score,
            metrics: self.metrics.0.clone(),
            completed_at: self.completed_at,
        }
    }
}

/// Eye-gaze tracker fields stored as top-level columns.
#[derive(Debug, Clone, Default)]
pub struct EyeGazeFields {
    pub eye_contact_time: Option<f64>,
    pub object_focus_time: Option<f64>,
    pub eye_contact_ratio: Option<f64>,
    pub object_focus_ratio: Option<f64>,
    pub gaze_shift_count: Option<i32>,
    pub session_duration: Option<f64>,
}

/// Imitation game fields stored as top-level columns.
#[derive(Debug, Clone, Default)]
pub struct ImitationFields {
    pub total_actions: Option<i32>,
    pub correct_imitations: Option<i32>,
    pub imitation_accuracy: Option<f64>,
    pub average_reaction_time: Option<f64>,
    pub mean_similarity_score: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct CreateBehavioralAssessment {
    pub student_id: DbId,
    pub teacher_id: DbId,
    pub assessment_type: String,
    pub score: f64,
    pub session_ref: Option<String>,
    pub game: Option<String>,
    pub eye_gaze: EyeGazeFields,
    pub imitation: ImitationFields,
    pub metrics: Value,
    pub indicators: Value,
    pub raw_game_data: Option<Value>,
    pub completed_at: Option<Timestamp>,
}
