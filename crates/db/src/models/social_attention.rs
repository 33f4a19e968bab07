//! Social-attention (preferential looking) sessions.

use serde::Serialize;
use sqlx::FromRow;
use cortexa_core::social_attention::AttentionScore;
use cortexa_core::types::{DbId, Timestamp};

/// A row from the `social_attention_sessions` table.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SocialAttentionSession {
    pub id: DbId,
    pub session_id: String,
    pub student_id: DbId,
    pub teacher_id: Option<DbId>,
    pub test_type: String,
    pub status: String,
    pub start_time: Timestamp,
    pub end_time: Option<Timestamp>,
    pub left_look_time_ms: i64,
    pub right_look_time_ms: i64,
    pub total_time_ms: i64,
    pub left_percentage: f64,
    pub right_percentage: f64,
    pub social_preference_score: f64,
    pub confidence: Option<f64>,
    pub clinical_summary: Option<String>,
    pub risk_flag: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone)]
pub struct CreateSocialAttentionSession {
    pub session_id: String,
    pub student_id: DbId,
    pub teacher_id: Option<DbId>,
}

/// Final timings and score written when a session completes.
#[derive(Debug, Clone)]
pub struct CompleteSocialAttention {
    pub left_look_time_ms: i64,
    pub right_look_time_ms: i64,
    pub total_time_ms: i64,
    pub score: AttentionScore,
    pub confidence: Option<f64>,
    pub end_time: Timestamp,
}
