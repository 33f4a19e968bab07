//! Repository for the social-attention tables.

use sqlx::PgPool;
use cortexa_core::statuses::social_attention;

use crate::models::social_attention::{
    CompleteSocialAttention, CreateSocialAttentionSession, SocialAttentionSession,
};

const COLUMNS: &str = "id, session_id, student_id, teacher_id, test_type, status, start_time, \
                        end_time, left_look_time_ms, right_look_time_ms, total_time_ms, \
                        left_percentage, right_percentage, social_preference_score, confidence, \
                        clinical_summary, risk_flag, created_at, updated_at";

pub struct SocialAttentionRepo;

impl SocialAttentionRepo {
    pub async fn create(
        pool: &PgPool,
        input: &CreateSocialAttentionSession,
    ) -> Result<SocialAttentionSession, sqlx::Error> {
        let query = format!(
            "INSERT INTO social_attention_sessions (session_id, student_id, teacher_id)
             VALUES ($1, $2, $3)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, SocialAttentionSession>(&query)
            .bind(&input.session_id)
            .bind(input.student_id)
            .bind(input.teacher_id)
            .fetch_one(pool)
            .await
    }

    /// Insert an already-scored session in one step.
    pub async fn create_completed(
        pool: &PgPool,
        input: &CreateSocialAttentionSession,
        result: &CompleteSocialAttention,
    ) -> Result<SocialAttentionSession, sqlx::Error> {
        let query = format!(
            "INSERT INTO social_attention_sessions (
                session_id, student_id, teacher_id, status, start_time, end_time,
                left_look_time_ms, right_look_time_ms, total_time_ms, left_percentage,
                right_percentage, social_preference_score, confidence, clinical_summary, risk_flag)
             VALUES ($1, $2, $3, $4, $5, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, SocialAttentionSession>(&query)
            .bind(&input.session_id)
            .bind(input.student_id)
            .bind(input.teacher_id)
            .bind(social_attention::COMPLETED)
            .bind(result.end_time)
            .bind(result.left_look_time_ms)
            .bind(result.right_look_time_ms)
            .bind(result.total_time_ms)
            .bind(result.score.left_percentage)
            .bind(result.score.right_percentage)
            .bind(result.score.social_preference)
            .bind(result.confidence)
            .bind(result.score.clinical_summary)
            .bind(result.score.risk_flag)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_session_id(
        pool: &PgPool,
        session_id: &str,
    ) -> Result<Option<SocialAttentionSession>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM social_attention_sessions WHERE session_id = $1");
        sqlx::query_as::<_, SocialAttentionSession>(&query)
            .bind(session_id)
            .fetch_optional(pool)
            .await
    }

    /// Write the final score and mark the session completed.
    pub async fn complete(
        pool: &PgPool,
        session_id: &str,
        result: &CompleteSocialAttention,
    ) -> Result<Option<SocialAttentionSession>, sqlx::Error> {
        let query = format!(
            "UPDATE social_attention_sessions SET
                status = $2,
                end_time = $3,
                left_look_time_ms = $4,
                right_look_time_ms = $5,
                total_time_ms = $6,
                left_percentage = $7,
                right_percentage = $8,
                social_preference_score = $9,
                confidence = COALESCE($10, confidence),
                clinical_summary = $11,
                risk_flag = $12
             WHERE session_id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, SocialAttentionSession>(&query)
            .bind(session_id)
            .bind(social_attention::COMPLETED)
            .bind(result.end_time)
            .bind(result.left_look_time_ms)
            .bind(result.right_look_time_ms)
            .bind(result.total_time_ms)
            .bind(result.score.left_percentage)
            .bind(result.score.right_percentage)
            .bind(result.score.social_preference)
            .bind(result.confidence)
            .bind(result.score.clinical_summary)
            .bind(result.score.risk_flag)
            .fetch_optional(pool)
            .await
    }

    pub async fn insert_frame(
        pool: &PgPool,
        session_id: &str,
        gaze_direction: &str,
        frame_timestamp: i64,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO social_attention_frames (session_id, gaze_direction, frame_timestamp)
             VALUES ($1, $2, $3)",
        )
        .bind(session_id)
        .bind(gaze_direction)
        .bind(frame_timestamp)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// `(gaze_direction, frame_timestamp)` per stored frame, in arrival order.
    pub async fn list_frames(
        pool: &PgPool,
        session_id: &str,
    ) -> Result<Vec<(String, i64)>, sqlx::Error> {
        sqlx::query_as(
            "SELECT gaze_direction, frame_timestamp FROM social_attention_frames
             WHERE session_id = $1
             ORDER BY id",
        )
        .bind(session_id)
        .fetch_all(pool)
        .await
    }

    pub async fn count_frames(pool: &PgPool, session_id: &str) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM social_attention_frames WHERE session_id = $1")
            .bind(session_id)
            .fetch_one(pool)
            .await
    }
}
