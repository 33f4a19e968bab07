//! Repository for the `speech_therapy_sessions` table.

use sqlx::PgPool;
use cortexa_core::statuses::speech;
use cortexa_core::types::DbId;

use crate::models::speech::{
    CreateSpeechSession, EvaluateSpeechSession, PendingSpeechSession, SpeechSession,
};

const COLUMNS: &str = "id, child_id, session_date, audio_file_path, original_file_name, \
                        practice_prompt, sample_audio_path, rating, feedback, evaluated_by, \
                        evaluated_at, status, session_number, duration_secs, notes, \
                        created_at, updated_at";

pub struct SpeechRepo;

impl SpeechRepo {
    /// Insert a recording numbered after the child's existing sessions.
    pub async fn create(
        pool: &PgPool,
        input: &CreateSpeechSession,
    ) -> Result<SpeechSession, sqlx::Error> {
        let query = format!(
            "INSERT INTO speech_therapy_sessions (child_id, audio_file_path, original_file_name, \
                                                  practice_prompt, sample_audio_path, \
                                                  duration_secs, session_number)
             VALUES ($1, $2, $3, $4, $5, $6,
                     (SELECT COUNT(*) + 1 FROM speech_therapy_sessions WHERE child_id = $1))
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, SpeechSession>(&query)
            .bind(input.child_id)
            .bind(&input.audio_file_path)
            .bind(&input.original_file_name)
            .bind(&input.practice_prompt)
            .bind(&input.sample_audio_path)
            .bind(input.duration_secs)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<SpeechSession>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM speech_therapy_sessions WHERE id = $1");
        sqlx::query_as::<_, SpeechSession>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// A child's sessions, newest first.
    pub async fn list_for_child(
        pool: &PgPool,
        child_id: DbId,
    ) -> Result<Vec<SpeechSession>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM speech_therapy_sessions
             WHERE child_id = $1
             ORDER BY session_date DESC, id DESC"
        );
        sqlx::query_as::<_, SpeechSession>(&query)
            .bind(child_id)
            .fetch_all(pool)
            .await
    }

    /// All sessions awaiting evaluation, oldest first.
    pub async fn list_pending(pool: &PgPool) -> Result<Vec<PendingSpeechSession>, sqlx::Error> {
        sqlx::query_as::<_, PendingSpeechSession>(
            "SELECT s.id, s.child_id, s.session_date, s.audio_file_path, s.original_file_name, \
                    s.practice_prompt, s.sample_audio_path, s.rating, s.feedback, s.evaluated_by, \
                    s.evaluated_at, s.status, s.session_number, s.duration_secs, s.notes, \
                    s.created_at, s.updated_at, p.name AS child_name
             FROM speech_therapy_sessions s
             JOIN patients p ON p.id = s.child_id
             WHERE s.status = $1
             ORDER BY s.session_date",
        )
        .bind(speech::PENDING)
        .fetch_all(pool)
        .await
    }

    pub async fn evaluate(
        pool: &PgPool,
        id: DbId,
        input: &EvaluateSpeechSession,
    ) -> Result<Option<SpeechSession>, sqlx::Error> {
        let query = format!(
            "UPDATE speech_therapy_sessions SET
                rating = $2,
                feedback = COALESCE($3, feedback),
                notes = COALESCE($4, notes),
                evaluated_by = $5,
                evaluated_at = NOW(),
                status = $6
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, SpeechSession>(&query)
            .bind(id)
            .bind(&input.rating)
            .bind(&input.feedback)
            .bind(&input.notes)
            .bind(input.evaluated_by)
            .bind(speech::EVALUATED)
            .fetch_optional(pool)
            .await
    }

    /// Delete a session, returning the removed row so its file can be cleaned up.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<Option<SpeechSession>, sqlx::Error> {
        let query = format!(
            "DELETE FROM speech_therapy_sessions WHERE id = $1 RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, SpeechSession>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }
}
