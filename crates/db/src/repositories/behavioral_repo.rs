//! Repository for the `behavioral_assessments` table.

use sqlx::types::Json;
use sqlx::PgPool;
use cortexa_core::types::{DbId, Timestamp};

use crate::models::behavioral::{BehavioralAssessment, CreateBehavioralAssessment};

const COLUMNS: &str = "id, student_id, teacher_id, assessment_type, score, session_ref, game, \
                        eye_contact_time, object_focus_time, eye_contact_ratio, object_focus_ratio, \
                        gaze_shift_count, session_duration, total_actions, correct_imitations, \
                        imitation_accuracy, average_reaction_time, mean_similarity_score, \
                        metrics, indicators, raw_game_data, completed_at, created_at, updated_at";

pub struct BehavioralRepo;

impl BehavioralRepo {
    pub async fn create(
        pool: &PgPool,
        input: &CreateBehavioralAssessment,
    ) -> Result<BehavioralAssessment, sqlx::Error> {
        let query = format!(
            "INSERT INTO behavioral_assessments (
                student_id, teacher_id, assessment_type, score, session_ref, game,
                eye_contact_time, object_focus_time, eye_contact_ratio, object_focus_ratio,
                gaze_shift_count, session_duration, total_actions, correct_imitations,
                imitation_accuracy, average_reaction_time, mean_similarity_score,
                metrics, indicators, raw_game_data, completed_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16,
                     $17, $18, $19, $20, COALESCE($21, NOW()))
             RETURNING {COLUMNS}"
        );
        let eye = &input.eye_gaze;
        let imitation = &input.imitation;
        sqlx::query_as::<_, BehavioralAssessment>(&query)
            .bind(input.student_id)
            .bind(input.teacher_id)
            .bind(&input.assessment_type)
            .bind(input.score)
            .bind(&input.session_ref)
            .bind(&input.game)
            .bind(eye.eye_contact_time)
            .bind(eye.object_focus_time)
            .bind(eye.eye_contact_ratio)
            .bind(eye.object_focus_ratio)
            .bind(eye.gaze_shift_count)
            .bind(eye.session_duration)
            .bind(imitation.total_actions)
            .bind(imitation.correct_imitations)
            .bind(imitation.imitation_accuracy)
            .bind(imitation.average_reaction_time)
            .bind(imitation.mean_similarity_score)
            .bind(Json(&input.metrics))
            .bind(Json(&input.indicators))
            .bind(input.raw_game_data.as_ref().map(Json))
            .bind(input.completed_at)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<BehavioralAssessment>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM behavioral_assessments WHERE id = $1");
        sqlx::query_as::<_, BehavioralAssessment>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// A student's assessments, newest first, optionally only those
    /// recorded by one teacher.
    pub async fn list_for_student(
        pool: &PgPool,
        student_id: DbId,
        teacher_id: Option<DbId>,
    ) -> Result<Vec<BehavioralAssessment>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM behavioral_assessments
             WHERE student_id = $1 AND ($2::BIGINT IS NULL OR teacher_id = $2)
             ORDER BY completed_at DESC"
        );
        sqlx::query_as::<_, BehavioralAssessment>(&query)
            .bind(student_id)
            .bind(teacher_id)
            .fetch_all(pool)
            .await
    }

    pub async fn list_by_type(
        pool: &PgPool,
        teacher_id: DbId,
        assessment_type: &str,
    ) -> Result<Vec<BehavioralAssessment>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM behavioral_assessments
             WHERE teacher_id = $1 AND assessment_type = $2
             ORDER BY completed_at DESC"
        );
        sqlx::query_as::<_, BehavioralAssessment>(&query)
            .bind(teacher_id)
            .bind(assessment_type)
            .fetch_all(pool)
            .await
    }

    /// `(student_id, score, completed_at)` for every assessment a teacher recorded.
    pub async fn stats_rows(
        pool: &PgPool,
        teacher_id: DbId,
    ) -> Result<Vec<(DbId, f64, Timestamp)>, sqlx::Error> {
        sqlx::query_as(
            "SELECT student_id, score, completed_at FROM behavioral_assessments
             WHERE teacher_id = $1",
        )
        .bind(teacher_id)
        .fetch_all(pool)
        .await
    }
}
