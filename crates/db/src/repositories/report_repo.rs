//! Repository for the `reports` table.

use sqlx::PgPool;
use cortexa_core::types::DbId;

use crate::models::report::{CreateReport, Report};

const COLUMNS: &str = "id, teacher_id, patient_id, title, author, report_date, period, summary, \
                        strengths, recommendations, status, created_at, updated_at";

pub struct ReportRepo;

impl ReportRepo {
    pub async fn create(pool: &PgPool, input: &CreateReport) -> Result<Report, sqlx::Error> {
        let query = format!(
            "INSERT INTO reports (teacher_id, patient_id, title, author, period, summary, \
                                  strengths, recommendations, status)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Report>(&query)
            .bind(input.teacher_id)
            .bind(input.patient_id)
            .bind(&input.title)
            .bind(&input.author)
            .bind(&input.period)
            .bind(&input.summary)
            .bind(&input.strengths)
            .bind(&input.recommendations)
            .bind(&input.status)
            .fetch_one(pool)
            .await
    }

    pub async fn list_by_teacher(pool: &PgPool, teacher_id: DbId) -> Result<Vec<Report>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM reports WHERE teacher_id = $1 ORDER BY report_date DESC"
        );
        sqlx::query_as::<_, Report>(&query)
            .bind(teacher_id)
            .fetch_all(pool)
            .await
    }

    /// A teacher's reports on one student.
    pub async fn list_for_student(
        pool: &PgPool,
        teacher_id: DbId,
        patient_id: DbId,
    ) -> Result<Vec<Report>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM reports
             WHERE teacher_id = $1 AND patient_id = $2
             ORDER BY report_date DESC"
        );
        sqlx::query_as::<_, Report>(&query)
            .bind(teacher_id)
            .bind(patient_id)
            .fetch_all(pool)
            .await
    }

    pub async fn latest_for_patient(
        pool: &PgPool,
        patient_id: DbId,
    ) -> Result<Option<Report>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM reports
             WHERE patient_id = $1
             ORDER BY report_date DESC
             LIMIT 1"
        );
        sqlx::query_as::<_, Report>(&query)
            .bind(patient_id)
            .fetch_optional(pool)
            .await
    }
}
