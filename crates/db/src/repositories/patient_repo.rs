//! Repository for the `patients` table.

use sqlx::PgPool;
use cortexa_core::statuses::progress;
use cortexa_core::types::{DbId, Timestamp};

use crate::models::patient::{CreatePatient, Patient, PatientWithContacts, UpdatePatient};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, patient_code, name, age, gender, grade, medical_history, parent_id, \
                        therapist_user_id, teacher_id, screening_status, report_status, \
                        created_at, updated_at";

/// `COLUMNS` qualified with the `p` alias, plus the joined contact names.
const CONTACT_SELECT: &str = "SELECT p.id, p.patient_code, p.name, p.age, p.gender, p.grade, \
        p.medical_history, p.parent_id, p.therapist_user_id, p.teacher_id, \
        p.screening_status, p.report_status, p.created_at, p.updated_at, \
        par.username AS parent_name, par.email AS parent_email, \
        COALESCE(NULLIF(TRIM(CONCAT_WS(' ', th.first_name, th.last_name)), ''), th.username) \
            AS therapist_name
     FROM patients p
     LEFT JOIN users par ON par.id = p.parent_id
     LEFT JOIN users th ON th.id = p.therapist_user_id";

pub struct PatientRepo;

impl PatientRepo {
    pub async fn create(pool: &PgPool, input: &CreatePatient) -> Result<Patient, sqlx::Error> {
        let query = format!(
            "INSERT INTO patients (patient_code, name, age, gender, grade, medical_history, \
                                   parent_id, teacher_id)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Patient>(&query)
            .bind(&input.patient_code)
            .bind(&input.name)
            .bind(input.age)
            .bind(&input.gender)
            .bind(&input.grade)
            .bind(&input.medical_history)
            .bind(input.parent_id)
            .bind(input.teacher_id)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Patient>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM patients WHERE id = $1");
        sqlx::query_as::<_, Patient>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find a child only if it belongs to `parent_id`.
    pub async fn find_for_parent(
        pool: &PgPool,
        id: DbId,
        parent_id: DbId,
    ) -> Result<Option<Patient>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM patients WHERE id = $1 AND parent_id = $2");
        sqlx::query_as::<_, Patient>(&query)
            .bind(id)
            .bind(parent_id)
            .fetch_optional(pool)
            .await
    }

    pub async fn list_by_parent(pool: &PgPool, parent_id: DbId) -> Result<Vec<Patient>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM patients WHERE parent_id = $1 ORDER BY created_at DESC"
        );
        sqlx::query_as::<_, Patient>(&query)
            .bind(parent_id)
            .fetch_all(pool)
            .await
    }

    pub async fn list_by_teacher(
        pool: &PgPool,
        teacher_id: DbId,
    ) -> Result<Vec<Patient>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM patients WHERE teacher_id = $1 ORDER BY name"
        );
        sqlx::query_as::<_, Patient>(&query)
            .bind(teacher_id)
            .fetch_all(pool)
            .await
    }

    /// Patients assigned to a therapist, with parent contact details.
    pub async fn list_by_therapist(
        pool: &PgPool,
        therapist_id: DbId,
    ) -> Result<Vec<PatientWithContacts>, sqlx::Error> {
        let query = format!("{CONTACT_SELECT} WHERE p.therapist_user_id = $1 ORDER BY p.name");
        sqlx::query_as::<_, PatientWithContacts>(&query)
            .bind(therapist_id)
            .fetch_all(pool)
            .await
    }

    /// Newest patients with contact details, optionally for a single parent.
    pub async fn list_with_contacts(
        pool: &PgPool,
        parent_id: Option<DbId>,
        limit: Option<i64>,
    ) -> Result<Vec<PatientWithContacts>, sqlx::Error> {
        let query = format!(
            "{CONTACT_SELECT}
             WHERE ($1::BIGINT IS NULL OR p.parent_id = $1)
             ORDER BY p.created_at DESC
             LIMIT $2"
        );
        sqlx::query_as::<_, PatientWithContacts>(&query)
            .bind(parent_id)
            .bind(limit)
            .fetch_all(pool)
            .await
    }

    /// Update a parent's child. Only non-`None` fields are applied.
    pub async fn update_for_parent(
        pool: &PgPool,
        id: DbId,
        parent_id: DbId,
        input: &UpdatePatient,
    ) -> Result<Option<Patient>, sqlx::Error> {
        let query = format!(
            "UPDATE patients SET
                name = COALESCE($3, name),
                age = COALESCE($4, age),
                gender = COALESCE($5, gender),
                grade = COALESCE($6, grade),
                medical_history = COALESCE($7, medical_history)
             WHERE id = $1 AND parent_id = $2
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Patient>(&query)
            .bind(id)
            .bind(parent_id)
            .bind(&input.name)
            .bind(input.age)
            .bind(&input.gender)
            .bind(&input.grade)
            .bind(&input.medical_history)
            .fetch_optional(pool)
            .await
    }

    /// Delete a parent's child. Returns `true` if a row was removed.
    pub async fn delete_for_parent(
        pool: &PgPool,
        id: DbId,
        parent_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM patients WHERE id = $1 AND parent_id = $2")
            .bind(id)
            .bind(parent_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Set or clear the assigned therapist.
    pub async fn set_therapist(
        pool: &PgPool,
        id: DbId,
        therapist_id: Option<DbId>,
    ) -> Result<Option<Patient>, sqlx::Error> {
        let query = format!(
            "UPDATE patients SET therapist_user_id = $2 WHERE id = $1 RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Patient>(&query)
            .bind(id)
            .bind(therapist_id)
            .fetch_optional(pool)
            .await
    }

    pub async fn mark_screening_completed(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE patients SET screening_status = $2 WHERE id = $1")
            .bind(id)
            .bind(progress::COMPLETED)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn mark_report_completed(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE patients SET report_status = $2 WHERE id = $1")
            .bind(id)
            .bind(progress::COMPLETED)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn count_created_since(pool: &PgPool, since: Timestamp) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM patients WHERE created_at >= $1")
            .bind(since)
            .fetch_one(pool)
            .await
    }

    /// `(pending screenings, pending reports)` across all patients.
    pub async fn count_pending_work(pool: &PgPool) -> Result<(i64, i64), sqlx::Error> {
        sqlx::query_as(
            "SELECT
                COUNT(*) FILTER (WHERE screening_status = 'pending'),
                COUNT(*) FILTER (WHERE report_status = 'pending')
             FROM patients",
        )
        .fetch_one(pool)
        .await
    }
}
