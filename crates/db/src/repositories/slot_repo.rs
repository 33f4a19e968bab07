//! Repository for the `therapist_slots` table.

use chrono::NaiveDate;
use sqlx::PgPool;
use cortexa_core::types::DbId;

use crate::models::slot::{CreateSlot, TherapistSlot};

const COLUMNS: &str = "id, therapist_id, slot_date, start_time, end_time, interval_minutes, \
                        break_minutes, mode, hospital_clinic_name, is_active, created_at, updated_at";

pub struct SlotRepo;

impl SlotRepo {
    /// Insert a window. A second active window on the same date violates
    /// `uq_therapist_slots_active_date`.
    pub async fn create(pool: &PgPool, input: &CreateSlot) -> Result<TherapistSlot, sqlx::Error> {
        let query = format!(
            "INSERT INTO therapist_slots (therapist_id, slot_date, start_time, end_time, \
                                          interval_minutes, break_minutes, mode, hospital_clinic_name)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, TherapistSlot>(&query)
            .bind(input.therapist_id)
            .bind(input.slot_date)
            .bind(input.window.start)
            .bind(input.window.end)
            .bind(input.window.interval_minutes)
            .bind(input.window.break_minutes)
            .bind(&input.mode)
            .bind(&input.hospital_clinic_name)
            .fetch_one(pool)
            .await
    }

    /// A therapist's active windows, soonest first.
    pub async fn list_by_therapist(
        pool: &PgPool,
        therapist_id: DbId,
    ) -> Result<Vec<TherapistSlot>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM therapist_slots
             WHERE therapist_id = $1 AND is_active = true
             ORDER BY slot_date, start_time"
        );
        sqlx::query_as::<_, TherapistSlot>(&query)
            .bind(therapist_id)
            .fetch_all(pool)
            .await
    }

    pub async fn find_active_for_date(
        pool: &PgPool,
        therapist_id: DbId,
        date: NaiveDate,
    ) -> Result<Option<TherapistSlot>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM therapist_slots
             WHERE therapist_id = $1 AND slot_date = $2 AND is_active = true"
        );
        sqlx::query_as::<_, TherapistSlot>(&query)
            .bind(therapist_id)
            .bind(date)
            .fetch_optional(pool)
            .await
    }

    /// Delete one of the therapist's own windows. Returns `true` if removed.
    pub async fn delete_for_therapist(
        pool: &PgPool,
        id: DbId,
        therapist_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM therapist_slots WHERE id = $1 AND therapist_id = $2")
            .bind(id)
            .bind(therapist_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
