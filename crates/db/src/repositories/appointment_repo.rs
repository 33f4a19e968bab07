//! Repository for the `appointments` table.

use chrono::{NaiveDate, NaiveTime};
use sqlx::PgPool;
use cortexa_core::statuses::appointment;
use cortexa_core::types::DbId;

use crate::models::appointment::{Appointment, AppointmentDetail, CreateAppointment};

const COLUMNS: &str = "id, parent_id, child_id, therapist_id, appointment_date, appointment_time, \
                        reason, notes, appointment_type, status, created_at, updated_at";

const DETAIL_SELECT: &str = "SELECT a.id, a.parent_id, a.child_id, a.therapist_id, \
        a.appointment_date, a.appointment_time, a.reason, a.notes, a.appointment_type, \
        a.status, a.created_at, a.updated_at, \
        c.name AS child_name, \
        par.username AS parent_name, \
        COALESCE(NULLIF(TRIM(CONCAT_WS(' ', th.first_name, th.last_name)), ''), th.username) \
            AS therapist_name
     FROM appointments a
     LEFT JOIN patients c ON c.id = a.child_id
     LEFT JOIN users par ON par.id = a.parent_id
     LEFT JOIN users th ON th.id = a.therapist_id";

pub struct AppointmentRepo;

impl AppointmentRepo {
    /// Book an appointment. A live booking at the same therapist/date/time
    /// violates `uq_appointments_therapist_slot`.
    pub async fn create(
        pool: &PgPool,
        input: &CreateAppointment,
    ) -> Result<Appointment, sqlx::Error> {
        let query = format!(
            "INSERT INTO appointments (parent_id, child_id, therapist_id, appointment_date, \
                                       appointment_time, reason)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Appointment>(&query)
            .bind(input.parent_id)
            .bind(input.child_id)
            .bind(input.therapist_id)
            .bind(input.appointment_date)
            .bind(input.appointment_time)
            .bind(&input.reason)
            .fetch_one(pool)
            .await
    }

    /// Therapist's appointments with display names, optionally for one date.
    pub async fn list_for_therapist(
        pool: &PgPool,
        therapist_id: DbId,
        date: Option<NaiveDate>,
    ) -> Result<Vec<AppointmentDetail>, sqlx::Error> {
        let query = format!(
            "{DETAIL_SELECT}
             WHERE a.therapist_id = $1 AND ($2::DATE IS NULL OR a.appointment_date = $2)
             ORDER BY a.appointment_date, a.appointment_time"
        );
        sqlx::query_as::<_, AppointmentDetail>(&query)
            .bind(therapist_id)
            .bind(date)
            .fetch_all(pool)
            .await
    }

    pub async fn list_for_parent(
        pool: &PgPool,
        parent_id: DbId,
    ) -> Result<Vec<AppointmentDetail>, sqlx::Error> {
        let query = format!(
            "{DETAIL_SELECT}
             WHERE a.parent_id = $1
             ORDER BY a.appointment_date DESC, a.appointment_time DESC"
        );
        sqlx::query_as::<_, AppointmentDetail>(&query)
            .bind(parent_id)
            .fetch_all(pool)
            .await
    }

    pub async fn find_detail(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<AppointmentDetail>, sqlx::Error> {
        let query = format!("{DETAIL_SELECT} WHERE a.id = $1");
        sqlx::query_as::<_, AppointmentDetail>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Start times already taken by non-cancelled bookings.
    pub async fn booked_times(
        pool: &PgPool,
        therapist_id: DbId,
        date: NaiveDate,
    ) -> Result<Vec<NaiveTime>, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT appointment_time FROM appointments
             WHERE therapist_id = $1 AND appointment_date = $2 AND status <> $3
             ORDER BY appointment_time",
        )
        .bind(therapist_id)
        .bind(date)
        .bind(appointment::CANCELLED)
        .fetch_all(pool)
        .await
    }

    /// Set the status of one of the therapist's appointments.
    pub async fn set_status_for_therapist(
        pool: &PgPool,
        id: DbId,
        therapist_id: DbId,
        status: &str,
    ) -> Result<Option<Appointment>, sqlx::Error> {
        let query = format!(
            "UPDATE appointments SET status = $3
             WHERE id = $1 AND therapist_id = $2
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Appointment>(&query)
            .bind(id)
            .bind(therapist_id)
            .bind(status)
            .fetch_optional(pool)
            .await
    }

    /// Move an appointment and send it back to `pending`.
    pub async fn reschedule(
        pool: &PgPool,
        id: DbId,
        therapist_id: DbId,
        date: NaiveDate,
        time: NaiveTime,
    ) -> Result<Option<Appointment>, sqlx::Error> {
        let query = format!(
            "UPDATE appointments SET appointment_date = $3, appointment_time = $4, status = $5
             WHERE id = $1 AND therapist_id = $2
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Appointment>(&query)
            .bind(id)
            .bind(therapist_id)
            .bind(date)
            .bind(time)
            .bind(appointment::PENDING)
            .fetch_optional(pool)
            .await
    }

    /// Mark a session completed, replacing notes when given.
    pub async fn complete(
        pool: &PgPool,
        id: DbId,
        therapist_id: DbId,
        notes: Option<&str>,
    ) -> Result<Option<Appointment>, sqlx::Error> {
        let query = format!(
            "UPDATE appointments SET status = $3, notes = COALESCE($4, notes)
             WHERE id = $1 AND therapist_id = $2
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Appointment>(&query)
            .bind(id)
            .bind(therapist_id)
            .bind(appointment::COMPLETED)
            .bind(notes)
            .fetch_optional(pool)
            .await
    }

    /// Cancel one of the parent's appointments. Returns `true` if updated.
    pub async fn cancel_for_parent(
        pool: &PgPool,
        id: DbId,
        parent_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE appointments SET status = $3 WHERE id = $1 AND parent_id = $2",
        )
        .bind(id)
        .bind(parent_id)
        .bind(appointment::CANCELLED)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
