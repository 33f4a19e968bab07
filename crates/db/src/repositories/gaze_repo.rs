//! Repository for the `gaze_sessions` and `gaze_snapshots` tables.

use sqlx::{PgPool, Postgres, Transaction};
use cortexa_core::statuses::gaze;
use cortexa_core::types::{DbId, Timestamp};

use crate::models::gaze::{CreateGazeSession, CreateGazeSnapshot, GazeSession, GazeSnapshot};

const SESSION_COLUMNS: &str = "id, patient_id, therapist_id, is_guest, guest_child_name, \
                                guest_parent_name, guest_email, status, start_time, end_time, \
                                created_at, updated_at";

const SNAPSHOT_COLUMNS: &str = "id, session_id, image_path, captured_at, gaze_direction, \
                                 attention_score, head_pitch, head_yaw, notes, created_at, updated_at";

pub struct GazeRepo;

impl GazeRepo {
    pub async fn create_session(
        pool: &PgPool,
        input: &CreateGazeSession,
    ) -> Result<GazeSession, sqlx::Error> {
        let query = format!(
            "INSERT INTO gaze_sessions (patient_id, therapist_id, is_guest, guest_child_name, \
                                        guest_parent_name, guest_email, status)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {SESSION_COLUMNS}"
        );
        let guest = input.guest.as_ref();
        sqlx::query_as::<_, GazeSession>(&query)
            .bind(input.patient_id)
            .bind(input.therapist_id)
            .bind(guest.is_some())
            .bind(guest.map(|g| g.child_name.as_str()))
            .bind(guest.map(|g| g.parent_name.as_str()))
            .bind(guest.and_then(|g| g.email.as_deref()))
            .bind(&input.status)
            .fetch_one(pool)
            .await
    }

    /// Create a session together with its snapshots in one transaction.
    pub async fn create_session_with_snapshots(
        pool: &PgPool,
        input: &CreateGazeSession,
        snapshots: &[CreateGazeSnapshot],
    ) -> Result<(GazeSession, Vec<GazeSnapshot>), sqlx::Error> {
        let mut tx = pool.begin().await?;
        let query = format!(
            "INSERT INTO gaze_sessions (patient_id, therapist_id, is_guest, guest_child_name, \
                                        guest_parent_name, guest_email, status, end_time)
             VALUES ($1, $2, $3, $4, $5, $6, $7, NOW())
             RETURNING {SESSION_COLUMNS}"
        );
        let guest = input.guest.as_ref();
        let session = sqlx::query_as::<_, GazeSession>(&query)
            .bind(input.patient_id)
            .bind(input.therapist_id)
            .bind(guest.is_some())
            .bind(guest.map(|g| g.child_name.as_str()))
            .bind(guest.map(|g| g.parent_name.as_str()))
            .bind(guest.and_then(|g| g.email.as_deref()))
            .bind(&input.status)
            .fetch_one(&mut *tx)
            .await?;

        let mut stored = Vec::with_capacity(snapshots.len());
        for snapshot in snapshots {
            stored.push(Self::insert_snapshot(&mut tx, session.id, snapshot).await?);
        }
        tx.commit().await?;
        Ok((session, stored))
    }

    pub async fn find_session(pool: &PgPool, id: DbId) -> Result<Option<GazeSession>, sqlx::Error> {
        let query = format!("SELECT {SESSION_COLUMNS} FROM gaze_sessions WHERE id = $1");
        sqlx::query_as::<_, GazeSession>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Sessions in any of `statuses` that belong to the therapist or are
    /// guest sessions.
    pub async fn list_for_therapist(
        pool: &PgPool,
        therapist_id: DbId,
        statuses: &[&str],
    ) -> Result<Vec<GazeSession>, sqlx::Error> {
        let query = format!(
            "SELECT {SESSION_COLUMNS} FROM gaze_sessions
             WHERE status = ANY($2) AND (therapist_id = $1 OR is_guest = true)
             ORDER BY start_time DESC"
        );
        sqlx::query_as::<_, GazeSession>(&query)
            .bind(therapist_id)
            .bind(statuses)
            .fetch_all(pool)
            .await
    }

    /// Hand a session to the reviewer, optionally recording when capture ended.
    pub async fn mark_pending_review(
        pool: &PgPool,
        id: DbId,
        end_time: Option<Timestamp>,
    ) -> Result<Option<GazeSession>, sqlx::Error> {
        let query = format!(
            "UPDATE gaze_sessions SET status = $2, end_time = COALESCE($3, end_time, NOW())
             WHERE id = $1
             RETURNING {SESSION_COLUMNS}"
        );
        sqlx::query_as::<_, GazeSession>(&query)
            .bind(id)
            .bind(gaze::PENDING_REVIEW)
            .bind(end_time)
            .fetch_optional(pool)
            .await
    }

    pub async fn end_session(pool: &PgPool, id: DbId) -> Result<Option<GazeSession>, sqlx::Error> {
        let query = format!(
            "UPDATE gaze_sessions SET status = $2, end_time = NOW()
             WHERE id = $1
             RETURNING {SESSION_COLUMNS}"
        );
        sqlx::query_as::<_, GazeSession>(&query)
            .bind(id)
            .bind(gaze::COMPLETED)
            .fetch_optional(pool)
            .await
    }

    pub async fn add_snapshot(
        pool: &PgPool,
        session_id: DbId,
        input: &CreateGazeSnapshot,
    ) -> Result<GazeSnapshot, sqlx::Error> {
        let mut tx = pool.begin().await?;
        let snapshot = Self::insert_snapshot(&mut tx, session_id, input).await?;
        tx.commit().await?;
        Ok(snapshot)
    }

    async fn insert_snapshot(
        tx: &mut Transaction<'_, Postgres>,
        session_id: DbId,
        input: &CreateGazeSnapshot,
    ) -> Result<GazeSnapshot, sqlx::Error> {
        let query = format!(
            "INSERT INTO gaze_snapshots (session_id, image_path, captured_at, gaze_direction, \
                                         attention_score, head_pitch, head_yaw)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {SNAPSHOT_COLUMNS}"
        );
        sqlx::query_as::<_, GazeSnapshot>(&query)
            .bind(session_id)
            .bind(&input.image_path)
            .bind(input.captured_at)
            .bind(&input.gaze_direction)
            .bind(input.attention_score)
            .bind(input.head_pitch)
            .bind(input.head_yaw)
            .fetch_one(&mut **tx)
            .await
    }

    pub async fn list_snapshots(
        pool: &PgPool,
        session_id: DbId,
    ) -> Result<Vec<GazeSnapshot>, sqlx::Error> {
        let query = format!(
            "SELECT {SNAPSHOT_COLUMNS} FROM gaze_snapshots
             WHERE session_id = $1
             ORDER BY captured_at"
        );
        sqlx::query_as::<_, GazeSnapshot>(&query)
            .bind(session_id)
            .fetch_all(pool)
            .await
    }

    /// Capture times already stored for a session.
    pub async fn snapshot_times(
        pool: &PgPool,
        session_id: DbId,
    ) -> Result<Vec<Timestamp>, sqlx::Error> {
        sqlx::query_scalar("SELECT captured_at FROM gaze_snapshots WHERE session_id = $1")
            .bind(session_id)
            .fetch_all(pool)
            .await
    }

    /// Annotate one snapshot. A therapist's first note on a session awaiting
    /// review marks the whole session `reviewed`.
    pub async fn update_snapshot_notes(
        pool: &PgPool,
        session_id: DbId,
        snapshot_id: DbId,
        notes: &str,
    ) -> Result<Option<GazeSnapshot>, sqlx::Error> {
        let mut tx = pool.begin().await?;
        let query = format!(
            "UPDATE gaze_snapshots SET notes = $3
             WHERE id = $2 AND session_id = $1
             RETURNING {SNAPSHOT_COLUMNS}"
        );
        let snapshot = sqlx::query_as::<_, GazeSnapshot>(&query)
            .bind(session_id)
            .bind(snapshot_id)
            .bind(notes)
            .fetch_optional(&mut *tx)
            .await?;

        if snapshot.is_some() {
            sqlx::query("UPDATE gaze_sessions SET status = $2 WHERE id = $1 AND status = $3")
                .bind(session_id)
                .bind(gaze::REVIEWED)
                .bind(gaze::PENDING_REVIEW)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(snapshot)
    }
}
