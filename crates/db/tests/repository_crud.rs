//! Integration tests for the repository layer against a real database:
//! - Account lifecycle (create, lookup, lockout counters, therapist approval)
//! - Password-reset codes and single-use refresh tokens
//! - Booking constraints
//! - Per-child speech session numbering
//! - Gaze and social-attention session writes

use assert_matches::assert_matches;
use chrono::{Duration, NaiveDate, NaiveTime, Utc};
use sqlx::PgPool;
use cortexa_core::scheduling::SlotWindow;
use cortexa_core::social_attention::AttentionScore;
use cortexa_db::models::appointment::CreateAppointment;
use cortexa_db::models::gaze::{CreateGazeSession, CreateGazeSnapshot, GuestInfo};
use cortexa_db::models::patient::CreatePatient;
use cortexa_db::models::slot::CreateSlot;
use cortexa_db::models::social_attention::{
    CompleteSocialAttention, CreateSocialAttentionSession,
};
use cortexa_db::models::speech::{CreateSpeechSession, EvaluateSpeechSession};
use cortexa_db::models::user::{CreateUser, User};
use cortexa_db::repositories::{
    AppointmentRepo, GazeRepo, PasswordResetRepo, PatientRepo, RefreshTokenRepo, SlotRepo,
    SocialAttentionRepo, SpeechRepo, UserRepo,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn user(pool: &PgPool, email: &str, role: &str, status: &str) -> User {
    UserRepo::create(
        pool,
        &CreateUser {
            username: email.split('@').next().unwrap_or(email).to_string(),
            email: email.to_string(),
            password_hash: "hash".to_string(),
            role: role.to_string(),
            status: status.to_string(),
            first_name: None,
            last_name: None,
            phone: None,
            license_number: None,
            qualification: None,
        },
    )
    .await
    .unwrap()
}

async fn child(pool: &PgPool, parent_id: i64, code: &str) -> i64 {
    PatientRepo::create(
        pool,
        &CreatePatient {
            patient_code: code.to_string(),
            name: "Sam".to_string(),
            age: Some(5),
            gender: Some("male".to_string()),
            grade: None,
            medical_history: None,
            parent_id: Some(parent_id),
            teacher_id: None,
        },
    )
    .await
    .unwrap()
    .id
}

fn is_unique_violation(err: &sqlx::Error, constraint: &str) -> bool {
    match err {
        sqlx::Error::Database(db) => db.constraint() == Some(constraint),
        _ => false,
    }
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_duplicate_email_rejected(pool: PgPool) {
    user(&pool, "a@example.com", "parent", "approved").await;
    let err = UserRepo::create(
        &pool,
        &CreateUser {
            username: "again".into(),
            email: "a@example.com".into(),
            password_hash: "h".into(),
            role: "teacher".into(),
            status: "approved".into(),
            first_name: None,
            last_name: None,
            phone: None,
            license_number: None,
            qualification: None,
        },
    )
    .await
    .unwrap_err();
    assert!(is_unique_violation(&err, "uq_users_email"));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_failed_login_counter_and_reset(pool: PgPool) {
    let u = user(&pool, "b@example.com", "parent", "approved").await;
    assert_eq!(UserRepo::increment_failed_login(&pool, u.id).await.unwrap(), 1);
    assert_eq!(UserRepo::increment_failed_login(&pool, u.id).await.unwrap(), 2);

    UserRepo::lock_account(&pool, u.id, Utc::now() + Duration::minutes(15))
        .await
        .unwrap();
    UserRepo::record_successful_login(&pool, u.id).await.unwrap();

    let reloaded = UserRepo::find_by_id(&pool, u.id).await.unwrap().unwrap();
    assert_eq!(reloaded.failed_login_count, 0);
    assert!(reloaded.locked_until.is_none());
    assert!(reloaded.last_login_at.is_some());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_failed_login_count_restarts_after_lock_lapses(pool: PgPool) {
    let u = user(&pool, "lapsed@example.com", "parent", "approved").await;
    for _ in 0..5 {
        UserRepo::increment_failed_login(&pool, u.id).await.unwrap();
    }
    UserRepo::lock_account(&pool, u.id, Utc::now() - Duration::minutes(1))
        .await
        .unwrap();

    assert_eq!(UserRepo::increment_failed_login(&pool, u.id).await.unwrap(), 1);
    let reloaded = UserRepo::find_by_id(&pool, u.id).await.unwrap().unwrap();
    assert!(reloaded.locked_until.is_none());

    UserRepo::lock_account(&pool, u.id, Utc::now() + Duration::minutes(15))
        .await
        .unwrap();
    assert_eq!(UserRepo::increment_failed_login(&pool, u.id).await.unwrap(), 2);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_therapist_request_decided_once(pool: PgPool) {
    let t = user(&pool, "t@example.com", "therapist", "pending").await;
    assert_eq!(UserRepo::count_pending_therapists(&pool).await.unwrap(), 1);

    let approved = UserRepo::decide_therapist_request(&pool, t.id, "approved", None)
        .await
        .unwrap();
    assert_matches!(approved, Some(ref u) if u.status == "approved");

    let again = UserRepo::decide_therapist_request(&pool, t.id, "rejected", Some("late"))
        .await
        .unwrap();
    assert!(again.is_none());

    let bookable = UserRepo::list_bookable_therapists(&pool).await.unwrap();
    assert_eq!(bookable.len(), 1);
}

// ---------------------------------------------------------------------------
// Password resets
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_reissued_code_invalidates_previous(pool: PgPool) {
    let u = user(&pool, "r@example.com", "parent", "approved").await;
    let expires = Utc::now() + Duration::minutes(10);
    PasswordResetRepo::issue(&pool, u.id, "first", expires).await.unwrap();
    PasswordResetRepo::issue(&pool, u.id, "second", expires).await.unwrap();

    assert!(PasswordResetRepo::find_valid(&pool, u.id, "first").await.unwrap().is_none());
    let valid = PasswordResetRepo::find_valid(&pool, u.id, "second")
        .await
        .unwrap()
        .unwrap();
    assert!(PasswordResetRepo::consume(&pool, valid.id).await.unwrap());
    assert!(!PasswordResetRepo::consume(&pool, valid.id).await.unwrap());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_expired_code_not_found(pool: PgPool) {
    let u = user(&pool, "e@example.com", "parent", "approved").await;
    PasswordResetRepo::issue(&pool, u.id, "old", Utc::now() - Duration::minutes(1))
        .await
        .unwrap();
    assert!(PasswordResetRepo::find_valid(&pool, u.id, "old").await.unwrap().is_none());
}

// ---------------------------------------------------------------------------
// Refresh tokens
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_refresh_token_consumed_once(pool: PgPool) {
    let u = user(&pool, "rt@example.com", "parent", "approved").await;
    let expires = Utc::now() + Duration::days(7);
    RefreshTokenRepo::issue(&pool, u.id, "live", expires).await.unwrap();
    RefreshTokenRepo::issue(&pool, u.id, "stale", Utc::now() - Duration::minutes(1))
        .await
        .unwrap();

    assert_eq!(RefreshTokenRepo::consume(&pool, "live").await.unwrap(), Some(u.id));
    assert_eq!(RefreshTokenRepo::consume(&pool, "live").await.unwrap(), None);
    assert_eq!(RefreshTokenRepo::consume(&pool, "stale").await.unwrap(), None);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_revoke_all_refresh_tokens(pool: PgPool) {
    let u = user(&pool, "ra@example.com", "therapist", "approved").await;
    let expires = Utc::now() + Duration::days(7);
    RefreshTokenRepo::issue(&pool, u.id, "a", expires).await.unwrap();
    RefreshTokenRepo::issue(&pool, u.id, "b", expires).await.unwrap();

    assert_eq!(RefreshTokenRepo::revoke_all_for_user(&pool, u.id).await.unwrap(), 2);
    assert_eq!(RefreshTokenRepo::consume(&pool, "b").await.unwrap(), None);
}

// ---------------------------------------------------------------------------
// Scheduling
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_one_active_window_per_day(pool: PgPool) {
    let t = user(&pool, "t@example.com", "therapist", "approved").await;
    let input = CreateSlot {
        therapist_id: t.id,
        slot_date: NaiveDate::from_ymd_opt(2030, 1, 7).unwrap(),
        window: SlotWindow::parse("09:00", "12:00", 45, 15).unwrap(),
        mode: "Online".into(),
        hospital_clinic_name: None,
    };
    let slot = SlotRepo::create(&pool, &input).await.unwrap();
    assert_eq!(slot.time_slots().len(), 3);

    let err = SlotRepo::create(&pool, &input).await.unwrap_err();
    assert!(is_unique_violation(&err, "uq_therapist_slots_active_date"));

    assert!(SlotRepo::delete_for_therapist(&pool, slot.id, t.id).await.unwrap());
    SlotRepo::create(&pool, &input).await.unwrap();
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_double_booking_blocked_until_cancelled(pool: PgPool) {
    let parent = user(&pool, "p@example.com", "parent", "approved").await;
    let therapist = user(&pool, "t@example.com", "therapist", "approved").await;
    let child_id = child(&pool, parent.id, "PAT-1-AAAAAA").await;

    let booking = CreateAppointment {
        parent_id: parent.id,
        child_id,
        therapist_id: therapist.id,
        appointment_date: NaiveDate::from_ymd_opt(2030, 1, 7).unwrap(),
        appointment_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
        reason: None,
    };
    let first = AppointmentRepo::create(&pool, &booking).await.unwrap();
    assert_eq!(first.status, "pending");

    let err = AppointmentRepo::create(&pool, &booking).await.unwrap_err();
    assert!(is_unique_violation(&err, "uq_appointments_therapist_slot"));

    assert!(AppointmentRepo::cancel_for_parent(&pool, first.id, parent.id).await.unwrap());
    let booked = AppointmentRepo::booked_times(&pool, therapist.id, booking.appointment_date)
        .await
        .unwrap();
    assert!(booked.is_empty());
    AppointmentRepo::create(&pool, &booking).await.unwrap();
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_therapist_view_carries_names(pool: PgPool) {
    let parent = user(&pool, "p@example.com", "parent", "approved").await;
    let therapist = user(&pool, "t@example.com", "therapist", "approved").await;
    let child_id = child(&pool, parent.id, "PAT-2-BBBBBB").await;
    let date = NaiveDate::from_ymd_opt(2030, 1, 7).unwrap();
    AppointmentRepo::create(
        &pool,
        &CreateAppointment {
            parent_id: parent.id,
            child_id,
            therapist_id: therapist.id,
            appointment_date: date,
            appointment_time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
            reason: Some("checkup".into()),
        },
    )
    .await
    .unwrap();

    let today = AppointmentRepo::list_for_therapist(&pool, therapist.id, Some(date))
        .await
        .unwrap();
    assert_eq!(today.len(), 1);
    assert_eq!(today[0].child_name.as_deref(), Some("Sam"));
    assert_eq!(today[0].parent_name.as_deref(), Some("p"));

    let other_day = AppointmentRepo::list_for_therapist(&pool, therapist.id, date.succ_opt())
        .await
        .unwrap();
    assert!(other_day.is_empty());
}

// ---------------------------------------------------------------------------
// Speech therapy
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_speech_sessions_numbered_per_child(pool: PgPool) {
    let parent = user(&pool, "p@example.com", "parent", "approved").await;
    let teacher = user(&pool, "teach@example.com", "teacher", "approved").await;
    let a = child(&pool, parent.id, "PAT-3-CCCCCC").await;
    let b = child(&pool, parent.id, "PAT-4-DDDDDD").await;

    let input = |child_id| CreateSpeechSession {
        child_id,
        audio_file_path: "uploads/speech/x.webm".into(),
        original_file_name: None,
        practice_prompt: Some("ball".into()),
        sample_audio_path: None,
        duration_secs: None,
    };
    assert_eq!(SpeechRepo::create(&pool, &input(a)).await.unwrap().session_number, 1);
    let second = SpeechRepo::create(&pool, &input(a)).await.unwrap();
    assert_eq!(second.session_number, 2);
    assert_eq!(SpeechRepo::create(&pool, &input(b)).await.unwrap().session_number, 1);
    assert_eq!(second.rating, "Not Rated");

    let evaluated = SpeechRepo::evaluate(
        &pool,
        second.id,
        &EvaluateSpeechSession {
            rating: "Good".into(),
            feedback: Some("clear".into()),
            notes: None,
            evaluated_by: teacher.id,
        },
    )
    .await
    .unwrap()
    .unwrap();
    assert_eq!(evaluated.status, "evaluated");
    assert_eq!(SpeechRepo::list_pending(&pool).await.unwrap().len(), 2);
}

// ---------------------------------------------------------------------------
// Gaze and social attention
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_guest_session_with_snapshots(pool: PgPool) {
    let session = CreateGazeSession {
        guest: Some(GuestInfo {
            child_name: "Kid".into(),
            parent_name: "Mum".into(),
            email: Some("m@example.com".into()),
        }),
        status: "pending_review".into(),
        ..Default::default()
    };
    let snap = |offset: i64| CreateGazeSnapshot {
        image_path: format!("uploads/gaze/{offset}.jpg"),
        captured_at: Utc::now() + Duration::seconds(offset),
        gaze_direction: Some("center".into()),
        attention_score: Some(0.8),
        head_pitch: None,
        head_yaw: None,
    };

    let (stored, snapshots) =
        GazeRepo::create_session_with_snapshots(&pool, &session, &[snap(0), snap(1)])
            .await
            .unwrap();
    assert!(stored.is_guest);
    assert!(stored.end_time.is_some());
    assert_eq!(snapshots.len(), 2);
    assert_eq!(GazeRepo::snapshot_times(&pool, stored.id).await.unwrap().len(), 2);

    let noted = GazeRepo::update_snapshot_notes(&pool, stored.id, snapshots[0].id, "looked away")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(noted.notes, "looked away");
    let reviewed = GazeRepo::find_session(&pool, stored.id).await.unwrap().unwrap();
    assert_eq!(reviewed.status, "reviewed");
    assert!(GazeRepo::update_snapshot_notes(&pool, stored.id + 1, snapshots[0].id, "x")
        .await
        .unwrap()
        .is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_social_attention_complete(pool: PgPool) {
    let parent = user(&pool, "p@example.com", "parent", "approved").await;
    let student_id = child(&pool, parent.id, "PAT-5-EEEEEE").await;
    let create = CreateSocialAttentionSession {
        session_id: "4a1c".into(),
        student_id,
        teacher_id: None,
    };
    let started = SocialAttentionRepo::create(&pool, &create).await.unwrap();
    assert_eq!(started.status, "ACTIVE");

    SocialAttentionRepo::insert_frame(&pool, "4a1c", "left", 1).await.unwrap();
    assert_eq!(SocialAttentionRepo::count_frames(&pool, "4a1c").await.unwrap(), 1);

    let finished = SocialAttentionRepo::complete(
        &pool,
        "4a1c",
        &CompleteSocialAttention {
            left_look_time_ms: 900,
            right_look_time_ms: 2100,
            total_time_ms: 3000,
            score: AttentionScore::from_times(900, 2100),
            confidence: None,
            end_time: Utc::now(),
        },
    )
    .await
    .unwrap()
    .unwrap();
    assert_eq!(finished.status, "COMPLETED");
    assert_eq!(finished.social_preference_score, 30.0);
    assert!(finished.risk_flag);
}
