//! Handlers for the social-attention preferential-looking test
//! (`/social-attention`).
//!
//! Look-time totals live in [`crate::live_sessions::LiveSessions`] while a
//! test runs; the database row is written at start and finish, and each
//! frame is mirrored in a background task.

use std::time::Duration;

use axum::extract::{Path, State};
use axum::Json;
use chrono::Utc;
use cortexa_core::error::CoreError;
use cortexa_core::social_attention::{interpret, AttentionScore, GazeSide};
use cortexa_core::types::DbId;
use cortexa_db::models::social_attention::{
    CompleteSocialAttention, CreateSocialAttentionSession, SocialAttentionSession,
};
use cortexa_db::repositories::{PatientRepo, SocialAttentionRepo};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::live_sessions::{FrameLog, LiveSession, FINISHED_RETENTION_SECS};
use crate::middleware::auth::AuthUser;
use crate::response::SuccessResponse;
use crate::state::AppState;

const EVICT_AFTER: Duration = Duration::from_secs(FINISHED_RETENTION_SECS as u64);

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartRequest {
    pub student_id: Option<DbId>,
    pub teacher_id: Option<DbId>,
    #[serde(default)]
    pub dry_run: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stimuli {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    pub left_video: String,
    pub right_video: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameRequest {
    pub session_id: Option<String>,
    pub gaze: Option<String>,
    pub gaze_x: Option<f64>,
    pub timestamp: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinishRequest {
    pub session_id: Option<String>,
}

/// Final metrics, reported under both naming schemes the clients read.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinishResponse {
    pub session_id: String,
    pub left_look_time: i64,
    pub right_look_time: i64,
    pub left_time: i64,
    pub right_time: i64,
    pub left_percentage: f64,
    pub right_percentage: f64,
    pub social_preference_score: f64,
    pub social_attention_score: f64,
    pub risk_flag: bool,
    pub clinical_summary: &'static str,
    pub logs: Vec<FrameLog>,
}

#[derive(Debug, Serialize)]
pub struct StoredFrame {
    pub side: String,
    pub timestamp: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultResponse {
    #[serde(flatten)]
    pub session: SocialAttentionSession,
    pub left_time: i64,
    pub right_time: i64,
    pub social_attention_score: f64,
    pub logs: Vec<StoredFrame>,
}

/// A score entered directly on the therapist dashboard. Times are seconds.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectScoreRequest {
    pub patient_id: Option<DbId>,
    pub social_preference_score: Option<f64>,
    #[serde(default)]
    pub social_time: f64,
    #[serde(default)]
    pub non_social_time: f64,
    pub total_time: Option<f64>,
    pub confidence: Option<f64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectScoreSaved {
    pub session_id: String,
}

fn required_session_id(value: Option<String>) -> AppResult<String> {
    value
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| AppError::BadRequest("sessionId is required".into()))
}

fn seconds_to_ms(seconds: f64) -> i64 {
    (seconds * 1000.0).round() as i64
}

/// Score for a directly entered result: percentages from the times, but the
/// entered preference wins when present.
fn direct_score(input: &DirectScoreRequest) -> AttentionScore {
    let mut score = AttentionScore::from_times(
        seconds_to_ms(input.social_time),
        seconds_to_ms(input.non_social_time),
    );
    if let Some(preference) = input.social_preference_score {
        let (summary, risk) = interpret(preference);
        score.social_preference = preference;
        score.clinical_summary = summary;
        score.risk_flag = risk;
    }
    score
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /social-attention/start
///
/// `dryRun` only returns the stimulus URLs.
pub async fn start(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<StartRequest>,
) -> AppResult<Json<Stimuli>> {
    let left_video = state.config.social_video_url.clone();
    let right_video = state.config.pattern_video_url.clone();

    if input.dry_run {
        return Ok(Json(Stimuli {
            session_id: None,
            left_video,
            right_video,
        }));
    }

    let student_id = input
        .student_id
        .ok_or_else(|| AppError::BadRequest("studentId is required".into()))?;
    PatientRepo::find_by_id(&state.pool, student_id)
        .await?
        .ok_or_else(|| AppError::Core(CoreError::Missing("Student not found".into())))?;
    let teacher_id = input.teacher_id.unwrap_or(auth.user_id);
    let session_id = uuid::Uuid::new_v4().to_string();

    SocialAttentionRepo::create(
        &state.pool,
        &CreateSocialAttentionSession {
            session_id: session_id.clone(),
            student_id,
            teacher_id: Some(teacher_id),
        },
    )
    .await?;
    state
        .live_sessions
        .insert(LiveSession::new(session_id.clone(), student_id, Some(teacher_id)))
        .await;

    tracing::info!(%session_id, student_id, teacher_id, "Social attention test started");
    Ok(Json(Stimuli {
        session_id: Some(session_id),
        left_video,
        right_video,
    }))
}

/// POST /social-attention/frame
///
/// Accepts a side label or a normalised iris x position.
pub async fn frame(
    _auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<FrameRequest>,
) -> AppResult<Json<serde_json::Value>> {
    let session_id = required_session_id(input.session_id)?;
    let side = match (input.gaze.as_deref(), input.gaze_x) {
        (Some(label), _) => GazeSide::parse(label)?,
        (None, Some(x)) => GazeSide::from_iris_x(x),
        (None, None) => {
            return Err(AppError::BadRequest(
                "sessionId and gaze are required".into(),
            ))
        }
    };
    let timestamp = input
        .timestamp
        .unwrap_or_else(|| Utc::now().timestamp_millis());

    state
        .live_sessions
        .record_frame(&session_id, side, timestamp)
        .await?;

    let pool = state.pool.clone();
    tokio::spawn(async move {
        if let Err(e) =
            SocialAttentionRepo::insert_frame(&pool, &session_id, side.as_str(), timestamp).await
        {
            tracing::warn!(%session_id, error = %e, "Failed to persist gaze frame");
        }
    });

    Ok(Json(serde_json::json!({ "success": true })))
}

/// POST /social-attention/finish (also `/end`)
pub async fn finish(
    _auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<FinishRequest>,
) -> AppResult<Json<FinishResponse>> {
    let session_id = required_session_id(input.session_id)?;
    let live = state.live_sessions.finish(&session_id).await?;
    let score = live.times.score();

    SocialAttentionRepo::complete(
        &state.pool,
        &session_id,
        &CompleteSocialAttention {
            left_look_time_ms: live.times.left_ms,
            right_look_time_ms: live.times.right_ms,
            total_time_ms: live.times.total_ms(),
            score: score.clone(),
            confidence: None,
            end_time: live.finished_at.unwrap_or_else(Utc::now),
        },
    )
    .await?;

    let tracker = state.live_sessions.clone();
    let evict_id = session_id.clone();
    tokio::spawn(async move {
        tokio::time::sleep(EVICT_AFTER).await;
        tracker.remove(&evict_id).await;
    });

    tracing::info!(
        %session_id,
        left_ms = live.times.left_ms,
        right_ms = live.times.right_ms,
        preference = score.social_preference,
        risk = score.risk_flag,
        "Social attention test finished"
    );

    Ok(Json(FinishResponse {
        session_id,
        left_look_time: live.times.left_ms,
        right_look_time: live.times.right_ms,
        left_time: live.times.left_ms,
        right_time: live.times.right_ms,
        left_percentage: score.left_percentage,
        right_percentage: score.right_percentage,
        social_preference_score: score.social_preference,
        social_attention_score: score.social_preference,
        risk_flag: score.risk_flag,
        clinical_summary: score.clinical_summary,
        logs: live.frames,
    }))
}

/// GET /social-attention/{sessionId}/result
pub async fn result(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> AppResult<Json<ResultResponse>> {
    let session = SocialAttentionRepo::find_by_session_id(&state.pool, &session_id)
        .await?
        .ok_or_else(|| AppError::Core(CoreError::Missing("Session not found".into())))?;
    let logs = SocialAttentionRepo::list_frames(&state.pool, &session_id)
        .await?
        .into_iter()
        .map(|(side, timestamp)| StoredFrame { side, timestamp })
        .collect();

    Ok(Json(ResultResponse {
        left_time: session.left_look_time_ms,
        right_time: session.right_look_time_ms,
        social_attention_score: session.social_preference_score,
        logs,
        session,
    }))
}

/// POST /social-attention/therapist/save
pub async fn save_direct_score(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<DirectScoreRequest>,
) -> AppResult<Json<SuccessResponse<DirectScoreSaved>>> {
    let patient_id = input
        .patient_id
        .ok_or_else(|| AppError::BadRequest("patientId is required".into()))?;
    PatientRepo::find_by_id(&state.pool, patient_id)
        .await?
        .ok_or_else(|| AppError::Core(CoreError::Missing("Patient not found".into())))?;

    let left_ms = seconds_to_ms(input.social_time);
    let right_ms = seconds_to_ms(input.non_social_time);
    let session_id = format!("direct-{}", uuid::Uuid::new_v4());

    SocialAttentionRepo::create_completed(
        &state.pool,
        &CreateSocialAttentionSession {
            session_id: session_id.clone(),
            student_id: patient_id,
            teacher_id: Some(auth.user_id),
        },
        &CompleteSocialAttention {
            left_look_time_ms: left_ms,
            right_look_time_ms: right_ms,
            total_time_ms: input.total_time.map(seconds_to_ms).unwrap_or(left_ms + right_ms),
            score: direct_score(&input),
            confidence: input.confidence,
            end_time: Utc::now(),
        },
    )
    .await?;

    tracing::info!(
        %session_id,
        patient_id,
        therapist_id = auth.user_id,
        "Direct social attention score saved"
    );
    Ok(Json(SuccessResponse::new(DirectScoreSaved { session_id })))
}
