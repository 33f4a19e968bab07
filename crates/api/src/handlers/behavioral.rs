//! Handlers for behavioural assessment games (`/behavioral`).
//!
//! Any authenticated user may record results; the caller is stored as the
//! recording teacher and scopes the per-tool listing, stats and analysis.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use cortexa_core::behavioral::{
    self, AnalysisReport, AssessmentRecord, AssessmentStats, EYE_GAZE_TRACKER, SOUND_SENSITIVITY,
};
use cortexa_core::error::CoreError;
use cortexa_core::games::{self, EyeGazeSample, GameSummary, SoundResponse};
use cortexa_core::types::{DbId, Timestamp};
use cortexa_db::models::behavioral::{
    BehavioralAssessment, CreateBehavioralAssessment, EyeGazeFields, ImitationFields,
};
use cortexa_db::models::patient::Patient;
use cortexa_db::repositories::{BehavioralRepo, PatientRepo};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitAssessmentRequest {
    pub student_id: DbId,
    pub session_id: Option<String>,
    pub game: Option<String>,
    pub assessment_type: String,
    pub score: f64,
    #[serde(default)]
    pub metrics: Option<Value>,
    #[serde(default)]
    pub indicators: Option<Value>,
    pub raw_game_data: Option<Value>,
    pub completed_at: Option<Timestamp>,

    // Eye-gaze tracker
    pub eye_contact_time: Option<f64>,
    pub object_focus_time: Option<f64>,
    pub eye_contact_ratio: Option<f64>,
    pub object_focus_ratio: Option<f64>,
    pub gaze_shift_count: Option<i32>,
    pub session_duration: Option<f64>,

    // Imitation
    pub total_actions: Option<i32>,
    pub correct_imitations: Option<i32>,
    pub imitation_accuracy: Option<f64>,
    pub average_reaction_time: Option<f64>,
    pub mean_similarity_score: Option<f64>,
}

impl SubmitAssessmentRequest {
    fn into_create(self, teacher_id: DbId) -> CreateBehavioralAssessment {
        CreateBehavioralAssessment {
            student_id: self.student_id,
            teacher_id,
            assessment_type: self.assessment_type,
            score: self.score,
            session_ref: self.session_id,
            game: self.game,
            eye_gaze: EyeGazeFields {
                eye_contact_time: self.eye_contact_time,
                object_focus_time: self.object_focus_time,
                eye_contact_ratio: self.eye_contact_ratio,
                object_focus_ratio: self.object_focus_ratio,
                gaze_shift_count: self.gaze_shift_count,
                session_duration: self.session_duration,
            },
            imitation: ImitationFields {
                total_actions: self.total_actions,
                correct_imitations: self.correct_imitations,
                imitation_accuracy: self.imitation_accuracy,
                average_reaction_time: self.average_reaction_time,
                mean_similarity_score: self.mean_similarity_score,
            },
            metrics: self.metrics.unwrap_or_else(|| Value::Object(Default::default())),
            indicators: self.indicators.unwrap_or_else(|| Value::Array(Vec::new())),
            raw_game_data: self.raw_game_data,
            completed_at: self.completed_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AssessmentDetail {
    #[serde(flatten)]
    pub assessment: BehavioralAssessment,
    pub student: Option<Patient>,
}

/// Raw sound-sensitivity reactions, one per stimulus.
#[derive(Debug, Deserialize)]
pub struct SoundSensitivityInput {
    pub responses: Vec<SoundResponse>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /behavioral/submit
pub async fn submit(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<SubmitAssessmentRequest>,
) -> AppResult<(StatusCode, Json<BehavioralAssessment>)> {
    behavioral::validate_assessment_type(&input.assessment_type)?;
    if !input.score.is_finite() {
        return Err(AppError::BadRequest("Score must be a number".into()));
    }
    PatientRepo::find_by_id(&state.pool, input.student_id)
        .await?
        .ok_or_else(|| AppError::Core(CoreError::Missing("Student not found".into())))?;

    let assessment = BehavioralRepo::create(&state.pool, &input.into_create(auth.user_id)).await?;
    tracing::info!(
        assessment_id = assessment.id,
        student_id = assessment.student_id,
        assessment_type = %assessment.assessment_type,
        score = assessment.score,
        "Behavioral assessment recorded"
    );
    Ok((StatusCode::CREATED, Json(assessment)))
}

/// GET /behavioral/student/{studentId}
pub async fn for_student(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(student_id): Path<DbId>,
) -> AppResult<Json<Vec<BehavioralAssessment>>> {
    let rows = BehavioralRepo::list_for_student(&state.pool, student_id, None).await?;
    Ok(Json(rows))
}

/// GET /behavioral/tool/{type}
pub async fn for_tool(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(assessment_type): Path<String>,
) -> AppResult<Json<Vec<BehavioralAssessment>>> {
    behavioral::validate_assessment_type(&assessment_type)?;
    let rows = BehavioralRepo::list_by_type(&state.pool, auth.user_id, &assessment_type).await?;
    Ok(Json(rows))
}

/// GET /behavioral/session/{id}
pub async fn session(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<AssessmentDetail>> {
    let assessment = BehavioralRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::Core(CoreError::Missing("Session not found".into())))?;
    let student = PatientRepo::find_by_id(&state.pool, assessment.student_id).await?;
    Ok(Json(AssessmentDetail {
        assessment,
        student,
    }))
}

/// GET /behavioral/stats
pub async fn stats(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<AssessmentStats>> {
    let rows = BehavioralRepo::stats_rows(&state.pool, auth.user_id).await?;
    Ok(Json(behavioral::assessment_stats(&rows, Utc::now())))
}

/// GET /behavioral/analyze/{studentId}
///
/// Builds the risk report from the caller's recorded assessments.
pub async fn analyze(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(student_id): Path<DbId>,
) -> AppResult<Json<AnalysisReport>> {
    let rows = BehavioralRepo::list_for_student(&state.pool, student_id, Some(auth.user_id)).await?;
    let records: Vec<AssessmentRecord> = rows.iter().map(BehavioralAssessment::to_record).collect();

    let report = behavioral::analyze(student_id, &records, Utc::now()).ok_or_else(|| {
        AppError::Core(CoreError::Missing(
            "No assessments found for this student. Please complete at least one assessment game."
                .into(),
        ))
    })?;

    tracing::info!(
        student_id,
        assessments = records.len(),
        probability = report.risk_summary.probability_score,
        "Behavioral analysis generated"
    );
    Ok(Json(report))
}

/// POST /behavioral/score/{type}
///
/// Scores raw game signals server-side so clients can submit the summary.
pub async fn score(
    _auth: AuthUser,
    Path(assessment_type): Path<String>,
    Json(body): Json<Value>,
) -> AppResult<Json<GameSummary>> {
    let summary = match assessment_type.as_str() {
        SOUND_SENSITIVITY => {
            let input: SoundSensitivityInput = parse_signals(body)?;
            games::summarize_sound_sensitivity(&input.responses)
        }
        EYE_GAZE_TRACKER => {
            let sample: EyeGazeSample = parse_signals(body)?;
            games::summarize_eye_gaze(&sample)
        }
        other => {
            return Err(AppError::BadRequest(format!(
                "Server-side scoring is not available for '{other}'"
            )))
        }
    };
    Ok(Json(summary))
}

fn parse_signals<T: serde::de::DeserializeOwned>(body: Value) -> AppResult<T> {
    serde_json::from_value(body)
        .map_err(|e| AppError::BadRequest(format!("Invalid game signals: {e}")))
}
