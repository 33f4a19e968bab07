//! Handlers for webcam gaze sessions (`/gaze`).
//!
//! Sessions move `active -> pending_review | completed -> reviewed`.
//! Snapshot routes accept either a bearer token or, for guest sessions that
//! are still active, no credentials at all.

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, TimeZone, Utc};
use cortexa_core::error::CoreError;
use cortexa_core::roles::ROLE_PARENT;
use cortexa_core::scripting::gaze::GazeAnalysis;
use cortexa_core::statuses::gaze;
use cortexa_core::types::{DbId, Timestamp};
use cortexa_db::models::gaze::{
    CreateGazeSession, CreateGazeSnapshot, GazeSession, GazeSnapshot, GuestInfo,
};
use cortexa_db::models::patient::Patient;
use cortexa_db::repositories::{GazeRepo, PatientRepo};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::middleware::auth::{AuthUser, OptionalAuth};
use crate::middleware::rbac::RequireTherapist;
use crate::state::AppState;
use crate::uploads::{self, MultipartForm, GAZE_AREA, MAX_IMAGE_BYTES, TEMP_AREA};

const DEFAULT_GUEST_CHILD: &str = "Guest Child";
const DEFAULT_GUEST_PARENT: &str = "Guest Parent";
const UNKNOWN_DIRECTION: &str = "unknown";

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuestStartRequest {
    pub child_name: Option<String>,
    pub parent_name: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartSessionRequest {
    pub patient_id: DbId,
}

/// Capture time sent by the browser: epoch millis or an RFC 3339 string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum CaptureTime {
    Millis(i64),
    Text(DateTime<Utc>),
}

impl CaptureTime {
    pub fn to_timestamp(&self) -> Option<Timestamp> {
        match self {
            CaptureTime::Millis(ms) => Utc.timestamp_millis_opt(*ms).single(),
            CaptureTime::Text(at) => Some(*at),
        }
    }
}

/// A base64 snapshot captured client-side.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncodedSnapshot {
    pub image: String,
    pub timestamp: Option<CaptureTime>,
    pub attention_score: Option<f64>,
    pub gaze_direction: Option<String>,
}

impl EncodedSnapshot {
    pub fn captured_at(&self) -> Timestamp {
        self.timestamp
            .as_ref()
            .and_then(CaptureTime::to_timestamp)
            .unwrap_or_else(Utc::now)
    }

    /// Snapshot row for an image already written to `image_path`.
    pub fn to_create(&self, image_path: String) -> CreateGazeSnapshot {
        CreateGazeSnapshot {
            image_path,
            captured_at: self.captured_at(),
            gaze_direction: Some(
                self.gaze_direction
                    .clone()
                    .unwrap_or_else(|| UNKNOWN_DIRECTION.to_string()),
            ),
            attention_score: Some(self.attention_score.unwrap_or(0.0)),
            head_pitch: None,
            head_yaw: None,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendForReviewRequest {
    pub session_id: Option<DbId>,
    #[serde(default)]
    pub snapshots: Vec<EncodedSnapshot>,
    pub end_time: Option<CaptureTime>,
}

#[derive(Debug, Serialize)]
pub struct ReviewSubmitted {
    pub message: &'static str,
    pub session: GazeSession,
}

#[derive(Debug, Deserialize)]
pub struct NotesRequest {
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest {
    pub image_base64: Option<String>,
}

/// A session with its snapshots and patient, for the therapist review page.
#[derive(Debug, Serialize)]
pub struct SessionDetail {
    #[serde(flatten)]
    pub session: GazeSession,
    pub patient: Option<Patient>,
    pub snapshots: Vec<GazeSnapshot>,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn session_not_found() -> AppError {
    AppError::Core(CoreError::Missing("Session not found".into()))
}

fn guest_access_denied() -> AppError {
    AppError::Core(CoreError::Unauthorized(
        "Unauthorized: Authentication or Guest Session required".into(),
    ))
}

/// Load a session the caller may write to.
///
/// Authenticated callers may use any session. Anonymous callers only reach
/// guest sessions that are still active; anything else is a 401 so session
/// ids cannot be probed.
async fn load_writable_session(
    state: &AppState,
    auth: &Option<AuthUser>,
    session_id: DbId,
) -> AppResult<GazeSession> {
    let session = GazeRepo::find_session(&state.pool, session_id).await?;
    match (auth, session) {
        (Some(_), Some(session)) => Ok(session),
        (Some(_), None) => Err(session_not_found()),
        (None, Some(session)) if session.is_guest && session.status == gaze::ACTIVE => {
            Ok(session)
        }
        (None, _) => Err(guest_access_denied()),
    }
}

/// Run the configured worker on a stored image, logging and swallowing
/// failures.
async fn try_analyze(state: &AppState, path: &std::path::Path) -> Option<GazeAnalysis> {
    let worker = state.gaze_worker.as_ref()?;
    match worker.analyze(path).await {
        Ok(analysis) => Some(analysis),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Snapshot analysis failed");
            None
        }
    }
}

async fn store_snapshot(
    state: &AppState,
    auth: Option<AuthUser>,
    session_id: DbId,
    form: MultipartForm,
) -> AppResult<GazeSnapshot> {
    let session = load_writable_session(state, &auth, session_id).await?;
    let file = form
        .file
        .as_ref()
        .ok_or_else(|| AppError::BadRequest("No image uploaded".into()))?;
    let extension = file
        .content_type
        .as_deref()
        .and_then(uploads::image_extension_for_content_type)
        .ok_or_else(|| AppError::BadRequest("Only image files are allowed".into()))?;

    if session.status != gaze::ACTIVE {
        return Err(AppError::BadRequest("Session is not active".into()));
    }

    let stored = uploads::store(&state.config.upload_dir, GAZE_AREA, extension, &file.bytes).await?;

    let mut snapshot = CreateGazeSnapshot {
        image_path: stored.public_path.clone(),
        captured_at: Utc::now(),
        gaze_direction: Some(
            form.text("gazeDirection")
                .unwrap_or(UNKNOWN_DIRECTION)
                .to_string(),
        ),
        attention_score: Some(form.number("attentionScore").unwrap_or(0.0)),
        head_pitch: Some(form.number("headPitch").unwrap_or(0.0)),
        head_yaw: Some(form.number("headYaw").unwrap_or(0.0)),
    };

    if form.flag("analyze") {
        if let Some(analysis) = try_analyze(state, &stored.disk_path).await {
            snapshot.gaze_direction = Some(analysis.gaze_direction);
            snapshot.attention_score = Some(analysis.attention_score);
            snapshot.head_pitch = Some(analysis.head_pitch);
            snapshot.head_yaw = Some(analysis.head_yaw);
        }
    }

    match GazeRepo::add_snapshot(&state.pool, session.id, &snapshot).await {
        Ok(saved) => {
            tracing::debug!(
                session_id = session.id,
                snapshot_id = saved.id,
                guest = auth.is_none(),
                "Gaze snapshot stored"
            );
            Ok(saved)
        }
        Err(e) => {
            uploads::remove_quietly(&stored.disk_path).await;
            Err(e.into())
        }
    }
}

fn form_session_id(form: &MultipartForm) -> AppResult<DbId> {
    form.text("sessionId")
        .ok_or_else(|| AppError::BadRequest("sessionId is required".into()))?
        .parse()
        .map_err(|_| AppError::BadRequest("Invalid sessionId".into()))
}

// ---------------------------------------------------------------------------
// Session lifecycle
// ---------------------------------------------------------------------------

/// POST /gaze/session/guest/start
pub async fn start_guest_session(
    State(state): State<AppState>,
    body: Option<Json<GuestStartRequest>>,
) -> AppResult<(StatusCode, Json<GazeSession>)> {
    let input = body.map(|Json(b)| b).unwrap_or_default();
    let non_empty = |v: Option<String>| v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());

    let session = GazeRepo::create_session(
        &state.pool,
        &CreateGazeSession {
            guest: Some(GuestInfo {
                child_name: non_empty(input.child_name)
                    .unwrap_or_else(|| DEFAULT_GUEST_CHILD.to_string()),
                parent_name: non_empty(input.parent_name)
                    .unwrap_or_else(|| DEFAULT_GUEST_PARENT.to_string()),
                email: non_empty(input.email),
            }),
            status: gaze::ACTIVE.to_string(),
            ..Default::default()
        },
    )
    .await?;

    tracing::info!(session_id = session.id, "Guest gaze session started");
    Ok((StatusCode::CREATED, Json(session)))
}

/// POST /gaze/session/start
///
/// A parent's session is routed to the child's assigned therapist; any other
/// caller becomes the session's therapist.
pub async fn start_session(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<StartSessionRequest>,
) -> AppResult<(StatusCode, Json<GazeSession>)> {
    let patient = PatientRepo::find_by_id(&state.pool, input.patient_id)
        .await?
        .ok_or_else(|| AppError::Core(CoreError::Missing("Patient not found".into())))?;

    let therapist_id = if auth.role == ROLE_PARENT {
        patient.therapist_user_id.ok_or_else(|| {
            AppError::BadRequest(
                "No therapist assigned to this patient. Please contact support.".into(),
            )
        })?
    } else {
        auth.user_id
    };

    let session = GazeRepo::create_session(
        &state.pool,
        &CreateGazeSession {
            patient_id: Some(patient.id),
            therapist_id: Some(therapist_id),
            guest: None,
            status: gaze::ACTIVE.to_string(),
        },
    )
    .await?;

    tracing::info!(
        session_id = session.id,
        patient_id = patient.id,
        therapist_id,
        "Gaze session started"
    );
    Ok((StatusCode::CREATED, Json(session)))
}

/// POST /gaze/snapshot/{sessionId}
pub async fn upload_snapshot(
    OptionalAuth(auth): OptionalAuth,
    State(state): State<AppState>,
    Path(session_id): Path<DbId>,
    multipart: Multipart,
) -> AppResult<Json<GazeSnapshot>> {
    let form = uploads::read_form(multipart, "image", MAX_IMAGE_BYTES).await?;
    Ok(Json(store_snapshot(&state, auth, session_id, form).await?))
}

/// POST /gaze/session/snapshot and POST /gaze/upload
///
/// Same as [`upload_snapshot`] with the session id as a form field.
pub async fn upload_snapshot_form(
    OptionalAuth(auth): OptionalAuth,
    State(state): State<AppState>,
    multipart: Multipart,
) -> AppResult<Json<GazeSnapshot>> {
    let form = uploads::read_form(multipart, "image", MAX_IMAGE_BYTES).await?;
    let session_id = form_session_id(&form)?;
    Ok(Json(store_snapshot(&state, auth, session_id, form).await?))
}

/// POST /gaze/session/send-for-review
///
/// Snapshots whose capture time matches one already stored (uploaded live)
/// are skipped, as are frames that fail to decode.
pub async fn send_for_review(
    OptionalAuth(auth): OptionalAuth,
    State(state): State<AppState>,
    Json(input): Json<SendForReviewRequest>,
) -> AppResult<Json<ReviewSubmitted>> {
    let session_id = input
        .session_id
        .ok_or_else(|| AppError::BadRequest("Missing session ID".into()))?;
    let session = load_writable_session(&state, &auth, session_id).await?;

    let existing: Vec<i64> = GazeRepo::snapshot_times(&state.pool, session.id)
        .await?
        .iter()
        .map(|t| t.timestamp_millis())
        .collect();

    let mut added = 0usize;
    for snap in &input.snapshots {
        let captured = snap.timestamp.as_ref().and_then(CaptureTime::to_timestamp);
        if captured.is_some_and(|at| existing.contains(&at.timestamp_millis())) {
            tracing::debug!(session_id = session.id, "Skipping snapshot already uploaded");
            continue;
        }

        let (bytes, extension) = match uploads::decode_image(&snap.image) {
            Ok(decoded) => decoded,
            Err(e) => {
                tracing::warn!(session_id = session.id, error = %e, "Skipping undecodable snapshot");
                continue;
            }
        };
        let stored = uploads::store(&state.config.upload_dir, GAZE_AREA, extension, &bytes).await?;
        if let Err(e) =
            GazeRepo::add_snapshot(&state.pool, session.id, &snap.to_create(stored.public_path)).await
        {
            uploads::remove_quietly(&stored.disk_path).await;
            return Err(e.into());
        }
        added += 1;
    }

    let end_time = input.end_time.as_ref().and_then(CaptureTime::to_timestamp);
    let session = GazeRepo::mark_pending_review(&state.pool, session.id, end_time)
        .await?
        .ok_or_else(session_not_found)?;

    tracing::info!(
        session_id = session.id,
        snapshots_added = added,
        "Gaze session submitted for review"
    );
    Ok(Json(ReviewSubmitted {
        message: "Session submitted for review",
        session,
    }))
}

/// POST /gaze/session/end/{sessionId}
pub async fn end_session(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(session_id): Path<DbId>,
) -> AppResult<Json<GazeSession>> {
    let session = GazeRepo::end_session(&state.pool, session_id)
        .await?
        .ok_or_else(session_not_found)?;
    Ok(Json(session))
}

// ---------------------------------------------------------------------------
// Therapist review
// ---------------------------------------------------------------------------

/// GET /gaze/sessions/active
pub async fn active_sessions(
    RequireTherapist(auth): RequireTherapist,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<GazeSession>>> {
    let sessions = GazeRepo::list_for_therapist(&state.pool, auth.user_id, &[gaze::ACTIVE]).await?;
    Ok(Json(sessions))
}

/// GET /gaze/sessions/pending-review
///
/// Includes sessions ended without an explicit review request.
pub async fn pending_review_sessions(
    RequireTherapist(auth): RequireTherapist,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<GazeSession>>> {
    let sessions = GazeRepo::list_for_therapist(
        &state.pool,
        auth.user_id,
        &[gaze::PENDING_REVIEW, gaze::COMPLETED],
    )
    .await?;
    Ok(Json(sessions))
}

/// PUT /gaze/snapshot/{sessionId}/{snapshotId}/notes
pub async fn update_snapshot_notes(
    RequireTherapist(_auth): RequireTherapist,
    State(state): State<AppState>,
    Path((session_id, snapshot_id)): Path<(DbId, DbId)>,
    Json(input): Json<NotesRequest>,
) -> AppResult<Json<GazeSnapshot>> {
    GazeRepo::find_session(&state.pool, session_id)
        .await?
        .ok_or_else(session_not_found)?;
    let snapshot =
        GazeRepo::update_snapshot_notes(&state.pool, session_id, snapshot_id, &input.notes)
            .await?
            .ok_or_else(|| AppError::Core(CoreError::Missing("Snapshot not found".into())))?;
    Ok(Json(snapshot))
}

/// GET /gaze/therapist/sessions/{sessionId}
pub async fn session_detail(
    RequireTherapist(_auth): RequireTherapist,
    State(state): State<AppState>,
    Path(session_id): Path<DbId>,
) -> AppResult<Json<SessionDetail>> {
    let session = GazeRepo::find_session(&state.pool, session_id)
        .await?
        .ok_or_else(session_not_found)?;
    let patient = match session.patient_id {
        Some(id) => PatientRepo::find_by_id(&state.pool, id).await?,
        None => None,
    };
    let snapshots = GazeRepo::list_snapshots(&state.pool, session.id).await?;
    Ok(Json(SessionDetail {
        session,
        patient,
        snapshots,
    }))
}

// ---------------------------------------------------------------------------
// Stateless analysis
// ---------------------------------------------------------------------------

/// POST /gaze/analyze
///
/// Runs the worker on a temporary copy of the image. The copy is removed
/// whether or not analysis succeeds.
pub async fn analyze(
    State(state): State<AppState>,
    Json(input): Json<AnalyzeRequest>,
) -> AppResult<Json<GazeAnalysis>> {
    let encoded = input
        .image_base64
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| AppError::BadRequest("No image data".into()))?;
    let worker = state
        .gaze_worker
        .clone()
        .ok_or_else(|| AppError::Unavailable("Gaze analysis is not configured".into()))?;

    let (bytes, extension) = uploads::decode_image(&encoded)
        .map_err(|_| AppError::BadRequest("Image data is not valid base64".into()))?;
    let temp = uploads::store(&state.config.upload_dir, TEMP_AREA, extension, &bytes).await?;

    let result = worker.analyze(&temp.disk_path).await;
    uploads::remove_quietly(&temp.disk_path).await;

    result
        .map(Json)
        .map_err(|e| AppError::InternalError(format!("Gaze analysis failed: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capture_time_accepts_millis_and_rfc3339() {
        let millis: CaptureTime = serde_json::from_str("1700000000000").unwrap();
        let text: CaptureTime = serde_json::from_str("\"2023-11-14T22:13:20Z\"").unwrap();
        assert_eq!(millis.to_timestamp(), text.to_timestamp());
    }

    #[test]
    fn encoded_snapshot_defaults() {
        let snap: EncodedSnapshot = serde_json::from_str(r#"{"image": "aGVsbG8="}"#).unwrap();
        let row = snap.to_create("/uploads/gaze/x.jpg".into());
        assert_eq!(row.gaze_direction.as_deref(), Some(UNKNOWN_DIRECTION));
        assert_eq!(row.attention_score, Some(0.0));
        assert!(row.head_pitch.is_none());
    }
}
