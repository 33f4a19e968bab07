//! Handlers for speech-therapy practice recordings (`/speech-therapy`).

use std::io::SeekFrom;

use axum::body::Body;
use axum::extract::{Multipart, Path, State};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use cortexa_core::error::CoreError;
use cortexa_core::speech::{self, ProgressSummary, RatedSession, Rating};
use cortexa_core::types::{DbId, Timestamp};
use cortexa_db::models::speech::{
    CreateSpeechSession, EvaluateSpeechSession, PendingSpeechSession, SpeechSession,
};
use cortexa_db::repositories::{PatientRepo, SpeechRepo};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio_util::io::ReaderStream;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequireClinician;
use crate::response::MessageResponse;
use crate::state::AppState;
use crate::uploads::{self, MAX_AUDIO_BYTES, SPEECH_AREA};

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct SessionEnvelope<T: Serialize> {
    pub message: &'static str,
    pub session: T,
}

#[derive(Debug, Deserialize)]
pub struct EvaluateRequest {
    pub rating: Option<String>,
    pub feedback: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineEntry {
    pub date: Timestamp,
    pub session_number: i32,
    pub rating: String,
    pub feedback: String,
    pub practice_prompt: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ProgressReport {
    #[serde(flatten)]
    pub summary: ProgressSummary,
    pub sessions: Vec<TimelineEntry>,
}

fn session_not_found() -> AppError {
    AppError::Core(CoreError::Missing("Session not found".into()))
}

// ---------------------------------------------------------------------------
// Byte ranges
// ---------------------------------------------------------------------------

/// Why a `Range` header cannot be served.
#[derive(Debug, PartialEq, Eq)]
pub struct UnsatisfiableRange;

/// Parse a single `bytes=start-end` range against a file of `size` bytes.
///
/// Returns the inclusive `(start, end)` pair. An open end runs to the last
/// byte and an end past the file is clamped; suffix ranges (`bytes=-n`)
/// cover the final `n` bytes.
pub fn parse_byte_range(header: &str, size: u64) -> Result<(u64, u64), UnsatisfiableRange> {
    let spec = header
        .trim()
        .strip_prefix("bytes=")
        .ok_or(UnsatisfiableRange)?;
    if size == 0 || spec.contains(',') {
        return Err(UnsatisfiableRange);
    }
    let (start, end) = spec.split_once('-').ok_or(UnsatisfiableRange)?;
    let (start, end) = (start.trim(), end.trim());

    if start.is_empty() {
        let suffix: u64 = end.parse().map_err(|_| UnsatisfiableRange)?;
        if suffix == 0 {
            return Err(UnsatisfiableRange);
        }
        return Ok((size.saturating_sub(suffix), size - 1));
    }

    let start: u64 = start.parse().map_err(|_| UnsatisfiableRange)?;
    let end: u64 = if end.is_empty() {
        size - 1
    } else {
        end.parse::<u64>().map_err(|_| UnsatisfiableRange)?.min(size - 1)
    };
    if start >= size || start > end {
        return Err(UnsatisfiableRange);
    }
    Ok((start, end))
}

fn audio_content_type(path: &str) -> &'static str {
    match uploads::extension_of(path).as_deref() {
        Some("mp3") => "audio/mpeg",
        Some("wav") => "audio/wav",
        Some("ogg") => "audio/ogg",
        Some("m4a" | "mp4") => "audio/mp4",
        _ => "audio/webm",
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /speech-therapy/upload
pub async fn upload(
    _auth: AuthUser,
    State(state): State<AppState>,
    multipart: Multipart,
) -> AppResult<(StatusCode, Json<SessionEnvelope<SpeechSession>>)> {
    let form = uploads::read_form(multipart, "audio", MAX_AUDIO_BYTES).await?;
    let file = form
        .file
        .as_ref()
        .ok_or_else(|| AppError::BadRequest("No audio file uploaded".into()))?;
    let extension = file
        .file_name
        .as_deref()
        .and_then(uploads::extension_of)
        .filter(|ext| speech::is_audio_extension(ext))
        .ok_or_else(|| {
            AppError::BadRequest(
                "Only audio files are allowed (webm, mp3, wav, ogg, m4a, mp4)".into(),
            )
        })?;

    let child_id: DbId = form
        .text("childId")
        .ok_or_else(|| AppError::BadRequest("Child ID is required".into()))?
        .parse()
        .map_err(|_| AppError::BadRequest("Invalid child ID".into()))?;
    PatientRepo::find_by_id(&state.pool, child_id)
        .await?
        .ok_or_else(|| AppError::Core(CoreError::Missing("Child not found".into())))?;

    let stored =
        uploads::store(&state.config.upload_dir, SPEECH_AREA, &extension, &file.bytes).await?;
    let input = CreateSpeechSession {
        child_id,
        audio_file_path: stored.public_path.clone(),
        original_file_name: file.file_name.clone(),
        practice_prompt: form.text("practicePrompt").map(str::to_string),
        sample_audio_path: form.text("sampleAudioPath").map(str::to_string),
        duration_secs: form.number("duration"),
    };
    let session = match SpeechRepo::create(&state.pool, &input).await {
        Ok(session) => session,
        Err(e) => {
            uploads::remove_quietly(&stored.disk_path).await;
            return Err(e.into());
        }
    };

    tracing::info!(
        session_id = session.id,
        child_id,
        session_number = session.session_number,
        bytes = file.bytes.len(),
        "Speech recording uploaded"
    );
    Ok((
        StatusCode::CREATED,
        Json(SessionEnvelope {
            message: "Speech recording uploaded successfully",
            session,
        }),
    ))
}

/// GET /speech-therapy/child/{childId}
pub async fn for_child(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(child_id): Path<DbId>,
) -> AppResult<Json<Vec<SpeechSession>>> {
    Ok(Json(SpeechRepo::list_for_child(&state.pool, child_id).await?))
}

/// GET /speech-therapy/pending
pub async fn pending(
    RequireClinician(_auth): RequireClinician,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<PendingSpeechSession>>> {
    Ok(Json(SpeechRepo::list_pending(&state.pool).await?))
}

/// PUT /speech-therapy/evaluate/{id}
pub async fn evaluate(
    RequireClinician(auth): RequireClinician,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<EvaluateRequest>,
) -> AppResult<Json<SessionEnvelope<SpeechSession>>> {
    let rating = input
        .rating
        .as_deref()
        .and_then(|r| Rating::parse(r).ok())
        .ok_or_else(|| {
            AppError::BadRequest("Valid rating is required (Poor/Average/Good)".into())
        })?;

    let session = SpeechRepo::evaluate(
        &state.pool,
        id,
        &EvaluateSpeechSession {
            rating: rating.as_str().to_string(),
            feedback: input.feedback,
            notes: input.notes,
            evaluated_by: auth.user_id,
        },
    )
    .await?
    .ok_or_else(session_not_found)?;

    tracing::info!(
        session_id = id,
        evaluator = auth.user_id,
        rating = rating.as_str(),
        "Speech session evaluated"
    );
    Ok(Json(SessionEnvelope {
        message: "Session evaluated successfully",
        session,
    }))
}

/// GET /speech-therapy/progress/{childId}
pub async fn progress(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(child_id): Path<DbId>,
) -> AppResult<Json<ProgressReport>> {
    let mut sessions = SpeechRepo::list_for_child(&state.pool, child_id).await?;
    sessions.reverse();

    let rated: Vec<RatedSession<'_>> = sessions
        .iter()
        .map(|s| RatedSession {
            status: &s.status,
            rating: &s.rating,
        })
        .collect();
    let summary = speech::summarize_progress(&rated);

    let timeline = sessions
        .iter()
        .map(|s| TimelineEntry {
            date: s.session_date,
            session_number: s.session_number,
            rating: s.rating.clone(),
            feedback: s.feedback.clone(),
            practice_prompt: s.practice_prompt.clone(),
        })
        .collect();

    Ok(Json(ProgressReport {
        summary,
        sessions: timeline,
    }))
}

/// GET /speech-therapy/audio/{id}
///
/// Streams the recording, honouring a single `Range: bytes=a-b` request.
pub async fn audio(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    headers: HeaderMap,
) -> AppResult<Response> {
    let session = SpeechRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(session_not_found)?;
    let audio_missing = || AppError::Core(CoreError::Missing("Audio file not found".into()));
    let path = uploads::resolve(&state.config.upload_dir, &session.audio_file_path)
        .ok_or_else(audio_missing)?;

    let mut file = match tokio::fs::File::open(&path).await {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(audio_missing()),
        Err(e) => return Err(e.into()),
    };
    let size = file.metadata().await?.len();
    let content_type = HeaderValue::from_static(audio_content_type(&session.audio_file_path));

    let range = headers
        .get(header::RANGE)
        .and_then(|v| v.to_str().ok())
        .map(|v| parse_byte_range(v, size));

    match range {
        None => Ok((
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, content_type),
                (header::ACCEPT_RANGES, HeaderValue::from_static("bytes")),
                (header::CONTENT_LENGTH, HeaderValue::from(size)),
            ],
            Body::from_stream(ReaderStream::new(file)),
        )
            .into_response()),
        Some(Err(UnsatisfiableRange)) => Ok((
            StatusCode::RANGE_NOT_SATISFIABLE,
            [(
                header::CONTENT_RANGE,
                HeaderValue::try_from(format!("bytes */{size}"))
                    .map_err(|e| AppError::InternalError(e.to_string()))?,
            )],
        )
            .into_response()),
        Some(Ok((start, end))) => {
            let length = end - start + 1;
            file.seek(SeekFrom::Start(start)).await?;
            let content_range = HeaderValue::try_from(format!("bytes {start}-{end}/{size}"))
                .map_err(|e| AppError::InternalError(e.to_string()))?;
            Ok((
                StatusCode::PARTIAL_CONTENT,
                [
                    (header::CONTENT_TYPE, content_type),
                    (header::ACCEPT_RANGES, HeaderValue::from_static("bytes")),
                    (header::CONTENT_RANGE, content_range),
                    (header::CONTENT_LENGTH, HeaderValue::from(length)),
                ],
                Body::from_stream(ReaderStream::new(file.take(length))),
            )
                .into_response())
        }
    }
}

/// DELETE /speech-therapy/{id}
pub async fn delete(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<MessageResponse>> {
    let session = SpeechRepo::delete(&state.pool, id)
        .await?
        .ok_or_else(session_not_found)?;
    if let Some(path) = uploads::resolve(&state.config.upload_dir, &session.audio_file_path) {
        uploads::remove_quietly(&path).await;
    }
    tracing::info!(session_id = id, "Speech session deleted");
    Ok(Json(MessageResponse::new("Session deleted successfully")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closed_and_open_ranges() {
        assert_eq!(parse_byte_range("bytes=0-99", 1000), Ok((0, 99)));
        assert_eq!(parse_byte_range("bytes=500-", 1000), Ok((500, 999)));
        assert_eq!(parse_byte_range("bytes=900-5000", 1000), Ok((900, 999)));
    }

    #[test]
    fn suffix_range_covers_the_tail() {
        assert_eq!(parse_byte_range("bytes=-100", 1000), Ok((900, 999)));
        assert_eq!(parse_byte_range("bytes=-5000", 1000), Ok((0, 999)));
    }

    #[test]
    fn unsatisfiable_ranges() {
        assert_eq!(parse_byte_range("bytes=1000-", 1000), Err(UnsatisfiableRange));
        assert_eq!(parse_byte_range("bytes=50-10", 1000), Err(UnsatisfiableRange));
        assert_eq!(parse_byte_range("bytes=0-1,5-9", 1000), Err(UnsatisfiableRange));
        assert_eq!(parse_byte_range("items=0-1", 1000), Err(UnsatisfiableRange));
        assert_eq!(parse_byte_range("bytes=0-0", 0), Err(UnsatisfiableRange));
    }

    #[test]
    fn content_types_follow_extension() {
        assert_eq!(audio_content_type("/uploads/speech-therapy/a.mp3"), "audio/mpeg");
        assert_eq!(audio_content_type("/uploads/speech-therapy/a.webm"), "audio/webm");
        assert_eq!(audio_content_type("/uploads/speech-therapy/a.m4a"), "audio/mp4");
    }
}
