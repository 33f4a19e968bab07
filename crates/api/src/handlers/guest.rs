//! Anonymous live-gaze screening submissions (`/guest`).

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use cortexa_core::statuses::gaze;
use cortexa_core::types::DbId;
use cortexa_db::models::gaze::{CreateGazeSession, CreateGazeSnapshot, GuestInfo};
use cortexa_db::repositories::GazeRepo;
use serde::{Deserialize, Serialize};

use super::gaze::EncodedSnapshot;
use crate::error::{AppError, AppResult};
use crate::state::AppState;
use crate::uploads::{self, StoredFile, GAZE_AREA};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuestContact {
    pub child_name: Option<String>,
    pub parent_name: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveGazeSubmission {
    pub guest_info: Option<GuestContact>,
    #[serde(default)]
    pub snapshots: Vec<EncodedSnapshot>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveGazeAccepted {
    pub success: bool,
    pub message: &'static str,
    pub session_id: DbId,
    pub snapshots_processed: usize,
}

fn required(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

async fn discard(files: &[StoredFile]) {
    for file in files {
        uploads::remove_quietly(&file.disk_path).await;
    }
}

/// POST /guest/live-gaze/submit
///
/// Writes every snapshot image, then creates the session and its snapshots
/// in one transaction. Any failure removes the images already written.
pub async fn submit_live_gaze(
    State(state): State<AppState>,
    Json(input): Json<LiveGazeSubmission>,
) -> AppResult<(StatusCode, Json<LiveGazeAccepted>)> {
    let contact = input.guest_info.ok_or_else(missing_contact)?;
    let (Some(child_name), Some(parent_name), Some(email)) = (
        required(contact.child_name),
        required(contact.parent_name),
        required(contact.email),
    ) else {
        return Err(missing_contact());
    };
    if input.snapshots.is_empty() {
        return Err(AppError::BadRequest(
            "At least one snapshot is required".into(),
        ));
    }

    let mut written: Vec<StoredFile> = Vec::with_capacity(input.snapshots.len());
    let mut rows: Vec<CreateGazeSnapshot> = Vec::with_capacity(input.snapshots.len());
    for (index, snap) in input.snapshots.iter().enumerate() {
        let (bytes, extension) = match uploads::decode_image(&snap.image) {
            Ok(decoded) => decoded,
            Err(e) => {
                discard(&written).await;
                tracing::warn!(index, error = %e, "Guest snapshot failed to decode");
                return Err(AppError::BadRequest(format!(
                    "Failed to save snapshot {}: invalid image data",
                    index + 1
                )));
            }
        };
        match uploads::store(&state.config.upload_dir, GAZE_AREA, extension, &bytes).await {
            Ok(stored) => {
                rows.push(snap.to_create(stored.public_path.clone()));
                written.push(stored);
            }
            Err(e) => {
                discard(&written).await;
                return Err(e);
            }
        }
    }

    let session_input = CreateGazeSession {
        guest: Some(GuestInfo {
            child_name,
            parent_name,
            email: Some(email),
        }),
        status: gaze::PENDING_REVIEW.to_string(),
        ..Default::default()
    };
    let (session, snapshots) =
        match GazeRepo::create_session_with_snapshots(&state.pool, &session_input, &rows).await {
            Ok(created) => created,
            Err(e) => {
                discard(&written).await;
                return Err(e.into());
            }
        };

    tracing::info!(
        session_id = session.id,
        snapshots = snapshots.len(),
        "Guest live-gaze session submitted"
    );
    Ok((
        StatusCode::CREATED,
        Json(LiveGazeAccepted {
            success: true,
            message: "Session sent to therapist for review.",
            session_id: session.id,
            snapshots_processed: snapshots.len(),
        }),
    ))
}

fn missing_contact() -> AppError {
    AppError::BadRequest(
        "Missing required guest information (childName, parentName, email)".into(),
    )
}
