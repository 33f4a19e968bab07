//! Screening submissions (`/screenings`, `/admin/screenings`).

use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::Json;
use cortexa_core::error::CoreError;
use cortexa_core::statuses::screening;
use cortexa_core::types::DbId;
use cortexa_db::models::screening::{CreateScreening, Screening};
use cortexa_db::repositories::{PatientRepo, ScreeningRepo};

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequireAdmin;
use crate::state::AppState;
use crate::uploads::{self, MultipartForm, StoredFile, MAX_SCREENING_BYTES, SCREENING_AREA};

/// Validate the text fields of a submission into a create DTO (without the
/// file path).
fn screening_from_form(user_id: DbId, form: &MultipartForm) -> AppResult<CreateScreening> {
    let screening_type = form
        .text("screeningType")
        .ok_or_else(|| AppError::BadRequest("screeningType is required".into()))?;
    if !screening::TYPES.contains(&screening_type) {
        return Err(AppError::BadRequest(format!(
            "Invalid screening type '{screening_type}'"
        )));
    }
    let result = form.text("result");
    if let Some(result) = result {
        if !screening::RESULTS.contains(&result) {
            return Err(AppError::BadRequest(format!("Invalid screening result '{result}'")));
        }
    }
    let patient_id = form
        .text("patientId")
        .map(|v| {
            v.parse::<DbId>()
                .map_err(|_| AppError::BadRequest("Invalid patient ID".into()))
        })
        .transpose()?;

    Ok(CreateScreening {
        user_id,
        patient_id,
        child_name: form.text("childName").map(str::to_string),
        screening_type: screening_type.to_string(),
        result: result.map(str::to_string),
        file_path: None,
        gaze_direction: form.text("gazeDirection").map(str::to_string),
        attention_score: form.number("attentionScore"),
        head_pitch: form.number("headPitch"),
        head_yaw: form.number("headYaw"),
        notes: form.text("notes").map(str::to_string),
    })
}

/// POST /screenings
///
/// Facial, voice and MRI screenings must carry a `file` part.
pub async fn create(
    auth: AuthUser,
    State(state): State<AppState>,
    multipart: Multipart,
) -> AppResult<(StatusCode, Json<Screening>)> {
    let form = uploads::read_form(multipart, "file", MAX_SCREENING_BYTES).await?;
    let mut input = screening_from_form(auth.user_id, &form)?;

    let file = form.file.as_ref().filter(|f| !f.bytes.is_empty());
    if file.is_none() && screening::requires_file(&input.screening_type) {
        return Err(AppError::BadRequest(format!(
            "A file is required for {} screenings",
            input.screening_type
        )));
    }

    if let Some(patient_id) = input.patient_id {
        PatientRepo::find_by_id(&state.pool, patient_id)
            .await?
            .ok_or_else(|| AppError::Core(CoreError::Missing("Patient not found".into())))?;
    }

    let stored: Option<StoredFile> = match file {
        Some(file) => {
            let extension = file
                .file_name
                .as_deref()
                .and_then(uploads::extension_of)
                .unwrap_or_else(|| "bin".to_string());
            Some(
                uploads::store(
                    &state.config.upload_dir,
                    SCREENING_AREA,
                    &extension,
                    &file.bytes,
                )
                .await?,
            )
        }
        None => None,
    };
    input.file_path = stored.as_ref().map(|s| s.public_path.clone());

    let created = match ScreeningRepo::create(&state.pool, &input).await {
        Ok(created) => created,
        Err(e) => {
            if let Some(stored) = &stored {
                uploads::remove_quietly(&stored.disk_path).await;
            }
            return Err(e.into());
        }
    };
    if let Some(patient_id) = created.patient_id {
        PatientRepo::mark_screening_completed(&state.pool, patient_id).await?;
    }

    tracing::info!(
        screening_id = created.id,
        user_id = auth.user_id,
        screening_type = %created.screening_type,
        has_file = created.file_path.is_some(),
        "Screening recorded"
    );
    Ok((StatusCode::CREATED, Json(created)))
}

/// GET /screenings
pub async fn list_own(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<Screening>>> {
    Ok(Json(ScreeningRepo::list_by_user(&state.pool, auth.user_id).await?))
}

/// GET /admin/screenings
pub async fn list_all(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<Screening>>> {
    Ok(Json(ScreeningRepo::list_all(&state.pool).await?))
}
