//! Handlers for the parent portal (`/parent`).
//!
//! A parent manages their own children and books therapy sessions against
//! the therapists' published availability windows.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use cortexa_core::error::CoreError;
use cortexa_core::patient_code::generate_patient_code;
use cortexa_core::scheduling;
use cortexa_core::types::DbId;
use cortexa_db::models::appointment::{AppointmentDetail, CreateAppointment};
use cortexa_db::models::patient::{CreatePatient, Patient, UpdatePatient};
use cortexa_db::models::user::UserResponse;
use cortexa_db::repositories::{AppointmentRepo, PatientRepo, UserRepo};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::therapist::{availability_params, slot_availability, Availability, AvailabilityQuery};
use crate::error::{AppError, AppResult};
use crate::middleware::rbac::RequireParent;
use crate::response::MessageResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Validate)]
pub struct CreateChildRequest {
    #[validate(length(min = 1, message = "Name, age and gender are required"))]
    pub name: String,
    #[validate(range(min = 0, max = 25, message = "Age must be between 0 and 25"))]
    pub age: i32,
    #[validate(length(min = 1, message = "Name, age and gender are required"))]
    pub gender: String,
    pub grade: Option<String>,
    #[serde(alias = "medicalHistory")]
    pub medical_history: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateChildRequest {
    pub name: Option<String>,
    pub age: Option<i32>,
    pub gender: Option<String>,
    pub grade: Option<String>,
    #[serde(alias = "medicalHistory")]
    pub medical_history: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookAppointmentRequest {
    pub child_id: DbId,
    pub therapist_id: DbId,
    pub appointment_date: String,
    pub appointment_time: String,
    pub reason: Option<String>,
}

/// A bookable therapist as listed to parents.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TherapistListing {
    pub id: DbId,
    pub name: String,
    pub email: String,
    pub qualification: Option<String>,
    pub license_number: Option<String>,
}

fn child_not_found() -> AppError {
    AppError::Core(CoreError::Missing("Child not found".into()))
}

// ---------------------------------------------------------------------------
// Profile
// ---------------------------------------------------------------------------

/// GET /parent/profile
pub async fn profile(
    RequireParent(auth): RequireParent,
    State(state): State<AppState>,
) -> AppResult<Json<UserResponse>> {
    let user = UserRepo::find_by_id(&state.pool, auth.user_id)
        .await?
        .ok_or_else(|| AppError::Core(CoreError::Missing("User not found".into())))?;
    Ok(Json(UserResponse::from(&user)))
}

// ---------------------------------------------------------------------------
// Children
// ---------------------------------------------------------------------------

/// GET /parent/children
pub async fn list_children(
    RequireParent(auth): RequireParent,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<Patient>>> {
    let children = PatientRepo::list_by_parent(&state.pool, auth.user_id).await?;
    Ok(Json(children))
}

/// POST /parent/children
pub async fn create_child(
    RequireParent(auth): RequireParent,
    State(state): State<AppState>,
    Json(input): Json<CreateChildRequest>,
) -> AppResult<(StatusCode, Json<Patient>)> {
    input.validate()?;

    let child = PatientRepo::create(
        &state.pool,
        &CreatePatient {
            patient_code: generate_patient_code(),
            name: input.name.trim().to_string(),
            age: Some(input.age),
            gender: Some(input.gender),
            grade: input.grade,
            medical_history: input.medical_history,
            parent_id: Some(auth.user_id),
            teacher_id: None,
        },
    )
    .await?;

    tracing::info!(parent_id = auth.user_id, patient_id = child.id, "Child registered");
    Ok((StatusCode::CREATED, Json(child)))
}

/// GET /parent/children/{id}
pub async fn get_child(
    RequireParent(auth): RequireParent,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<Patient>> {
    PatientRepo::find_for_parent(&state.pool, id, auth.user_id)
        .await?
        .map(Json)
        .ok_or_else(child_not_found)
}

/// PUT /parent/children/{id}
pub async fn update_child(
    RequireParent(auth): RequireParent,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateChildRequest>,
) -> AppResult<Json<Patient>> {
    let update = UpdatePatient {
        name: input.name,
        age: input.age,
        gender: input.gender,
        grade: input.grade,
        medical_history: input.medical_history,
    };
    PatientRepo::update_for_parent(&state.pool, id, auth.user_id, &update)
        .await?
        .map(Json)
        .ok_or_else(child_not_found)
}

/// DELETE /parent/children/{id}
pub async fn delete_child(
    RequireParent(auth): RequireParent,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<MessageResponse>> {
    if !PatientRepo::delete_for_parent(&state.pool, id, auth.user_id).await? {
        return Err(child_not_found());
    }
    Ok(Json(MessageResponse::new("Child deleted successfully")))
}

// ---------------------------------------------------------------------------
// Therapists and availability
// ---------------------------------------------------------------------------

/// GET /parent/therapists
pub async fn therapists(
    RequireParent(_auth): RequireParent,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<TherapistListing>>> {
    let therapists = UserRepo::list_bookable_therapists(&state.pool).await?;
    let listings = therapists
        .iter()
        .map(|t| TherapistListing {
            id: t.id,
            name: t.display_name(),
            email: t.email.clone(),
            qualification: t.qualification.clone(),
            license_number: t.license_number.clone(),
        })
        .collect();
    Ok(Json(listings))
}

/// GET /parent/available-slots?therapistId&date
///
/// The therapist's generated slots minus times already booked.
pub async fn available_slots(
    RequireParent(_auth): RequireParent,
    State(state): State<AppState>,
    Query(query): Query<AvailabilityQuery>,
) -> AppResult<Json<Availability>> {
    let (therapist_id, date) = availability_params(&query)?;
    let availability = slot_availability(&state.pool, therapist_id, date, true).await?;
    Ok(Json(availability))
}

// ---------------------------------------------------------------------------
// Appointments
// ---------------------------------------------------------------------------

/// GET /parent/appointments
pub async fn appointments(
    RequireParent(auth): RequireParent,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<AppointmentDetail>>> {
    let rows = AppointmentRepo::list_for_parent(&state.pool, auth.user_id).await?;
    Ok(Json(rows))
}

/// POST /parent/appointments
///
/// The requested time must be one of the slots generated from the
/// therapist's window for that date. A time already held by another live
/// booking is rejected by the unique index and surfaces as 409.
pub async fn book_appointment(
    RequireParent(auth): RequireParent,
    State(state): State<AppState>,
    Json(input): Json<BookAppointmentRequest>,
) -> AppResult<(StatusCode, Json<AppointmentDetail>)> {
    let date = scheduling::parse_date(&input.appointment_date)?;
    let time_text = scheduling::normalize_appointment_time(&input.appointment_time)?;

    PatientRepo::find_for_parent(&state.pool, input.child_id, auth.user_id)
        .await?
        .ok_or_else(child_not_found)?;
    UserRepo::find_bookable_therapist(&state.pool, input.therapist_id)
        .await?
        .ok_or_else(|| AppError::Core(CoreError::Missing("Therapist not found".into())))?;

    let availability = slot_availability(&state.pool, input.therapist_id, date, false).await?;
    if !availability
        .available_slots
        .iter()
        .any(|slot| slot.start == time_text)
    {
        return Err(AppError::BadRequest(
            "Selected time is not within the therapist's availability".into(),
        ));
    }

    let created = AppointmentRepo::create(
        &state.pool,
        &CreateAppointment {
            parent_id: auth.user_id,
            child_id: input.child_id,
            therapist_id: input.therapist_id,
            appointment_date: date,
            appointment_time: scheduling::parse_hhmm(&time_text)?,
            reason: input.reason.filter(|r| !r.trim().is_empty()),
        },
    )
    .await?;

    tracing::info!(
        appointment_id = created.id,
        parent_id = auth.user_id,
        therapist_id = input.therapist_id,
        date = %date,
        time = %time_text,
        "Appointment booked"
    );

    let detail = AppointmentRepo::find_detail(&state.pool, created.id)
        .await?
        .ok_or_else(|| AppError::InternalError("Booked appointment vanished".into()))?;
    Ok((StatusCode::CREATED, Json(detail)))
}

/// DELETE /parent/appointments/{id}
pub async fn cancel_appointment(
    RequireParent(auth): RequireParent,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<MessageResponse>> {
    if !AppointmentRepo::cancel_for_parent(&state.pool, id, auth.user_id).await? {
        return Err(AppError::Core(CoreError::Missing(
            "Appointment not found".into(),
        )));
    }
    tracing::info!(appointment_id = id, parent_id = auth.user_id, "Appointment cancelled");
    Ok(Json(MessageResponse::new("Appointment cancelled successfully")))
}
