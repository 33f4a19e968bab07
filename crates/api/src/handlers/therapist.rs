//! Handlers for the therapist portal (`/therapist`).
//!
//! Every route requires an approved, active therapist. Appointment responses
//! use the dashboard view ([`AppointmentView`]) rather than raw rows.

use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::{Local, NaiveDate};
use cortexa_core::error::CoreError;
use cortexa_core::scheduling::{
    self, free_slots, SlotWindow, TimeSlot, SESSION_BILLING_AMOUNT, SESSION_DURATION_MINS,
};
use cortexa_core::statuses::{appointment, slot_mode};
use cortexa_core::types::DbId;
use cortexa_db::models::appointment::AppointmentDetail;
use cortexa_db::models::patient::PatientWithContacts;
use cortexa_db::models::slot::{CreateSlot, TherapistSlot};
use cortexa_db::models::user::UserResponse;
use cortexa_db::repositories::{AppointmentRepo, PatientRepo, SlotRepo, UserRepo};
use cortexa_db::DbPool;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::middleware::rbac::RequireTherapist;
use crate::response::{MessageResponse, SuccessResponse};
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSlotRequest {
    pub date: String,
    pub start_time: String,
    pub end_time: String,
    pub interval_minutes: i32,
    #[serde(default)]
    pub break_time_minutes: i32,
    pub mode: String,
    pub hospital_clinic_name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityQuery {
    pub therapist_id: Option<DbId>,
    pub date: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RescheduleRequest {
    pub date: String,
    pub time: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteSessionRequest {
    pub appointment_id: DbId,
    #[serde(alias = "clinicalNotes")]
    pub notes: Option<String>,
}

/// Appointment as shown on the therapist dashboard.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentView {
    pub id: DbId,
    pub client_id: DbId,
    pub client_name: String,
    pub parent_name: String,
    pub date: NaiveDate,
    pub time: String,
    pub duration: i32,
    #[serde(rename = "type")]
    pub appointment_type: String,
    pub status: &'static str,
    pub notes: String,
    pub billing_amount: i32,
}

impl From<AppointmentDetail> for AppointmentView {
    fn from(detail: AppointmentDetail) -> Self {
        let a = detail.appointment;
        Self {
            id: a.id,
            client_id: a.child_id,
            client_name: detail.child_name.unwrap_or_default(),
            parent_name: detail.parent_name.unwrap_or_default(),
            date: a.appointment_date,
            time: scheduling::format_time(a.appointment_time),
            duration: SESSION_DURATION_MINS,
            appointment_type: a.appointment_type,
            status: appointment::display_label(&a.status),
            notes: a.notes.or(a.reason).unwrap_or_default(),
            billing_amount: SESSION_BILLING_AMOUNT,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotSummary {
    pub id: DbId,
    pub date: NaiveDate,
    pub mode: String,
    pub hospital_clinic_name: Option<String>,
}

/// Generated slots for one therapist on one date.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Availability {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slot: Option<SlotSummary>,
    pub available_slots: Vec<TimeSlot>,
}

#[derive(Debug, Serialize)]
pub struct CompletedSession {
    pub message: &'static str,
    pub appointment: AppointmentView,
}

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

/// Resolve the availability query into a therapist id and a date.
pub(crate) fn availability_params(query: &AvailabilityQuery) -> AppResult<(DbId, NaiveDate)> {
    match (query.therapist_id, query.date.as_deref()) {
        (Some(therapist_id), Some(date)) => Ok((therapist_id, scheduling::parse_date(date)?)),
        _ => Err(AppError::BadRequest(
            "Therapist ID and date are required".into(),
        )),
    }
}

/// Build the slot list for a therapist's active window on `date`.
///
/// With `exclude_booked`, times already held by a non-cancelled appointment
/// are removed.
pub(crate) async fn slot_availability(
    pool: &DbPool,
    therapist_id: DbId,
    date: NaiveDate,
    exclude_booked: bool,
) -> AppResult<Availability> {
    let Some(slot) = SlotRepo::find_active_for_date(pool, therapist_id, date).await? else {
        return Ok(Availability {
            slot: None,
            available_slots: Vec::new(),
        });
    };

    let mut available = slot.time_slots();
    if exclude_booked {
        let booked: Vec<String> = AppointmentRepo::booked_times(pool, therapist_id, date)
            .await?
            .into_iter()
            .map(scheduling::format_time)
            .collect();
        available = free_slots(available, &booked);
    }

    Ok(Availability {
        slot: Some(SlotSummary {
            id: slot.id,
            date: slot.slot_date,
            mode: slot.mode,
            hospital_clinic_name: slot.hospital_clinic_name,
        }),
        available_slots: available,
    })
}

async fn appointment_view(pool: &DbPool, id: DbId) -> AppResult<AppointmentView> {
    AppointmentRepo::find_detail(pool, id)
        .await?
        .map(AppointmentView::from)
        .ok_or_else(appointment_not_found)
}

fn appointment_not_found() -> AppError {
    AppError::Core(CoreError::Missing("Appointment not found".into()))
}

// ---------------------------------------------------------------------------
// Profile and clients
// ---------------------------------------------------------------------------

/// GET /therapist/profile
pub async fn profile(
    RequireTherapist(auth): RequireTherapist,
    State(state): State<AppState>,
) -> AppResult<Json<UserResponse>> {
    let user = UserRepo::find_by_id(&state.pool, auth.user_id)
        .await?
        .ok_or_else(|| AppError::Core(CoreError::Missing("Therapist not found".into())))?;
    Ok(Json(UserResponse::from(&user)))
}

/// GET /therapist/clients
///
/// Patients an admin has assigned to the caller.
pub async fn clients(
    RequireTherapist(auth): RequireTherapist,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<PatientWithContacts>>> {
    let patients = PatientRepo::list_by_therapist(&state.pool, auth.user_id).await?;
    Ok(Json(patients))
}

// ---------------------------------------------------------------------------
// Slots
// ---------------------------------------------------------------------------

/// GET /therapist/slots
pub async fn list_slots(
    RequireTherapist(auth): RequireTherapist,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<TherapistSlot>>> {
    let slots = SlotRepo::list_by_therapist(&state.pool, auth.user_id).await?;
    Ok(Json(slots))
}

/// POST /therapist/slots
///
/// One active window per date; in-person windows need a clinic name.
pub async fn create_slot(
    RequireTherapist(auth): RequireTherapist,
    State(state): State<AppState>,
    Json(input): Json<CreateSlotRequest>,
) -> AppResult<(axum::http::StatusCode, Json<TherapistSlot>)> {
    let slot_date = scheduling::parse_date(&input.date)?;
    scheduling::validate_slot_date(slot_date, Local::now().date_naive())?;
    let window = SlotWindow::parse(
        &input.start_time,
        &input.end_time,
        input.interval_minutes,
        input.break_time_minutes,
    )?;

    if !slot_mode::is_valid(&input.mode) {
        return Err(AppError::BadRequest(
            "Mode must be 'In-person' or 'Online'".into(),
        ));
    }
    let clinic = input
        .hospital_clinic_name
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty());
    if input.mode == slot_mode::IN_PERSON && clinic.is_none() {
        return Err(AppError::BadRequest(
            "Hospital/Clinic name is required for in-person appointments".into(),
        ));
    }

    if SlotRepo::find_active_for_date(&state.pool, auth.user_id, slot_date)
        .await?
        .is_some()
    {
        return Err(AppError::BadRequest(
            "A slot already exists for this date".into(),
        ));
    }

    let slot = SlotRepo::create(
        &state.pool,
        &CreateSlot {
            therapist_id: auth.user_id,
            slot_date,
            window,
            mode: input.mode,
            hospital_clinic_name: clinic,
        },
    )
    .await?;

    tracing::info!(
        therapist_id = auth.user_id,
        slot_id = slot.id,
        date = %slot.slot_date,
        "Availability window created"
    );
    Ok((axum::http::StatusCode::CREATED, Json(slot)))
}

/// DELETE /therapist/slots/{id}
pub async fn delete_slot(
    RequireTherapist(auth): RequireTherapist,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<MessageResponse>> {
    if !SlotRepo::delete_for_therapist(&state.pool, id, auth.user_id).await? {
        return Err(AppError::Core(CoreError::Missing("Slot not found".into())));
    }
    Ok(Json(MessageResponse::new("Slot deleted successfully")))
}

/// GET /therapist/slots/available?therapistId&date
pub async fn available_slots(
    RequireTherapist(_auth): RequireTherapist,
    State(state): State<AppState>,
    Query(query): Query<AvailabilityQuery>,
) -> AppResult<Json<Availability>> {
    let (therapist_id, date) = availability_params(&query)?;
    let availability = slot_availability(&state.pool, therapist_id, date, false).await?;
    Ok(Json(availability))
}

// ---------------------------------------------------------------------------
// Appointments
// ---------------------------------------------------------------------------

/// GET /therapist/appointments
pub async fn appointments(
    RequireTherapist(auth): RequireTherapist,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<AppointmentView>>> {
    let rows = AppointmentRepo::list_for_therapist(&state.pool, auth.user_id, None).await?;
    Ok(Json(rows.into_iter().map(AppointmentView::from).collect()))
}

/// GET /therapist/appointments/today
pub async fn appointments_today(
    RequireTherapist(auth): RequireTherapist,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<AppointmentView>>> {
    let today = Local::now().date_naive();
    let rows = AppointmentRepo::list_for_therapist(&state.pool, auth.user_id, Some(today)).await?;
    Ok(Json(rows.into_iter().map(AppointmentView::from).collect()))
}

/// PUT /therapist/appointments/{id}/confirm
pub async fn confirm_appointment(
    RequireTherapist(auth): RequireTherapist,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<AppointmentView>> {
    AppointmentRepo::set_status_for_therapist(&state.pool, id, auth.user_id, appointment::CONFIRMED)
        .await?
        .ok_or_else(appointment_not_found)?;
    tracing::info!(appointment_id = id, therapist_id = auth.user_id, "Appointment confirmed");
    Ok(Json(appointment_view(&state.pool, id).await?))
}

/// PUT /therapist/appointments/{id}/reschedule
///
/// Accepts `HH:MM` or `H:MM AM/PM`; the appointment returns to `pending`.
pub async fn reschedule_appointment(
    RequireTherapist(auth): RequireTherapist,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<RescheduleRequest>,
) -> AppResult<Json<AppointmentView>> {
    let date = scheduling::parse_date(&input.date)?;
    let time = scheduling::parse_hhmm(&scheduling::normalize_appointment_time(&input.time)?)?;

    AppointmentRepo::reschedule(&state.pool, id, auth.user_id, date, time)
        .await?
        .ok_or_else(appointment_not_found)?;
    tracing::info!(
        appointment_id = id,
        therapist_id = auth.user_id,
        date = %date,
        time = %time,
        "Appointment rescheduled"
    );
    Ok(Json(appointment_view(&state.pool, id).await?))
}

/// POST /therapist/appointments/complete-session
pub async fn complete_session(
    RequireTherapist(auth): RequireTherapist,
    State(state): State<AppState>,
    Json(input): Json<CompleteSessionRequest>,
) -> AppResult<Json<SuccessResponse<CompletedSession>>> {
    let notes = input.notes.as_deref().map(str::trim).filter(|n| !n.is_empty());
    AppointmentRepo::complete(&state.pool, input.appointment_id, auth.user_id, notes)
        .await?
        .ok_or_else(appointment_not_found)?;

    let view = appointment_view(&state.pool, input.appointment_id).await?;
    Ok(Json(SuccessResponse::new(CompletedSession {
        message: "Session completed successfully",
        appointment: view,
    })))
}
