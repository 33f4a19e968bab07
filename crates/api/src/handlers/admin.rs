//! Handlers for the admin dashboard (`/admin`).
//!
//! Every handler requires the `admin` role. Therapist approval decisions
//! publish events that the notifier turns into e-mails.

use axum::extract::{Path, State};
use axum::Json;
use chrono::{Datelike, Duration, TimeZone, Utc};
use cortexa_core::error::CoreError;
use cortexa_core::statuses::account;
use cortexa_core::trends::{self, MonthCount};
use cortexa_core::types::{DbId, Timestamp};
use cortexa_db::models::patient::{Patient, PatientWithContacts};
use cortexa_db::models::report::Report;
use cortexa_db::models::screening::Screening;
use cortexa_db::models::user::UserResponse;
use cortexa_db::repositories::{PatientRepo, ReportRepo, ScreeningRepo, UserRepo};
use cortexa_events::AccountEvent;
use futures::{stream, StreamExt, TryStreamExt};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::middleware::rbac::RequireAdmin;
use crate::response::SuccessResponse;
use crate::state::AppState;

/// Children returned by the unfiltered children-data listing.
const CHILDREN_DATA_LIMIT: i64 = 100;

/// Children whose latest records are looked up at once. Each lookup holds
/// up to two pool connections.
const CHILD_LOOKUP_CONCURRENCY: usize = 4;

/// Pending requests shown in the notification dropdown.
const RECENT_REQUESTS_LIMIT: i64 = 5;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct Data<T: Serialize> {
    pub data: T,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardMetrics {
    pub pending_approvals: i64,
    pub total_active_users: i64,
    pub screenings_this_month: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyStats {
    pub pending_count: i64,
    pub user_count: i64,
    pub screening_count: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notifications {
    pub pending_therapists: i64,
    pub recent_registrations: i64,
    pub pending_screenings: i64,
    pub pending_reports: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChildData {
    #[serde(flatten)]
    pub child: PatientWithContacts,
    pub screening_data: Option<Screening>,
    pub report_data: Option<Report>,
}

#[derive(Debug, Serialize)]
pub struct TherapistOption {
    pub id: DbId,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct DecisionRequest {
    pub reason: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DecisionResponse {
    pub message: &'static str,
    pub user: UserResponse,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignTherapistRequest {
    pub therapist_id: Option<DbId>,
}

#[derive(Debug, Serialize)]
pub struct PatientChange {
    pub message: String,
    pub patient: Patient,
}

fn start_of_month(now: Timestamp) -> Timestamp {
    Utc.with_ymd_and_hms(now.year(), now.month(), 1, 0, 0, 0)
        .single()
        .unwrap_or(now)
}

fn patient_not_found() -> AppError {
    AppError::Core(CoreError::Missing("Patient not found".into()))
}

// ---------------------------------------------------------------------------
// Dashboard counters
// ---------------------------------------------------------------------------

/// GET /admin/metrics
pub async fn metrics(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
) -> AppResult<Json<SuccessResponse<Data<DashboardMetrics>>>> {
    let since = start_of_month(Utc::now());
    let data = DashboardMetrics {
        pending_approvals: UserRepo::count_pending_therapists(&state.pool).await?,
        total_active_users: UserRepo::count_active(&state.pool).await?,
        screenings_this_month: ScreeningRepo::count_since(&state.pool, since).await?,
    };
    Ok(Json(SuccessResponse::new(Data { data })))
}

/// GET /admin/stats
pub async fn stats(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
) -> AppResult<Json<LegacyStats>> {
    let since = start_of_month(Utc::now());
    Ok(Json(LegacyStats {
        pending_count: UserRepo::count_pending_therapists(&state.pool).await?,
        user_count: UserRepo::count_active(&state.pool).await?,
        screening_count: ScreeningRepo::count_since(&state.pool, since).await?,
    }))
}

/// GET /admin/screening-trends
pub async fn screening_trends(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
) -> AppResult<Json<SuccessResponse<Data<Vec<MonthCount>>>>> {
    let buckets = trends::term_buckets(trends::current_term_year(Utc::now()));
    let (Some(first), Some(last)) = (buckets.first(), buckets.last()) else {
        return Ok(Json(SuccessResponse::new(Data { data: Vec::new() })));
    };
    let created = ScreeningRepo::created_between(&state.pool, first.start, last.end).await?;
    Ok(Json(SuccessResponse::new(Data {
        data: trends::count_by_month(&buckets, &created),
    })))
}

/// GET /admin/notifications
pub async fn notifications(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
) -> AppResult<Json<Notifications>> {
    let (pending_screenings, pending_reports) = PatientRepo::count_pending_work(&state.pool).await?;
    Ok(Json(Notifications {
        pending_therapists: UserRepo::count_pending_therapists(&state.pool).await?,
        recent_registrations: PatientRepo::count_created_since(
            &state.pool,
            Utc::now() - Duration::hours(24),
        )
        .await?,
        pending_screenings,
        pending_reports,
    }))
}

// ---------------------------------------------------------------------------
// Therapist requests
// ---------------------------------------------------------------------------

/// GET /admin/therapist-requests
pub async fn therapist_requests(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<UserResponse>>> {
    let users = UserRepo::list_therapists_by_status(&state.pool, account::PENDING, None).await?;
    Ok(Json(users.iter().map(UserResponse::from).collect()))
}

/// GET /admin/recent-therapist-requests
pub async fn recent_therapist_requests(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<UserResponse>>> {
    let users = UserRepo::list_therapists_by_status(
        &state.pool,
        account::PENDING,
        Some(RECENT_REQUESTS_LIMIT),
    )
    .await?;
    Ok(Json(users.iter().map(UserResponse::from).collect()))
}

/// Apply an approval decision to a pending therapist and publish the
/// matching event.
async fn decide(
    state: &AppState,
    admin_id: DbId,
    user_id: DbId,
    status: &'static str,
    reason: Option<String>,
) -> AppResult<UserResponse> {
    UserRepo::find_by_id(&state.pool, user_id)
        .await?
        .ok_or_else(|| AppError::Core(CoreError::Missing("User not found".into())))?;

    let reason = reason.filter(|r| !r.trim().is_empty());
    let user = UserRepo::decide_therapist_request(&state.pool, user_id, status, reason.as_deref())
        .await?
        .ok_or_else(|| AppError::BadRequest("Invalid therapist request".into()))?;

    let event = if status == account::APPROVED {
        AccountEvent::TherapistApproved {
            user_id: user.id,
            email: user.email.clone(),
        }
    } else {
        AccountEvent::TherapistRejected {
            user_id: user.id,
            email: user.email.clone(),
            reason,
        }
    };
    state.event_bus.publish(event, Some(admin_id));
    tracing::info!(user_id = user.id, admin_id, status, "Therapist request decided");
    Ok(UserResponse::from(&user))
}

/// PUT /admin/therapist-requests/{id}/approve
pub async fn approve_therapist(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DecisionResponse>> {
    let user = decide(&state, admin.user_id, id, account::APPROVED, None).await?;
    Ok(Json(DecisionResponse {
        message: "Therapist approved successfully",
        user,
    }))
}

/// PUT /admin/therapist-requests/{id}/reject
pub async fn reject_therapist(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    body: Option<Json<DecisionRequest>>,
) -> AppResult<Json<DecisionResponse>> {
    let Json(input) = body.unwrap_or_default();
    let user = decide(&state, admin.user_id, id, account::REJECTED, input.reason).await?;
    Ok(Json(DecisionResponse {
        message: "Therapist rejected successfully",
        user,
    }))
}

// ---------------------------------------------------------------------------
// Children and therapist assignment
// ---------------------------------------------------------------------------

/// Attach each child's latest screening and report. Lookups run a few at a
/// time and results keep the listing order.
async fn with_latest_records(
    state: &AppState,
    children: Vec<PatientWithContacts>,
) -> AppResult<Vec<ChildData>> {
    let lookups = children.into_iter().map(|child| async move {
        let id = child.patient.id;
        let (screening_data, report_data) = tokio::try_join!(
            ScreeningRepo::latest_for_patient(&state.pool, id),
            ReportRepo::latest_for_patient(&state.pool, id),
        )?;
        Ok::<_, AppError>(ChildData {
            child,
            screening_data,
            report_data,
        })
    });
    stream::iter(lookups)
        .buffered(CHILD_LOOKUP_CONCURRENCY)
        .try_collect()
        .await
}

/// GET /admin/children-data
pub async fn children_data(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<ChildData>>> {
    let children =
        PatientRepo::list_with_contacts(&state.pool, None, Some(CHILDREN_DATA_LIMIT)).await?;
    Ok(Json(with_latest_records(&state, children).await?))
}

/// GET /admin/children-data/{parentId}
pub async fn children_data_for_parent(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path(parent_id): Path<DbId>,
) -> AppResult<Json<Vec<ChildData>>> {
    let children = PatientRepo::list_with_contacts(&state.pool, Some(parent_id), None).await?;
    Ok(Json(with_latest_records(&state, children).await?))
}

/// GET /admin/therapists
pub async fn therapists(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<TherapistOption>>> {
    let users = UserRepo::list_bookable_therapists(&state.pool).await?;
    Ok(Json(
        users
            .iter()
            .map(|u| TherapistOption {
                id: u.id,
                name: u.display_name(),
                email: u.email.clone(),
            })
            .collect(),
    ))
}

/// PUT /admin/children/{id}/assign-therapist
pub async fn assign_therapist(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(child_id): Path<DbId>,
    Json(input): Json<AssignTherapistRequest>,
) -> AppResult<Json<SuccessResponse<PatientChange>>> {
    let therapist_id = input
        .therapist_id
        .ok_or_else(|| AppError::BadRequest("Therapist ID is required".into()))?;
    PatientRepo::find_by_id(&state.pool, child_id)
        .await?
        .ok_or_else(patient_not_found)?;
    let therapist = UserRepo::find_bookable_therapist(&state.pool, therapist_id)
        .await?
        .ok_or_else(|| {
            AppError::Core(CoreError::Missing("Therapist not found or inactive".into()))
        })?;

    let patient = PatientRepo::set_therapist(&state.pool, child_id, Some(therapist.id))
        .await?
        .ok_or_else(patient_not_found)?;

    tracing::info!(
        patient_id = child_id,
        therapist_id,
        admin_id = admin.user_id,
        "Therapist assigned"
    );
    Ok(Json(SuccessResponse::new(PatientChange {
        message: format!("Patient assigned to therapist {}", therapist.display_name()),
        patient,
    })))
}

/// PUT /admin/children/{id}/unassign-therapist
pub async fn unassign_therapist(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(child_id): Path<DbId>,
) -> AppResult<Json<SuccessResponse<PatientChange>>> {
    let patient = PatientRepo::set_therapist(&state.pool, child_id, None)
        .await?
        .ok_or_else(patient_not_found)?;
    tracing::info!(patient_id = child_id, admin_id = admin.user_id, "Therapist unassigned");
    Ok(Json(SuccessResponse::new(PatientChange {
        message: "Therapist unassigned from patient".to_string(),
        patient,
    })))
}

/// GET /admin/users
pub async fn users(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<UserResponse>>> {
    let users = UserRepo::list(&state.pool).await?;
    Ok(Json(users.iter().map(UserResponse::from).collect()))
}
