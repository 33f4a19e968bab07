//! Handlers for the teacher portal (`/teacher`): registered students and
//! their progress reports.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use cortexa_core::error::CoreError;
use cortexa_core::patient_code::generate_patient_code;
use cortexa_core::statuses::report;
use cortexa_core::types::DbId;
use cortexa_db::models::patient::{CreatePatient, Patient};
use cortexa_db::models::report::{CreateReport, Report};
use cortexa_db::repositories::{PatientRepo, ReportRepo};
use serde::Deserialize;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::middleware::rbac::RequireTeacher;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateStudentRequest {
    #[validate(length(min = 1, message = "Student name is required"))]
    pub name: String,
    #[validate(range(min = 0, max = 25, message = "Age must be between 0 and 25"))]
    pub age: Option<i32>,
    pub gender: Option<String>,
    pub grade: Option<String>,
    pub medical_history: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateReportRequest {
    #[serde(alias = "studentId")]
    pub patient_id: DbId,
    #[validate(length(min = 1, message = "Report title is required"))]
    pub title: String,
    pub author: Option<String>,
    pub period: Option<String>,
    pub summary: Option<String>,
    pub strengths: Option<String>,
    pub recommendations: Option<String>,
    pub status: Option<String>,
}

fn student_not_found() -> AppError {
    AppError::Core(CoreError::Missing("Student not found".into()))
}

/// The student, if it was registered by `teacher_id`.
async fn own_student(state: &AppState, id: DbId, teacher_id: DbId) -> AppResult<Patient> {
    PatientRepo::find_by_id(&state.pool, id)
        .await?
        .filter(|p| p.teacher_id == Some(teacher_id))
        .ok_or_else(student_not_found)
}

// ---------------------------------------------------------------------------
// Students
// ---------------------------------------------------------------------------

/// GET /teacher/students
pub async fn list_students(
    RequireTeacher(auth): RequireTeacher,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<Patient>>> {
    Ok(Json(PatientRepo::list_by_teacher(&state.pool, auth.user_id).await?))
}

/// POST /teacher/students
pub async fn create_student(
    RequireTeacher(auth): RequireTeacher,
    State(state): State<AppState>,
    Json(input): Json<CreateStudentRequest>,
) -> AppResult<(StatusCode, Json<Patient>)> {
    input.validate()?;
    let name = input.name.trim().to_string();
    if name.is_empty() {
        return Err(AppError::BadRequest("Student name is required".into()));
    }

    let student = PatientRepo::create(
        &state.pool,
        &CreatePatient {
            patient_code: generate_patient_code(),
            name,
            age: input.age,
            gender: input.gender,
            grade: input.grade,
            medical_history: input.medical_history,
            parent_id: None,
            teacher_id: Some(auth.user_id),
        },
    )
    .await?;

    tracing::info!(teacher_id = auth.user_id, patient_id = student.id, "Student registered");
    Ok((StatusCode::CREATED, Json(student)))
}

/// GET /teacher/students/{id}
pub async fn get_student(
    RequireTeacher(auth): RequireTeacher,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<Patient>> {
    Ok(Json(own_student(&state, id, auth.user_id).await?))
}

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

/// GET /teacher/reports
pub async fn list_reports(
    RequireTeacher(auth): RequireTeacher,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<Report>>> {
    Ok(Json(ReportRepo::list_by_teacher(&state.pool, auth.user_id).await?))
}

/// POST /teacher/reports
///
/// A report created as `final` completes the student's report status.
pub async fn create_report(
    RequireTeacher(auth): RequireTeacher,
    State(state): State<AppState>,
    Json(input): Json<CreateReportRequest>,
) -> AppResult<(StatusCode, Json<Report>)> {
    input.validate()?;
    let status = input.status.as_deref().unwrap_or(report::DRAFT);
    if status != report::DRAFT && status != report::FINAL {
        return Err(AppError::BadRequest(format!("Invalid report status '{status}'")));
    }
    own_student(&state, input.patient_id, auth.user_id).await?;

    let created = ReportRepo::create(
        &state.pool,
        &CreateReport {
            teacher_id: auth.user_id,
            patient_id: input.patient_id,
            title: input.title.trim().to_string(),
            author: input.author,
            period: input.period,
            summary: input.summary,
            strengths: input.strengths,
            recommendations: input.recommendations,
            status: status.to_string(),
        },
    )
    .await?;

    if created.status == report::FINAL {
        PatientRepo::mark_report_completed(&state.pool, created.patient_id).await?;
    }

    tracing::info!(
        report_id = created.id,
        patient_id = created.patient_id,
        status = %created.status,
        "Report created"
    );
    Ok((StatusCode::CREATED, Json(created)))
}

/// GET /teacher/reports/student/{id}
pub async fn reports_for_student(
    RequireTeacher(auth): RequireTeacher,
    State(state): State<AppState>,
    Path(student_id): Path<DbId>,
) -> AppResult<Json<Vec<Report>>> {
    own_student(&state, student_id, auth.user_id).await?;
    Ok(Json(
        ReportRepo::list_for_student(&state.pool, auth.user_id, student_id).await?,
    ))
}
