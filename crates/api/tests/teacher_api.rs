//! Integration tests for the teacher portal and screening submissions.

mod common;

use axum::http::StatusCode;
use common::{body_json, get_auth, post_json_auth};
use cortexa_db::repositories::PatientRepo;
use serde_json::json;
use sqlx::PgPool;

#[sqlx::test(migrations = "../../db/migrations")]
async fn teacher_registers_and_lists_students(pool: PgPool) {
    let teacher = common::create_user(&pool, "te@example.com", "teacher", "approved").await;
    let other = common::create_user(&pool, "te2@example.com", "teacher", "approved").await;
    let token = common::token_for(&teacher);
    let app = common::build_test_app(pool);

    let response = post_json_auth(
        app.clone(),
        "/api/teacher/students",
        json!({ "name": "  Ada  ", "age": 7, "grade": "2" }),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let student = body_json(response).await;
    assert_eq!(student["name"], "Ada");
    assert_eq!(student["teacherId"], teacher.id);
    assert!(student["patientCode"].as_str().is_some_and(|c| !c.is_empty()));
    let student_id = student["id"].as_i64().expect("student id");

    let response = get_auth(app.clone(), "/api/teacher/students", &token).await;
    assert_eq!(body_json(response).await.as_array().map(Vec::len), Some(1));

    let response = get_auth(
        app.clone(),
        &format!("/api/teacher/students/{student_id}"),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    // Another teacher's student is invisible.
    let response = get_auth(
        app,
        &format!("/api/teacher/students/{student_id}"),
        &common::token_for(&other),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["error"], "Student not found");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn student_input_is_validated(pool: PgPool) {
    let teacher = common::create_user(&pool, "te@example.com", "teacher", "approved").await;
    let parent = common::create_user(&pool, "pa@example.com", "parent", "approved").await;
    let token = common::token_for(&teacher);
    let app = common::build_test_app(pool);

    let response = post_json_auth(
        app.clone(),
        "/api/teacher/students",
        json!({ "name": "   " }),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = post_json_auth(
        app.clone(),
        "/api/teacher/students",
        json!({ "name": "Old", "age": 40 }),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = post_json_auth(
        app,
        "/api/teacher/students",
        json!({ "name": "Nope" }),
        &common::token_for(&parent),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn final_report_completes_student_progress(pool: PgPool) {
    let teacher = common::create_user(&pool, "te@example.com", "teacher", "approved").await;
    let token = common::token_for(&teacher);
    let app = common::build_test_app(pool.clone());

    let response = post_json_auth(
        app.clone(),
        "/api/teacher/students",
        json!({ "name": "Finn" }),
        &token,
    )
    .await;
    let student_id = body_json(response).await["id"].as_i64().expect("student id");

    let response = post_json_auth(
        app.clone(),
        "/api/teacher/reports",
        json!({ "studentId": student_id, "title": "Term 1", "status": "published" }),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = post_json_auth(
        app.clone(),
        "/api/teacher/reports",
        json!({ "studentId": student_id, "title": "Term 1 draft" }),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(body_json(response).await["status"], "draft");

    let patient = PatientRepo::find_by_id(&pool, student_id)
        .await
        .expect("lookup should succeed")
        .expect("student exists");
    assert_eq!(patient.report_status, "pending");

    let response = post_json_auth(
        app.clone(),
        "/api/teacher/reports",
        json!({
            "studentId": student_id,
            "title": "Term 1",
            "summary": "Settled well",
            "status": "final"
        }),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let patient = PatientRepo::find_by_id(&pool, student_id)
        .await
        .expect("lookup should succeed")
        .expect("student exists");
    assert_eq!(patient.report_status, "completed");

    let response = get_auth(
        app.clone(),
        &format!("/api/teacher/reports/student/{student_id}"),
        &token,
    )
    .await;
    assert_eq!(body_json(response).await.as_array().map(Vec::len), Some(2));

    let response = get_auth(app, "/api/teacher/reports", &token).await;
    assert_eq!(body_json(response).await.as_array().map(Vec::len), Some(2));
}

// ---------------------------------------------------------------------------
// Screenings
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn questionnaire_screening_needs_no_file(pool: PgPool) {
    let parent = common::create_user(&pool, "pa@example.com", "parent", "approved").await;
    let admin = common::create_user(&pool, "ad@example.com", "admin", "approved").await;
    let token = common::token_for(&parent);
    let child_id = common::create_child(&pool, Some(parent.id), "Lia").await;
    let app = common::build_test_app(pool.clone());

    let request = common::multipart_request(
        "/api/screenings",
        Some(&token),
        &[
            ("screeningType", "questionnaire"),
            ("patientId", &child_id.to_string()),
            ("result", "low_risk"),
        ],
        None,
    );
    let response = common::send(app.clone(), request).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let screening = body_json(response).await;
    assert_eq!(screening["screeningType"], "questionnaire");
    assert!(screening["filePath"].is_null());

    let patient = PatientRepo::find_by_id(&pool, child_id)
        .await
        .expect("lookup should succeed")
        .expect("child exists");
    assert_eq!(patient.screening_status, "completed");

    let response = get_auth(app.clone(), "/api/screenings", &token).await;
    assert_eq!(body_json(response).await.as_array().map(Vec::len), Some(1));

    let response = get_auth(app.clone(), "/api/admin/screenings", &token).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = get_auth(app, "/api/admin/screenings", &common::token_for(&admin)).await;
    assert_eq!(body_json(response).await.as_array().map(Vec::len), Some(1));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn facial_screening_requires_and_stores_file(pool: PgPool) {
    let parent = common::create_user(&pool, "pa@example.com", "parent", "approved").await;
    let token = common::token_for(&parent);
    let app = common::build_test_app(pool);

    let request = common::multipart_request(
        "/api/screenings",
        Some(&token),
        &[("screeningType", "facial")],
        None,
    );
    let response = common::send(app.clone(), request).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let request = common::multipart_request(
        "/api/screenings",
        Some(&token),
        &[("screeningType", "facial"), ("childName", "Guest child")],
        Some(("file", "face.jpg", "image/jpeg", b"jpeg-bytes")),
    );
    let response = common::send(app.clone(), request).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let screening = body_json(response).await;
    assert!(screening["filePath"]
        .as_str()
        .is_some_and(|p| p.starts_with("/uploads/") && p.ends_with(".jpg")));

    let request = common::multipart_request(
        "/api/screenings",
        Some(&token),
        &[("screeningType", "gaze"), ("patientId", "999999")],
        None,
    );
    let response = common::send(app, request).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
