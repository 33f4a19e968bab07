//! Integration tests for the parent portal's child records.

mod common;

use axum::http::StatusCode;
use common::{body_json, delete_auth, get_auth, post_json_auth, put_json_auth};
use serde_json::json;
use sqlx::PgPool;

#[sqlx::test(migrations = "../../db/migrations")]
async fn parent_manages_own_children(pool: PgPool) {
    let parent = common::create_user(&pool, "pa@example.com", "parent", "approved").await;
    let token = common::token_for(&parent);
    let app = common::build_test_app(pool);

    let response = post_json_auth(
        app.clone(),
        "/api/parent/children",
        json!({ "name": "Theo", "age": 5, "gender": "male", "medicalHistory": "None" }),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let child = body_json(response).await;
    assert_eq!(child["parentId"], parent.id);
    assert_eq!(child["screeningStatus"], "pending");
    assert_eq!(child["reportStatus"], "pending");
    let child_id = child["id"].as_i64().expect("child id");

    let uri = format!("/api/parent/children/{child_id}");
    let response = put_json_auth(app.clone(), &uri, json!({ "grade": "K" }), &token).await;
    assert_eq!(response.status(), StatusCode::OK);
    let updated = body_json(response).await;
    assert_eq!(updated["grade"], "K");
    assert_eq!(updated["name"], "Theo");

    let response = get_auth(app.clone(), "/api/parent/children", &token).await;
    assert_eq!(body_json(response).await.as_array().map(Vec::len), Some(1));

    let response = delete_auth(app.clone(), &uri, &token).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["message"], "Child deleted successfully");

    let response = get_auth(app, &uri, &token).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn children_are_scoped_to_their_parent(pool: PgPool) {
    let owner = common::create_user(&pool, "own@example.com", "parent", "approved").await;
    let stranger = common::create_user(&pool, "str@example.com", "parent", "approved").await;
    let child_id = common::create_child(&pool, Some(owner.id), "Nia").await;
    let token = common::token_for(&stranger);
    let app = common::build_test_app(pool);

    let uri = format!("/api/parent/children/{child_id}");
    let response = get_auth(app.clone(), &uri, &token).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["error"], "Child not found");

    let response = put_json_auth(app.clone(), &uri, json!({ "name": "Taken" }), &token).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = delete_auth(app, &uri, &token).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn child_fields_are_validated(pool: PgPool) {
    let parent = common::create_user(&pool, "pa@example.com", "parent", "approved").await;
    let token = common::token_for(&parent);
    let app = common::build_test_app(pool);

    let response = post_json_auth(
        app.clone(),
        "/api/parent/children",
        json!({ "name": "", "age": 5, "gender": "female" }),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = post_json_auth(
        app,
        "/api/parent/children",
        json!({ "name": "Ro", "age": 30, "gender": "female" }),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn parent_sees_only_bookable_therapists(pool: PgPool) {
    let parent = common::create_user(&pool, "pa@example.com", "parent", "approved").await;
    common::create_user(&pool, "ok@example.com", "therapist", "approved").await;
    common::create_user(&pool, "wait@example.com", "therapist", "pending").await;
    let app = common::build_test_app(pool);

    let response = get_auth(app.clone(), "/api/parent/therapists", &common::token_for(&parent)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let listings = body_json(response).await;
    assert_eq!(listings.as_array().map(Vec::len), Some(1));
    assert_eq!(listings[0]["email"], "ok@example.com");

    let response = get_auth(app, "/api/parent/profile", &common::token_for(&parent)).await;
    assert_eq!(body_json(response).await["email"], "pa@example.com");
}
