//! HTTP-level integration tests for registration, login, token rotation
//! and account recovery.

mod common;

use axum::http::StatusCode;
use common::{body_json, get, get_auth, post_json, post_json_auth};
use cortexa_db::repositories::UserRepo;
use serde_json::json;
use sqlx::PgPool;

async fn register(app: axum::Router, email: &str, role: &str) -> axum::http::Response<axum::body::Body> {
    post_json(
        app,
        "/api/register",
        json!({ "email": email, "password": "password123", "role": role }),
    )
    .await
}

// ---------------------------------------------------------------------------
// Registration
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn parent_registration_is_approved_immediately(pool: PgPool) {
    let app = common::build_test_app(pool);
    let response = register(app, "Parent@Example.com", "parent").await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let json = body_json(response).await;
    assert!(json["token"].is_string());
    assert!(json["refreshToken"].is_string());
    assert_eq!(json["user"]["email"], "parent@example.com");
    assert_eq!(json["user"]["status"], "approved");
    assert!(json["user"].get("passwordHash").is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn therapist_registration_waits_for_approval(pool: PgPool) {
    let app = common::build_test_app(pool);
    let json = body_json(register(app.clone(), "t@example.com", "therapist").await).await;
    assert_eq!(json["user"]["status"], "pending");

    let token = json["token"].as_str().unwrap();
    let response = get_auth(app, "/api/therapist/slots", token).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_json(response).await["error"], "Therapist account pending approval");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn duplicate_email_conflicts(pool: PgPool) {
    let app = common::build_test_app(pool);
    assert_eq!(
        register(app.clone(), "dup@example.com", "parent").await.status(),
        StatusCode::CREATED
    );
    let response = register(app, "dup@example.com", "teacher").await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(response).await["code"], "CONFLICT");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn registration_validates_input(pool: PgPool) {
    let app = common::build_test_app(pool);
    let short = post_json(
        app.clone(),
        "/api/register",
        json!({ "email": "a@example.com", "password": "short", "role": "parent" }),
    )
    .await;
    assert_eq!(short.status(), StatusCode::BAD_REQUEST);

    let bad_role = register(app, "b@example.com", "superuser").await;
    assert_eq!(bad_role.status(), StatusCode::BAD_REQUEST);
}

// ---------------------------------------------------------------------------
// Login
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn login_checks_portal_role(pool: PgPool) {
    common::create_user(&pool, "teach@example.com", "teacher", "approved").await;
    let app = common::build_test_app(pool);

    let wrong_portal = post_json(
        app.clone(),
        "/api/auth/login",
        json!({ "email": "teach@example.com", "password": "password123", "role": "parent" }),
    )
    .await;
    assert_eq!(wrong_portal.status(), StatusCode::UNAUTHORIZED);

    let ok = post_json(
        app,
        "/api/auth/login",
        json!({ "email": "teach@example.com", "password": "password123", "role": "teacher" }),
    )
    .await;
    assert_eq!(ok.status(), StatusCode::OK);
    let json = body_json(ok).await;
    assert!(json["expiresIn"].is_number());
    assert_eq!(json["user"]["role"], "teacher");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn five_failures_lock_the_account(pool: PgPool) {
    common::create_user(&pool, "lock@example.com", "parent", "approved").await;
    let app = common::build_test_app(pool);

    for _ in 0..5 {
        let response = post_json(
            app.clone(),
            "/api/auth/login",
            json!({ "email": "lock@example.com", "password": "wrong-password" }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    let response = post_json(
        app,
        "/api/auth/login",
        json!({ "email": "lock@example.com", "password": "password123" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn lapsed_lock_needs_five_new_failures(pool: PgPool) {
    let user = common::create_user(&pool, "lapsed@example.com", "parent", "approved").await;
    for _ in 0..5 {
        UserRepo::increment_failed_login(&pool, user.id).await.unwrap();
    }
    UserRepo::lock_account(&pool, user.id, chrono::Utc::now() - chrono::Duration::minutes(1))
        .await
        .unwrap();
    let app = common::build_test_app(pool);

    let wrong = post_json(
        app.clone(),
        "/api/auth/login",
        json!({ "email": "lapsed@example.com", "password": "wrong-password" }),
    )
    .await;
    assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);

    let ok = post_json(
        app,
        "/api/auth/login",
        json!({ "email": "lapsed@example.com", "password": "password123" }),
    )
    .await;
    assert_eq!(ok.status(), StatusCode::OK);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn rejected_accounts_cannot_sign_in(pool: PgPool) {
    let user = common::create_user(&pool, "rej@example.com", "therapist", "pending").await;
    UserRepo::decide_therapist_request(&pool, user.id, "rejected", None)
        .await
        .unwrap();
    let app = common::build_test_app(pool);

    let response = post_json(
        app,
        "/api/auth/login",
        json!({ "email": "rej@example.com", "password": "password123" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn me_requires_a_token(pool: PgPool) {
    let user = common::create_user(&pool, "me@example.com", "parent", "approved").await;
    let app = common::build_test_app(pool);

    assert_eq!(get(app.clone(), "/api/user/me").await.status(), StatusCode::UNAUTHORIZED);

    let response = get_auth(app, "/api/user/me", &common::token_for(&user)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["id"], user.id);
}

// ---------------------------------------------------------------------------
// Token rotation
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn refresh_tokens_rotate_and_die_on_logout(pool: PgPool) {
    let app = common::build_test_app(pool);
    let first = body_json(register(app.clone(), "rot@example.com", "parent").await).await;
    let old = first["refreshToken"].as_str().unwrap().to_string();

    let response = post_json(app.clone(), "/api/auth/refresh", json!({ "refreshToken": old })).await;
    assert_eq!(response.status(), StatusCode::OK);
    let second = body_json(response).await;
    let rotated = second["refreshToken"].as_str().unwrap().to_string();
    assert_ne!(rotated, old);

    // The exchanged token is spent.
    let reused = post_json(app.clone(), "/api/auth/refresh", json!({ "refreshToken": old })).await;
    assert_eq!(reused.status(), StatusCode::UNAUTHORIZED);

    let token = second["token"].as_str().unwrap();
    let logout = post_json_auth(app.clone(), "/api/auth/logout", json!({}), token).await;
    assert_eq!(logout.status(), StatusCode::NO_CONTENT);

    let after = post_json(app, "/api/auth/refresh", json!({ "refreshToken": rotated })).await;
    assert_eq!(after.status(), StatusCode::UNAUTHORIZED);
}

// ---------------------------------------------------------------------------
// Password recovery
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn forget_password_does_not_reveal_accounts(pool: PgPool) {
    let user = common::create_user(&pool, "known@example.com", "parent", "approved").await;
    let app = common::build_test_app(pool.clone());

    let unknown = post_json(
        app.clone(),
        "/api/auth/forget-password",
        json!({ "email": "nobody@example.com" }),
    )
    .await;
    let known = post_json(
        app,
        "/api/auth/forget-password",
        json!({ "email": "known@example.com" }),
    )
    .await;
    assert_eq!(unknown.status(), StatusCode::OK);
    assert_eq!(known.status(), StatusCode::OK);
    assert_eq!(body_json(unknown).await, body_json(known).await);

    let issued: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM password_resets WHERE user_id = $1")
            .bind(user.id)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(issued, 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn wrong_otp_is_rejected(pool: PgPool) {
    common::create_user(&pool, "otp@example.com", "parent", "approved").await;
    let app = common::build_test_app(pool);

    post_json(
        app.clone(),
        "/api/auth/forget-password",
        json!({ "email": "otp@example.com" }),
    )
    .await;
    let response = post_json(
        app,
        "/api/auth/verify-otp",
        json!({ "email": "otp@example.com", "otp": "000000x" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ---------------------------------------------------------------------------
// Health and fallbacks
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn health_reports_database(pool: PgPool) {
    let app = common::build_test_app(pool);
    let response = get(app, "/api/health").await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["dbHealthy"], true);
    assert_eq!(json["storageHealthy"], true);
    assert_eq!(json["liveSessions"], 0);
    assert!(json["timestamp"].is_string());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn unknown_api_route_is_json_404(pool: PgPool) {
    let app = common::build_test_app(pool);
    let response = get(app, "/api/does-not-exist").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["code"], "NOT_FOUND");
}
