//! Integration tests for speech-therapy recordings and evaluation.

mod common;

use axum::body::Body;
use axum::http::header::{ACCEPT_RANGES, AUTHORIZATION, CONTENT_RANGE, CONTENT_TYPE, RANGE};
use axum::http::{Request, StatusCode};
use common::{body_bytes, body_json, delete_auth, get_auth, put_json_auth};
use serde_json::json;
use sqlx::PgPool;

const AUDIO: &[u8] = b"0123456789abcdefghij";

struct Speech {
    app: axum::Router,
    parent: String,
    teacher: String,
    child_id: i64,
}

async fn speech(pool: PgPool) -> Speech {
    let parent = common::create_user(&pool, "pa@example.com", "parent", "approved").await;
    let teacher = common::create_user(&pool, "te@example.com", "teacher", "approved").await;
    let child_id = common::create_child(&pool, Some(parent.id), "Ben").await;
    Speech {
        app: common::build_test_app(pool),
        parent: common::token_for(&parent),
        teacher: common::token_for(&teacher),
        child_id,
    }
}

async fn upload(s: &Speech, prompt: &str) -> serde_json::Value {
    let request = common::multipart_request(
        "/api/speech-therapy/upload",
        Some(&s.parent),
        &[("childId", &s.child_id.to_string()), ("practicePrompt", prompt)],
        Some(("audio", "take.webm", "audio/webm", AUDIO)),
    );
    let response = common::send(s.app.clone(), request).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await
}

fn audio_request(id: i64, token: &str, range: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .uri(format!("/api/speech-therapy/audio/{id}"))
        .header(AUTHORIZATION, format!("Bearer {token}"));
    if let Some(range) = range {
        builder = builder.header(RANGE, range);
    }
    builder.body(Body::empty()).expect("request should build")
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn upload_numbers_sessions_per_child(pool: PgPool) {
    let s = speech(pool).await;

    let first = upload(&s, "Say 'ball'").await;
    assert_eq!(first["message"], "Speech recording uploaded successfully");
    assert_eq!(first["session"]["sessionNumber"], 1);
    assert_eq!(first["session"]["status"], "pending");
    assert_eq!(first["session"]["rating"], "Not Rated");

    let second = upload(&s, "Say 'cat'").await;
    assert_eq!(second["session"]["sessionNumber"], 2);

    let response = get_auth(
        s.app.clone(),
        &format!("/api/speech-therapy/child/{}", s.child_id),
        &s.parent,
    )
    .await;
    assert_eq!(body_json(response).await.as_array().map(Vec::len), Some(2));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn upload_validates_file_and_child(pool: PgPool) {
    let s = speech(pool).await;

    let request = common::multipart_request(
        "/api/speech-therapy/upload",
        Some(&s.parent),
        &[("childId", &s.child_id.to_string())],
        Some(("audio", "notes.txt", "text/plain", b"text")),
    );
    let response = common::send(s.app.clone(), request).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let request = common::multipart_request(
        "/api/speech-therapy/upload",
        Some(&s.parent),
        &[("childId", &s.child_id.to_string())],
        None,
    );
    let response = common::send(s.app.clone(), request).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "No audio file uploaded");

    let request = common::multipart_request(
        "/api/speech-therapy/upload",
        Some(&s.parent),
        &[],
        Some(("audio", "take.mp3", "audio/mpeg", AUDIO)),
    );
    let response = common::send(s.app.clone(), request).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "Child ID is required");

    let request = common::multipart_request(
        "/api/speech-therapy/upload",
        Some(&s.parent),
        &[("childId", "999999")],
        Some(("audio", "take.mp3", "audio/mpeg", AUDIO)),
    );
    let response = common::send(s.app.clone(), request).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["error"], "Child not found");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn evaluation_is_for_clinicians(pool: PgPool) {
    let s = speech(pool).await;
    let id = upload(&s, "Say 'sun'").await["session"]["id"]
        .as_i64()
        .expect("session id");

    let response = get_auth(s.app.clone(), "/api/speech-therapy/pending", &s.parent).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = get_auth(s.app.clone(), "/api/speech-therapy/pending", &s.teacher).await;
    assert_eq!(response.status(), StatusCode::OK);
    let pending = body_json(response).await;
    assert_eq!(pending[0]["childName"], "Ben");

    let uri = format!("/api/speech-therapy/evaluate/{id}");
    let response =
        put_json_auth(s.app.clone(), &uri, json!({ "rating": "Great" }), &s.teacher).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = put_json_auth(
        s.app.clone(),
        &uri,
        json!({ "rating": "Good", "feedback": "Clear vowels" }),
        &s.teacher,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["message"], "Session evaluated successfully");
    assert_eq!(json["session"]["status"], "evaluated");
    assert_eq!(json["session"]["rating"], "Good");

    let response = get_auth(s.app, "/api/speech-therapy/pending", &s.teacher).await;
    assert_eq!(body_json(response).await.as_array().map(Vec::len), Some(0));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn progress_lists_sessions_oldest_first(pool: PgPool) {
    let s = speech(pool).await;
    let first = upload(&s, "one").await["session"]["id"].as_i64().expect("id");
    upload(&s, "two").await;

    put_json_auth(
        s.app.clone(),
        &format!("/api/speech-therapy/evaluate/{first}"),
        json!({ "rating": "Average" }),
        &s.teacher,
    )
    .await;

    let response = get_auth(
        s.app,
        &format!("/api/speech-therapy/progress/{}", s.child_id),
        &s.parent,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["totalSessions"], 2);
    assert_eq!(json["evaluatedSessions"], 1);
    assert_eq!(json["pendingSessions"], 1);
    assert_eq!(json["ratingDistribution"]["average"], 1);
    assert_eq!(json["sessions"][0]["sessionNumber"], 1);
    assert_eq!(json["sessions"][0]["practicePrompt"], "one");
    assert_eq!(json["sessions"][1]["sessionNumber"], 2);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn audio_streams_whole_file_and_ranges(pool: PgPool) {
    let s = speech(pool).await;
    let id = upload(&s, "range").await["session"]["id"]
        .as_i64()
        .expect("session id");

    let response = common::send(s.app.clone(), audio_request(id, &s.parent, None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[CONTENT_TYPE], "audio/webm");
    assert_eq!(response.headers()[ACCEPT_RANGES], "bytes");
    assert_eq!(body_bytes(response).await, AUDIO);

    let response =
        common::send(s.app.clone(), audio_request(id, &s.parent, Some("bytes=5-9"))).await;
    assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(response.headers()[CONTENT_RANGE], "bytes 5-9/20");
    assert_eq!(body_bytes(response).await, b"56789");

    let response =
        common::send(s.app.clone(), audio_request(id, &s.parent, Some("bytes=-4"))).await;
    assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(body_bytes(response).await, b"ghij");

    let response =
        common::send(s.app.clone(), audio_request(id, &s.parent, Some("bytes=50-60"))).await;
    assert_eq!(response.status(), StatusCode::RANGE_NOT_SATISFIABLE);
    assert_eq!(response.headers()[CONTENT_RANGE], "bytes */20");

    let response = common::send(s.app, audio_request(999_999, &s.parent, None)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn delete_removes_session(pool: PgPool) {
    let s = speech(pool).await;
    let id = upload(&s, "bye").await["session"]["id"]
        .as_i64()
        .expect("session id");

    let response = delete_auth(s.app.clone(), &format!("/api/speech-therapy/{id}"), &s.parent).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["message"], "Session deleted successfully");

    let response = common::send(s.app.clone(), audio_request(id, &s.parent, None)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = delete_auth(s.app, &format!("/api/speech-therapy/{id}"), &s.parent).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
