//! End-to-end router tests against an in-memory store.

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use std::collections::HashMap;
use tower::ServiceExt;
use usernet_core::db::open_db_in_memory;
use usernet_server::{build_router, AppState};

fn test_app() -> Router {
    let conn = open_db_in_memory().expect("open in-memory db");
    build_router(AppState::new(conn))
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("build request");

    let response = app.clone().oneshot(request).await.expect("request failed");
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("json body")
    };
    (status, value)
}

async fn create(app: &Router, username: &str, hobbies: &[&str]) -> String {
    let (status, body) = send(
        app,
        Method::POST,
        "/api/users",
        Some(json!({"username": username, "age": 30, "hobbies": hobbies})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["id"].as_str().expect("id").to_string()
}

#[tokio::test]
async fn health_reports_ok() {
    let app = test_app();
    let (status, body) = send(&app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert!(body["timestamp"].as_i64().is_some());
}

#[tokio::test]
async fn unknown_route_returns_json_404() {
    let app = test_app();
    let (status, body) = send(&app, Method::GET, "/api/nothing", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Route not found");
}

#[tokio::test]
async fn create_returns_scored_user() {
    let app = test_app();
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/users",
        Some(json!({"username": "alice", "age": 25, "hobbies": ["reading"]})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["username"], "alice");
    assert_eq!(body["friends"], json!([]));
    assert_eq!(body["popularityScore"], 0.0);
    assert!(body["createdAt"].as_i64().is_some());
}

#[tokio::test]
async fn create_rejects_malformed_input() {
    let app = test_app();
    let cases = [
        json!({"username": "alice", "age": 25}),
        json!({"username": "alice", "age": -1, "hobbies": ["x"]}),
        json!({"username": "alice", "age": 25, "hobbies": "x"}),
        json!({"username": "alice", "age": 25, "hobbies": []}),
        json!({"username": "   ", "age": 25, "hobbies": ["x"]}),
    ];
    for body in cases {
        let (status, response) = send(&app, Method::POST, "/api/users", Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(response["message"].is_string());
    }

    let (status, users) = send(&app, Method::GET, "/api/users", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(users, json!([]));
}

#[tokio::test]
async fn invalid_or_unknown_ids() {
    let app = test_app();
    let alice = create(&app, "alice", &["x"]).await;

    let requests = [
        (Method::GET, "/api/users/abc".to_string(), None),
        (Method::PUT, "/api/users/abc".to_string(), Some(json!({"age": 40}))),
        (Method::DELETE, "/api/users/abc".to_string(), None),
        (
            Method::POST,
            "/api/users/abc/link".to_string(),
            Some(json!({"friendId": "def"})),
        ),
        (
            Method::POST,
            format!("/api/users/{alice}/link"),
            Some(json!({"friendId": "def"})),
        ),
        (
            Method::DELETE,
            "/api/users/abc/unlink".to_string(),
            Some(json!({"friendId": alice})),
        ),
        (
            Method::POST,
            "/api/users/abc/hobbies".to_string(),
            Some(json!({"hobby": "chess"})),
        ),
    ];
    for (method, uri, body) in requests {
        let (status, response) = send(&app, method.clone(), &uri, body).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{method} {uri}");
        assert_eq!(response["message"], "User not found");
    }

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/users/abc/link",
        Some(json!({"friendId": ""})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Friend ID is required");

    let missing = uuid::Uuid::new_v4();
    let (status, body) = send(&app, Method::GET, &format!("/api/users/{missing}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "User not found");
}

#[tokio::test]
async fn link_scores_and_graph() {
    let app = test_app();
    let alice = create(&app, "alice", &["reading", "gaming"]).await;
    let bob = create(&app, "bob", &["gaming"]).await;

    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/api/users/{alice}/link"),
        Some(json!({"friendId": bob})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["message"].is_string());

    let (_, alice_body) = send(&app, Method::GET, &format!("/api/users/{alice}"), None).await;
    assert_eq!(alice_body["friends"], json!([bob]));
    assert_eq!(alice_body["popularityScore"], 1.5);

    let (status, graph) = send(&app, Method::GET, "/api/users/graph", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(graph["nodes"].as_array().map(Vec::len), Some(2));
    assert_eq!(graph["edges"].as_array().map(Vec::len), Some(1));

    let (status, _) = send(
        &app,
        Method::POST,
        &format!("/api/users/{bob}/link"),
        Some(json!({"friendId": alice})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn link_validates_friend_id() {
    let app = test_app();
    let alice = create(&app, "alice", &["x"]).await;

    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/api/users/{alice}/link"),
        Some(json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Friend ID is required");

    let (status, _) = send(
        &app,
        Method::POST,
        &format!("/api/users/{alice}/link"),
        Some(json!({"friendId": alice})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let missing = uuid::Uuid::new_v4();
    let (status, _) = send(
        &app,
        Method::POST,
        &format!("/api/users/{alice}/link"),
        Some(json!({"friendId": missing})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn delete_requires_unlinking_first() {
    let app = test_app();
    let alice = create(&app, "alice", &["x"]).await;
    let bob = create(&app, "bob", &["y"]).await;
    send(
        &app,
        Method::POST,
        &format!("/api/users/{alice}/link"),
        Some(json!({"friendId": bob})),
    )
    .await;

    let (status, _) = send(&app, Method::DELETE, &format!("/api/users/{alice}"), None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send(
        &app,
        Method::DELETE,
        &format!("/api/users/{bob}/unlink"),
        Some(json!({"friendId": alice})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, Method::DELETE, &format!("/api/users/{alice}"), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, Method::GET, &format!("/api/users/{alice}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn update_and_hobby_endpoints() {
    let app = test_app();
    let alice = create(&app, "alice", &["reading"]).await;

    let (status, body) = send(
        &app,
        Method::PUT,
        &format!("/api/users/{alice}"),
        Some(json!({"age": 31})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["age"], 31);
    assert_eq!(body["username"], "alice");

    let (status, _) = send(
        &app,
        Method::PUT,
        &format!("/api/users/{alice}"),
        Some(json!({"age": 0})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/api/users/{alice}/hobbies"),
        Some(json!({"hobby": "Chess"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["hobbies"], json!(["reading", "Chess"]));

    let (status, hobbies) = send(&app, Method::GET, "/api/users/hobbies?q=che", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(hobbies, json!(["Chess"]));
}

#[tokio::test]
async fn non_json_body_is_rejected() {
    let app = test_app();
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/users")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .expect("build request");
    let response = app.oneshot(request).await.expect("request failed");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

/// Every listed friend must exist and list the user back, and every score
/// must match the formula over the same response.
fn assert_consistent_snapshot(users: &Value) {
    let users = users.as_array().expect("user list");
    let by_id: HashMap<&str, &Value> = users
        .iter()
        .map(|user| (user["id"].as_str().expect("id"), user))
        .collect();

    for user in users {
        let id = user["id"].as_str().expect("id");
        let friends = user["friends"].as_array().expect("friends");
        let own_hobbies = user["hobbies"].as_array().expect("hobbies");

        let mut shared = 0usize;
        for friend_id in friends {
            let friend_id = friend_id.as_str().expect("friend id");
            let friend = by_id
                .get(friend_id)
                .unwrap_or_else(|| panic!("{id} lists missing friend {friend_id}"));
            let back = friend["friends"].as_array().expect("friends");
            assert!(
                back.iter().any(|value| value == id),
                "{friend_id} does not list {id} back"
            );
            let friend_hobbies = friend["hobbies"].as_array().expect("hobbies");
            shared += own_hobbies
                .iter()
                .filter(|hobby| friend_hobbies.contains(*hobby))
                .count();
        }

        let expected = friends.len() as f64 + 0.5 * shared as f64;
        assert_eq!(user["popularityScore"].as_f64(), Some(expected), "score of {id}");
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_link_and_unlink_never_expose_half_edges() {
    let app = test_app();
    let mut ids = Vec::new();
    for name in ["ring0", "ring1", "ring2", "ring3"] {
        ids.push(create(&app, name, &["chess", "go"]).await);
    }

    let mut writers = Vec::new();
    for index in 0..ids.len() {
        let app = app.clone();
        let user = ids[index].clone();
        let friend = ids[(index + 1) % ids.len()].clone();
        writers.push(tokio::spawn(async move {
            for _ in 0..15 {
                let (status, _) = send(
                    &app,
                    Method::POST,
                    &format!("/api/users/{user}/link"),
                    Some(json!({"friendId": friend})),
                )
                .await;
                assert_eq!(status, StatusCode::OK);
                let (status, _) = send(
                    &app,
                    Method::DELETE,
                    &format!("/api/users/{friend}/unlink"),
                    Some(json!({"friendId": user})),
                )
                .await;
                assert_eq!(status, StatusCode::OK);
            }
        }));
    }

    let mut readers = Vec::new();
    for _ in 0..3 {
        let app = app.clone();
        readers.push(tokio::spawn(async move {
            for _ in 0..25 {
                let (status, users) = send(&app, Method::GET, "/api/users", None).await;
                assert_eq!(status, StatusCode::OK);
                assert_consistent_snapshot(&users);
            }
        }));
    }

    for handle in writers.into_iter().chain(readers) {
        handle.await.expect("task panicked");
    }

    let (_, users) = send(&app, Method::GET, "/api/users", None).await;
    assert_consistent_snapshot(&users);
    for user in users.as_array().expect("user list") {
        assert_eq!(user["friends"], json!([]));
    }
}
