use std::time::Instant;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use rstest::rstest;
use serde_json::{json, Value};
use todoapp_core::{open_db_in_memory, CredentialConfig, CredentialService, HashCost};
use todoapp_http::{build_router, AppState, Storage};
use tower::ServiceExt;

const SECRET: &str = "integration-test-secret-0123456789abcdef";

#[derive(Debug, Clone, Copy)]
enum Backend {
    Memory,
    Sqlite,
}

fn app(backend: Backend) -> Router {
    app_with_cost(
        backend,
        HashCost {
            memory_kib: 64,
            iterations: 1,
            parallelism: 1,
        },
    )
}

fn app_with_cost(backend: Backend, hash_cost: HashCost) -> Router {
    let mut config = CredentialConfig::new(SECRET.as_bytes().to_vec());
    config.hash_cost = hash_cost;
    let credentials = CredentialService::new(&config).unwrap();
    let storage = match backend {
        Backend::Memory => Storage::memory(),
        Backend::Sqlite => Storage::sqlite(open_db_in_memory().unwrap()),
    };
    build_router(AppState::new(storage, credentials))
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    body: Option<Value>,
    token: Option<&str>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    send_request(app, request).await
}

async fn send_request(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

async fn register(app: &Router, username: &str, password: &str) -> Value {
    let (status, body) = send(
        app,
        Method::POST,
        "/auth/sign-up",
        Some(json!({"name": "Test User", "username": username, "password": password})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body
}

async fn sign_in(app: &Router, username: &str, password: &str) -> String {
    let (status, body) = send(
        app,
        Method::POST,
        "/auth/sign-in",
        Some(json!({"username": username, "password": password})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    body["token"].as_str().unwrap().to_string()
}

async fn create_todo(app: &Router, body: Value, token: Option<&str>) -> Value {
    let (status, body) = send(app, Method::POST, "/todos", Some(body), token).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body
}

#[tokio::test]
async fn health_reports_ok_with_version() {
    let app = app(Backend::Memory);
    let (status, body) = send(&app, Method::GET, "/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], todoapp_core::core_version());
}

#[rstest]
#[case::memory(Backend::Memory)]
#[case::sqlite(Backend::Sqlite)]
#[tokio::test]
async fn sign_up_hides_hash_and_rejects_duplicates(#[case] backend: Backend) {
    let app = app(backend);
    let user = register(&app, "alice", "secret1").await;

    assert_eq!(user["username"], "alice");
    assert_eq!(user["name"], "Test User");
    assert!(user["id"].is_string());
    assert!(user.get("password_hash").is_none());
    assert!(user.get("password").is_none());

    let (status, body) = send(
        &app,
        Method::POST,
        "/users",
        Some(json!({"name": "Other", "username": "alice", "password": "another1"})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("alice"));
}

#[rstest]
#[case::empty_name(json!({"name": " ", "username": "bob", "password": "secret1"}))]
#[case::empty_username(json!({"name": "Bob", "username": "", "password": "secret1"}))]
#[case::short_password(json!({"name": "Bob", "username": "bob", "password": "abc"}))]
#[tokio::test]
async fn sign_up_validation_failures_are_bad_requests(#[case] body: Value) {
    let app = app(Backend::Memory);
    let (status, body) = send(&app, Method::POST, "/auth/sign-up", Some(body), None).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[rstest]
#[case::memory(Backend::Memory)]
#[case::sqlite(Backend::Sqlite)]
#[tokio::test]
async fn sign_in_issues_token_resolved_by_me(#[case] backend: Backend) {
    let app = app(backend);
    let user = register(&app, "alice", "secret1").await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/auth/sign-in",
        Some(json!({"username": "alice", "password": "secret1"})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["token_type"], "Bearer");
    assert!(body["expires_at"].as_i64().unwrap() > 0);

    let token = body["token"].as_str().unwrap();
    let (status, me) = send(&app, Method::GET, "/auth/me", None, Some(token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["id"], user["id"]);
    assert_eq!(me["username"], "alice");
}

#[rstest]
#[case::wrong_password("alice", "wrong-password")]
#[case::unknown_user("mallory", "secret1")]
#[tokio::test]
async fn failed_sign_in_is_unauthorized_with_one_message(
    #[case] username: &str,
    #[case] password: &str,
) {
    let app = app(Backend::Memory);
    register(&app, "alice", "secret1").await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/auth/sign-in",
        Some(json!({"username": username, "password": password})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "invalid username or password");
}

#[tokio::test]
async fn me_requires_a_valid_bearer_token() {
    let app = app(Backend::Memory);

    let (status, _) = send(&app, Method::GET, "/auth/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, Method::GET, "/auth/me", None, Some("not.a.jwt")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let request = Request::builder()
        .uri("/auth/me")
        .header(header::AUTHORIZATION, "Basic YWxpY2U6c2VjcmV0")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send_request(&app, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn token_of_deleted_user_is_rejected_by_me() {
    let app = app(Backend::Memory);
    let user = register(&app, "alice", "secret1").await;
    let token = sign_in(&app, "alice", "secret1").await;

    let uri = format!("/users/{}", user["id"].as_str().unwrap());
    let (status, body) = send(&app, Method::DELETE, &uri, None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "user deleted");

    let (status, _) = send(&app, Method::GET, "/auth/me", None, Some(&token)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[rstest]
#[case::memory(Backend::Memory)]
#[case::sqlite(Backend::Sqlite)]
#[tokio::test]
async fn user_directory_endpoints(#[case] backend: Backend) {
    let app = app(backend);
    let user = register(&app, "alice", "secret1").await;
    let id = user["id"].as_str().unwrap().to_string();

    let (status, fetched) = send(&app, Method::GET, &format!("/users/{id}"), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched, user);

    let (status, fetched) = send(&app, Method::GET, "/users/username/alice", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["id"], user["id"]);

    let (status, updated) = send(
        &app,
        Method::PUT,
        "/users",
        Some(json!({"id": id, "name": "Alice Liddell", "password": "newsecret"})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["name"], "Alice Liddell");
    assert_eq!(updated["username"], "alice");
    assert_eq!(updated["created_at"], user["created_at"]);

    // New password works, old one no longer does.
    sign_in(&app, "alice", "newsecret").await;
    let (status, _) = send(
        &app,
        Method::POST,
        "/auth/sign-in",
        Some(json!({"username": "alice", "password": "secret1"})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(
        &app,
        Method::PUT,
        "/users",
        Some(json!({"id": id})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, Method::DELETE, &format!("/users/{id}"), None, None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, Method::GET, &format!("/users/{id}"), None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(&app, Method::DELETE, &format!("/users/{id}"), None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(&app, Method::GET, "/users/username/alice", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // A deleted user's username can be claimed again.
    let again = register(&app, "alice", "secret1").await;
    assert_ne!(again["id"], user["id"]);
}

#[rstest]
#[case::memory(Backend::Memory)]
#[case::sqlite(Backend::Sqlite)]
#[tokio::test]
async fn todo_lifecycle(#[case] backend: Backend) {
    let app = app(backend);

    let todo = create_todo(&app, json!({"title": "  Buy milk  "}), None).await;
    assert_eq!(todo["id"], 1);
    assert_eq!(todo["title"], "  Buy milk  ");
    assert_eq!(todo["completed"], false);
    assert!(todo.get("description").is_none());
    assert!(todo.get("owner_id").is_none());

    let (status, toggled) = send(&app, Method::PATCH, "/todos/1/toggle", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(toggled["completed"], true);
    let (_, toggled) = send(&app, Method::PATCH, "/todos/1/toggle", None, None).await;
    assert_eq!(toggled["completed"], false);

    let (_, completed) = send(&app, Method::PATCH, "/todos/1/complete", None, None).await;
    assert_eq!(completed["completed"], true);
    let (_, completed) = send(&app, Method::PATCH, "/todos/1/complete", None, None).await;
    assert_eq!(completed["completed"], true);
    let (_, active) = send(&app, Method::PATCH, "/todos/1/activate", None, None).await;
    assert_eq!(active["completed"], false);

    let (status, updated) = send(
        &app,
        Method::PUT,
        "/todos/1",
        Some(json!({"title": "Buy oat milk", "description": "two cartons", "completed": true})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["title"], "Buy oat milk");
    assert_eq!(updated["description"], "two cartons");
    assert_eq!(updated["completed"], true);
    assert_eq!(updated["created_at"], todo["created_at"]);

    let (status, fetched) = send(&app, Method::GET, "/todos/1", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched, updated);

    let (status, body) = send(&app, Method::DELETE, "/todos/1", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "todo deleted");

    for (method, uri) in [
        (Method::GET, "/todos/1"),
        (Method::DELETE, "/todos/1"),
        (Method::PATCH, "/todos/1/toggle"),
    ] {
        let (status, _) = send(&app, method, uri, None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
    }

    let next = create_todo(&app, json!({"title": "Walk dog"}), None).await;
    assert_eq!(next["id"], 2);
}

#[rstest]
#[case::memory(Backend::Memory)]
#[case::sqlite(Backend::Sqlite)]
#[tokio::test]
async fn todo_owner_comes_from_body_or_token(#[case] backend: Backend) {
    let app = app(backend);
    let alice = register(&app, "alice", "secret1").await;
    let bob = register(&app, "bob", "secret2").await;
    let token = sign_in(&app, "alice", "secret1").await;

    let implicit = create_todo(&app, json!({"title": "from token"}), Some(&token)).await;
    assert_eq!(implicit["owner_id"], alice["id"]);

    let explicit = create_todo(
        &app,
        json!({"title": "for bob", "owner": bob["id"]}),
        Some(&token),
    )
    .await;
    assert_eq!(explicit["owner_id"], bob["id"]);

    create_todo(&app, json!({"title": "nobody's"}), None).await;

    let uri = format!("/todos/user/{}", alice["id"].as_str().unwrap());
    let (status, owned) = send(&app, Method::GET, &uri, None, None).await;
    assert_eq!(status, StatusCode::OK);
    let titles: Vec<&str> = owned
        .as_array()
        .unwrap()
        .iter()
        .map(|todo| todo["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["from token"]);

    let (status, body) = send(
        &app,
        Method::POST,
        "/todos",
        Some(json!({"title": "orphan", "owner_id": uuid::Uuid::new_v4()})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn create_todo_with_invalid_token_is_unauthorized() {
    let app = app(Backend::Memory);
    let (status, _) = send(
        &app,
        Method::POST,
        "/todos",
        Some(json!({"title": "x"})),
        Some("garbage"),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[rstest]
#[case::memory(Backend::Memory)]
#[case::sqlite(Backend::Sqlite)]
#[tokio::test]
async fn list_todos_filters_and_pages(#[case] backend: Backend) {
    let app = app(backend);
    for title in ["Buy milk", "Call mom", "Buy bread", "Pay rent"] {
        create_todo(&app, json!({"title": title}), None).await;
    }
    send(&app, Method::PATCH, "/todos/2/complete", None, None).await;
    send(&app, Method::PATCH, "/todos/3/complete", None, None).await;
    send(&app, Method::DELETE, "/todos/4", None, None).await;

    let ids = |body: &Value| -> Vec<i64> {
        body.as_array()
            .unwrap()
            .iter()
            .map(|todo| todo["id"].as_i64().unwrap())
            .collect()
    };

    let (status, all) = send(&app, Method::GET, "/todos", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&all), vec![3, 2, 1]);

    let (_, done) = send(&app, Method::GET, "/todos?completed=true", None, None).await;
    assert_eq!(ids(&done), vec![3, 2]);

    let (_, open) = send(&app, Method::GET, "/todos?completed=false", None, None).await;
    assert_eq!(ids(&open), vec![1]);

    let (_, found) = send(&app, Method::GET, "/todos?search=buy", None, None).await;
    assert_eq!(ids(&found), vec![3, 1]);

    let (_, page) = send(&app, Method::GET, "/todos?limit=1&offset=1", None, None).await;
    assert_eq!(ids(&page), vec![2]);
}

#[rstest]
#[case::malformed_json(Method::POST, "/todos", Some("{not json"))]
#[case::wrong_field_type(Method::POST, "/todos", Some(r#"{"title": 42}"#))]
#[case::missing_title(Method::POST, "/todos", Some(r#"{"completed": true}"#))]
#[case::blank_title(Method::POST, "/todos", Some(r#"{"title": "   "}"#))]
#[case::non_numeric_todo_id(Method::GET, "/todos/abc", None)]
#[case::non_uuid_user_id(Method::GET, "/users/42", None)]
#[case::bad_query(Method::GET, "/todos?completed=maybe", None)]
#[tokio::test]
async fn undecodable_requests_are_bad_requests(
    #[case] method: Method,
    #[case] uri: &str,
    #[case] body: Option<&str>,
) {
    let app = app(Backend::Memory);
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let (status, body) = send_request(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string(), "{body}");
}

#[rstest]
#[case::unknown_todo("/todos/999")]
#[case::unknown_user("/users/00000000-0000-0000-0000-000000000000")]
#[case::unknown_username("/users/username/ghost")]
#[case::unknown_route("/nowhere")]
#[tokio::test]
async fn missing_resources_are_not_found(#[case] uri: &str) {
    let app = app(Backend::Memory);
    let (status, body) = send(&app, Method::GET, uri, None, None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].is_string());
}

#[rstest]
#[case::post_on_todo(Method::POST, "/todos/1")]
#[case::delete_on_collection(Method::DELETE, "/todos")]
#[case::get_on_toggle(Method::GET, "/todos/1/toggle")]
#[case::put_on_sign_in(Method::PUT, "/auth/sign-in")]
#[tokio::test]
async fn wrong_method_is_method_not_allowed_with_error_body(
    #[case] method: Method,
    #[case] uri: &str,
) {
    let app = app(Backend::Memory);
    let (status, body) = send(&app, method, uri, None, None).await;

    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert!(body["error"].as_str().unwrap().contains("not allowed"));
}

#[rstest]
#[case::memory(Backend::Memory)]
#[case::sqlite(Backend::Sqlite)]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_toggles_through_the_api_are_not_lost(#[case] backend: Backend) {
    let app = app(backend);
    create_todo(&app, json!({"title": "contended"}), None).await;

    let mut handles = Vec::new();
    for _ in 0..20 {
        let app = app.clone();
        handles.push(tokio::spawn(async move {
            let (status, _) = send(&app, Method::PATCH, "/todos/1/toggle", None, None).await;
            assert_eq!(status, StatusCode::OK);
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    // An even number of toggles lands back on the starting state.
    let (_, todo) = send(&app, Method::GET, "/todos/1", None, None).await;
    assert_eq!(todo["completed"], false);
}

#[rstest]
#[case::memory(Backend::Memory)]
#[case::sqlite(Backend::Sqlite)]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn todo_reads_proceed_while_a_password_is_hashing(#[case] backend: Backend) {
    let app = app_with_cost(
        backend,
        HashCost {
            memory_kib: 32 * 1024,
            iterations: 3,
            parallelism: 1,
        },
    );
    create_todo(&app, json!({"title": "Buy milk"}), None).await;

    let started = Instant::now();
    register(&app, "baseline", "secret1").await;
    let registration_time = started.elapsed();

    let registration = {
        let app = app.clone();
        tokio::spawn(async move {
            register(&app, "concurrent", "secret1").await;
        })
    };
    tokio::time::sleep(registration_time / 4).await;

    let started = Instant::now();
    let (status, todos) = send(&app, Method::GET, "/todos", None, None).await;
    let read_time = started.elapsed();

    assert_eq!(status, StatusCode::OK);
    assert_eq!(todos.as_array().unwrap().len(), 1);
    assert!(
        read_time < registration_time / 2,
        "read took {read_time:?} while one registration takes {registration_time:?}"
    );

    registration.await.unwrap();
}
