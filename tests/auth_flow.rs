use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use userauth::{app::build_app, state::AppState};

fn app() -> Router {
    build_app(AppState::fake())
}

async fn call(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut req = Request::builder().method(method).uri(uri);
    if let Some(t) = token {
        req = req.header(header::AUTHORIZATION, format!("Bearer {t}"));
    }
    let req = match body {
        Some(b) => req
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(b.to_string()))
            .unwrap(),
        None => req.body(Body::empty()).unwrap(),
    };

    let res = app.clone().oneshot(req).await.unwrap();
    let status = res.status();
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into()))
    };
    (status, value)
}

const REGISTER: &str = "/api/v1/auth/register";
const ME: &str = "/api/v1/me";

fn alice() -> Value {
    json!({
        "first_name": "Alice",
        "last_name": "Liddell",
        "username": "alice",
        "email": "alice@example.com",
        "password": "Secret123"
    })
}

async fn register_and_login(app: &Router) -> (String, String) {
    let (status, user) = call(app, Method::POST, REGISTER, None, Some(alice())).await;
    assert_eq!(status, StatusCode::CREATED, "{user}");
    let (status, body) = call(
        app,
        Method::POST,
        "/api/v1/auth/login",
        None,
        Some(json!({"username": "alice", "password": "Secret123"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    (
        user["id"].as_str().unwrap().to_string(),
        body["access_token"].as_str().unwrap().to_string(),
    )
}

#[tokio::test]
async fn health() {
    let (status, body) = call(&app(), Method::GET, "/api/v1/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::String("ok".into()));
}

#[tokio::test]
async fn register_login_and_access_protected_resource() {
    let app = app();

    let (status, user) = call(&app, Method::POST, REGISTER, None, Some(alice())).await;
    assert_eq!(status, StatusCode::CREATED);
    let id = user["id"].as_str().expect("id returned").to_string();
    assert_eq!(user["username"], "alice");
    assert_eq!(user["is_active"], true);
    assert!(user.get("password").is_none());
    assert!(user.get("password_hash").is_none());

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/v1/auth/login",
        None,
        Some(json!({"username": "alice", "password": "Secret123"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["token_type"], "bearer");
    assert_eq!(body["user"]["id"], id.as_str());
    let token = body["access_token"].as_str().unwrap().to_string();

    let (status, _) = call(
        &app,
        Method::POST,
        "/api/v1/auth/login",
        None,
        Some(json!({"username": "alice", "password": "Wrong1234"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, me) = call(&app, Method::GET, ME, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["id"], id.as_str());
    assert_eq!(me["email"], "alice@example.com");

    let (status, body) = call(&app, Method::GET, ME, None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Could not validate credentials");
}

#[tokio::test]
async fn login_with_email_works() {
    let app = app();
    call(&app, Method::POST, REGISTER, None, Some(alice())).await;
    let (status, body) = call(
        &app,
        Method::POST,
        "/api/v1/auth/login",
        None,
        Some(json!({"username": "Alice@Example.com", "password": "Secret123"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
}

#[tokio::test]
async fn duplicate_registration_is_conflict() {
    let app = app();
    let (status, first) = call(&app, Method::POST, REGISTER, None, Some(alice())).await;
    assert_eq!(status, StatusCode::CREATED);

    let mut dup = alice();
    dup["username"] = json!("alice2");
    let (status, body) = call(&app, Method::POST, REGISTER, None, Some(dup)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["field"], "email");

    // the first account still logs in
    let (status, body) = call(
        &app,
        Method::POST,
        "/api/v1/auth/login",
        None,
        Some(json!({"username": "alice", "password": "Secret123"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["id"], first["id"]);
}

#[tokio::test]
async fn invalid_registration_lists_every_field() {
    let (status, body) = call(
        &app(),
        Method::POST,
        REGISTER,
        None,
        Some(json!({"username": "al", "email": "not-an-email", "password": "short"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");
    let fields: Vec<&str> = body["details"]
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["field"].as_str().unwrap())
        .collect();
    for f in ["email", "first_name", "last_name", "password", "username"] {
        assert!(fields.contains(&f), "missing {f} in {fields:?}");
    }
}

#[tokio::test]
async fn garbage_token_is_rejected() {
    let (status, _) = call(&app(), Method::GET, ME, Some("not.a.token"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn update_profile_and_change_password() {
    let app = app();
    let (_, token) = register_and_login(&app).await;

    let (status, body) = call(
        &app,
        Method::PATCH,
        ME,
        Some(&token),
        Some(json!({"first_name": "Alicia", "password": "Changed99"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["first_name"], "Alicia");

    let (status, _) = call(
        &app,
        Method::POST,
        "/api/v1/auth/login",
        None,
        Some(json!({"username": "alice", "password": "Secret123"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = call(
        &app,
        Method::POST,
        "/api/v1/auth/login",
        None,
        Some(json!({"username": "alice", "password": "Changed99"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn empty_update_is_rejected() {
    let app = app();
    let (_, token) = register_and_login(&app).await;
    let (status, body) = call(&app, Method::PATCH, ME, Some(&token), Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"][0]["field"], "body");
}

#[tokio::test]
async fn deleted_account_token_stops_working() {
    let app = app();
    let (_, token) = register_and_login(&app).await;

    let (status, _) = call(&app, Method::DELETE, ME, Some(&token), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = call(&app, Method::GET, ME, Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // username is free again
    let (status, _) = call(&app, Method::POST, REGISTER, None, Some(alice())).await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn wrongly_typed_field_is_a_validation_error() {
    let mut body = alice();
    body["username"] = json!(42);
    let (status, body) = call(&app(), Method::POST, REGISTER, None, Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");
    assert_eq!(body["details"][0]["field"], "body");
    assert!(body["details"][0]["message"]
        .as_str()
        .unwrap()
        .contains("username"));
}

#[tokio::test]
async fn unparseable_body_is_a_validation_error() {
    let app = app();
    let req = Request::builder()
        .method(Method::POST)
        .uri("/api/v1/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"username\": "))
        .unwrap();
    let res = app.clone().oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["error"], "validation_error");

    let (_, token) = register_and_login(&app).await;
    let bad_email = json!({"email": true});
    let (status, body) = call(&app, Method::PATCH, ME, Some(&token), Some(bad_email)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"][0]["field"], "body");
}
