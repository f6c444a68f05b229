use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use meme_locker::{config::Config, domain::MemeRepository, models::Meme, routes::create_router, startup::build_state, AppState};
use serde_json::Value;
use std::{collections::HashMap, sync::Arc};
use tower::ServiceExt;

const BASE_URL: &str = "http://localhost:3000";
const TOKEN: &str = "correct-horse-battery-staple";
const BOUNDARY: &str = "memelockerboundary";
const PNG: &[u8] = &[0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1a, b'\n', 1, 2, 3];

async fn app_and_state(extra: &[(&str, &str)]) -> (Router, Arc<AppState>) {
    let mut vars: HashMap<String, String> = HashMap::from([
        ("STORAGE_BACKEND".to_string(), "memory".to_string()),
        ("PUBLIC_BASE_URL".to_string(), BASE_URL.to_string()),
        ("MAX_UPLOAD_BYTES".to_string(), "4096".to_string()),
    ]);
    for (k, v) in extra {
        vars.insert(k.to_string(), v.to_string());
    }
    let config = Config::from_lookup(|name| vars.get(name).cloned()).unwrap();
    let state = build_state(&config).await.unwrap();
    (create_router(state.clone(), config.max_upload_bytes), state)
}

async fn app_with(extra: &[(&str, &str)]) -> Router {
    app_and_state(extra).await.0
}

async fn app() -> Router {
    app_with(&[("ADMIN_TOKEN", TOKEN)]).await
}

fn multipart_body(title: Option<&str>, file: Option<(&str, &str, &[u8])>) -> Vec<u8> {
    let mut body = Vec::new();
    if let Some(title) = title {
        body.extend_from_slice(
            format!("--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"title\"\r\n\r\n{title}\r\n").as_bytes(),
        );
    }
    if let Some((file_name, content_type, data)) = file {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, bytes.to_vec())
}

async fn upload(app: &Router, title: Option<&str>, file_name: &str) -> (StatusCode, Vec<u8>) {
    let request = Request::builder()
        .method(Method::POST)
        .uri("/memes")
        .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"))
        .body(Body::from(multipart_body(title, Some((file_name, "image/png", PNG)))))
        .unwrap();
    send(app, request).await
}

async fn upload_ok(app: &Router, title: Option<&str>, file_name: &str) -> Meme {
    let (status, body) = upload(app, title, file_name).await;
    assert_eq!(status, StatusCode::CREATED, "{}", String::from_utf8_lossy(&body));
    serde_json::from_slice(&body).unwrap()
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Vec<u8>) {
    send(app, Request::get(uri).body(Body::empty()).unwrap()).await
}

async fn list(app: &Router) -> Vec<Meme> {
    let (status, body) = get(app, "/memes").await;
    assert_eq!(status, StatusCode::OK);
    serde_json::from_slice(&body).unwrap()
}

async fn delete(app: &Router, id: &str, token: Option<&str>) -> StatusCode {
    let mut builder = Request::builder().method(Method::DELETE).uri(format!("/memes/{id}"));
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    send(app, builder.body(Body::empty()).unwrap()).await.0
}

async fn rename(app: &Router, id: &str, body: Value) -> (StatusCode, Vec<u8>) {
    let request = Request::builder()
        .method(Method::PATCH)
        .uri(format!("/memes/{id}"))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

#[tokio::test]
async fn health_is_ok() {
    let app = app().await;
    let (status, body) = get(&app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn upload_adds_one_record_with_reachable_url() {
    let app = app().await;
    assert!(list(&app).await.is_empty());

    let meme = upload_ok(&app, Some("Distracted"), "boyfriend.png").await;
    assert_eq!(meme.title, "Distracted");

    let listed = list(&app).await;
    assert_eq!(listed, vec![meme.clone()]);

    let path = meme.image_url.strip_prefix(BASE_URL).unwrap();
    let (status, body) = get(&app, path).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, PNG);
}

#[tokio::test]
async fn listing_is_newest_first() {
    let app = app().await;
    let first = upload_ok(&app, Some("first"), "a.png").await;
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let second = upload_ok(&app, Some("second"), "b.png").await;

    let ids: Vec<_> = list(&app).await.into_iter().map(|m| m.id).collect();
    assert_eq!(ids, vec![second.id, first.id]);
}

#[tokio::test]
async fn blank_title_uses_file_name() {
    let app = app().await;
    let meme = upload_ok(&app, Some("   "), "pepe.png").await;
    assert_eq!(meme.title, "pepe.png");

    let meme = upload_ok(&app, None, "wojak.png").await;
    assert_eq!(meme.title, "wojak.png");
}

#[tokio::test]
async fn upload_without_image_is_rejected() {
    let app = app().await;
    let request = Request::builder()
        .method(Method::POST)
        .uri("/memes")
        .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"))
        .body(Body::from(multipart_body(Some("lonely title"), None)))
        .unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["error"], "Missing form field: image");
    assert!(list(&app).await.is_empty());
}

#[tokio::test]
async fn oversized_upload_is_rejected() {
    let app = app().await;
    let big = vec![0u8; 8192];
    let request = Request::builder()
        .method(Method::POST)
        .uri("/memes")
        .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"))
        .body(Body::from(multipart_body(None, Some(("big.png", "image/png", big.as_slice())))))
        .unwrap();
    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert!(list(&app).await.is_empty());
}

#[tokio::test]
async fn rename_changes_title_only() {
    let app = app().await;
    let meme = upload_ok(&app, Some("old name"), "a.png").await;

    let (status, body) = rename(&app, &meme.id.to_string(), serde_json::json!({ "title": "new name" })).await;
    assert_eq!(status, StatusCode::OK);
    let renamed: Meme = serde_json::from_slice(&body).unwrap();
    assert_eq!(renamed, Meme { title: "new name".to_string(), ..meme });
}

#[tokio::test]
async fn cancelled_rename_changes_nothing() {
    let app = app().await;
    let meme = upload_ok(&app, Some("keep me"), "a.png").await;

    let (status, _) = rename(&app, &meme.id.to_string(), serde_json::json!({ "title": null })).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = rename(&app, &meme.id.to_string(), serde_json::json!({})).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = rename(&app, &meme.id.to_string(), serde_json::json!({ "title": "" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert_eq!(list(&app).await, vec![meme]);
}

#[tokio::test]
async fn rename_unknown_meme_is_not_found() {
    let app = app().await;
    let (status, _) = rename(&app, &uuid::Uuid::new_v4().to_string(), serde_json::json!({ "title": "x" })).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn delete_requires_the_admin_token() {
    let app = app().await;
    let meme = upload_ok(&app, None, "a.png").await;
    let id = meme.id.to_string();

    assert_eq!(delete(&app, &id, None).await, StatusCode::UNAUTHORIZED);
    assert_eq!(delete(&app, &id, Some("666")).await, StatusCode::UNAUTHORIZED);
    assert_eq!(list(&app).await.len(), 1);
}

#[tokio::test]
async fn delete_is_disabled_without_configured_token() {
    let app = app_with(&[]).await;
    let meme = upload_ok(&app, None, "a.png").await;
    assert_eq!(delete(&app, &meme.id.to_string(), Some(TOKEN)).await, StatusCode::FORBIDDEN);
    assert_eq!(list(&app).await.len(), 1);
}

#[tokio::test]
async fn delete_removes_record_and_object_once() {
    let app = app().await;
    let doomed = upload_ok(&app, Some("doomed"), "a.png").await;
    let survivor = upload_ok(&app, Some("survivor"), "b.png").await;
    let id = doomed.id.to_string();

    assert_eq!(delete(&app, &id, Some(TOKEN)).await, StatusCode::NO_CONTENT);
    assert_eq!(delete(&app, &id, Some(TOKEN)).await, StatusCode::NOT_FOUND);

    assert_eq!(list(&app).await, vec![survivor.clone()]);
    assert_eq!(get(&app, &format!("/memes/{id}")).await.0, StatusCode::NOT_FOUND);

    let doomed_path = doomed.image_url.strip_prefix(BASE_URL).unwrap();
    assert_eq!(get(&app, doomed_path).await.0, StatusCode::NOT_FOUND);
    let survivor_path = survivor.image_url.strip_prefix(BASE_URL).unwrap();
    assert_eq!(get(&app, survivor_path).await.0, StatusCode::OK);
}

#[tokio::test]
async fn link_and_image_endpoints_support_copying() {
    let app = app().await;
    let meme = upload_ok(&app, None, "a.png").await;

    let (status, body) = get(&app, &format!("/memes/{}/link", meme.id)).await;
    assert_eq!(status, StatusCode::OK);
    let link: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(link["url"], meme.image_url.as_str());

    let response = app
        .clone()
        .oneshot(Request::get(format!("/memes/{}/image", meme.id)).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(bytes.as_ref(), PNG);
}

#[tokio::test]
async fn malformed_and_unknown_ids() {
    let app = app().await;
    assert_eq!(get(&app, "/memes/not-a-uuid").await.0, StatusCode::BAD_REQUEST);
    assert_eq!(get(&app, &format!("/memes/{}", uuid::Uuid::new_v4())).await.0, StatusCode::NOT_FOUND);
    assert_eq!(get(&app, &format!("/memes/{}/link", uuid::Uuid::new_v4())).await.0, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn long_file_name_becomes_shortened_title() {
    let app = app().await;
    let name = format!("{}.png", "a".repeat(220));
    let meme = upload_ok(&app, None, &name).await;
    assert_eq!(meme.title.chars().count(), 200);
    assert!(name.starts_with(&meme.title));
}

#[tokio::test]
async fn overlong_titles_are_bad_requests() {
    let app = app().await;
    let long = "t".repeat(201);

    let (status, _) = upload(&app, Some(&long), "a.png").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let meme = upload_ok(&app, Some("short"), "a.png").await;
    let (status, body) = rename(&app, &meme.id.to_string(), serde_json::json!({ "title": long })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["error"], "title must be at most 200 characters");
    assert_eq!(list(&app).await, vec![meme]);
}

#[tokio::test]
async fn keyless_meme_redirects_and_deletes_without_touching_storage() {
    let (app, state) = app_and_state(&[("ADMIN_TOKEN", TOKEN)]).await;
    let keeper = upload_ok(&app, None, "keep.png").await;
    let legacy = Meme {
        id: uuid::Uuid::new_v4(),
        title: "legacy".to_string(),
        image_url: "https://cdn.example.com/old.png".to_string(),
        file_name: None,
        created_at: chrono::Utc::now(),
    };
    state.meme_repo.create(&legacy).await.unwrap();

    let response = app
        .clone()
        .oneshot(Request::get(format!("/memes/{}/image", legacy.id)).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(response.headers()[header::LOCATION], "https://cdn.example.com/old.png");

    assert_eq!(delete(&app, &legacy.id.to_string(), Some(TOKEN)).await, StatusCode::NO_CONTENT);
    assert_eq!(list(&app).await, vec![keeper.clone()]);
    let keeper_path = keeper.image_url.strip_prefix(BASE_URL).unwrap();
    assert_eq!(get(&app, keeper_path).await.0, StatusCode::OK);
}
