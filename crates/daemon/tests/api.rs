//! API server tests, driven through the real router

mod common;

use std::sync::{Arc, Mutex};

use axum::body::Body;
use http::{Request, StatusCode};
use serde_json::{json, Value};

use privy_daemon::observer::ResponseObserver;

use common::*;

async fn json_body(response: axum::response::Response) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

#[derive(Default)]
struct RecordingObserver {
    seen: Mutex<Vec<(String, Vec<u8>)>>,
}

impl ResponseObserver for RecordingObserver {
    fn observe(&self, route: &str, body: &[u8]) {
        self.seen
            .lock()
            .unwrap()
            .push((route.to_string(), body.to_vec()));
    }
}

#[tokio::test]
async fn test_rewrite_relocates_uploads() {
    let service = setup_service();
    let url = service.upload("fluentform/2026/02/cv.pdf", b"resume");

    let response = send(
        service.api(),
        post_json(
            "/api/v0/payload/rewrite",
            json!({"name": "Jane", "files": {"cv": [url], "note": "hello"}}),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        json_body(response).await,
        json!({"name": "Jane", "files": {"cv": ["ff-private://2026/02/cv.pdf"], "note": "hello"}})
    );

    assert!(!service.public_root().join("fluentform/2026/02/cv.pdf").exists());
    assert_eq!(
        std::fs::read(service.private_root().join("2026/02/cv.pdf")).unwrap(),
        b"resume"
    );
}

#[tokio::test]
async fn test_rewrite_keeps_unresolvable_values() {
    let service = setup_service();
    let payload = json!([
        "ff-private://2026/02/already.pdf",
        "https://elsewhere.example/file.pdf",
        "https://site.example/wp-content/uploads/fluentform/2026/02/missing.pdf",
        42
    ]);

    let response = send(
        service.api(),
        post_json("/api/v0/payload/rewrite", payload.clone()),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await, payload);
}

#[tokio::test]
async fn test_render_display_and_pass_through() {
    let service = setup_service();
    service.put_private("2026/02/cv.pdf", b"resume");
    let values = json!(["ff-private://2026/02/cv.pdf"]);

    let response = send(
        service.api(),
        post_json(
            "/api/v0/links/render",
            json!({"values": values, "display": false}),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        json_body(response).await,
        json!({"kind": "pass_through", "values": values})
    );

    let response = send(
        service.api(),
        post_json("/api/v0/links/render", json!({"values": values, "display": true})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["kind"], "markup");
    let markup = body["markup"].as_str().unwrap();
    assert!(markup.contains("privy-downloads"));
    assert!(markup.contains("privy_download"));
    assert!(markup.contains(">cv.pdf</a>"));
}

#[tokio::test]
async fn test_render_nothing_resolvable_is_empty() {
    let service = setup_service();

    let response = send(
        service.api(),
        post_json(
            "/api/v0/links/render",
            json!({"values": ["", "https://elsewhere.example/x.pdf"], "display": true}),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await, json!({"kind": "empty"}));
}

#[tokio::test]
async fn test_minted_link_downloads() {
    let service = setup_service();
    service.put_private("2026/02/cv.pdf", b"resume");

    let response = send(
        service.api(),
        post_json("/api/v0/links/mint", json!({"path": "/2026/02/cv.pdf"})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    let url = url::Url::parse(body["url"].as_str().unwrap()).unwrap();
    assert!(body["expires"].as_i64().unwrap() > 0);

    let request = Request::builder()
        .uri(path_and_query(&url))
        .header(http::header::AUTHORIZATION, format!("Bearer {}", ADMIN_TOKEN))
        .body(Body::empty())
        .unwrap();
    let response = send(service.gateway(), request).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_bytes(response).await, b"resume");
}

#[tokio::test]
async fn test_mint_rejects_traversal() {
    let service = setup_service();
    let response = send(
        service.api(),
        post_json("/api/v0/links/mint", json!({"path": "../../etc/passwd"})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_upload_target_uses_private_urls() {
    let service = setup_service();

    let response = send(
        service.api(),
        post_json("/api/v0/uploads/target", json!({"subdir": "/2026/02"})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(
        body["url"],
        "https://site.example/__ff_private_uploads__/2026/02"
    );
    assert_eq!(body["baseurl"], "https://site.example/__ff_private_uploads__");
    assert!(service.private_root().join("2026/02").is_dir());

    let response = send(
        service.api(),
        post_json("/api/v0/uploads/target", json!({"subdir": "/../outside"})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_observer_sees_response_bodies() {
    let service = setup_service();
    let observer = Arc::new(RecordingObserver::default());
    let api = privy_daemon::http_server::api_router(
        service.state.clone().with_observer(observer.clone()),
    );

    let response = send(
        api,
        post_json("/api/v0/payload/rewrite", json!({"note": "hello"})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let seen = observer.seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].0, "/api/v0/payload/rewrite");
    assert_eq!(
        serde_json::from_slice::<Value>(&seen[0].1).unwrap(),
        json!({"note": "hello"})
    );
}

#[tokio::test]
async fn test_status_routes() {
    let service = setup_service();

    let response = send(
        service.api(),
        Request::builder()
            .uri("/_status/readyz")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(
        service.api(),
        Request::builder()
            .uri("/nowhere")
            .header(http::header::ACCEPT, "application/json")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_api_grants_no_cross_origin_access() {
    let service = setup_service();

    let preflight = Request::builder()
        .method("OPTIONS")
        .uri("/api/v0/links/mint")
        .header(http::header::ORIGIN, "https://evil.example")
        .header(http::header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .body(Body::empty())
        .unwrap();
    let response = send(service.api(), preflight).await;
    assert!(response
        .headers()
        .get(http::header::ACCESS_CONTROL_ALLOW_ORIGIN)
        .is_none());

    let mut request = post_json("/api/v0/links/mint", json!({"path": "2026/02/cv.pdf"}));
    request.headers_mut().insert(
        http::header::ORIGIN,
        "https://evil.example".parse().unwrap(),
    );
    let response = send(service.api(), request).await;
    assert!(response
        .headers()
        .get(http::header::ACCESS_CONTROL_ALLOW_ORIGIN)
        .is_none());
}
