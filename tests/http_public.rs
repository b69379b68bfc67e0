mod support;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, StatusCode, header};
use axum::response::Response;
use bytes::Bytes;
use futures::stream;
use serde_json::{Value, json};
use support::{Harness, MemoryStore, SITE_URL, content_record};
use tidings::application::newsletter::NewsletterTask;
use tidings::application::repos::FilesRepo;
use tidings::domain::entities::FileRecord;
use tidings::domain::types::ContentKind;
use tidings::infra::files::FileStorageError;
use time::OffsetDateTime;
use tower::ServiceExt;
use uuid::Uuid;

async fn send(router: Router, request: Request<Body>) -> Response {
    router.oneshot(request).await.expect("router is infallible")
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("request")
}

async fn json_body(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    serde_json::from_slice(&bytes).expect("json body")
}

#[tokio::test]
async fn subscribe_returns_subscriber_without_token() {
    let harness = Harness::new();

    let response = send(
        harness.public_router(),
        post_json(
            "/newsletter-subscriptions",
            json!({ "name": "Lin", "email": "Lin@Example.com", "categories": ["job"] }),
        ),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["email"], "lin@example.com");
    assert_eq!(body["categories"], json!(["careers"]));
    assert_eq!(body["subscribed"], true);
    assert!(body.get("unsubscribe_token").is_none());
}

#[tokio::test]
async fn invalid_subscription_uses_error_envelope() {
    let harness = Harness::new();

    let response = send(
        harness.public_router(),
        post_json("/newsletter-subscriptions", json!({ "name": "Lin" })),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], "validation_error");
    assert!(body["error"]["hint"].is_string());
}

#[tokio::test]
async fn malformed_json_is_a_bad_request() {
    let harness = Harness::new();

    let request = Request::builder()
        .method(Method::POST)
        .uri("/inquiries")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"name\":"))
        .expect("request");
    let response = send(harness.public_router(), request).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], "bad_request");
}

#[tokio::test]
async fn unsubscribe_by_token() {
    let harness = Harness::new();
    let subscriber = harness
        .store
        .insert_subscriber("reader@example.com", &["all"], true);

    let uri = format!(
        "/newsletter-subscriptions/unsubscribe/{}",
        subscriber.unsubscribe_token
    );
    let response = send(
        harness.public_router(),
        Request::builder()
            .method(Method::POST)
            .uri(&uri)
            .body(Body::empty())
            .expect("request"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["subscribed"], false);

    let response = send(
        harness.public_router(),
        Request::builder()
            .method(Method::POST)
            .uri("/newsletter-subscriptions/unsubscribe/unknown")
            .body(Body::empty())
            .expect("request"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn newsletter_unsubscribe_link_resolves_on_public_router() {
    let harness = Harness::new();
    harness
        .store
        .insert_subscriber("reader@example.com", &["blog"], true);
    harness
        .newsletter
        .broadcast(ContentKind::Blog, &content_record(ContentKind::Blog, "Launch"))
        .await
        .expect("batch settles");

    let sent = harness.mailer.sent();
    let link = sent[0]
        .text
        .lines()
        .find_map(|line| line.strip_prefix("Unsubscribe: "))
        .expect("unsubscribe link in text body");
    let path = link.strip_prefix(SITE_URL).expect("link under site url");

    let response = send(harness.public_router(), get(&format!("/{path}"))).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["subscribed"], false);
    assert!(!harness.store.subscribers()[0].subscribed);
}

#[tokio::test]
async fn inquiry_is_created_and_team_notified() {
    let mut harness = Harness::new();

    let response = send(
        harness.public_router(),
        post_json(
            "/inquiries",
            json!({
                "name": "Ada",
                "email": "ada@example.com",
                "company": "Analytical Engines",
                "message": "Pricing?"
            }),
        ),
    )
    .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = json_body(response).await;
    assert!(body["id"].is_string());
    assert!(body["created_at"].is_string());
    assert!(matches!(
        harness.drain_tasks().as_slice(),
        [NewsletterTask::Notify(_)]
    ));
}

#[tokio::test]
async fn download_sets_attachment_headers() {
    let harness = Harness::new();
    let stored = harness
        .storage
        .store_stream(
            "Annual Report.pdf",
            stream::iter([Ok::<_, FileStorageError>(Bytes::from_static(b"report body"))]),
        )
        .await
        .expect("stored");
    let file = FileRecord {
        id: Uuid::new_v4(),
        name: "Annual Report.pdf".into(),
        hash: stored.hash,
        ext: stored.ext,
        mime: Some("application/pdf".into()),
        size_bytes: stored.size_bytes,
        created_at: OffsetDateTime::now_utc(),
    };
    harness
        .store
        .insert_file(file.clone())
        .await
        .expect("file row");
    let mut resource = content_record(ContentKind::Resource, "Annual report");
    resource.published = true;
    resource.file_id = Some(file.id);
    harness.store.insert_content(resource.clone());

    let response = send(
        harness.public_router(),
        get(&format!("/resources/{}/download", resource.id)),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert_eq!(headers[header::CONTENT_TYPE], "application/pdf");
    assert_eq!(
        headers[header::CONTENT_DISPOSITION],
        "attachment; filename=\"Annual%20Report.pdf\""
    );
    assert_eq!(headers[header::CONTENT_LENGTH], "11");
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    assert_eq!(&bytes[..], b"report body");
}

#[tokio::test]
async fn download_precondition_statuses() {
    let harness = Harness::new();
    let draft = content_record(ContentKind::Resource, "Draft");
    harness.store.insert_content(draft.clone());
    let mut bare = content_record(ContentKind::Resource, "No file");
    bare.published = true;
    harness.store.insert_content(bare.clone());

    for (uri, status) in [
        (format!("/resources/{}/download", Uuid::new_v4()), StatusCode::NOT_FOUND),
        ("/resources/not-a-uuid/download".to_string(), StatusCode::NOT_FOUND),
        (format!("/resources/{}/download", draft.id), StatusCode::FORBIDDEN),
        (format!("/resources/{}/download", bare.id), StatusCode::NOT_FOUND),
    ] {
        let response = send(harness.public_router(), get(&uri)).await;
        assert_eq!(response.status(), status, "{uri}");
    }
}

#[tokio::test]
async fn health_reflects_database_reachability() {
    let harness = Harness::new();

    let response = send(harness.public_router(), get("/_health/db")).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(response.headers().contains_key("x-request-id"));

    MemoryStore::fail(&harness.store.fail_ping);
    let response = send(harness.public_router(), get("/_health/db")).await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}
