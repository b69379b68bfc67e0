use std::sync::Arc;

use axum::{
    Json, Router,
    body::Body,
    extract::{Path, State, rejection::JsonRejection},
    http::{
        HeaderValue, StatusCode,
        header::{CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE},
    },
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use url::form_urlencoded;
use uuid::Uuid;

use crate::application::{
    downloads::{DownloadService, PreparedDownload},
    inquiries::InquiryService,
    repos::HealthRepo,
    subscriptions::SubscriptionService,
};

use super::{
    db_health_response,
    error::{ApiError, download_to_api, inquiry_to_api, subscription_to_api},
    json_payload,
    middleware::{log_responses, set_request_context},
    models::{InquiryRequest, InquiryResponse, SubscribeRequest, SubscriberResponse},
};

const OCTET_STREAM: &str = "application/octet-stream";

#[derive(Clone)]
pub struct PublicState {
    pub subscriptions: Arc<SubscriptionService>,
    pub inquiries: Arc<InquiryService>,
    pub downloads: Arc<DownloadService>,
    pub health: Arc<dyn HealthRepo>,
}

pub fn build_public_router(state: PublicState) -> Router {
    Router::new()
        .route("/newsletter-subscriptions", post(subscribe))
        .route(
            "/newsletter-subscriptions/unsubscribe/{token}",
            post(unsubscribe),
        )
        // Target of the link embedded in every newsletter.
        .route("/newsletter/unsubscribe/{token}", get(unsubscribe))
        .route("/resources/{id}/download", get(download_resource))
        .route("/inquiries", post(submit_inquiry))
        .route("/_health/db", get(public_health))
        .with_state(state)
        .layer(middleware::from_fn(log_responses))
        .layer(middleware::from_fn(set_request_context))
}

async fn subscribe(
    State(state): State<PublicState>,
    payload: Result<Json<SubscribeRequest>, JsonRejection>,
) -> Result<Json<SubscriberResponse>, ApiError> {
    let request = json_payload(payload)?;
    let subscriber = state
        .subscriptions
        .subscribe(request.into())
        .await
        .map_err(subscription_to_api)?;
    Ok(Json(subscriber.into()))
}

async fn unsubscribe(
    State(state): State<PublicState>,
    Path(token): Path<String>,
) -> Result<Json<SubscriberResponse>, ApiError> {
    let subscriber = state
        .subscriptions
        .unsubscribe(&token)
        .await
        .map_err(subscription_to_api)?;
    Ok(Json(subscriber.into()))
}

async fn submit_inquiry(
    State(state): State<PublicState>,
    payload: Result<Json<InquiryRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let request = json_payload(payload)?;
    let inquiry = state
        .inquiries
        .submit(request.into())
        .await
        .map_err(inquiry_to_api)?;
    Ok((StatusCode::CREATED, Json(InquiryResponse::from(inquiry))))
}

async fn download_resource(
    State(state): State<PublicState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    // A malformed id cannot name a resource.
    let id = Uuid::parse_str(&id).map_err(|_| ApiError::not_found("Resource not found"))?;
    let prepared = state.downloads.prepare(id).await.map_err(download_to_api)?;
    Ok(build_download_response(prepared))
}

async fn public_health(State(state): State<PublicState>) -> Response {
    db_health_response(state.health.ping().await)
}

fn build_download_response(prepared: PreparedDownload) -> Response {
    let PreparedDownload { file, body, .. } = prepared;
    let mut response = Response::new(Body::from_stream(body));
    *response.status_mut() = StatusCode::OK;

    let headers = response.headers_mut();
    let mime = file.mime.as_deref().unwrap_or(OCTET_STREAM);
    let content_type = HeaderValue::from_str(mime)
        .unwrap_or_else(|_| HeaderValue::from_static(OCTET_STREAM));
    headers.insert(CONTENT_TYPE, content_type);
    if let Ok(value) = HeaderValue::from_str(&content_disposition(&file.name)) {
        headers.insert(CONTENT_DISPOSITION, value);
    }
    if let Ok(value) = HeaderValue::from_str(&file.size_bytes.to_string()) {
        headers.insert(CONTENT_LENGTH, value);
    }

    response
}

/// `attachment` disposition with the original name percent-encoded.
fn content_disposition(original_name: &str) -> String {
    let encoded: String = form_urlencoded::byte_serialize(original_name.as_bytes())
        .collect::<String>()
        .replace('+', "%20");
    format!("attachment; filename=\"{encoded}\"")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disposition_percent_encodes_names() {
        assert_eq!(
            content_disposition("Annual Report.pdf"),
            "attachment; filename=\"Annual%20Report.pdf\""
        );
        assert_eq!(
            content_disposition("résumé \"v2\".pdf"),
            "attachment; filename=\"r%C3%A9sum%C3%A9%20%22v2%22.pdf\""
        );
    }
}
