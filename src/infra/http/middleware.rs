use std::time::Instant;

use axum::{
    body::Body,
    http::{HeaderName, HeaderValue, Request},
    middleware::Next,
    response::Response,
};
use tracing::{error, warn};
use uuid::Uuid;

use crate::{application::error::ErrorReport, domain::types::ContentKind};

const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");
const CONTENT_PATH_PREFIX: &str = "/api/v1/content/";

#[derive(Clone)]
pub struct RequestContext {
    pub request_id: String,
}

pub async fn set_request_context(mut request: Request<Body>, next: Next) -> Response {
    let request_id = Uuid::new_v4().to_string();
    let ctx = RequestContext {
        request_id: request_id.clone(),
    };
    request.extensions_mut().insert(ctx.clone());

    let mut response = next.run(request).await;
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response.extensions_mut().insert(ctx);
    response
}

/// Content kind named by an admin content path, with the `job` alias resolved.
fn content_kind_of(path: &str) -> Option<ContentKind> {
    path.strip_prefix(CONTENT_PATH_PREFIX)
        .and_then(|rest| rest.split('/').next())
        .and_then(ContentKind::parse)
}

/// Log failed requests using the `ErrorReport` attached by the handler.
pub async fn log_responses(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let content_kind = content_kind_of(uri.path()).map(ContentKind::as_str);
    let start = Instant::now();

    let request_id = request
        .extensions()
        .get::<RequestContext>()
        .map(|ctx| ctx.request_id.clone())
        .unwrap_or_default();

    let mut response = next.run(request).await;
    let status = response.status();

    if status.is_client_error() || status.is_server_error() {
        let elapsed_ms = start.elapsed().as_millis();
        let report = response.extensions_mut().remove::<ErrorReport>();
        let (source, messages) = match report {
            Some(report) => (report.source, report.messages),
            None => ("unknown", Vec::new()),
        };
        let detail = messages
            .first()
            .cloned()
            .unwrap_or_else(|| "no diagnostic available".to_string());

        if status.is_server_error() {
            error!(
                target = "tidings::http::response",
                status = status.as_u16(),
                method = %method,
                path = %uri.path(),
                content_kind = content_kind,
                elapsed_ms = elapsed_ms,
                source = source,
                detail = %detail,
                chain = ?messages,
                request_id = request_id,
                "request failed",
            );
        } else {
            warn!(
                target = "tidings::http::response",
                status = status.as_u16(),
                method = %method,
                path = %uri.path(),
                content_kind = content_kind,
                elapsed_ms = elapsed_ms,
                source = source,
                detail = %detail,
                request_id = request_id,
                "client request error",
            );
        }
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_kind_is_read_from_admin_paths() {
        assert_eq!(
            content_kind_of("/api/v1/content/job/0f9c"),
            Some(ContentKind::Careers)
        );
        assert_eq!(
            content_kind_of("/api/v1/content/webinar"),
            Some(ContentKind::Webinar)
        );
        assert_eq!(content_kind_of("/api/v1/content/podcast"), None);
        assert_eq!(content_kind_of("/resources/0f9c/download"), None);
    }
}
