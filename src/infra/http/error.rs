use std::error::Error as StdError;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::application::{
    content::ContentError, downloads::DownloadError, error::ErrorReport, files::FileUploadError,
    inquiries::InquiryError, repos::RepoError, subscriptions::SubscriptionError,
};
use crate::domain::error::DomainError;
use crate::infra::files::FileStorageError;

const SOURCE: &str = "infra::http::error";

#[derive(Debug, Serialize)]
pub struct ApiErrorBody {
    pub error: ApiErrorMessage,
}

pub mod codes {
    pub const BAD_REQUEST: &str = "bad_request";
    pub const FORBIDDEN: &str = "forbidden";
    pub const NOT_FOUND: &str = "not_found";
    pub const VALIDATION: &str = "validation_error";
    pub const DUPLICATE: &str = "duplicate";
    pub const INVALID_INPUT: &str = "invalid_input";
    pub const INTEGRITY: &str = "integrity_error";
    pub const DB_TIMEOUT: &str = "db_timeout";
    pub const REPO: &str = "repo_error";
    pub const UPLOAD: &str = "upload_error";
    pub const PAYLOAD_TOO_LARGE: &str = "payload_too_large";
    pub const STORAGE: &str = "storage_error";
    pub const NEWSLETTER: &str = "newsletter_error";
}

#[derive(Debug, Serialize)]
pub struct ApiErrorMessage {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: &'static str,
    hint: Option<String>,
    report: Option<ErrorReport>,
}

impl ApiError {
    pub fn new(
        status: StatusCode,
        code: &'static str,
        message: &'static str,
        hint: Option<String>,
    ) -> Self {
        Self {
            status,
            code,
            message,
            hint,
            report: None,
        }
    }

    pub fn bad_request(message: &'static str, hint: Option<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, codes::BAD_REQUEST, message, hint)
    }

    pub fn forbidden(message: &'static str) -> Self {
        Self::new(StatusCode::FORBIDDEN, codes::FORBIDDEN, message, None)
    }

    pub fn not_found(message: &'static str) -> Self {
        Self::new(StatusCode::NOT_FOUND, codes::NOT_FOUND, message, None)
    }

    /// Server-side failure; the client sees only `message`, the logs get the chain.
    pub fn internal(code: &'static str, message: &'static str, source: &dyn StdError) -> Self {
        let status = StatusCode::INTERNAL_SERVER_ERROR;
        Self {
            status,
            code,
            message,
            hint: None,
            report: Some(ErrorReport::from_error(SOURCE, status, source)),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn code(&self) -> &'static str {
        self.code
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let report = self.report.unwrap_or_else(|| {
            ErrorReport::from_message(
                SOURCE,
                self.status,
                format!(
                    "{}: {}",
                    self.code,
                    self.hint.as_deref().unwrap_or(self.message)
                ),
            )
        });
        let body = ApiErrorBody {
            error: ApiErrorMessage {
                code: self.code.to_string(),
                message: self.message.to_string(),
                hint: self.hint,
            },
        };
        let mut response = (self.status, Json(body)).into_response();
        report.attach(&mut response);
        response
    }
}

pub fn repo_to_api(err: RepoError) -> ApiError {
    match err {
        RepoError::Duplicate { constraint } => ApiError::new(
            StatusCode::CONFLICT,
            codes::DUPLICATE,
            "Duplicate record",
            Some(constraint),
        ),
        RepoError::NotFound => ApiError::not_found("Resource not found"),
        RepoError::InvalidInput { message } => ApiError::new(
            StatusCode::BAD_REQUEST,
            codes::INVALID_INPUT,
            "Invalid input",
            Some(message),
        ),
        RepoError::Integrity { message } => ApiError::new(
            StatusCode::CONFLICT,
            codes::INTEGRITY,
            "Integrity constraint violated",
            Some(message),
        ),
        RepoError::Timeout => ApiError::new(
            StatusCode::SERVICE_UNAVAILABLE,
            codes::DB_TIMEOUT,
            "Database timeout",
            None,
        ),
        err @ RepoError::Persistence(_) => ApiError::internal(codes::REPO, "Persistence error", &err),
    }
}

pub fn domain_to_api(err: DomainError) -> ApiError {
    match err {
        DomainError::Validation { message } => ApiError::new(
            StatusCode::BAD_REQUEST,
            codes::VALIDATION,
            "Validation failed",
            Some(message),
        ),
        DomainError::NotFound { entity } => ApiError::new(
            StatusCode::NOT_FOUND,
            codes::NOT_FOUND,
            "Resource not found",
            Some(entity.to_string()),
        ),
    }
}

pub fn storage_to_api(err: FileStorageError) -> ApiError {
    match err {
        FileStorageError::InvalidPath => {
            ApiError::bad_request("Invalid file path", Some(err.to_string()))
        }
        FileStorageError::PayloadTooLarge { .. } | FileStorageError::SizeOverflow => ApiError::new(
            StatusCode::PAYLOAD_TOO_LARGE,
            codes::PAYLOAD_TOO_LARGE,
            "Uploaded file is too large",
            None,
        ),
        FileStorageError::PayloadStream { .. } => ApiError::new(
            StatusCode::BAD_REQUEST,
            codes::UPLOAD,
            "Failed to read upload",
            Some(err.to_string()),
        ),
        FileStorageError::EmptyPayload => ApiError::new(
            StatusCode::BAD_REQUEST,
            codes::UPLOAD,
            "Uploaded file is empty",
            None,
        ),
        FileStorageError::Io(_) => {
            ApiError::internal(codes::STORAGE, "File storage unavailable", &err)
        }
    }
}

pub fn subscription_to_api(err: SubscriptionError) -> ApiError {
    match err {
        SubscriptionError::Domain(err) => domain_to_api(err),
        SubscriptionError::UnknownToken => ApiError::not_found("Subscription not found"),
        SubscriptionError::Repo(err) => repo_to_api(err),
    }
}

pub fn inquiry_to_api(err: InquiryError) -> ApiError {
    match err {
        InquiryError::Domain(err) => domain_to_api(err),
        InquiryError::Repo(err) => repo_to_api(err),
    }
}

pub fn content_to_api(err: ContentError) -> ApiError {
    match err {
        ContentError::Domain(err) => domain_to_api(err),
        ContentError::NotFound { .. } => ApiError::not_found("Content not found"),
        ContentError::Repo(err) => repo_to_api(err),
        err @ ContentError::Newsletter(_) => {
            ApiError::internal(codes::NEWSLETTER, "Newsletter dispatch failed", &err)
        }
    }
}

pub fn download_to_api(err: DownloadError) -> ApiError {
    match err {
        DownloadError::ResourceNotFound(_) => ApiError::not_found("Resource not found"),
        DownloadError::NotPublished(_) => ApiError::forbidden("Resource is not published"),
        DownloadError::FileReferenceMissing(_) | DownloadError::FileMissing(_) => {
            ApiError::not_found("File not found")
        }
        DownloadError::Repo(err) => repo_to_api(err),
        DownloadError::Storage(err) => storage_to_api(err),
    }
}

pub fn upload_to_api(err: FileUploadError) -> ApiError {
    match err {
        FileUploadError::Domain(err) => domain_to_api(err),
        FileUploadError::Storage(err) => storage_to_api(err),
        FileUploadError::Repo(err) => repo_to_api(err),
    }
}
