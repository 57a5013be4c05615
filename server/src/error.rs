use std::{
    borrow::Cow,
    fmt::Debug,
    sync::Arc,
};

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use deadpool_postgres::PoolError;
use derive_more::{Display, From};
use jsonwebtoken::errors::{Error as JwtError, ErrorKind as JwtErrorKind};
use model::{
    error::{FieldError, PayloadError, ValidationFailure},
    reconcile::ReconcileError,
};
use serde::Serialize;
use storage::StorageError;
use tokio::time::error::Elapsed;
use tracing_error::SpanTrace;

use crate::auth::AuthError;

pub struct Error {
    kind: ErrorKind,
    response_error: ResponseError,
    trace: Option<SpanTrace>,
}

impl Debug for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Error")
            .field("kind", &self.kind)
            .field("trace", &self.trace)
            .finish()
    }
}

impl Error {
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    pub fn trace(&self) -> Option<&SpanTrace> {
        self.trace.as_ref()
    }

    pub fn format_trace(&self) -> Option<String> {
        self.trace
            .as_ref()
            .map(|trace| WrappedTrace(trace).to_string())
    }
}

struct WrappedTrace<'a>(&'a SpanTrace);

impl<'a> Display for WrappedTrace<'a> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut result = Ok(());
        self.0.with_spans(|metadata, _| {
            if let Some((file, line)) = metadata.file().zip(metadata.line()) {
                result = write!(f, "\nat {}:{} ({})", file, line, metadata.name());
            }
            result.is_ok()
        });
        result
    }
}

#[derive(Debug, Display)]
#[display("{status} '{message}'")]
pub struct ApiError {
    status: StatusCode,
    message: Cow<'static, str>,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn not_found(message: &'static str) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn forbidden(message: &'static str) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }

    pub fn bad_request(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }
}

#[derive(Debug, Display, derive_more::Error, From)]
pub enum ErrorKind {
    #[display("Status: {}", _0)]
    Status(#[error(not(source))] StatusCode),
    #[display("Api: {}", _0)]
    Api(#[error(not(source))] ApiError),
    #[display("Deadpool: {}", _0)]
    PoolError(PoolError),
    #[display("Storage: {}", _0)]
    Storage(StorageError),
    #[display("{}", _0)]
    Auth(#[error(not(source))] AuthError),
    #[display("JWT: {}", _0)]
    Jwt(JwtError),
    #[display("Validation: {}", _0)]
    Validation(ValidationFailure),
    #[display("Payload: {}", _0)]
    Payload(PayloadError),
    #[display("Timed out: {}", _0)]
    Timeout(Elapsed),
    #[display("Json: {}", _0)]
    Json(JsonRejection),
    #[display("Query: {}", _0)]
    Query(QueryRejection),
    #[display("Path: {}", _0)]
    Path(PathRejection),
}

impl From<tokio_postgres::Error> for ErrorKind {
    fn from(value: tokio_postgres::Error) -> Self {
        Self::Storage(value.into())
    }
}

impl ErrorKind {
    pub fn not_found() -> Self {
        Self::Status(StatusCode::NOT_FOUND)
    }
    pub fn forbidden() -> Self {
        Self::Status(StatusCode::FORBIDDEN)
    }
    pub fn internal() -> Self {
        Self::Status(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl<T: Into<ErrorKind>> From<T> for Error {
    fn from(value: T) -> Self {
        let value: ErrorKind = value.into();
        let response_error = value.response();
        let trace = response_error
            .status
            .is_server_error()
            .then(SpanTrace::capture);
        Self {
            kind: value,
            response_error,
            trace,
        }
    }
}

fn jwt_response(err: &JwtError) -> ResponseError {
    let status = StatusCode::UNAUTHORIZED;
    match err.kind() {
        JwtErrorKind::InvalidToken | JwtErrorKind::Base64(_) => (status, "JWT: Malformed").into(),
        JwtErrorKind::InvalidSignature => (status, "JWT: Invalid signature").into(),
        JwtErrorKind::ExpiredSignature => (status, "JWT: Expired").into(),
        JwtErrorKind::ImmatureSignature => (status, "JWT: Immature signature").into(),
        JwtErrorKind::InvalidAudience => (status, "JWT: Invalid audience").into(),
        JwtErrorKind::InvalidIssuer => (status, "JWT: Invalid issuer").into(),
        JwtErrorKind::InvalidSubject => (status, "JWT: Invalid subject").into(),
        JwtErrorKind::InvalidAlgorithm => (status, "JWT: Invalid algorithm").into(),
        JwtErrorKind::MissingRequiredClaim(_) | JwtErrorKind::Json(_) | JwtErrorKind::Utf8(_) => {
            (status, "JWT: Invalid claims").into()
        }
        _ => StatusCode::INTERNAL_SERVER_ERROR.into(),
    }
}

fn storage_response(err: &StorageError) -> ResponseError {
    match err {
        StorageError::NotFound => (StatusCode::NOT_FOUND, "Not found").into(),
        StorageError::Conflict(_) => {
            (StatusCode::CONFLICT, "A record with the same key already exists").into()
        }
        StorageError::MissingReference(_) => (
            StatusCode::CONFLICT,
            "Referenced tag, topic or user does not exist",
        )
            .into(),
        StorageError::Reconcile(ReconcileError::DuplicateTitle { .. }) => {
            (StatusCode::CONFLICT, "Field titles must be unique").into()
        }
        StorageError::Reconcile(err @ ReconcileError::DuplicateField { .. }) => {
            (StatusCode::CONFLICT, err.to_string()).into()
        }
        StorageError::Pool(_) | StorageError::Database(_) | StorageError::UnsupportedFieldType(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into()
        }
    }
}

#[derive(Clone, Debug)]
pub struct ResponseError {
    status: StatusCode,
    message: Option<Cow<'static, str>>,
    errors: Option<Vec<FieldError>>,
}

impl ResponseError {
    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<StatusCode> for ResponseError {
    fn from(status: StatusCode) -> Self {
        Self {
            status,
            message: status.canonical_reason().map(Cow::Borrowed),
            errors: None,
        }
    }
}
impl From<(StatusCode, &'static str)> for ResponseError {
    fn from(value: (StatusCode, &'static str)) -> Self {
        Self {
            status: value.0,
            message: Some(Cow::Borrowed(value.1)),
            errors: None,
        }
    }
}
impl From<(StatusCode, String)> for ResponseError {
    fn from(value: (StatusCode, String)) -> Self {
        Self {
            status: value.0,
            message: Some(Cow::Owned(value.1)),
            errors: None,
        }
    }
}

impl IntoResponse for ResponseError {
    fn into_response(self) -> Response {
        let cow = self.message.unwrap_or(Cow::Borrowed(""));
        (
            self.status,
            Json(JsonErrorResponse {
                success: false,
                message: cow,
                errors: self.errors,
            }),
        )
            .into_response()
    }
}

#[derive(Serialize)]
struct JsonErrorResponse {
    success: bool,
    message: Cow<'static, str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<Vec<FieldError>>,
}

impl ErrorKind {
    fn response(&self) -> ResponseError {
        match self {
            ErrorKind::PoolError(_) | ErrorKind::Timeout(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into()
            }
            ErrorKind::Storage(err) => storage_response(err),
            ErrorKind::Status(status) => (*status).into(),
            ErrorKind::Api(err) => (err.status, err.message.to_string()).into(),
            ErrorKind::Jwt(err) => jwt_response(err),
            ErrorKind::Auth(auth) => {
                let status = StatusCode::UNAUTHORIZED;
                match auth {
                    AuthError::MissingHeader => (status, "Authorization header missing").into(),
                    AuthError::InvalidHeader => (status, "Authorization header is invalid").into(),
                    AuthError::Blocked => (StatusCode::FORBIDDEN, "Your account is blocked").into(),
                    AuthError::Deleted => (status, "Your account no longer exists").into(),
                    AuthError::NotAdmin => {
                        (StatusCode::FORBIDDEN, "Forbidden: User is not an admin").into()
                    }
                }
            }
            ErrorKind::Validation(failure) => ResponseError {
                status: StatusCode::BAD_REQUEST,
                message: Some(Cow::Borrowed("Validation failed")),
                errors: Some(failure.errors.clone()),
            },
            ErrorKind::Payload(err) => (StatusCode::BAD_REQUEST, err.message().to_owned()).into(),
            ErrorKind::Json(json) => (json.status(), json.body_text()).into(),
            ErrorKind::Query(query) => (query.status(), query.body_text()).into(),
            ErrorKind::Path(path) => (path.status(), path.body_text()).into(),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let mut response = self.response_error.clone().into_response();
        response.extensions_mut().insert(Arc::new(self));
        response
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;

    #[test]
    fn validation_failure_is_bad_request() {
        let failure = ValidationFailure {
            errors: vec![FieldError::new(Uuid::nil(), "This field is required")],
        };
        let error = Error::from(failure);
        assert_eq!(error.response_error.status(), StatusCode::BAD_REQUEST);
        assert_eq!(error.response_error.errors.as_ref().map(Vec::len), Some(1));
        assert!(error.trace().is_none());
    }

    #[test]
    fn storage_errors_map_to_status() {
        let not_found = Error::from(StorageError::NotFound);
        assert_eq!(not_found.response_error.status(), StatusCode::NOT_FOUND);

        let duplicate = Error::from(StorageError::Reconcile(ReconcileError::DuplicateField {
            id: Uuid::nil(),
        }));
        assert_eq!(duplicate.response_error.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn deleted_user_is_unauthorized() {
        let error = Error::from(AuthError::Deleted);
        assert_eq!(error.response_error.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn blocked_user_is_forbidden() {
        let error = Error::from(AuthError::Blocked);
        assert_eq!(error.response_error.status(), StatusCode::FORBIDDEN);
    }
}
