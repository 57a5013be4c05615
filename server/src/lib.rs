use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    BoxError, Json,
};
use serde::Serialize;

pub mod auth;
pub mod config;
pub mod error;
pub mod extract;
pub mod routes;
pub mod setup;
mod state;
pub mod telemetry;

pub use state::*;

#[doc(hidden)]
pub mod test_util;

pub type AppResult<T> = Result<T, error::Error>;

/// Upper bound for `limit` on paged endpoints.
pub const PAGE_LIMIT: u16 = 50;

/// A successful JSON response.
pub struct ApiResponse<T>(pub T);

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        Json(self.0).into_response()
    }
}

mod embedded {
    use refinery::embed_migrations;
    embed_migrations!("./migrations/");
}

async fn handle_timeout_error(err: BoxError) -> (StatusCode, String) {
    if err.is::<tower::timeout::error::Elapsed>() {
        (
            StatusCode::REQUEST_TIMEOUT,
            "Request took too long".to_string(),
        )
    } else {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Unhandled internal error: {}", err),
        )
    }
}
