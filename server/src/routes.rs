use axum::{
    extract::{FromRequestParts, Query},
    http::request::Parts,
    routing::get,
    Router,
};
use serde::Deserialize;
use tower::ServiceBuilder;

use crate::{error::Error, AppState, PAGE_LIMIT};

mod admin;
mod catalog;
mod search;
mod social;
mod submissions;
mod templates;
mod user;

pub fn setup_router() -> Router<AppState> {
    let middlewares = ServiceBuilder::new().layer(crate::telemetry::middleware::new());
    Router::new()
        .route("/api/ping", get(ping))
        .nest("/api/templates", templates::router().merge(social::router()))
        .nest("/api/submissions", submissions::router())
        .nest("/api/tags", catalog::tag_router())
        .nest("/api/topics", catalog::topic_router())
        .nest("/api/search", search::router())
        .nest("/api/user", user::profile_router())
        .nest("/api/users", user::search_router())
        .nest("/api/admin", admin::router())
        .layer(middlewares)
}

async fn ping() -> &'static str {
    "Pong!"
}

const DEFAULT_PAGE_SIZE: u16 = 10;

/// `page` (1-based) and `limit` query parameters of paged endpoints.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Pagination {
    #[serde(default = "first_page")]
    pub page: u32,
    #[serde(default = "default_limit")]
    pub limit: u16,
}

fn first_page() -> u32 {
    1
}

fn default_limit() -> u16 {
    DEFAULT_PAGE_SIZE
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: first_page(),
            limit: default_limit(),
        }
    }
}

impl Pagination {
    pub fn limit(&self) -> i64 {
        self.limit.clamp(1, PAGE_LIMIT) as i64
    }

    pub fn offset(&self) -> i64 {
        (self.page.max(1) as i64 - 1) * self.limit()
    }

    pub fn page(&self) -> u32 {
        self.page.max(1)
    }

    /// Number of pages needed for `total` items.
    pub fn total_pages(&self, total: i64) -> i64 {
        let limit = self.limit();
        (total + limit - 1) / limit
    }
}

#[axum::async_trait]
impl<S: Send + Sync> FromRequestParts<S> for Pagination {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(pagination) = Query::<Pagination>::from_request_parts(parts, state).await?;
        Ok(pagination)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_is_clamped() {
        let pagination = Pagination {
            page: 0,
            limit: 500,
        };
        assert_eq!(pagination.limit(), PAGE_LIMIT as i64);
        assert_eq!(pagination.offset(), 0);
        assert_eq!(pagination.page(), 1);
    }

    #[test]
    fn pagination_offset_and_pages() {
        let pagination = Pagination { page: 3, limit: 10 };
        assert_eq!(pagination.offset(), 20);
        assert_eq!(pagination.total_pages(0), 0);
        assert_eq!(pagination.total_pages(21), 3);
        assert_eq!(Pagination::default().limit(), 10);
    }
}
