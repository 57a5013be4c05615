use axum::{
    extract::State, http::StatusCode, response::IntoResponse, routing::get, Router,
};
use model::catalog::NewTag;
use storage::catalog;
use tracing::instrument;

use crate::{auth::ApiAuth, extract::ApiJson, ApiResponse, AppResult, AppState};

pub fn tag_router() -> Router<AppState> {
    Router::new().route("/", get(list_tags).post(create_tag))
}

pub fn topic_router() -> Router<AppState> {
    Router::new().route("/", get(list_topics))
}

#[instrument(skip_all, name = "list_tags")]
async fn list_tags(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let conn = state.conn().await?;
    Ok(ApiResponse(catalog::tags(&conn).await?))
}

#[instrument(skip_all, name = "create_tag")]
async fn create_tag(
    State(state): State<AppState>,
    _auth: ApiAuth,
    ApiJson(tag): ApiJson<NewTag>,
) -> AppResult<impl IntoResponse> {
    let name = tag.normalized()?;
    let conn = state.conn().await?;
    let (tag, created) = catalog::find_or_create_tag(&conn, name).await?;
    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, ApiResponse(tag)))
}

#[instrument(skip_all, name = "list_topics")]
async fn list_topics(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let conn = state.conn().await?;
    Ok(ApiResponse(catalog::topics(&conn).await?))
}
