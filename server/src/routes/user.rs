use axum::{extract::State, response::IntoResponse, routing::get, Router};
use model::user::{ProfileUpdate, UserSearchHit};
use serde::{Deserialize, Serialize};
use storage::user;
use tracing::instrument;

use crate::{
    auth::ApiAuth,
    error::ApiError,
    extract::{ApiJson, ApiQuery},
    routes::Pagination,
    ApiResponse, AppResult, AppState,
};

pub fn profile_router() -> Router<AppState> {
    Router::new().route("/profile", get(profile).patch(update_profile))
}

pub fn search_router() -> Router<AppState> {
    Router::new().route("/search", get(search))
}

#[instrument(skip_all, name = "profile")]
async fn profile(
    State(state): State<AppState>,
    ApiAuth(session): ApiAuth,
) -> AppResult<impl IntoResponse> {
    let conn = state.conn().await?;
    let user = user::find(&conn, session.user)
        .await?
        .ok_or(ApiError::not_found("User not found"))?;
    Ok(ApiResponse(user))
}

#[instrument(skip_all, name = "update_profile")]
async fn update_profile(
    State(state): State<AppState>,
    ApiAuth(session): ApiAuth,
    ApiJson(update): ApiJson<ProfileUpdate>,
) -> AppResult<impl IntoResponse> {
    update.validate()?;
    let conn = state.conn().await?;
    Ok(ApiResponse(
        user::update_profile(&conn, session.user, &update).await?,
    ))
}

#[derive(Debug, Deserialize)]
pub(super) struct UserQuery {
    #[serde(default)]
    pub q: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchPage {
    users: Vec<UserSearchHit>,
    has_more: bool,
    total: i64,
}

#[instrument(skip_all, name = "search_users")]
async fn search(
    State(state): State<AppState>,
    _auth: ApiAuth,
    ApiQuery(query): ApiQuery<UserQuery>,
    pagination: Pagination,
) -> AppResult<impl IntoResponse> {
    let conn = state.conn().await?;
    let (users, total) = user::search(
        &conn,
        query.q.trim(),
        pagination.limit(),
        pagination.offset(),
    )
    .await?;
    let has_more = pagination.offset() + (users.len() as i64) < total;
    Ok(ApiResponse(SearchPage {
        users,
        has_more,
        total,
    }))
}
