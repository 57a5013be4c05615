use axum::{
    extract::State, http::StatusCode, response::IntoResponse, routing::MethodRouter, Router,
};
use model::{catalog::NewComment, Comment};
use serde::Serialize;
use storage::social;
use tracing::instrument;
use uuid::Uuid;

use crate::{
    auth::ApiAuth,
    extract::{ApiJson, ApiPath},
    routes::{templates::visible_template, Pagination},
    ApiResponse, AppResult, AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/:id/likes", MethodRouter::new().get(like_status).post(toggle_like))
        .route("/:id/comments", MethodRouter::new().get(comments).post(add_comment))
}

#[instrument(skip_all, name = "like_status", fields(%id))]
async fn like_status(
    State(state): State<AppState>,
    ApiAuth(session): ApiAuth,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<impl IntoResponse> {
    let conn = state.conn().await?;
    visible_template(&conn, id, Some(session.user), session.is_admin).await?;
    Ok(ApiResponse(social::like_status(&conn, id, session.user).await?))
}

#[instrument(skip_all, name = "toggle_like", fields(%id))]
async fn toggle_like(
    State(state): State<AppState>,
    ApiAuth(session): ApiAuth,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<impl IntoResponse> {
    let conn = state.conn().await?;
    visible_template(&conn, id, Some(session.user), session.is_admin).await?;
    Ok(ApiResponse(social::toggle_like(&conn, id, session.user).await?))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CommentPage {
    comments: Vec<Comment>,
    total_comments: i64,
    current_page: u32,
    total_pages: i64,
}

#[instrument(skip_all, name = "list_comments", fields(%id))]
async fn comments(
    State(state): State<AppState>,
    ApiAuth(session): ApiAuth,
    ApiPath(id): ApiPath<Uuid>,
    pagination: Pagination,
) -> AppResult<impl IntoResponse> {
    let conn = state.conn().await?;
    visible_template(&conn, id, Some(session.user), session.is_admin).await?;
    let comments =
        social::comments(&conn, id, pagination.limit(), pagination.offset()).await?;
    let total = social::comment_count(&conn, id).await?;
    Ok(ApiResponse(CommentPage {
        comments,
        total_comments: total,
        current_page: pagination.page(),
        total_pages: pagination.total_pages(total),
    }))
}

#[instrument(skip_all, name = "add_comment", fields(%id))]
async fn add_comment(
    State(state): State<AppState>,
    ApiAuth(session): ApiAuth,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(comment): ApiJson<NewComment>,
) -> AppResult<impl IntoResponse> {
    comment.validate()?;
    let conn = state.conn().await?;
    visible_template(&conn, id, Some(session.user), session.is_admin).await?;
    let comment = social::add_comment(&conn, id, session.user, comment.content.trim()).await?;
    Ok((StatusCode::CREATED, ApiResponse(comment)))
}
