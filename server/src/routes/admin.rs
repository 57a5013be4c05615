use axum::{extract::State, response::IntoResponse, routing::get, Router};
use model::user::{AdminUser, UserStatusUpdate};
use serde::{Deserialize, Serialize};
use serde_json::json;
use storage::user;
use tracing::instrument;
use uuid::Uuid;

use crate::{
    auth::AdminAuth,
    error::ApiError,
    extract::{ApiJson, ApiQuery},
    routes::{user::UserQuery, Pagination},
    ApiResponse, AppResult, AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/users", get(list).put(update_status).delete(delete))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UserPage {
    users: Vec<AdminUser>,
    total: i64,
    current_page: u32,
    total_pages: i64,
}

#[instrument(skip_all, name = "admin_list_users")]
async fn list(
    State(state): State<AppState>,
    _admin: AdminAuth,
    ApiQuery(query): ApiQuery<UserQuery>,
    pagination: Pagination,
) -> AppResult<impl IntoResponse> {
    let conn = state.conn().await?;
    let (users, total) = user::admin_list(
        &conn,
        query.q.trim(),
        pagination.limit(),
        pagination.offset(),
    )
    .await?;
    Ok(ApiResponse(UserPage {
        users,
        total,
        current_page: pagination.page(),
        total_pages: pagination.total_pages(total),
    }))
}

#[instrument(skip_all, name = "admin_update_user", fields(user_id = %update.user_id))]
async fn update_status(
    State(state): State<AppState>,
    AdminAuth(admin): AdminAuth,
    ApiJson(update): ApiJson<UserStatusUpdate>,
) -> AppResult<impl IntoResponse> {
    update.validate()?;
    if update.targets(admin.user) {
        return Err(ApiError::forbidden(
            "Admins cannot change their own admin status or active status.",
        )
        .into());
    }
    let conn = state.conn().await?;
    let user = user::update_status(&conn, &update).await?;
    tracing::info!(
        admin = %admin.user,
        is_admin = user.is_admin,
        is_active = user.is_active,
        "user status changed"
    );
    Ok(ApiResponse(user))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeleteQuery {
    user_id: Uuid,
}

#[instrument(skip_all, name = "admin_delete_user", fields(user_id = %query.user_id))]
async fn delete(
    State(state): State<AppState>,
    AdminAuth(admin): AdminAuth,
    ApiQuery(query): ApiQuery<DeleteQuery>,
) -> AppResult<impl IntoResponse> {
    if query.user_id == admin.user {
        return Err(ApiError::forbidden("Admins cannot delete themselves.").into());
    }
    let conn = state.conn().await?;
    user::delete(&conn, query.user_id).await?;
    tracing::info!(admin = %admin.user, "user deleted");
    Ok(ApiResponse(json!({ "message": "User deleted successfully" })))
}
