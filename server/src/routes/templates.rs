use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::MethodRouter,
    Router,
};
use deadpool_postgres::{GenericClient, Object};
use model::template::{TemplateAccess, TemplateDetail, TemplatePayload};
use serde::Deserialize;
use serde_json::json;
use storage::{
    field::{reconcile_fields, PgFieldStore},
    template::{self, TemplateFilter, Viewer},
};
use tracing::instrument;
use uuid::Uuid;

use crate::{
    auth::{ApiAuth, OptionalAuth, SessionInfo},
    error::ApiError,
    extract::{ApiJson, ApiPath, ApiQuery},
    routes::Pagination,
    ApiResponse, AppResult, AppState,
};

const TEMPLATE_NOT_FOUND: &str = "Template not found";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", MethodRouter::new().get(list).post(create))
        .route(
            "/:id",
            MethodRouter::new().get(detail).put(update).delete(delete),
        )
}

/// Loads the access record of a template, answering 404 when it does not
/// exist or the caller may not see it.
pub(super) async fn visible_template(
    client: &impl GenericClient,
    id: Uuid,
    user: Option<Uuid>,
    is_admin: bool,
) -> AppResult<TemplateAccess> {
    let access = template::find_access(client, id)
        .await?
        .ok_or(ApiError::not_found(TEMPLATE_NOT_FOUND))?;
    let granted = match user {
        Some(user) if !access.is_public && !is_admin && access.owner_id != user => {
            template::has_grant(client, id, user).await?
        }
        _ => false,
    };
    if !access.can_view(user, is_admin, granted) {
        return Err(ApiError::not_found(TEMPLATE_NOT_FOUND).into());
    }
    Ok(access)
}

async fn editable_template(
    client: &impl GenericClient,
    id: Uuid,
    session: &SessionInfo,
) -> AppResult<TemplateAccess> {
    let access = template::find_access(client, id)
        .await?
        .ok_or(ApiError::not_found(TEMPLATE_NOT_FOUND))?;
    if !access.can_edit(session.user, session.is_admin) {
        return Err(ApiError::forbidden("You do not have permission to modify this template").into());
    }
    Ok(access)
}

async fn load_detail(client: &impl GenericClient, id: Uuid) -> AppResult<TemplateDetail> {
    Ok(template::find_detail(client, id)
        .await?
        .ok_or(ApiError::not_found(TEMPLATE_NOT_FOUND))?)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListQuery {
    topic_id: Option<Uuid>,
    owner_id: Option<Uuid>,
    is_public: Option<bool>,
}

#[instrument(skip_all, name = "list_templates")]
async fn list(
    State(state): State<AppState>,
    auth: OptionalAuth,
    ApiQuery(query): ApiQuery<ListQuery>,
    pagination: Pagination,
) -> AppResult<impl IntoResponse> {
    let conn = state.conn().await?;
    let filter = TemplateFilter {
        topic_id: query.topic_id,
        owner_id: query.owner_id,
        is_public: query.is_public,
    };
    let viewer = Viewer {
        user_id: auth.user(),
        is_admin: auth.is_admin(),
    };
    let templates = template::list(
        &conn,
        &filter,
        viewer,
        pagination.limit(),
        pagination.offset(),
    )
    .await?;
    Ok(ApiResponse(templates))
}

#[instrument(skip_all, name = "template_detail", fields(%id))]
async fn detail(
    State(state): State<AppState>,
    auth: OptionalAuth,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<impl IntoResponse> {
    let conn = state.conn().await?;
    visible_template(&conn, id, auth.user(), auth.is_admin()).await?;
    Ok(ApiResponse(load_detail(&conn, id).await?))
}

#[instrument(skip_all, name = "create_template")]
async fn create(
    State(state): State<AppState>,
    ApiAuth(session): ApiAuth,
    ApiJson(payload): ApiJson<TemplatePayload>,
) -> AppResult<impl IntoResponse> {
    payload.validate()?;
    let mut conn = state.conn().await?;
    let tx = conn.transaction().await?;
    let id = template::insert(&tx, session.user, &payload).await?;
    reconcile_fields(&PgFieldStore::new(&tx), id, &payload.template_fields).await?;
    template::replace_tags(&tx, id, payload.tags()).await?;
    template::replace_grants(&tx, id, payload.grants()).await?;
    tx.commit().await?;
    tracing::info!(%id, fields = payload.template_fields.len(), "template created");

    let detail = load_detail(&conn, id).await?;
    Ok((StatusCode::CREATED, ApiResponse(detail)))
}

/// Writes attributes, fields, tags and grants of an existing template in one
/// transaction. Dropping the transaction on error rolls everything back.
async fn apply_update(conn: &mut Object, id: Uuid, payload: &TemplatePayload) -> AppResult<()> {
    let tx = conn.transaction().await?;
    template::update_attributes(&tx, id, payload).await?;
    reconcile_fields(&PgFieldStore::new(&tx), id, &payload.template_fields).await?;
    template::replace_tags(&tx, id, payload.tags()).await?;
    template::replace_grants(&tx, id, payload.grants()).await?;
    tx.commit().await?;
    Ok(())
}

#[instrument(skip_all, name = "update_template", fields(%id))]
async fn update(
    State(state): State<AppState>,
    ApiAuth(session): ApiAuth,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<TemplatePayload>,
) -> AppResult<impl IntoResponse> {
    payload.validate()?;
    let mut conn = state.conn().await?;
    editable_template(&conn, id, &session).await?;

    let timeout = state.limits().reconcile_timeout();
    let outcome = tokio::time::timeout(timeout, apply_update(&mut conn, id, &payload)).await;
    // A commit cut short by the timeout may still have landed.
    state.contracts().invalidate(id).await;
    outcome??;

    Ok(ApiResponse(load_detail(&conn, id).await?))
}

#[instrument(skip_all, name = "delete_template", fields(%id))]
async fn delete(
    State(state): State<AppState>,
    ApiAuth(session): ApiAuth,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<impl IntoResponse> {
    let conn = state.conn().await?;
    editable_template(&conn, id, &session).await?;
    template::delete(&conn, id).await?;
    state.contracts().invalidate(id).await;
    Ok(ApiResponse(json!({ "message": "Template deleted successfully" })))
}
