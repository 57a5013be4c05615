use axum::{
    extract::State, http::StatusCode, response::IntoResponse, routing::get, Router,
};
use model::submission::{SubmissionCreated, SubmissionPayload};
use serde::Deserialize;
use storage::{submission, template};
use tracing::instrument;
use uuid::Uuid;

use crate::{
    auth::ApiAuth,
    error::ApiError,
    extract::{ApiJson, ApiQuery},
    ApiResponse, AppResult, AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_for_template).post(create))
        .route("/user", get(list_own))
        .route("/user/single", get(find_own))
}

#[instrument(skip_all, name = "create_submission", fields(template_id = %payload.template_id))]
async fn create(
    State(state): State<AppState>,
    ApiAuth(session): ApiAuth,
    ApiJson(payload): ApiJson<SubmissionPayload>,
) -> AppResult<impl IntoResponse> {
    let template_id = payload.template_id;
    let mut conn = state.conn().await?;
    let access = template::find_access(&conn, template_id)
        .await?
        .ok_or(ApiError::not_found("Template not found"))?;
    let granted = !access.is_public && template::has_grant(&conn, template_id, session.user).await?;
    if !access.can_view(Some(session.user), session.is_admin, granted) {
        return Err(ApiError::forbidden("You do not have access to this template").into());
    }

    let contract = state
        .contracts()
        .get(template_id)
        .await?
        .ok_or(ApiError::not_found("Template not found"))?;
    let unknown = contract.unknown_keys(&payload.values);
    if !unknown.is_empty() {
        tracing::debug!(?unknown, "submission references unknown fields");
        return Err(ApiError::bad_request(
            "One or more field submissions reference invalid template fields",
        )
        .into());
    }
    let values = contract.apply(&payload.values)?;

    let tx = conn.transaction().await?;
    let id = submission::create(&tx, template_id, session.user, &values).await?;
    tx.commit().await?;
    tracing::info!(%id, "submission created");

    Ok((
        StatusCode::CREATED,
        ApiResponse(SubmissionCreated {
            id,
            message: "Submission created successfully",
        }),
    ))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TemplateQuery {
    template_id: Uuid,
}

#[instrument(skip_all, name = "list_submissions", fields(template_id = %query.template_id))]
async fn list_for_template(
    State(state): State<AppState>,
    ApiAuth(session): ApiAuth,
    ApiQuery(query): ApiQuery<TemplateQuery>,
) -> AppResult<impl IntoResponse> {
    let conn = state.conn().await?;
    let access = template::find_access(&conn, query.template_id)
        .await?
        .ok_or(ApiError::not_found("Template not found"))?;
    if !access.can_edit(session.user, session.is_admin) {
        return Err(
            ApiError::forbidden("You do not have permission to view these submissions").into(),
        );
    }
    let submissions = submission::list_for_template(&conn, query.template_id).await?;
    Ok(ApiResponse(submissions))
}

#[instrument(skip_all, name = "list_own_submissions")]
async fn list_own(
    State(state): State<AppState>,
    ApiAuth(session): ApiAuth,
) -> AppResult<impl IntoResponse> {
    let conn = state.conn().await?;
    Ok(ApiResponse(
        submission::list_for_user(&conn, session.user).await?,
    ))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubmissionQuery {
    submission_id: Uuid,
}

#[instrument(skip_all, name = "find_own_submission", fields(submission_id = %query.submission_id))]
async fn find_own(
    State(state): State<AppState>,
    ApiAuth(session): ApiAuth,
    ApiQuery(query): ApiQuery<SubmissionQuery>,
) -> AppResult<impl IntoResponse> {
    let conn = state.conn().await?;
    let submission = submission::find_for_user(&conn, query.submission_id, session.user)
        .await?
        .ok_or(ApiError::not_found("Submission not found"))?;
    Ok(ApiResponse(submission))
}
