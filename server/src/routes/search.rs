use axum::{extract::State, response::IntoResponse, routing::get, Router};
use serde::Deserialize;
use storage::template;
use tracing::instrument;

use crate::{error::ApiError, extract::ApiQuery, ApiResponse, AppResult, AppState};

const MIN_QUERY_LEN: usize = 2;

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(search))
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    #[serde(default)]
    q: String,
}

#[instrument(skip_all, name = "search_templates")]
async fn search(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<SearchQuery>,
) -> AppResult<impl IntoResponse> {
    let q = query.q.trim();
    if q.chars().count() < MIN_QUERY_LEN {
        return Err(ApiError::bad_request("Search query must be at least 2 characters long").into());
    }
    let conn = state.conn().await?;
    Ok(ApiResponse(template::search(&conn, q).await?))
}
