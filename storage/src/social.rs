use deadpool_postgres::GenericClient;
use model::{catalog::LikeStatus, Comment};
use tokio_postgres::Row;
use uuid::Uuid;

use crate::{include_sql, template::owner_from_row, StorageResult};

pub async fn like_status(
    client: &impl GenericClient,
    template_id: Uuid,
    user_id: Uuid,
) -> StorageResult<LikeStatus> {
    let stmt = client
        .prepare_cached(include_sql!("social/like-status"))
        .await?;
    let row = client.query_one(&stmt, &[&template_id, &user_id]).await?;
    Ok(LikeStatus {
        has_liked: row.get("has_liked"),
        like_count: row.get("like_count"),
    })
}

/// Removes the like of `user_id` if present, adds it otherwise.
pub async fn toggle_like(
    client: &impl GenericClient,
    template_id: Uuid,
    user_id: Uuid,
) -> StorageResult<LikeStatus> {
    let unlike = client.prepare_cached(include_sql!("social/unlike")).await?;
    if client.execute(&unlike, &[&template_id, &user_id]).await? == 0 {
        let like = client.prepare_cached(include_sql!("social/like")).await?;
        client.execute(&like, &[&template_id, &user_id]).await?;
    }
    like_status(client, template_id, user_id).await
}

fn comment_from_row(row: &Row) -> Comment {
    Comment {
        id: row.get("id"),
        template_id: row.get("template_id"),
        content: row.get("content"),
        user: owner_from_row(row),
        created_at: row.get("created_at"),
    }
}

pub async fn comments(
    client: &impl GenericClient,
    template_id: Uuid,
    limit: i64,
    offset: i64,
) -> StorageResult<Vec<Comment>> {
    let stmt = client.prepare_cached(include_sql!("social/comments")).await?;
    let rows = client
        .query(&stmt, &[&template_id, &limit, &offset])
        .await?;
    Ok(rows.iter().map(comment_from_row).collect())
}

pub async fn comment_count(client: &impl GenericClient, template_id: Uuid) -> StorageResult<i64> {
    let stmt = client
        .prepare_cached(include_sql!("social/comment-count"))
        .await?;
    Ok(client.query_one(&stmt, &[&template_id]).await?.get("total"))
}

pub async fn add_comment(
    client: &impl GenericClient,
    template_id: Uuid,
    user_id: Uuid,
    content: &str,
) -> StorageResult<Comment> {
    let stmt = client
        .prepare_cached(include_sql!("social/comment-create"))
        .await?;
    let row = client
        .query_one(&stmt, &[&template_id, &user_id, &content])
        .await?;
    Ok(comment_from_row(&row))
}
