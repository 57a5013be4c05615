use deadpool_postgres::GenericClient;
use model::{Tag, Topic};
use tokio_postgres::Row;

use crate::{include_sql, StorageResult};

fn tag_from_row(row: &Row) -> Tag {
    Tag {
        id: row.get("id"),
        name: row.get("name"),
    }
}

pub async fn tags(client: &impl GenericClient) -> StorageResult<Vec<Tag>> {
    let stmt = client.prepare_cached(include_sql!("catalog/tags")).await?;
    Ok(client.query(&stmt, &[]).await?.iter().map(tag_from_row).collect())
}

/// Returns the tag matching `name` case-insensitively, creating it when
/// missing. The flag tells whether a new tag was created.
pub async fn find_or_create_tag(
    client: &impl GenericClient,
    name: &str,
) -> StorageResult<(Tag, bool)> {
    let create = client
        .prepare_cached(include_sql!("catalog/tag-create"))
        .await?;
    if let Some(row) = client.query_opt(&create, &[&name]).await? {
        return Ok((tag_from_row(&row), true));
    }
    let find = client
        .prepare_cached(include_sql!("catalog/tag-by-name"))
        .await?;
    let row = client.query_one(&find, &[&name]).await?;
    Ok((tag_from_row(&row), false))
}

pub async fn topics(client: &impl GenericClient) -> StorageResult<Vec<Topic>> {
    let stmt = client.prepare_cached(include_sql!("catalog/topics")).await?;
    Ok(client
        .query(&stmt, &[])
        .await?
        .iter()
        .map(|row| Topic {
            id: row.get("id"),
            name: row.get("name"),
            created_at: row.get("created_at"),
        })
        .collect())
}
