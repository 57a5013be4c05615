use deadpool_postgres::GenericClient;
use model::{
    template::{
        OwnerSummary, SearchResult, SearchStats, TemplateAccess, TemplateCounts, TemplateDetail,
        TemplatePayload, TemplateSummary, TopicSummary,
    },
    Tag,
};
use tokio_postgres::Row;
use uuid::Uuid;

use crate::{field, include_sql, StorageError, StorageResult};

pub const SEARCH_LIMIT: i64 = 50;

/// Restrictions of the template listing.
#[derive(Debug, Clone, Default)]
pub struct TemplateFilter {
    pub topic_id: Option<Uuid>,
    pub owner_id: Option<Uuid>,
    pub is_public: Option<bool>,
}

/// The user a listing is produced for.
#[derive(Debug, Clone, Copy, Default)]
pub struct Viewer {
    pub user_id: Option<Uuid>,
    pub is_admin: bool,
}

pub(crate) fn owner_from_row(row: &Row) -> OwnerSummary {
    OwnerSummary {
        id: row.get("owner_id"),
        name: row.get("owner_name"),
        avatar_url: row.get("owner_avatar_url"),
    }
}

fn topic_from_row(row: &Row) -> Option<TopicSummary> {
    let id: Option<Uuid> = row.get("topic_id");
    let name: Option<String> = row.get("topic_name");
    id.zip(name).map(|(id, name)| TopicSummary { id, name })
}

fn summary_from_row(row: &Row) -> TemplateSummary {
    TemplateSummary {
        id: row.get("id"),
        title: row.get("title"),
        description: row.get("description"),
        is_public: row.get("is_public"),
        image_url: row.get("image_url"),
        topic: topic_from_row(row),
        owner: owner_from_row(row),
        counts: TemplateCounts {
            likes: row.get("like_count"),
            comments: row.get("comment_count"),
            submissions: row.get("submission_count"),
        },
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

pub async fn list(
    client: &impl GenericClient,
    filter: &TemplateFilter,
    viewer: Viewer,
    limit: i64,
    offset: i64,
) -> StorageResult<Vec<TemplateSummary>> {
    let stmt = client.prepare_cached(include_sql!("template/list")).await?;
    let rows = client
        .query(
            &stmt,
            &[
                &filter.topic_id,
                &filter.owner_id,
                &filter.is_public,
                &viewer.is_admin,
                &viewer.user_id,
                &limit,
                &offset,
            ],
        )
        .await?;
    Ok(rows.iter().map(summary_from_row).collect())
}

pub async fn find_access(
    client: &impl GenericClient,
    id: Uuid,
) -> StorageResult<Option<TemplateAccess>> {
    let stmt = client.prepare_cached(include_sql!("template/access")).await?;
    Ok(client
        .query_opt(&stmt, &[&id])
        .await?
        .map(|row| TemplateAccess {
            id: row.get("id"),
            owner_id: row.get("owner_id"),
            is_public: row.get("is_public"),
        }))
}

pub async fn has_grant(
    client: &impl GenericClient,
    template_id: Uuid,
    user_id: Uuid,
) -> StorageResult<bool> {
    let stmt = client
        .prepare_cached(include_sql!("template/grant-exists"))
        .await?;
    let row = client.query_one(&stmt, &[&template_id, &user_id]).await?;
    Ok(row.get("granted"))
}

pub async fn find_detail(
    client: &impl GenericClient,
    id: Uuid,
) -> StorageResult<Option<TemplateDetail>> {
    let stmt = client
        .prepare_cached(include_sql!("template/summary-by-id"))
        .await?;
    let Some(row) = client.query_opt(&stmt, &[&id]).await? else {
        return Ok(None);
    };
    let summary = summary_from_row(&row);
    let template_fields = field::find_by_template(client, id).await?;
    let template_tags = tags(client, id).await?;
    let access_grants = grants(client, id).await?;
    Ok(Some(TemplateDetail {
        summary,
        template_fields,
        template_tags,
        access_grants,
    }))
}

pub async fn tags(client: &impl GenericClient, template_id: Uuid) -> StorageResult<Vec<Tag>> {
    let stmt = client.prepare_cached(include_sql!("template/tags")).await?;
    let rows = client.query(&stmt, &[&template_id]).await?;
    Ok(rows
        .iter()
        .map(|row| Tag {
            id: row.get("id"),
            name: row.get("name"),
        })
        .collect())
}

pub async fn grants(client: &impl GenericClient, template_id: Uuid) -> StorageResult<Vec<Uuid>> {
    let stmt = client.prepare_cached(include_sql!("template/grants")).await?;
    let rows = client.query(&stmt, &[&template_id]).await?;
    Ok(rows.iter().map(|row| row.get("user_id")).collect())
}

/// Inserts the template row only. Fields, tags and grants are written
/// separately by the caller inside the same transaction.
pub async fn insert(
    client: &impl GenericClient,
    owner_id: Uuid,
    payload: &TemplatePayload,
) -> StorageResult<Uuid> {
    let stmt = client.prepare_cached(include_sql!("template/create")).await?;
    let row = client
        .query_one(
            &stmt,
            &[
                &payload.title,
                &payload.description,
                &payload.is_public,
                &payload.topic_id,
                &payload.image_url,
                &owner_id,
            ],
        )
        .await?;
    Ok(row.get("id"))
}

pub async fn update_attributes(
    client: &impl GenericClient,
    id: Uuid,
    payload: &TemplatePayload,
) -> StorageResult<()> {
    let stmt = client.prepare_cached(include_sql!("template/update")).await?;
    let modified = client
        .execute(
            &stmt,
            &[
                &id,
                &payload.title,
                &payload.description,
                &payload.is_public,
                &payload.topic_id,
                &payload.image_url,
            ],
        )
        .await?;
    if modified == 0 {
        return Err(StorageError::NotFound);
    }
    Ok(())
}

pub async fn replace_tags(
    client: &impl GenericClient,
    template_id: Uuid,
    tags: &[Uuid],
) -> StorageResult<()> {
    let clear = client
        .prepare_cached(include_sql!("template/clear-tags"))
        .await?;
    client.execute(&clear, &[&template_id]).await?;
    if !tags.is_empty() {
        let add = client.prepare_cached(include_sql!("template/add-tags")).await?;
        client.execute(&add, &[&template_id, &tags]).await?;
    }
    Ok(())
}

pub async fn replace_grants(
    client: &impl GenericClient,
    template_id: Uuid,
    users: &[Uuid],
) -> StorageResult<()> {
    let clear = client
        .prepare_cached(include_sql!("template/clear-grants"))
        .await?;
    client.execute(&clear, &[&template_id]).await?;
    if !users.is_empty() {
        let add = client
            .prepare_cached(include_sql!("template/add-grants"))
            .await?;
        client.execute(&add, &[&template_id, &users]).await?;
    }
    Ok(())
}

pub async fn delete(client: &impl GenericClient, id: Uuid) -> StorageResult<()> {
    let stmt = client.prepare_cached(include_sql!("template/delete")).await?;
    match client.execute(&stmt, &[&id]).await? {
        0 => Err(StorageError::NotFound),
        _ => Ok(()),
    }
}

pub async fn search(client: &impl GenericClient, query: &str) -> StorageResult<Vec<SearchResult>> {
    let stmt = client.prepare_cached(include_sql!("template/search")).await?;
    let rows = client.query(&stmt, &[&query, &SEARCH_LIMIT]).await?;
    Ok(rows
        .iter()
        .map(|row| SearchResult {
            id: row.get("id"),
            title: row.get("title"),
            description: row.get("description"),
            image_url: row.get("image_url"),
            owner: owner_from_row(row),
            topic: topic_from_row(row),
            stats: SearchStats {
                likes: row.get("like_count"),
                submissions: row.get("submission_count"),
            },
            created_at: row.get("created_at"),
        })
        .collect())
}
