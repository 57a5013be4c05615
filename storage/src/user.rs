use deadpool_postgres::GenericClient;
use model::user::{AdminUser, ProfileUpdate, User, UserSearchHit, UserStatusUpdate};
use tokio_postgres::Row;
use tracing::info;
use uuid::Uuid;

use crate::{include_sql, StorageError, StorageResult};

fn from_row(row: &Row) -> User {
    User {
        id: row.get("id"),
        email: row.get("email"),
        name: row.get("name"),
        avatar_url: row.get("avatar_url"),
        is_admin: row.get("is_admin"),
        is_active: row.get("is_active"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

pub async fn find(client: &impl GenericClient, id: Uuid) -> StorageResult<Option<User>> {
    let stmt = client.prepare_cached(include_sql!("user/by-id")).await?;
    Ok(client.query_opt(&stmt, &[&id]).await?.as_ref().map(from_row))
}

/// Identity of a user as asserted by the auth provider.
#[derive(Debug, Clone)]
pub struct Identity<'a> {
    pub id: Uuid,
    pub email: &'a str,
    pub name: Option<&'a str>,
    pub avatar_url: Option<&'a str>,
}

/// Loads the user, creating the row on first sight. `None` when an admin
/// deleted this identity.
pub async fn provision(
    client: &impl GenericClient,
    identity: &Identity<'_>,
) -> StorageResult<Option<User>> {
    if let Some(user) = find(client, identity.id).await? {
        return Ok(Some(user));
    }
    let stmt = client.prepare_cached(include_sql!("user/provision")).await?;
    let created = client
        .execute(
            &stmt,
            &[
                &identity.id,
                &identity.email,
                &identity.name,
                &identity.avatar_url,
            ],
        )
        .await?;
    if created > 0 {
        info!(user = %identity.id, "provisioned user");
    }
    find(client, identity.id).await
}

pub async fn update_profile(
    client: &impl GenericClient,
    id: Uuid,
    update: &ProfileUpdate,
) -> StorageResult<User> {
    let stmt = client
        .prepare_cached(include_sql!("user/update-profile"))
        .await?;
    let name = update.name.as_deref().map(str::trim);
    client
        .query_opt(&stmt, &[&id, &name, &update.avatar_url])
        .await?
        .as_ref()
        .map(from_row)
        .ok_or(StorageError::NotFound)
}

pub async fn update_status(
    client: &impl GenericClient,
    update: &UserStatusUpdate,
) -> StorageResult<User> {
    let stmt = client
        .prepare_cached(include_sql!("user/update-status"))
        .await?;
    client
        .query_opt(&stmt, &[&update.user_id, &update.is_admin, &update.is_active])
        .await?
        .as_ref()
        .map(from_row)
        .ok_or(StorageError::NotFound)
}

/// Removes the user with everything they own and remembers the id so the
/// identity cannot sign in again.
pub async fn delete(client: &impl GenericClient, id: Uuid) -> StorageResult<()> {
    let stmt = client.prepare_cached(include_sql!("user/delete")).await?;
    match client.execute(&stmt, &[&id]).await? {
        0 => Err(StorageError::NotFound),
        _ => Ok(()),
    }
}

/// Active users whose email or name contains `query`, with the total count.
pub async fn search(
    client: &impl GenericClient,
    query: &str,
    limit: i64,
    offset: i64,
) -> StorageResult<(Vec<UserSearchHit>, i64)> {
    let stmt = client.prepare_cached(include_sql!("user/search")).await?;
    let rows = client.query(&stmt, &[&query, &limit, &offset]).await?;
    let count = client
        .prepare_cached(include_sql!("user/search-count"))
        .await?;
    let total: i64 = client.query_one(&count, &[&query]).await?.get("total");
    let hits = rows
        .iter()
        .map(|row| UserSearchHit {
            id: row.get("id"),
            email: row.get("email"),
            name: row.get("name"),
            avatar_url: row.get("avatar_url"),
        })
        .collect();
    Ok((hits, total))
}

pub async fn admin_list(
    client: &impl GenericClient,
    query: &str,
    limit: i64,
    offset: i64,
) -> StorageResult<(Vec<AdminUser>, i64)> {
    let stmt = client.prepare_cached(include_sql!("user/admin-list")).await?;
    let rows = client.query(&stmt, &[&query, &limit, &offset]).await?;
    let count = client
        .prepare_cached(include_sql!("user/admin-count"))
        .await?;
    let total: i64 = client.query_one(&count, &[&query]).await?.get("total");
    let users = rows
        .iter()
        .map(|row| AdminUser {
            user: from_row(row),
            template_count: row.get("template_count"),
            submission_count: row.get("submission_count"),
        })
        .collect();
    Ok((users, total))
}
