use std::collections::HashMap;

use deadpool_postgres::GenericClient;
use model::{
    submission::{FieldAnswer, Submission, UserSubmission},
    FieldValue, NormalizedValues,
};
use tokio_postgres::Row;
use tracing::instrument;
use uuid::Uuid;

use crate::{include_sql, template::owner_from_row, StorageResult};

/// Column values of one answer row.
fn columns(value: &FieldValue) -> (Option<&str>, Option<i64>, Option<bool>) {
    match value {
        FieldValue::String(s) => (Some(s.as_str()), None, None),
        FieldValue::Integer(i) => (None, Some(*i), None),
        FieldValue::Boolean(b) => (None, None, Some(*b)),
        FieldValue::Null => (None, None, None),
    }
}

fn value_from_row(row: &Row) -> FieldValue {
    if let Some(s) = row.get::<_, Option<String>>("value_string") {
        FieldValue::String(s)
    } else if let Some(i) = row.get::<_, Option<i64>>("value_integer") {
        FieldValue::Integer(i)
    } else if let Some(b) = row.get::<_, Option<bool>>("value_boolean") {
        FieldValue::Boolean(b)
    } else {
        FieldValue::Null
    }
}

/// Stores a submission and one answer row per non-null value. Must run in a
/// transaction so that a failing answer leaves nothing behind.
#[instrument(skip(client, values), fields(values = values.len()))]
pub async fn create(
    client: &impl GenericClient,
    template_id: Uuid,
    user_id: Uuid,
    values: &NormalizedValues,
) -> StorageResult<Uuid> {
    let stmt = client
        .prepare_cached(include_sql!("submission/create"))
        .await?;
    let id: Uuid = client
        .query_one(&stmt, &[&template_id, &user_id])
        .await?
        .get("id");

    let add = client
        .prepare_cached(include_sql!("submission/add-value"))
        .await?;
    for (field_id, value) in values.present() {
        let (string, integer, boolean) = columns(value);
        client
            .execute(&add, &[&id, field_id, &string, &integer, &boolean])
            .await?;
    }
    Ok(id)
}

async fn answers(
    client: &impl GenericClient,
    submissions: &[Uuid],
) -> StorageResult<HashMap<Uuid, Vec<FieldAnswer>>> {
    let stmt = client
        .prepare_cached(include_sql!("submission/answers"))
        .await?;
    let rows = client.query(&stmt, &[&submissions]).await?;
    let mut answers: HashMap<Uuid, Vec<FieldAnswer>> = HashMap::new();
    for row in rows {
        let kind: &str = row.get("kind");
        answers
            .entry(row.get("submission_id"))
            .or_default()
            .push(FieldAnswer {
                field_id: row.get("field_id"),
                title: row.get("title"),
                kind: kind.parse()?,
                show_in_results: row.get("show_in_results"),
                value: value_from_row(&row),
            });
    }
    Ok(answers)
}

async fn with_answers(
    client: &impl GenericClient,
    rows: Vec<Row>,
) -> StorageResult<Vec<Submission>> {
    let ids: Vec<Uuid> = rows.iter().map(|row| row.get("id")).collect();
    let mut answers = answers(client, &ids).await?;
    Ok(rows
        .iter()
        .map(|row| {
            let id: Uuid = row.get("id");
            Submission {
                id,
                template_id: row.get("template_id"),
                submitter: owner_from_row(row),
                answers: answers.remove(&id).unwrap_or_default(),
                created_at: row.get("created_at"),
            }
        })
        .collect())
}

pub async fn list_for_template(
    client: &impl GenericClient,
    template_id: Uuid,
) -> StorageResult<Vec<Submission>> {
    let stmt = client
        .prepare_cached(include_sql!("submission/by-template"))
        .await?;
    let rows = client.query(&stmt, &[&template_id]).await?;
    with_answers(client, rows).await
}

pub async fn find_for_user(
    client: &impl GenericClient,
    submission_id: Uuid,
    user_id: Uuid,
) -> StorageResult<Option<Submission>> {
    let stmt = client
        .prepare_cached(include_sql!("submission/by-id-for-user"))
        .await?;
    let rows: Vec<Row> = client
        .query_opt(&stmt, &[&submission_id, &user_id])
        .await?
        .into_iter()
        .collect();
    Ok(with_answers(client, rows).await?.pop())
}

pub async fn list_for_user(
    client: &impl GenericClient,
    user_id: Uuid,
) -> StorageResult<Vec<UserSubmission>> {
    let stmt = client.prepare_cached(include_sql!("submission/by-user")).await?;
    let rows = client.query(&stmt, &[&user_id]).await?;
    Ok(rows
        .iter()
        .map(|row| UserSubmission {
            id: row.get("id"),
            template_id: row.get("template_id"),
            template_title: row.get("template_title"),
            template_description: row.get("template_description"),
            created_at: row.get("created_at"),
        })
        .collect())
}
