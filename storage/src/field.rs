//! Persistence of template fields and the transactional side of field-set
//! reconciliation.

use async_trait::async_trait;
use deadpool_postgres::GenericClient;
use model::{
    reconcile::{self, FieldUpdate},
    FieldAttributes, FieldDescriptor, TemplateField,
};
use tokio_postgres::Row;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::{include_sql, StorageError, StorageResult};

#[async_trait]
pub trait FieldStore {
    /// Fields of a template ordered by their position.
    async fn find_fields_by_template(&self, template_id: Uuid) -> StorageResult<Vec<TemplateField>>;

    async fn create_field(
        &self,
        template_id: Uuid,
        attributes: &FieldAttributes,
        order: i32,
    ) -> StorageResult<Uuid>;

    async fn update_field(&self, template_id: Uuid, update: &FieldUpdate) -> StorageResult<()>;

    /// Removes every field of the template whose id is not in `keep`.
    async fn delete_fields_not_in(&self, template_id: Uuid, keep: &[Uuid]) -> StorageResult<u64>;
}

/// [`FieldStore`] on top of a postgres connection or transaction.
pub struct PgFieldStore<'a, C> {
    client: &'a C,
}

impl<'a, C: GenericClient + Sync> PgFieldStore<'a, C> {
    pub fn new(client: &'a C) -> Self {
        Self { client }
    }
}

#[async_trait]
impl<'a, C: GenericClient + Sync> FieldStore for PgFieldStore<'a, C> {
    async fn find_fields_by_template(&self, template_id: Uuid) -> StorageResult<Vec<TemplateField>> {
        find_by_template(self.client, template_id).await
    }

    async fn create_field(
        &self,
        template_id: Uuid,
        attributes: &FieldAttributes,
        order: i32,
    ) -> StorageResult<Uuid> {
        let stmt = self
            .client
            .prepare_cached(include_sql!("field/create"))
            .await?;
        let row = self
            .client
            .query_one(
                &stmt,
                &[
                    &template_id,
                    &attributes.kind.as_str(),
                    &attributes.title,
                    &attributes.description,
                    &attributes.required,
                    &attributes.show_in_results,
                    &order,
                ],
            )
            .await?;
        Ok(row.get("id"))
    }

    async fn update_field(&self, template_id: Uuid, update: &FieldUpdate) -> StorageResult<()> {
        let stmt = self
            .client
            .prepare_cached(include_sql!("field/update"))
            .await?;
        let attributes = &update.attributes;
        let modified = self
            .client
            .execute(
                &stmt,
                &[
                    &update.id,
                    &template_id,
                    &attributes.kind.as_str(),
                    &attributes.title,
                    &attributes.description,
                    &attributes.required,
                    &attributes.show_in_results,
                    &update.order,
                ],
            )
            .await?;
        if modified == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn delete_fields_not_in(&self, template_id: Uuid, keep: &[Uuid]) -> StorageResult<u64> {
        let stmt = self
            .client
            .prepare_cached(include_sql!("field/delete-not-in"))
            .await?;
        Ok(self.client.execute(&stmt, &[&template_id, &keep]).await?)
    }
}

pub async fn find_by_template(
    client: &impl GenericClient,
    template_id: Uuid,
) -> StorageResult<Vec<TemplateField>> {
    let stmt = client
        .prepare_cached(include_sql!("field/by-template"))
        .await?;
    client
        .query(&stmt, &[&template_id])
        .await?
        .iter()
        .map(from_row)
        .collect()
}

pub(crate) fn from_row(row: &Row) -> StorageResult<TemplateField> {
    let kind: &str = row.get("kind");
    Ok(TemplateField {
        id: row.get("id"),
        kind: kind.parse()?,
        title: row.get("title"),
        description: row.get("description"),
        required: row.get("required"),
        show_in_results: row.get("show_in_results"),
        order: row.get("ordering"),
    })
}

/// Brings the stored fields of a template in line with `submitted`.
///
/// Runs inside whatever transaction `store` is bound to. Fields whose id is
/// still listed are updated in place so that stored answers keep pointing at
/// them; the rest are deleted and unknown descriptors are inserted. Returns
/// the resulting fields in order.
#[instrument(skip(store, submitted), fields(submitted = submitted.len()))]
pub async fn reconcile_fields<S: FieldStore + ?Sized>(
    store: &S,
    template_id: Uuid,
    submitted: &[FieldDescriptor],
) -> StorageResult<Vec<TemplateField>> {
    let existing = store.find_fields_by_template(template_id).await?;
    let plan = reconcile::plan(&existing, submitted)?;
    if plan.is_noop() {
        debug!("field set unchanged");
        return Ok(existing);
    }
    debug!(
        inserts = plan.inserts.len(),
        updates = plan.updates.len(),
        deletes = plan.deletes.len(),
        "applying field changes"
    );

    let mut keep = plan.kept.clone();
    for insert in &plan.inserts {
        let id = store
            .create_field(template_id, &insert.attributes, insert.order)
            .await?;
        keep.push(id);
    }
    for update in &plan.updates {
        store.update_field(template_id, update).await?;
    }
    if !plan.deletes.is_empty() {
        store.delete_fields_not_in(template_id, &keep).await?;
    }
    store.find_fields_by_template(template_id).await
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use model::{reconcile::ReconcileError, FieldType};

    use super::*;

    #[derive(Default)]
    struct MemoryStore {
        fields: Mutex<Vec<(Uuid, TemplateField)>>,
        writes: Mutex<usize>,
        deletes: Mutex<usize>,
        fail_updates: bool,
    }

    impl MemoryStore {
        fn seed(&self, template_id: Uuid, fields: Vec<TemplateField>) {
            let mut stored = self.fields.lock().unwrap();
            stored.extend(fields.into_iter().map(|f| (template_id, f)));
        }

        fn writes(&self) -> usize {
            *self.writes.lock().unwrap()
        }

        fn count_write(&self) {
            *self.writes.lock().unwrap() += 1;
        }
    }

    #[async_trait]
    impl FieldStore for MemoryStore {
        async fn find_fields_by_template(
            &self,
            template_id: Uuid,
        ) -> StorageResult<Vec<TemplateField>> {
            let mut fields: Vec<TemplateField> = self
                .fields
                .lock()
                .unwrap()
                .iter()
                .filter(|(t, _)| *t == template_id)
                .map(|(_, f)| f.clone())
                .collect();
            fields.sort_by_key(|f| f.order);
            Ok(fields)
        }

        async fn create_field(
            &self,
            template_id: Uuid,
            attributes: &FieldAttributes,
            order: i32,
        ) -> StorageResult<Uuid> {
            self.count_write();
            let id = Uuid::new_v4();
            self.fields
                .lock()
                .unwrap()
                .push((template_id, attributes.clone().into_field(id, order)));
            Ok(id)
        }

        async fn update_field(&self, template_id: Uuid, update: &FieldUpdate) -> StorageResult<()> {
            self.count_write();
            if self.fail_updates {
                return Err(StorageError::NotFound);
            }
            let mut fields = self.fields.lock().unwrap();
            let (_, field) = fields
                .iter_mut()
                .find(|(t, f)| *t == template_id && f.id == update.id)
                .ok_or(StorageError::NotFound)?;
            *field = update.attributes.clone().into_field(update.id, update.order);
            Ok(())
        }

        async fn delete_fields_not_in(
            &self,
            template_id: Uuid,
            keep: &[Uuid],
        ) -> StorageResult<u64> {
            self.count_write();
            *self.deletes.lock().unwrap() += 1;
            let mut fields = self.fields.lock().unwrap();
            let before = fields.len();
            fields.retain(|(t, f)| *t != template_id || keep.contains(&f.id));
            Ok((before - fields.len()) as u64)
        }
    }

    fn field(id: Uuid, kind: FieldType, title: &str, order: i32) -> TemplateField {
        TemplateField {
            id,
            kind,
            title: title.into(),
            description: None,
            required: false,
            show_in_results: true,
            order,
        }
    }

    fn descriptor(id: Option<Uuid>, kind: FieldType, title: &str) -> FieldDescriptor {
        FieldDescriptor {
            id,
            kind,
            title: title.into(),
            description: None,
            required: false,
            show_in_results: true,
        }
    }

    #[tokio::test]
    async fn keeps_edits_and_replaces_fields() {
        let template = Uuid::new_v4();
        let f1 = Uuid::new_v4();
        let f2 = Uuid::new_v4();
        let store = MemoryStore::default();
        store.seed(
            template,
            vec![
                field(f1, FieldType::String, "Name", 0),
                field(f2, FieldType::Integer, "Age", 1),
            ],
        );

        let submitted = vec![
            descriptor(Some(f2), FieldType::Integer, "Age (years)"),
            descriptor(None, FieldType::Text, "Email"),
        ];
        let fields = reconcile_fields(&store, template, &submitted).await.unwrap();

        assert_eq!(fields.len(), 2);
        assert_eq!(fields[0].id, f2);
        assert_eq!(fields[0].title, "Age (years)");
        assert_eq!(fields[0].order, 0);
        assert_ne!(fields[1].id, f1);
        assert_eq!(fields[1].title, "Email");
        assert_eq!(fields[1].order, 1);
    }

    #[tokio::test]
    async fn second_run_writes_nothing() {
        let template = Uuid::new_v4();
        let f1 = Uuid::new_v4();
        let store = MemoryStore::default();
        store.seed(template, vec![field(f1, FieldType::String, "Name", 0)]);

        let submitted = vec![
            descriptor(Some(f1), FieldType::Text, "Full name"),
            descriptor(None, FieldType::Checkbox, "Agree"),
        ];
        let first = reconcile_fields(&store, template, &submitted).await.unwrap();
        let writes = store.writes();
        assert!(writes > 0);

        let resubmitted: Vec<FieldDescriptor> = first
            .iter()
            .map(|f| FieldDescriptor {
                id: Some(f.id),
                kind: f.kind,
                title: f.title.clone(),
                description: f.description.clone(),
                required: f.required,
                show_in_results: f.show_in_results,
            })
            .collect();
        let second = reconcile_fields(&store, template, &resubmitted)
            .await
            .unwrap();
        assert_eq!(store.writes(), writes);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn orders_follow_submission() {
        let template = Uuid::new_v4();
        let ids: Vec<Uuid> = (0..4).map(|_| Uuid::new_v4()).collect();
        let store = MemoryStore::default();
        store.seed(
            template,
            ids.iter()
                .enumerate()
                .map(|(i, id)| field(*id, FieldType::String, &format!("Q{i}"), i as i32))
                .collect(),
        );

        let submitted = vec![
            descriptor(Some(ids[3]), FieldType::String, "Q3"),
            descriptor(None, FieldType::Integer, "New"),
            descriptor(Some(ids[0]), FieldType::String, "Q0"),
        ];
        let fields = reconcile_fields(&store, template, &submitted).await.unwrap();
        let orders: Vec<i32> = fields.iter().map(|f| f.order).collect();
        assert_eq!(orders, vec![0, 1, 2]);
        assert_eq!(fields[0].id, ids[3]);
        assert_eq!(fields[2].id, ids[0]);
        assert!(!fields.iter().any(|f| f.id == ids[1] || f.id == ids[2]));
    }

    #[tokio::test]
    async fn duplicate_titles_leave_fields_untouched() {
        let template = Uuid::new_v4();
        let f1 = Uuid::new_v4();
        let store = MemoryStore::default();
        store.seed(template, vec![field(f1, FieldType::String, "Name", 0)]);

        let submitted = vec![
            descriptor(Some(f1), FieldType::String, "Name"),
            descriptor(None, FieldType::Text, "NAME"),
        ];
        let err = reconcile_fields(&store, template, &submitted)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StorageError::Reconcile(ReconcileError::DuplicateTitle { .. })
        ));
        assert_eq!(store.writes(), 0);
        let fields = store.find_fields_by_template(template).await.unwrap();
        assert_eq!(fields, vec![field(f1, FieldType::String, "Name", 0)]);
    }

    #[tokio::test]
    async fn creates_all_fields_for_new_template() {
        let template = Uuid::new_v4();
        let store = MemoryStore::default();
        let submitted = vec![
            descriptor(None, FieldType::String, "Name"),
            descriptor(None, FieldType::Checkbox, "Subscribe"),
        ];
        let fields = reconcile_fields(&store, template, &submitted).await.unwrap();
        assert_eq!(fields.len(), 2);
        assert_eq!(store.writes(), 2);
    }

    #[tokio::test]
    async fn failed_write_stops_reconciliation() {
        let template = Uuid::new_v4();
        let f1 = Uuid::new_v4();
        let f2 = Uuid::new_v4();
        let store = MemoryStore {
            fail_updates: true,
            ..Default::default()
        };
        store.seed(
            template,
            vec![
                field(f1, FieldType::String, "Name", 0),
                field(f2, FieldType::Integer, "Age", 1),
            ],
        );

        let submitted = vec![
            descriptor(None, FieldType::Text, "Email"),
            descriptor(Some(f2), FieldType::Integer, "Age (years)"),
        ];
        let err = reconcile_fields(&store, template, &submitted)
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::NotFound));
        // The insert ran, the failing update aborted, nothing was deleted.
        assert_eq!(store.writes(), 2);
        assert_eq!(*store.deletes.lock().unwrap(), 0);
        let stored = store.find_fields_by_template(template).await.unwrap();
        assert!(stored.iter().any(|f| f.id == f1));
    }
}
