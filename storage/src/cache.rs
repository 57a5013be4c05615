use std::{hash::Hash, marker::PhantomData, sync::Arc, time::Duration};

use deadpool_postgres::Pool;
use futures::{future::BoxFuture, Future, FutureExt};
use model::SubmissionContract;
use moka::future::Cache;
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

use crate::{field, template, StorageError, StorageResult};

pub type MokaCache<I, T> = Cache<I, Arc<Mutex<Option<Arc<T>>>>>;
pub type GetterFunc<C, I, T, E> =
    dyn Fn(C, I) -> BoxFuture<'static, Result<Option<T>, E>> + Send + Sync;

/// Read-through cache where concurrent misses for one key load only once.
/// Misses and failures are not remembered.
struct DataCache<C, I, T, E> {
    getter: Arc<GetterFunc<C, I, T, E>>,
    cache: MokaCache<I, T>,
    _error: PhantomData<E>,
    source: C,
}

impl<C: Clone, I, T, E> Clone for DataCache<C, I, T, E> {
    fn clone(&self) -> Self {
        Self {
            getter: self.getter.clone(),
            cache: self.cache.clone(),
            _error: PhantomData,
            source: self.source.clone(),
        }
    }
}

impl<
        C: Clone + Send + Sync + 'static,
        I: PartialEq + Eq + Hash + Send + Sync + Clone + 'static,
        T: Send + Sync + 'static,
        E: Send + Sync,
    > DataCache<C, I, T, E>
{
    fn new<Fut: Future<Output = Result<Option<T>, E>> + 'static + Send>(
        cache: MokaCache<I, T>,
        source: C,
        func: impl Fn(C, I) -> Fut + 'static + Send + Sync,
    ) -> Self {
        let func = Arc::new(move |source, id| func(source, id).boxed());
        Self {
            getter: func,
            cache,
            _error: PhantomData,
            source,
        }
    }

    async fn get(&self, id: &I) -> Result<Option<Arc<T>>, E> {
        let mutex = self
            .cache
            .get_with_by_ref(id, async { Arc::new(Mutex::new(None)) })
            .await;
        let mut guard = mutex.lock().await;
        if let Some(value) = &*guard {
            return Ok(Some(value.clone()));
        }

        let value = (self.getter)(self.source.clone(), id.clone())
            .await?
            .map(Arc::new);
        *guard = value.clone();
        Ok(value)
    }

    async fn invalidate(&self, id: &I) {
        self.cache.invalidate(id).await;
    }
}

/// Compiled submission contracts keyed by template id.
///
/// Entries expire after `ttl` so that an edit committed by another instance,
/// or one whose invalidation was lost, is picked up eventually.
#[derive(Clone)]
pub struct ContractCache {
    contracts: DataCache<Pool, Uuid, SubmissionContract, StorageError>,
}

impl ContractCache {
    pub fn new(pool: Pool, capacity: u64, ttl: Duration) -> Self {
        Self {
            contracts: DataCache::new(
                Cache::builder()
                    .max_capacity(capacity)
                    .time_to_live(ttl)
                    .build(),
                pool,
                contract_from_db,
            ),
        }
    }

    /// `None` when the template does not exist.
    pub async fn get(&self, template_id: Uuid) -> StorageResult<Option<Arc<SubmissionContract>>> {
        self.contracts.get(&template_id).await
    }

    pub async fn invalidate(&self, template_id: Uuid) {
        debug!(%template_id, "invalidating submission contract");
        self.contracts.invalidate(&template_id).await;
    }
}

async fn contract_from_db(
    pool: Pool,
    template_id: Uuid,
) -> StorageResult<Option<SubmissionContract>> {
    let client = pool.get().await?;
    if template::find_access(&client, template_id).await?.is_none() {
        return Ok(None);
    }
    let fields = field::find_by_template(&client, template_id).await?;
    debug!(%template_id, fields = fields.len(), "built submission contract");
    Ok(Some(SubmissionContract::from_fields(&fields)))
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    type Loads = Arc<AtomicUsize>;

    fn counting_cache(ttl: Duration) -> (DataCache<Loads, u32, u32, StorageError>, Loads) {
        let loads = Loads::default();
        let cache = DataCache::new(
            Cache::builder().max_capacity(16).time_to_live(ttl).build(),
            loads.clone(),
            |loads: Loads, id: u32| async move {
                loads.fetch_add(1, Ordering::SeqCst);
                Ok(Some(id * 10))
            },
        );
        (cache, loads)
    }

    #[tokio::test]
    async fn hits_are_served_until_invalidated() {
        let (cache, loads) = counting_cache(Duration::from_secs(60));
        assert_eq!(cache.get(&1).await.unwrap().as_deref(), Some(&10));
        assert_eq!(cache.get(&1).await.unwrap().as_deref(), Some(&10));
        assert_eq!(loads.load(Ordering::SeqCst), 1);

        cache.invalidate(&1).await;
        cache.get(&1).await.unwrap();
        assert_eq!(loads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn entries_expire_after_ttl() {
        let (cache, loads) = counting_cache(Duration::from_millis(50));
        cache.get(&7).await.unwrap();
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(cache.get(&7).await.unwrap().as_deref(), Some(&70));
        assert_eq!(loads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn misses_are_not_remembered() {
        let loads = Loads::default();
        let cache: DataCache<Loads, u32, u32, StorageError> = DataCache::new(
            Cache::builder().max_capacity(16).build(),
            loads.clone(),
            |loads: Loads, _id: u32| async move {
                loads.fetch_add(1, Ordering::SeqCst);
                Ok(None)
            },
        );
        assert!(cache.get(&3).await.unwrap().is_none());
        assert!(cache.get(&3).await.unwrap().is_none());
        assert_eq!(loads.load(Ordering::SeqCst), 2);
    }
}
