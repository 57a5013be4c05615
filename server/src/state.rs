use std::sync::Arc;

use deadpool_postgres::{Object, Pool};
use storage::ContractCache;

use crate::{auth::AuthState, config::LimitsConfiguration};

#[derive(Clone)]
pub struct AppState(Arc<InternalState>);

pub(super) struct InternalState {
    pool: Pool,
    auth: AuthState,
    contracts: ContractCache,
    limits: LimitsConfiguration,
}

impl AppState {
    pub fn new(pool: Pool, auth: AuthState, limits: LimitsConfiguration) -> Self {
        let contracts = ContractCache::new(
            pool.clone(),
            limits.contract_cache_size,
            limits.contract_cache_ttl(),
        );
        Self(Arc::new(InternalState {
            pool,
            auth,
            contracts,
            limits,
        }))
    }

    pub async fn conn(&self) -> Result<Object, deadpool_postgres::PoolError> {
        self.0.pool.get().await
    }

    pub fn auth(&self) -> &AuthState {
        &self.0.auth
    }

    pub fn contracts(&self) -> &ContractCache {
        &self.0.contracts
    }

    pub fn limits(&self) -> &LimitsConfiguration {
        &self.0.limits
    }
}
