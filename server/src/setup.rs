use std::ops::DerefMut;

use axum::{error_handling::HandleErrorLayer, Router};
use deadpool_postgres::{Config, CreatePoolError, Object, Pool};
use refinery::Error as MigrationError;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::{
    auth::AuthState, config::Configuration, embedded, handle_timeout_error, routes::setup_router,
    AppState,
};

pub fn create_state(config: &Configuration, pool: Pool) -> AppState {
    let auth = AuthState::new(&config.auth.jwt_secret, &config.auth.audience);
    AppState::new(pool, auth, config.limits.clone())
}

pub fn router(state: AppState) -> Router<()> {
    let timeout = state.limits().request_timeout();
    let service = ServiceBuilder::new()
        .layer(CorsLayer::permissive())
        .layer(HandleErrorLayer::new(handle_timeout_error))
        .timeout(timeout);

    setup_router().layer(service).with_state(state)
}

pub fn create_database_pool(configuration: &Config) -> Result<Pool, CreatePoolError> {
    configuration.create_pool(
        Some(deadpool_postgres::Runtime::Tokio1),
        tokio_postgres::NoTls,
    )
}

pub async fn run_migrations(client: &mut Object) -> Result<(), MigrationError> {
    info!("Running migrations on database...");
    let report = embedded::migrations::runner()
        .run_async(client.as_mut().deref_mut())
        .await?;
    info!(
        applied = report.applied_migrations().len(),
        "Database migrations complete"
    );
    Ok(())
}
