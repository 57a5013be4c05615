use axum::Router;
use formbuilder_server::{
    config::{Configuration, ListenConfiguration},
    setup::{create_database_pool, create_state, router, run_migrations},
    telemetry::setup_tracing,
};
use futures::{Future, FutureExt};
use tokio::{net::TcpListener, signal};
use tracing::info;

#[tokio::main]
async fn main() {
    setup().await;
}

async fn setup() {
    setup_tracing();

    let configuration = Configuration::load().expect("Failed to load configuration");
    info!("Setting up database...");

    let pool = create_database_pool(&configuration.postgres).expect("Failed to create pool");
    {
        let mut conn = pool
            .get()
            .await
            .expect("Failed to get database connection");
        run_migrations(&mut conn)
            .await
            .expect("Failed to run migrations");
    }

    let listen = configuration.listen.clone();
    let state = create_state(&configuration, pool);
    let router = router(state);

    let shutdown_future = signal::ctrl_c().map(|fut| {
        fut.expect("Error occurred while waiting for Ctrl+C signal");
        info!("Received shutdown signal");
    });

    start_server(listen, router, shutdown_future).await;
    info!("Shutdown complete");
}

async fn start_server(
    listen: ListenConfiguration,
    router: Router<()>,
    future: impl Future<Output = ()> + Send + 'static,
) {
    let listener = TcpListener::bind(&listen.http)
        .await
        .expect("Failed to bind listener");
    info!("Listening on {}...", listen.http);
    axum::serve(listener, router)
        .with_graceful_shutdown(future)
        .await
        .expect("Server crashed");
}
