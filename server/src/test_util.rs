use axum::{
    body::{to_bytes, Body},
    response::Response,
    Router,
};
use deadpool_postgres::Pool;
use futures::Future;
use http::{
    header::{AUTHORIZATION, CONTENT_TYPE, HOST},
    Method, Request,
};
use once_cell::sync::Lazy;
use serde_json::Value;
use time::{Duration, OffsetDateTime};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::{
    auth::{AuthState, Claims, UserMetadata},
    config::{AuthConfiguration, Configuration, LimitsConfiguration, ListenConfiguration},
    setup::{create_database_pool, create_state, router, run_migrations},
};

pub const TEST_SECRET: &str = "formbuilder-test-secret";

/// Environment configuration when complete, a local database otherwise.
static CONFIGURATION: Lazy<Configuration> =
    Lazy::new(|| Configuration::load().unwrap_or_else(|_| local_configuration()));

static RAN_MIGRATIONS: Lazy<Mutex<bool>> = Lazy::new(|| Mutex::new(false));

fn local_configuration() -> Configuration {
    let mut postgres = deadpool_postgres::Config::new();
    postgres.host = Some("localhost".into());
    postgres.port = Some(5432);
    postgres.dbname = Some("formbuilder_test".into());
    postgres.user = Some("postgres".into());
    postgres.password = Some("postgres".into());
    Configuration {
        listen: ListenConfiguration::default(),
        postgres,
        auth: AuthConfiguration {
            jwt_secret: TEST_SECRET.into(),
            audience: crate::config::DEFAULT_AUDIENCE.into(),
        },
        limits: LimitsConfiguration::default(),
    }
}

fn setup_test_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn test_pool() -> Pool {
    create_database_pool(&CONFIGURATION.postgres).expect("Failed to create pool")
}

/// Runs `func` against a router whose database is never touched unless a
/// handler gets that far. The pool connects lazily.
pub async fn run_test<F, T>(func: F) -> T::Output
where
    T: Future + Send + 'static,
    T::Output: Send + 'static,
    F: FnOnce(Router) -> T,
{
    setup_test_tracing();
    let state = create_state(&CONFIGURATION, test_pool());
    func(router(state)).await
}

/// Like [`run_test`] but migrates the database first.
pub async fn run_db_test<F, T>(func: F) -> T::Output
where
    T: Future + Send + 'static,
    T::Output: Send + 'static,
    F: FnOnce(Router) -> T,
{
    setup_test_tracing();
    let pool = test_pool();
    {
        let mut lock = RAN_MIGRATIONS.lock().await;
        if !*lock {
            let mut client = pool.get().await.expect("Failed to get connection");
            run_migrations(&mut client)
                .await
                .expect("Failed to run migrations");
            *lock = true;
        }
    }
    let state = create_state(&CONFIGURATION, pool);
    func(router(state)).await
}

/// Signs an access token for `user` the way the identity provider would.
pub fn token(user: Uuid, email: &str) -> String {
    let auth = AuthState::new(
        &CONFIGURATION.auth.jwt_secret,
        &CONFIGURATION.auth.audience,
    );
    let claims = Claims {
        sub: user,
        email: email.to_owned(),
        aud: CONFIGURATION.auth.audience.clone(),
        exp: (OffsetDateTime::now_utc() + Duration::hours(1)).unix_timestamp() as u64,
        user_metadata: UserMetadata {
            full_name: Some("Test User".into()),
            ..Default::default()
        },
    };
    auth.encode(&claims).expect("Failed to sign token")
}

/// A fresh user id with a matching token.
pub fn new_user() -> (Uuid, String) {
    let id = Uuid::new_v4();
    let token = token(id, &format!("{id}@example.com"));
    (id, token)
}

/// Grants admin rights directly in the database. The user must already have
/// made an authenticated request.
pub async fn promote_to_admin(user: Uuid) {
    let client = test_pool().get().await.expect("Failed to get connection");
    client
        .execute("update users set is_admin = true where id = $1", &[&user])
        .await
        .expect("Failed to promote user");
}

pub fn request(method: Method, path: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(path)
        .header(HOST, "127.0.0.1")
        .body(Body::empty())
        .unwrap()
}

pub fn authed_request(method: Method, path: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(path)
        .header(HOST, "127.0.0.1")
        .header(AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap()
}

pub fn json_request(method: Method, path: &str, token: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(path)
        .header(HOST, "127.0.0.1")
        .header(AUTHORIZATION, format!("Bearer {token}"))
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub async fn body_to_string(response: Response) -> String {
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8_lossy(&body).to_string()
}

pub async fn body_to_json(response: Response) -> Value {
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&body).unwrap()
}
