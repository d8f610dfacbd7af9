use sqlx::postgres::PgPoolOptions;
use std::{sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use transit_scheduler::{
    AppState,
    config::{AppConfig, Env, StoreKind},
    create_router,
    repository::{InMemoryRepository, PostgresRepository, RepositoryState},
};

/// main
///
/// Wires configuration, logging, the Entity Store and the HTTP server.
/// Startup problems are fatal: the process exits before binding the port.
#[tokio::main]
async fn main() {
    // 1. Configuration (fail-fast on missing production secrets)
    dotenv::dotenv().ok();
    let config = AppConfig::load();

    // 2. Logging: RUST_LOG wins, otherwise sensible local defaults.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "transit_scheduler=debug,tower_http=info".into());

    match config.env {
        Env::Local => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!("Application starting in {:?} mode", config.env);

    // 3. Entity Store
    let db_timeout = Duration::from_secs(config.db_timeout_secs);
    let repo: RepositoryState = match config.store {
        StoreKind::Postgres => {
            let pool = PgPoolOptions::new()
                .max_connections(5)
                .acquire_timeout(db_timeout)
                .connect(&config.db_url)
                .await
                .expect("FATAL: Failed to connect to Postgres. Check DATABASE_URL.");

            let repo = PostgresRepository::new(pool).with_timeout(db_timeout);
            repo.migrate()
                .await
                .expect("FATAL: Failed to apply database migrations.");
            tracing::info!("Postgres store ready, migrations applied.");
            Arc::new(repo) as RepositoryState
        }
        StoreKind::Memory => {
            tracing::warn!("Using the in-memory store. Data is lost on exit.");
            Arc::new(InMemoryRepository::new()) as RepositoryState
        }
    };

    // 4. Unified State Assembly
    let port = config.port;
    let app_state = AppState::new(repo, config).expect("FATAL: Invalid BCRYPT_COST.");

    // 5. Router and Server Startup
    let app = create_router(app_state);

    let addr = format!("0.0.0.0:{port}");
    let listener = TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| panic!("FATAL: Failed to bind {addr}: {e}"));

    tracing::info!("Listening on {addr}");
    tracing::info!("API Documentation (Swagger UI) available at: http://localhost:{port}/swagger-ui");

    axum::serve(listener, app)
        .await
        .expect("FATAL: HTTP server terminated unexpectedly.");
}
