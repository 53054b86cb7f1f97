use library_ledger::{
    adapters::memory::InMemoryLibrary,
    adapters::postgres::{PostgresBookCatalog, PostgresLedgerStore, PostgresUserDirectory},
    api::{handlers::AppState, router::create_router},
    application::loan::ServiceDependencies,
    config::{Config, StorageBackend},
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// 設定に従ってストレージを組み立てる
async fn build_dependencies(
    config: &Config,
) -> Result<ServiceDependencies, Box<dyn std::error::Error>> {
    match config.storage_backend {
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage; data is lost on shutdown");
            let library = Arc::new(InMemoryLibrary::new(config.loan_policy));
            Ok(ServiceDependencies {
                ledger_store: library.clone(),
                book_catalog: library.clone(),
                user_directory: library,
            })
        }
        StorageBackend::Postgres => {
            // Initialize database connection pool
            let pool = sqlx::postgres::PgPoolOptions::new()
                .max_connections(config.max_connections)
                .connect(&config.database_url)
                .await?;

            sqlx::migrate!("./migrations").run(&pool).await?;
            tracing::info!("Database migrations applied");

            Ok(ServiceDependencies {
                ledger_store: Arc::new(PostgresLedgerStore::new(pool.clone(), config.loan_policy)),
                book_catalog: Arc::new(PostgresBookCatalog::new(pool.clone())),
                user_directory: Arc::new(PostgresUserDirectory::new(pool)),
            })
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "library_ledger=debug,tower_http=debug,axum=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    tracing::info!(
        backend = ?config.storage_backend,
        grace_period_days = config.loan_policy.grace_period_days,
        fee_per_day = config.loan_policy.fee_per_day,
        "Starting library ledger"
    );

    let service_deps = build_dependencies(&config).await?;

    // Create application state
    let app_state = Arc::new(AppState { service_deps });

    let app = create_router(app_state);

    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
