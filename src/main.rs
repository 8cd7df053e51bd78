use anyhow::Context;
use library_services::{
    adapters::{
        http::CatalogClient,
        mock::{InMemoryBookRepository, InMemoryLoanRepository},
        postgres::{PostgresBookRepository, PostgresLoanRepository},
    },
    api::{
        catalog::CatalogState, create_catalog_router, create_gateway_router, create_loan_router,
        loan::LoanState,
    },
    application::{catalog::CatalogDependencies, loan::ServiceDependencies},
    ports::{BookRepository, LoanRepository},
    settings::{DatabaseSettings, Service, Settings, Storage},
};
use sqlx::{PgPool, postgres::PgPoolOptions};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "library_services=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let settings = Settings::load()?;
    tracing::info!(service = ?settings.service, storage = ?settings.storage, "Starting");

    let app = match settings.service {
        Service::Catalog => {
            let book_repository: Arc<dyn BookRepository> = match settings.storage {
                Storage::Postgres => {
                    Arc::new(PostgresBookRepository::new(connect(&settings.database).await?))
                }
                Storage::Memory => Arc::new(InMemoryBookRepository::new()),
            };
            let deps = CatalogDependencies { book_repository };
            create_catalog_router(Arc::new(CatalogState { deps }))
        }
        Service::Loan => {
            let loan_repository: Arc<dyn LoanRepository> = match settings.storage {
                Storage::Postgres => {
                    Arc::new(PostgresLoanRepository::new(connect(&settings.database).await?))
                }
                Storage::Memory => Arc::new(InMemoryLoanRepository::new()),
            };
            let availability_oracle = Arc::new(
                CatalogClient::new(&settings.catalog.base_url, settings.catalog.timeout())
                    .context("Failed to build catalog client")?,
            );
            tracing::info!(catalog = %settings.catalog.base_url, "Using catalog service");

            let deps = ServiceDependencies {
                loan_repository,
                availability_oracle,
                policy: settings.loan.policy(),
            };
            create_loan_router(Arc::new(LoanState { deps }))
        }
        Service::Gateway => create_gateway_router(),
    };

    // Server configuration
    let addr = settings.server.address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    tracing::info!("Server listening on {}", addr);

    // Start server
    axum::serve(listener, app)
        .await
        .context("Failed to start server")?;

    Ok(())
}

/// Connects to PostgreSQL and applies pending migrations
async fn connect(database: &DatabaseSettings) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(database.max_connections)
        .connect(&database.url)
        .await
        .context("Failed to connect to database")?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run migrations")?;

    Ok(pool)
}
