//! inspection_server — standalone REST server for the inspection backend.
//!
//! Reads config from env vars; see `config::Config` for the full key list.

use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;

use inspection_core::ports::{AnswerStore, DirectoryStore, ImageIndex, InspectionStore};
use inspection_core::service::InspectionService;
use inspection_postgres::PgStores;
use inspection_server::config::Config;
use inspection_server::mailer::Mailer;
use inspection_server::middleware::jwt::JwtConfig;
use inspection_server::router::build_router;
use inspection_server::state::AppState;
use inspection_server::storage::FileStore;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,inspection_server=debug".into()),
        )
        .init();

    dotenvy::dotenv().ok();
    let config = Config::from_env().expect("invalid configuration");

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await
        .expect("failed to connect to database");
    tracing::info!("Connected to database");

    let stores = PgStores::new(pool);
    let service = InspectionService::new(
        Arc::new(stores.inspections) as Arc<dyn InspectionStore>,
        Arc::new(stores.answers) as Arc<dyn AnswerStore>,
        Arc::new(stores.images) as Arc<dyn ImageIndex>,
        Arc::new(stores.directory) as Arc<dyn DirectoryStore>,
    );

    let storage = FileStore::new(
        config.storage_path.clone(),
        config.public_url_base.clone(),
        config.public_url_prefix.clone(),
    );

    let mailer = match &config.smtp {
        Some(smtp) => match Mailer::from_config(smtp) {
            Ok(m) => Some(m),
            Err(e) => {
                tracing::error!("SMTP transport not built: {e}; notifications disabled");
                None
            }
        },
        None => {
            tracing::warn!("SMTP_HOST unset; notifications disabled");
            None
        }
    };

    let state = Arc::new(AppState {
        service,
        storage,
        mailer,
        template_path: config.template_path.clone(),
        report_image_box: (config.report_image_width, config.report_image_height),
    });

    let jwt_config = JwtConfig::from_secret(config.jwt_secret.as_bytes());
    let app = build_router(state, jwt_config);

    let listener = TcpListener::bind(&config.bind_addr)
        .await
        .unwrap_or_else(|e| panic!("failed to bind to {}: {e}", config.bind_addr));
    tracing::info!("inspection_server listening on {}", config.bind_addr);

    axum::serve(listener, app).await.expect("server error");
}
