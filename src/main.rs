use journeystack::config::AppConfig;
use journeystack::db::init_pool;
use journeystack::error::AppError;
use journeystack::routes::create_router;
use journeystack::services::{google::GoogleVerifier, storage::StorageService};
use journeystack::state::AppState;
use tokio::net::TcpListener;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_logging();

    let config = AppConfig::from_env()?;
    let db = init_pool(&config.database_url).await?;

    if let Err(err) = sqlx::migrate!("./migrations").run(&db).await {
        error!("migration failed: {err:?}");
        return Err(err.into());
    }

    let storage = StorageService::new(config.media_root.clone(), config.public_base_url.clone());
    storage.ensure_structure().await?;

    let google = config.google_client_id.clone().map(GoogleVerifier::new);
    if google.is_none() {
        info!("GOOGLE_CLIENT_ID not set, google sign-in disabled");
    }

    let state = AppState::new(config.clone(), db, storage, google);
    let app = create_router(state);

    let listener = TcpListener::bind(config.listen_addr).await?;
    info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}

fn init_logging() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let fmt_layer = tracing_subscriber::fmt::layer().with_target(false);
    let filter_layer = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,journeystack=debug,tower_http=debug".into());

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .init();
}
