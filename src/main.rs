use std::net::SocketAddr;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use healthpool::api::middleware::session::{create_session_layer, AppState};
use healthpool::config::Config;
use healthpool::db;
use healthpool::services::{credentials, notifier::Notifier};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "healthpool=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting health pool server...");

    // Load configuration
    let config = Config::from_env()?;
    tracing::info!("Configuration loaded successfully");

    // Create database pool
    let pool = db::create_pool(&config.database_url).await?;
    tracing::info!("Database pool created");

    // Run migrations
    db::run_migrations(&pool).await?;
    tracing::info!("Database migrations completed");

    // Seed the bootstrap admin
    if credentials::ensure_default_admin(&pool, &config.bootstrap_admin_password()).await? {
        tracing::info!("Default admin account created");
    }

    // Create session layer
    let session_layer = create_session_layer(pool.clone(), config.secure_cookies).await?;
    tracing::info!("Session layer initialized");

    let notifier = Notifier::from_config(config.sms.as_ref());

    // Build application state
    let state = AppState {
        pool: pool.clone(),
        config: config.clone(),
        notifier,
    };

    let app = healthpool::api::app(state, session_layer);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    tracing::info!("Listening on {}", addr);

    // Start server
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    pool.close().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        return;
    }
    tracing::info!("Shutdown signal received, cleaning up...");
}
