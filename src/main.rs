use meme_locker::{config::Config, errors::AppError, routes::create_router, startup::build_state};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // Initialize tracing (logging)
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "meme_locker=debug,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration (also loads .env if present) ---
    let config = Config::load().inspect_err(|e| tracing::error!("Failed to load configuration: {}", e))?;
    tracing::info!(backend = ?config.backend, bucket = %config.meme_bucket_name, table = %config.memes_table_name, "Configuration loaded");

    // --- Backends and shared state ---
    let state = build_state(&config).await?;

    let app = create_router(state, config.max_upload_bytes);

    // --- Server Startup ---
    tracing::info!("Server listening on http://{}", config.bind_address);
    let listener = tokio::net::TcpListener::bind(config.bind_address).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        // Without a signal handler, serve until killed
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
