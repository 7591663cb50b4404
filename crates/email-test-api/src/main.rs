//! Email test service - Entry point.

use email_test_api::{
    api::{create_router, AppState},
    config::Config,
    EmailTestSender, EmailTypeCatalog, HttpEmailSink, MySqlEmailSource,
};
use secrecy::ExposeSecret;
use sqlx::mysql::MySqlPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() {
    // Load configuration
    let config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {:#}", e);
            std::process::exit(1);
        }
    };

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log.level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting email test service");

    let catalog = match EmailTypeCatalog::load(&config.email.types_path) {
        Ok(c) => Arc::new(c),
        Err(e) => {
            error!("Failed to load email types: {}", e);
            std::process::exit(1);
        }
    };

    let pool = match MySqlPoolOptions::new()
        .max_connections(config.database.max_connections)
        .connect(config.database.url.expose_secret())
        .await
    {
        Ok(p) => p,
        Err(e) => {
            error!("Failed to connect to the mail store: {}", e);
            std::process::exit(1);
        }
    };
    info!("Mail store connection pool created");

    let sink = match HttpEmailSink::new(
        config.email.incoming_url.clone(),
        config.email.default_to.clone(),
        config.email.default_from.clone(),
        config.email.timeout,
    ) {
        Ok(s) => s,
        Err(e) => {
            error!("Failed to create email sink: {}", e);
            std::process::exit(1);
        }
    };

    let source = MySqlEmailSource::new(pool.clone(), catalog.clone());
    let sender = EmailTestSender::new(Arc::new(source), Arc::new(sink))
        .with_interval(config.email.send_interval);

    let app = create_router(AppState::new(sender, catalog));

    // Bind to address
    let addr = SocketAddr::new(
        config.server.listen_addr.parse().unwrap_or([0, 0, 0, 0].into()),
        config.server.port,
    );

    info!("Listening on {}", addr);

    let listener = match TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            error!("Failed to bind to {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    // Run server
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            info!("Shutdown requested");
        })
        .await;

    pool.close().await;

    if let Err(e) = served {
        error!("Server error: {}", e);
        std::process::exit(1);
    }
}
