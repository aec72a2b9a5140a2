//! socialcore binary entry point

use socialcore::service::AnnouncementService;
use socialcore::{AppState, config};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Application entry point
///
/// # Setup
/// 1. Initialize tracing/logging
/// 2. Load configuration from file and environment
/// 3. Initialize AppState
/// 4. Build Axum router
/// 5. Start background tasks (announcement publisher)
/// 6. Start HTTP server
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Initialize tracing/logging
    let log_format =
        std::env::var("SOCIALCORE__LOGGING__FORMAT").unwrap_or_else(|_| "pretty".to_string());

    if log_format == "json" {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "socialcore=info,tower_http=debug".into()),
            )
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "socialcore=info,tower_http=debug".into()),
            )
            .with(tracing_subscriber::fmt::layer().pretty())
            .init();
    }

    tracing::info!("Starting socialcore...");

    // 2. Initialize metrics
    socialcore::metrics::init_metrics();

    // 3. Load configuration
    let config = config::AppConfig::load()?;
    tracing::info!(
        domain = %config.server.domain,
        protocol = %config.server.protocol,
        "Configuration loaded"
    );

    // 4. Initialize application state
    let state = AppState::new(config.clone()).await?;

    // 5. Build Axum router
    let app = socialcore::build_router(state.clone());

    // 6. Start background tasks
    if config.announcements.scheduler_enabled {
        spawn_announcement_publisher_task(state.clone());
    }

    // 7. Start HTTP server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Server listening on {}", addr);
    tracing::info!("Public URL: {}", config.server.base_url());

    axum::serve(listener, app).await?;

    Ok(())
}

/// Spawn background task publishing due scheduled announcements
fn spawn_announcement_publisher_task(state: AppState) {
    tokio::spawn(async move {
        let interval_secs = state.config.announcements.publish_interval_seconds;
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(interval_secs));
        let service = AnnouncementService::new(state.db.clone());

        loop {
            interval.tick().await;

            match service.publish_due(chrono::Utc::now()).await {
                Ok(0) => tracing::debug!("No scheduled announcements due"),
                Ok(count) => tracing::info!(count, "Published scheduled announcements"),
                Err(error) => tracing::error!(%error, "Scheduled announcement publishing failed"),
            }
        }
    });

    tracing::info!("Announcement publisher task spawned");
}
