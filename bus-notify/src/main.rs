use bus_notify::cache::{CacheConfig, CachedProximity};
use bus_notify::config::{ServerConfig, WatchConfig};
use bus_notify::metadata::{AnySource, MetadataClient, MetadataConfig, MockMetadataSource};
use bus_notify::proximity::Proximity;
use bus_notify::watch::{RecentNotifications, SystemClock, TracingSink, Watcher};
use bus_notify::web::{AppState, create_router};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("bus_notify=info")),
        )
        .init();

    if let Err(e) = run().await {
        error!("{e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = ServerConfig::from_env()?;

    // Pick the upstream: fixtures or the live service
    let source = match &config.mock_dir {
        Some(dir) => {
            let mock = MockMetadataSource::from_dir(dir)?;
            info!(dir = %dir.display(), stops = mock.stop_ids().len(), "serving mock fixtures");
            AnySource::Mock(mock)
        }
        None => AnySource::Live(MetadataClient::new(MetadataConfig::default())?),
    };

    let proximity = Proximity::mercator(source, config.proximity.clone());
    let cached = CachedProximity::new(proximity, &CacheConfig::default());

    // Notifications go to the log and to the API
    let watch_config = WatchConfig::default();
    let recent = RecentNotifications::new(watch_config.history);
    let watcher = Watcher::spawn(&watch_config, SystemClock, (TracingSink, recent.clone()));

    let state = AppState::new(cached, watcher, recent);
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    info!(addr = %config.addr, "bus-notify listening");
    info!("  GET    /health              - Health check");
    info!("  GET    /stops?lat=&lng=     - Nearby bus stops");
    info!("  GET    /stops/:id/schedule  - Lines and departures at a stop");
    info!("  GET    /watch               - Line being watched");
    info!("  POST   /watch               - Watch a line");
    info!("  DELETE /watch               - Stop watching");
    info!("  GET    /notifications       - Recent notifications");
    info!("  DELETE /cache               - Drop cached searches and schedules");

    axum::serve(listener, app).await?;
    Ok(())
}
