use std::sync::Arc;

use tokio::time::Duration;
use tracing_subscriber::EnvFilter;

use delivery_router::api;
use delivery_router::config::{self, LogFormat};
use delivery_router::engine::geocoder::MockGeocoder;
use delivery_router::engine::simulation::spawn_courier_simulation;
use delivery_router::engine::zones::ZoneCatalog;
use delivery_router::error::AppError;
use delivery_router::state::AppState;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let config = config::Config::from_env()?;

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(config.log_level.clone()))
        .with_target(false);
    match config.log_format {
        LogFormat::Json => subscriber.json().init(),
        LogFormat::Compact => subscriber.compact().init(),
    }

    let catalog = match &config.zones_file {
        Some(path) => ZoneCatalog::from_json_file(path)?,
        None => ZoneCatalog::default(),
    };
    let city_center = catalog
        .reference_center()
        .ok_or_else(|| AppError::Internal("zone catalog has no reference center".to_string()))?;
    tracing::info!(
        zones = catalog.zones.len(),
        express_options = catalog.express_options.len(),
        "zone catalog loaded"
    );

    let geocoder = MockGeocoder::new(city_center, config.geocoder_strict);
    let shared_state = Arc::new(AppState::new(
        catalog,
        Arc::new(geocoder),
        config.event_buffer_size,
    ));

    let simulation = (config.simulation_interval_secs > 0).then(|| {
        spawn_courier_simulation(
            shared_state.clone(),
            Duration::from_secs(config.simulation_interval_secs),
        )
    });

    let app = api::rest::router(shared_state.clone());

    let bind_addr = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|err| AppError::Internal(format!("failed to bind {bind_addr}: {err}")))?;

    tracing::info!(http_port = config.http_port, "http server started");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| AppError::Internal(format!("server error: {err}")))?;

    if let Some(simulation) = simulation {
        simulation.stop();
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
    }
}
