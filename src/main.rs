//! nickwarden - nickname and group-title lock enforcement agent.

use nickwarden::config::{Config, validate};
use nickwarden::lock::Warden;
use nickwarden::platform::BridgeClient;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "nickwarden.toml".to_string());

    let mut config = Config::load(&config_path).map_err(|e| {
        error!(path = %config_path, error = %e, "Failed to load config");
        e
    })?;
    config.apply_env_overrides();

    if let Err(errors) = validate(&config) {
        for e in &errors {
            error!(error = %e, "Invalid configuration");
        }
        return Err(anyhow::anyhow!(
            "Configuration has {} error(s). See messages above.",
            errors.len()
        ));
    }

    info!(
        operator = %config.operator.uid,
        bridge = %config.platform.bridge_addr,
        threshold = config.lock.violation_threshold,
        "Starting nickwarden"
    );

    nickwarden::metrics::init();

    if config.http.port != 0 {
        tokio::spawn(nickwarden::http::run_http_server(config.http.port));
    } else {
        info!("HTTP endpoint disabled");
    }

    let (client, events) =
        BridgeClient::connect(&config.platform.bridge_addr, config.platform.event_buffer)
            .await
            .map_err(|e| {
                error!(addr = %config.platform.bridge_addr, error = %e, "Failed to connect to bridge");
                e
            })?;

    Warden::new(&config, Arc::new(client)).run(events).await;

    info!("nickwarden stopped");
    Ok(())
}
