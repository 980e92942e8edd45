use std::process::ExitCode;

use log::{error, info};
use recepie_api::{config::Config, routes, state::AppState};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            error!("Configuration error: {e}");
            return ExitCode::FAILURE;
        }
    };
    let bind_address = config.bind_address;

    let state = match AppState::new(config).await {
        Ok(state) => state,
        Err(e) => {
            error!("Could not open the database: {e}");
            return ExitCode::FAILURE;
        }
    };

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Could not listen for shutdown signal: {e}");
        }
        info!("Shutting down");
    };

    let server = warp::serve(routes::api(state))
        .try_bind_with_graceful_shutdown(bind_address, shutdown);

    match server {
        Ok((address, server)) => {
            info!("Listening on http://{address}");
            server.await;
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Could not bind {bind_address}: {e}");
            ExitCode::FAILURE
        }
    }
}
