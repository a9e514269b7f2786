use anyhow::Result;
use pi_payments::{
    config::config_loader,
    infrastructure::{
        axum_http::http_serve, pi_network::client::PiNetworkClient,
        postgres::postgres_connection,
    },
};
use std::{sync::Arc, time::Duration};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // Without a subscriber nothing logged through tracing would be printed.
    if let Err(error) = pi_payments::observability::init_observability("pi-payments") {
        eprintln!("pi-payments failed to initialize logging: {:#}", error);
        std::process::exit(1);
    }

    if let Err(error) = run().await {
        error!("pi-payments exited with error: {:#}", error);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let dotenvy_env = config_loader::load()?;
    info!("ENV has been loaded");

    let postgres_pool = postgres_connection::establish_connection(&dotenvy_env.database.url)?;
    info!("Postgres connection has been established");

    let pi_network = &dotenvy_env.pi_network;
    let payment_gateway = PiNetworkClient::new(
        pi_network.api_key.clone(),
        &pi_network.wallet_private_seed,
        &pi_network.base_url,
        Duration::from_secs(pi_network.http_timeout),
    )?;
    info!("Pi Network client has been initialized");

    http_serve::start(
        Arc::new(dotenvy_env),
        Arc::new(postgres_pool),
        Arc::new(payment_gateway),
    )
    .await?;

    Ok(())
}
