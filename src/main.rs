//! `nimbusd`: the Nimbus orchestrator binary. Loads configuration from
//! the environment, wires every collaborator together, and serves the
//! HTTP surface while the cleanup sweeper runs alongside it.

use anyhow::Context;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .json()
        .init();

    let config = nimbus_config::Config::from_env().context("failed to load configuration")?;
    let bind_addr = config.bind_addr.clone();

    let orchestrator = nimbus::bootstrap(config)
        .await
        .context("failed to initialize orchestrator")?;

    tokio::spawn(orchestrator.sweeper.run());

    let router = nimbus_server::router(orchestrator.state);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;

    tracing::info!(%bind_addr, "nimbusd listening");
    axum::serve(listener, router)
        .await
        .context("server exited with an error")?;

    Ok(())
}
