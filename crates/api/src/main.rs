use std::sync::Arc;

use anyhow::Context;

use forgeroute_infra::RoutingConfig;
use forgeroute_infra::workers::ExpirySweeper;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    forgeroute_observability::init();

    let config = RoutingConfig::from_env().context("invalid configuration")?;
    let services = Arc::new(forgeroute_api::app::services::build_services(&config).await?);

    let sweeper = ExpirySweeper::new(config.sweep_interval)
        .spawn("fulfillment.expiry_sweeper", services.engine())
        .context("failed to start expiry sweeper")?;

    let app = forgeroute_api::app::build_app(services);
    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await;

    tokio::task::spawn_blocking(move || sweeper.shutdown()).await?;
    served.context("server error")
}
