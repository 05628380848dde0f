use std::sync::Arc;

use anyhow::Context;

use gitclub_api::config::ApiConfig;
use gitclub_infra::PolicyConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    gitclub_observability::init();

    let api = ApiConfig::from_env()?;
    let policy = PolicyConfig::from_env()?;
    tracing::info!(?api, ?policy, "starting gitclub api");

    let services = gitclub_api::app::services::build_services(&api, &policy).await?;
    let app = gitclub_api::app::build_app(Arc::new(services));

    let listener = tokio::net::TcpListener::bind(api.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", api.bind_addr))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
