use std::sync::Arc;

use anyhow::Context;

use authgate_api::app::{AppServices, build_app};
use authgate_core::Settings;
use authgate_infra::PgStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    authgate_observability::init();

    let settings = Settings::from_env().context("invalid configuration")?;

    let services = match settings.database_url.as_deref() {
        Some(url) => {
            let store = PgStore::connect(url)
                .await
                .context("failed to connect to postgres")?;
            store
                .ensure_schema()
                .await
                .context("failed to create schema")?;
            AppServices::persistent(Arc::new(store), &settings)
        }
        None => {
            tracing::warn!("DATABASE_URL not set; using in-memory stores");
            AppServices::in_memory(&settings)
        }
    };

    let app = build_app(services);

    let listener = tokio::net::TcpListener::bind(&settings.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", settings.bind_addr))?;

    tracing::info!(addr = %listener.local_addr()?, "listening");

    axum::serve(listener, app).await?;
    Ok(())
}
