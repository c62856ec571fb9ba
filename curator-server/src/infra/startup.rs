use std::sync::Arc;

use anyhow::Context;
use curator_config::Config;
use curator_core::{
    MIGRATOR, SystemClock,
    database::Stores,
    jellyfin::{DisabledSink, JellyfinClient, LibrarySource, MetadataSink},
    providers::{ProviderRegistry, TvMazeProvider},
};
use sqlx::postgres::PgPoolOptions;
use tracing::{info, warn};

/// Connect the configured backends. Missing optional backends degrade to
/// in-memory stores and a disabled sink.
pub async fn build_parts(config: &Config) -> anyhow::Result<super::app_state::AppParts> {
    let stores = connect_stores(config).await?;

    let (sink, library_source): (Arc<dyn MetadataSink>, Option<Arc<dyn LibrarySource>>) =
        match &config.jellyfin {
            Some(jellyfin) => {
                let client = Arc::new(
                    JellyfinClient::new(&jellyfin.url, jellyfin.api_key.clone(), jellyfin.timeout())
                        .context("failed to build Jellyfin client")?,
                );
                info!(url = %jellyfin.url, "Jellyfin write-back enabled");
                let sink: Arc<dyn MetadataSink> = client.clone();
                let source: Arc<dyn LibrarySource> = client;
                (sink, Some(source))
            }
            None => (Arc::new(DisabledSink), None),
        };

    Ok(super::app_state::AppParts {
        stores,
        sink,
        library_source,
        providers: build_providers(config)?,
        clock: Arc::new(SystemClock),
    })
}

async fn connect_stores(config: &Config) -> anyhow::Result<Stores> {
    let Some(url) = config.database.url.as_deref() else {
        warn!("no database configured; items and jobs will not survive a restart");
        return Ok(Stores::in_memory());
    };

    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .connect(url)
        .await
        .context("failed to connect to PostgreSQL")?;
    MIGRATOR
        .run(&pool)
        .await
        .context("failed to apply database migrations")?;
    info!(
        max_connections = config.database.max_connections,
        "connected to PostgreSQL"
    );
    Ok(Stores::postgres(pool))
}

pub fn build_providers(config: &Config) -> anyhow::Result<ProviderRegistry> {
    let mut registry = ProviderRegistry::new();
    if config.providers.tvmaze_enabled {
        let tvmaze = TvMazeProvider::new(config.providers.timeout())
            .context("failed to build TVMaze provider")?;
        registry.register(Arc::new(tvmaze));
    }
    Ok(registry)
}
