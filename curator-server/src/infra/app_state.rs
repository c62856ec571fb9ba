use std::{fmt, sync::Arc};

use curator_config::Config;
use curator_core::{
    BulkOperationService, Clock, JobRunner, LibraryScanner, PreviewTokenStore, RunnerConfig,
    SystemClock,
    database::Stores,
    jellyfin::{DisabledSink, LibrarySource, LibrarySyncService, MetadataSink},
    operations::DEFAULT_PREVIEW_TTL_SECS,
    providers::ProviderRegistry,
};
use tokio_util::sync::CancellationToken;

/// Adapters the state is wired from. Startup fills these from configuration;
/// tests substitute in-memory or fake ones.
pub struct AppParts {
    pub stores: Stores,
    pub sink: Arc<dyn MetadataSink>,
    /// `None` when Jellyfin is not configured
    pub library_source: Option<Arc<dyn LibrarySource>>,
    pub providers: ProviderRegistry,
    pub clock: Arc<dyn Clock>,
}

impl AppParts {
    /// In-memory stores with external writes disabled.
    pub fn in_memory() -> Self {
        Self {
            stores: Stores::in_memory(),
            sink: Arc::new(DisabledSink),
            library_source: None,
            providers: ProviderRegistry::new(),
            clock: Arc::new(SystemClock),
        }
    }
}

impl fmt::Debug for AppParts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppParts")
            .field("sink_enabled", &self.sink.is_enabled())
            .field("library_source", &self.library_source.is_some())
            .field("providers", &self.providers)
            .finish_non_exhaustive()
    }
}

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub stores: Stores,
    pub operations: Arc<BulkOperationService>,
    pub scanner: Arc<LibraryScanner>,
    pub sync: Option<Arc<LibrarySyncService>>,
    pub providers: Arc<ProviderRegistry>,
    pub shutdown: CancellationToken,
}

impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState").finish_non_exhaustive()
    }
}

impl AppState {
    pub fn new(config: Config, parts: AppParts, shutdown: CancellationToken) -> Self {
        let AppParts {
            stores,
            sink,
            library_source,
            providers,
            clock,
        } = parts;

        let ttl = chrono::Duration::from_std(config.operations.preview_ttl())
            .unwrap_or_else(|_| chrono::Duration::seconds(DEFAULT_PREVIEW_TTL_SECS));
        let tokens = Arc::new(PreviewTokenStore::new(ttl, clock));

        let runner = Arc::new(JobRunner::new(
            Arc::clone(&stores.items),
            Arc::clone(&stores.jobs),
            sink,
            RunnerConfig {
                batch_size: config.operations.batch_size,
                batch_delay: config.operations.batch_delay(),
                max_concurrent_jobs: config.operations.max_concurrent_jobs,
            },
            shutdown.clone(),
        ));

        let operations = Arc::new(
            BulkOperationService::new(
                Arc::clone(&stores.items),
                Arc::clone(&stores.jobs),
                tokens,
                runner,
            )
            .with_max_scope_items(config.operations.max_scope_items),
        );

        let scanner = Arc::new(
            LibraryScanner::new(Arc::clone(&stores.items), Arc::clone(&stores.libraries))
                .with_batch_size(config.scan.batch_size),
        );

        let sync = library_source.map(|source| {
            Arc::new(LibrarySyncService::new(
                source,
                Arc::clone(&stores.items),
                Arc::clone(&stores.libraries),
            ))
        });

        Self {
            config: Arc::new(config),
            stores,
            operations,
            scanner,
            sync,
            providers: Arc::new(providers),
            shutdown,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn runner(&self) -> &Arc<JobRunner> {
        self.operations.runner()
    }
}
