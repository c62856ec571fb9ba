pub mod memory;
pub mod ports;
#[cfg(feature = "database")]
#[cfg_attr(docsrs, doc(cfg(feature = "database")))]
pub mod postgres;

use std::sync::Arc;

pub use memory::{InMemoryItemRepository, InMemoryJobRepository, InMemoryLibraryRepository};
pub use ports::{
    ItemFilter, ItemOrder, ItemRepository, ItemUpdate, JobFilter, JobRepository, JobUpdate,
    LibraryRepository, LogOrder, MisclassificationUpdate, Page,
};

/// The three stores every service is wired against.
#[derive(Clone)]
pub struct Stores {
    pub items: Arc<dyn ItemRepository>,
    pub libraries: Arc<dyn LibraryRepository>,
    pub jobs: Arc<dyn JobRepository>,
}

impl std::fmt::Debug for Stores {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stores").finish_non_exhaustive()
    }
}

impl Stores {
    pub fn in_memory() -> Self {
        Self {
            items: Arc::new(InMemoryItemRepository::new()),
            libraries: Arc::new(InMemoryLibraryRepository::new()),
            jobs: Arc::new(InMemoryJobRepository::new()),
        }
    }

    #[cfg(feature = "database")]
    pub fn postgres(pool: sqlx::PgPool) -> Self {
        Self {
            items: Arc::new(postgres::PostgresItemRepository::new(pool.clone())),
            libraries: Arc::new(postgres::PostgresLibraryRepository::new(pool.clone())),
            jobs: Arc::new(postgres::PostgresJobRepository::new(pool)),
        }
    }
}
