//! PostgreSQL adapters built on `sqlx`.

mod items;
mod jobs;
mod libraries;

pub use items::PostgresItemRepository;
pub use jobs::PostgresJobRepository;
pub use libraries::PostgresLibraryRepository;
