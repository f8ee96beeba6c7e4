//! inspection_postgres — PostgreSQL implementations of the inspection_core
//! port traits.
//!
//! Each adapter is a newtype wrapping PgPool. All SQL is runtime-checked
//! (sqlx::query, not sqlx::query!) to avoid a compile-time DB requirement.

pub mod answers;
pub mod directory;
pub mod images;
pub mod inspections;
pub mod rows;

pub use answers::PgAnswerStore;
pub use directory::PgDirectoryStore;
pub use images::PgImageIndex;
pub use inspections::PgInspectionStore;

use sqlx::PgPool;

/// Convenience struct that constructs all Postgres adapters from a single pool.
pub struct PgStores {
    pub inspections: PgInspectionStore,
    pub answers: PgAnswerStore,
    pub images: PgImageIndex,
    pub directory: PgDirectoryStore,
}

impl PgStores {
    pub fn new(pool: PgPool) -> Self {
        Self {
            inspections: PgInspectionStore::new(pool.clone()),
            answers: PgAnswerStore::new(pool.clone()),
            images: PgImageIndex::new(pool.clone()),
            directory: PgDirectoryStore::new(pool),
        }
    }
}
