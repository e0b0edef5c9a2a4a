//! # kiez-db
//!
//! PostgreSQL record store and object storage for kiezmarkt.
//!
//! This crate provides:
//! - Connection pool management
//! - Repository implementations for items, images, owners, jobs,
//!   messages, and requests
//! - Object storage for uploads and thumbnails with signed URLs
//!
//! ## Example
//!
//! ```rust,ignore
//! use kiez_db::{Database, ItemRepository};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::connect("postgres://localhost/kiezmarkt").await?;
//!     let item = db.items.get(item_id).await?;
//!     println!("{}", item.title);
//!     Ok(())
//! }
//! ```

pub mod images;
pub mod items;
pub mod jobs;
pub mod messages;
pub mod object_storage;
pub mod owners;
pub mod pool;
pub mod requests;

#[cfg(test)]
mod tests;

// Test fixtures for integration tests
// Note: Always compiled so integration tests (in tests/) can use DEFAULT_TEST_DATABASE_URL
pub mod test_fixtures;

// Re-export core types
pub use kiez_core::*;

// Re-export repository implementations
pub use images::PgImageRepository;
pub use items::PgItemRepository;
pub use jobs::PgProcessingJobRepository;
pub use messages::PgMessageRepository;
pub use object_storage::{
    parse_storage_url, thumbnail_key, FilesystemBackend, ObjectStore, StorageBackend, Transform,
    IMAGES_BUCKET, THUMBNAILS_BUCKET,
};
pub use owners::PgOwnerRepository;
pub use pool::{create_pool, create_pool_with_config, PoolConfig};
pub use requests::PgRequestRepository;

/// Combined database context with all repositories.
pub struct Database {
    /// The underlying connection pool.
    pub pool: sqlx::Pool<sqlx::Postgres>,
    /// Item repository for CRUD operations.
    pub items: PgItemRepository,
    /// Image repository for gallery management.
    pub images: PgImageRepository,
    /// Ownership repository.
    pub owners: PgOwnerRepository,
    /// Processing job repository for the image/AI pipeline.
    pub jobs: PgProcessingJobRepository,
    /// Message repository for direct messages and conversations.
    pub messages: PgMessageRepository,
    /// Buy/rent request repository.
    pub requests: PgRequestRepository,
}

impl Database {
    /// Create a new Database instance from a connection pool.
    pub fn new(pool: sqlx::Pool<sqlx::Postgres>) -> Self {
        Self {
            items: PgItemRepository::new(pool.clone()),
            images: PgImageRepository::new(pool.clone()),
            owners: PgOwnerRepository::new(pool.clone()),
            jobs: PgProcessingJobRepository::new(pool.clone()),
            messages: PgMessageRepository::new(pool.clone()),
            requests: PgRequestRepository::new(pool.clone()),
            pool,
        }
    }

    /// Create a new Database instance by connecting to the given URL.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = create_pool(url).await?;
        Ok(Self::new(pool))
    }

    /// Create with custom pool configuration.
    pub async fn connect_with_config(url: &str, config: PoolConfig) -> Result<Self> {
        let pool = create_pool_with_config(url, config).await?;
        Ok(Self::new(pool))
    }

    /// Run pending migrations.
    #[cfg(feature = "migrations")]
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::Database(sqlx::Error::Migrate(Box::new(e))))?;
        Ok(())
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &sqlx::Pool<sqlx::Postgres> {
        &self.pool
    }
}
