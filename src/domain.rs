use crate::errors::{RepoError, StorageError};
use crate::models::Meme;
use async_trait::async_trait;
use uuid::Uuid;

/// Trait defining operations for storing and retrieving Meme metadata.
#[async_trait]
pub trait MemeRepository: Send + Sync + 'static { // Send+Sync+'static required for Arc<dyn>
    /// Inserts a new meme. Fails with `RepoError::Duplicate` if the id is taken.
    async fn create(&self, meme: &Meme) -> Result<(), RepoError>;

    /// Retrieves a meme's metadata by its unique ID.
    /// Returns Ok(None) if the meme is not found.
    async fn get_by_id(&self, id: Uuid) -> Result<Option<Meme>, RepoError>;

    /// Lists all memes, newest first.
    /// WARNING: This can be inefficient on large datasets. Consider pagination.
    async fn list_all(&self) -> Result<Vec<Meme>, RepoError>;

    /// Replaces the title of an existing meme and returns the updated record.
    /// Nothing else about the record changes.
    async fn update_title(&self, id: Uuid, title: &str) -> Result<Meme, RepoError>;

    /// Removes a meme and returns what was stored.
    /// A missing id is `RepoError::NotFound`, so deleting twice is detectable.
    async fn delete(&self, id: Uuid) -> Result<Meme, RepoError>;
}

/// Trait defining operations for storing and retrieving file data (meme images).
#[async_trait]
pub trait FileStorage: Send + Sync + 'static {
    /// Uploads file data to the storage backend.
    async fn upload(&self, key: &str, data: Vec<u8>, content_type: Option<String>) -> Result<(), StorageError>;

    /// Downloads file data and its content type.
    async fn download(&self, key: &str) -> Result<(Vec<u8>, Option<String>), StorageError>;

    /// Removes an object. Removing a key that does not exist is not an error.
    async fn delete(&self, key: &str) -> Result<(), StorageError>;

    /// Public URL under which `key` can be fetched.
    fn public_url(&self, key: &str) -> String;
}
