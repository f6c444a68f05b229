//! Process-local backends. Used with `STORAGE_BACKEND=memory` for local
//! development and by the test suite.

use crate::{
    domain::{FileStorage, MemeRepository},
    errors::{RepoError, StorageError},
    models::{sort_newest_first, Meme},
};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Default)]
pub struct InMemoryMemeRepository {
    memes: RwLock<HashMap<Uuid, Meme>>,
}

impl InMemoryMemeRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MemeRepository for InMemoryMemeRepository {
    async fn create(&self, meme: &Meme) -> Result<(), RepoError> {
        let mut memes = self.memes.write().await;
        if memes.contains_key(&meme.id) {
            return Err(RepoError::Duplicate(meme.id));
        }
        memes.insert(meme.id, meme.clone());
        Ok(())
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<Meme>, RepoError> {
        Ok(self.memes.read().await.get(&id).cloned())
    }

    async fn list_all(&self) -> Result<Vec<Meme>, RepoError> {
        let mut memes: Vec<Meme> = self.memes.read().await.values().cloned().collect();
        sort_newest_first(&mut memes);
        Ok(memes)
    }

    async fn update_title(&self, id: Uuid, title: &str) -> Result<Meme, RepoError> {
        let mut memes = self.memes.write().await;
        let meme = memes.get_mut(&id).ok_or(RepoError::NotFound(id))?;
        meme.title = title.to_string();
        Ok(meme.clone())
    }

    async fn delete(&self, id: Uuid) -> Result<Meme, RepoError> {
        self.memes.write().await.remove(&id).ok_or(RepoError::NotFound(id))
    }
}

#[derive(Debug)]
pub struct InMemoryFileStorage {
    objects: RwLock<HashMap<String, (Vec<u8>, Option<String>)>>,
    base_url: String,
}

impl InMemoryFileStorage {
    /// `base_url` is the address of this server; objects are served from `{base_url}/images/{key}`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            objects: RwLock::new(HashMap::new()),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub async fn contains(&self, key: &str) -> bool {
        self.objects.read().await.contains_key(key)
    }

    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }
}

#[async_trait]
impl FileStorage for InMemoryFileStorage {
    async fn upload(&self, key: &str, data: Vec<u8>, content_type: Option<String>) -> Result<(), StorageError> {
        tracing::debug!(key = %key, size = data.len(), "Memory: Storing object");
        self.objects.write().await.insert(key.to_string(), (data, content_type));
        Ok(())
    }

    async fn download(&self, key: &str) -> Result<(Vec<u8>, Option<String>), StorageError> {
        self.objects
            .read()
            .await
            .get(key)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        // Same contract as S3: a missing key is fine
        self.objects.write().await.remove(key);
        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/images/{}", self.base_url, key)
    }
}
