//! The locker's operations: upload, list, rename, delete and link lookup.
//! Handlers parse HTTP and call into here.

use crate::{
    errors::{AppError, StorageError},
    models::{Meme, MemeLink, MAX_TITLE_CHARS, PLACEHOLDER_TITLE},
    AppState,
};
use chrono::Utc;
use uuid::Uuid;

/// A file received from a client, before anything is stored.
#[derive(Debug, Default)]
pub struct NewUpload {
    pub original_name: Option<String>,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
    pub title: Option<String>,
}

pub async fn list_memes(state: &AppState) -> Result<Vec<Meme>, AppError> {
    let memes = state.meme_repo.list_all().await?;
    tracing::debug!(count = memes.len(), "Listed memes");
    Ok(memes)
}

pub async fn get_meme(state: &AppState, id: Uuid) -> Result<Meme, AppError> {
    state
        .meme_repo
        .get_by_id(id)
        .await?
        .ok_or(AppError::MemeNotFound(id))
}

/// Stores the bytes, then the record. If the record can't be written the
/// object is removed again so no orphan is left behind.
pub async fn upload_meme(state: &AppState, upload: NewUpload) -> Result<Meme, AppError> {
    if upload.data.is_empty() {
        return Err(AppError::InvalidInput("image data cannot be empty".to_string()));
    }

    let content_type = upload
        .content_type
        .clone()
        .filter(|ct| ct != "application/octet-stream")
        .or_else(|| {
            upload
                .original_name
                .as_deref()
                .and_then(|name| mime_guess::from_path(name).first_raw())
                .map(str::to_string)
        })
        .ok_or_else(|| AppError::InvalidInput("could not determine the file type".to_string()))?;
    if !content_type.starts_with("image/") {
        return Err(AppError::InvalidInput(format!("only images can be uploaded, got {}", content_type)));
    }

    // Only a title the user typed can be rejected; the file-name fallback is shortened instead
    if let Some(requested) = upload.title.as_deref() {
        check_title_length(requested.trim())?;
    }
    let title = resolve_title(upload.title.as_deref(), upload.original_name.as_deref());

    let key = storage_key(upload.original_name.as_deref(), &content_type);

    state
        .file_storage
        .upload(&key, upload.data, Some(content_type))
        .await?;
    let image_url = state.file_storage.public_url(&key);

    let meme = Meme {
        id: Uuid::new_v4(),
        title,
        image_url,
        file_name: Some(key.clone()),
        created_at: Utc::now(),
    };

    if let Err(e) = state.meme_repo.create(&meme).await {
        tracing::error!(meme_id = %meme.id, s3_key = %key, error = %e, "Failed to record meme, removing uploaded object");
        remove_object(state, &key).await;
        return Err(e.into());
    }

    tracing::info!(meme_id = %meme.id, s3_key = %key, title = %meme.title, "Meme uploaded");
    Ok(meme)
}

/// `None` means the user cancelled; nothing is written in that case,
/// nor when the title didn't change.
pub async fn rename_meme(state: &AppState, id: Uuid, new_title: Option<String>) -> Result<Meme, AppError> {
    let current = get_meme(state, id).await?;

    let Some(new_title) = new_title else {
        tracing::debug!(meme_id = %id, "Rename cancelled");
        return Ok(current);
    };

    let new_title = new_title.trim();
    if new_title.is_empty() {
        return Err(AppError::InvalidInput("title cannot be blank".to_string()));
    }
    check_title_length(new_title)?;

    if new_title == current.title {
        tracing::debug!(meme_id = %id, "Rename to same title, nothing to do");
        return Ok(current);
    }

    let updated = state.meme_repo.update_title(id, new_title).await?;
    tracing::info!(meme_id = %id, old_title = %current.title, new_title = %updated.title, "Meme renamed");
    Ok(updated)
}

/// Removes the record first, then its object. A failed object removal is
/// retried in the background rather than failing the request.
pub async fn delete_meme(state: &AppState, id: Uuid) -> Result<Meme, AppError> {
    let removed = state.meme_repo.delete(id).await?;

    match removed.file_name.as_deref() {
        Some(key) => remove_object(state, key).await,
        None => {
            tracing::warn!(meme_id = %id, image_url = %removed.image_url, "Deleted meme had no storage key, its object stays orphaned");
        }
    }

    tracing::info!(meme_id = %id, "Meme deleted");
    Ok(removed)
}

pub async fn meme_link(state: &AppState, id: Uuid) -> Result<MemeLink, AppError> {
    let meme = get_meme(state, id).await?;
    Ok(MemeLink { id: meme.id, url: meme.image_url })
}

async fn remove_object(state: &AppState, key: &str) {
    match state.file_storage.delete(key).await {
        Ok(()) | Err(StorageError::NotFound(_)) => {
            tracing::debug!(s3_key = %key, "Removed stored object");
        }
        Err(e) => {
            tracing::warn!(s3_key = %key, error = %e, "Could not remove stored object");
            state.cleanup.enqueue(key.to_string());
        }
    }
}

/// Trimmed user title, else the original file name cut to
/// `MAX_TITLE_CHARS`, else a placeholder.
pub fn resolve_title(requested: Option<&str>, original_name: Option<&str>) -> String {
    if let Some(title) = requested.map(str::trim).filter(|t| !t.is_empty()) {
        return title.to_string();
    }
    original_name
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(|name| name.chars().take(MAX_TITLE_CHARS).collect())
        .unwrap_or_else(|| PLACEHOLDER_TITLE.to_string())
}

fn check_title_length(title: &str) -> Result<(), AppError> {
    if title.chars().count() > MAX_TITLE_CHARS {
        return Err(AppError::InvalidInput(format!("title must be at most {} characters", MAX_TITLE_CHARS)));
    }
    Ok(())
}

/// `{unix_millis}-{8 hex}.{ext}`. The random suffix keeps two uploads in
/// the same millisecond apart.
pub fn storage_key(original_name: Option<&str>, content_type: &str) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!(
        "{}-{}.{}",
        Utc::now().timestamp_millis(),
        &suffix[..8],
        key_extension(original_name, content_type)
    )
}

fn key_extension(original_name: Option<&str>, content_type: &str) -> String {
    original_name
        .and_then(|name| name.rsplit_once('.'))
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| !ext.is_empty() && ext.len() <= 10 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .or_else(|| {
            mime_guess::get_mime_extensions_str(content_type)
                .and_then(|exts| exts.first())
                .map(|ext| ext.to_string())
        })
        .unwrap_or_else(|| "bin".to_string())
}
