use crate::{
    auth::AdminAuth,
    errors::AppError,
    models::RenameRequest,
    services::{self, NewUpload},
    AppState,
};
use axum::{
    body::Body,
    extract::{Multipart, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Redirect, Response},
    Json,
};
use std::sync::Arc;
use tracing;
use uuid::Uuid;

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Handler for POST /memes. Expects an `image` file field and an optional `title`.
pub async fn upload_meme(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let mut upload = NewUpload::default();
    let mut saw_file = false;

    while let Some(field) = multipart.next_field().await? {
        let field_name = match field.name() {
            Some(name) => name.to_string(),
            None => continue,
        };
        match field_name.as_str() {
            "title" => upload.title = Some(field.text().await.map_err(|e| AppError::InvalidInput(format!("Failed to read title: {}", e)))?),
            "image" | "file" => {
                saw_file = true;
                upload.original_name = field.file_name().map(|s| s.to_string());
                upload.content_type = field.content_type().map(|m| m.to_string());
                upload.data = field.bytes().await?.to_vec();
            }
            _ => tracing::debug!("Ignoring unknown multipart field: {}", field_name),
        }
    }

    if !saw_file {
        return Err(AppError::MissingFormField("image".to_string()));
    }

    let meme = services::upload_meme(&state, upload).await?;
    Ok((StatusCode::CREATED, Json(meme)))
}

pub async fn get_meme(
    State(state): State<Arc<AppState>>,
    Path(id_str): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let meme_id = Uuid::parse_str(&id_str)?;
    tracing::debug!(%meme_id, "Fetching meme details via handler");
    Ok(Json(services::get_meme(&state, meme_id).await?))
}

pub async fn list_memes(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, AppError> {
    let memes = services::list_memes(&state).await?;
    Ok(Json(memes))
}

/// Handler for PATCH /memes/{id}. A null or absent title is a cancelled rename.
pub async fn rename_meme(
    State(state): State<Arc<AppState>>,
    Path(id_str): Path<String>,
    Json(request): Json<RenameRequest>,
) -> Result<impl IntoResponse, AppError> {
    let meme_id = Uuid::parse_str(&id_str)?;
    let meme = services::rename_meme(&state, meme_id, request.title).await?;
    Ok(Json(meme))
}

/// Deletes the meme metadata and its corresponding image file. Requires the admin token.
pub async fn delete_meme(
    State(state): State<Arc<AppState>>,
    _admin: AdminAuth,
    Path(id_str): Path<String>,
) -> Result<StatusCode, AppError> { // Return only status code on success
    let meme_id = Uuid::parse_str(&id_str)?;
    services::delete_meme(&state, meme_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Handler for GET /memes/{id}/link, what the client copies to the clipboard.
pub async fn meme_link(
    State(state): State<Arc<AppState>>,
    Path(id_str): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let meme_id = Uuid::parse_str(&id_str)?;
    Ok(Json(services::meme_link(&state, meme_id).await?))
}

/// Handler for GET /memes/{id}/image, the raw bytes for copying the picture itself.
pub async fn meme_image(
    State(state): State<Arc<AppState>>,
    Path(id_str): Path<String>,
) -> Result<Response, AppError> {
    let meme_id = Uuid::parse_str(&id_str)?;
    let meme = services::get_meme(&state, meme_id).await?;

    match meme.file_name {
        Some(key) => serve_object(&state, &key).await,
        // Without a key the only way to the bytes is the public URL
        None => Ok(Redirect::temporary(&meme.image_url).into_response()),
    }
}

/// Handler for GET /images/{key}
pub async fn get_image(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
) -> Result<Response, AppError> {
    tracing::debug!(image_key = %key, "Fetching image file via handler");
    serve_object(&state, &key).await
}

async fn serve_object(state: &AppState, key: &str) -> Result<Response, AppError> {
    let (data, content_type) = state.file_storage.download(key).await?;

    let content_type_header = content_type
        .as_deref()
        .unwrap_or("application/octet-stream");

    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type_header)
        .body(Body::from(data))
        .map_err(|e| AppError::InternalServerError(format!("Failed to build image response: {}", e)))?;

    Ok(response)
}
