pub mod auth;
pub mod aws_clients;
pub mod cleanup;
pub mod config;
pub mod domain;
pub mod errors;
pub mod handlers;
pub mod memory;
pub mod models;
pub mod repositories;
pub mod routes;
pub mod services;
pub mod startup;
pub mod storage;

use crate::{
    cleanup::CleanupQueue,
    domain::{FileStorage, MemeRepository},
};
use std::sync::Arc;

/// AppState holds shared resources for the web server.
pub struct AppState {
    pub meme_repo: Arc<dyn MemeRepository>,
    pub file_storage: Arc<dyn FileStorage>,
    pub cleanup: CleanupQueue,
    /// Bearer token that authorizes deletes. `None` turns deleting off.
    pub admin_token: Option<String>,
}
