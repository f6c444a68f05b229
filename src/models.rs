use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Title used when neither the user nor the file name supplies one.
pub const PLACEHOLDER_TITLE: &str = "untitled";

/// Longest title accepted on upload or rename, in characters.
pub const MAX_TITLE_CHARS: usize = 200;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Meme {
    pub id: Uuid,
    pub title: String,
    pub image_url: String,
    /// Object-store key written at upload time. Older records may not have one.
    pub file_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Body of `PATCH /memes/{id}`. A missing or null title means the rename was cancelled.
#[derive(Deserialize, Debug, Default)]
pub struct RenameRequest {
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct MemeLink {
    pub id: Uuid,
    pub url: String,
}

/// Newest first; ids break ties so the order is stable.
pub fn sort_newest_first(memes: &mut [Meme]) {
    memes.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
}
