use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Chunk size used when splitting an upload, matching the usual GridFS default.
pub const DEFAULT_CHUNK_SIZE: usize = 255 * 1024;

/// Metadata of a stored profile image. The payload lives in fixed-size chunks.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ImageMeta {
    pub id: String,
    pub filename: String,
    pub content_type: String,
    pub length: i64,
    pub chunk_size: i32,
    pub upload_date: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub message: String,
    pub image_id: String,
}
