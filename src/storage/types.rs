//! Types for storage operations

use serde::{Deserialize, Serialize};

/// Options for uploading a file
#[derive(Debug, Clone, Default)]
pub struct FileOptions {
    /// The cache control header value, in seconds
    pub cache_control: Option<String>,

    /// The content type of the file
    pub content_type: Option<String>,

    /// Whether to overwrite an existing object at the same path
    pub upsert: bool,
}

impl FileOptions {
    /// Create new file options
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the content type
    pub fn with_content_type(mut self, content_type: &str) -> Self {
        self.content_type = Some(content_type.to_string());
        self
    }

    /// Set the cache control value
    pub fn with_cache_control(mut self, cache_control: &str) -> Self {
        self.cache_control = Some(cache_control.to_string());
        self
    }

    /// Set whether to overwrite an existing object
    pub fn with_upsert(mut self, upsert: bool) -> Self {
        self.upsert = upsert;
        self
    }
}

/// Response of a successful upload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    /// `{bucket}/{path}` of the stored object
    #[serde(rename = "Key")]
    pub key: String,

    /// Object identifier, returned by newer storage API versions
    #[serde(rename = "Id", default)]
    pub id: Option<String>,
}

/// An object removed from a bucket
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileObject {
    /// The object name (path inside the bucket)
    pub name: String,

    /// The bucket ID
    pub bucket_id: Option<String>,

    /// The object ID
    pub id: Option<String>,
}
