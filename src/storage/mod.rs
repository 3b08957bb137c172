//! Object storage operations for request images

mod types;

use log::debug;
use reqwest::{multipart, Client};
use std::path::Path;

use crate::error::{Error, Result};
use crate::fetch::{ensure_success, Fetch, CLIENT_INFO};

pub use types::*;

/// Client for object storage
#[derive(Debug, Clone)]
pub struct StorageClient {
    /// The base URL for the project
    url: String,

    /// The anonymous API key
    key: String,

    /// Bearer token, the user's access token when signed in
    token: Option<String>,

    /// HTTP client used for requests
    client: Client,
}

/// Client for a specific storage bucket
pub struct BucketClient<'a> {
    storage: &'a StorageClient,
    bucket_id: String,
}

impl StorageClient {
    /// Create a new StorageClient
    pub fn new(url: &str, key: &str, client: Client) -> Self {
        Self {
            url: url.trim_end_matches('/').to_string(),
            key: key.to_string(),
            token: None,
            client,
        }
    }

    /// Authenticate requests with the user's access token
    pub fn with_auth(mut self, token: &str) -> Self {
        self.token = Some(token.to_string());
        self
    }

    fn get_url(&self, path: &str) -> String {
        format!("{}/storage/v1{}", self.url, path)
    }

    fn bearer(&self) -> &str {
        self.token.as_deref().unwrap_or(&self.key)
    }

    /// Get a client for a specific bucket
    pub fn from(&self, bucket_id: &str) -> BucketClient<'_> {
        BucketClient {
            storage: self,
            bucket_id: bucket_id.to_string(),
        }
    }
}

impl<'a> BucketClient<'a> {
    /// Upload a file to the bucket, returning the stored object's key
    pub async fn upload(
        &self,
        path: &str,
        file_data: Vec<u8>,
        options: FileOptions,
    ) -> Result<UploadResponse> {
        let url = self
            .storage
            .get_url(&format!("/object/{}/{}", self.bucket_id, path));

        let file_name = Path::new(path)
            .file_name()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "file".to_string());
        let mut part = multipart::Part::bytes(file_data).file_name(file_name);
        if let Some(content_type) = &options.content_type {
            part = part
                .mime_str(content_type)
                .map_err(|e| Error::storage(format!("invalid content type: {}", e)))?;
        }
        let form = multipart::Form::new().part("file", part);

        debug!("uploading {}/{}", self.bucket_id, path);

        let response = self
            .storage
            .client
            .post(&url)
            .header("apikey", &self.storage.key)
            .header("Authorization", format!("Bearer {}", self.storage.bearer()))
            .header("X-Client-Info", CLIENT_INFO)
            .header(
                "Cache-Control",
                options.cache_control.unwrap_or_else(|| "3600".to_string()),
            )
            .header("x-upsert", options.upsert.to_string())
            .multipart(form)
            .send()
            .await?;

        let response = ensure_success(response)
            .await
            .map_err(|e| Error::storage(format!("upload failed: {}", e.user_message())))?;

        let uploaded = serde_json::from_str::<UploadResponse>(&response.text().await?)?;
        Ok(uploaded)
    }

    /// Remove objects from the bucket
    pub async fn remove(&self, paths: &[&str]) -> Result<Vec<FileObject>> {
        let url = self.storage.get_url(&format!("/object/{}", self.bucket_id));

        let body = serde_json::json!({
            "prefixes": paths
        });

        Fetch::delete(&self.storage.client, &url)
            .header("apikey", &self.storage.key)
            .bearer_auth(self.storage.bearer())
            .json(&body)?
            .execute::<Vec<FileObject>>()
            .await
    }

    /// Get the public URL for a file
    pub fn get_public_url(&self, path: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.storage.url, self.bucket_id, path
        )
    }
}
