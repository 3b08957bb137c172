//! Take It client core
//!
//! A service marketplace: signed-in users post service calls with a title,
//! category, price and location; other users browse open calls near them and
//! claim them; the poster follows each call from `open` to `closed`.
//!
//! Persistence, authentication and file storage live in a managed backend
//! (PostgREST rows, GoTrue auth, object storage). This crate provides the
//! typed client for that backend and the headless dashboard the UI renders.

pub mod auth;
pub mod cache;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod fetch;
pub mod form;
pub mod gateway;
pub mod models;
pub mod postgrest;
pub mod storage;
pub mod views;

use reqwest::Client;

use crate::auth::Auth;
use crate::config::{ClientConfig, ClientOptions};
use crate::postgrest::PostgrestClient;
use crate::storage::StorageClient;

/// The main entry point, one per application root
pub struct TakeIt {
    /// The base URL for the backend project
    url: String,
    /// The anonymous API key for the backend project
    key: String,
    /// HTTP client used for requests
    http_client: Client,
    /// Auth client for sign-in and session state
    auth: Auth,
    /// Client options
    options: ClientOptions,
}

impl TakeIt {
    /// Create a new client
    ///
    /// # Example
    ///
    /// ```
    /// use take_it::TakeIt;
    ///
    /// let client = TakeIt::new("https://your-project-url.supabase.co", "your-anon-key");
    /// ```
    pub fn new(url: &str, key: &str) -> Self {
        Self::new_with_options(url, key, ClientOptions::default())
    }

    /// Create a new client with custom options
    ///
    /// # Example
    ///
    /// ```
    /// use std::time::Duration;
    /// use take_it::{TakeIt, config::ClientOptions};
    ///
    /// let options = ClientOptions::default().with_flash_ttl(Duration::from_secs(5));
    /// let client = TakeIt::new_with_options(
    ///     "https://your-project-url.supabase.co",
    ///     "your-anon-key",
    ///     options,
    /// );
    /// ```
    pub fn new_with_options(url: &str, key: &str, options: ClientOptions) -> Self {
        let mut builder = Client::builder();
        if let Some(timeout) = options.request_timeout {
            builder = builder.timeout(timeout);
        }
        let http_client = builder.build().unwrap_or_else(|e| {
            log::warn!("falling back to default HTTP client: {}", e);
            Client::new()
        });

        let url = url.trim_end_matches('/');
        let auth = Auth::new(url, key, http_client.clone(), options.clone());

        Self {
            url: url.to_string(),
            key: key.to_string(),
            http_client,
            auth,
            options,
        }
    }

    /// Create a client from loaded configuration
    pub fn from_config(config: ClientConfig) -> Self {
        Self::new_with_options(&config.url, &config.anon_key, config.options)
    }

    /// Get a reference to the auth client
    pub fn auth(&self) -> &Auth {
        &self.auth
    }

    /// Client options
    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// Operate on a table, as the signed-in user when there is a session
    pub fn from(&self, table: &str) -> PostgrestClient {
        let client = PostgrestClient::new(&self.url, &self.key, table, self.http_client.clone())
            .with_schema(&self.options.db_schema);
        match self.auth.session() {
            Some(session) => client.with_auth(&session.access_token),
            None => client,
        }
    }

    /// Object storage, as the signed-in user when there is a session
    pub fn storage(&self) -> StorageClient {
        let storage = StorageClient::new(&self.url, &self.key, self.http_client.clone());
        match self.auth.session() {
            Some(session) => storage.with_auth(&session.access_token),
            None => storage,
        }
    }
}

/// A convenience module for common imports
pub mod prelude {
    pub use crate::auth::{Identity, SessionContext};
    pub use crate::cache::QueryCache;
    pub use crate::config::ClientOptions;
    pub use crate::dashboard::{ActivePanel, Dashboard};
    pub use crate::error::{Error, Result};
    pub use crate::form::{FormMode, RequestForm};
    pub use crate::gateway::{Gateway, RequestQuery};
    pub use crate::models::*;
    pub use crate::views::{Flash, FlashKind, ViewState};
    pub use crate::TakeIt;
}
