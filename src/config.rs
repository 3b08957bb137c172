//! Configuration options for the Take It client

use std::env;
use std::time::Duration;

use crate::error::{Error, Result};

/// Origin used for OAuth redirects when `SITE_URL` is not configured
pub const DEFAULT_SITE_URL: &str = "https://take-it-web.netlify.app";

/// Configuration options for the Take It client
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// The request timeout
    pub request_timeout: Option<Duration>,

    /// The database schema
    pub db_schema: String,

    /// Storage bucket holding request images
    pub image_bucket: String,

    /// Public origin of the web front end, base of the OAuth redirect target
    pub site_url: String,

    /// How long success and write-error messages stay visible
    pub flash_ttl: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            request_timeout: Some(Duration::from_secs(30)),
            db_schema: "public".to_string(),
            image_bucket: "request-images".to_string(),
            site_url: DEFAULT_SITE_URL.to_string(),
            flash_ttl: Duration::from_secs(3),
        }
    }
}

impl ClientOptions {
    /// Set the request timeout
    pub fn with_request_timeout(mut self, value: Option<Duration>) -> Self {
        self.request_timeout = value;
        self
    }

    /// Set the database schema
    pub fn with_db_schema(mut self, value: &str) -> Self {
        self.db_schema = value.to_string();
        self
    }

    /// Set the bucket request images are uploaded to
    pub fn with_image_bucket(mut self, value: &str) -> Self {
        self.image_bucket = value.to_string();
        self
    }

    /// Set the site origin, trailing slashes are dropped
    pub fn with_site_url(mut self, value: &str) -> Self {
        self.site_url = value.trim_end_matches('/').to_string();
        self
    }

    /// Set the lifetime of transient messages
    pub fn with_flash_ttl(mut self, value: Duration) -> Self {
        self.flash_ttl = value;
        self
    }

    /// Where the identity provider sends the browser after an OAuth sign-in
    pub fn oauth_redirect(&self) -> String {
        format!("{}/dashboard", self.site_url)
    }
}

/// Connection settings for the managed backend
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub url: String,
    pub anon_key: String,
    pub options: ClientOptions,
}

impl ClientConfig {
    /// Creates a new configuration, validating the URL.
    pub fn new(url: &str, anon_key: &str) -> Result<Self> {
        url::Url::parse(url)?;
        if anon_key.is_empty() {
            return Err(Error::config("anon_key cannot be empty"));
        }
        Ok(Self {
            url: url.trim_end_matches('/').to_string(),
            anon_key: anon_key.to_string(),
            options: ClientOptions::default(),
        })
    }

    /// Reads `SUPABASE_URL`, `SUPABASE_ANON_KEY` and optionally `SITE_URL`,
    /// after loading a `.env` file if one is present.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();

        let url = env::var("SUPABASE_URL")
            .map_err(|_| Error::config("SUPABASE_URL environment variable not found"))?;
        let anon_key = env::var("SUPABASE_ANON_KEY")
            .map_err(|_| Error::config("SUPABASE_ANON_KEY environment variable not found"))?;

        let mut config = Self::new(&url, &anon_key)?;
        if let Ok(site_url) = env::var("SITE_URL") {
            url::Url::parse(&site_url)?;
            config.options = config.options.with_site_url(&site_url);
        }
        Ok(config)
    }

    /// Replace the client options
    pub fn with_options(mut self, options: ClientOptions) -> Self {
        self.options = options;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_oauth_redirect_targets_dashboard() {
        let options = ClientOptions::default().with_site_url("http://localhost:3000/");
        assert_eq!(options.oauth_redirect(), "http://localhost:3000/dashboard");

        let defaults = ClientOptions::default();
        assert_eq!(
            defaults.oauth_redirect(),
            "https://take-it-web.netlify.app/dashboard"
        );
        assert_eq!(defaults.flash_ttl, Duration::from_secs(3));
    }

    #[test]
    fn test_config_rejects_bad_input() {
        assert!(matches!(
            ClientConfig::new("not a url", "key"),
            Err(Error::Url(_))
        ));
        assert!(matches!(
            ClientConfig::new("https://project.supabase.co", ""),
            Err(Error::Config(_))
        ));

        let config = ClientConfig::new("https://project.supabase.co/", "key").unwrap();
        assert_eq!(config.url, "https://project.supabase.co");
    }
}
