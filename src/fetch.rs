//! HTTP client abstraction for making requests to the backend services

use log::debug;
use reqwest::{
    header::{HeaderMap, HeaderName, HeaderValue},
    Client, Method, RequestBuilder, Response,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fmt;
use url::Url;

use crate::error::{Error, Result};

/// Value sent in the `X-Client-Info` header of every request
pub(crate) const CLIENT_INFO: &str = concat!("take-it/", env!("CARGO_PKG_VERSION"));

/// Helper for building and executing HTTP requests
pub struct FetchBuilder<'a> {
    client: &'a Client,
    url: String,
    method: Method,
    headers: HeaderMap,
    query_params: Vec<(String, String)>,
    body: Option<Vec<u8>>,
}

impl<'a> FetchBuilder<'a> {
    /// Create a new FetchBuilder
    pub fn new(client: &'a Client, url: &str, method: Method) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert("Content-Type", HeaderValue::from_static("application/json"));
        headers.insert("X-Client-Info", HeaderValue::from_static(CLIENT_INFO));

        Self {
            client,
            url: url.to_string(),
            method,
            headers,
            query_params: Vec::new(),
            body: None,
        }
    }

    /// Add a header to the request, invalid names or values are skipped
    pub fn header(mut self, name: &str, value: &str) -> Self {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                self.headers.insert(name, value);
            }
            _ => debug!("skipping invalid header {}", name),
        }
        self
    }

    /// Add bearer token authentication to the request
    pub fn bearer_auth(self, token: &str) -> Self {
        self.header("Authorization", &format!("Bearer {}", token))
    }

    /// Append query parameters, keeping their order
    pub fn query(mut self, params: &[(String, String)]) -> Self {
        self.query_params.extend(params.iter().cloned());
        self
    }

    /// Add a JSON body to the request
    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self> {
        let json = serde_json::to_vec(body)?;
        self.body = Some(json);
        Ok(self)
    }

    /// Build the request
    fn build(&self) -> Result<RequestBuilder> {
        let mut url = Url::parse(&self.url)?;

        if !self.query_params.is_empty() {
            let mut query_pairs = url.query_pairs_mut();
            for (key, value) in &self.query_params {
                query_pairs.append_pair(key, value);
            }
        }

        debug!("{} {}", self.method, url);

        let mut req = self.client.request(self.method.clone(), url.as_str());
        req = req.headers(self.headers.clone());

        if let Some(body) = &self.body {
            req = req.body(body.clone());
        }

        Ok(req)
    }

    /// Execute the request and parse the response as JSON
    pub async fn execute<T: DeserializeOwned>(&self) -> Result<T> {
        let response = self.send().await?;
        let body = response.text().await?;
        let result = serde_json::from_str::<T>(&body)?;
        Ok(result)
    }

    /// Execute the request, failing on any non-success status
    pub async fn send(&self) -> Result<Response> {
        let req = self.build()?;
        let response = req.send().await?;
        ensure_success(response).await
    }
}

/// Error body returned by PostgREST, GoTrue or the storage API
#[derive(Deserialize, Debug, Default)]
struct ApiErrorBody {
    code: Option<serde_json::Value>,
    message: Option<String>,
    msg: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
    details: Option<String>,
    hint: Option<String>,
}

impl fmt::Display for ApiErrorBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = self
            .message
            .as_ref()
            .or(self.msg.as_ref())
            .or(self.error_description.as_ref())
            .or(self.error.as_ref());

        let mut parts = Vec::new();
        if let Some(message) = message {
            parts.push(message.clone());
        }
        if let Some(details) = &self.details {
            parts.push(details.clone());
        }
        if let Some(hint) = &self.hint {
            parts.push(format!("hint: {}", hint));
        }
        if let Some(code) = &self.code {
            parts.push(format!("code: {}", code));
        }
        write!(f, "{}", parts.join(", "))
    }
}

/// Turn a non-success response into [`Error::Api`], passing successes through
pub(crate) async fn ensure_success(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await?;
    let message = match serde_json::from_str::<ApiErrorBody>(&text) {
        Ok(body) if !body.to_string().is_empty() => body.to_string(),
        _ if text.is_empty() => status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string(),
        _ => text,
    };

    Err(Error::Api { status, message })
}

/// Helper for creating HTTP requests
pub struct Fetch;

impl Fetch {
    /// Create a GET request
    pub fn get<'a>(client: &'a Client, url: &str) -> FetchBuilder<'a> {
        FetchBuilder::new(client, url, Method::GET)
    }

    /// Create a POST request
    pub fn post<'a>(client: &'a Client, url: &str) -> FetchBuilder<'a> {
        FetchBuilder::new(client, url, Method::POST)
    }

    /// Create a PATCH request
    pub fn patch<'a>(client: &'a Client, url: &str) -> FetchBuilder<'a> {
        FetchBuilder::new(client, url, Method::PATCH)
    }

    /// Create a DELETE request
    pub fn delete<'a>(client: &'a Client, url: &str) -> FetchBuilder<'a> {
        FetchBuilder::new(client, url, Method::DELETE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_body_prefers_message() {
        let body: ApiErrorBody = serde_json::from_str(
            r#"{"code":"23505","message":"duplicate key","details":"Key (id) exists","hint":null}"#,
        )
        .unwrap();
        assert_eq!(
            body.to_string(),
            "duplicate key, Key (id) exists, code: \"23505\""
        );

        let auth: ApiErrorBody =
            serde_json::from_str(r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#)
                .unwrap();
        assert_eq!(auth.to_string(), "Invalid login credentials");
    }
}
