//! Row operations through the PostgREST API

mod filter;
mod query;

use reqwest::{Client, Method};
use serde::Serialize;

use crate::fetch::FetchBuilder;

pub use filter::*;
pub use query::*;

/// Client for operations on one table or view
#[derive(Debug, Clone)]
pub struct PostgrestClient {
    target: Target,
}

/// Everything needed to address one table
#[derive(Debug, Clone)]
pub(crate) struct Target {
    url: String,
    key: String,
    token: Option<String>,
    schema: String,
    client: Client,
}

impl Target {
    fn request(&self, method: Method) -> FetchBuilder<'_> {
        let token = self.token.as_deref().unwrap_or(&self.key);
        let fetch = FetchBuilder::new(&self.client, &self.url, method)
            .header("apikey", &self.key)
            .bearer_auth(token);

        if self.schema == "public" {
            fetch
        } else {
            fetch
                .header("Accept-Profile", &self.schema)
                .header("Content-Profile", &self.schema)
        }
    }

    pub(crate) fn get(&self) -> FetchBuilder<'_> {
        self.request(Method::GET)
    }

    pub(crate) fn post(&self) -> FetchBuilder<'_> {
        self.request(Method::POST)
    }

    pub(crate) fn patch(&self) -> FetchBuilder<'_> {
        self.request(Method::PATCH)
    }

    pub(crate) fn delete(&self) -> FetchBuilder<'_> {
        self.request(Method::DELETE)
    }
}

impl PostgrestClient {
    /// Create a new PostgrestClient
    pub fn new(url: &str, key: &str, table: &str, client: Client) -> Self {
        Self {
            target: Target {
                url: format!("{}/rest/v1/{}", url.trim_end_matches('/'), table),
                key: key.to_string(),
                token: None,
                schema: "public".to_string(),
                client,
            },
        }
    }

    /// Send the user's access token instead of the anon key
    pub fn with_auth(mut self, token: &str) -> Self {
        self.target.token = Some(token.to_string());
        self
    }

    /// Address a schema other than `public`
    pub fn with_schema(mut self, schema: &str) -> Self {
        self.target.schema = schema.to_string();
        self
    }

    /// Select specific columns from the table
    pub fn select(&self, columns: &str) -> SelectBuilder {
        SelectBuilder::new(self.target.clone(), columns)
    }

    /// Insert rows into the table
    pub fn insert<T: Serialize>(&self, values: T) -> InsertBuilder<T> {
        InsertBuilder::new(self.target.clone(), values)
    }

    /// Update the rows matched by the builder's filters
    pub fn update<T: Serialize>(&self, values: T) -> UpdateBuilder<T> {
        UpdateBuilder::new(self.target.clone(), values)
    }

    /// Insert, or merge into the row that conflicts on `on_conflict`
    pub fn upsert<T: Serialize>(&self, values: T) -> UpsertBuilder<T> {
        UpsertBuilder::new(self.target.clone(), values)
    }

    /// Delete the rows matched by the builder's filters
    pub fn delete(&self) -> DeleteBuilder {
        DeleteBuilder::new(self.target.clone())
    }
}
