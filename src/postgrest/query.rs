//! Query builders for PostgrestClient

use serde::{de::DeserializeOwned, Serialize};

use crate::error::Result;
use crate::postgrest::filter::*;
use crate::postgrest::Target;

/// Ordered query parameters
#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    params: Vec<(String, String)>,
}

impl QueryBuilder {
    /// Create a new QueryBuilder
    pub fn new() -> Self {
        Self { params: Vec::new() }
    }

    /// Append a parameter, an earlier value for `key` is kept as well
    pub fn add_param(&mut self, key: &str, value: &str) {
        self.params.push((key.to_string(), value.to_string()));
    }

    /// Replace every value for `key`
    pub fn set_param(&mut self, key: &str, value: &str) {
        self.params.retain(|(k, _)| k != key);
        self.add_param(key, value);
    }

    /// Get the query parameters
    pub fn get_params(&self) -> &[(String, String)] {
        &self.params
    }
}

/// Row filters shared by every builder that addresses existing rows
pub trait Filterable: Sized {
    #[doc(hidden)]
    fn query_mut(&mut self) -> &mut QueryBuilder;

    /// Add an arbitrary filter
    fn filter(mut self, filter: Filter) -> Self {
        let (key, value) = filter.to_param();
        self.query_mut().add_param(&key, &value);
        self
    }

    /// Filter rows where column equals a value
    fn eq(self, column: &str, value: &str) -> Self {
        self.filter(Filter::new(column, FilterOperator::Eq, value))
    }

    /// Filter rows where column does not equal a value
    fn neq(self, column: &str, value: &str) -> Self {
        self.filter(Filter::new(column, FilterOperator::Neq, value))
    }

    /// Filter rows where column matches a pattern (case insensitive)
    fn ilike(self, column: &str, pattern: &str) -> Self {
        self.filter(Filter::new(column, FilterOperator::ILike, pattern))
    }

    /// Filter rows where column is in a list of values
    fn in_list<T: AsRef<str>>(self, column: &str, values: &[T]) -> Self {
        self.filter(Filter::new(column, FilterOperator::In, &in_list_value(values)))
    }

    /// Filter rows matching any of `filters`
    fn or(mut self, filters: &[Filter]) -> Self {
        let value = group_value(filters);
        self.query_mut().add_param("or", &value);
        self
    }
}

/// Builder for SELECT queries
#[derive(Debug, Clone)]
pub struct SelectBuilder {
    target: Target,
    query: QueryBuilder,
}

impl Filterable for SelectBuilder {
    fn query_mut(&mut self) -> &mut QueryBuilder {
        &mut self.query
    }
}

impl SelectBuilder {
    pub(crate) fn new(target: Target, columns: &str) -> Self {
        let mut query = QueryBuilder::new();
        query.add_param("select", columns);
        Self { target, query }
    }

    /// Order the results by a column
    pub fn order(mut self, column: &str, ascending: bool) -> Self {
        let direction = if ascending { "asc" } else { "desc" };
        self.query
            .set_param("order", &format!("{}.{}", column, direction));
        self
    }

    /// Limit the number of rows returned
    pub fn limit(mut self, count: usize) -> Self {
        self.query.set_param("limit", &count.to_string());
        self
    }

    /// The parameters this query will send
    pub fn params(&self) -> &[(String, String)] {
        self.query.get_params()
    }

    /// Execute the query and return the results
    pub async fn execute<T: DeserializeOwned>(&self) -> Result<Vec<T>> {
        self.target
            .get()
            .query(self.query.get_params())
            .execute::<Vec<T>>()
            .await
    }

    /// Execute the query and return the first row
    pub async fn execute_one<T: DeserializeOwned>(self) -> Result<Option<T>> {
        let results = self.limit(1).execute::<T>().await?;
        Ok(results.into_iter().next())
    }
}

/// Builder for INSERT queries
pub struct InsertBuilder<T: Serialize> {
    target: Target,
    values: T,
}

impl<T: Serialize> InsertBuilder<T> {
    pub(crate) fn new(target: Target, values: T) -> Self {
        Self { target, values }
    }

    /// Execute the query and return the inserted rows
    pub async fn execute<R: DeserializeOwned>(&self) -> Result<Vec<R>> {
        self.target
            .post()
            .header("Prefer", "return=representation")
            .json(&self.values)?
            .execute::<Vec<R>>()
            .await
    }
}

/// Builder for UPDATE queries
pub struct UpdateBuilder<T: Serialize> {
    target: Target,
    values: T,
    query: QueryBuilder,
}

impl<T: Serialize> Filterable for UpdateBuilder<T> {
    fn query_mut(&mut self) -> &mut QueryBuilder {
        &mut self.query
    }
}

impl<T: Serialize> UpdateBuilder<T> {
    pub(crate) fn new(target: Target, values: T) -> Self {
        Self {
            target,
            values,
            query: QueryBuilder::new(),
        }
    }

    /// Execute the query and return the rows it changed
    pub async fn execute<R: DeserializeOwned>(&self) -> Result<Vec<R>> {
        self.target
            .patch()
            .header("Prefer", "return=representation")
            .query(self.query.get_params())
            .json(&self.values)?
            .execute::<Vec<R>>()
            .await
    }
}

/// Builder for UPSERT queries
pub struct UpsertBuilder<T: Serialize> {
    target: Target,
    values: T,
    query: QueryBuilder,
}

impl<T: Serialize> UpsertBuilder<T> {
    pub(crate) fn new(target: Target, values: T) -> Self {
        Self {
            target,
            values,
            query: QueryBuilder::new(),
        }
    }

    /// Specify the column(s) to check for conflicts
    pub fn on_conflict(mut self, columns: &str) -> Self {
        self.query.set_param("on_conflict", columns);
        self
    }

    /// Execute the query and return the written rows
    pub async fn execute<R: DeserializeOwned>(&self) -> Result<Vec<R>> {
        self.target
            .post()
            .header("Prefer", "resolution=merge-duplicates,return=representation")
            .query(self.query.get_params())
            .json(&self.values)?
            .execute::<Vec<R>>()
            .await
    }
}

/// Builder for DELETE queries
pub struct DeleteBuilder {
    target: Target,
    query: QueryBuilder,
}

impl Filterable for DeleteBuilder {
    fn query_mut(&mut self) -> &mut QueryBuilder {
        &mut self.query
    }
}

impl DeleteBuilder {
    pub(crate) fn new(target: Target) -> Self {
        Self {
            target,
            query: QueryBuilder::new(),
        }
    }

    /// Execute the query and return the deleted rows
    pub async fn execute<R: DeserializeOwned>(&self) -> Result<Vec<R>> {
        self.target
            .delete()
            .header("Prefer", "return=representation")
            .query(self.query.get_params())
            .execute::<Vec<R>>()
            .await
    }
}
