//! Shared, invalidate-on-write cache of request queries
//!
//! Every list view reads through one [`QueryCache`]. Entries are keyed by the
//! [`RequestQuery`] itself, so two views asking the same question share one
//! answer. A write invalidates every query its row can appear in; a fetch that
//! was in flight while its entry was invalidated is returned to its caller but
//! never stored.

use log::debug;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::Result;
use crate::gateway::{Gateway, RequestQuery};
use crate::models::Request;

#[derive(Debug, Default)]
struct Entry {
    generation: u64,
    rows: Option<Arc<Vec<Request>>>,
}

/// Cache of `requests` reads in front of a [`Gateway`]
pub struct QueryCache {
    gateway: Arc<dyn Gateway>,
    entries: Mutex<HashMap<RequestQuery, Entry>>,
}

impl QueryCache {
    pub fn new(gateway: Arc<dyn Gateway>) -> Self {
        Self {
            gateway,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// The gateway, for writes
    pub fn gateway(&self) -> &Arc<dyn Gateway> {
        &self.gateway
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<RequestQuery, Entry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The cached answer, if any
    pub fn cached(&self, query: &RequestQuery) -> Option<Arc<Vec<Request>>> {
        self.entries().get(query).and_then(|e| e.rows.clone())
    }

    /// Answer from the cache, going to the gateway on a miss
    pub async fn fetch(&self, query: &RequestQuery) -> Result<Arc<Vec<Request>>> {
        if let Some(rows) = self.cached(query) {
            debug!("cache hit for {:?}", query);
            return Ok(rows);
        }
        self.refetch(query).await
    }

    /// Always go to the gateway and store the answer
    pub async fn refetch(&self, query: &RequestQuery) -> Result<Arc<Vec<Request>>> {
        let generation = self.entries().entry(query.clone()).or_default().generation;

        let rows = Arc::new(self.gateway.fetch_requests(query).await?);

        let mut entries = self.entries();
        let entry = entries.entry(query.clone()).or_default();
        if entry.generation == generation {
            entry.rows = Some(rows.clone());
        } else {
            debug!("{:?} was invalidated while in flight, not caching", query);
        }
        Ok(rows)
    }

    /// Drop the answer for one query
    pub fn invalidate(&self, query: &RequestQuery) {
        if let Some(entry) = self.entries().get_mut(query) {
            entry.generation += 1;
            entry.rows = None;
        }
    }

    /// Drop every answer `request` could appear in, before or after a write:
    /// its owner's list, its assignee's handled list and all open-call lists.
    pub fn invalidate_for(&self, request: &Request) {
        let mut entries = self.entries();
        for (query, entry) in entries.iter_mut() {
            let affected = match query {
                RequestQuery::Mine { seeker } => request.is_owned_by(seeker),
                RequestQuery::Handled { assignee } => {
                    request.assigned_to_user_id.as_ref() == Some(assignee)
                }
                RequestQuery::OpenNearby { .. } => true,
            };
            if affected {
                entry.generation += 1;
                entry.rows = None;
            }
        }
    }

    /// Drop everything, e.g. on sign-out
    pub fn clear(&self) {
        for entry in self.entries().values_mut() {
            entry.generation += 1;
            entry.rows = None;
        }
    }
}
