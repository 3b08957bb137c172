//! The owner's own requests, with edit, delete and close actions

use log::info;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::QueryCache;
use crate::error::Result;
use crate::gateway::RequestQuery;
use crate::models::{Request, RequestId, UserId};
use crate::views::{owned_rows, visible, Flash, ListState, LoadTicket, ViewState};

pub struct MyRequestsView {
    owner: UserId,
    list: ListState,
    flash: Option<Flash>,
    flash_ttl: Duration,
}

impl MyRequestsView {
    pub fn new(owner: UserId, flash_ttl: Duration) -> Self {
        Self {
            owner,
            list: ListState::default(),
            flash: None,
            flash_ttl,
        }
    }

    pub fn query(&self) -> RequestQuery {
        RequestQuery::Mine {
            seeker: self.owner.clone(),
        }
    }

    pub fn state(&self) -> &ViewState {
        self.list.state()
    }

    pub fn requests(&self) -> &[Request] {
        self.list.requests()
    }

    pub fn flash(&self) -> Option<&Flash> {
        visible(&self.flash)
    }

    pub fn begin_load(&mut self) -> (LoadTicket, RequestQuery) {
        (self.list.begin(), self.query())
    }

    pub fn finish_load(
        &mut self,
        ticket: LoadTicket,
        result: Result<Arc<Vec<Request>>>,
    ) -> bool {
        self.list.finish(ticket, owned_rows(result))
    }

    /// Load through the cache
    pub async fn load(&mut self, cache: &QueryCache) {
        let (ticket, query) = self.begin_load();
        let result = cache.fetch(&query).await;
        self.finish_load(ticket, result);
    }

    /// The row to hand to the form for editing
    pub fn edit(&self, id: RequestId) -> Option<Request> {
        self.list.get(id).cloned()
    }

    /// Delete one of the owner's requests.
    ///
    /// On success the row leaves the list and a success message shows; on
    /// failure the list is untouched and the error shows instead.
    pub async fn delete(&mut self, cache: &QueryCache, id: RequestId) -> Result<()> {
        match cache.gateway().delete_request(id, &self.owner).await {
            Ok(()) => {
                info!("deleted request {}", id);
                if let Some(request) = self.list.get(id).cloned() {
                    cache.invalidate_for(&request);
                } else {
                    cache.invalidate(&self.query());
                }
                self.list.remove(id);
                self.flash = Some(Flash::success(
                    "Request deleted successfully!",
                    self.flash_ttl,
                ));
                Ok(())
            }
            Err(e) => {
                self.flash = Some(Flash::error(
                    format!("Failed to delete request: {}", e.user_message()),
                    self.flash_ttl,
                ));
                Err(e)
            }
        }
    }

    /// Mark an in-progress request as done
    pub async fn close(&mut self, cache: &QueryCache, id: RequestId) -> Result<Request> {
        match cache.gateway().close_request(id, &self.owner).await {
            Ok(closed) => {
                cache.invalidate_for(&closed);
                self.list.replace(closed.clone());
                self.flash = Some(Flash::success("Request closed", self.flash_ttl));
                Ok(closed)
            }
            Err(e) => {
                self.flash = Some(Flash::error(
                    format!("Failed to close request: {}", e.user_message()),
                    self.flash_ttl,
                ));
                Err(e)
            }
        }
    }
}
