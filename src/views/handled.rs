//! Calls the viewer took on, in progress or closed

use std::sync::Arc;
use std::time::Duration;

use crate::cache::QueryCache;
use crate::error::Result;
use crate::gateway::RequestQuery;
use crate::models::{Request, RequestId, UserId};
use crate::views::{visible, Flash, ListState, LoadTicket, ViewState};

pub struct HandledView {
    assignee: UserId,
    list: ListState,
    flash: Option<Flash>,
    flash_ttl: Duration,
}

impl HandledView {
    pub fn new(assignee: UserId, flash_ttl: Duration) -> Self {
        Self {
            assignee,
            list: ListState::default(),
            flash: None,
            flash_ttl,
        }
    }

    pub fn query(&self) -> RequestQuery {
        RequestQuery::Handled {
            assignee: self.assignee.clone(),
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
        let query = self.query();
        let result = result.map(|rows| {
            rows.iter()
                .filter(|r| query.includes(r))
                .cloned()
                .collect()
        });
        self.list.finish(ticket, result)
    }

    pub async fn load(&mut self, cache: &QueryCache) {
        let (ticket, query) = self.begin_load();
        let result = cache.fetch(&query).await;
        self.finish_load(ticket, result);
    }

    /// Report a task as done
    pub async fn close(&mut self, cache: &QueryCache, id: RequestId) -> Result<Request> {
        match cache.gateway().close_request(id, &self.assignee).await {
            Ok(closed) => {
                cache.invalidate_for(&closed);
                self.list.replace(closed.clone());
                self.flash = Some(Flash::success("Marked as done", self.flash_ttl));
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
