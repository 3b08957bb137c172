//! Open calls for providers: other users' open requests near the provider

use log::info;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::QueryCache;
use crate::error::Result;
use crate::gateway::RequestQuery;
use crate::models::{LocationFilter, Request, RequestId, UserId};
use crate::views::{visible, Flash, ListState, LoadTicket, ViewState};

pub struct OpenCallsView {
    viewer: UserId,
    city: Option<LocationFilter>,
    list: ListState,
    flash: Option<Flash>,
    flash_ttl: Duration,
}

impl OpenCallsView {
    pub fn new(viewer: UserId, city: Option<&str>, flash_ttl: Duration) -> Self {
        Self {
            viewer,
            city: city.and_then(LocationFilter::new),
            list: ListState::default(),
            flash: None,
            flash_ttl,
        }
    }

    pub fn query(&self) -> RequestQuery {
        RequestQuery::OpenNearby {
            city: self.city.clone(),
        }
    }

    pub fn city(&self) -> Option<&LocationFilter> {
        self.city.as_ref()
    }

    /// Change the city filter; a load in flight for the old city becomes stale.
    ///
    /// Returns whether the filter changed, i.e. whether to load again.
    pub fn set_city(&mut self, city: Option<&str>) -> bool {
        let city = city.and_then(LocationFilter::new);
        if city == self.city {
            return false;
        }
        self.city = city;
        self.list.begin();
        true
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

    /// Apply a response, hiding the viewer's own posts, newest first
    pub fn finish_load(
        &mut self,
        ticket: LoadTicket,
        result: Result<Arc<Vec<Request>>>,
    ) -> bool {
        let query = self.query();
        let result = result.map(|rows| {
            let mut rows: Vec<Request> = rows
                .iter()
                .filter(|r| !r.is_owned_by(&self.viewer) && query.includes(r))
                .cloned()
                .collect();
            rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            rows
        });
        self.list.finish(ticket, result)
    }

    pub async fn load(&mut self, cache: &QueryCache) {
        let (ticket, query) = self.begin_load();
        let result = cache.fetch(&query).await;
        self.finish_load(ticket, result);
    }

    /// Take an open request.
    ///
    /// Loses cleanly with `Error::Conflict` when another provider got there
    /// first; the list then stays as it was until the next load.
    pub async fn claim(&mut self, cache: &QueryCache, id: RequestId) -> Result<Request> {
        match cache.gateway().claim_request(id, &self.viewer).await {
            Ok(claimed) => {
                info!("{} claimed request {}", self.viewer, id);
                cache.invalidate_for(&claimed);
                self.list.remove(id);
                self.flash = Some(Flash::success("The task is yours", self.flash_ttl));
                Ok(claimed)
            }
            Err(e) => {
                cache.invalidate(&self.query());
                self.flash = Some(Flash::error(
                    format!("Failed to take the task: {}", e.user_message()),
                    self.flash_ttl,
                ));
                Err(e)
            }
        }
    }
}
