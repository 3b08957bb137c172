//! Headless list views over the `requests` collection
//!
//! Each view owns one [`ListState`] whose [`ViewState`] is exactly one of
//! loading, failed, empty or ready, plus an optional transient [`Flash`] for
//! write outcomes. Loads are split into `begin_load` / `finish_load` so a host
//! can run the fetch wherever it likes; a response whose [`LoadTicket`] is no
//! longer current is dropped.

mod handled;
mod my_requests;
mod open_calls;

use log::warn;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use crate::error::Result;
use crate::models::{Request, RequestId};

pub use handled::HandledView;
pub use my_requests::MyRequestsView;
pub use open_calls::OpenCallsView;

/// What a list view shows
#[derive(Debug, Clone, PartialEq)]
pub enum ViewState {
    Loading,
    Failed(String),
    Empty,
    Ready(Vec<Request>),
}

/// Identifies one load of a view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket {
    revision: u64,
}

/// Load bookkeeping shared by the list views
#[derive(Debug)]
pub struct ListState {
    state: ViewState,
    revision: u64,
}

impl Default for ListState {
    fn default() -> Self {
        Self {
            state: ViewState::Loading,
            revision: 0,
        }
    }
}

impl ListState {
    pub fn state(&self) -> &ViewState {
        &self.state
    }

    /// Rows on screen, empty unless ready
    pub fn requests(&self) -> &[Request] {
        match &self.state {
            ViewState::Ready(rows) => rows,
            _ => &[],
        }
    }

    pub fn get(&self, id: RequestId) -> Option<&Request> {
        self.requests().iter().find(|r| r.id == id)
    }

    /// Start a load, making every earlier ticket stale
    pub fn begin(&mut self) -> LoadTicket {
        self.revision += 1;
        self.state = ViewState::Loading;
        LoadTicket {
            revision: self.revision,
        }
    }

    /// Apply a response; returns `false` when the ticket is stale
    pub fn finish(
        &mut self,
        ticket: LoadTicket,
        result: Result<Vec<Request>>,
    ) -> bool {
        if ticket.revision != self.revision {
            warn!(
                "discarding stale response (ticket {}, current {})",
                ticket.revision, self.revision
            );
            return false;
        }
        self.state = match result {
            Ok(rows) if rows.is_empty() => ViewState::Empty,
            Ok(rows) => ViewState::Ready(rows),
            Err(e) => ViewState::Failed(e.user_message()),
        };
        true
    }

    /// Drop a row after a successful write removed it from this list
    pub fn remove(&mut self, id: RequestId) {
        if let ViewState::Ready(rows) = &mut self.state {
            rows.retain(|r| r.id != id);
            if rows.is_empty() {
                self.state = ViewState::Empty;
            }
        }
    }

    /// Swap in the stored version of a row after a successful write
    pub fn replace(&mut self, request: Request) {
        if let ViewState::Ready(rows) = &mut self.state {
            if let Some(row) = rows.iter_mut().find(|r| r.id == request.id) {
                *row = request;
            }
        }
    }
}

/// Copy rows out of a shared cache answer
pub(crate) fn owned_rows(result: Result<Arc<Vec<Request>>>) -> Result<Vec<Request>> {
    result.map(|rows| rows.as_ref().clone())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlashKind {
    Success,
    Error,
}

/// A message that disappears on its own after a while
#[derive(Debug, Clone, PartialEq)]
pub struct Flash {
    pub kind: FlashKind,
    pub message: String,
    expires_at: Instant,
}

impl Flash {
    pub fn success(message: impl Into<String>, ttl: Duration) -> Self {
        Self::new(FlashKind::Success, message.into(), ttl)
    }

    pub fn error(message: impl Into<String>, ttl: Duration) -> Self {
        Self::new(FlashKind::Error, message.into(), ttl)
    }

    fn new(kind: FlashKind, message: String, ttl: Duration) -> Self {
        Self {
            kind,
            message,
            expires_at: Instant::now() + ttl,
        }
    }

    pub fn is_visible(&self) -> bool {
        Instant::now() < self.expires_at
    }
}

/// The flash if it has not expired yet
pub(crate) fn visible(flash: &Option<Flash>) -> Option<&Flash> {
    flash.as_ref().filter(|f| f.is_visible())
}
