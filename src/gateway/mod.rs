//! The remote data gateway contract the views are written against

mod remote;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{
    ImageUpload, LocationFilter, NewRequest, Profile, Request, RequestId, RequestPatch, UserId,
};

/// A parameterized read of the `requests` collection; also the cache key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RequestQuery {
    /// Every request posted by `seeker`, any status
    Mine { seeker: UserId },
    /// Open requests, optionally narrowed by a partial location match
    OpenNearby { city: Option<LocationFilter> },
    /// Requests `assignee` took on that are in progress or closed
    Handled { assignee: UserId },
}

impl RequestQuery {
    /// Whether `request` belongs in the result of this query
    pub fn includes(&self, request: &Request) -> bool {
        match self {
            Self::Mine { seeker } => request.is_owned_by(seeker),
            Self::OpenNearby { city } => {
                request.status == crate::models::RequestStatus::Open
                    && city
                        .as_ref()
                        .map_or(true, |f| f.matches(request.location.as_deref()))
            }
            Self::Handled { assignee } => request.is_handled_by(assignee),
        }
    }
}

/// Reads and writes against the managed backend.
///
/// Writes that act on behalf of a user carry that user's id so the
/// implementation can scope them; the backend's row-level policies remain the
/// final authority.
#[async_trait]
pub trait Gateway: Send + Sync {
    /// Rows matching `query`, newest first
    async fn fetch_requests(&self, query: &RequestQuery) -> Result<Vec<Request>>;

    /// Insert a new request and return the stored row
    async fn insert_request(&self, request: &NewRequest) -> Result<Request>;

    /// Apply an owner's edit
    async fn update_request(
        &self,
        id: RequestId,
        owner: &UserId,
        patch: &RequestPatch,
    ) -> Result<Request>;

    /// Delete a request owned by `owner`
    async fn delete_request(&self, id: RequestId, owner: &UserId) -> Result<()>;

    /// Assign an open request to `provider` and move it to `in_progress`.
    ///
    /// Must be a single conditional write: fails with `Error::Conflict` when
    /// the request is no longer open.
    async fn claim_request(&self, id: RequestId, provider: &UserId) -> Result<Request>;

    /// Move an `in_progress` request to `closed`; `actor` must be its owner
    /// or its assignee.
    async fn close_request(&self, id: RequestId, actor: &UserId) -> Result<Request>;

    async fn fetch_profile(&self, user: &UserId) -> Result<Option<Profile>>;

    /// Insert or replace the profile row keyed by `profile.id`
    async fn upsert_profile(&self, profile: &Profile) -> Result<Profile>;

    /// Store `image` under the uploader's namespace, returning its storage path
    async fn upload_image(&self, uploader: &UserId, image: &ImageUpload) -> Result<String>;

    async fn remove_image(&self, path: &str) -> Result<()>;
}
