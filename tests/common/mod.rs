#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use reqwest::StatusCode;
use serde_json::json;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use take_it::auth::Session;
use take_it::cache::QueryCache;
use take_it::error::{Error, Result};
use take_it::gateway::{Gateway, RequestQuery};
use take_it::models::{
    Category, ImageUpload, NewRequest, Profile, Request, RequestId, RequestPatch, RequestStatus,
    Role, UserId,
};
use uuid::Uuid;

/// Gateway operations that can be made to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Fetch,
    Insert,
    Update,
    Delete,
    Claim,
    Close,
    FetchProfile,
    UpsertProfile,
    Upload,
    RemoveImage,
}

#[derive(Default)]
struct State {
    requests: Vec<Request>,
    profiles: HashMap<UserId, Profile>,
    images: Vec<String>,
    failing: HashSet<Op>,
}

/// In-memory backend with the same row semantics as the remote one
#[derive(Default)]
pub struct MemoryGateway {
    state: Mutex<State>,
    fetches: AtomicUsize,
    writes: AtomicUsize,
    uploads: AtomicUsize,
}

impl MemoryGateway {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn seed(&self, request: Request) {
        self.state.lock().unwrap().requests.push(request);
    }

    pub fn seed_profile(&self, profile: Profile) {
        self.state
            .lock()
            .unwrap()
            .profiles
            .insert(profile.id.clone(), profile);
    }

    pub fn request(&self, id: RequestId) -> Option<Request> {
        self.state
            .lock()
            .unwrap()
            .requests
            .iter()
            .find(|r| r.id == id)
            .cloned()
    }

    pub fn requests(&self) -> Vec<Request> {
        self.state.lock().unwrap().requests.clone()
    }

    pub fn profile(&self, user: &UserId) -> Option<Profile> {
        self.state.lock().unwrap().profiles.get(user).cloned()
    }

    pub fn images(&self) -> Vec<String> {
        self.state.lock().unwrap().images.clone()
    }

    pub fn fail(&self, op: Op) {
        self.state.lock().unwrap().failing.insert(op);
    }

    pub fn heal(&self, op: Op) {
        self.state.lock().unwrap().failing.remove(&op);
    }

    /// Row reads of the `requests` table
    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    /// Attempted writes to the `requests` and `profiles` tables
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn uploads(&self) -> usize {
        self.uploads.load(Ordering::SeqCst)
    }

    fn check(&self, op: Op) -> Result<()> {
        if self.state.lock().unwrap().failing.contains(&op) {
            Err(Error::Api {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                message: format!("simulated {:?} failure", op),
            })
        } else {
            Ok(())
        }
    }

    fn write(&self, op: Op) -> Result<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.check(op)
    }
}

#[async_trait]
impl Gateway for MemoryGateway {
    async fn fetch_requests(&self, query: &RequestQuery) -> Result<Vec<Request>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.check(Op::Fetch)?;
        let mut rows: Vec<Request> = self
            .state
            .lock()
            .unwrap()
            .requests
            .iter()
            .filter(|r| query.includes(r))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    async fn insert_request(&self, request: &NewRequest) -> Result<Request> {
        self.write(Op::Insert)?;
        let row = Request {
            id: Uuid::new_v4(),
            title: request.title.clone(),
            description: request.description.clone(),
            category: request.category.clone(),
            status: request.status,
            price: Some(request.price),
            location: Some(request.location.clone()),
            image_url: request.image_url.clone(),
            seeker_id: request.seeker_id.clone(),
            assigned_to_user_id: None,
            created_at: request.created_at,
        };
        self.state.lock().unwrap().requests.push(row.clone());
        Ok(row)
    }

    async fn update_request(
        &self,
        id: RequestId,
        owner: &UserId,
        patch: &RequestPatch,
    ) -> Result<Request> {
        self.write(Op::Update)?;
        let mut state = self.state.lock().unwrap();
        let row = state
            .requests
            .iter_mut()
            .find(|r| r.id == id && r.is_owned_by(owner))
            .ok_or_else(|| Error::not_found(format!("request {} not found", id)))?;
        row.title = patch.title.clone();
        row.description = patch.description.clone();
        row.category = patch.category.clone();
        row.price = Some(patch.price);
        row.location = Some(patch.location.clone());
        if let Some(image_url) = &patch.image_url {
            row.image_url = Some(image_url.clone());
        }
        Ok(row.clone())
    }

    async fn delete_request(&self, id: RequestId, owner: &UserId) -> Result<()> {
        self.write(Op::Delete)?;
        let mut state = self.state.lock().unwrap();
        let before = state.requests.len();
        state
            .requests
            .retain(|r| !(r.id == id && r.is_owned_by(owner)));
        if state.requests.len() == before {
            return Err(Error::not_found(format!("request {} not found", id)));
        }
        Ok(())
    }

    async fn claim_request(&self, id: RequestId, provider: &UserId) -> Result<Request> {
        self.write(Op::Claim)?;
        let mut state = self.state.lock().unwrap();
        let row = state
            .requests
            .iter_mut()
            .find(|r| r.id == id && r.status == RequestStatus::Open && !r.is_owned_by(provider))
            .ok_or_else(|| Error::conflict(format!("request {} is no longer open", id)))?;
        row.status = RequestStatus::InProgress;
        row.assigned_to_user_id = Some(provider.clone());
        Ok(row.clone())
    }

    async fn close_request(&self, id: RequestId, actor: &UserId) -> Result<Request> {
        self.write(Op::Close)?;
        let mut state = self.state.lock().unwrap();
        let row = state
            .requests
            .iter_mut()
            .find(|r| {
                r.id == id
                    && r.status == RequestStatus::InProgress
                    && (r.is_owned_by(actor) || r.assigned_to_user_id.as_ref() == Some(actor))
            })
            .ok_or_else(|| {
                Error::conflict(format!("request {} is not in progress for this user", id))
            })?;
        row.status = RequestStatus::Closed;
        Ok(row.clone())
    }

    async fn fetch_profile(&self, user: &UserId) -> Result<Option<Profile>> {
        self.check(Op::FetchProfile)?;
        Ok(self.profile(user))
    }

    async fn upsert_profile(&self, profile: &Profile) -> Result<Profile> {
        self.write(Op::UpsertProfile)?;
        self.seed_profile(profile.clone());
        Ok(profile.clone())
    }

    async fn upload_image(&self, uploader: &UserId, image: &ImageUpload) -> Result<String> {
        self.uploads.fetch_add(1, Ordering::SeqCst);
        self.check(Op::Upload)
            .map_err(|e| Error::storage(format!("upload failed: {}", e.user_message())))?;
        let path = image.storage_path(uploader, Utc::now());
        self.state.lock().unwrap().images.push(path.clone());
        Ok(path)
    }

    async fn remove_image(&self, path: &str) -> Result<()> {
        self.check(Op::RemoveImage)?;
        self.state.lock().unwrap().images.retain(|p| p != path);
        Ok(())
    }
}

pub fn cache_over(gateway: &Arc<MemoryGateway>) -> QueryCache {
    QueryCache::new(gateway.clone())
}

pub fn user(id: &str) -> UserId {
    UserId::new(id)
}

fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap()
}

/// A request posted by `seeker`, `minutes` after a fixed base time
pub fn request(seeker: &str, status: RequestStatus, location: &str, minutes: i64) -> Request {
    Request {
        id: Uuid::new_v4(),
        title: format!("call by {}", seeker),
        description: "Needs doing".to_string(),
        category: Category::Cleaning,
        status,
        price: Some(100.0),
        location: Some(location.to_string()),
        image_url: None,
        seeker_id: user(seeker),
        assigned_to_user_id: None,
        created_at: base_time() + Duration::minutes(minutes),
    }
}

pub fn assigned(mut request: Request, assignee: &str) -> Request {
    request.assigned_to_user_id = Some(user(assignee));
    request
}

pub fn session_for(user_id: &str, full_name: &str, role: Role) -> Session {
    serde_json::from_value(json!({
        "access_token": format!("token-{}", user_id),
        "refresh_token": "refresh",
        "expires_in": 3600,
        "token_type": "bearer",
        "user": {
            "id": user_id,
            "email": format!("{}@example.com", user_id),
            "user_metadata": { "full_name": full_name, "user_type": role }
        }
    }))
    .unwrap()
}
