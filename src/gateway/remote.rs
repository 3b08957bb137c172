//! Gateway over the managed backend's REST and storage APIs

use async_trait::async_trait;
use chrono::Utc;
use log::debug;
use serde_json::json;

use crate::error::{Error, Result};
use crate::gateway::{Gateway, RequestQuery};
use crate::models::{
    ImageUpload, NewRequest, Profile, Request, RequestId, RequestPatch, RequestStatus, UserId,
};
use crate::postgrest::{contains_pattern, Filter, Filterable};
use crate::storage::FileOptions;
use crate::TakeIt;

const REQUESTS: &str = "requests";
const PROFILES: &str = "profiles";

const REQUEST_COLUMNS: &str = "id,title,description,category,status,price,location,image_url,seeker_id,assigned_to_user_id,created_at";
const PROFILE_COLUMNS: &str = "id,full_name,phone,city,gender,role";

fn first_row<T>(rows: Vec<T>, missing: impl FnOnce() -> Error) -> Result<T> {
    rows.into_iter().next().ok_or_else(missing)
}

#[async_trait]
impl Gateway for TakeIt {
    async fn fetch_requests(&self, query: &RequestQuery) -> Result<Vec<Request>> {
        let select = self.from(REQUESTS).select(REQUEST_COLUMNS);
        let select = match query {
            RequestQuery::Mine { seeker } => select.eq("seeker_id", seeker.as_str()),
            RequestQuery::OpenNearby { city } => {
                let select = select.eq("status", RequestStatus::Open.as_str());
                match city {
                    Some(filter) => select.ilike("location", &contains_pattern(filter.as_str())),
                    None => select,
                }
            }
            RequestQuery::Handled { assignee } => select
                .eq("assigned_to_user_id", assignee.as_str())
                .in_list(
                    "status",
                    &[
                        RequestStatus::InProgress.as_str(),
                        RequestStatus::Closed.as_str(),
                    ],
                ),
        };

        let rows = select.order("created_at", false).execute::<Request>().await?;
        debug!("{:?} returned {} rows", query, rows.len());
        Ok(rows)
    }

    async fn insert_request(&self, request: &NewRequest) -> Result<Request> {
        let rows = self.from(REQUESTS).insert(request).execute::<Request>().await?;
        first_row(rows, || Error::not_found("insert returned no row"))
    }

    async fn update_request(
        &self,
        id: RequestId,
        owner: &UserId,
        patch: &RequestPatch,
    ) -> Result<Request> {
        let rows = self
            .from(REQUESTS)
            .update(patch)
            .eq("id", &id.to_string())
            .eq("seeker_id", owner.as_str())
            .execute::<Request>()
            .await?;
        first_row(rows, || Error::not_found(format!("request {} not found", id)))
    }

    async fn delete_request(&self, id: RequestId, owner: &UserId) -> Result<()> {
        let rows = self
            .from(REQUESTS)
            .delete()
            .eq("id", &id.to_string())
            .eq("seeker_id", owner.as_str())
            .execute::<Request>()
            .await?;
        first_row(rows, || Error::not_found(format!("request {} not found", id))).map(|_| ())
    }

    async fn claim_request(&self, id: RequestId, provider: &UserId) -> Result<Request> {
        let rows = self
            .from(REQUESTS)
            .update(json!({
                "status": RequestStatus::InProgress,
                "assigned_to_user_id": provider,
            }))
            .eq("id", &id.to_string())
            .eq("status", RequestStatus::Open.as_str())
            .neq("seeker_id", provider.as_str())
            .execute::<Request>()
            .await?;
        first_row(rows, || {
            Error::conflict(format!("request {} is no longer open", id))
        })
    }

    async fn close_request(&self, id: RequestId, actor: &UserId) -> Result<Request> {
        let rows = self
            .from(REQUESTS)
            .update(json!({ "status": RequestStatus::Closed }))
            .eq("id", &id.to_string())
            .eq("status", RequestStatus::InProgress.as_str())
            .or(&[
                Filter::eq("seeker_id", actor.as_str()),
                Filter::eq("assigned_to_user_id", actor.as_str()),
            ])
            .execute::<Request>()
            .await?;
        first_row(rows, || {
            Error::conflict(format!("request {} is not in progress for this user", id))
        })
    }

    async fn fetch_profile(&self, user: &UserId) -> Result<Option<Profile>> {
        self.from(PROFILES)
            .select(PROFILE_COLUMNS)
            .eq("id", user.as_str())
            .execute_one::<Profile>()
            .await
    }

    async fn upsert_profile(&self, profile: &Profile) -> Result<Profile> {
        let rows = self
            .from(PROFILES)
            .upsert(profile)
            .on_conflict("id")
            .execute::<Profile>()
            .await?;
        first_row(rows, || Error::not_found("upsert returned no row"))
    }

    async fn upload_image(&self, uploader: &UserId, image: &ImageUpload) -> Result<String> {
        let path = image.storage_path(uploader, Utc::now());
        let mut options = FileOptions::new();
        if let Some(content_type) = &image.content_type {
            options = options.with_content_type(content_type);
        }

        self.storage()
            .from(&self.options().image_bucket)
            .upload(&path, image.bytes.clone(), options)
            .await?;
        Ok(path)
    }

    async fn remove_image(&self, path: &str) -> Result<()> {
        self.storage()
            .from(&self.options().image_bucket)
            .remove(&[path])
            .await?;
        Ok(())
    }
}
