//! Rows of the `profiles` and `requests` tables and the values they hold

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use uuid::Uuid;

use crate::postgrest::is_wildcard;

/// Identity reference owned by the identity provider
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Generated identifier of a request row
pub type RequestId = Uuid;

/// What a user mainly does on the platform
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Posts service calls
    #[default]
    Client,
    /// Browses and claims service calls
    Provider,
}

/// A row of the `profiles` table, keyed by the identity it belongs to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: UserId,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub role: Role,
}

impl Profile {
    /// An empty profile for `id`
    pub fn new(id: UserId) -> Self {
        Self {
            id,
            full_name: None,
            phone: None,
            city: None,
            gender: None,
            role: Role::default(),
        }
    }
}

/// Lifecycle state of a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Open,
    InProgress,
    Closed,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::InProgress => "in_progress",
            Self::Closed => "closed",
        }
    }

    /// Whether a provider has taken the request on
    pub fn is_handled(&self) -> bool {
        matches!(self, Self::InProgress | Self::Closed)
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Service category, stored as its display label.
///
/// Rows written by other clients may carry a label outside the known set;
/// those decode as [`Category::Unlisted`] and are written back unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Category {
    Plumbing,
    Electricity,
    Cleaning,
    Painting,
    Moving,
    PetCare,
    Other,
    Unlisted(String),
}

impl Category {
    pub const ALL: [Category; 7] = [
        Category::Plumbing,
        Category::Electricity,
        Category::Cleaning,
        Category::Painting,
        Category::Moving,
        Category::PetCare,
        Category::Other,
    ];

    /// The label shown to users and stored in the `category` column
    pub fn label(&self) -> &str {
        match self {
            Self::Plumbing => "אינסטלציה",
            Self::Electricity => "חשמל",
            Self::Cleaning => "ניקיון",
            Self::Painting => "צביעה",
            Self::Moving => "הובלות",
            Self::PetCare => "טיפול בחיות מחמד",
            Self::Other => "אחר",
            Self::Unlisted(label) => label,
        }
    }

    fn slug(&self) -> &str {
        match self {
            Self::Plumbing => "plumbing",
            Self::Electricity => "electricity",
            Self::Cleaning => "cleaning",
            Self::Painting => "painting",
            Self::Moving => "moving",
            Self::PetCare => "pet_care",
            Self::Other => "other",
            Self::Unlisted(label) => label,
        }
    }

    fn unlisted_default() -> Self {
        Self::Unlisted(String::new())
    }

    /// The known category stored as `label`, or an unlisted one
    pub fn from_label(label: &str) -> Self {
        Category::ALL
            .into_iter()
            .find(|c| c.label() == label)
            .unwrap_or_else(|| Self::Unlisted(label.to_string()))
    }
}

impl Serialize for Category {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

impl<'de> Deserialize<'de> for Category {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = Option::<String>::deserialize(deserializer)?.unwrap_or_default();
        Ok(Self::from_label(label.trim()))
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Category {
    type Err = String;

    /// Accepts the stored label or the English slug
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Category::ALL
            .into_iter()
            .find(|c| c.label() == s || c.slug().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown category {:?}", s))
    }
}

/// A free-text `"city[, neighborhood]"` location
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub city: String,
    pub neighborhood: Option<String>,
}

impl Location {
    pub fn new(city: &str, neighborhood: Option<&str>) -> Self {
        Self {
            city: city.trim().to_string(),
            neighborhood: neighborhood
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .map(str::to_string),
        }
    }

    /// Split a stored location at its first comma
    pub fn parse(location: &str) -> Self {
        match location.split_once(',') {
            Some((city, neighborhood)) => Self::new(city, Some(neighborhood)),
            None => Self::new(location, None),
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.neighborhood {
            Some(neighborhood) => write!(f, "{}, {}", self.city, neighborhood),
            None => f.write_str(&self.city),
        }
    }
}

/// Case-insensitive partial match of a provider's city against a location.
///
/// Pattern wildcards are dropped from the city, so the server-side `ilike`
/// and [`LocationFilter::matches`] compare the same literal text.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LocationFilter(String);

impl LocationFilter {
    /// `None` when the city is blank, i.e. no narrowing
    pub fn new(city: &str) -> Option<Self> {
        let city: String = city.chars().filter(|c| !is_wildcard(*c)).collect();
        let city = city.trim();
        if city.is_empty() {
            None
        } else {
            Some(Self(city.to_lowercase()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn matches(&self, location: Option<&str>) -> bool {
        location
            .map(|l| l.to_lowercase().contains(&self.0))
            .unwrap_or(false)
    }
}

/// A row of the `requests` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub id: RequestId,
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(default = "Category::unlisted_default")]
    pub category: Category,
    pub status: RequestStatus,
    /// Older rows were posted without a price
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    pub seeker_id: UserId,
    #[serde(default)]
    pub assigned_to_user_id: Option<UserId>,
    pub created_at: DateTime<Utc>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl Request {
    pub fn is_owned_by(&self, user: &UserId) -> bool {
        &self.seeker_id == user
    }

    /// Whether `user` handled this request, i.e. it belongs in their handled list
    pub fn is_handled_by(&self, user: &UserId) -> bool {
        self.status.is_handled() && self.assigned_to_user_id.as_ref() == Some(user)
    }
}

/// Insert payload for a new request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewRequest {
    pub title: String,
    pub description: String,
    pub category: Category,
    pub status: RequestStatus,
    pub price: f64,
    pub location: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub seeker_id: UserId,
    pub created_at: DateTime<Utc>,
}

/// Update payload for an owner's edit.
///
/// Never touches `seeker_id`, `status` or `created_at`; an absent image leaves
/// the stored one in place.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestPatch {
    pub title: String,
    pub description: String,
    pub category: Category,
    pub price: f64,
    pub location: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

/// A file picked for upload with a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUpload {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    pub fn new(file_name: &str, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.to_string(),
            content_type: None,
            bytes,
        }
    }

    pub fn with_content_type(mut self, content_type: &str) -> Self {
        self.content_type = Some(content_type.to_string());
        self
    }

    /// Lower-cased extension of the picked file, `bin` when it has none
    pub fn extension(&self) -> String {
        Path::new(&self.file_name)
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .filter(|e| !e.is_empty())
            .unwrap_or_else(|| "bin".to_string())
    }

    /// Storage path `{uploader}/{timestamp_millis}.{extension}`
    pub fn storage_path(&self, uploader: &UserId, at: DateTime<Utc>) -> String {
        format!(
            "{}/{}.{}",
            uploader,
            at.timestamp_millis(),
            self.extension()
        )
    }
}

/// Request-form fields that can fail validation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Title,
    Category,
    Description,
    Price,
    City,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Field::Title => "title",
            Field::Category => "category",
            Field::Description => "description",
            Field::Price => "price",
            Field::City => "city",
        })
    }
}
