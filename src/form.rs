//! The request form, for posting a new call or editing one of the owner's

use chrono::Utc;
use log::{info, warn};

use crate::cache::QueryCache;
use crate::error::{Result, ValidationError};
use crate::models::{
    Category, Field, ImageUpload, Location, NewRequest, Request, RequestPatch, RequestStatus,
    UserId,
};

/// Whether the form creates a request or edits an existing one
#[derive(Debug, Clone, PartialEq)]
pub enum FormMode {
    Create,
    /// Carries the request as it was when editing started
    Edit(Request),
}

/// Field values as typed, validated only on submit
#[derive(Debug, Clone, PartialEq)]
pub struct RequestForm {
    pub title: String,
    pub category: Option<Category>,
    pub description: String,
    pub price: String,
    pub city: String,
    pub neighborhood: String,
    /// A newly picked image; `None` keeps whatever is stored
    pub image: Option<ImageUpload>,
    mode: FormMode,
}

/// Values that passed validation
struct Checked {
    title: String,
    category: Category,
    description: String,
    price: f64,
    location: String,
}

impl Default for RequestForm {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestForm {
    /// An empty form for a new request
    pub fn new() -> Self {
        Self {
            title: String::new(),
            category: None,
            description: String::new(),
            price: String::new(),
            city: String::new(),
            neighborhood: String::new(),
            image: None,
            mode: FormMode::Create,
        }
    }

    /// A form prefilled from `request`
    pub fn edit(request: Request) -> Self {
        let location = Location::parse(request.location.as_deref().unwrap_or_default());
        Self {
            title: request.title.clone(),
            category: Some(request.category.clone()),
            description: request.description.clone(),
            price: request.price.map(|p| p.to_string()).unwrap_or_default(),
            city: location.city,
            neighborhood: location.neighborhood.unwrap_or_default(),
            image: None,
            mode: FormMode::Edit(request),
        }
    }

    pub fn mode(&self) -> &FormMode {
        &self.mode
    }

    pub fn is_editing(&self) -> bool {
        matches!(self.mode, FormMode::Edit(_))
    }

    /// Back to an empty create form
    pub fn clear(&mut self) {
        *self = Self::new();
    }

    /// `"city, neighborhood"`, or just the city
    pub fn location(&self) -> Location {
        Location::new(&self.city, Some(&self.neighborhood))
    }

    /// Check required fields in form order, reporting the first failure
    pub fn validate(&self) -> std::result::Result<(), ValidationError> {
        self.check().map(|_| ())
    }

    fn check(&self) -> std::result::Result<Checked, ValidationError> {
        let title = required(&self.title, Field::Title)?;
        let category = self
            .category
            .clone()
            .filter(|c| !c.label().is_empty())
            .ok_or(ValidationError::Missing(Field::Category))?;
        let description = required(&self.description, Field::Description)?;
        let price = parse_price(&self.price)?;
        let location = self.location();
        if location.city.is_empty() {
            return Err(ValidationError::Missing(Field::City));
        }

        Ok(Checked {
            title,
            category,
            description,
            price,
            location: location.to_string(),
        })
    }

    /// Validate, upload the picked image, then write the row.
    ///
    /// Nothing is written when validation or the upload fails. If the row
    /// write fails after an upload, the uploaded object is removed again on a
    /// best-effort basis. On success the form is cleared and the stored row
    /// returned.
    pub async fn submit(&mut self, cache: &QueryCache, author: &UserId) -> Result<Request> {
        let checked = self.check()?;
        let gateway = cache.gateway();

        let image_url = match &self.image {
            Some(image) => Some(gateway.upload_image(author, image).await?),
            None => None,
        };

        let written = match &self.mode {
            FormMode::Create => {
                let request = NewRequest {
                    title: checked.title,
                    description: checked.description,
                    category: checked.category,
                    status: RequestStatus::Open,
                    price: checked.price,
                    location: checked.location,
                    image_url: image_url.clone(),
                    seeker_id: author.clone(),
                    created_at: Utc::now(),
                };
                gateway.insert_request(&request).await
            }
            FormMode::Edit(existing) => {
                let patch = RequestPatch {
                    title: checked.title,
                    description: checked.description,
                    category: checked.category,
                    price: checked.price,
                    location: checked.location,
                    image_url: image_url.clone(),
                };
                gateway.update_request(existing.id, author, &patch).await
            }
        };

        match written {
            Ok(request) => {
                if let FormMode::Edit(previous) = &self.mode {
                    cache.invalidate_for(previous);
                }
                cache.invalidate_for(&request);
                info!("saved request {}", request.id);
                self.clear();
                Ok(request)
            }
            Err(e) => {
                if let Some(path) = image_url {
                    if let Err(cleanup) = gateway.remove_image(&path).await {
                        warn!("could not remove orphaned image {}: {}", path, cleanup);
                    }
                }
                Err(e)
            }
        }
    }
}

fn required(value: &str, field: Field) -> std::result::Result<String, ValidationError> {
    let value = value.trim();
    if value.is_empty() {
        Err(ValidationError::Missing(field))
    } else {
        Ok(value.to_string())
    }
}

fn parse_price(value: &str) -> std::result::Result<f64, ValidationError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ValidationError::Missing(Field::Price));
    }
    match value.parse::<f64>() {
        Ok(price) if price.is_finite() && price >= 0.0 => Ok(price),
        _ => Err(ValidationError::InvalidPrice(value.to_string())),
    }
}
