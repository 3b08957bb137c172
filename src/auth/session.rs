//! Session data and the session context handed to the dashboard

use chrono::Utc;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use url::Url;

use crate::auth::{User, UserMetadata};
use crate::error::{Error, Result};
use crate::models::UserId;

/// Session data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// The access token
    pub access_token: String,

    /// The refresh token
    pub refresh_token: String,

    /// The token type
    #[serde(default = "default_token_type")]
    pub token_type: String,

    /// The lifetime of the access token in seconds
    pub expires_in: i64,

    /// The expiry timestamp
    #[serde(default)]
    pub expires_at: Option<i64>,

    /// The signed-in user
    pub user: User,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

/// Claims of a GoTrue access token that identify the user
#[derive(Debug, Clone, Deserialize)]
pub struct AccessClaims {
    pub sub: UserId,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub exp: Option<i64>,
    #[serde(default)]
    pub user_metadata: UserMetadata,
}

/// Read the claims of an access token without verifying its signature.
///
/// Only the backend can verify the token; the client uses the claims to learn
/// who it is signed in as.
pub fn read_claims(token: &str) -> Result<AccessClaims> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    let data = decode::<AccessClaims>(token, &DecodingKey::from_secret(&[]), &validation)?;
    Ok(data.claims)
}

impl Session {
    /// Fill in `expires_at` from `expires_in` when the server omitted it
    pub fn stamped(mut self) -> Self {
        if self.expires_at.is_none() {
            self.expires_at = Some(Utc::now().timestamp() + self.expires_in);
        }
        self
    }

    /// Check if the session has expired
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(expires_at) => Utc::now().timestamp() >= expires_at,
            None => false,
        }
    }

    /// Build a session from the URL the identity provider redirected to after
    /// an OAuth sign-in (`…/dashboard#access_token=…&refresh_token=…`).
    pub fn from_redirect_url(redirect: &str) -> Result<Self> {
        let url = Url::parse(redirect)?;
        let fragment = url
            .fragment()
            .ok_or_else(|| Error::auth("redirect URL carries no session fragment"))?;

        let mut access_token = None;
        let mut refresh_token = None;
        let mut expires_in = None;
        let mut expires_at = None;
        let mut token_type = None;
        let mut error = None;

        for (key, value) in url::form_urlencoded::parse(fragment.as_bytes()) {
            match key.as_ref() {
                "access_token" => access_token = Some(value.into_owned()),
                "refresh_token" => refresh_token = Some(value.into_owned()),
                "expires_in" => expires_in = value.parse::<i64>().ok(),
                "expires_at" => expires_at = value.parse::<i64>().ok(),
                "token_type" => token_type = Some(value.into_owned()),
                "error_description" => error = Some(value.into_owned()),
                "error" if error.is_none() => error = Some(value.into_owned()),
                _ => {}
            }
        }

        if let Some(error) = error {
            return Err(Error::auth(error));
        }

        let access_token =
            access_token.ok_or_else(|| Error::auth("redirect URL is missing access_token"))?;
        let refresh_token =
            refresh_token.ok_or_else(|| Error::auth("redirect URL is missing refresh_token"))?;
        let claims = read_claims(&access_token)?;

        let session = Self {
            access_token,
            refresh_token,
            token_type: token_type.unwrap_or_else(default_token_type),
            expires_in: expires_in.unwrap_or(3600),
            expires_at: expires_at.or(claims.exp),
            user: User {
                id: claims.sub,
                email: claims.email,
                phone: claims.phone,
                user_metadata: claims.user_metadata,
                created_at: None,
            },
        };
        Ok(session.stamped())
    }

    /// Who this session belongs to
    pub fn identity(&self) -> Identity {
        Identity {
            user_id: self.user.id.clone(),
            email: self.user.email.clone(),
            metadata: self.user.user_metadata.clone(),
        }
    }
}

/// The signed-in user as seen by the dashboard
#[derive(Debug, Clone, PartialEq)]
pub struct Identity {
    pub user_id: UserId,
    pub email: Option<String>,
    pub metadata: UserMetadata,
}

/// Read side of the session state.
///
/// Obtained from [`crate::auth::Auth::subscribe`] and passed explicitly to the
/// dashboard. Dropping it ends the subscription.
#[derive(Debug, Clone)]
pub struct SessionContext {
    rx: watch::Receiver<Option<Session>>,
}

impl SessionContext {
    pub(crate) fn new(rx: watch::Receiver<Option<Session>>) -> Self {
        Self { rx }
    }

    /// A context pinned to `session`, for hosts that manage auth themselves
    pub fn fixed(session: Option<Session>) -> Self {
        let (_tx, rx) = watch::channel(session);
        Self { rx }
    }

    /// The current session, if signed in
    pub fn session(&self) -> Option<Session> {
        self.rx.borrow().clone()
    }

    /// The current identity, if signed in
    pub fn identity(&self) -> Option<Identity> {
        self.rx.borrow().as_ref().map(Session::identity)
    }

    /// The current access token, if signed in
    pub fn access_token(&self) -> Option<String> {
        self.rx.borrow().as_ref().map(|s| s.access_token.clone())
    }

    /// Wait for the next sign-in, sign-out or token refresh.
    ///
    /// Returns the new identity, or `Err` once the auth client is gone.
    pub async fn changed(&mut self) -> Result<Option<Identity>> {
        self.rx
            .changed()
            .await
            .map_err(|_| Error::auth("session source closed"))?;
        Ok(self.rx.borrow_and_update().as_ref().map(Session::identity))
    }
}
