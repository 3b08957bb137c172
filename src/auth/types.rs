//! Types for authentication and user management

use serde::{Deserialize, Serialize};

use crate::auth::Session;
use crate::models::{Role, UserId};

/// Result of a sign-up.
///
/// `session` is `None` while the e-mail address still awaits confirmation.
#[derive(Debug, Clone)]
pub struct AuthResponse {
    pub user: Option<User>,
    pub session: Option<Session>,
}

/// User data as returned by the identity provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// The user ID
    pub id: UserId,

    /// The user's email address
    #[serde(default)]
    pub email: Option<String>,

    /// The user's phone number
    #[serde(default)]
    pub phone: Option<String>,

    /// Data supplied at sign-up
    #[serde(default)]
    pub user_metadata: UserMetadata,

    /// The creation time
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Profile hints stored with the account at sign-up
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_type: Option<Role>,
}

/// Third-party identity providers offered on the login page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OAuthProvider {
    Google,
    Github,
}

impl OAuthProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Google => "google",
            Self::Github => "github",
        }
    }
}
