//! Authentication against the managed identity provider

mod session;
mod types;

use log::{info, warn};
use reqwest::Client;
use serde_json::{json, Value};
use tokio::sync::watch;

use crate::config::ClientOptions;
use crate::error::{Error, Result};
use crate::fetch::Fetch;

pub use session::*;
pub use types::*;

/// Client for authentication.
///
/// Holds the session state and pushes every change to its subscribers.
pub struct Auth {
    url: String,
    key: String,
    client: Client,
    options: ClientOptions,
    session: watch::Sender<Option<Session>>,
}

impl Auth {
    /// Create a new Auth client
    pub fn new(url: &str, key: &str, client: Client, options: ClientOptions) -> Self {
        let (session, _) = watch::channel(None);
        Self {
            url: url.trim_end_matches('/').to_string(),
            key: key.to_string(),
            client,
            options,
            session,
        }
    }

    fn get_auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1{}", self.url, path)
    }

    fn store(&self, session: Option<Session>) {
        match &session {
            Some(s) => info!("session established for {}", s.user.id),
            None => info!("session cleared"),
        }
        self.session.send_replace(session);
    }

    /// Sign up a new user with email and password.
    ///
    /// `metadata` is stored with the account and seeds the profile row on
    /// first dashboard visit.
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: &UserMetadata,
    ) -> Result<AuthResponse> {
        let url = self.get_auth_url("/signup");

        let body = json!({
            "email": email,
            "password": password,
            "data": metadata,
        });

        let value = Fetch::post(&self.client, &url)
            .header("apikey", &self.key)
            .json(&body)?
            .execute::<Value>()
            .await
            .map_err(auth_error)?;

        // With e-mail confirmation enabled the response is the bare user.
        if value.get("access_token").is_some() {
            let session = serde_json::from_value::<Session>(value)?.stamped();
            self.store(Some(session.clone()));
            Ok(AuthResponse {
                user: Some(session.user.clone()),
                session: Some(session),
            })
        } else {
            let user = serde_json::from_value::<User>(value)?;
            Ok(AuthResponse {
                user: Some(user),
                session: None,
            })
        }
    }

    /// Sign in a user with email and password
    pub async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session> {
        let url = self.get_auth_url("/token?grant_type=password");

        let body = json!({
            "email": email,
            "password": password,
        });

        let session = Fetch::post(&self.client, &url)
            .header("apikey", &self.key)
            .json(&body)?
            .execute::<Session>()
            .await
            .map_err(auth_error)?
            .stamped();

        self.store(Some(session.clone()));
        Ok(session)
    }

    /// URL to send the browser to for a third-party sign-in.
    ///
    /// Without an explicit `redirect_to` the provider returns to the
    /// dashboard on the configured site origin.
    pub fn oauth_sign_in_url(&self, provider: OAuthProvider, redirect_to: Option<&str>) -> String {
        let redirect_to = redirect_to
            .map(str::to_string)
            .unwrap_or_else(|| self.options.oauth_redirect());

        format!(
            "{}?provider={}&redirect_to={}",
            self.get_auth_url("/authorize"),
            provider.as_str(),
            urlencoding::encode(&redirect_to)
        )
    }

    /// Complete an OAuth sign-in from the URL the provider redirected to
    pub fn session_from_redirect(&self, redirect_url: &str) -> Result<Session> {
        let session = Session::from_redirect_url(redirect_url)?;
        self.store(Some(session.clone()));
        Ok(session)
    }

    /// Complete a PKCE OAuth sign-in from the `code` query parameter
    pub async fn exchange_code_for_session(
        &self,
        auth_code: &str,
        code_verifier: &str,
    ) -> Result<Session> {
        let url = self.get_auth_url("/token?grant_type=pkce");

        let body = json!({
            "auth_code": auth_code,
            "code_verifier": code_verifier,
        });

        let session = Fetch::post(&self.client, &url)
            .header("apikey", &self.key)
            .json(&body)?
            .execute::<Session>()
            .await
            .map_err(auth_error)?
            .stamped();

        self.store(Some(session.clone()));
        Ok(session)
    }

    /// Exchange the refresh token for a fresh session
    pub async fn refresh_session(&self) -> Result<Session> {
        let current = self.session().ok_or_else(|| Error::auth("Not logged in"))?;
        let url = self.get_auth_url("/token?grant_type=refresh_token");

        let body = json!({ "refresh_token": current.refresh_token });

        let session = Fetch::post(&self.client, &url)
            .header("apikey", &self.key)
            .json(&body)?
            .execute::<Session>()
            .await
            .map_err(auth_error)?
            .stamped();

        self.store(Some(session.clone()));
        Ok(session)
    }

    /// Get the user data for the currently authenticated user
    pub async fn get_user(&self) -> Result<User> {
        let token = self
            .session()
            .map(|s| s.access_token)
            .ok_or_else(|| Error::auth("Not logged in"))?;

        Fetch::get(&self.client, &self.get_auth_url("/user"))
            .header("apikey", &self.key)
            .bearer_auth(&token)
            .execute::<User>()
            .await
            .map_err(auth_error)
    }

    /// Sign out the current user.
    ///
    /// The local session is cleared even when the server call fails.
    pub async fn sign_out(&self) -> Result<()> {
        let Some(session) = self.session() else {
            return Ok(());
        };

        let result = Fetch::post(&self.client, &self.get_auth_url("/logout"))
            .header("apikey", &self.key)
            .bearer_auth(&session.access_token)
            .send()
            .await;

        self.store(None);

        if let Err(e) = result {
            warn!("server-side sign-out failed: {}", e);
            return Err(auth_error(e));
        }
        Ok(())
    }

    /// Get the current session
    pub fn session(&self) -> Option<Session> {
        self.session.borrow().clone()
    }

    /// Replace the current session, e.g. with one restored from storage
    pub fn set_session(&self, session: Session) {
        self.store(Some(session));
    }

    /// Subscribe to session changes
    pub fn subscribe(&self) -> SessionContext {
        SessionContext::new(self.session.subscribe())
    }
}

fn auth_error(err: Error) -> Error {
    match err {
        Error::Api { message, .. } => Error::Auth(message),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn session_body(user_id: &str) -> Value {
        json!({
            "access_token": "test_access_token",
            "refresh_token": "test_refresh_token",
            "expires_in": 3600,
            "token_type": "bearer",
            "user": {
                "id": user_id,
                "email": "test@example.com",
                "user_metadata": { "full_name": "Test User", "user_type": "client" }
            }
        })
    }

    #[tokio::test]
    async fn test_sign_in_publishes_session() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .and(query_param("grant_type", "password"))
            .respond_with(ResponseTemplate::new(200).set_body_json(session_body("user-1")))
            .mount(&mock_server)
            .await;

        let auth = Auth::new(
            &mock_server.uri(),
            "test_key",
            Client::new(),
            ClientOptions::default(),
        );
        let mut context = auth.subscribe();
        assert!(context.identity().is_none());

        let session = auth
            .sign_in_with_password("test@example.com", "password123")
            .await
            .unwrap();
        assert_eq!(session.access_token, "test_access_token");
        assert!(session.expires_at.is_some());

        let identity = context.changed().await.unwrap().unwrap();
        assert_eq!(identity.user_id.as_str(), "user-1");
        assert_eq!(identity.metadata.full_name.as_deref(), Some("Test User"));
    }

    #[tokio::test]
    async fn test_sign_in_failure_is_auth_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": "invalid_grant",
                "error_description": "Invalid login credentials"
            })))
            .mount(&mock_server)
            .await;

        let auth = Auth::new(
            &mock_server.uri(),
            "test_key",
            Client::new(),
            ClientOptions::default(),
        );
        let result = auth.sign_in_with_password("test@example.com", "wrong").await;

        match result {
            Err(Error::Auth(message)) => assert_eq!(message, "Invalid login credentials"),
            other => panic!("expected auth error, got {:?}", other),
        }
        assert!(auth.session().is_none());
    }

    #[tokio::test]
    async fn test_sign_up_sends_metadata_and_handles_pending_confirmation() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/auth/v1/signup"))
            .and(body_partial_json(json!({
                "email": "new@example.com",
                "data": { "full_name": "New User", "user_type": "provider" }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "user-2",
                "email": "new@example.com"
            })))
            .mount(&mock_server)
            .await;

        let auth = Auth::new(
            &mock_server.uri(),
            "test_key",
            Client::new(),
            ClientOptions::default(),
        );
        let metadata = UserMetadata {
            full_name: Some("New User".to_string()),
            user_type: Some(crate::models::Role::Provider),
        };
        let response = auth
            .sign_up("new@example.com", "password123", &metadata)
            .await
            .unwrap();

        assert!(response.session.is_none());
        assert_eq!(response.user.unwrap().id.as_str(), "user-2");
        assert!(auth.session().is_none());
    }

    #[tokio::test]
    async fn test_exchange_code_for_session() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .and(query_param("grant_type", "pkce"))
            .and(body_partial_json(json!({
                "auth_code": "code-1",
                "code_verifier": "verifier-1"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(session_body("user-4")))
            .expect(1)
            .mount(&mock_server)
            .await;

        let auth = Auth::new(
            &mock_server.uri(),
            "test_key",
            Client::new(),
            ClientOptions::default(),
        );
        let session = auth
            .exchange_code_for_session("code-1", "verifier-1")
            .await
            .unwrap();

        assert_eq!(session.user.id.as_str(), "user-4");
        assert_eq!(auth.session(), Some(session));
    }

    #[tokio::test]
    async fn test_sign_out_clears_session() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/auth/v1/logout"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&mock_server)
            .await;

        let auth = Auth::new(
            &mock_server.uri(),
            "test_key",
            Client::new(),
            ClientOptions::default(),
        );
        auth.set_session(serde_json::from_value(session_body("user-3")).unwrap());
        let context = auth.subscribe();
        assert!(context.identity().is_some());

        auth.sign_out().await.unwrap();
        assert!(auth.session().is_none());
        assert!(context.identity().is_none());
    }

    #[test]
    fn test_oauth_sign_in_url() {
        let auth = Auth::new(
            "https://example.supabase.co",
            "test-key",
            Client::new(),
            ClientOptions::default().with_site_url("http://localhost:3000"),
        );

        let url = auth.oauth_sign_in_url(OAuthProvider::Google, None);
        assert_eq!(
            url,
            "https://example.supabase.co/auth/v1/authorize?provider=google&redirect_to=http%3A%2F%2Flocalhost%3A3000%2Fdashboard"
        );

        let url = auth.oauth_sign_in_url(OAuthProvider::Github, Some("https://example.com/cb"));
        assert!(url.contains("provider=github"));
        assert!(url.contains("redirect_to=https%3A%2F%2Fexample.com%2Fcb"));
    }
}
