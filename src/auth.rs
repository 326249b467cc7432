//! Desktop identity provider
//!
//! Desktop mode has exactly one implicit user and no login flow. The
//! provider answers every auth call with that user and a session that does
//! not expire in practice; credentials are never checked.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use crate::rpc::RpcError;

pub const DESKTOP_USER_ID: &str = "00000000-0000-0000-0000-000000000001";
pub const DESKTOP_USER_EMAIL: &str = "admin@desktop.local";

const SESSION_LIFETIME_SECS: i64 = 99_999_999;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DesktopUser {
    pub id: String,
    pub email: String,
    pub app_metadata: serde_json::Map<String, serde_json::Value>,
    pub user_metadata: serde_json::Map<String, serde_json::Value>,
    pub aud: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
    pub expires_at: i64,
    pub token_type: String,
    pub user: DesktopUser,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthEvent {
    SignedIn,
    SignedOut,
}

/// `{data, error}` envelope shared with the RPC surface
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuthResponse<T> {
    pub data: T,
    pub error: Option<RpcError>,
}

impl<T> AuthResponse<T> {
    fn ok(data: T) -> Self {
        Self { data, error: None }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionData {
    pub session: Option<Session>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserData {
    pub user: DesktopUser,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignInData {
    pub user: DesktopUser,
    pub session: Session,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignOutResponse {
    pub error: Option<RpcError>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserAttributes {
    pub password: Option<String>,
}

/// Handle returned by [`AuthProvider::on_auth_state_change`]
#[derive(Debug, Default)]
pub struct Subscription;

impl Subscription {
    pub fn unsubscribe(&self) {}
}

/// Auth capabilities consumed by the access-control layer
pub trait AuthProvider: Send + Sync {
    fn get_session(&self) -> AuthResponse<SessionData>;
    fn get_user(&self) -> AuthResponse<UserData>;
    fn sign_in_with_password(&self, credentials: &Credentials) -> AuthResponse<SignInData>;
    fn sign_up(&self, credentials: &Credentials) -> AuthResponse<SignInData>;
    fn sign_out(&self) -> SignOutResponse;
    fn update_user(&self, attributes: &UserAttributes) -> AuthResponse<UserData>;
    fn reset_password_for_email(&self, email: &str) -> AuthResponse<serde_json::Value>;

    /// Register a listener. The current state is delivered once before
    /// this returns.
    fn on_auth_state_change(&self, callback: &mut dyn FnMut(AuthEvent, Option<&Session>)) -> Subscription;
}

/// The fixed single-user provider
#[derive(Debug, Clone)]
pub struct DesktopAuth {
    session: Session,
}

impl DesktopAuth {
    pub fn new() -> Self {
        Self::at(Utc::now())
    }

    /// Provider whose user and session were minted at `now`
    pub fn at(now: DateTime<Utc>) -> Self {
        let mut user_metadata = serde_json::Map::new();
        user_metadata.insert("full_name".to_string(), "Admin".into());

        let user = DesktopUser {
            id: DESKTOP_USER_ID.to_string(),
            email: DESKTOP_USER_EMAIL.to_string(),
            app_metadata: serde_json::Map::new(),
            user_metadata,
            aud: "authenticated".to_string(),
            role: "authenticated".to_string(),
            created_at: now,
            updated_at: now,
        };

        let session = Session {
            access_token: "desktop-mock-token".to_string(),
            refresh_token: "desktop-mock-refresh".to_string(),
            expires_in: SESSION_LIFETIME_SECS,
            expires_at: (now + Duration::seconds(SESSION_LIFETIME_SECS)).timestamp(),
            token_type: "bearer".to_string(),
            user,
        };

        Self { session }
    }

    pub fn user(&self) -> &DesktopUser {
        &self.session.user
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    fn signed_in(&self) -> AuthResponse<SignInData> {
        AuthResponse::ok(SignInData {
            user: self.session.user.clone(),
            session: self.session.clone(),
        })
    }
}

impl Default for DesktopAuth {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthProvider for DesktopAuth {
    fn get_session(&self) -> AuthResponse<SessionData> {
        AuthResponse::ok(SessionData {
            session: Some(self.session.clone()),
        })
    }

    fn get_user(&self) -> AuthResponse<UserData> {
        AuthResponse::ok(UserData {
            user: self.session.user.clone(),
        })
    }

    fn sign_in_with_password(&self, _credentials: &Credentials) -> AuthResponse<SignInData> {
        self.signed_in()
    }

    fn sign_up(&self, _credentials: &Credentials) -> AuthResponse<SignInData> {
        self.signed_in()
    }

    fn sign_out(&self) -> SignOutResponse {
        SignOutResponse { error: None }
    }

    fn update_user(&self, _attributes: &UserAttributes) -> AuthResponse<UserData> {
        self.get_user()
    }

    fn reset_password_for_email(&self, _email: &str) -> AuthResponse<serde_json::Value> {
        AuthResponse::ok(serde_json::json!({}))
    }

    fn on_auth_state_change(&self, callback: &mut dyn FnMut(AuthEvent, Option<&Session>)) -> Subscription {
        callback(AuthEvent::SignedIn, Some(&self.session));
        Subscription
    }
}
