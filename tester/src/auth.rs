//! Auth/Session Helper
//!
//! Registers, logs in, verifies and deletes platform users on behalf of a
//! suite. A session belongs to the suite that created it and moves through
//! `Unauthenticated -> Registered -> (PendingVerification) -> Authenticated
//! -> Revoked`. Registration that requires e-mail verification is reported
//! as [`SessionOutcome::PendingVerification`], which is not a failure.

use serde_json::{Value, json};
use shared::{AuthSession, HarnessConfig, ServiceDescriptor};
use tracing::{debug, info, warn};

use crate::error::{HarnessError, HarnessResult};
use crate::fixtures::generate_user;
use crate::runtime::{ApiClient, ApiResponse, ApiResult, RequestOptions};
use crate::testing::json::{first_string, id_of};

const TOKEN_POINTERS: &[&str] = &["/token", "/jwt", "/data/jwt", "/data/token"];
const USER_ID_POINTERS: &[&str] = &["/user/_id", "/user/id", "/data/user/_id", "/data/user/id", "/_id", "/id"];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    Unauthenticated,
    Registered,
    PendingVerification,
    Authenticated,
    Revoked,
}

impl SessionState {
    pub fn can_transition_to(self, next: SessionState) -> bool {
        use SessionState::*;
        matches!(
            (self, next),
            (Unauthenticated, Registered)
                | (Registered, PendingVerification)
                | (Registered, Authenticated)
                | (PendingVerification, Authenticated)
                | (Authenticated, Revoked)
                | (Registered, Revoked)
                | (PendingVerification, Revoked)
        )
    }
}

/// Parsed result of `POST /api/auth/register`
#[derive(Clone, Debug)]
pub struct Registration {
    pub email: String,
    pub password: String,
    pub user_id: String,
    pub requires_verification: bool,
    pub body: Value,
}

impl Registration {
    /// Registered user as returned by the auth service
    pub fn user(&self) -> &Value {
        self.body.get("user").unwrap_or(&Value::Null)
    }
}

#[derive(Clone, Debug)]
pub struct AuthenticatedUser {
    pub registration: Registration,
    pub session: AuthSession,
}

#[derive(Clone, Debug)]
pub enum SessionOutcome {
    Authenticated(AuthenticatedUser),
    PendingVerification(Registration),
}

impl SessionOutcome {
    pub fn state(&self) -> SessionState {
        match self {
            SessionOutcome::Authenticated(_) => SessionState::Authenticated,
            SessionOutcome::PendingVerification(_) => SessionState::PendingVerification,
        }
    }

    pub fn registration(&self) -> &Registration {
        match self {
            SessionOutcome::Authenticated(user) => &user.registration,
            SessionOutcome::PendingVerification(registration) => registration,
        }
    }

    pub fn session(&self) -> Option<&AuthSession> {
        match self {
            SessionOutcome::Authenticated(user) => Some(&user.session),
            SessionOutcome::PendingVerification(_) => None,
        }
    }

    pub fn user_id(&self) -> &str {
        &self.registration().user_id
    }
}

/// Bearer token from a login body (`token`, `jwt` or nested `data.jwt`)
pub fn extract_token(body: &Value) -> Option<String> {
    first_string(body, TOKEN_POINTERS)
}

pub fn extract_user_id(body: &Value) -> Option<String> {
    first_string(body, USER_ID_POINTERS)
}

pub struct AuthHelper {
    client: ApiClient,
    auth: ServiceDescriptor,
    users: ServiceDescriptor,
}

impl AuthHelper {
    pub fn new(client: ApiClient, auth: ServiceDescriptor, users: ServiceDescriptor) -> Self {
        Self { client, auth, users }
    }

    pub fn from_config(client: ApiClient, config: &HarnessConfig) -> HarnessResult<Self> {
        Ok(Self::new(
            client,
            config.service("auth")?.clone(),
            config.service("user")?.clone(),
        ))
    }

    /// Raw registration call; the caller decides what a status means
    pub async fn register_raw(&self, payload: &Value) -> ApiResult<ApiResponse> {
        self.client
            .post(&self.auth.endpoint("/api/auth/register"), payload, &RequestOptions::new())
            .await
    }

    /// Register `payload` and parse the created user
    pub async fn register(&self, payload: &Value) -> HarnessResult<Registration> {
        let email = payload_str(payload, "email");
        debug!("📝 Registering user: {}", email);

        let response = self.register_raw(payload).await?;
        let user_id = extract_user_id(&response.data).ok_or_else(|| {
            HarnessError::assertion(format!("registration for {email} returned no user id: {}", response.data))
        })?;
        let requires_verification = response
            .data
            .get("requiresVerification")
            .and_then(Value::as_bool)
            .unwrap_or(false);

        info!("✅ User registered: {} (ID: {})", email, user_id);
        Ok(Registration {
            email,
            password: payload_str(payload, "password"),
            user_id,
            requires_verification,
            body: response.data,
        })
    }

    /// Raw login call
    pub async fn login(&self, email: &str, password: &str) -> ApiResult<ApiResponse> {
        let body = json!({ "email": email, "password": password });
        self.client
            .post(&self.auth.endpoint("/api/auth/login"), &body, &RequestOptions::new())
            .await
    }

    /// Log in and build a session; `user_id` is used when the body names none
    pub async fn login_session(&self, email: &str, password: &str, user_id: &str) -> HarnessResult<AuthSession> {
        let response = self.login(email, password).await?;
        let token = extract_token(&response.data)
            .ok_or_else(|| HarnessError::assertion(format!("login for {email} returned no token")))?;
        let user_id = extract_user_id(&response.data).unwrap_or_else(|| user_id.to_string());
        Ok(AuthSession::new(token, user_id))
    }

    /// Register a fresh fixture user, then log in unless verification is pending
    pub async fn create_authenticated_user(&self, overrides: Option<Value>) -> HarnessResult<SessionOutcome> {
        let payload = generate_user(overrides);
        let registration = self.register(&payload).await?;

        if registration.requires_verification {
            info!("📧 {} requires e-mail verification; not logging in", registration.email);
            return Ok(SessionOutcome::PendingVerification(registration));
        }

        let session = self
            .login_session(&registration.email, &registration.password, &registration.user_id)
            .await?;
        info!("🔑 Logged in as {}", registration.email);
        Ok(SessionOutcome::Authenticated(AuthenticatedUser { registration, session }))
    }

    pub async fn verify_token(&self, token: &str) -> ApiResult<ApiResponse> {
        self.client
            .get(&self.auth.endpoint("/api/auth/verify"), &RequestOptions::new().token(token))
            .await
    }

    pub async fn find_user_by_email(&self, email: &str, token: Option<&str>) -> ApiResult<Value> {
        let mut options = RequestOptions::new().query("email", email);
        if let Some(token) = token {
            options = options.token(token);
        }
        let response = self
            .client
            .get(&self.users.endpoint("/api/users/findByEmail"), &options)
            .await?;
        Ok(response.data)
    }

    pub async fn get_user(&self, user_id: &str) -> ApiResult<ApiResponse> {
        self.client
            .get(&self.users.endpoint(&format!("/api/users/{user_id}")), &RequestOptions::new())
            .await
    }

    /// Best-effort delete; failure is logged and reported as `false`
    pub async fn delete_user(&self, user_id: &str, token: Option<&str>) -> bool {
        let mut options = RequestOptions::new();
        if let Some(token) = token {
            options = options.token(token);
        }
        let url = self.users.endpoint(&format!("/api/users/{user_id}"));

        match self.client.delete(&url, &options).await {
            Ok(_) => {
                debug!("🗑️ Deleted user {}", user_id);
                true
            }
            Err(e) => {
                warn!("⚠️ Could not delete user {}: {}", user_id, e);
                false
            }
        }
    }
}

fn payload_str(payload: &Value, field: &str) -> String {
    payload.get(field).and_then(Value::as_str).unwrap_or_default().to_string()
}
