//! `/auth/*` operations and the session writes that go with them.

use serde::de::IgnoredAny;
use tracing::{info, warn};

use crate::client::{ApiClient, RequestOptions, REFRESH_PATH};
use crate::error::ApiError;
use crate::services::segment;
use crate::types::{
    AuthResponse, ChangePasswordRequest, LoginRequest, RefreshResponse, RegisterRequest,
    ResetPasswordRequest, UpdateProfile, User,
};

#[derive(Debug, Clone)]
pub struct AuthService {
    client: ApiClient,
}

impl AuthService {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// `POST /auth/login`; establishes the session on success.
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthResponse, ApiError> {
        let body = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        let auth: AuthResponse = self.client.post("/auth/login", &body).await?.into_data();
        self.client.session().set_session(&auth.token, &auth.user);
        info!(user_id = %auth.user.id, expires_in = auth.expires_in, "logged in");
        Ok(auth)
    }

    /// `POST /auth/register`; establishes the session on success.
    pub async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse, ApiError> {
        let auth: AuthResponse = self.client.post("/auth/register", request).await?.into_data();
        self.client.session().set_session(&auth.token, &auth.user);
        info!(user_id = %auth.user.id, role = ?auth.user.role, "registered");
        Ok(auth)
    }

    /// `POST /auth/logout`, best effort. The local session is cleared whatever
    /// the backend says, so this never fails.
    pub async fn logout(&self) {
        if let Err(e) = self.client.post_empty::<IgnoredAny>("/auth/logout").await {
            warn!(error = %e, "backend logout failed; clearing local session anyway");
        }
        self.client.session().clear_session();
        info!("logged out");
    }

    /// `POST /auth/refresh`; replaces the stored token, keeps the cached user.
    pub async fn refresh_token(&self) -> Result<String, ApiError> {
        let RefreshResponse { token } = self.client.post_empty::<RefreshResponse>(REFRESH_PATH).await?.into_data();
        self.client.session().set_token(&token);
        Ok(token)
    }

    /// `GET /auth/me`.
    pub async fn current_user(&self) -> Result<User, ApiError> {
        Ok(self
            .client
            .get("/auth/me", &RequestOptions::default())
            .await?
            .into_data())
    }

    /// `PUT /auth/profile/{user_id}`; refreshes the cached profile on success.
    pub async fn update_profile(&self, user_id: &str, update: &UpdateProfile) -> Result<User, ApiError> {
        let user: User = self
            .client
            .put(&format!("/auth/profile/{}", segment(user_id)?), update)
            .await?
            .into_data();
        self.client.session().update_cached_user(&user);
        Ok(user)
    }

    /// `POST /auth/change-password`.
    pub async fn change_password(&self, old_password: &str, new_password: &str) -> Result<(), ApiError> {
        let body = ChangePasswordRequest {
            old_password: old_password.to_string(),
            new_password: new_password.to_string(),
        };
        self.client
            .post::<_, IgnoredAny>("/auth/change-password", &body)
            .await?;
        Ok(())
    }

    /// `POST /auth/reset-password`.
    pub async fn reset_password(&self, email: &str) -> Result<(), ApiError> {
        let body = ResetPasswordRequest {
            email: email.to_string(),
        };
        self.client
            .post::<_, IgnoredAny>("/auth/reset-password", &body)
            .await?;
        Ok(())
    }

    /// Local check only; see `SessionStore::is_authenticated`.
    pub fn is_authenticated(&self) -> bool {
        self.client.session().is_authenticated()
    }

    pub fn cached_user(&self) -> Option<User> {
        self.client.session().user()
    }
}
