//! Authentication service
//!
//! Login, registration and account self-service. Session lookups are
//! cached for the session window so every page render does not cost a
//! backend round trip.

use std::net::IpAddr;
use std::sync::Arc;

use crate::backend::repositories::{
    AuthRepository, LoginRequest, PasswordChange, ProfileUpdate, RegisterRequest,
};
use crate::cache::{keys, CacheWindows, SharedCache};
use crate::models::{AuthSession, User};
use crate::services::rate_limiter::LoginRateLimiter;
use crate::services::validation;
use crate::services::ServiceError;

/// Authentication service
pub struct AuthService {
    repo: Arc<dyn AuthRepository>,
    cache: SharedCache,
    windows: CacheWindows,
    limiter: Arc<LoginRateLimiter>,
}

impl AuthService {
    pub fn new(
        repo: Arc<dyn AuthRepository>,
        cache: SharedCache,
        windows: CacheWindows,
        limiter: Arc<LoginRateLimiter>,
    ) -> Self {
        Self {
            repo,
            cache,
            windows,
            limiter,
        }
    }

    async fn remember(&self, session: &AuthSession) {
        if let Err(e) = self
            .cache
            .set(&keys::session(&session.token), &session.user, self.windows.session)
            .await
        {
            tracing::warn!("Failed to cache session: {}", e);
        }
    }

    /// Sign in with email and password
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        ip: Option<IpAddr>,
    ) -> Result<AuthSession, ServiceError> {
        validation::validate_login(email, password)?;
        let email = email.trim();

        if let Some(ip) = ip {
            if self.limiter.is_ip_limited(ip).await {
                tracing::warn!(%ip, "Login blocked by IP rate limit");
                return Err(ServiceError::RateLimited);
            }
            self.limiter.record_ip_request(ip).await;
        }
        if self.limiter.is_identifier_limited(email).await {
            tracing::warn!(email, "Login blocked by account rate limit");
            return Err(ServiceError::RateLimited);
        }

        let request = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        match self.repo.login(&request).await {
            Ok(session) => {
                self.limiter.clear_identifier_attempts(email).await;
                self.remember(&session).await;
                tracing::info!(user_id = %session.user.id, "User logged in");
                Ok(session)
            }
            Err(e) => {
                if matches!(e.status_code(), Some(400 | 401 | 403)) {
                    self.limiter.record_failed_attempt(email).await;
                }
                Err(e.into())
            }
        }
    }

    /// Create an account and sign it in
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
        confirm: &str,
    ) -> Result<AuthSession, ServiceError> {
        validation::validate_registration(name, email, password, confirm)?;

        let request = RegisterRequest {
            name: name.trim().to_string(),
            email: email.trim().to_string(),
            password: password.to_string(),
        };
        let session = self.repo.register(&request).await?;
        self.remember(&session).await;
        tracing::info!(user_id = %session.user.id, "User registered");
        Ok(session)
    }

    /// End a session. Backend failures are logged, never surfaced.
    pub async fn logout(&self, token: &str) {
        self.cache.delete(&keys::session(token)).await;
        if let Err(e) = self.repo.logout(token).await {
            tracing::warn!("Backend logout failed: {}", e);
        }
    }

    /// User owning `token`, or `None` if the session is no longer valid
    pub async fn current_user(&self, token: &str) -> Result<Option<User>, ServiceError> {
        let key = keys::session(token);
        match self.cache.get::<User>(&key).await {
            Ok(Some(user)) => return Ok(Some(user)),
            Ok(None) => {}
            Err(e) => tracing::warn!("Failed to read cached session: {}", e),
        }

        match self.repo.me(token).await {
            Ok(user) if user.active => {
                let session = AuthSession {
                    token: token.to_string(),
                    user,
                };
                self.remember(&session).await;
                Ok(Some(session.user))
            }
            Ok(_) => Ok(None),
            Err(e) if matches!(e.status_code(), Some(401 | 403 | 404)) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Request a password reset link.
    ///
    /// Unknown addresses succeed too, so the form does not reveal which
    /// emails have accounts.
    pub async fn forgot_password(&self, email: &str) -> Result<(), ServiceError> {
        validation::validate_forgot_password(email)?;
        match self.repo.forgot_password(email.trim()).await {
            Ok(()) => Ok(()),
            Err(e) if e.is_not_found() => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn reset_password(
        &self,
        reset_token: &str,
        password: &str,
        confirm: &str,
    ) -> Result<(), ServiceError> {
        validation::validate_password_reset(reset_token, password, confirm)?;
        self.repo.reset_password(reset_token, password).await?;
        Ok(())
    }

    /// Update name, bio and avatar of the signed-in user
    pub async fn update_profile(
        &self,
        session: &AuthSession,
        name: &str,
        bio: Option<&str>,
        avatar: Option<&str>,
    ) -> Result<User, ServiceError> {
        validation::validate_profile(name, bio, avatar)?;

        let non_blank = |v: Option<&str>| {
            v.map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        let update = ProfileUpdate {
            name: name.trim().to_string(),
            bio: non_blank(bio),
            avatar: non_blank(avatar),
        };
        let user = self.repo.update_profile(&session.token, &update).await?;
        self.remember(&AuthSession {
            token: session.token.clone(),
            user: user.clone(),
        })
        .await;
        Ok(user)
    }

    pub async fn change_password(
        &self,
        session: &AuthSession,
        current: &str,
        new_password: &str,
        confirm: &str,
    ) -> Result<(), ServiceError> {
        validation::validate_password_change(current, new_password, confirm)?;
        let change = PasswordChange {
            current_password: current.to_string(),
            new_password: new_password.to_string(),
        };
        self.repo.change_password(&session.token, &change).await?;
        tracing::info!(user_id = %session.user.id, "Password changed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::config::CacheConfig;
    use crate::models::Role;
    use crate::testing::{FakeBackend, Failure};
    use std::str::FromStr;

    fn service(backend: &Arc<FakeBackend>) -> AuthService {
        AuthService::new(
            backend.clone(),
            Arc::new(MemoryCache::new()),
            CacheWindows::from(&CacheConfig::default()),
            Arc::new(LoginRateLimiter::new()),
        )
    }

    #[tokio::test]
    async fn test_login_success_and_failure() {
        let backend = FakeBackend::new();
        let ada = backend.add_user("1", Role::Writer, "secret123");
        let service = service(&backend);

        let session = service
            .login(&ada.user.email, "secret123", None)
            .await
            .unwrap();
        assert_eq!(session.user.id, "1");

        let err = service
            .login(&ada.user.email, "wrong", None)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Backend(_)));
    }

    #[tokio::test]
    async fn test_login_validation_skips_backend() {
        let backend = FakeBackend::new();
        let service = service(&backend);
        let err = service.login("nope", "", None).await.unwrap_err();
        assert!(err.field_errors().unwrap().get("email").is_some());
        assert_eq!(backend.calls("login"), 0);
    }

    #[tokio::test]
    async fn test_repeated_failures_are_rate_limited() {
        let backend = FakeBackend::new();
        let ada = backend.add_user("1", Role::User, "secret123");
        let service = service(&backend);

        for _ in 0..5 {
            let _ = service.login(&ada.user.email, "wrong", None).await;
        }
        let err = service
            .login(&ada.user.email, "secret123", None)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::RateLimited));
        assert_eq!(backend.calls("login"), 5);
    }

    #[tokio::test]
    async fn test_ip_rate_limit() {
        let backend = FakeBackend::new();
        let ada = backend.add_user("1", Role::User, "secret123");
        let service = service(&backend);
        let ip = IpAddr::from_str("192.0.2.1").unwrap();

        for _ in 0..10 {
            service.login(&ada.user.email, "secret123", Some(ip)).await.unwrap();
        }
        assert!(matches!(
            service.login(&ada.user.email, "secret123", Some(ip)).await,
            Err(ServiceError::RateLimited)
        ));
    }

    #[tokio::test]
    async fn test_current_user_is_cached() {
        let backend = FakeBackend::new();
        let ada = backend.add_user("1", Role::User, "secret123");
        let service = service(&backend);

        assert_eq!(service.current_user(&ada.token).await.unwrap().unwrap().id, "1");
        assert_eq!(service.current_user(&ada.token).await.unwrap().unwrap().id, "1");
        assert_eq!(backend.calls("me"), 1);
    }

    #[tokio::test]
    async fn test_invalid_or_inactive_session_is_none() {
        let backend = FakeBackend::new();
        let ada = backend.add_user("1", Role::User, "secret123");
        let service = service(&backend);

        assert!(service.current_user("bogus").await.unwrap().is_none());

        backend.state().users.get_mut("1").unwrap().active = false;
        assert!(service.current_user(&ada.token).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_current_user_propagates_outage() {
        let backend = FakeBackend::new();
        let service = service(&backend);
        backend.fail_with(Some(Failure::Unavailable));
        assert!(service.current_user("t").await.is_err());
    }

    #[tokio::test]
    async fn test_logout_clears_cache_even_if_backend_fails() {
        let backend = FakeBackend::new();
        let ada = backend.add_user("1", Role::User, "secret123");
        let service = service(&backend);

        service.current_user(&ada.token).await.unwrap();
        backend.fail_with(Some(Failure::Status(500)));
        service.logout(&ada.token).await;
        backend.fail_with(None);

        backend.state().tokens.remove(&ada.token);
        assert!(service.current_user(&ada.token).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_register_conflict_message() {
        let backend = FakeBackend::new();
        let ada = backend.add_user("1", Role::User, "secret123");
        let service = service(&backend);

        let err = service
            .register("Ada", &ada.user.email, "secret123", "secret123")
            .await
            .unwrap_err();
        assert_eq!(err.user_message(), "Email already registered");

        let session = service
            .register("Grace", "grace@example.com", "secret123", "secret123")
            .await
            .unwrap();
        assert_eq!(session.user.name, "Grace");
    }

    #[tokio::test]
    async fn test_forgot_password_hides_unknown_email() {
        let backend = FakeBackend::new();
        let service = service(&backend);
        service.forgot_password("nobody@example.com").await.unwrap();
    }

    #[tokio::test]
    async fn test_reset_password_surfaces_backend_message() {
        let backend = FakeBackend::new();
        let service = service(&backend);
        let err = service
            .reset_password("expired", "secret123", "secret123")
            .await
            .unwrap_err();
        assert_eq!(err.user_message(), "Reset link is invalid or has expired");
        service
            .reset_password("valid-reset", "secret123", "secret123")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_update_profile_refreshes_cached_session() {
        let backend = FakeBackend::new();
        let ada = backend.add_user("1", Role::User, "secret123");
        let service = service(&backend);

        service.current_user(&ada.token).await.unwrap();
        service
            .update_profile(&ada, "Ada Lovelace", Some("Mathematician"), Some(" "))
            .await
            .unwrap();

        let user = service.current_user(&ada.token).await.unwrap().unwrap();
        assert_eq!(user.name, "Ada Lovelace");
        assert_eq!(user.avatar, None);
        assert_eq!(backend.calls("me"), 1);
    }

    #[tokio::test]
    async fn test_change_password() {
        let backend = FakeBackend::new();
        let ada = backend.add_user("1", Role::User, "secret123");
        let service = service(&backend);

        let err = service
            .change_password(&ada, "wrong123", "newpass123", "newpass123")
            .await
            .unwrap_err();
        assert_eq!(err.user_message(), "Current password is incorrect");

        service
            .change_password(&ada, "secret123", "newpass123", "newpass123")
            .await
            .unwrap();
        service
            .login(&ada.user.email, "newpass123", None)
            .await
            .unwrap();
    }
}
