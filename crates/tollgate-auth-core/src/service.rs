//! Auth service - ties together credentials, session records and tokens

use chrono::Utc;
use std::sync::Arc;
use tollgate_db::SessionRepository;
use tollgate_types::{Identity, LoginResponse, TokenKind, TokenPair};

use crate::{
    config::AuthConfig,
    credentials::{CredentialError, CredentialVerifier},
    session::{SessionIdGenerator, SessionStore},
    token::{SessionClaims, TokenCodec, TokenVerifier},
    AuthError,
};

/// Authentication service
///
/// Provides:
/// - Login with username/password (issues an access/refresh pair)
/// - Refresh token rotation with credential-change detection
/// - Logout (session revocation)
/// - Access token checks for resource servers
pub struct AuthService<C: CredentialVerifier, S: SessionRepository> {
    config: AuthConfig,
    codec: TokenCodec,
    sessions: SessionStore<S>,
    credentials: Arc<C>,
}

impl<C: CredentialVerifier, S: SessionRepository> AuthService<C, S> {
    /// Create a new auth service
    pub fn new(
        config: AuthConfig,
        credentials: Arc<C>,
        session_repo: Arc<S>,
    ) -> Result<Self, AuthError> {
        Self::with_generator(
            config,
            credentials,
            session_repo,
            SessionIdGenerator::from_entropy(),
        )
    }

    /// Create a new auth service with an explicit session id generator
    pub fn with_generator(
        config: AuthConfig,
        credentials: Arc<C>,
        session_repo: Arc<S>,
        generator: SessionIdGenerator,
    ) -> Result<Self, AuthError> {
        let codec = TokenCodec::new(&config)?;

        tracing::debug!(?config, "Auth service initialized");

        Ok(Self {
            codec,
            sessions: SessionStore::with_generator(session_repo, generator),
            credentials,
            config,
        })
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Public-key verifier for resource servers
    pub fn verifier(&self) -> &TokenVerifier {
        self.codec.verifier()
    }

    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    pub fn sessions(&self) -> &SessionStore<S> {
        &self.sessions
    }

    // =========================================================================
    // Login
    // =========================================================================

    /// Authenticate with username/password and open a session
    ///
    /// An empty `audience` falls back to the configured default. Every
    /// credential failure, including an unreachable backend, is reported as
    /// `InvalidCredentials`.
    pub async fn login(
        &self,
        username: &str,
        password: &str,
        audience: &str,
    ) -> Result<LoginResponse, AuthError> {
        let result = self.login_inner(username, password, audience).await;
        record("tollgate_auth_login_total", &result);
        result
    }

    async fn login_inner(
        &self,
        username: &str,
        password: &str,
        audience: &str,
    ) -> Result<LoginResponse, AuthError> {
        let audience = self.config.resolve_audience(audience);

        let fingerprint = self
            .credentials
            .verify(username, password)
            .await
            .map_err(|e| {
                match &e {
                    CredentialError::Rejected => tracing::debug!(username, "Login rejected"),
                    CredentialError::Unavailable(reason) => {
                        tracing::warn!(username, "Login failed, credential backend unavailable: {}", reason)
                    }
                }
                AuthError::InvalidCredentials
            })?;

        let session_id = self.sessions.create(username, &fingerprint).await?;
        let pair = self.codec.issue_pair(username, audience, &session_id)?;

        tracing::debug!(username, audience, "Login succeeded");
        Ok(LoginResponse::new(pair, username))
    }

    // =========================================================================
    // Refresh
    // =========================================================================

    /// Rotate a refresh token into a new pair
    ///
    /// The presented session is revoked before anything is issued. Of several
    /// concurrent refreshes of the same token only the one whose revocation
    /// removed the record continues. If the user's credentials changed since
    /// the session was created the session stays revoked and no pair is
    /// issued.
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, AuthError> {
        self.refresh_at(refresh_token, Utc::now().timestamp()).await
    }

    /// [`refresh`](Self::refresh) evaluated at `now` (unix seconds)
    ///
    /// The presented token is checked against `now` and the new pair is
    /// issued at `now`.
    pub async fn refresh_at(&self, refresh_token: &str, now: i64) -> Result<TokenPair, AuthError> {
        let result = self.refresh_inner(refresh_token, now).await;
        record("tollgate_auth_refresh_total", &result);
        result
    }

    async fn refresh_inner(&self, refresh_token: &str, now: i64) -> Result<TokenPair, AuthError> {
        let claims = self.codec.decode_and_verify_at(refresh_token, now)?;
        claims.expect_kind(TokenKind::Refresh)?;

        let session_id = claims.session_id();
        let record = self.sessions.lookup(&session_id).await?.ok_or_else(|| {
            tracing::debug!("Refresh for unknown session");
            AuthError::InvalidRefreshToken
        })?;

        if record.username != claims.sub {
            tracing::warn!(sub = %claims.sub, "Refresh token subject does not match session");
            return Err(AuthError::InvalidRefreshToken);
        }

        // Read before revoking so a backend failure leaves the session usable
        let current = self
            .credentials
            .current_fingerprint(&record.username)
            .await
            .map_err(|e| {
                tracing::error!(username = %record.username, "Failed to read credential fingerprint: {}", e);
                AuthError::Internal("Failed to read credential fingerprint".to_string())
            })?;

        if !self.sessions.revoke(&session_id).await? {
            tracing::debug!("Refresh lost a race with a concurrent refresh or logout");
            return Err(AuthError::InvalidRefreshToken);
        }

        let fingerprint = match current {
            Some(current) if current.matches(&record.fingerprint) => current,
            _ => {
                tracing::warn!(
                    username = %record.username,
                    "Credentials changed since session was created, session invalidated"
                );
                return Err(AuthError::SessionInvalidated);
            }
        };

        let new_session = self.sessions.create(&record.username, &fingerprint).await?;
        let pair = self
            .codec
            .issue_pair_at(&record.username, &claims.aud, &new_session, now)?;

        tracing::debug!(username = %record.username, "Session rotated");
        Ok(pair)
    }

    // =========================================================================
    // Logout
    // =========================================================================

    /// Revoke the session behind an access or refresh token
    ///
    /// Returns whether a session was removed; repeating a logout is not an
    /// error. A refresh token still inside its grace window is accepted.
    pub async fn logout(&self, token: &str) -> Result<bool, AuthError> {
        let result = self.logout_inner(token).await;
        record("tollgate_auth_logout_total", &result);
        result
    }

    async fn logout_inner(&self, token: &str) -> Result<bool, AuthError> {
        let claims = self.codec.decode_for_revocation(token)?;
        let revoked = self.sessions.revoke(&claims.session_id()).await?;

        tracing::debug!(sub = %claims.sub, revoked, "Logout");
        Ok(revoked)
    }

    // =========================================================================
    // Access token checks
    // =========================================================================

    /// Whether an access token is backed by a live session
    ///
    /// Token failures (including presenting a refresh token) are errors;
    /// `Ok(false)` means the token is genuine but its session is gone.
    pub async fn check_auth(&self, access_token: &str) -> Result<bool, AuthError> {
        let result = self.check_auth_inner(access_token).await;
        record("tollgate_auth_check_total", &result);
        result
    }

    async fn check_auth_inner(&self, access_token: &str) -> Result<bool, AuthError> {
        let claims = self.access_claims(access_token)?;
        let record = self.sessions.lookup(&claims.session_id()).await?;
        Ok(record.is_some_and(|r| r.username == claims.sub))
    }

    /// Identity behind a live access token
    pub async fn get_identity(&self, access_token: &str) -> Result<Identity, AuthError> {
        let result = self.get_identity_inner(access_token).await;
        record("tollgate_auth_identity_total", &result);
        result
    }

    async fn get_identity_inner(&self, access_token: &str) -> Result<Identity, AuthError> {
        let claims = self.access_claims(access_token)?;

        match self.sessions.lookup(&claims.session_id()).await? {
            Some(record) if record.username == claims.sub => Ok(Identity {
                username: record.username,
            }),
            _ => {
                tracing::debug!(sub = %claims.sub, "Access token session not found");
                Err(AuthError::SessionNotFound)
            }
        }
    }

    fn access_claims(&self, access_token: &str) -> Result<SessionClaims, AuthError> {
        let claims = self.codec.decode_and_verify(access_token)?;
        claims.expect_kind(TokenKind::Access)?;
        Ok(claims)
    }

    // =========================================================================
    // Maintenance
    // =========================================================================

    /// Delete sessions whose refresh tokens have all expired
    pub async fn purge_stale_sessions(&self) -> Result<u64, AuthError> {
        self.sessions.purge_older_than(self.config.refresh_ttl).await
    }
}

impl<C: CredentialVerifier, S: SessionRepository> std::fmt::Debug for AuthService<C, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthService")
            .field("config", &self.config)
            .field("codec", &self.codec)
            .finish_non_exhaustive()
    }
}

/// Metrics label for an operation outcome
fn outcome<T>(result: &Result<T, AuthError>) -> &'static str {
    match result {
        Ok(_) => "ok",
        Err(AuthError::InvalidToken(e)) => e.error_code(),
        Err(e) => e.error_code(),
    }
}

fn record<T>(name: &'static str, result: &Result<T, AuthError>) {
    metrics::counter!(name, "result" => outcome(result)).increment(1);
}
