//! Signed session tokens (RS256 JWT)
//!
//! Both halves of a pair carry the same `jti` (the session identifier) and are
//! told apart by the `ref` claim. Signing needs the private key; verification
//! needs only the public key, so resource servers can hold a [`TokenVerifier`]
//! without ever seeing signing material.

use chrono::Utc;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tollgate_types::{SessionId, TokenKind, TokenPair};

use crate::{AuthConfig, AuthError, TokenError};

/// Claims carried by access and refresh tokens
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Issuer (service name)
    pub iss: String,
    /// Subject (username)
    pub sub: String,
    /// Audience (target service)
    pub aud: String,
    /// Session identifier
    pub jti: String,
    /// Issued at timestamp
    pub iat: i64,
    /// Not-before timestamp
    pub nbf: i64,
    /// Expiration timestamp
    pub exp: i64,
    /// Refresh flag
    #[serde(rename = "ref")]
    pub is_refresh: bool,
}

impl SessionClaims {
    /// Which half of the pair these claims belong to
    pub fn kind(&self) -> TokenKind {
        TokenKind::from_refresh_flag(self.is_refresh)
    }

    /// Fail with `WrongTokenKind` unless the claims are of `kind`
    pub fn expect_kind(&self, kind: TokenKind) -> Result<&Self, TokenError> {
        if self.kind() == kind {
            Ok(self)
        } else {
            Err(TokenError::WrongTokenKind)
        }
    }

    /// The session this token is bound to
    pub fn session_id(&self) -> SessionId {
        SessionId::new(self.jti.clone())
    }

    /// Check if the token is expired at `now` (unix seconds)
    pub fn is_expired_at(&self, now: i64) -> bool {
        now >= self.exp
    }

    /// Check if the not-before time has been reached at `now`
    pub fn is_active_at(&self, now: i64) -> bool {
        now >= self.nbf
    }
}

/// Which time-window claims to enforce when verifying
#[derive(Debug, Clone, Copy)]
struct TimeChecks {
    not_before: bool,
}

/// Public-key token verifier
#[derive(Clone)]
pub struct TokenVerifier {
    issuer: String,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    /// Create a verifier from a PEM-encoded RSA public key
    pub fn from_public_pem(issuer: impl Into<String>, pem: &str) -> Result<Self, AuthError> {
        let decoding_key = DecodingKey::from_rsa_pem(pem.as_bytes()).map_err(|e| {
            tracing::error!("Failed to load signing public key: {}", e);
            AuthError::Configuration("invalid signing public key".to_string())
        })?;

        let issuer = issuer.into();

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_issuer(&[issuer.as_str()]);
        validation.set_required_spec_claims(&["exp", "nbf", "iss", "sub", "aud", "jti"]);
        // Audience is per-token and checked by the caller; time windows are
        // checked against an explicit `now` below
        validation.validate_aud = false;
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.leeway = 0;

        Ok(Self {
            issuer,
            decoding_key,
            validation,
        })
    }

    /// Issuer this verifier accepts
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Verify signature, issuer and time window against the current time
    pub fn decode_and_verify(&self, token: &str) -> Result<SessionClaims, TokenError> {
        self.decode_and_verify_at(token, Utc::now().timestamp())
    }

    /// Verify signature, issuer and time window against `now` (unix seconds)
    pub fn decode_and_verify_at(&self, token: &str, now: i64) -> Result<SessionClaims, TokenError> {
        self.verify(token, now, TimeChecks { not_before: true })
    }

    /// Verify a token for revocation purposes
    ///
    /// Same as [`decode_and_verify`](Self::decode_and_verify) except that
    /// `nbf` is not enforced, so a refresh token still inside its grace
    /// window can be used to log out.
    pub fn decode_for_revocation(&self, token: &str) -> Result<SessionClaims, TokenError> {
        self.verify(
            token,
            Utc::now().timestamp(),
            TimeChecks { not_before: false },
        )
    }

    fn verify(&self, token: &str, now: i64, checks: TimeChecks) -> Result<SessionClaims, TokenError> {
        let token_data = decode::<SessionClaims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| {
                tracing::debug!("Token validation failed: {}", e);
                classify(e.kind())
            })?;

        let claims = token_data.claims;

        if claims.is_expired_at(now) {
            return Err(TokenError::Expired);
        }
        if checks.not_before && !claims.is_active_at(now) {
            return Err(TokenError::NotYetValid);
        }

        Ok(claims)
    }
}

impl std::fmt::Debug for TokenVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenVerifier")
            .field("issuer", &self.issuer)
            .finish_non_exhaustive()
    }
}

/// Map a jsonwebtoken failure onto the token error taxonomy
fn classify(kind: &ErrorKind) -> TokenError {
    match kind {
        ErrorKind::InvalidSignature
        | ErrorKind::InvalidAlgorithm
        | ErrorKind::InvalidAlgorithmName
        | ErrorKind::InvalidIssuer => TokenError::SignatureInvalid,
        ErrorKind::ExpiredSignature => TokenError::Expired,
        ErrorKind::ImmatureSignature => TokenError::NotYetValid,
        _ => TokenError::Malformed,
    }
}

/// Token issuer and verifier
#[derive(Clone)]
pub struct TokenCodec {
    issuer: String,
    encoding_key: EncodingKey,
    verifier: TokenVerifier,
    access_ttl_secs: i64,
    refresh_ttl_secs: i64,
    refresh_grace_secs: i64,
}

impl TokenCodec {
    /// Create a codec from the configured key pair and lifetimes
    pub fn new(config: &AuthConfig) -> Result<Self, AuthError> {
        config.validate()?;

        let encoding_key =
            EncodingKey::from_rsa_pem(config.signing_private_key.as_bytes()).map_err(|e| {
                tracing::error!("Failed to load signing private key: {}", e);
                AuthError::Configuration("invalid signing private key".to_string())
            })?;

        let verifier =
            TokenVerifier::from_public_pem(&config.service_name, &config.signing_public_key)?;

        Ok(Self {
            issuer: config.service_name.clone(),
            encoding_key,
            verifier,
            access_ttl_secs: duration_secs(config.access_ttl),
            refresh_ttl_secs: duration_secs(config.refresh_ttl),
            refresh_grace_secs: duration_secs(config.refresh_grace),
        })
    }

    /// The public-key half, for handing to resource servers
    pub fn verifier(&self) -> &TokenVerifier {
        &self.verifier
    }

    /// Issue an access/refresh pair for a session, timed from now
    pub fn issue_pair(
        &self,
        username: &str,
        audience: &str,
        session_id: &SessionId,
    ) -> Result<TokenPair, AuthError> {
        self.issue_pair_at(username, audience, session_id, Utc::now().timestamp())
    }

    /// Issue an access/refresh pair timed from `now` (unix seconds)
    pub fn issue_pair_at(
        &self,
        username: &str,
        audience: &str,
        session_id: &SessionId,
        now: i64,
    ) -> Result<TokenPair, AuthError> {
        let access = self.claims_for(TokenKind::Access, username, audience, session_id, now);
        let refresh = self.claims_for(TokenKind::Refresh, username, audience, session_id, now);

        Ok(TokenPair {
            access: self.sign(&access)?,
            refresh: self.sign(&refresh)?,
        })
    }

    /// Build the claim set for one half of a pair
    pub fn claims_for(
        &self,
        kind: TokenKind,
        username: &str,
        audience: &str,
        session_id: &SessionId,
        now: i64,
    ) -> SessionClaims {
        let (nbf, exp) = match kind {
            TokenKind::Access => (now, now.saturating_add(self.access_ttl_secs)),
            TokenKind::Refresh => (
                now.saturating_add(self.refresh_grace_secs),
                now.saturating_add(self.refresh_ttl_secs),
            ),
        };

        SessionClaims {
            iss: self.issuer.clone(),
            sub: username.to_string(),
            aud: audience.to_string(),
            jti: session_id.as_str().to_string(),
            iat: now,
            nbf,
            exp,
            is_refresh: kind.is_refresh(),
        }
    }

    /// Verify a token against the current time
    pub fn decode_and_verify(&self, token: &str) -> Result<SessionClaims, TokenError> {
        self.verifier.decode_and_verify(token)
    }

    /// Verify a token against `now` (unix seconds)
    pub fn decode_and_verify_at(&self, token: &str, now: i64) -> Result<SessionClaims, TokenError> {
        self.verifier.decode_and_verify_at(token, now)
    }

    /// Verify a token for logout (ignores `nbf`)
    pub fn decode_for_revocation(&self, token: &str) -> Result<SessionClaims, TokenError> {
        self.verifier.decode_for_revocation(token)
    }

    fn sign(&self, claims: &SessionClaims) -> Result<String, AuthError> {
        encode(&Header::new(Algorithm::RS256), claims, &self.encoding_key).map_err(|e| {
            tracing::error!("Failed to sign token: {}", e);
            AuthError::Internal("Failed to sign token".to_string())
        })
    }
}

impl std::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCodec")
            .field("issuer", &self.issuer)
            .field("access_ttl_secs", &self.access_ttl_secs)
            .field("refresh_ttl_secs", &self.refresh_ttl_secs)
            .field("refresh_grace_secs", &self.refresh_grace_secs)
            .finish_non_exhaustive()
    }
}

fn duration_secs(duration: std::time::Duration) -> i64 {
    i64::try_from(duration.as_secs()).unwrap_or(i64::MAX)
}
