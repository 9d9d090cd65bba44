//! Auth errors

use thiserror::Error;

/// Cryptographic or structural token failures
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenError {
    /// Not a decodable signed token (bad segments, base64, JSON, missing claims)
    #[error("malformed token")]
    Malformed,

    /// Signature does not verify, or the token was not minted by this issuer
    #[error("invalid signature")]
    SignatureInvalid,

    /// `exp` has passed
    #[error("token expired")]
    Expired,

    /// `nbf` has not been reached yet
    #[error("token not yet valid")]
    NotYetValid,

    /// Access token presented where a refresh token is required, or vice versa
    #[error("wrong token kind")]
    WrongTokenKind,
}

impl TokenError {
    /// Get the detail code for API responses
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Malformed => "MALFORMED",
            Self::SignatureInvalid => "SIGNATURE_INVALID",
            Self::Expired => "EXPIRED",
            Self::NotYetValid => "NOT_YET_VALID",
            Self::WrongTokenKind => "WRONG_TOKEN_KIND",
        }
    }
}

/// Authentication errors
#[derive(Error, Debug)]
pub enum AuthError {
    /// Bad username or password; deliberately undifferentiated
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Token failed cryptographic or structural validation
    #[error("invalid token: {0}")]
    InvalidToken(#[from] TokenError),

    /// Refresh token is well-formed but its session no longer exists
    #[error("invalid refresh token")]
    InvalidRefreshToken,

    /// Credentials changed since the session was created
    #[error("session invalidated")]
    SessionInvalidated,

    /// Token is valid but its session was revoked or swept
    #[error("session not found")]
    SessionNotFound,

    /// Configuration error
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Store or backend failure
    #[error("internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// Get HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidCredentials
            | Self::InvalidToken(_)
            | Self::InvalidRefreshToken
            | Self::SessionInvalidated
            | Self::SessionNotFound => 401,
            Self::Configuration(_) | Self::Internal(_) => 500,
        }
    }

    /// Get error code for API responses
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidCredentials => "INVALID_CREDENTIALS",
            Self::InvalidToken(_) => "INVALID_TOKEN",
            Self::InvalidRefreshToken => "INVALID_REFRESH_TOKEN",
            Self::SessionInvalidated => "SESSION_INVALIDATED",
            Self::SessionNotFound => "SESSION_NOT_FOUND",
            Self::Configuration(_) => "CONFIGURATION_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// The underlying token failure, if this is a token error
    pub fn token_error(&self) -> Option<TokenError> {
        match self {
            Self::InvalidToken(e) => Some(*e),
            _ => None,
        }
    }
}

impl From<tollgate_db::DbError> for AuthError {
    fn from(err: tollgate_db::DbError) -> Self {
        tracing::error!("Database error: {}", err);
        Self::Internal(err.to_string())
    }
}
