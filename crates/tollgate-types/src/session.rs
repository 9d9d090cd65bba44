//! Session and token types

use serde::{Deserialize, Serialize};

/// Opaque session identifier
///
/// Minted only by the session store. Carried in the `jti` claim of both
/// tokens of a pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Wrap an already-generated identifier
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Borrow the identifier as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for SessionId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl AsRef<str> for SessionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Which half of a token pair a token is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    /// Short-lived token presented to resource servers
    Access,
    /// Long-lived token exchanged for a new pair
    Refresh,
}

impl TokenKind {
    /// Value of the `ref` claim for this kind
    pub const fn is_refresh(&self) -> bool {
        matches!(self, Self::Refresh)
    }

    pub const fn from_refresh_flag(is_refresh: bool) -> Self {
        if is_refresh {
            Self::Refresh
        } else {
            Self::Access
        }
    }
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Access => write!(f, "access"),
            Self::Refresh => write!(f, "refresh"),
        }
    }
}

/// Access/refresh token pair backed by a single session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    /// Access token (short-lived)
    pub access: String,
    /// Refresh token (long-lived, not valid before its grace window ends)
    pub refresh: String,
}
