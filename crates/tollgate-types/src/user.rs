//! User-facing response types

use serde::{Deserialize, Serialize};

use crate::TokenPair;

/// Public user information returned on login
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    pub username: String,
}

/// Result of a successful login
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginResponse {
    pub access: String,
    pub refresh: String,
    pub user: UserInfo,
}

impl LoginResponse {
    /// Build a login response from a freshly issued pair
    pub fn new(pair: TokenPair, username: impl Into<String>) -> Self {
        Self {
            access: pair.access,
            refresh: pair.refresh,
            user: UserInfo {
                username: username.into(),
            },
        }
    }

    /// Split back into the token pair
    pub fn tokens(&self) -> TokenPair {
        TokenPair {
            access: self.access.clone(),
            refresh: self.refresh.clone(),
        }
    }
}

/// Identity bound to a live access token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub username: String,
}
