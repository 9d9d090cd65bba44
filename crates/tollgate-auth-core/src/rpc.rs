//! Transport-agnostic RPC surface
//!
//! Requests are JSON objects of the form `{"method": "...", "params": {...}}`.
//! Whatever carries them (HTTP body, websocket frame, queue message) hands the
//! decoded value to [`AuthService::dispatch_json`] and sends back the result.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tollgate_db::SessionRepository;

use crate::{AuthError, AuthService, CredentialVerifier};

/// A decoded RPC call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", content = "params")]
pub enum RpcRequest {
    #[serde(rename = "login")]
    Login {
        username: String,
        password: String,
        #[serde(default)]
        audience: String,
    },
    #[serde(rename = "refresh", rename_all = "camelCase")]
    Refresh {
        #[serde(alias = "token")]
        refresh_token: String,
    },
    #[serde(rename = "logout")]
    Logout { token: String },
    #[serde(rename = "checkAuth")]
    CheckAuth { token: String },
    #[serde(rename = "getIdentity")]
    GetIdentity { token: String },
}

impl RpcRequest {
    /// Wire name of the method
    pub fn method(&self) -> &'static str {
        match self {
            Self::Login { .. } => "login",
            Self::Refresh { .. } => "refresh",
            Self::Logout { .. } => "logout",
            Self::CheckAuth { .. } => "checkAuth",
            Self::GetIdentity { .. } => "getIdentity",
        }
    }
}

/// Error object returned to RPC callers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcError {
    /// Stable error code, e.g. `INVALID_TOKEN`
    pub code: String,
    pub message: String,
    /// Token failure detail for `INVALID_TOKEN`, e.g. `EXPIRED`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl RpcError {
    pub const INVALID_REQUEST: &'static str = "INVALID_REQUEST";

    /// The request could not be decoded into a known method
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self {
            code: Self::INVALID_REQUEST.to_string(),
            message: message.into(),
            reason: None,
        }
    }
}

impl From<AuthError> for RpcError {
    fn from(err: AuthError) -> Self {
        let message = match &err {
            // Backend detail stays in the logs
            AuthError::Internal(_) | AuthError::Configuration(_) => "internal error".to_string(),
            _ => err.to_string(),
        };

        Self {
            code: err.error_code().to_string(),
            message,
            reason: err.token_error().map(|e| e.error_code().to_string()),
        }
    }
}

impl<C: CredentialVerifier, S: SessionRepository> AuthService<C, S> {
    /// Execute a decoded RPC call
    pub async fn dispatch(&self, request: RpcRequest) -> Result<Value, RpcError> {
        tracing::debug!(method = request.method(), "RPC call");

        let value = match request {
            RpcRequest::Login {
                username,
                password,
                audience,
            } => to_value(self.login(&username, &password, &audience).await?)?,
            RpcRequest::Refresh { refresh_token } => to_value(self.refresh(&refresh_token).await?)?,
            RpcRequest::Logout { token } => Value::Bool(self.logout(&token).await?),
            RpcRequest::CheckAuth { token } => Value::Bool(self.check_auth(&token).await?),
            RpcRequest::GetIdentity { token } => to_value(self.get_identity(&token).await?)?,
        };

        Ok(value)
    }

    /// Decode and execute an RPC call from raw JSON
    pub async fn dispatch_json(&self, request: Value) -> Result<Value, RpcError> {
        let request: RpcRequest = serde_json::from_value(request).map_err(|e| {
            tracing::debug!("Rejected RPC request: {}", e);
            RpcError::invalid_request(e.to_string())
        })?;
        self.dispatch(request).await
    }
}

fn to_value<T: Serialize>(value: T) -> Result<Value, RpcError> {
    serde_json::to_value(value).map_err(|e| {
        tracing::error!("Failed to encode RPC result: {}", e);
        RpcError::from(AuthError::Internal(e.to_string()))
    })
}
