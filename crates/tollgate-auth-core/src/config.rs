//! Configuration types for auth service

use std::collections::HashMap;
use std::time::Duration;

use crate::AuthError;

/// Configuration keys understood by [`AuthConfig::from_source`]
pub mod keys {
    pub const SERVICE_NAME: &str = "service_name";
    pub const AUDIENCE_DEFAULT: &str = "audience_default";
    pub const SIGNING_PRIVATE_KEY: &str = "signing_private_key";
    pub const SIGNING_PRIVATE_KEY_PATH: &str = "signing_private_key_path";
    pub const SIGNING_PUBLIC_KEY: &str = "signing_public_key";
    pub const SIGNING_PUBLIC_KEY_PATH: &str = "signing_public_key_path";
    pub const ACCESS_TTL_SECS: &str = "access_ttl_secs";
    pub const REFRESH_TTL_SECS: &str = "refresh_ttl_secs";
    pub const REFRESH_GRACE_SECS: &str = "refresh_grace_secs";
}

/// Read-only key lookup supplied by the host
pub trait ConfigSource: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
}

impl ConfigSource for HashMap<String, String> {
    fn get(&self, key: &str) -> Option<String> {
        HashMap::get(self, key).cloned()
    }
}

/// Environment-backed configuration
///
/// `service_name` is read from `TOLLGATE_SERVICE_NAME` and so on. A `.env`
/// file in the working directory is loaded first if present.
#[derive(Debug, Clone)]
pub struct EnvConfig {
    prefix: String,
}

impl EnvConfig {
    pub const DEFAULT_PREFIX: &'static str = "TOLLGATE_";

    pub fn new() -> Self {
        Self::with_prefix(Self::DEFAULT_PREFIX)
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        dotenvy::dotenv().ok();
        Self {
            prefix: prefix.into(),
        }
    }

    fn var_name(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key.to_ascii_uppercase())
    }
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigSource for EnvConfig {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(self.var_name(key)).ok()
    }
}

/// Auth service configuration
#[derive(Clone)]
pub struct AuthConfig {
    /// Issuer name written to `iss`
    pub service_name: String,
    /// Audience used when a login does not name one
    pub audience_default: String,
    /// PEM-encoded RSA private key (signing)
    pub signing_private_key: String,
    /// PEM-encoded RSA public key (verification)
    pub signing_public_key: String,
    /// Access token lifetime
    pub access_ttl: Duration,
    /// Refresh token lifetime
    pub refresh_ttl: Duration,
    /// Delay before a refresh token becomes usable
    pub refresh_grace: Duration,
}

impl AuthConfig {
    pub const DEFAULT_SERVICE_NAME: &'static str = "auth";

    /// Create a new auth config with default lifetimes
    pub fn new(
        service_name: impl Into<String>,
        audience_default: impl Into<String>,
        signing_private_key: impl Into<String>,
        signing_public_key: impl Into<String>,
    ) -> Self {
        Self {
            service_name: service_name.into(),
            audience_default: audience_default.into(),
            signing_private_key: signing_private_key.into(),
            signing_public_key: signing_public_key.into(),
            access_ttl: Duration::from_secs(5 * 60),       // 5 minutes
            refresh_ttl: Duration::from_secs(24 * 60 * 60), // 24 hours
            refresh_grace: Duration::from_secs(10 * 60),   // 10 minutes
        }
    }

    /// Build from a key/value source
    ///
    /// Key material may be given inline or as a path to a PEM file. A value
    /// of `"default"` or an empty value counts as unset.
    pub fn from_source(source: &dyn ConfigSource) -> Result<Self, AuthError> {
        let lookup = |key: &str| {
            source
                .get(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty() && v != "default")
        };

        let service_name =
            lookup(keys::SERVICE_NAME).unwrap_or_else(|| Self::DEFAULT_SERVICE_NAME.to_string());
        let audience_default = lookup(keys::AUDIENCE_DEFAULT).unwrap_or_default();

        let signing_private_key = load_pem(
            source.get(keys::SIGNING_PRIVATE_KEY),
            lookup(keys::SIGNING_PRIVATE_KEY_PATH),
            keys::SIGNING_PRIVATE_KEY,
        )?;
        let signing_public_key = load_pem(
            source.get(keys::SIGNING_PUBLIC_KEY),
            lookup(keys::SIGNING_PUBLIC_KEY_PATH),
            keys::SIGNING_PUBLIC_KEY,
        )?;

        let mut config = Self::new(
            service_name,
            audience_default,
            signing_private_key,
            signing_public_key,
        );

        if let Some(secs) = parse_secs(lookup(keys::ACCESS_TTL_SECS), keys::ACCESS_TTL_SECS)? {
            config = config.with_access_ttl(secs);
        }
        if let Some(secs) = parse_secs(lookup(keys::REFRESH_TTL_SECS), keys::REFRESH_TTL_SECS)? {
            config = config.with_refresh_ttl(secs);
        }
        if let Some(secs) = parse_secs(lookup(keys::REFRESH_GRACE_SECS), keys::REFRESH_GRACE_SECS)?
        {
            config = config.with_refresh_grace(secs);
        }

        config.validate()?;

        tracing::debug!(
            service_name = %config.service_name,
            audience_default = %config.audience_default,
            "Loaded auth configuration"
        );

        Ok(config)
    }

    /// Load configuration from `TOLLGATE_*` environment variables
    pub fn from_env() -> Result<Self, AuthError> {
        Self::from_source(&EnvConfig::new())
    }

    /// Set access token lifetime
    pub fn with_access_ttl(mut self, ttl: Duration) -> Self {
        self.access_ttl = ttl;
        self
    }

    /// Set refresh token lifetime
    pub fn with_refresh_ttl(mut self, ttl: Duration) -> Self {
        self.refresh_ttl = ttl;
        self
    }

    /// Set the refresh grace window
    pub fn with_refresh_grace(mut self, grace: Duration) -> Self {
        self.refresh_grace = grace;
        self
    }

    /// Check that the lifetimes can produce usable tokens
    ///
    /// A refresh token only becomes valid once the grace window has passed,
    /// so the grace must end before the refresh token expires.
    pub fn validate(&self) -> Result<(), AuthError> {
        if self.access_ttl.is_zero() || self.refresh_ttl.is_zero() {
            return Err(AuthError::Configuration(
                "token lifetimes must be non-zero".to_string(),
            ));
        }
        if self.refresh_grace >= self.refresh_ttl {
            return Err(AuthError::Configuration(format!(
                "{} must be shorter than {}",
                keys::REFRESH_GRACE_SECS,
                keys::REFRESH_TTL_SECS
            )));
        }
        Ok(())
    }

    /// Audience to use for a login request
    pub fn resolve_audience<'a>(&'a self, requested: &'a str) -> &'a str {
        if requested.trim().is_empty() {
            &self.audience_default
        } else {
            requested
        }
    }
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("service_name", &self.service_name)
            .field("audience_default", &self.audience_default)
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .field("refresh_grace", &self.refresh_grace)
            .finish_non_exhaustive()
    }
}

fn load_pem(
    inline: Option<String>,
    path: Option<String>,
    key: &'static str,
) -> Result<String, AuthError> {
    if let Some(pem) = inline.filter(|v| !v.trim().is_empty()) {
        return Ok(pem);
    }

    let path = path.ok_or_else(|| AuthError::Configuration(format!("missing {key}")))?;
    std::fs::read_to_string(&path).map_err(|e| {
        tracing::error!("Failed to read {} from {}: {}", key, path, e);
        AuthError::Configuration(format!("failed to read {key} from {path}"))
    })
}

fn parse_secs(value: Option<String>, key: &'static str) -> Result<Option<Duration>, AuthError> {
    value
        .map(|v| {
            v.parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|_| AuthError::Configuration(format!("invalid value for {key}")))
        })
        .transpose()
}
