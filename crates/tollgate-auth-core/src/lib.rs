//! Tollgate Auth Core - Authentication business logic
//!
//! Dual-token session authentication: username/password login issues a
//! short-lived access token and a longer-lived refresh token, both RS256 JWTs
//! bound to a server-side session record. Refreshing rotates the pair and
//! revokes the old session; a credential change since login invalidates it.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tollgate_auth_core::{AuthConfig, AuthService, CredentialHasher, InMemoryCredentials};
//! use tollgate_db::MemorySessionRepository;
//!
//! let config = AuthConfig::from_env()?;
//! let credentials = Arc::new(InMemoryCredentials::in_memory(CredentialHasher::new())?);
//! credentials.set_password("alice", "pw1").await?;
//!
//! let auth = AuthService::new(config, credentials, Arc::new(MemorySessionRepository::new()))?;
//! let login = auth.login("alice", "pw1", "svcA").await?;
//! assert!(auth.check_auth(&login.access).await?);
//! ```

pub mod config;
pub mod credentials;
pub mod crypto;
pub mod error;
pub mod rpc;
pub mod service;
pub mod session;
pub mod token;

pub use config::{AuthConfig, ConfigSource, EnvConfig};
pub use credentials::{
    CredentialChain, CredentialError, CredentialVerifier, Fingerprint, InMemoryCredentials,
    RepositoryCredentials,
};
pub use crypto::CredentialHasher;
pub use error::{AuthError, TokenError};
pub use rpc::{RpcError, RpcRequest};
pub use service::AuthService;
pub use session::{SessionIdGenerator, SessionRecord, SessionStore};
pub use token::{SessionClaims, TokenCodec, TokenVerifier};
