//! Credential verification backends
//!
//! The auth service never reads user records directly. It asks a
//! [`CredentialVerifier`] two questions: do these credentials check out, and
//! what is this user's current credential fingerprint. A fingerprint changes
//! whenever the user's stored credential material changes, which is how a
//! password change invalidates outstanding refresh tokens.

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tollgate_db::{MemoryUserRepository, UpsertUser, UserRepository};

use crate::crypto::{constant_time_str_eq, hash_token, CredentialHasher};
use crate::AuthError;

/// Opaque credential-version marker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Derive a fingerprint from stored credential material
    pub fn of_material(material: &str) -> Self {
        Self(hash_token(material))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Constant-time equality
    pub fn matches(&self, other: &Fingerprint) -> bool {
        constant_time_str_eq(&self.0, &other.0)
    }
}

/// Credential backend failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CredentialError {
    /// Unknown user or wrong password
    #[error("credentials rejected")]
    Rejected,

    /// The backend could not be consulted
    #[error("credential backend unavailable: {0}")]
    Unavailable(String),
}

/// Capability for checking passwords and reading credential versions
#[async_trait]
pub trait CredentialVerifier: Send + Sync {
    /// Check a username/password pair, returning the current fingerprint
    async fn verify(&self, username: &str, password: &str) -> Result<Fingerprint, CredentialError>;

    /// Current fingerprint for `username`, `None` if the user is unknown
    async fn current_fingerprint(
        &self,
        username: &str,
    ) -> Result<Option<Fingerprint>, CredentialError>;
}

/// Credentials stored as argon2 password hashes in a [`UserRepository`]
///
/// The fingerprint is the SHA-256 of the stored PHC string, so every password
/// change (which re-salts) yields a new fingerprint.
pub struct RepositoryCredentials<U: UserRepository> {
    repo: Arc<U>,
    hasher: CredentialHasher,
    /// Verified against for unknown users so lookups cost the same either way
    dummy_hash: String,
}

/// Process-local credential backend
pub type InMemoryCredentials = RepositoryCredentials<MemoryUserRepository>;

impl<U: UserRepository> RepositoryCredentials<U> {
    /// Create a backend over `repo`
    pub fn new(repo: Arc<U>, hasher: CredentialHasher) -> Result<Self, AuthError> {
        let dummy_hash = hasher.hash("tollgate-dummy-password")?;
        Ok(Self {
            repo,
            hasher,
            dummy_hash,
        })
    }

    /// Underlying repository
    pub fn repository(&self) -> &Arc<U> {
        &self.repo
    }

    /// Create a user or replace their password, returning the new fingerprint
    pub async fn set_password(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Fingerprint, AuthError> {
        let password_hash = self.hasher.hash(password)?;
        let row = self
            .repo
            .upsert(UpsertUser {
                username: username.to_string(),
                password_hash,
            })
            .await?;

        tracing::debug!(username, "Stored credentials");
        Ok(Fingerprint::of_material(&row.password_hash))
    }

    /// Remove a user, returning whether one existed
    pub async fn remove_user(&self, username: &str) -> Result<bool, AuthError> {
        Ok(self.repo.delete(username).await?)
    }
}

impl InMemoryCredentials {
    /// Backend over a fresh in-memory user table
    pub fn in_memory(hasher: CredentialHasher) -> Result<Self, AuthError> {
        Self::new(Arc::new(MemoryUserRepository::new()), hasher)
    }
}

#[async_trait]
impl<U: UserRepository> CredentialVerifier for RepositoryCredentials<U> {
    async fn verify(&self, username: &str, password: &str) -> Result<Fingerprint, CredentialError> {
        let user = self.repo.find_by_username(username).await.map_err(|e| {
            tracing::error!("Failed to load user credentials: {}", e);
            CredentialError::Unavailable(e.to_string())
        })?;

        match user {
            Some(row) if self.hasher.verify(password, &row.password_hash) => {
                Ok(Fingerprint::of_material(&row.password_hash))
            }
            Some(_) => Err(CredentialError::Rejected),
            None => {
                let _ = self.hasher.verify(password, &self.dummy_hash);
                Err(CredentialError::Rejected)
            }
        }
    }

    async fn current_fingerprint(
        &self,
        username: &str,
    ) -> Result<Option<Fingerprint>, CredentialError> {
        let user = self.repo.find_by_username(username).await.map_err(|e| {
            tracing::error!("Failed to load user credentials: {}", e);
            CredentialError::Unavailable(e.to_string())
        })?;

        Ok(user.map(|row| Fingerprint::of_material(&row.password_hash)))
    }
}

impl<U: UserRepository> std::fmt::Debug for RepositoryCredentials<U> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RepositoryCredentials")
            .field("hasher", &self.hasher)
            .finish_non_exhaustive()
    }
}

/// Ordered list of credential backends
///
/// A user belongs to the first backend that knows their username. Both
/// `verify` and `current_fingerprint` are answered by that backend alone, so
/// the fingerprint a session is created with is the one refresh compares
/// against. Backends further down the chain are shadowed for that user.
/// Either call stops at the first backend failure.
#[derive(Clone, Default)]
pub struct CredentialChain {
    backends: Vec<Arc<dyn CredentialVerifier>>,
}

impl CredentialChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a backend (consulted after those already present)
    pub fn with(mut self, backend: Arc<dyn CredentialVerifier>) -> Self {
        self.backends.push(backend);
        self
    }

    pub fn push(&mut self, backend: Arc<dyn CredentialVerifier>) {
        self.backends.push(backend);
    }

    pub fn len(&self) -> usize {
        self.backends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }
}

#[async_trait]
impl CredentialVerifier for CredentialChain {
    async fn verify(&self, username: &str, password: &str) -> Result<Fingerprint, CredentialError> {
        match self.owner_of(username).await? {
            Some(backend) => backend.verify(username, password).await,
            None => {
                // Unknown everywhere; still pay for one hash check
                if let Some(first) = self.backends.first() {
                    let _ = first.verify(username, password).await;
                }
                Err(CredentialError::Rejected)
            }
        }
    }

    async fn current_fingerprint(
        &self,
        username: &str,
    ) -> Result<Option<Fingerprint>, CredentialError> {
        for backend in &self.backends {
            if let Some(fingerprint) = backend.current_fingerprint(username).await? {
                return Ok(Some(fingerprint));
            }
        }
        Ok(None)
    }
}

impl CredentialChain {
    /// First backend that knows `username`
    async fn owner_of(
        &self,
        username: &str,
    ) -> Result<Option<&Arc<dyn CredentialVerifier>>, CredentialError> {
        for (index, backend) in self.backends.iter().enumerate() {
            match backend.current_fingerprint(username).await {
                Ok(Some(_)) => return Ok(Some(backend)),
                Ok(None) => continue,
                Err(e) => {
                    tracing::warn!(backend = index, "Credential backend unavailable: {}", e);
                    return Err(e);
                }
            }
        }
        Ok(None)
    }
}

impl std::fmt::Debug for CredentialChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialChain")
            .field("backends", &self.backends.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_hasher() -> CredentialHasher {
        CredentialHasher::with_cost(8, 1).unwrap()
    }

    /// Backend that is always down
    struct DownBackend;

    #[async_trait]
    impl CredentialVerifier for DownBackend {
        async fn verify(&self, _: &str, _: &str) -> Result<Fingerprint, CredentialError> {
            Err(CredentialError::Unavailable("connection refused".to_string()))
        }

        async fn current_fingerprint(
            &self,
            _: &str,
        ) -> Result<Option<Fingerprint>, CredentialError> {
            Err(CredentialError::Unavailable("connection refused".to_string()))
        }
    }

    #[test]
    fn test_fingerprint_matches() {
        let a = Fingerprint::of_material("$argon2id$v=19$m=8,t=1,p=1$salt$hash");
        let b = Fingerprint::of_material("$argon2id$v=19$m=8,t=1,p=1$salt$hash");
        let c = Fingerprint::of_material("$argon2id$v=19$m=8,t=1,p=1$other$hash");
        assert!(a.matches(&b));
        assert!(!a.matches(&c));
        assert_eq!(a.as_str().len(), 64);
    }

    #[tokio::test]
    async fn test_repository_credentials_verify() {
        let creds = InMemoryCredentials::in_memory(fast_hasher()).unwrap();
        let stored = creds.set_password("alice", "pw1").await.unwrap();

        assert_eq!(creds.verify("alice", "pw1").await.unwrap(), stored);
        assert_eq!(
            creds.verify("alice", "wrong").await.unwrap_err(),
            CredentialError::Rejected
        );
        assert_eq!(
            creds.verify("nobody", "pw1").await.unwrap_err(),
            CredentialError::Rejected
        );
    }

    #[tokio::test]
    async fn test_password_change_changes_fingerprint() {
        let creds = InMemoryCredentials::in_memory(fast_hasher()).unwrap();
        let v1 = creds.set_password("alice", "pw1").await.unwrap();
        // Same password, new salt, new fingerprint
        let v2 = creds.set_password("alice", "pw1").await.unwrap();

        assert!(!v1.matches(&v2));
        assert_eq!(creds.current_fingerprint("alice").await.unwrap(), Some(v2));

        assert!(creds.remove_user("alice").await.unwrap());
        assert_eq!(creds.current_fingerprint("alice").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_chain_first_backend_knowing_user_decides() {
        let first = Arc::new(InMemoryCredentials::in_memory(fast_hasher()).unwrap());
        let second = Arc::new(InMemoryCredentials::in_memory(fast_hasher()).unwrap());
        let fp_first = first.set_password("alice", "pw1").await.unwrap();
        second.set_password("alice", "pw2").await.unwrap();
        let fp_bob = second.set_password("bob", "pw3").await.unwrap();

        let chain = CredentialChain::new().with(first).with(second);
        assert_eq!(chain.len(), 2);

        assert_eq!(chain.verify("alice", "pw1").await.unwrap(), fp_first);
        // The second backend's alice is shadowed by the first
        assert_eq!(
            chain.verify("alice", "pw2").await.unwrap_err(),
            CredentialError::Rejected
        );
        assert_eq!(chain.verify("bob", "pw3").await.unwrap(), fp_bob);

        // Login and refresh see the same fingerprint for every user
        assert_eq!(chain.current_fingerprint("alice").await.unwrap(), Some(fp_first));
        assert_eq!(chain.current_fingerprint("bob").await.unwrap(), Some(fp_bob));
    }

    #[tokio::test]
    async fn test_chain_stops_at_unavailable_backend() {
        let creds = Arc::new(InMemoryCredentials::in_memory(fast_hasher()).unwrap());
        let fp_alice = creds.set_password("alice", "pw1").await.unwrap();

        // Alice is resolved before the chain reaches the broken backend
        let chain = CredentialChain::new()
            .with(creds.clone())
            .with(Arc::new(DownBackend));
        assert_eq!(chain.verify("alice", "pw1").await.unwrap(), fp_alice);
        assert!(matches!(
            chain.verify("mallory", "pw1").await,
            Err(CredentialError::Unavailable(_))
        ));

        let chain = CredentialChain::new()
            .with(Arc::new(DownBackend))
            .with(creds.clone());
        assert!(matches!(
            chain.verify("alice", "pw1").await,
            Err(CredentialError::Unavailable(_))
        ));

        let chain = CredentialChain::new().with(creds);
        assert_eq!(
            chain.verify("alice", "nope").await.unwrap_err(),
            CredentialError::Rejected
        );
        assert_eq!(
            chain.verify("mallory", "pw1").await.unwrap_err(),
            CredentialError::Rejected
        );
        assert_eq!(
            CredentialChain::new().verify("alice", "pw1").await.unwrap_err(),
            CredentialError::Rejected
        );
    }

    #[tokio::test]
    async fn test_chain_fingerprint_lookup() {
        let first = Arc::new(InMemoryCredentials::in_memory(fast_hasher()).unwrap());
        let second = Arc::new(InMemoryCredentials::in_memory(fast_hasher()).unwrap());
        let fp_bob = second.set_password("bob", "pw").await.unwrap();

        let chain = CredentialChain::new().with(first.clone()).with(second);
        assert_eq!(chain.current_fingerprint("bob").await.unwrap(), Some(fp_bob));
        assert_eq!(chain.current_fingerprint("carol").await.unwrap(), None);

        // A failing backend stops the lookup rather than being skipped
        let chain = CredentialChain::new().with(first).with(Arc::new(DownBackend));
        assert!(matches!(
            chain.current_fingerprint("bob").await,
            Err(CredentialError::Unavailable(_))
        ));
    }
}
