//! Common test utilities for tollgate-auth-core integration tests

pub mod failing;
pub mod keys;

use std::sync::Arc;
use std::time::Duration;
use tollgate_auth_core::{AuthConfig, AuthService, CredentialHasher, InMemoryCredentials};
use tollgate_db::MemorySessionRepository;

#[allow(unused_imports)]
pub use failing::{FailingSessionRepository, FailingUserRepository, FlakyCredentials};
#[allow(unused_imports)]
pub use keys::{TestKeyPair, ISSUER};

pub type MemoryService = AuthService<InMemoryCredentials, MemorySessionRepository>;

/// Cheap argon2 parameters so tests don't spend seconds hashing
pub fn fast_hasher() -> CredentialHasher {
    CredentialHasher::with_cost(8, 1).unwrap()
}

/// Config signed with the fixture key, with the given refresh grace
pub fn test_config(grace: Duration) -> AuthConfig {
    let keys = TestKeyPair::signing();
    AuthConfig::new(ISSUER, "default-svc", keys.private_pem, keys.public_pem)
        .with_refresh_grace(grace)
}

/// In-memory credentials with alice/pw1 and bob/hunter2
pub async fn test_credentials() -> Arc<InMemoryCredentials> {
    let creds = Arc::new(InMemoryCredentials::in_memory(fast_hasher()).unwrap());
    creds.set_password("alice", "pw1").await.unwrap();
    creds.set_password("bob", "hunter2").await.unwrap();
    creds
}

/// Service over in-memory backends
#[allow(dead_code)]
pub async fn memory_service(
    grace: Duration,
) -> (MemoryService, Arc<InMemoryCredentials>, Arc<MemorySessionRepository>) {
    let creds = test_credentials().await;
    let sessions = Arc::new(MemorySessionRepository::new());
    let service = AuthService::new(test_config(grace), creds.clone(), sessions.clone()).unwrap();
    (service, creds, sessions)
}
