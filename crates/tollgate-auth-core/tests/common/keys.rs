//! Fixture RSA key pairs and token forging helpers

use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use tollgate_auth_core::SessionClaims;

pub const ISSUER: &str = "auth";

/// PEM-encoded RSA key pair
#[derive(Debug, Clone, Copy)]
pub struct TestKeyPair {
    pub private_pem: &'static str,
    pub public_pem: &'static str,
}

impl TestKeyPair {
    /// The key the test services sign with
    pub fn signing() -> Self {
        Self {
            private_pem: include_str!("../fixtures/signing.pem"),
            public_pem: include_str!("../fixtures/signing.pub.pem"),
        }
    }

    /// An unrelated key pair, for forgeries
    #[allow(dead_code)]
    pub fn other() -> Self {
        Self {
            private_pem: include_str!("../fixtures/other.pem"),
            public_pem: include_str!("../fixtures/other.pub.pem"),
        }
    }

    /// Sign arbitrary claims with this key
    #[allow(dead_code)]
    pub fn sign(&self, claims: &SessionClaims) -> String {
        let key = EncodingKey::from_rsa_pem(self.private_pem.as_bytes()).unwrap();
        encode(&Header::new(Algorithm::RS256), claims, &key).unwrap()
    }
}
