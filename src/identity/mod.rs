//! External identity provider: token verification and account management.
//!
//! The provider owns credentials. The application only keeps the provider's stable
//! subject identifier (`firebase_uid`) on its local user record.

pub mod firebase;

use async_trait::async_trait;
use thiserror::Error;

pub use firebase::FirebaseIdentityProvider;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedIdentity {
    pub uid: String,
    pub email: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewAccount {
    pub email: String,
    pub password: String,
    pub display_name: String,
}

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("Missing authentication token")]
    MissingToken,

    #[error("Invalid or expired token: {0}")]
    InvalidToken(String),

    #[error("email already registered: {0}")]
    EmailExists(String),

    #[error("account not found: {0}")]
    AccountNotFound(String),

    #[error("account management is not configured")]
    NotConfigured,

    #[error("request to identity provider failed: {0}")]
    Request(String),
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Verifies signature, expiry, audience and issuer; returns the token subject.
    async fn verify_token(&self, token: &str) -> Result<VerifiedIdentity, IdentityError>;

    /// Creates an account and returns its uid.
    async fn create_account(&self, account: &NewAccount) -> Result<String, IdentityError>;

    async fn delete_account(&self, uid: &str) -> Result<(), IdentityError>;

    async fn update_display_name(&self, uid: &str, display_name: &str)
    -> Result<(), IdentityError>;
}
