//! Identity-provider calls that follow a committed local change. The local record is
//! authoritative, so a failure here is logged and otherwise ignored.

use crate::identity::IdentityProvider;

pub async fn sync_display_name(identity: &dyn IdentityProvider, uid: &str, display_name: &str) -> bool {
    match identity.update_display_name(uid, display_name).await {
        Ok(()) => true,
        Err(err) => {
            tracing::warn!(uid = %uid, "Failed to sync display name to identity provider: {}", err);
            false
        }
    }
}

pub async fn remove_account(identity: &dyn IdentityProvider, uid: &str) -> bool {
    match identity.delete_account(uid).await {
        Ok(()) => {
            tracing::info!(uid = %uid, "Deleted identity provider account");
            true
        }
        Err(err) => {
            tracing::warn!(uid = %uid, "Failed to delete identity provider account: {}", err);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::{IdentityError, NewAccount, VerifiedIdentity};
    use async_trait::async_trait;

    struct UnreachableIdentity;

    #[async_trait]
    impl IdentityProvider for UnreachableIdentity {
        async fn verify_token(&self, _token: &str) -> Result<VerifiedIdentity, IdentityError> {
            Err(IdentityError::Request("connection refused".into()))
        }

        async fn create_account(&self, _account: &NewAccount) -> Result<String, IdentityError> {
            Err(IdentityError::Request("connection refused".into()))
        }

        async fn delete_account(&self, _uid: &str) -> Result<(), IdentityError> {
            Err(IdentityError::Request("connection refused".into()))
        }

        async fn update_display_name(&self, _uid: &str, _name: &str) -> Result<(), IdentityError> {
            Err(IdentityError::Request("connection refused".into()))
        }
    }

    #[tokio::test]
    async fn test_failures_are_swallowed() {
        let identity = UnreachableIdentity;
        assert!(!sync_display_name(&identity, "uid-1", "New Name").await);
        assert!(!remove_account(&identity, "uid-1").await);
    }
}
