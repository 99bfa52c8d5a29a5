use anyhow::{Context, Result};

use crate::config::APP_CONFIG;
use crate::entities::sea_orm_active_enums::RoleEnum;
use crate::repositories::{SettingsRepository, UserRepository};
use crate::services::provisioning::NewLocalUser;

/// What startup should do about the principal account.
#[derive(Debug, PartialEq, Eq)]
enum PrincipalBootstrap {
    AlreadyPresent,
    NotConfigured,
    Create { uid: String, email: String },
}

fn plan_principal(
    principal_exists: bool,
    uid: Option<&str>,
    email: Option<&str>,
) -> PrincipalBootstrap {
    if principal_exists {
        return PrincipalBootstrap::AlreadyPresent;
    }
    match (
        uid.map(str::trim).filter(|v| !v.is_empty()),
        email.map(str::trim).filter(|v| !v.is_empty()),
    ) {
        (Some(uid), Some(email)) => PrincipalBootstrap::Create {
            uid: uid.to_string(),
            email: email.to_lowercase(),
        },
        _ => PrincipalBootstrap::NotConfigured,
    }
}

/// Links the configured identity-provider account as principal when the portal has none.
pub async fn initialize_principal() -> Result<()> {
    let users = UserRepository::new();
    let existing = users
        .find_principal()
        .await
        .context("Failed to check existing principal")?;

    match plan_principal(
        existing.is_some(),
        APP_CONFIG.bootstrap_principal_uid.as_deref(),
        APP_CONFIG.bootstrap_principal_email.as_deref(),
    ) {
        PrincipalBootstrap::AlreadyPresent => {
            tracing::info!("Principal already exists, skipping initialization");
        }
        PrincipalBootstrap::NotConfigured => {
            tracing::warn!(
                "No principal account exists and BOOTSTRAP_PRINCIPAL_UID/BOOTSTRAP_PRINCIPAL_EMAIL are not set"
            );
        }
        PrincipalBootstrap::Create { uid, email } => {
            tracing::info!(email = %email, "Creating bootstrap principal...");
            let principal = users
                .create_with_enrollment(
                    NewLocalUser {
                        firebase_uid: uid,
                        email,
                        name: APP_CONFIG.bootstrap_principal_name.clone(),
                        role: RoleEnum::Principal,
                        department_id: None,
                        phone: None,
                        roll_number: None,
                    },
                    None,
                )
                .await
                .context("Failed to insert bootstrap principal")?;
            tracing::info!(user_id = %principal.user_id, "Bootstrap principal created");
        }
    }

    Ok(())
}

pub async fn initialize_settings() -> Result<()> {
    let settings = SettingsRepository::new()
        .get()
        .await
        .context("Failed to load college settings")?;
    tracing::info!(
        college = %settings.college_name,
        academic_year = %settings.current_academic_year,
        "College settings loaded"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_existing_principal_wins() {
        assert_eq!(
            plan_principal(true, Some("uid-1"), Some("p@uni.edu")),
            PrincipalBootstrap::AlreadyPresent
        );
    }

    #[test]
    fn test_both_uid_and_email_required() {
        assert_eq!(
            plan_principal(false, Some("uid-1"), None),
            PrincipalBootstrap::NotConfigured
        );
        assert_eq!(
            plan_principal(false, Some("  "), Some("p@uni.edu")),
            PrincipalBootstrap::NotConfigured
        );
    }

    #[test]
    fn test_email_is_normalized() {
        assert_eq!(
            plan_principal(false, Some("uid-1"), Some(" Principal@Uni.edu ")),
            PrincipalBootstrap::Create {
                uid: "uid-1".to_string(),
                email: "principal@uni.edu".to_string(),
            }
        );
    }
}
