use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;
use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, decode_header, encode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::{Mutex, RwLock};

use super::{IdentityError, IdentityProvider, NewAccount, VerifiedIdentity};
use crate::config::{
    FIREBASE_ISSUER_PREFIX, FIREBASE_JWKS_URL, IDENTITY_TOOLKIT_SCOPE, IDENTITY_TOOLKIT_URL,
    JWKS_DEFAULT_TTL_SECONDS, JWKS_MIN_REFRESH_SECONDS,
};

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

#[derive(Debug, Deserialize)]
struct FirebaseClaims {
    sub: String,
    email: Option<String>,
}

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct AccessTokenResponse {
    access_token: String,
    expires_in: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateAccountResponse {
    local_id: String,
}

#[derive(Debug, Deserialize)]
struct GoogleErrorEnvelope {
    error: GoogleError,
}

#[derive(Debug, Deserialize)]
struct GoogleError {
    message: String,
}

struct CachedKeys {
    keys: JwkSet,
    expires_at: Instant,
}

struct CachedAccessToken {
    token: String,
    expires_at: Instant,
}

/// Firebase Authentication: ID token verification against Google's published keys and
/// account management through the Identity Toolkit REST API.
pub struct FirebaseIdentityProvider {
    project_id: String,
    http: reqwest::Client,
    service_account: Option<ServiceAccountKey>,
    keys: RwLock<Option<CachedKeys>>,
    last_forced_refresh: Mutex<Option<Instant>>,
    access_token: Mutex<Option<CachedAccessToken>>,
}

impl FirebaseIdentityProvider {
    pub fn new(project_id: String, service_account: Option<ServiceAccountKey>) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            project_id,
            http,
            service_account,
            keys: RwLock::new(None),
            last_forced_refresh: Mutex::new(None),
            access_token: Mutex::new(None),
        })
    }

    /// Reads the service-account JSON when a path is configured.
    pub fn from_config(project_id: &str, service_account_path: Option<&str>) -> anyhow::Result<Self> {
        let service_account = match service_account_path {
            Some(path) => {
                let raw = std::fs::read_to_string(path)?;
                Some(serde_json::from_str::<ServiceAccountKey>(&raw)?)
            }
            None => {
                tracing::warn!(
                    "FIREBASE_SERVICE_ACCOUNT_PATH not set, account management calls will fail"
                );
                None
            }
        };
        Self::new(project_id.to_string(), service_account)
    }

    async fn signing_keys(&self, force_refresh: bool) -> Result<JwkSet, IdentityError> {
        if !force_refresh {
            let cached = self.keys.read().await;
            if let Some(cached) = cached.as_ref() {
                if cached.expires_at > Instant::now() {
                    return Ok(cached.keys.clone());
                }
            }
        }

        let response = self
            .http
            .get(FIREBASE_JWKS_URL)
            .send()
            .await
            .map_err(|e| IdentityError::Request(e.to_string()))?;

        let ttl = response
            .headers()
            .get(reqwest::header::CACHE_CONTROL)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_max_age)
            .unwrap_or(JWKS_DEFAULT_TTL_SECONDS);

        let keys = response
            .error_for_status()
            .map_err(|e| IdentityError::Request(e.to_string()))?
            .json::<JwkSet>()
            .await
            .map_err(|e| IdentityError::Request(e.to_string()))?;

        tracing::debug!(keys = keys.keys.len(), ttl, "Refreshed identity provider signing keys");

        *self.keys.write().await = Some(CachedKeys {
            keys: keys.clone(),
            expires_at: Instant::now() + Duration::from_secs(ttl),
        });

        Ok(keys)
    }

    /// Reserves the single out-of-band key refresh allowed per interval.
    async fn claim_forced_refresh(&self) -> bool {
        let mut last = self.last_forced_refresh.lock().await;
        let now = Instant::now();
        if !forced_refresh_due(*last, now) {
            return false;
        }
        *last = Some(now);
        true
    }

    async fn admin_access_token(&self) -> Result<String, IdentityError> {
        let account = self
            .service_account
            .as_ref()
            .ok_or(IdentityError::NotConfigured)?;

        let mut cached = self.access_token.lock().await;
        if let Some(token) = cached.as_ref() {
            if token.expires_at > Instant::now() {
                return Ok(token.token.clone());
            }
        }

        let now = Utc::now().timestamp();
        let claims = AssertionClaims {
            iss: &account.client_email,
            scope: IDENTITY_TOOLKIT_SCOPE,
            aud: &account.token_uri,
            iat: now,
            exp: now + 3600,
        };
        let key = EncodingKey::from_rsa_pem(account.private_key.as_bytes())
            .map_err(|e| IdentityError::Request(format!("invalid service account key: {}", e)))?;
        let assertion = encode(&Header::new(Algorithm::RS256), &claims, &key)
            .map_err(|e| IdentityError::Request(e.to_string()))?;

        let response = self
            .http
            .post(&account.token_uri)
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", assertion.as_str()),
            ])
            .send()
            .await
            .map_err(|e| IdentityError::Request(e.to_string()))?
            .error_for_status()
            .map_err(|e| IdentityError::Request(e.to_string()))?
            .json::<AccessTokenResponse>()
            .await
            .map_err(|e| IdentityError::Request(e.to_string()))?;

        // refresh a minute early
        let lifetime = response.expires_in.saturating_sub(60);
        *cached = Some(CachedAccessToken {
            token: response.access_token.clone(),
            expires_at: Instant::now() + Duration::from_secs(lifetime),
        });

        Ok(response.access_token)
    }

    async fn admin_post<R: DeserializeOwned>(
        &self,
        path: &str,
        body: serde_json::Value,
    ) -> Result<R, IdentityError> {
        let token = self.admin_access_token().await?;
        let url = format!("{}/projects/{}/{}", IDENTITY_TOOLKIT_URL, self.project_id, path);

        let response = self
            .http
            .post(url)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .map_err(|e| IdentityError::Request(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let message = response
                .json::<GoogleErrorEnvelope>()
                .await
                .map(|envelope| envelope.error.message)
                .unwrap_or_else(|_| status.to_string());
            return Err(classify_admin_error(&message, &body));
        }

        response
            .json::<R>()
            .await
            .map_err(|e| IdentityError::Request(e.to_string()))
    }
}

#[async_trait]
impl IdentityProvider for FirebaseIdentityProvider {
    async fn verify_token(&self, token: &str) -> Result<VerifiedIdentity, IdentityError> {
        let header = decode_header(token).map_err(|e| IdentityError::InvalidToken(e.to_string()))?;
        if header.alg != Algorithm::RS256 {
            return Err(IdentityError::InvalidToken(format!(
                "unexpected algorithm {:?}",
                header.alg
            )));
        }
        let kid = header
            .kid
            .ok_or_else(|| IdentityError::InvalidToken("missing key id".to_string()))?;

        let mut keys = self.signing_keys(false).await?;
        if keys.find(&kid).is_none() && self.claim_forced_refresh().await {
            // keys rotate; try once more with a fresh set
            keys = self.signing_keys(true).await?;
        }
        let jwk = keys
            .find(&kid)
            .ok_or_else(|| IdentityError::InvalidToken("unknown key id".to_string()))?;
        let key = DecodingKey::from_jwk(jwk).map_err(|e| IdentityError::InvalidToken(e.to_string()))?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[&self.project_id]);
        validation.set_issuer(&[format!("{}{}", FIREBASE_ISSUER_PREFIX, self.project_id)]);
        validation.set_required_spec_claims(&["exp", "sub", "aud", "iss"]);

        let data = decode::<FirebaseClaims>(token, &key, &validation)
            .map_err(|e| IdentityError::InvalidToken(e.to_string()))?;

        if data.claims.sub.is_empty() {
            return Err(IdentityError::InvalidToken("empty subject".to_string()));
        }

        Ok(VerifiedIdentity {
            uid: data.claims.sub,
            email: data.claims.email,
        })
    }

    async fn create_account(&self, account: &NewAccount) -> Result<String, IdentityError> {
        let created: CreateAccountResponse = self
            .admin_post(
                "accounts",
                json!({
                    "email": account.email,
                    "password": account.password,
                    "displayName": account.display_name,
                    "emailVerified": false,
                }),
            )
            .await?;

        tracing::info!(email = %account.email, uid = %created.local_id, "Identity account created");
        Ok(created.local_id)
    }

    async fn delete_account(&self, uid: &str) -> Result<(), IdentityError> {
        let _: serde_json::Value = self
            .admin_post("accounts:delete", json!({ "localId": uid }))
            .await?;
        tracing::info!(uid = %uid, "Identity account deleted");
        Ok(())
    }

    async fn update_display_name(
        &self,
        uid: &str,
        display_name: &str,
    ) -> Result<(), IdentityError> {
        let _: serde_json::Value = self
            .admin_post(
                "accounts:update",
                json!({ "localId": uid, "displayName": display_name }),
            )
            .await?;
        Ok(())
    }
}

fn classify_admin_error(message: &str, body: &serde_json::Value) -> IdentityError {
    let code = message.split([' ', ':']).next().unwrap_or(message);
    match code {
        "EMAIL_EXISTS" | "DUPLICATE_EMAIL" => IdentityError::EmailExists(
            body.get("email")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string(),
        ),
        "USER_NOT_FOUND" => IdentityError::AccountNotFound(
            body.get("localId")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string(),
        ),
        _ => IdentityError::Request(message.to_string()),
    }
}

fn forced_refresh_due(last: Option<Instant>, now: Instant) -> bool {
    match last {
        Some(at) => now.saturating_duration_since(at) >= Duration::from_secs(JWKS_MIN_REFRESH_SECONDS),
        None => true,
    }
}

/// Extracts `max-age` seconds from a Cache-Control header value.
pub fn parse_max_age(header: &str) -> Option<u64> {
    header
        .split(',')
        .map(str::trim)
        .find_map(|directive| directive.strip_prefix("max-age="))
        .and_then(|value| value.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_max_age() {
        assert_eq!(
            parse_max_age("public, max-age=19302, must-revalidate, no-transform"),
            Some(19302)
        );
        assert_eq!(parse_max_age("max-age=60"), Some(60));
        assert_eq!(parse_max_age("no-cache"), None);
        assert_eq!(parse_max_age("max-age=abc"), None);
    }

    #[test]
    fn test_classify_admin_error() {
        let body = json!({ "email": "a@uni.edu" });
        match classify_admin_error("EMAIL_EXISTS", &body) {
            IdentityError::EmailExists(email) => assert_eq!(email, "a@uni.edu"),
            other => panic!("unexpected: {:?}", other),
        }

        let body = json!({ "localId": "uid-1" });
        assert!(matches!(
            classify_admin_error("USER_NOT_FOUND", &body),
            IdentityError::AccountNotFound(uid) if uid == "uid-1"
        ));

        assert!(matches!(
            classify_admin_error("WEAK_PASSWORD : Password should be at least 6 characters", &body),
            IdentityError::Request(_)
        ));
    }

    #[tokio::test]
    async fn test_malformed_token_is_rejected_without_network() {
        let provider = FirebaseIdentityProvider::new("demo-project".to_string(), None).unwrap();
        let err = provider.verify_token("not-a-jwt").await.unwrap_err();
        assert!(matches!(err, IdentityError::InvalidToken(_)));
    }

    #[test]
    fn test_forced_refresh_due() {
        let now = Instant::now();
        assert!(forced_refresh_due(None, now));
        assert!(!forced_refresh_due(Some(now), now));
        let later = now + Duration::from_secs(JWKS_MIN_REFRESH_SECONDS);
        assert!(forced_refresh_due(Some(now), later));
        assert!(!forced_refresh_due(Some(now), later - Duration::from_secs(1)));
    }

    #[tokio::test]
    async fn test_unknown_key_id_does_not_refetch_within_interval() {
        let provider = FirebaseIdentityProvider::new("demo-project".to_string(), None).unwrap();
        *provider.keys.write().await = Some(CachedKeys {
            keys: JwkSet { keys: Vec::new() },
            expires_at: Instant::now() + Duration::from_secs(3600),
        });
        *provider.last_forced_refresh.lock().await = Some(Instant::now());

        // {"alg":"RS256","typ":"JWT","kid":"rotated-away"}
        let token = "eyJhbGciOiJSUzI1NiIsInR5cCI6IkpXVCIsImtpZCI6InJvdGF0ZWQtYXdheSJ9.e30.c2ln";
        for _ in 0..3 {
            let err = provider.verify_token(token).await.unwrap_err();
            assert!(
                matches!(&err, IdentityError::InvalidToken(message) if message == "unknown key id"),
                "unexpected: {:?}",
                err
            );
        }
    }

    #[tokio::test]
    async fn test_claim_forced_refresh_once_per_interval() {
        let provider = FirebaseIdentityProvider::new("demo-project".to_string(), None).unwrap();
        assert!(provider.claim_forced_refresh().await);
        assert!(!provider.claim_forced_refresh().await);
    }

    #[tokio::test]
    async fn test_account_management_requires_service_account() {
        let provider = FirebaseIdentityProvider::new("demo-project".to_string(), None).unwrap();
        let err = provider.delete_account("uid-1").await.unwrap_err();
        assert!(matches!(err, IdentityError::NotConfigured));
    }
}
