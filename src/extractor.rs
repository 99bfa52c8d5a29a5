use axum::extract::FromRequestParts;
use axum::http::HeaderMap;
use axum::http::request::Parts;
use axum_extra::extract::cookie::CookieJar;
use axum_extra::headers::authorization::Bearer;
use axum_extra::headers::{Authorization, HeaderMapExt};
use uuid::Uuid;

use crate::config::AUTH_COOKIE_NAME;
use crate::entities::user;
use crate::error::{AppError, AppResult};
use crate::middleware::permission::{
    FACULTY_ONLY, HOD_ONLY, PRINCIPAL_ONLY, STUDENT_ONLY, Scope, require_role,
};
use crate::repositories::UserRepository;
use crate::static_service::identity_provider;

/// Bearer token from the Authorization header, falling back to the auth cookie.
pub fn extract_token(headers: &HeaderMap) -> Option<String> {
    if let Some(Authorization(bearer)) = headers.typed_get::<Authorization<Bearer>>() {
        let token = bearer.token().trim();
        if !token.is_empty() {
            return Some(token.to_string());
        }
    }

    CookieJar::from_headers(headers)
        .get(AUTH_COOKIE_NAME)
        .map(|cookie| cookie.value().trim().to_string())
        .filter(|token| !token.is_empty())
}

/// The caller's local user record, resolved from a verified identity token.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub user::Model);

impl CurrentUser {
    pub fn id(&self) -> Uuid {
        self.0.user_id
    }

    pub fn scope(&self) -> AppResult<Scope> {
        Scope::for_user(&self.0)
    }
}

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let token = extract_token(&parts.headers)
            .ok_or_else(|| AppError::unauthorized("Missing authentication token"))?;

        let identity = identity_provider()?.verify_token(&token).await?;

        let user = UserRepository::new()
            .find_by_firebase_uid(&identity.uid)
            .await?
            .ok_or_else(|| {
                tracing::warn!(uid = %identity.uid, "Verified identity has no local account");
                AppError::unauthorized("No account is provisioned for this identity")
            })?;

        Ok(CurrentUser(user))
    }
}

macro_rules! role_extractor {
    ($(#[$meta:meta])* $name:ident, $roles:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone)]
        pub struct $name(pub user::Model);

        impl $name {
            pub fn id(&self) -> Uuid {
                self.0.user_id
            }

            pub fn scope(&self) -> AppResult<Scope> {
                Scope::for_user(&self.0)
            }
        }

        impl<S> FromRequestParts<S> for $name
        where
            S: Send + Sync,
        {
            type Rejection = AppError;

            async fn from_request_parts(
                parts: &mut Parts,
                state: &S,
            ) -> Result<Self, Self::Rejection> {
                let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;
                require_role(&user, $roles)?;
                Ok(Self(user))
            }
        }
    };
}

role_extractor!(
    /// Caller with the PRINCIPAL role.
    PrincipalUser,
    PRINCIPAL_ONLY
);
role_extractor!(
    /// Caller with the FACULTY role.
    FacultyUser,
    FACULTY_ONLY
);
role_extractor!(
    /// Caller with the STUDENT role.
    StudentUser,
    STUDENT_ONLY
);

/// Caller with the HOD role, together with the department every query must be scoped to.
#[derive(Debug, Clone)]
pub struct HodUser {
    pub user: user::Model,
    pub department_id: Uuid,
}

impl HodUser {
    pub fn scope(&self) -> Scope {
        Scope::Department(self.department_id)
    }
}

impl<S> FromRequestParts<S> for HodUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;
        require_role(&user, HOD_ONLY)?;
        let department_id = user
            .department_id
            .ok_or_else(|| AppError::forbidden("HOD account is not assigned to a department"))?;
        Ok(Self {
            user,
            department_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderValue, header};

    #[test]
    fn test_bearer_header_wins_over_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer header-token"));
        headers.insert(header::COOKIE, HeaderValue::from_static("firebase-token=cookie-token"));
        assert_eq!(extract_token(&headers).as_deref(), Some("header-token"));
    }

    #[test]
    fn test_cookie_fallback() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; firebase-token=cookie-token"),
        );
        assert_eq!(extract_token(&headers).as_deref(), Some("cookie-token"));
    }

    #[test]
    fn test_missing_or_empty_token() {
        let headers = HeaderMap::new();
        assert_eq!(extract_token(&headers), None);

        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("firebase-token="));
        assert_eq!(extract_token(&headers), None);

        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic dXNlcjpwYXNz"));
        assert_eq!(extract_token(&headers), None);
    }
}
