use crate::api_docs::ApiDoc;
use crate::config::APP_CONFIG;
use crate::middleware::http_logger::http_logger;
use crate::middleware::json_errors::{json_error_body, not_found};
use crate::routes;
use axum::Router;
use axum::middleware;
use http::header;
use std::collections::HashSet;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    ServiceBuilderExt,
    cors::{AllowOrigin, Any, CorsLayer},
    propagate_header::PropagateHeaderLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Every portal route, without swagger or the middleware stack.
pub fn api_router() -> Router {
    Router::new()
        .merge(routes::health::route::create_route())
        .merge(routes::auth::create_route())
        .merge(routes::notices::create_route())
        .merge(routes::users::create_route())
        .merge(routes::departments::create_route())
        .merge(routes::batches::create_route())
        .merge(routes::subjects::create_route())
        .merge(routes::enrollments::create_route())
        .merge(routes::attendance::create_route())
        .merge(routes::grades::create_route())
        .merge(routes::assignments::create_route())
        .merge(routes::fees::create_route())
        .merge(routes::complaints::create_route())
        .merge(routes::settings::create_route())
        .merge(routes::stats::create_route())
        .fallback(not_found)
        .layer(middleware::from_fn(json_error_body))
}

fn cors_layer() -> CorsLayer {
    let allowed_headers = [
        header::CONTENT_TYPE,
        header::AUTHORIZATION,
        header::ACCEPT,
        header::ACCEPT_LANGUAGE,
    ];

    let allowed_methods = [
        http::Method::GET,
        http::Method::POST,
        http::Method::PUT,
        http::Method::DELETE,
        http::Method::PATCH,
        http::Method::OPTIONS,
    ];

    if APP_CONFIG.cors_allowed_origins == "*" {
        // credentials cannot be combined with a wildcard origin
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(allowed_methods)
            .allow_headers(allowed_headers)
            .allow_credentials(false)
    } else {
        let allowed_origins: HashSet<String> = APP_CONFIG
            .cors_allowed_origins
            .split(',')
            .map(|s| s.trim().to_string())
            .collect();

        let origins: Vec<http::HeaderValue> = allowed_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();

        // the firebase-token cookie needs credentials
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(allowed_methods)
            .allow_headers(allowed_headers)
            .allow_credentials(true)
    }
}

pub async fn create_app() -> anyhow::Result<Router> {
    let mut router = api_router();

    if APP_CONFIG.swagger_enabled {
        let swagger_ui =
            SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi());
        router = router.merge(swagger_ui);
    }

    // axum middleware goes on the router, tower layers through ServiceBuilder
    let router = router.layer(middleware::from_fn(http_logger));

    let sensitive_headers: Arc<[_]> = vec![header::AUTHORIZATION, header::COOKIE].into();
    let middleware = ServiceBuilder::new()
        .layer(cors_layer())
        .layer(PropagateHeaderLayer::new(header::HeaderName::from_static(
            "x-request-id",
        )))
        .sensitive_request_headers(sensitive_headers.clone())
        .sensitive_response_headers(sensitive_headers)
        .compression();

    Ok(router.layer(middleware))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::Value;
    use tower::ServiceExt;

    async fn send(request: Request<Body>) -> (StatusCode, Value) {
        let response = api_router().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_health_needs_no_token() {
        let (status, body) = send(Request::get("/health").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_portal_routes_require_a_token() {
        for path in ["/api/auth/me", "/api/admin/users", "/api/hod/stats", "/api/student/fees"] {
            let (status, body) = send(Request::get(path).body(Body::empty()).unwrap()).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED, "{path}");
            assert_eq!(body["error"], "Missing authentication token");
        }
    }

    #[tokio::test]
    async fn test_unknown_route_returns_json_404() {
        let (status, body) =
            send(Request::get("/api/unknown").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Route not found");
    }
}
