//! Rewrites plain-text client errors produced by axum's own extractors (malformed JSON,
//! bad query strings, unknown methods) into the `ErrorResponse` JSON shape.

use axum::{
    Json,
    extract::Request,
    http::{StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::error::{AppError, ErrorResponse};
use crate::middleware::http_logger::buffer_body;

fn is_json(response: &Response) -> bool {
    response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|ct| ct.to_str().ok())
        .map(|ct| ct.starts_with("application/json"))
        .unwrap_or(false)
}

pub async fn json_error_body(req: Request, next: Next) -> Result<Response, AppError> {
    let response = next.run(req).await;
    let status = response.status();
    if !status.is_client_error() || is_json(&response) {
        return Ok(response);
    }

    let (parts, body) = response.into_parts();
    let bytes = buffer_body("response", body).await?;
    let text = String::from_utf8_lossy(&bytes).trim().to_string();
    let error = if text.is_empty() {
        status.canonical_reason().unwrap_or("Request failed").to_string()
    } else {
        text
    };

    // axum reports undeserializable bodies as 422
    let status = if status == StatusCode::UNPROCESSABLE_ENTITY {
        StatusCode::BAD_REQUEST
    } else {
        status
    };

    let mut rewritten = (status, Json(ErrorResponse { error, details: None })).into_response();
    for (name, value) in parts.headers.iter() {
        if name != header::CONTENT_TYPE && name != header::CONTENT_LENGTH {
            rewritten.headers_mut().append(name.clone(), value.clone());
        }
    }
    Ok(rewritten)
}

/// Fallback for unknown routes.
pub async fn not_found() -> AppError {
    AppError::not_found("Route not found")
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Router, body::Body, http::Request as HttpRequest, middleware, routing::post};
    use http_body_util::BodyExt;
    use serde::Deserialize;
    use serde_json::Value;
    use tower::ServiceExt;

    #[derive(Deserialize)]
    struct Payload {
        #[allow(dead_code)]
        name: String,
    }

    async fn echo(Json(_payload): Json<Payload>) -> StatusCode {
        StatusCode::NO_CONTENT
    }

    fn app() -> Router {
        Router::new()
            .route("/echo", post(echo))
            .fallback(not_found)
            .layer(middleware::from_fn(json_error_body))
    }

    async fn send(request: HttpRequest<Body>) -> (StatusCode, Value) {
        let response = app().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_malformed_json_becomes_400_json() {
        let request = HttpRequest::post("/echo")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"name": 12}"#))
            .unwrap();
        let (status, body) = send(request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("name"));
    }

    #[tokio::test]
    async fn test_unknown_route_is_json_404() {
        let request = HttpRequest::get("/nope").body(Body::empty()).unwrap();
        let (status, body) = send(request).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Route not found");
    }

    #[tokio::test]
    async fn test_wrong_method_gets_reason_phrase() {
        let request = HttpRequest::get("/echo").body(Body::empty()).unwrap();
        let (status, body) = send(request).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(body["error"], "Method Not Allowed");
    }

    #[tokio::test]
    async fn test_rewritten_error_keeps_original_headers() {
        let request = HttpRequest::get("/echo").body(Body::empty()).unwrap();
        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        let allow = response.headers().get(header::ALLOW).unwrap().to_str().unwrap();
        assert!(allow.contains("POST"));
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/json"
        );
        assert_eq!(response.headers().get_all(header::CONTENT_TYPE).iter().count(), 1);
    }
}
