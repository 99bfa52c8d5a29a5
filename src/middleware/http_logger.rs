use axum::{
    body::Body,
    extract::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue, Method};
use http_body_util::BodyExt;
use serde_json::Value;
use std::time::Instant;

use crate::config::APP_CONFIG;
use crate::error::AppError;

const REDACTED: &str = "[REDACTED]";

const SENSITIVE_FIELDS: &[&str] = &[
    "password",
    "temporary_password",
    "token",
    "id_token",
    "access_token",
    "refresh_token",
    "authorization",
    "secret",
    "private_key",
    "credential",
    "credentials",
];

const SENSITIVE_HEADERS: &[&str] = &[
    "authorization",
    "cookie",
    "set-cookie",
    "x-api-key",
    "x-auth-token",
];

fn should_ignore_path(path: &str) -> bool {
    matches!(path, "/health" | "/health/") || path.starts_with("/swagger-ui")
}

/// Replaces sensitive values anywhere in a JSON document, including the per-row
/// arrays returned by bulk provisioning.
fn filter_sensitive_data(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, value)| {
                    if SENSITIVE_FIELDS.contains(&key.to_lowercase().as_str()) {
                        (key, Value::String(REDACTED.to_string()))
                    } else {
                        (key, filter_sensitive_data(value))
                    }
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(filter_sensitive_data).collect()),
        other => other,
    }
}

fn filter_sensitive_headers(headers: &HeaderMap) -> HeaderMap {
    let mut filtered_headers = headers.clone();

    for header_name in SENSITIVE_HEADERS {
        let name = HeaderName::from_static(header_name);
        if filtered_headers.contains_key(&name) {
            filtered_headers.insert(name, HeaderValue::from_static(REDACTED));
        }
    }

    filtered_headers
}

fn json_or_empty(bytes: &[u8]) -> Value {
    match serde_json::from_slice::<Value>(bytes) {
        Ok(json) => filter_sensitive_data(json),
        Err(_) => Value::Object(serde_json::Map::new()),
    }
}

pub async fn http_logger(req: Request, next: Next) -> Result<impl IntoResponse, AppError> {
    let start_time = Instant::now();

    let method = req.method().clone();
    let uri = req.uri().clone();
    let path = uri.path().to_string();
    let req_headers = req.headers().clone();
    let x_request_id = req_headers
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();

    if should_ignore_path(&path) || method == Method::OPTIONS {
        return Ok(next.run(req).await);
    }

    let is_file_upload = req_headers
        .get(http::header::CONTENT_TYPE)
        .and_then(|ct| ct.to_str().ok())
        .map(|ct| ct.starts_with("multipart/form-data"))
        .unwrap_or(false);
    let is_mutation = matches!(method, Method::POST | Method::PUT | Method::PATCH);

    let (req, req_body) = if is_mutation && !is_file_upload {
        let (parts, body) = req.into_parts();
        let bytes = buffer_body("request", body).await?;
        let req_body = json_or_empty(&bytes);
        (Request::from_parts(parts, Body::from(bytes)), req_body)
    } else {
        (req, Value::Object(serde_json::Map::new()))
    };

    let mut response = next.run(req).await;
    let latency = start_time.elapsed();
    let status = response.status();

    let is_json_response = response
        .headers()
        .get(http::header::CONTENT_TYPE)
        .and_then(|ct| ct.to_str().ok())
        .map(|ct| ct.starts_with("application/json"))
        .unwrap_or(false);

    let res_body = if is_mutation && is_json_response {
        let (parts, body) = response.into_parts();
        let bytes = buffer_body("response", body).await?;
        let json_body = json_or_empty(&bytes);
        response = Response::from_parts(parts, Body::from(bytes));
        json_body
    } else {
        Value::Object(serde_json::Map::new())
    };

    let filtered_req_headers = filter_sensitive_headers(&req_headers);

    tracing::info!(
        method = %method,
        path = %path,
        query = uri.query().unwrap_or(""),
        x_request_id = %x_request_id,
        req_headers = ?filtered_req_headers,
        req_body = %req_body,
        status = status.as_u16(),
        latency_ms = latency.as_millis(),
        res_body = %res_body,
        app_env = %APP_CONFIG.app_env,
        "HTTP request completed"
    );

    Ok(response)
}

pub async fn buffer_body<B>(direction: &str, body: B) -> Result<Bytes, AppError>
where
    B: BodyExt,
    B::Error: std::fmt::Display,
{
    match body.collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(err) => Err(AppError::bad_request(format!(
            "Failed to read {direction} body: {err}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_nested_sensitive_fields_are_redacted() {
        let body = json!({
            "email": "a@uni.edu",
            "password": "hunter22",
            "successes": [{ "row": 2, "temporary_password": "Xy12ab" }]
        });
        let filtered = filter_sensitive_data(body);
        assert_eq!(filtered["email"], "a@uni.edu");
        assert_eq!(filtered["password"], REDACTED);
        assert_eq!(filtered["successes"][0]["temporary_password"], REDACTED);
        assert_eq!(filtered["successes"][0]["row"], 2);
    }

    #[test]
    fn test_sensitive_headers_are_redacted() {
        let mut headers = HeaderMap::new();
        headers.insert(http::header::AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        headers.insert(http::header::ACCEPT, HeaderValue::from_static("application/json"));
        let filtered = filter_sensitive_headers(&headers);
        assert_eq!(filtered.get(http::header::AUTHORIZATION).unwrap(), REDACTED);
        assert_eq!(filtered.get(http::header::ACCEPT).unwrap(), "application/json");
    }

    #[test]
    fn test_ignored_paths() {
        assert!(should_ignore_path("/health"));
        assert!(should_ignore_path("/swagger-ui/index.html"));
        assert!(!should_ignore_path("/api/admin/users"));
    }
}
