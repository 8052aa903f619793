//! HTTP API for the registry using axum.
//!
//! Two protocol endpoints (`/register`, `/deregister`) plus a listing and a
//! health check. An undecodable body is a 400 and never mutates directory
//! state; axum's method routing answers non-POST protocol requests with 405.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use beacon_common::Registration;
use serde::Serialize;
use tracing::error;

use crate::directory::{Directory, ServiceSummary};

/// Creates the registry router.
pub fn create_router(directory: Directory) -> Router {
    Router::new()
        .route("/register", post(register_handler))
        .route("/deregister", post(deregister_handler))
        .route("/services", get(services_handler))
        .route("/health", get(health_handler))
        .with_state(directory)
}

async fn register_handler(
    State(directory): State<Directory>,
    payload: Result<Json<Registration>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let Json(registration) = payload.map_err(ApiError::from)?;
    directory.add(registration).await;
    Ok(StatusCode::OK)
}

async fn deregister_handler(
    State(directory): State<Directory>,
    payload: Result<Json<Registration>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let Json(registration) = payload.map_err(ApiError::from)?;
    directory.remove(&registration).await;
    Ok(StatusCode::OK)
}

async fn services_handler(State(directory): State<Directory>) -> Json<Vec<ServiceSummary>> {
    Json(directory.summaries().await)
}

async fn health_handler() -> &'static str {
    "OK"
}

/// API error type.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
        };
        error!("API error: {} - {}", status, message);
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::CollectingSink;
    use axum::body::Body;
    use axum::http::Request;
    use beacon_common::{ServiceName, REGISTRY_SERVICE_NAME};
    use std::sync::Arc;
    use tower::util::ServiceExt; // for `oneshot`

    fn test_directory() -> (Directory, CollectingSink) {
        let sink = CollectingSink::new();
        let directory = Directory::new(
            ServiceName::from(REGISTRY_SERVICE_NAME),
            Arc::new(sink.clone()),
        );
        (directory, sink)
    }

    fn post_request(path: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(path)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_register_endpoint() {
        let (directory, _sink) = test_directory();
        let app = create_router(directory.clone());

        let registration = Registration::new("grading", "http://h:6000");
        let response = app
            .oneshot(post_request(
                "/register",
                &serde_json::to_string(&registration).unwrap(),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(directory.len().await, 1);
    }

    #[tokio::test]
    async fn test_deregister_endpoint() {
        let (directory, _sink) = test_directory();
        directory.add(Registration::new("grading", "http://h:6000")).await;
        let app = create_router(directory.clone());

        let registration = Registration::new("grading", "http://h:6000");
        let response = app
            .oneshot(post_request(
                "/deregister",
                &serde_json::to_string(&registration).unwrap(),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(directory.is_empty().await);
    }

    #[tokio::test]
    async fn test_malformed_body_is_400_and_mutates_nothing() {
        let (directory, _sink) = test_directory();
        let app = create_router(directory.clone());

        let response = app
            .oneshot(post_request("/register", "{not json"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(directory.is_empty().await);
    }

    #[tokio::test]
    async fn test_wrong_method_is_405() {
        let (directory, _sink) = test_directory();
        let app = create_router(directory);

        let response = app
            .oneshot(
                Request::builder()
                    .method("GET")
                    .uri("/register")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn test_services_listing() {
        let (directory, _sink) = test_directory();
        directory.add(Registration::new("log", "http://h:4000")).await;
        let app = create_router(directory);

        let response = app
            .oneshot(
                Request::builder()
                    .method("GET")
                    .uri("/services")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let listing: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(listing[0]["name"], "log");
        assert_eq!(listing[0]["url"], "http://h:4000");
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let (directory, _sink) = test_directory();
        let app = create_router(directory);

        let response = app
            .oneshot(
                Request::builder()
                    .method("GET")
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
