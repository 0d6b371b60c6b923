//! Server error types and response handling

use axum::{
    body::Body,
    http::{Response, StatusCode},
    response::IntoResponse,
};

/// Errors a request can fail with before streaming starts
#[derive(Debug)]
pub enum ServerError {
    BadRequest(String),
    /// The request names a remote source outside the allowed upstreams
    Forbidden(String),
    Upstream(String),
}

impl From<crate::Error> for ServerError {
    fn from(err: crate::Error) -> Self {
        match err {
            crate::Error::Transport(msg) => ServerError::Upstream(msg),
            other => ServerError::BadRequest(other.to_string()),
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response<Body> {
        let (status, message) = match self {
            ServerError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ServerError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            ServerError::Upstream(msg) => (StatusCode::BAD_GATEWAY, msg),
        };

        tracing::error!("Request failed: {} - {}", status, message);

        Response::builder()
            .status(status)
            .body(Body::from(message))
            .unwrap_or_else(|_| Response::new(Body::from("Internal error building error response")))
    }
}
