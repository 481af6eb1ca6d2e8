//! Route handlers.

use axum::{http::StatusCode, Json};
use serde::Serialize;

use crate::http::body::RawText;

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
}

pub async fn health() -> Json<HealthStatus> {
    Json(HealthStatus { status: "ok" })
}

/// Answer with the request body, decoded as text.
pub async fn echo(RawText(text): RawText) -> String {
    tracing::debug!(len = text.len(), "Echoing request body");
    text
}

/// Sign-out endpoint. Cookie expiry is done by `ClearUserCookiesLayer` around it.
pub async fn logout() -> StatusCode {
    StatusCode::NO_CONTENT
}
