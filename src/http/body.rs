//! Raw request body reading.
//!
//! # Responsibilities
//! - Drain a request body stream into a single buffer
//! - Enforce the configured body size limit
//! - Decode the collected bytes as UTF-8 text
//!
//! # Design Decisions
//! - The collector is generic over any `Stream` of byte chunks, so it does not
//!   depend on where the stream comes from; `read_request_text` is the axum adapter
//! - Requests are taken by value: a body stream can only be drained once
//! - A declared `Content-Length` above the limit is rejected before reading
//! - Invalid UTF-8 is replaced with U+FFFD rather than rejected

use axum::{
    body::{Body, Bytes},
    extract::{FromRef, FromRequest},
    http::{header::CONTENT_LENGTH, HeaderMap, Request, StatusCode},
    response::{IntoResponse, Response},
};
use futures_util::{pin_mut, Stream, StreamExt};
use http_body_util::LengthLimitError;
use thiserror::Error;

use crate::observability::metrics;

/// Boxed error produced by a body stream.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Default maximum body size (1 MiB).
pub const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

/// Maximum number of bytes a body may contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BodyLimit(Option<usize>);

impl BodyLimit {
    /// Limit bodies to `max_bytes`.
    pub const fn new(max_bytes: usize) -> Self {
        Self(Some(max_bytes))
    }

    /// Accept bodies of any size.
    pub const fn unlimited() -> Self {
        Self(None)
    }

    pub fn max_bytes(&self) -> Option<usize> {
        self.0
    }

    fn exceeded_by(&self, len: u64) -> Option<usize> {
        self.0.filter(|max| len > *max as u64)
    }
}

impl Default for BodyLimit {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_BODY_BYTES)
    }
}

/// Errors raised while reading a request body.
#[derive(Debug, Error)]
pub enum BodyError {
    /// The underlying stream failed before completion.
    #[error("failed to read request body: {0}")]
    Stream(#[source] BoxError),

    /// The body is larger than the configured limit.
    ///
    /// `limit` is this reader's own limit; `None` when only an outer layer had one.
    #[error("request body exceeds the size limit{}", describe_limit(.limit))]
    TooLarge { limit: Option<usize> },

    /// The number of bytes received differs from `Content-Length`.
    #[error("request body length {received} does not match content-length {expected}")]
    LengthMismatch { expected: u64, received: u64 },
}

impl BodyError {
    /// Short label used for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            BodyError::Stream(_) => "stream_error",
            BodyError::TooLarge { .. } => "too_large",
            BodyError::LengthMismatch { .. } => "length_mismatch",
        }
    }

    /// HTTP status a caller should answer with.
    pub fn status(&self) -> StatusCode {
        match self {
            BodyError::TooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            BodyError::Stream(_) | BodyError::LengthMismatch { .. } => StatusCode::BAD_REQUEST,
        }
    }
}

fn describe_limit(limit: &Option<usize>) -> String {
    limit.map(|l| format!(" of {l} bytes")).unwrap_or_default()
}

impl IntoResponse for BodyError {
    fn into_response(self) -> Response {
        tracing::debug!(error = %self, "Rejecting request body");
        (self.status(), self.to_string()).into_response()
    }
}

/// Collect a byte stream into a single buffer.
pub async fn read_bytes<S, E>(stream: S, limit: BodyLimit) -> Result<Bytes, BodyError>
where
    S: Stream<Item = Result<Bytes, E>>,
    E: Into<BoxError>,
{
    collect(stream, limit, None).await
}

/// Collect a byte stream and decode it as UTF-8 text.
///
/// Resolves once the stream is exhausted. An empty stream yields an empty string.
pub async fn read_text<S, E>(stream: S, limit: BodyLimit) -> Result<String, BodyError>
where
    S: Stream<Item = Result<Bytes, E>>,
    E: Into<BoxError>,
{
    collect(stream, limit, None).await.map(decode_text)
}

/// Read the full body of an axum request as text.
///
/// Consumes the request. Failures are returned to the caller, which decides how to
/// answer; `BodyError` implements `IntoResponse` for the common case.
pub async fn read_request_text(request: Request<Body>, limit: BodyLimit) -> Result<String, BodyError> {
    let expected = declared_length(request.headers());

    let result = match expected.and_then(|len| limit.exceeded_by(len)) {
        Some(max) => Err(BodyError::TooLarge { limit: Some(max) }),
        None => collect(request.into_body().into_data_stream(), limit, expected).await,
    };

    match result {
        Ok(bytes) => {
            metrics::record_body_read("ok", bytes.len());
            Ok(decode_text(bytes))
        }
        Err(err) => {
            tracing::warn!(error = %err, "Request body read failed");
            metrics::record_body_read(err.kind(), 0);
            Err(err)
        }
    }
}

/// Decode bytes as UTF-8, replacing invalid sequences.
pub fn decode_text(bytes: Bytes) -> String {
    String::from_utf8(Vec::from(bytes))
        .unwrap_or_else(|err| String::from_utf8_lossy(err.as_bytes()).into_owned())
}

async fn collect<S, E>(stream: S, limit: BodyLimit, expected: Option<u64>) -> Result<Bytes, BodyError>
where
    S: Stream<Item = Result<Bytes, E>>,
    E: Into<BoxError>,
{
    pin_mut!(stream);

    let mut first: Option<Bytes> = None;
    let mut buf: Vec<u8> = Vec::new();
    let mut received: u64 = 0;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| classify(e.into(), limit))?;
        if chunk.is_empty() {
            continue;
        }

        received += chunk.len() as u64;
        if let Some(max) = limit.exceeded_by(received) {
            return Err(BodyError::TooLarge { limit: Some(max) });
        }
        if let Some(expected) = expected.filter(|e| received > *e) {
            return Err(BodyError::LengthMismatch { expected, received });
        }

        // Single-chunk bodies are returned without copying.
        match first.take() {
            None if buf.is_empty() => first = Some(chunk),
            Some(prev) => {
                buf.extend_from_slice(&prev);
                buf.extend_from_slice(&chunk);
            }
            None => buf.extend_from_slice(&chunk),
        }
    }

    if let Some(expected) = expected.filter(|e| received != *e) {
        return Err(BodyError::LengthMismatch { expected, received });
    }

    Ok(first.unwrap_or_else(|| Bytes::from(buf)))
}

/// A length limit enforced further out (e.g. `RequestBodyLimitLayer`) shows up as a
/// stream error; report it as an oversized body rather than a broken stream.
fn classify(err: BoxError, limit: BodyLimit) -> BodyError {
    let mut source: Option<&(dyn std::error::Error + 'static)> = Some(&*err);
    while let Some(e) = source {
        if e.is::<LengthLimitError>() {
            return BodyError::TooLarge { limit: limit.max_bytes() };
        }
        source = e.source();
    }
    BodyError::Stream(err)
}

fn declared_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
}

/// Extractor yielding the request body as text.
///
/// The limit comes from the router state through `FromRef`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawText(pub String);

impl<S> FromRequest<S> for RawText
where
    BodyLimit: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = BodyError;

    async fn from_request(req: Request<Body>, state: &S) -> Result<Self, Self::Rejection> {
        let limit = BodyLimit::from_ref(state);
        read_request_text(req, limit).await.map(RawText)
    }
}
