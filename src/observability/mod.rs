//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Request helpers and server produce:
//!     → logging.rs (structured log events via `tracing`)
//!     → metrics.rs (counters via the `metrics` facade)
//!
//! Consumers:
//!     → stdout (pretty or JSON lines)
//!     → Prometheus scrape endpoint (optional)
//! ```
//!
//! # Design Decisions
//! - Request ID is attached by a tower-http layer and shows up in every request span
//! - Metric updates go through the facade and are no-ops until a recorder is installed

pub mod logging;
pub mod metrics;
