//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, tracing, limits)
//!     → /echo   → body.rs (drain body stream, decode text) → handlers.rs
//!     → /logout → middleware/clear_cookies.rs (expire user cookies) → handlers.rs
//!     → Send to client
//! ```

pub mod body;
pub mod cookies;
pub mod handlers;
pub mod middleware;
pub mod server;

pub use body::{read_request_text, read_text, BodyError, BodyLimit, RawText};
pub use cookies::{clear_user_cookies, CookieAttributes, ExpireCookie, USER_COOKIES};
pub use middleware::ClearUserCookiesLayer;
pub use server::{AppState, HttpServer};
