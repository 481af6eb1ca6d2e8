//! Session server library.
//!
//! Request helpers for a signed-in-user web app: a raw body reader and a
//! middleware that expires the `userId`/`userPicture` cookies.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;

pub use config::ServerConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
