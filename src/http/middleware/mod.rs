//! Request/response middleware.

pub mod clear_cookies;

pub use clear_cookies::{ClearUserCookies, ClearUserCookiesLayer};
