//! User cookie expiry.
//!
//! # Responsibilities
//! - Name the cookies that identify a signed-in user
//! - Build `Set-Cookie` removal directives that expire a cookie
//! - Expire the user cookies, then hand control to the next step
//!
//! # Design Decisions
//! - Expiry goes through the `ExpireCookie` capability so the clearing logic does
//!   not depend on a particular response type
//! - Clearing is unconditional; whether the client sent the cookies is irrelevant
//! - The same directive is never written twice to one response

use axum::http::{
    header::SET_COOKIE,
    HeaderMap, HeaderValue,
};
use cookie::time::{Duration, OffsetDateTime};
use cookie::Cookie;

/// Cookie holding the signed-in user's id.
pub const USER_ID_COOKIE: &str = "userId";

/// Cookie holding the signed-in user's picture URL.
pub const USER_PICTURE_COOKIE: &str = "userPicture";

/// Cookies expired by [`clear_user_cookies`], in the order they are expired.
pub const USER_COOKIES: [&str; 2] = [USER_ID_COOKIE, USER_PICTURE_COOKIE];

/// Something that can tell a client to drop a cookie.
pub trait ExpireCookie {
    fn expire(&mut self, name: &str);
}

impl<T: ExpireCookie + ?Sized> ExpireCookie for &mut T {
    fn expire(&mut self, name: &str) {
        (**self).expire(name)
    }
}

/// Expire the user cookies, then call `proceed` exactly once.
///
/// Returns whatever `proceed` returns. For middleware this is the future of the
/// next service in the chain.
pub fn clear_user_cookies<E, F, T>(cookies: &mut E, proceed: F) -> T
where
    E: ExpireCookie + ?Sized,
    F: FnOnce() -> T,
{
    for name in USER_COOKIES {
        cookies.expire(name);
    }
    proceed()
}

/// Attributes written into every expiry directive.
///
/// Browsers only drop a cookie when path and domain match the ones it was set with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieAttributes {
    pub path: String,
    pub domain: Option<String>,
}

impl Default for CookieAttributes {
    fn default() -> Self {
        Self {
            path: "/".to_string(),
            domain: None,
        }
    }
}

impl CookieAttributes {
    /// Empty cookie named `name` with `Max-Age=0` and an `Expires` at the Unix epoch.
    pub fn removal_cookie<'a>(&'a self, name: &'a str) -> Cookie<'a> {
        let mut cookie = Cookie::build((name, ""))
            .path(self.path.as_str())
            .max_age(Duration::ZERO)
            .expires(OffsetDateTime::UNIX_EPOCH);
        if let Some(domain) = &self.domain {
            cookie = cookie.domain(domain.as_str());
        }
        cookie.build()
    }

    /// `Set-Cookie` value that expires `name`.
    pub fn expiry_directive(&self, name: &str) -> String {
        self.removal_cookie(name).to_string()
    }

    /// Whether a directive written with these attributes is a valid header value
    /// and parses back to the same path and domain.
    pub fn is_well_formed(&self) -> bool {
        let directive = self.expiry_directive(USER_ID_COOKIE);
        if HeaderValue::from_str(&directive).is_err() {
            return false;
        }
        match Cookie::parse(directive.as_str()) {
            Ok(parsed) => {
                parsed.path() == Some(self.path.as_str())
                    && parsed.domain() == self.domain.as_deref().map(|d| d.trim_start_matches('.'))
            }
            Err(_) => false,
        }
    }

    fn expiry_header(&self, name: &str) -> Option<HeaderValue> {
        match HeaderValue::from_str(&self.expiry_directive(name)) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(cookie = name, error = %e, "Ignoring bad cookie expiry directive");
                None
            }
        }
    }
}

/// Writes expiry directives straight into a header map.
pub struct SetCookieHeaders<'a> {
    headers: &'a mut HeaderMap,
    attributes: &'a CookieAttributes,
}

impl<'a> SetCookieHeaders<'a> {
    pub fn new(headers: &'a mut HeaderMap, attributes: &'a CookieAttributes) -> Self {
        Self { headers, attributes }
    }
}

impl ExpireCookie for SetCookieHeaders<'_> {
    fn expire(&mut self, name: &str) {
        if let Some(value) = self.attributes.expiry_header(name) {
            append_unique(self.headers, value);
        }
    }
}

impl ExpireCookie for HeaderMap {
    fn expire(&mut self, name: &str) {
        SetCookieHeaders::new(self, &CookieAttributes::default()).expire(name);
    }
}

/// Expiries recorded before the response exists.
///
/// Middleware clears cookies before the next handler runs, but the response headers
/// only exist afterwards. Names are recorded here and written by [`apply`](Self::apply)
/// ahead of any `Set-Cookie` the handler produced, so a cookie the handler sets
/// again still wins on the client.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PendingExpiry {
    names: Vec<String>,
}

impl ExpireCookie for PendingExpiry {
    fn expire(&mut self, name: &str) {
        if !self.names.iter().any(|n| n == name) {
            self.names.push(name.to_string());
        }
    }
}

impl PendingExpiry {
    /// Write the recorded expiries to `headers`.
    pub fn apply(self, headers: &mut HeaderMap, attributes: &CookieAttributes) {
        let directives: Vec<HeaderValue> = self
            .names
            .iter()
            .filter_map(|name| attributes.expiry_header(name))
            .collect();

        let downstream: Vec<HeaderValue> = headers.get_all(SET_COOKIE).iter().cloned().collect();
        headers.remove(SET_COOKIE);

        for value in directives.iter().cloned() {
            append_unique(headers, value);
        }
        for value in downstream {
            if !directives.contains(&value) {
                headers.append(SET_COOKIE, value);
            }
        }
    }
}

fn append_unique(headers: &mut HeaderMap, value: HeaderValue) {
    if !headers.get_all(SET_COOKIE).iter().any(|existing| *existing == value) {
        headers.append(SET_COOKIE, value);
    }
}
