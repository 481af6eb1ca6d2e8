//! Middleware that signs the user out on the client side.
//!
//! Wraps a service so that every response it produces expires the `userId` and
//! `userPicture` cookies. The inner service is always called, exactly once per
//! request, whether or not the request carried those cookies.

use std::sync::Arc;
use std::task::{Context, Poll};

use axum::http::{Request, Response};
use futures_util::future::BoxFuture;
use tower::{Layer, Service};

use crate::http::cookies::{clear_user_cookies, CookieAttributes, PendingExpiry};
use crate::observability::metrics;

/// Layer producing [`ClearUserCookies`] services.
#[derive(Debug, Clone, Default)]
pub struct ClearUserCookiesLayer {
    attributes: Arc<CookieAttributes>,
}

impl ClearUserCookiesLayer {
    pub fn new(attributes: CookieAttributes) -> Self {
        Self {
            attributes: Arc::new(attributes),
        }
    }
}

impl<S> Layer<S> for ClearUserCookiesLayer {
    type Service = ClearUserCookies<S>;

    fn layer(&self, inner: S) -> Self::Service {
        ClearUserCookies {
            inner,
            attributes: self.attributes.clone(),
        }
    }
}

/// Service expiring the user cookies on every response of `S`.
#[derive(Debug, Clone)]
pub struct ClearUserCookies<S> {
    inner: S,
    attributes: Arc<CookieAttributes>,
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for ClearUserCookies<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>>,
    S::Future: Send + 'static,
    S::Error: 'static,
    ResBody: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<ReqBody>) -> Self::Future {
        let attributes = self.attributes.clone();
        let mut pending = PendingExpiry::default();
        let inner = &mut self.inner;
        let next = clear_user_cookies(&mut pending, move || inner.call(request));

        Box::pin(async move {
            let mut response = next.await?;
            pending.apply(response.headers_mut(), &attributes);
            metrics::record_cookies_cleared();
            tracing::debug!(
                path = %attributes.path,
                status = %response.status(),
                "User cookies expired"
            );
            Ok(response)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header::SET_COOKIE, HeaderValue};
    use std::convert::Infallible;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tower::ServiceExt;

    fn set_cookies<B>(response: &Response<B>) -> Vec<String> {
        response
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .map(|v| v.to_str().unwrap().to_string())
            .collect()
    }

    #[tokio::test]
    async fn test_expires_user_cookies_and_calls_inner_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let inner = tower::service_fn(move |_req: Request<Body>| {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Ok::<_, Infallible>(Response::new(Body::empty())) }
        });

        let service = ClearUserCookiesLayer::default().layer(inner);
        let response = service
            .oneshot(Request::builder().uri("/logout").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            set_cookies(&response),
            vec![
                "userId=; Path=/; Max-Age=0; Expires=Thu, 01 Jan 1970 00:00:00 GMT",
                "userPicture=; Path=/; Max-Age=0; Expires=Thu, 01 Jan 1970 00:00:00 GMT",
            ]
        );
    }

    #[tokio::test]
    async fn test_prior_cookies_do_not_matter() {
        let inner = tower::service_fn(|_req: Request<Body>| async {
            Ok::<_, Infallible>(Response::new(Body::empty()))
        });
        let service = ClearUserCookiesLayer::default().layer(inner);

        let with_cookies = Request::builder()
            .header("cookie", "userId=42; userPicture=http://img")
            .body(Body::empty())
            .unwrap();
        let without_cookies = Request::builder().body(Body::empty()).unwrap();

        let a = service.clone().oneshot(with_cookies).await.unwrap();
        let b = service.oneshot(without_cookies).await.unwrap();
        assert_eq!(set_cookies(&a), set_cookies(&b));
        assert_eq!(set_cookies(&a).len(), 2);
    }

    #[tokio::test]
    async fn test_repeated_invocation_is_idempotent() {
        let inner = tower::service_fn(|_req: Request<Body>| async {
            Ok::<_, Infallible>(Response::new(Body::empty()))
        });
        let service = ClearUserCookiesLayer::default().layer(inner);

        let mut seen = Vec::new();
        for _ in 0..3 {
            let response = service
                .clone()
                .oneshot(Request::new(Body::empty()))
                .await
                .unwrap();
            seen.push(set_cookies(&response));
        }
        assert!(seen.iter().all(|c| c == &seen[0]));
    }

    #[tokio::test]
    async fn test_nested_layers_write_two_directives() {
        let inner = tower::service_fn(|_req: Request<Body>| async {
            Ok::<_, Infallible>(Response::new(Body::empty()))
        });
        let service = tower::ServiceBuilder::new()
            .layer(ClearUserCookiesLayer::default())
            .layer(ClearUserCookiesLayer::default())
            .service(inner);

        let response = service.oneshot(Request::new(Body::empty())).await.unwrap();
        assert_eq!(set_cookies(&response).len(), 2);
    }

    #[tokio::test]
    async fn test_handler_cookies_follow_expiry() {
        let inner = tower::service_fn(|_req: Request<Body>| async {
            let mut response = Response::new(Body::empty());
            response
                .headers_mut()
                .append(SET_COOKIE, HeaderValue::from_static("userId=7; Path=/"));
            Ok::<_, Infallible>(response)
        });
        let attributes = CookieAttributes {
            path: "/".into(),
            domain: Some("example.com".into()),
        };
        let service = ClearUserCookiesLayer::new(attributes).layer(inner);

        let response = service.oneshot(Request::new(Body::empty())).await.unwrap();
        assert_eq!(
            set_cookies(&response),
            vec![
                "userId=; Path=/; Domain=example.com; Max-Age=0; Expires=Thu, 01 Jan 1970 00:00:00 GMT",
                "userPicture=; Path=/; Domain=example.com; Max-Age=0; Expires=Thu, 01 Jan 1970 00:00:00 GMT",
                "userId=7; Path=/",
            ]
        );
    }
}
