use crate::classify::TypeMatchers;
use crate::future::ResponseFuture;
use crate::pipeline::Pipeline;
use http::{Method, Request};
use std::fmt;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::Service;

/// State shared by every response the service wraps: the content-type
/// matchers and the transform pipeline (dispatcher, cache, error handler).
pub(crate) struct Shared {
    pub(crate) matchers: TypeMatchers,
    pub(crate) pipeline: Arc<Pipeline>,
}

/// A Tower service that minifies HTTP response bodies.
#[derive(Clone)]
pub struct MinifyService<S> {
    inner: S,
    shared: Arc<Shared>,
}

impl<S> MinifyService<S> {
    pub(crate) fn new(inner: S, shared: Arc<Shared>) -> Self {
        Self { inner, shared }
    }

    /// Returns a reference to the inner service.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Returns a mutable reference to the inner service.
    pub fn inner_mut(&mut self) -> &mut S {
        &mut self.inner
    }

    /// Consumes this service, returning the inner service.
    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: fmt::Debug> fmt::Debug for MinifyService<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MinifyService")
            .field("inner", &self.inner)
            .finish_non_exhaustive()
    }
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for MinifyService<S>
where
    S: Service<Request<ReqBody>, Response = http::Response<ResBody>>,
{
    type Response = http::Response<crate::body::MinifyBody<ResBody>>;
    type Error = S::Error;
    type Future = ResponseFuture<S::Future>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<ReqBody>) -> Self::Future {
        // HEAD responses carry no body to transform
        let is_head = req.method() == Method::HEAD;

        let inner = self.inner.call(req);

        ResponseFuture::new(inner, self.shared.clone(), is_head)
    }
}
