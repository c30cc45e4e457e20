use crate::body::MinifyBody;
use crate::classify::Classification;
use crate::options::TransformOptions;
use crate::service::Shared;
use http::{Response, header};
use pin_project_lite::pin_project;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

pin_project! {
    /// Future for minify service responses.
    pub struct ResponseFuture<F> {
        #[pin]
        inner: F,
        shared: Arc<Shared>,
        is_head: bool,
    }
}

impl<F> ResponseFuture<F> {
    pub(crate) fn new(inner: F, shared: Arc<Shared>, is_head: bool) -> Self {
        Self {
            inner,
            shared,
            is_head,
        }
    }
}

impl<F, B, E> Future for ResponseFuture<F>
where
    F: Future<Output = Result<Response<B>, E>>,
{
    type Output = Result<Response<MinifyBody<B>>, E>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.project();

        match this.inner.poll(cx) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(Err(e)) => Poll::Ready(Err(e)),
            Poll::Ready(Ok(response)) => {
                let response = wrap_response(response, this.shared, *this.is_head);
                Poll::Ready(Ok(response))
            }
        }
    }
}

/// The single decision point per response: classify by the declared content
/// type the moment headers are finalized, mutate outgoing headers exactly
/// once, and select the body wrapping.
fn wrap_response<B>(response: Response<B>, shared: &Shared, is_head: bool) -> Response<MinifyBody<B>> {
    let (mut parts, body) = response.into_parts();

    // Per-response overrides travel on the response's extensions; they are
    // consumed here so they never leak further down the stack.
    let options = parts
        .extensions
        .remove::<TransformOptions>()
        .unwrap_or_default();

    let content_type = parts
        .headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok());

    let classification = Classification::new(
        is_head,
        &options,
        content_type,
        &shared.matchers,
        &shared.pipeline.dispatcher,
    );

    let body = if classification.should_buffer {
        // Compiled formats face outward as their base type
        if let Some(base) = classification.asset_type.base_content_type() {
            parts.headers.insert(
                header::CONTENT_TYPE,
                header::HeaderValue::from_static(base),
            );
        }

        // Remove Content-Length since the transformed size is unknown
        parts.headers.remove(header::CONTENT_LENGTH);

        MinifyBody::buffered(body, shared.pipeline.clone(), classification, options)
    } else {
        MinifyBody::passthrough(body)
    };

    Response::from_parts(parts, body)
}
