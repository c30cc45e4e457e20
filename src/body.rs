use crate::classify::Classification;
use crate::options::TransformOptions;
use crate::pipeline::Pipeline;
use bytes::{Buf, Bytes, BytesMut};
use http_body::{Body, Frame};
use pin_project_lite::pin_project;
use std::future::Future;
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

pin_project! {
    /// A response body that may be buffered, transformed, and re-emitted.
    ///
    /// This type wraps an inner body and either collects it in full for the
    /// transform/cache cycle or passes it through unchanged.
    #[project = MinifyBodyProj]
    #[allow(missing_docs)]
    pub enum MinifyBody<B> {
        /// Body routed through the transform pipeline.
        Buffered {
            #[pin]
            inner: B,
            state: BufferedBody,
        },
        /// Passthrough body, forwarded frame by frame.
        Passthrough {
            #[pin]
            inner: B,
        },
    }
}

/// State and buffers for an actively intercepted body.
pub(crate) struct BufferedBody {
    pipeline: Arc<Pipeline>,
    classification: Classification,
    options: Option<TransformOptions>,
    buffer: BytesMut,
    pending_trailers: Option<http::HeaderMap>,
    phase: Phase,
}

/// State machine for the buffered response lifecycle.
enum Phase {
    /// Collecting data frames from the inner body, in call order.
    Collecting,
    /// Awaiting the cache/transform cycle over the full body.
    Transforming {
        future: Pin<Box<dyn Future<Output = Bytes> + Send>>,
    },
    /// Holding the transformed output, ready to emit as one frame.
    Emitting { output: Bytes },
    /// Emitting buffered trailers.
    Trailers,
    /// The body is complete. Further polls yield end-of-stream.
    Done,
}

impl BufferedBody {
    fn new(
        pipeline: Arc<Pipeline>,
        classification: Classification,
        options: TransformOptions,
    ) -> Self {
        Self {
            pipeline,
            classification,
            options: Some(options),
            buffer: BytesMut::new(),
            pending_trailers: None,
            phase: Phase::Collecting,
        }
    }

    pub(crate) fn is_done(&self) -> bool {
        matches!(self.phase, Phase::Done)
    }

    /// Drives collection, transform, and emission. The cache lookup is
    /// issued only after the inner body signals end-of-stream, never on
    /// partial data.
    fn poll_buffered<B>(
        &mut self,
        cx: &mut Context<'_>,
        mut inner: Pin<&mut B>,
    ) -> Poll<Option<Result<Frame<Bytes>, io::Error>>>
    where
        B: Body,
        B::Data: Buf,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        loop {
            match &mut self.phase {
                Phase::Done => return Poll::Ready(None),

                Phase::Trailers => {
                    self.phase = Phase::Done;
                    if let Some(trailers) = self.pending_trailers.take() {
                        return Poll::Ready(Some(Ok(Frame::trailers(trailers))));
                    }
                    return Poll::Ready(None);
                }

                Phase::Emitting { output } => {
                    let output = std::mem::take(output);
                    self.phase = Phase::Trailers;
                    return Poll::Ready(Some(Ok(Frame::data(output))));
                }

                Phase::Transforming { future } => match future.as_mut().poll(cx) {
                    Poll::Pending => return Poll::Pending,
                    Poll::Ready(output) => {
                        self.phase = Phase::Emitting { output };
                    }
                },

                Phase::Collecting => match inner.as_mut().poll_frame(cx) {
                    Poll::Pending => return Poll::Pending,
                    Poll::Ready(None) => {
                        let body = self.buffer.split().freeze();
                        let options = self.options.take().unwrap_or_default();
                        let future = Box::pin(self.pipeline.clone().run(
                            self.classification,
                            options,
                            body,
                        ));
                        self.phase = Phase::Transforming { future };
                    }
                    Poll::Ready(Some(Err(e))) => {
                        return Poll::Ready(Some(Err(io::Error::other(e.into()))));
                    }
                    Poll::Ready(Some(Ok(frame))) => match frame.into_data() {
                        Ok(mut data) => {
                            while data.has_remaining() {
                                let chunk = data.chunk();
                                self.buffer.extend_from_slice(chunk);
                                data.advance(chunk.len());
                            }
                        }
                        Err(frame) => {
                            if let Ok(trailers) = frame.into_trailers() {
                                // Held aside until the transformed body is out.
                                self.pending_trailers = Some(trailers);
                            }
                        }
                    },
                },
            }
        }
    }
}

impl<B> MinifyBody<B> {
    /// Creates a buffered body routed through the transform pipeline.
    pub(crate) fn buffered(
        inner: B,
        pipeline: Arc<Pipeline>,
        classification: Classification,
        options: TransformOptions,
    ) -> Self {
        Self::Buffered {
            inner,
            state: BufferedBody::new(pipeline, classification, options),
        }
    }

    /// Creates a passthrough body that forwards the inner body unchanged.
    pub fn passthrough(inner: B) -> Self {
        Self::Passthrough { inner }
    }
}

impl<B> Body for MinifyBody<B>
where
    B: Body,
    B::Data: Buf,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    type Data = Bytes;
    type Error = io::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        match self.project() {
            MinifyBodyProj::Passthrough { inner } => {
                // Pass through frames, converting data to Bytes
                match inner.poll_frame(cx) {
                    Poll::Pending => Poll::Pending,
                    Poll::Ready(None) => Poll::Ready(None),
                    Poll::Ready(Some(Ok(frame))) => {
                        let frame = frame.map_data(|mut data| data.copy_to_bytes(data.remaining()));
                        Poll::Ready(Some(Ok(frame)))
                    }
                    Poll::Ready(Some(Err(e))) => Poll::Ready(Some(Err(io::Error::other(e.into())))),
                }
            }
            MinifyBodyProj::Buffered { inner, state } => state.poll_buffered(cx, inner),
        }
    }

    fn is_end_stream(&self) -> bool {
        match self {
            MinifyBody::Passthrough { inner } => inner.is_end_stream(),
            MinifyBody::Buffered { state, .. } => state.is_done(),
        }
    }

    fn size_hint(&self) -> http_body::SizeHint {
        match self {
            MinifyBody::Passthrough { inner } => inner.size_hint(),
            // Transformed size is unknown until the pipeline completes
            MinifyBody::Buffered { .. } => http_body::SizeHint::default(),
        }
    }
}
