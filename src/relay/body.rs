//! Streaming response body.
//!
//! # Responsibilities
//! - Hand backend frames to the server one at a time, in original chunking
//! - Detect stream end, backend stream errors and client aborts
//! - Fire the end event or the error continuation exactly once
//!
//! # Design Decisions
//! - A frame is pulled from the backend only when the server polls for the
//!   next one, i.e. after the previous one was written (backpressure)
//! - Dropping the body before the end releases the backend stream at once

use std::pin::Pin;
use std::sync::Arc;
use std::task::{ready, Context, Poll};

use bytes::Bytes;
use hyper::body::{Body, Frame, SizeHint};

use crate::error::{BoxError, ErrorHandler, ForwardError};
use crate::observability::{metrics, Hooks};
use crate::relay::context::ForwardingContext;
use crate::relay::transport::TransportBody;

pub struct RelayBody {
    inner: Option<TransportBody>,
    cx: ForwardingContext,
    hooks: Hooks,
    errors: Arc<dyn ErrorHandler>,
    rule: Arc<str>,
    settled: bool,
}

impl RelayBody {
    pub fn new(
        inner: TransportBody,
        cx: ForwardingContext,
        hooks: Hooks,
        errors: Arc<dyn ErrorHandler>,
        rule: Arc<str>,
    ) -> Self {
        Self {
            inner: Some(inner),
            cx,
            hooks,
            errors,
            rule,
            settled: false,
        }
    }

    fn complete(&mut self) {
        self.settled = true;
        let elapsed = self.cx.started.elapsed();
        self.hooks.end(&self.cx, elapsed.as_secs_f64() * 1000.0);
        metrics::record_success(&self.rule, elapsed);
    }

    fn fail(&mut self, error: ForwardError) {
        self.settled = true;
        tracing::warn!(url = %self.cx.url, error = %error, "Response stream aborted");
        self.hooks.error(self.cx.method.as_str(), &error);
        metrics::record_failure(&self.rule, error.kind());
        // The head is already on the wire; whatever the handler renders is dropped.
        let _ = self.errors.handle(error);
    }
}

impl Body for RelayBody {
    type Data = Bytes;
    type Error = BoxError;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = self.get_mut();
        let Some(inner) = this.inner.as_mut() else {
            return Poll::Ready(None);
        };

        match ready!(Pin::new(inner).poll_frame(cx)) {
            Some(Ok(frame)) => Poll::Ready(Some(Ok(frame))),
            Some(Err(source)) => {
                this.inner = None;
                let message = source.to_string();
                let error = ForwardError::upstream_response(
                    this.cx.url.clone(),
                    "backend stream error",
                    Some(source),
                );
                this.fail(error);
                Poll::Ready(Some(Err(std::io::Error::other(message).into())))
            }
            None => {
                this.inner = None;
                this.complete();
                Poll::Ready(None)
            }
        }
    }

    fn is_end_stream(&self) -> bool {
        self.inner
            .as_ref()
            .map_or(true, |inner| inner.is_end_stream())
    }

    fn size_hint(&self) -> SizeHint {
        self.inner
            .as_ref()
            .map_or_else(|| SizeHint::with_exact(0), |inner| inner.size_hint())
    }
}

impl Drop for RelayBody {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        match self.inner.take() {
            Some(inner) if !inner.is_end_stream() => {
                drop(inner);
                let error = ForwardError::upstream_response(
                    self.cx.url.clone(),
                    "client closed the connection before the response completed",
                    None,
                );
                self.fail(error);
            }
            // The server may skip the final poll once the body reports its end.
            _ => self.complete(),
        }
    }
}
