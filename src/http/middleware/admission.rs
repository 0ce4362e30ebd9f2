//! Admission middleware.
//!
//! Every request is counted as in flight from the moment it reaches the
//! service until its response body has been fully sent, including requests
//! the handler rejects during shutdown. The slot is held by an
//! [`InFlightGuard`] that travels with the response body, so it is released
//! on every exit path, panics and dropped connections included.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;

use axum::{
    body::Body,
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use hyper::body::{Body as HttpBody, Bytes, Frame, SizeHint};

use crate::lifecycle::state::{InFlightGuard, ServiceState};
use crate::observability::metrics;

pub async fn admission_middleware(
    State(service): State<Arc<ServiceState>>,
    request: Request,
    next: Next,
) -> Response {
    let slot = service.admit();
    let start = Instant::now();
    let method = request.method().clone();

    let response = next.run(request).await;

    metrics::record_request(method.as_str(), response.status().as_u16(), start);
    response.map(|inner| Body::new(TrackedBody { inner, _slot: slot }))
}

/// Response body that owns the request's in-flight slot.
struct TrackedBody {
    inner: Body,
    _slot: InFlightGuard,
}

impl HttpBody for TrackedBody {
    type Data = Bytes;
    type Error = axum::Error;

    fn poll_frame(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        Pin::new(&mut self.inner).poll_frame(cx)
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}
