//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (admission, panic capture, tracing, request ID)
//! - Serve on a listener in a background task
//! - Hand the running server back as a [`Transport`] the orchestrator can stop

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{extract::Request, middleware, routing::get, Router};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio::time::{timeout_at, Instant};
use tower::ServiceBuilder;
use tower_http::{
    catch_panic::CatchPanicLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::Span;

use crate::config::{HandlerConfig, LifecycleConfig};
use crate::http::handlers::{
    health_handler, not_found_handler, ready_handler, root_handler, status_handler,
};
use crate::http::middleware::admission_middleware;
use crate::lifecycle::shutdown::Shutdown;
use crate::lifecycle::state::ServiceState;
use crate::lifecycle::transport::{Transport, TransportError};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<ServiceState>,
    pub handler: HandlerConfig,
}

/// HTTP front end of the service.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    /// Create a new HTTP server over the shared service state.
    pub fn new(config: &LifecycleConfig, service: Arc<ServiceState>) -> Self {
        let state = AppState {
            service,
            handler: config.handler.clone(),
        };
        Self {
            router: Self::build_router(state),
        }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: AppState) -> Router {
        let admission = middleware::from_fn_with_state(state.service.clone(), admission_middleware);

        Router::new()
            .route("/", get(root_handler))
            .route("/health", get(health_handler))
            .route("/ready", get(ready_handler))
            .route("/status", get(status_handler))
            .fallback(not_found_handler)
            .layer(admission)
            .layer(CatchPanicLayer::new())
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                    .layer(TraceLayer::new_for_http().make_span_with(request_span))
                    .layer(PropagateRequestIdLayer::x_request_id()),
            )
    }

    /// The fully layered router, for in-process use.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Start serving on `listener` in a background task.
    pub fn serve(self, listener: TcpListener) -> Result<HttpTransport, std::io::Error> {
        let local_addr = listener.local_addr()?;
        let shutdown = Shutdown::new();
        let signal = shutdown.clone();
        let router = self.router;

        let task = tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async move { signal.wait().await })
                .await
        });

        tracing::info!(address = %local_addr, "HTTP server started");
        Ok(HttpTransport {
            shutdown,
            task,
            local_addr,
        })
    }
}

/// Request span carrying the id set by `SetRequestIdLayer`.
fn request_span(request: &Request) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown");
    tracing::info_span!(
        "request",
        method = %request.method(),
        path = %request.uri().path(),
        request_id = %request_id,
    )
}

/// Handle to a running server.
pub struct HttpTransport {
    shutdown: Shutdown,
    task: JoinHandle<Result<(), std::io::Error>>,
    local_addr: SocketAddr,
}

impl HttpTransport {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }
}

impl Transport for HttpTransport {
    async fn stop_accepting(&mut self, deadline: Instant) -> Result<(), TransportError> {
        self.shutdown.trigger();

        match timeout_at(deadline, &mut self.task).await {
            Ok(Ok(result)) => {
                result?;
                tracing::info!(address = %self.local_addr, "HTTP server stopped");
                Ok(())
            }
            Ok(Err(join_err)) => Err(TransportError::Task(join_err.to_string())),
            Err(_) => {
                self.task.abort();
                Err(TransportError::Timeout)
            }
        }
    }
}
