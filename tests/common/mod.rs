//! Shared utilities for integration tests.

use std::net::SocketAddr;
use std::sync::Arc;

use managed_lifecycle::config::{CleanupStepConfig, LifecycleConfig};
use managed_lifecycle::{HttpServer, HttpTransport, ServiceState};
use tokio::net::TcpListener;

/// A running server on an ephemeral port.
pub struct TestService {
    pub addr: SocketAddr,
    pub service: Arc<ServiceState>,
    pub transport: HttpTransport,
}

impl TestService {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

/// Fast config: fixed processing time, short poll, instant cleanup steps.
pub fn test_config(processing_ms: u64) -> LifecycleConfig {
    let mut config = LifecycleConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    config.handler.min_processing_ms = processing_ms;
    config.handler.max_processing_ms = processing_ms;
    config.shutdown.drain_timeout_secs = 5;
    config.shutdown.poll_interval_ms = 50;
    config.cleanup.steps = vec![
        CleanupStepConfig::new("release temporary files", 0),
        CleanupStepConfig::new("flush logs", 0),
    ];
    config
}

pub async fn start_service(config: &LifecycleConfig) -> TestService {
    let listener = TcpListener::bind(&config.listener.bind_address).await.unwrap();
    let addr = listener.local_addr().unwrap();
    let service = Arc::new(ServiceState::new());
    let transport = HttpServer::new(config, Arc::clone(&service))
        .serve(listener)
        .unwrap();

    TestService {
        addr,
        service,
        transport,
    }
}

/// Client without connection reuse, so shutdown never waits on idle sockets.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
