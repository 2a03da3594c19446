//! Network engines backed by reqwest.
//!
//! - [`StandardEngine`] mints an independent client per session.
//! - [`PooledEngine`] keeps one tuned client whose connection pool is shared
//!   by every session leasing it. It is built by [`PooledEngineBuilder`].

use bridge_traits::{
    error::{BridgeError, Result},
    http::{EngineBuilder, EngineKind, HttpClient, HttpClientOptions, HttpEngine},
};
use reqwest::Client;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::http::{redirect_policy, ReqwestHttpClient};

/// Always-available engine.
#[derive(Debug, Default)]
pub struct StandardEngine;

impl StandardEngine {
    pub fn new() -> Self {
        Self
    }
}

impl HttpEngine for StandardEngine {
    fn kind(&self) -> EngineKind {
        EngineKind::Standard
    }

    fn client(&self, options: &HttpClientOptions) -> Result<Arc<dyn HttpClient>> {
        Ok(Arc::new(ReqwestHttpClient::from_options(options)?))
    }
}

/// Tuning for the pooled engine.
#[derive(Debug, Clone)]
pub struct PooledEngineBuilder {
    pub max_idle_per_host: usize,
    pub idle_timeout: Duration,
    pub tcp_keepalive: Duration,
    pub connect_timeout: Duration,
}

impl Default for PooledEngineBuilder {
    fn default() -> Self {
        Self {
            max_idle_per_host: 16,
            idle_timeout: Duration::from_secs(90),
            tcp_keepalive: Duration::from_secs(60),
            connect_timeout: Duration::from_millis(3_000),
        }
    }
}

impl PooledEngineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_idle_per_host(mut self, max: usize) -> Self {
        self.max_idle_per_host = max;
        self
    }

    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }
}

impl EngineBuilder for PooledEngineBuilder {
    fn build(&self) -> Result<Arc<dyn HttpEngine>> {
        let client = Client::builder()
            .connect_timeout(self.connect_timeout)
            .pool_max_idle_per_host(self.max_idle_per_host)
            .pool_idle_timeout(self.idle_timeout)
            .tcp_keepalive(self.tcp_keepalive)
            .tcp_nodelay(true)
            .redirect(redirect_policy(true))
            .build()
            .map_err(|e| BridgeError::NotAvailable(format!("pooled engine: {}", e)))?;

        info!(
            max_idle_per_host = self.max_idle_per_host,
            "High-performance network engine started"
        );
        Ok(Arc::new(PooledEngine {
            client,
            shut_down: AtomicBool::new(false),
        }))
    }
}

/// Shared-pool engine.
#[derive(Debug)]
pub struct PooledEngine {
    client: Client,
    shut_down: AtomicBool,
}

impl PooledEngine {
    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::Acquire)
    }
}

impl HttpEngine for PooledEngine {
    fn kind(&self) -> EngineKind {
        EngineKind::HighPerformance
    }

    fn client(&self, options: &HttpClientOptions) -> Result<Arc<dyn HttpClient>> {
        if self.is_shut_down() {
            return Err(BridgeError::NotAvailable("pooled engine shut down".into()));
        }
        Ok(Arc::new(ReqwestHttpClient::shared(self.client.clone(), options)))
    }

    fn shutdown(&self) {
        if !self.shut_down.swap(true, Ordering::AcqRel) {
            debug!("High-performance network engine shut down");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_engine_kind() {
        let engine = StandardEngine::new();
        assert_eq!(engine.kind(), EngineKind::Standard);
        assert!(engine.client(&HttpClientOptions::default()).is_ok());
    }

    #[test]
    fn test_pooled_engine_rejects_clients_after_shutdown() {
        let engine = PooledEngineBuilder::new().build().unwrap();
        assert_eq!(engine.kind(), EngineKind::HighPerformance);
        assert!(engine.client(&HttpClientOptions::default()).is_ok());

        engine.shutdown();
        engine.shutdown();
        assert!(matches!(
            engine.client(&HttpClientOptions::default()),
            Err(BridgeError::NotAvailable(_))
        ));
    }
}
