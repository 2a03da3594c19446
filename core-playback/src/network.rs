//! # Network Engine Selection
//!
//! Two HTTP engines are available to a session: the standard engine, which
//! always works, and an optional high-performance engine that is expensive
//! to build and shared by every session.
//!
//! The high-performance engine lives in an [`EngineRegistry`] owned by the
//! service. Each session holds at most one [`EngineLease`]; the engine is
//! built lazily on the first lease and shut down when the last lease drops.

use std::fmt;
use std::sync::Arc;

use bridge_traits::{EngineBuilder, EngineKind, HttpClient, HttpClientOptions, HttpEngine};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::error::Result;

#[derive(Default)]
struct RegistryState {
    engine: Option<Arc<dyn HttpEngine>>,
    leases: usize,
    build_failed: bool,
}

/// Shared, reference-counted home of the high-performance engine.
pub struct EngineRegistry {
    builder: Option<Arc<dyn EngineBuilder>>,
    state: Mutex<RegistryState>,
}

impl EngineRegistry {
    pub fn new(builder: Option<Arc<dyn EngineBuilder>>) -> Self {
        Self {
            builder,
            state: Mutex::new(RegistryState::default()),
        }
    }

    /// A registry without a high-performance engine.
    pub fn disabled() -> Self {
        Self::new(None)
    }

    /// Takes a lease on the engine, building it if nobody holds one.
    ///
    /// Returns `None` when no builder is configured or building failed; a
    /// failed build is not retried for the lifetime of the registry.
    pub fn acquire(self: &Arc<Self>) -> Option<EngineLease> {
        let builder = self.builder.as_ref()?;
        let mut state = self.state.lock();
        if state.build_failed {
            return None;
        }

        let engine = match &state.engine {
            Some(engine) => Arc::clone(engine),
            None => match builder.build() {
                Ok(engine) => {
                    info!(kind = %engine.kind(), "High-performance network engine started");
                    state.engine = Some(Arc::clone(&engine));
                    engine
                }
                Err(err) => {
                    warn!(error = %err, "High-performance network engine unavailable");
                    state.build_failed = true;
                    return None;
                }
            },
        };

        state.leases += 1;
        Some(EngineLease {
            registry: Arc::clone(self),
            engine,
        })
    }

    /// Number of outstanding leases.
    pub fn lease_count(&self) -> usize {
        self.state.lock().leases
    }

    pub fn is_running(&self) -> bool {
        self.state.lock().engine.is_some()
    }

    pub fn build_failed(&self) -> bool {
        self.state.lock().build_failed
    }

    fn release(&self) {
        let engine = {
            let mut state = self.state.lock();
            state.leases = state.leases.saturating_sub(1);
            if state.leases > 0 {
                return;
            }
            state.engine.take()
        };
        if let Some(engine) = engine {
            engine.shutdown();
            info!("High-performance network engine shut down");
        }
    }
}

impl fmt::Debug for EngineRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("EngineRegistry")
            .field("configured", &self.builder.is_some())
            .field("running", &state.engine.is_some())
            .field("leases", &state.leases)
            .field("build_failed", &state.build_failed)
            .finish()
    }
}

/// One session's hold on the shared engine.
pub struct EngineLease {
    registry: Arc<EngineRegistry>,
    engine: Arc<dyn HttpEngine>,
}

impl EngineLease {
    pub fn engine(&self) -> &Arc<dyn HttpEngine> {
        &self.engine
    }
}

impl Drop for EngineLease {
    fn drop(&mut self) {
        self.registry.release();
    }
}

impl fmt::Debug for EngineLease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineLease")
            .field("kind", &self.engine.kind())
            .finish()
    }
}

/// Client handed to the pipeline builder.
#[derive(Clone)]
pub struct SelectedClient {
    pub client: Arc<dyn HttpClient>,
    pub kind: EngineKind,
}

impl fmt::Debug for SelectedClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectedClient")
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

/// Per-session engine choice.
///
/// Once [`mark_failed`](Self::mark_failed) is called the session stays on
/// the standard engine until it is disposed.
pub struct NetworkEngineSelector {
    registry: Arc<EngineRegistry>,
    standard: Arc<dyn HttpEngine>,
    lease: Option<EngineLease>,
    failed: bool,
    in_use: Option<EngineKind>,
}

impl NetworkEngineSelector {
    pub fn new(registry: Arc<EngineRegistry>, standard: Arc<dyn HttpEngine>) -> Self {
        Self {
            registry,
            standard,
            lease: None,
            failed: false,
            in_use: None,
        }
    }

    /// Picks the engine for the next pipeline and mints a client for it.
    pub fn select(
        &mut self,
        use_high_performance: bool,
        options: &HttpClientOptions,
    ) -> Result<SelectedClient> {
        if use_high_performance && !self.failed {
            if self.lease.is_none() {
                self.lease = self.registry.acquire();
            }
            if let Some(lease) = &self.lease {
                match lease.engine().client(options) {
                    Ok(client) => {
                        self.in_use = Some(EngineKind::HighPerformance);
                        return Ok(SelectedClient {
                            client,
                            kind: EngineKind::HighPerformance,
                        });
                    }
                    Err(err) => {
                        warn!(error = %err, "High-performance client rejected, using standard engine");
                    }
                }
            }
        }

        let client = self.standard.client(options)?;
        self.in_use = Some(EngineKind::Standard);
        debug!(requested_high_performance = use_high_performance, "Using standard network engine");
        Ok(SelectedClient {
            client,
            kind: EngineKind::Standard,
        })
    }

    /// Pins the session to the standard engine and gives back the lease.
    pub fn mark_failed(&mut self) {
        if self.failed {
            return;
        }
        self.failed = true;
        self.lease = None;
        if self.in_use == Some(EngineKind::HighPerformance) {
            self.in_use = None;
        }
    }

    pub fn has_failed(&self) -> bool {
        self.failed
    }

    /// Engine of the most recent selection.
    pub fn in_use(&self) -> Option<EngineKind> {
        self.in_use
    }

    pub fn high_performance_in_use(&self) -> bool {
        self.in_use == Some(EngineKind::HighPerformance)
    }

    /// Drops the lease, if any.
    pub fn release(&mut self) {
        self.lease = None;
        self.in_use = None;
    }
}

impl fmt::Debug for NetworkEngineSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NetworkEngineSelector")
            .field("leased", &self.lease.is_some())
            .field("failed", &self.failed)
            .field("in_use", &self.in_use)
            .finish()
    }
}
