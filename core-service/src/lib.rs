//! Core service façade and bootstrap helpers.
//!
//! This crate wires host-provided collaborators (media engine factory,
//! network engines, decoder catalog, clock) into the streaming core and
//! exposes the command surface hosts call into: [`PlayerService`].
//!
//! Desktop hosts typically enable the `desktop-shims` feature, which fills
//! in the reqwest-backed network engines from `bridge-desktop` through
//! [`ServiceDependencies::desktop`].

pub mod error;
mod service;

pub use error::{CoreError, Result};
pub use service::{PlayerService, ServiceDependencies};

pub use core_playback::{
    PreCacheRequest, SessionHandle, SessionId, SessionPhase, SourceRequest,
};
pub use core_runtime::config::PlayerConfig;
pub use core_runtime::events::{EventRecord, EventSink, EventStream, ServiceEvent};

#[cfg(feature = "desktop-shims")]
mod desktop {
    use std::sync::Arc;

    use bridge_desktop::{PooledEngineBuilder, StandardEngine};
    use bridge_traits::SystemClock;
    use core_playback::decoder::DecoderCatalog;
    use core_playback::MediaEngineFactory;

    use crate::ServiceDependencies;

    impl ServiceDependencies {
        /// Dependencies with the reqwest-backed standard and pooled engines
        /// and the system clock.
        pub fn desktop(
            engine_factory: Arc<dyn MediaEngineFactory>,
            decoder_catalog: Arc<dyn DecoderCatalog>,
        ) -> Self {
            Self::new(
                engine_factory,
                Arc::new(StandardEngine::new()),
                decoder_catalog,
                Arc::new(SystemClock),
            )
            .with_high_performance(Arc::new(PooledEngineBuilder::new()))
        }
    }
}
