//! Shared runtime state for lgk-daemon.
//!
//! Handlers receive `State<Arc<AppState>>` from Axum. The broadcast bus
//! doubles as the engine's event sink: the service publishes committed
//! waiver events into it and the SSE endpoint streams them out.

use std::sync::Arc;

use lgk_schemas::events::BusEvent;
use lgk_waivers::{EventSink, WaiverService};
use sqlx::PgPool;
use tokio::sync::broadcast;

// ---------------------------------------------------------------------------
// BuildInfo
// ---------------------------------------------------------------------------

/// Static build metadata included in health responses.
#[derive(Clone, Debug)]
pub struct BuildInfo {
    pub service: &'static str,
    pub version: &'static str,
}

// ---------------------------------------------------------------------------
// BroadcastSink
// ---------------------------------------------------------------------------

/// Bridges the engine's post-commit events onto the SSE broadcast bus.
/// Emission is best-effort: a bus with no subscribers drops the event.
pub struct BroadcastSink {
    bus: broadcast::Sender<BusEvent>,
}

impl EventSink for BroadcastSink {
    fn publish(&self, event: BusEvent) {
        let _ = self.bus.send(event);
    }
}

// ---------------------------------------------------------------------------
// AppState
// ---------------------------------------------------------------------------

/// Cloneable (Arc) handle shared across all Axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub service: WaiverService,
    /// Broadcast bus for SSE.
    pub bus: broadcast::Sender<BusEvent>,
    pub build: BuildInfo,
}

impl AppState {
    pub fn new(pool: PgPool) -> Self {
        let (bus, _rx) = broadcast::channel::<BusEvent>(1024);
        let sink = Arc::new(BroadcastSink { bus: bus.clone() });

        Self {
            service: WaiverService::with_events(pool, sink),
            bus,
            build: BuildInfo {
                service: "lgk-daemon",
                version: env!("CARGO_PKG_VERSION"),
            },
        }
    }
}
