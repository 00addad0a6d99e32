//! Deferred post-commit event emission.
//!
//! Use cases buffer events while their transaction is open and flush only
//! after a successful commit; the error path drops the buffer, so observers
//! never see events for rolled-back work. An absent sink degrades to no-op.

use lgk_schemas::events::{BusEvent, WaiverEvent};

/// Anything that can receive committed waiver events (the daemon's
/// broadcast bus, a test recorder, …).
pub trait EventSink: Send + Sync {
    fn publish(&self, event: BusEvent);
}

/// In-transaction event buffer.
#[derive(Default)]
pub struct DeferredEvents {
    queued: Vec<BusEvent>,
}

impl DeferredEvents {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, league_id: i64, payload: WaiverEvent) {
        self.queued.push(BusEvent::new(league_id, payload));
    }

    pub fn len(&self) -> usize {
        self.queued.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queued.is_empty()
    }

    /// Deliver everything in emission order. Call only after commit.
    /// Returns the number of events delivered (0 with no sink).
    pub fn flush(self, sink: Option<&dyn EventSink>) -> usize {
        let Some(sink) = sink else { return 0 };
        let n = self.queued.len();
        for event in self.queued {
            sink.publish(event);
        }
        n
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lgk_schemas::ProcessSummary;
    use std::sync::Mutex;

    struct Recorder {
        seen: Mutex<Vec<BusEvent>>,
    }

    impl EventSink for Recorder {
        fn publish(&self, event: BusEvent) {
            self.seen.lock().unwrap().push(event);
        }
    }

    fn summary_event(processed: i32) -> WaiverEvent {
        WaiverEvent::WaiverProcessed {
            summary: ProcessSummary {
                processed,
                successful: 0,
            },
        }
    }

    #[test]
    fn flush_delivers_in_emission_order() {
        let recorder = Recorder {
            seen: Mutex::new(vec![]),
        };
        let mut buf = DeferredEvents::new();
        buf.push(7, summary_event(1));
        buf.push(7, WaiverEvent::TradeInvalidated { trade_id: 42 });
        assert_eq!(buf.len(), 2);

        let delivered = buf.flush(Some(&recorder));
        assert_eq!(delivered, 2);

        let seen = recorder.seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].payload.kind(), "WAIVER_PROCESSED");
        assert_eq!(seen[1].payload.kind(), "TRADE_INVALIDATED");
        assert!(seen.iter().all(|e| e.league_id == 7));
    }

    #[test]
    fn absent_sink_is_a_noop() {
        let mut buf = DeferredEvents::new();
        buf.push(1, summary_event(0));
        assert_eq!(buf.flush(None), 0);
    }

    #[test]
    fn dropped_buffer_reaches_no_sink() {
        // The rollback path simply drops the buffer; nothing to observe,
        // which is exactly the contract.
        let mut buf = DeferredEvents::new();
        buf.push(1, summary_event(0));
        assert!(!buf.is_empty());
        drop(buf);
    }
}
