//! Status snapshot published by the primary loop at tick boundaries and read
//! by the UI thread (spec §5, §4.10). Lock-free on the publishing side: the
//! primary loop swaps in a freshly built `Arc<StatusSnapshot>`, the UI thread
//! only ever reads the latest one via [`StatusPublisher::latest`].

use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;

use crate::sequencing_buffer::SequencingStats;

#[derive(Debug, Clone, Serialize)]
pub struct LineStatus {
    pub line_id: u32,
    pub kind: &'static str,
    pub is_open: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct CallStatus {
    pub line_id: u32,
    pub sequencing: SequencingStats,
}

/// A point-in-time view of the node, serialized verbatim as the `GET
/// /status` JSON body (spec §6).
#[derive(Debug, Clone, Default, Serialize)]
pub struct StatusSnapshot {
    pub lines: Vec<LineStatus>,
    pub calls: Vec<CallStatus>,
    pub router_dropped_count: u64,
    pub uptime_ms: u32,
}

/// Single-writer, multi-reader snapshot cell. The primary loop is the only
/// writer; the UI thread clones the `Arc` out, never blocking the writer.
#[derive(Default)]
pub struct StatusPublisher {
    inner: RwLock<Arc<StatusSnapshot>>,
}

impl StatusPublisher {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Arc::new(StatusSnapshot::default())),
        }
    }

    pub fn publish(&self, snapshot: StatusSnapshot) {
        *self.inner.write() = Arc::new(snapshot);
    }

    #[must_use]
    pub fn latest(&self) -> Arc<StatusSnapshot> {
        self.inner.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn publishes_and_reads_latest() {
        let publisher = StatusPublisher::new();
        assert_eq!(publisher.latest().router_dropped_count, 0);

        publisher.publish(StatusSnapshot {
            router_dropped_count: 3,
            ..Default::default()
        });
        assert_eq!(publisher.latest().router_dropped_count, 3);
    }
}
