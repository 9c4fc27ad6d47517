//! Outbound fan-out of a running simulation.
//!
//! Two lanes, matching the two kinds of consumer:
//!
//! | Lane | Channel | Consumer |
//! |---|---|---|
//! | completions | [`tokio::sync::broadcast`] | agents, loggers, anything that wants every [`CompletionEvent`] |
//! | snapshots | [`tokio::sync::watch`] | renderers, which only ever want the latest [`ArmSnapshot`] |
//!
//! Neither lane can push back into the engine: a slow completion subscriber
//! lags and skips, a slow renderer just sees a newer snapshot.

use std::sync::Arc;

use armsim_engine::ArmSnapshot;
use armsim_types::CompletionEvent;
use tokio::sync::{broadcast, watch};
use tracing::warn;

/// Shared outbound bus. Clones share the same channels.
#[derive(Clone, Debug)]
pub struct SimBus {
    completions: broadcast::Sender<CompletionEvent>,
    snapshots: Arc<watch::Sender<ArmSnapshot>>,
}

impl SimBus {
    /// Create a bus whose completion lane buffers `capacity` events and whose
    /// snapshot lane starts at `initial`.
    pub fn new(capacity: usize, initial: ArmSnapshot) -> Self {
        let (completions, _) = broadcast::channel(capacity.max(1));
        let (snapshots, _) = watch::channel(initial);
        Self {
            completions,
            snapshots: Arc::new(snapshots),
        }
    }

    /// Broadcast a completion. Returns the number of subscribers that
    /// received it; `0` when nobody is listening, which is not an error.
    pub fn publish_completion(&self, event: CompletionEvent) -> usize {
        self.completions.send(event).unwrap_or(0)
    }

    /// Replace the latest snapshot.
    pub fn publish_snapshot(&self, snapshot: ArmSnapshot) {
        self.snapshots.send_replace(snapshot);
    }

    pub fn subscribe_completions(&self) -> CompletionReceiver {
        CompletionReceiver {
            receiver: self.completions.subscribe(),
        }
    }

    pub fn watch_snapshots(&self) -> watch::Receiver<ArmSnapshot> {
        self.snapshots.subscribe()
    }

    /// A copy of the most recently published snapshot.
    pub fn latest_snapshot(&self) -> ArmSnapshot {
        self.snapshots.borrow().clone()
    }
}

/// Receiver for the completion lane.
pub struct CompletionReceiver {
    receiver: broadcast::Receiver<CompletionEvent>,
}

impl CompletionReceiver {
    /// Wait for the next completion. Skips over events lost to lag; returns
    /// `None` once the bus is gone.
    pub async fn recv(&mut self) -> Option<CompletionEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(lagged_by = n, "completion subscriber lagged");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Next completion if one is already buffered.
    pub fn try_recv(&mut self) -> Option<CompletionEvent> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => return Some(event),
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    warn!(lagged_by = n, "completion subscriber lagged");
                    continue;
                }
                Err(_) => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use armsim_engine::SimulationContext;
    use armsim_types::{ArmError, ArmModel, Completion};

    fn bus() -> SimBus {
        SimBus::new(16, SimulationContext::new(ArmModel::default()).snapshot())
    }

    #[test]
    fn publishing_without_subscribers_is_fine() {
        let bus = bus();
        let n = bus.publish_completion(CompletionEvent::new("a".into(), Ok(Completion::done())));
        assert_eq!(n, 0);
    }

    #[tokio::test]
    async fn every_subscriber_sees_every_completion() {
        let bus = bus();
        let mut rx1 = bus.subscribe_completions();
        let mut rx2 = bus.subscribe_completions();
        bus.publish_completion(CompletionEvent::new("a".into(), Ok(Completion::done())));
        bus.publish_completion(CompletionEvent::new("b".into(), Err(ArmError::Stopped)));

        for rx in [&mut rx1, &mut rx2] {
            assert_eq!(rx.recv().await.unwrap().id.as_str(), "a");
            assert_eq!(rx.recv().await.unwrap().id.as_str(), "b");
        }
    }

    #[tokio::test]
    async fn lagging_subscriber_skips_ahead() {
        let bus = SimBus::new(4, SimulationContext::new(ArmModel::default()).snapshot());
        let mut slow = bus.subscribe_completions();
        for i in 0..20 {
            bus.publish_completion(CompletionEvent::new(
                format!("c{i}").into(),
                Ok(Completion::done()),
            ));
        }
        let first = slow.recv().await.unwrap();
        assert_eq!(first.id.as_str(), "c16");
    }

    #[test]
    fn latest_snapshot_is_replaced() {
        let bus = bus();
        let watcher = bus.watch_snapshots();
        let mut snap = bus.latest_snapshot();
        snap.queue_len = 7;
        bus.publish_snapshot(snap);
        assert_eq!(bus.latest_snapshot().queue_len, 7);
        assert_eq!(watcher.borrow().queue_len, 7);
    }

    #[test]
    fn try_recv_on_empty_lane_is_none() {
        let bus = bus();
        let mut rx = bus.subscribe_completions();
        assert!(rx.try_recv().is_none());
    }
}
